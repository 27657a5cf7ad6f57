use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::Parser;
use seeding_projection::report::{output_report, write_rankings_csv};
use seeding_projection::*;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Rank a season's game ledger and project the tournament pods.
///
/// Tunables not exposed as flags come from SEEDING_* environment variables.
#[derive(Parser, Debug)]
#[command(name = "seeding", version)]
struct Args {
    /// Game ledger JSON
    ledger: PathBuf,

    /// Also write the ranking table here as CSV
    csv: Option<PathBuf>,

    /// Only count records of this season (overrides SEEDING_SEASON)
    #[arg(long)]
    season: Option<u16>,

    /// Ignore games after this date, YYYY-MM-DD (overrides SEEDING_AS_OF)
    #[arg(long)]
    as_of: Option<NaiveDate>,

    /// Rank one conference only (overrides SEEDING_CONFERENCE)
    #[arg(long)]
    conference: Option<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match project(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn project(args: Args) -> Result<()> {
    let mut ranking_context = RankingContext::from_env();
    if args.season.is_some() {
        ranking_context.season = args.season;
    }
    if args.as_of.is_some() {
        ranking_context.as_of = args.as_of;
    }
    if args.conference.is_some() {
        ranking_context.conference_filter = args.conference;
    }

    let ledger = load_ledger(&args.ledger)?;
    let projection = run(&ledger.teams, &ledger.games, &ranking_context)?;

    output_report(&ledger.teams, &projection);

    if let Some(path) = args.csv {
        write_rankings_csv(File::create(&path)?, &ledger.teams, &projection)?;
        info!(path = %path.display(), "rankings written");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_is_required_and_csv_optional() {
        assert!(Args::try_parse_from(["seeding"]).is_err());

        let args = Args::try_parse_from(["seeding", "ledger.json"]).unwrap();
        assert_eq!(args.ledger, PathBuf::from("ledger.json"));
        assert!(args.csv.is_none());

        let args = Args::try_parse_from(["seeding", "ledger.json", "out.csv", "--season", "2024", "--as-of", "2024-02-15"]).unwrap();
        assert_eq!(args.csv, Some(PathBuf::from("out.csv")));
        assert_eq!(args.season, Some(2024));
        assert_eq!(args.as_of, NaiveDate::from_ymd_opt(2024, 2, 15));
    }

    #[test]
    fn malformed_date_is_a_usage_error() {
        assert!(Args::try_parse_from(["seeding", "ledger.json", "--as-of", "15/02/2024"]).is_err());
    }
}
