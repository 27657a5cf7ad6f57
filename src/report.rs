use std::collections::HashMap;
use std::io::Write;

use serde::Serialize;

use crate::data_loader::{Team, TeamId};
use crate::error::Result;
use crate::pipeline::Projection;

fn fmt_opt(v: Option<f64>) -> String {
    v.map_or_else(|| "-".to_string(), |v| format!("{v:6.1}"))
}

pub fn output_report(teams: &[Team], projection: &Projection) {
    let names: HashMap<TeamId, &str> = teams.iter().map(|t| (t.id, t.name.as_str())).collect();

    println!("|  PR | PCR | {0:24} | {1:6} | {2:6} | {3:6} | {4:6} | {5:5} | {6:6}",
        "Team", "Record", "RPI", "AdjO", "AdjD", "QWP", "Champ");

    for r in &projection.rankings {
        let Some(s) = projection.ratings.get(r.team) else { continue };

        println!("| {0:3} | {1:3} | {2:24} | {3:>6} | {4:6.4} | {5} | {6} | {7:5.1} | {8:6}",
            r.pr,
            r.pcr,
            names.get(&r.team).copied().unwrap_or("?"),
            format!("{}-{}", s.overall.wins, s.overall.losses),
            s.rpi,
            fmt_opt(s.adj_offense),
            fmt_opt(s.adj_defense),
            r.qwp,
            if r.champion { "AQ" } else { "" },
        )
    }

    println!();
    for (i, pod) in projection.bracket.pods.iter().enumerate() {
        println!("Pod {0:2} @ {1}", i + 1, names.get(&pod.host.team).copied().unwrap_or("?"));
        for v in &pod.visitors {
            println!("    seed {0} | {1:24} | {2:7.1} mi",
                v.seed_tier,
                names.get(&v.team).copied().unwrap_or("?"),
                v.distance_miles,
            );
        }
    }
}

#[derive(Serialize)]
struct RankingRow<'a> {
    pr: usize,
    pcr: usize,
    team: TeamId,
    name: &'a str,
    conference: &'a str,
    wins: u32,
    losses: u32,
    rpi: f64,
    owp: f64,
    oowp: f64,
    sos: f64,
    qwp: f64,
    adj_offense: Option<f64>,
    adj_defense: Option<f64>,
    pace: Option<f64>,
    champion: bool,
}

/// One row per ranked team, PR order.
pub fn write_rankings_csv<W: Write>(writer: W, teams: &[Team], projection: &Projection) -> Result<()> {
    let by_id: HashMap<TeamId, &Team> = teams.iter().map(|t| (t.id, t)).collect();
    let mut csv_writer = csv::Writer::from_writer(writer);

    for r in &projection.rankings {
        let (Some(s), Some(t)) = (projection.ratings.get(r.team), by_id.get(&r.team)) else { continue };
        csv_writer.serialize(RankingRow {
            pr: r.pr,
            pcr: r.pcr,
            team: r.team,
            name: &t.name,
            conference: &t.conference,
            wins: s.overall.wins,
            losses: s.overall.losses,
            rpi: s.rpi,
            owp: s.owp,
            oowp: s.oowp,
            sos: s.sos,
            qwp: r.qwp,
            adj_offense: s.adj_offense,
            adj_defense: s.adj_defense,
            pace: s.pace,
            champion: r.champion,
        })?;
    }

    csv_writer.flush()?;
    Ok(())
}
