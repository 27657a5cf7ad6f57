use thiserror::Error;

use crate::data_loader::TeamId;

/// Conditions that stop a run before any output is produced.
///
/// Missing data that the engine can represent (a team with no eligible games,
/// an opponent outside the ranked population, a conference without a
/// postseason) is never an error; it shows up as an absent value instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("game record for team {team} on {date} is missing a score")]
    MissingScore { team: TeamId, date: chrono::NaiveDate },

    #[error("game record for team {team} on {date} has no winner ({score}-{score})")]
    TiedScore { team: TeamId, date: chrono::NaiveDate, score: u32 },

    #[error("game record references unknown team {0}")]
    UnknownTeam(TeamId),

    #[error("{team} vs {opponent} on {date} is recorded {ours} time(s) from {team}'s side but {theirs} from {opponent}'s")]
    UnmatchedRecord { team: TeamId, opponent: TeamId, date: chrono::NaiveDate, ours: usize, theirs: usize },

    #[error("the two sides of {team} vs {opponent} on {date} disagree on score or location")]
    InconsistentMirror { team: TeamId, opponent: TeamId, date: chrono::NaiveDate },

    #[error("team {0} is listed more than once")]
    DuplicateTeam(TeamId),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed ledger JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV output failed: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
