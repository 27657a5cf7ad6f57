//! Rating and seeding projection for a collegiate basketball league.
//!
//! Completed game records go in; adjusted efficiency ratings, RPI, quadrant records,
//! a composite ranking with automatic qualifiers, and a pod bracket come out.
//! Every run recomputes the whole population from scratch.

pub mod bracket;
pub mod champions;
pub mod data_loader;
pub mod error;
pub mod pipeline;
pub mod quadrant;
pub mod ranking;
pub mod ranking_context;
pub mod ratings;
pub mod report;
pub mod util;

pub use data_loader::{load_ledger, BoxScore, GameResult, Ledger, Location, Team, TeamId};
pub use error::{EngineError, Result};
pub use pipeline::{run, Projection};
pub use ranking_context::RankingContext;
