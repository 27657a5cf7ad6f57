use std::collections::{BTreeMap, HashMap};

use tracing::info;

use crate::bracket::{assemble_bracket, closest_hosts, Bracket, HostOption};
use crate::champions::{detect_champions, ConferenceChampion};
use crate::data_loader::*;
use crate::error::Result;
use crate::quadrant::{quadrant_records, QuadrantRecord};
use crate::ranking::{rank_teams, RankingResult};
use crate::ranking_context::RankingContext;
use crate::ratings::{compute_ratings, RatingTable};

/// Output of one run. Built all at once; a failed run returns nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub ratings: RatingTable,
    pub quadrants: HashMap<TeamId, QuadrantRecord>,
    pub champions: Vec<ConferenceChampion>,
    pub rankings: Vec<RankingResult>,
    pub bracket: Bracket,
    pub alternates: BTreeMap<TeamId, Vec<HostOption>>,   // Every ranked team that does not host
}

impl Projection {
    pub fn ranking_of(&self, team: TeamId) -> Option<&RankingResult> {
        self.rankings.iter().find(|r| r.team == team)
    }
}

/// Records of the configured season up to the as-of date.
pub fn season_games(games: &[GameResult], ctx: &RankingContext) -> Vec<GameResult> {
    games
        .iter()
        .filter(|g| ctx.season.map_or(true, |s| g.season == s))
        .filter(|g| ctx.as_of.map_or(true, |d| g.date <= d))
        .cloned()
        .collect()
}

pub fn run(teams: &[Team], games: &[GameResult], ctx: &RankingContext) -> Result<Projection> {
    ctx.validate()?;
    validate_records(teams, games)?;

    let games = season_games(games, ctx);
    info!(teams = teams.len(), games = games.len(), season = ?ctx.season, as_of = ?ctx.as_of, "starting run");

    let ratings = compute_ratings(teams, &games, ctx);
    let bands = ctx.effective_bands(ratings.len());
    let quadrants = quadrant_records(&games, &ratings.rpi_ranks(), &bands);
    let champions = detect_champions(teams, &games, ctx);
    let rankings = rank_teams(teams, &ratings, &quadrants, &champions, ctx);
    let bracket = assemble_bracket(teams, &rankings, ctx);

    // Visitors, teams the pods could not take, and ranked teams outside the field
    let alternates = rankings
        .iter()
        .filter(|r| !bracket.is_host(r.team))
        .filter_map(|r| teams.iter().find(|t| t.id == r.team))
        .map(|t| (t.id, closest_hosts(t, teams, &bracket)))
        .collect();

    info!(
        rated = ratings.len(),
        ranked = rankings.len(),
        champions = champions.len(),
        pods = bracket.pods.len(),
        "run complete"
    );

    Ok(Projection { ratings, quadrants, champions, rankings, bracket, alternates })
}
