use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::champions::ConferenceChampion;
use crate::data_loader::*;
use crate::quadrant::QuadrantRecord;
use crate::ranking_context::RankingContext;
use crate::ratings::RatingTable;
use crate::util::ordinal_ranks;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingResult {
    pub team: TeamId,
    pub pcr: usize,
    pub pr: usize,

    pub win_pct_rank: usize,
    pub rpi_rank: usize,
    pub qwp_rank: usize,
    pub average_rank: f64,

    pub overall_win_pct: f64,
    pub rpi: f64,
    pub qwp: f64,
    pub quadrants: QuadrantRecord,
    pub champion: bool,
}

/// PCR and PR for every rated team that passes the context filters, ordered by PR.
///
/// PCR averages three independent ordinal ranks (overall win percentage, RPI, quadrant win
/// points) and re-ranks by that average. Every tie, at either step, keeps team-list order.
pub fn rank_teams(
    teams: &[Team],
    ratings: &RatingTable,
    quadrants: &HashMap<TeamId, QuadrantRecord>,
    champions: &[ConferenceChampion],
    ctx: &RankingContext,
) -> Vec<RankingResult> {
    let conference_of: HashMap<TeamId, &str> = teams.iter().map(|t| (t.id, t.conference.as_str())).collect();
    let champion_ids: HashSet<TeamId> = champions.iter().map(|c| c.team).collect();

    let population: Vec<_> = ratings
        .iter()
        .filter(|s| s.games_played() >= ctx.min_games_for_ranking)
        .filter(|s| match &ctx.conference_filter {
            Some(conf) => conference_of.get(&s.team).is_some_and(|c| c == conf),
            None => true,
        })
        .collect();

    if population.is_empty() {
        return Vec::new();
    }

    let records: Vec<QuadrantRecord> = population
        .iter()
        .map(|s| quadrants.get(&s.team).copied().unwrap_or_default())
        .collect();
    let win_pcts: Vec<f64> = population.iter().map(|s| s.overall.pct()).collect();
    let rpis: Vec<f64> = population.iter().map(|s| s.rpi).collect();
    let qwps: Vec<f64> = records.iter().map(|r| r.win_points(&ctx.quadrant_weights)).collect();

    let win_pct_ranks = ordinal_ranks(&win_pcts, true);
    let rpi_ranks = ordinal_ranks(&rpis, true);
    let qwp_ranks = ordinal_ranks(&qwps, true);

    let averages: Vec<f64> = (0..population.len())
        .map(|i| (win_pct_ranks[i] + rpi_ranks[i] + qwp_ranks[i]) as f64 / 3.0)
        .collect();
    let pcr = ordinal_ranks(&averages, false);

    let is_champion: Vec<bool> = population.iter().map(|s| champion_ids.contains(&s.team)).collect();
    let pr = projected_ranks(&pcr, &is_champion, ctx.field_size);

    let mut results: Vec<RankingResult> = population
        .iter()
        .enumerate()
        .map(|(i, s)| RankingResult {
            team: s.team,
            pcr: pcr[i],
            pr: pr[i],
            win_pct_rank: win_pct_ranks[i],
            rpi_rank: rpi_ranks[i],
            qwp_rank: qwp_ranks[i],
            average_rank: averages[i],
            overall_win_pct: win_pcts[i],
            rpi: rpis[i],
            qwp: qwps[i],
            quadrants: records[i],
            champion: is_champion[i],
        })
        .collect();

    results.sort_by_key(|r| r.pr);
    results
}

/// Automatic qualifier bumping. Champions outside the field, best PCR first, trade places with
/// the worst-ranked non-champions inside it. Each swap exchanges the two ranks exactly.
/// Champions left over once the field runs out of non-champions stay outside.
pub fn projected_ranks(pcr: &[usize], is_champion: &[bool], field_size: usize) -> Vec<usize> {
    debug_assert_eq!(pcr.len(), is_champion.len());
    let mut pr = pcr.to_vec();

    let mut outside: Vec<usize> = (0..pcr.len()).filter(|&i| is_champion[i] && pcr[i] > field_size).collect();
    outside.sort_by_key(|&i| pcr[i]);

    let mut inside: Vec<usize> = (0..pcr.len()).filter(|&i| !is_champion[i] && pcr[i] <= field_size).collect();
    inside.sort_by_key(|&i| std::cmp::Reverse(pcr[i]));

    let swaps = outside.len().min(inside.len());
    for (&champ, &bumped) in outside.iter().zip(&inside) {
        pr.swap(champ, bumped);
    }

    if outside.len() > swaps {
        debug!(unplaced = outside.len() - swaps, "champions left outside the field");
    }

    pr
}
