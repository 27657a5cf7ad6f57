use std::collections::{HashMap, HashSet};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, trace};

use crate::data_loader::*;
use crate::ranking_context::RankingContext;
use crate::util::mean;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WinLoss {
    pub wins: u32,
    pub losses: u32,
}

impl WinLoss {
    pub fn add(&mut self, won: bool) {
        if won { self.wins += 1 } else { self.losses += 1 }
    }

    pub fn games(&self) -> u32 {
        self.wins + self.losses
    }

    pub fn pct(&self) -> f64 {
        if self.games() == 0 { return 0.0; }
        self.wins as f64 / self.games() as f64
    }
}

/// Everything the engine knows about one team after a run. Only teams with at least one
/// eligible game get a snapshot. Efficiency fields stay None when no eligible game has a box score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingSnapshot {
    pub team: TeamId,

    pub record: WinLoss,            // Eligible games only
    pub overall: WinLoss,           // Every opponent, members or not
    pub conference: WinLoss,
    pub home: WinLoss,
    pub away: WinLoss,
    pub neutral: WinLoss,
    pub points_for_per_game: f64,
    pub points_against_per_game: f64,

    pub win_pct: f64,
    pub owp: f64,
    pub oowp: f64,
    pub rpi: f64,
    pub sos: f64,

    pub raw_offense: Option<f64>,
    pub raw_defense: Option<f64>,
    pub adj_offense: Option<f64>,
    pub adj_defense: Option<f64>,
    pub pace: Option<f64>,
    pub osos: Option<f64>,
    pub dsos: Option<f64>,
    pub nsos: Option<f64>,
}

impl RatingSnapshot {
    pub fn games_played(&self) -> u32 {
        self.record.games()
    }

    pub fn net_rating(&self) -> Option<f64> {
        Some(self.adj_offense? - self.adj_defense?)
    }
}

/// Snapshots for a whole population, in team-list order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatingTable {
    order: Vec<TeamId>,
    snapshots: HashMap<TeamId, RatingSnapshot>,
    pub relaxation_rounds_run: usize,
}

impl RatingTable {
    /// None means "no eligible games", which is not the same as a rating of zero.
    pub fn get(&self, team: TeamId) -> Option<&RatingSnapshot> {
        self.snapshots.get(&team)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RatingSnapshot> {
        self.order.iter().filter_map(|id| self.snapshots.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// RPI rank (1 = best) per rated team. Equal RPI keeps team-list order.
    pub fn rpi_ranks(&self) -> HashMap<TeamId, usize> {
        let rpis: Vec<f64> = self.iter().map(|s| s.rpi).collect();
        let ranks = crate::util::ordinal_ranks(&rpis, true);
        self.iter().map(|s| s.team).zip(ranks).collect()
    }
}

// Per team schedule restricted to games that count toward the ranked population
struct Schedules<'a> {
    eligible: HashMap<TeamId, Vec<&'a GameResult>>,
    all: HashMap<TeamId, Vec<&'a GameResult>>,
}

fn build_schedules<'a>(teams: &[Team], games: &'a [GameResult]) -> Schedules<'a> {
    let members: HashSet<TeamId> = teams.iter().filter(|t| t.eligible).map(|t| t.id).collect();

    let mut eligible: HashMap<TeamId, Vec<&GameResult>> = HashMap::new();
    let mut all: HashMap<TeamId, Vec<&GameResult>> = HashMap::new();
    let mut unresolved = 0usize;

    for g in games {
        all.entry(g.team).or_default().push(g);

        if !g.eligible || !members.contains(&g.team) { continue; }
        match g.opponent {
            Some(o) if members.contains(&o) => eligible.entry(g.team).or_default().push(g),
            _ => unresolved += 1,
        }
    }

    debug!(unresolved, "records left out of RPI math (opponent not a ranked member)");
    Schedules { eligible, all }
}

pub fn compute_ratings(teams: &[Team], games: &[GameResult], ctx: &RankingContext) -> RatingTable {
    let schedules = build_schedules(teams, games);

    // Phase 1: records. Everything after depends on the complete population.
    let mut records: HashMap<TeamId, WinLoss> = HashMap::new();
    for (&id, sched) in &schedules.eligible {
        let rec = records.entry(id).or_default();
        for g in sched { rec.add(g.won()); }
    }

    let owp: HashMap<TeamId, f64> = schedules.eligible.iter()
        .map(|(&id, sched)| (id, opponents_win_pct(sched, &records)))
        .collect();

    // OOWP only once OWP exists for everyone
    let oowp: HashMap<TeamId, f64> = schedules.eligible.iter()
        .map(|(&id, sched)| {
            let opp_owps: Vec<f64> = sched.iter().filter_map(|g| owp.get(&g.opponent?).copied()).collect();
            (id, mean(&opp_owps).unwrap_or(0.0))
        })
        .collect();

    // Phase 2: efficiency
    let raw = raw_efficiencies(&schedules.eligible, ctx);
    let (adjusted, rounds_run) = relax_adjusted_ratings(&raw, &schedules.eligible, ctx);

    let mut table = RatingTable { relaxation_rounds_run: rounds_run, ..RatingTable::default() };

    for team in teams {
        let Some(sched) = schedules.eligible.get(&team.id) else {
            trace!(team = team.id, "no eligible games, no snapshot");
            continue;
        };

        let record = records[&team.id];
        let win_pct = record.pct();
        let team_owp = owp[&team.id];
        let team_oowp = oowp[&team.id];

        let mut snapshot = RatingSnapshot {
            team: team.id,
            record,
            overall: WinLoss::default(),
            conference: WinLoss::default(),
            home: WinLoss::default(),
            away: WinLoss::default(),
            neutral: WinLoss::default(),
            points_for_per_game: 0.0,
            points_against_per_game: 0.0,

            win_pct,
            owp: team_owp,
            oowp: team_oowp,
            rpi: ctx.rpi_win_pct_weight * win_pct + ctx.rpi_owp_weight * team_owp + ctx.rpi_oowp_weight * team_oowp,
            sos: ctx.sos_owp_weight * team_owp + ctx.sos_oowp_weight * team_oowp,

            raw_offense: raw.get(&team.id).map(|r| r.offense),
            raw_defense: raw.get(&team.id).map(|r| r.defense),
            adj_offense: adjusted.get(&team.id).map(|r| r.offense),
            adj_defense: adjusted.get(&team.id).map(|r| r.defense),
            pace: raw.get(&team.id).and_then(|r| r.pace),
            osos: None,
            dsos: None,
            nsos: None,
        };

        fill_splits(&mut snapshot, sched, schedules.all.get(&team.id).map(Vec::as_slice).unwrap_or(&[]));

        let opp_ratings: Vec<Efficiency> = sched.iter().filter_map(|g| adjusted.get(&g.opponent?).copied()).collect();
        if !opp_ratings.is_empty() {
            let n = opp_ratings.len() as f64;
            let osos = opp_ratings.iter().map(|r| r.offense).sum::<f64>() / n;
            let dsos = opp_ratings.iter().map(|r| r.defense).sum::<f64>() / n;
            snapshot.osos = Some(osos);
            snapshot.dsos = Some(dsos);
            snapshot.nsos = Some(osos - dsos);
        }

        table.order.push(team.id);
        table.snapshots.insert(team.id, snapshot);
    }

    debug!(rated = table.len(), rounds_run, "ratings computed");
    table
}

// Every opponent's full record, once per game played against them, minus this team's own
// games against those opponents, subtracted once at the end.
fn opponents_win_pct(schedule: &[&GameResult], records: &HashMap<TeamId, WinLoss>) -> f64 {
    let mut opp_wins = 0i64;
    let mut opp_games = 0i64;
    let mut h2h_opp_wins = 0i64;
    let mut h2h_games = 0i64;

    for g in schedule {
        let Some(opp) = g.opponent.and_then(|o| records.get(&o)) else { continue };
        opp_wins += opp.wins as i64;
        opp_games += opp.games() as i64;
        h2h_games += 1;
        if !g.won() { h2h_opp_wins += 1; }
    }

    let denominator = opp_games - h2h_games;
    if denominator <= 0 { return 0.0; }
    (opp_wins - h2h_opp_wins) as f64 / denominator as f64
}

fn fill_splits(snapshot: &mut RatingSnapshot, eligible: &[&GameResult], all: &[&GameResult]) {
    for g in eligible {
        match g.location {
            Location::Home => snapshot.home.add(g.won()),
            Location::Away => snapshot.away.add(g.won()),
            Location::Neutral => snapshot.neutral.add(g.won()),
        }
        if g.conference_game { snapshot.conference.add(g.won()); }
    }

    let mut points_for = 0u64;
    let mut points_against = 0u64;
    for g in all {
        snapshot.overall.add(g.won());
        points_for += g.team_score as u64;
        points_against += g.opponent_score as u64;
    }

    if !all.is_empty() {
        snapshot.points_for_per_game = points_for as f64 / all.len() as f64;
        snapshot.points_against_per_game = points_against as f64 / all.len() as f64;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Efficiency {
    offense: f64,
    defense: f64,
    pace: Option<f64>,
}

// Points per 100 possessions over box-scored games. Efficiency uses the possession coefficient,
// pace the pace coefficient.
fn raw_efficiencies(
    schedules: &HashMap<TeamId, Vec<&GameResult>>,
    ctx: &RankingContext,
) -> HashMap<TeamId, Efficiency> {
    let mut out = HashMap::new();

    for (&id, sched) in schedules {
        let mut points_for = 0.0;
        let mut points_against = 0.0;
        let mut possessions = 0.0;
        let mut opp_possessions = 0.0;
        let mut pace_samples = Vec::new();

        for g in sched {
            let Some(team_box) = g.team_box else { continue };
            let poss = team_box.possessions(ctx.possession_ft_coefficient);
            let opp_poss = g.opponent_box.map(|b| b.possessions(ctx.possession_ft_coefficient)).unwrap_or(poss);

            points_for += g.team_score as f64;
            points_against += g.opponent_score as f64;
            possessions += poss;
            opp_possessions += opp_poss;
            pace_samples.push(team_box.possessions(ctx.pace_ft_coefficient));
        }

        if possessions <= 0.0 || opp_possessions <= 0.0 { continue; }

        out.insert(id, Efficiency {
            offense: 100.0 * points_for / possessions,
            defense: 100.0 * points_against / opp_possessions,
            pace: mean(&pace_samples),
        });
    }

    out
}

// Opponent-adjusts the raw ratings. Each round reads only the previous round, so per-team work
// within a round runs in parallel. Fixed round count unless a convergence tolerance is set.
fn relax_adjusted_ratings(
    raw: &HashMap<TeamId, Efficiency>,
    schedules: &HashMap<TeamId, Vec<&GameResult>>,
    ctx: &RankingContext,
) -> (HashMap<TeamId, Efficiency>, usize) {
    let mut rated: Vec<TeamId> = raw.keys().copied().collect();
    rated.sort_unstable();

    let mut current = raw.clone();
    if rated.is_empty() { return (current, 0); }

    let max_rounds = match ctx.convergence_tolerance {
        Some(_) => ctx.max_convergence_rounds,
        None => ctx.relaxation_rounds,
    };
    let half_shift = ctx.home_court_shift / 2.0;

    let mut rounds_run = 0;
    while rounds_run < max_rounds {
        let n = rated.len() as f64;
        let league_offense = rated.iter().map(|id| current[id].offense).sum::<f64>() / n;
        let league_defense = rated.iter().map(|id| current[id].defense).sum::<f64>() / n;

        let next: HashMap<TeamId, Efficiency> = rated
            .par_iter()
            .map(|&id| {
                let own_raw = raw[&id];
                let mut opp_offense = Vec::new();
                let mut opp_defense = Vec::new();

                for g in schedules.get(&id).map(Vec::as_slice).unwrap_or(&[]) {
                    let Some(opp) = g.opponent.and_then(|o| current.get(&o)) else { continue };
                    // A road opponent scores less and defends worse than its rating says
                    let shift = match g.location {
                        Location::Home => half_shift,
                        Location::Away => -half_shift,
                        Location::Neutral => 0.0,
                    };
                    opp_offense.push(opp.offense - shift);
                    opp_defense.push(opp.defense + shift);
                }

                let adjusted = match (mean(&opp_offense), mean(&opp_defense)) {
                    (Some(avg_opp_offense), Some(avg_opp_defense)) => Efficiency {
                        offense: own_raw.offense + ctx.damping * (league_defense - avg_opp_defense),
                        defense: own_raw.defense - ctx.damping * (avg_opp_offense - league_offense),
                        pace: own_raw.pace,
                    },
                    _ => own_raw,
                };
                (id, adjusted)
            })
            .collect();

        let max_delta = rated
            .iter()
            .map(|id| {
                let (a, b) = (current[id], next[id]);
                (a.offense - b.offense).abs().max((a.defense - b.defense).abs())
            })
            .fold(0.0, f64::max);

        current = next;
        rounds_run += 1;
        trace!(round = rounds_run, max_delta, "relaxation round");

        if ctx.convergence_tolerance.is_some_and(|tol| max_delta < tol) { break; }
    }

    (current, rounds_run)
}
