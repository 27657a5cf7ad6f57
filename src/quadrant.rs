use std::collections::HashMap;

use serde::Serialize;

use crate::data_loader::{GameResult, Location, TeamId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Quadrant {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quadrant {
    pub fn index(self) -> usize {
        match self {
            Quadrant::Q1 => 0,
            Quadrant::Q2 => 1,
            Quadrant::Q3 => 2,
            Quadrant::Q4 => 3,
        }
    }
}

/// Inclusive upper rank bounds of Q1, Q2 and Q3 for one location. Everything past the last is Q4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band(pub [usize; 3]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuadrantBands {
    pub home: Band,
    pub neutral: Band,
    pub away: Band,
}

impl Default for QuadrantBands {
    // Calibrated against a 360 team population
    fn default() -> Self {
        Self {
            home: Band([30, 75, 160]),
            neutral: Band([50, 100, 200]),
            away: Band([75, 135, 240]),
        }
    }
}

impl QuadrantBands {
    /// Rescales every cutoff from a `reference` sized population to `population`, rounding up.
    pub fn scaled(&self, population: usize, reference: usize) -> Self {
        let scale = |band: Band| {
            Band(band.0.map(|cutoff| (cutoff * population).div_ceil(reference)))
        };

        Self {
            home: scale(self.home),
            neutral: scale(self.neutral),
            away: scale(self.away),
        }
    }

    fn band(&self, location: Location) -> Band {
        match location {
            Location::Home => self.home,
            Location::Neutral => self.neutral,
            Location::Away => self.away,
        }
    }
}

/// Quadrant of a game against an opponent ranked `opponent_rank` (1 = best), seen from the
/// team playing at `location`. Unranked opponents are always Q4.
pub fn classify(opponent_rank: Option<usize>, location: Location, bands: &QuadrantBands) -> Quadrant {
    let Some(rank) = opponent_rank else { return Quadrant::Q4 };
    let Band([q1, q2, q3]) = bands.band(location);

    if rank <= q1 {
        Quadrant::Q1
    } else if rank <= q2 {
        Quadrant::Q2
    } else if rank <= q3 {
        Quadrant::Q3
    } else {
        Quadrant::Q4
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct QuadrantRecord {
    pub wins: [u32; 4],
    pub losses: [u32; 4],
}

impl QuadrantRecord {
    pub fn record(&mut self, quadrant: Quadrant, won: bool) {
        if won {
            self.wins[quadrant.index()] += 1;
        } else {
            self.losses[quadrant.index()] += 1;
        }
    }

    /// Quadrant win points. Losses never subtract.
    pub fn win_points(&self, weights: &[f64; 4]) -> f64 {
        self.wins.iter().zip(weights).map(|(&w, weight)| w as f64 * weight).sum()
    }
}

/// Tallies every record of every team in `teams`. Games against opponents without an RPI rank
/// (non-members, teams with no eligible games) land in Q4.
pub fn quadrant_records(
    games: &[GameResult],
    rpi_ranks: &HashMap<TeamId, usize>,
    bands: &QuadrantBands,
) -> HashMap<TeamId, QuadrantRecord> {
    let mut records: HashMap<TeamId, QuadrantRecord> = HashMap::new();

    for g in games {
        let opponent_rank = g.opponent.and_then(|o| rpi_ranks.get(&o).copied());
        let quadrant = classify(opponent_rank, g.location, bands);
        records.entry(g.team).or_default().record(quadrant, g.won());
    }

    records
}
