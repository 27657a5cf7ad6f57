use std::env;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::error::{EngineError, Result};
use crate::quadrant::QuadrantBands;

/// Every tunable of a run lives here. Change the model by changing the context,
/// never by editing the stages.
#[derive(Debug, Clone)]
pub struct RankingContext {
    pub season: Option<u16>,
    pub as_of: Option<NaiveDate>,     // Inclusive. Later games are ignored

    // Adjusted efficiency relaxation
    pub relaxation_rounds: usize,
    pub convergence_tolerance: Option<f64>, // Some switches to the convergence mode
    pub max_convergence_rounds: usize,
    pub home_court_shift: f64,
    pub damping: f64,

    // Free throw weight in possessions: efficiency uses one, pace the other
    pub possession_ft_coefficient: f64,
    pub pace_ft_coefficient: f64,

    pub rpi_win_pct_weight: f64,
    pub rpi_owp_weight: f64,
    pub rpi_oowp_weight: f64,
    pub sos_owp_weight: f64,
    pub sos_oowp_weight: f64,

    pub quadrant_weights: [f64; 4],
    pub quadrant_bands: QuadrantBands,
    pub quadrant_reference_population: Option<usize>, // None uses the bands as absolute ranks

    pub conference_filter: Option<String>,
    pub min_games_for_ranking: u32,

    pub champion_days_before_peak: i64,
    pub champion_days_after_peak: i64,
    pub champion_max_gap_days: i64,

    pub field_size: usize,
    pub pod_visitor_cap: usize,
}

impl Default for RankingContext {
    fn default() -> Self {
        Self {
            season: None,
            as_of: None,

            relaxation_rounds: 5,
            convergence_tolerance: None,
            max_convergence_rounds: 100,
            home_court_shift: 3.5,
            damping: 0.4,

            possession_ft_coefficient: 0.475,
            pace_ft_coefficient: 0.44,

            rpi_win_pct_weight: 0.30,
            rpi_owp_weight: 0.50,
            rpi_oowp_weight: 0.20,
            sos_owp_weight: 0.67,
            sos_oowp_weight: 0.33,

            quadrant_weights: [4.0, 2.0, 1.0, 0.5],
            quadrant_bands: QuadrantBands::default(),
            quadrant_reference_population: Some(360),

            conference_filter: None,
            min_games_for_ranking: 1,

            champion_days_before_peak: 1,
            champion_days_after_peak: 10,
            champion_max_gap_days: 4,

            field_size: 64,
            pod_visitor_cap: 3,
        }
    }
}

impl RankingContext {
    /// Defaults, overridden by any `SEEDING_*` variable that parses.
    pub fn from_env() -> Self {
        let mut ctx = Self::default();

        if let Some(rounds) = env_parse("SEEDING_RELAXATION_ROUNDS") {
            ctx.relaxation_rounds = rounds;
        }
        if let Some(shift) = env_parse("SEEDING_HOME_COURT_SHIFT") {
            ctx.home_court_shift = shift;
        }
        if let Some(damping) = env_parse("SEEDING_DAMPING") {
            ctx.damping = damping;
        }
        if let Some(field_size) = env_parse("SEEDING_FIELD_SIZE") {
            ctx.field_size = field_size;
        }
        if let Some(tolerance) = env_parse("SEEDING_CONVERGENCE_TOLERANCE") {
            ctx.convergence_tolerance = Some(tolerance);
        }
        ctx.season = env_parse("SEEDING_SEASON");
        ctx.as_of = env::var("SEEDING_AS_OF")
            .ok()
            .and_then(|v| NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d").ok());
        ctx.conference_filter = env::var("SEEDING_CONFERENCE").ok().filter(|c| !c.is_empty());

        ctx
    }

    pub fn validate(&self) -> Result<()> {
        if self.convergence_tolerance.is_none() && self.relaxation_rounds == 0 {
            return Err(EngineError::InvalidConfig("relaxation_rounds must be at least 1".into()));
        }
        if let Some(tolerance) = self.convergence_tolerance {
            if !(tolerance > 0.0) || self.max_convergence_rounds == 0 {
                return Err(EngineError::InvalidConfig(
                    "convergence mode needs a positive tolerance and a round cap".into(),
                ));
            }
        }
        if !self.damping.is_finite() || !self.home_court_shift.is_finite() {
            return Err(EngineError::InvalidConfig("damping and home court shift must be finite".into()));
        }
        if self.field_size == 0 || self.field_size % 4 != 0 {
            return Err(EngineError::InvalidConfig(format!(
                "field size {} does not split into four seed tiers",
                self.field_size
            )));
        }
        if self.quadrant_reference_population == Some(0) {
            return Err(EngineError::InvalidConfig("quadrant reference population must be positive".into()));
        }
        Ok(())
    }

    pub fn tier_size(&self) -> usize {
        self.field_size / 4
    }

    /// Bands in effect for a ranked population of `population` teams.
    pub fn effective_bands(&self, population: usize) -> QuadrantBands {
        match self.quadrant_reference_population {
            Some(reference) => self.quadrant_bands.scaled(population, reference),
            None => self.quadrant_bands,
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_tunables() {
        let ctx = RankingContext::default();
        assert_eq!(ctx.relaxation_rounds, 5);
        assert_eq!(ctx.home_court_shift, 3.5);
        assert_eq!(ctx.damping, 0.4);
        assert_eq!(ctx.quadrant_weights, [4.0, 2.0, 1.0, 0.5]);
        assert_eq!(ctx.possession_ft_coefficient, 0.475);
        assert_eq!(ctx.pace_ft_coefficient, 0.44);
        assert_eq!(ctx.field_size, 64);
        assert_eq!(ctx.tier_size(), 16);
        assert!(ctx.validate().is_ok());
    }

    #[test]
    fn rejects_field_that_cannot_split_into_tiers() {
        let ctx = RankingContext { field_size: 30, ..RankingContext::default() };
        assert!(matches!(ctx.validate(), Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_zero_rounds_in_fixed_mode() {
        let ctx = RankingContext { relaxation_rounds: 0, ..RankingContext::default() };
        assert!(ctx.validate().is_err());

        let converging = RankingContext {
            relaxation_rounds: 0,
            convergence_tolerance: Some(1e-6),
            ..RankingContext::default()
        };
        assert!(converging.validate().is_ok());
    }
}
