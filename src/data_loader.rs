use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::*;
use serde_aux::field_attributes::{deserialize_number_from_string, deserialize_option_number_from_string};
use tracing::{debug, info};

use crate::error::{EngineError, Result};

pub type TeamId = usize;

// Loads the ledger written by the importer. Records are validated here, so anything past this
// point can trust that every game has two scores and exactly one winner.
pub fn load_ledger(file_path: &Path) -> Result<Ledger> {
    let data = fs::read_to_string(file_path)?;
    let ledger = Ledger::from_json(&data)?;

    info!(
        path = %file_path.display(),
        teams = ledger.teams.len(),
        games = ledger.games.len(),
        "loaded game ledger"
    );

    Ok(ledger)
}

#[derive(Debug, Clone)]
pub struct Ledger {
    pub teams: Vec<Team>,
    pub games: Vec<GameResult>,
}

impl Ledger {
    pub fn from_json(data: &str) -> Result<Self> {
        let raw: LedgerData = serde_json::from_str(data)?;
        let games = raw
            .games
            .into_iter()
            .map(JsonGame::into_result)
            .collect::<Result<Vec<_>>>()?;

        let ledger = Self { teams: raw.teams, games };
        ledger.validate()?;
        Ok(ledger)
    }

    pub fn validate(&self) -> Result<()> {
        validate_records(&self.teams, &self.games)
    }
}

/// Team ids are unique, every record belongs to a listed team and has a winner, and a game
/// between two listed teams is recorded once from each side with matching scores and locations.
/// Opponents outside the list need no mirror and never count toward the ranked population.
pub fn validate_records(teams: &[Team], games: &[GameResult]) -> Result<()> {
    let mut seen = HashSet::with_capacity(teams.len());
    for t in teams {
        if !seen.insert(t.id) {
            return Err(EngineError::DuplicateTeam(t.id));
        }
    }

    let mut unresolved = 0;
    for g in games {
        if !seen.contains(&g.team) {
            return Err(EngineError::UnknownTeam(g.team));
        }
        g.validate()?;
        if g.opponent.is_some_and(|o| !seen.contains(&o)) {
            unresolved += 1;
        }
    }

    if unresolved > 0 {
        debug!(unresolved, "records against opponents outside the team list");
    }

    check_mirrors(&seen, games)
}

// Games between two listed teams must appear once from each side, and the sides must agree.
fn check_mirrors(listed: &HashSet<TeamId>, games: &[GameResult]) -> Result<()> {
    let mut sides: BTreeMap<(NaiveDate, TeamId, TeamId), Vec<&GameResult>> = BTreeMap::new();
    for g in games {
        let Some(opponent) = g.opponent.filter(|o| listed.contains(o)) else { continue };
        sides.entry((g.date, g.team, opponent)).or_default().push(g);
    }

    for (&(date, team, opponent), ours) in &sides {
        let theirs = sides.get(&(date, opponent, team)).map(Vec::as_slice).unwrap_or(&[]);
        if ours.len() != theirs.len() {
            return Err(EngineError::UnmatchedRecord { team, opponent, date, ours: ours.len(), theirs: theirs.len() });
        }
        if ours.iter().any(|g| !theirs.iter().any(|m| g.mirrors(m))) {
            return Err(EngineError::InconsistentMirror { team, opponent, date });
        }
    }

    Ok(())
}

#[derive(Deserialize, Debug)]
struct LedgerData {
    teams: Vec<Team>,
    games: Vec<JsonGame>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Team {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub id: TeamId,
    pub name: String,
    pub conference: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default = "default_true")]
    pub eligible: bool,
}

impl Team {
    pub fn new(id: TeamId, name: &str, conference: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            conference: conference.to_string(),
            latitude: None,
            longitude: None,
            eligible: true,
        }
    }

    pub fn at(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Home,
    Away,
    Neutral,
}

impl Location {
    /// The same game seen from the other bench.
    pub fn flip(self) -> Self {
        match self {
            Location::Home => Location::Away,
            Location::Away => Location::Home,
            Location::Neutral => Location::Neutral,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct BoxScore {
    #[serde(rename(deserialize = "fga"))]
    pub field_goal_attempts: u32,
    #[serde(rename(deserialize = "oreb"))]
    pub offensive_rebounds: u32,
    #[serde(rename(deserialize = "to"))]
    pub turnovers: u32,
    #[serde(rename(deserialize = "fta"))]
    pub free_throw_attempts: u32,
}

impl BoxScore {
    pub fn possessions(&self, ft_coefficient: f64) -> f64 {
        self.field_goal_attempts as f64 - self.offensive_rebounds as f64
            + self.turnovers as f64
            + ft_coefficient * self.free_throw_attempts as f64
    }
}

// Ledger representation. Scores stay optional until validated.
#[derive(Deserialize, Debug, Clone)]
struct JsonGame {
    date: NaiveDate,
    season: u16,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    team: TeamId,
    #[serde(default, deserialize_with = "deserialize_option_number_from_string")]
    opponent: Option<TeamId>,
    #[serde(rename(deserialize = "teamScore"), default)]
    team_score: Option<u32>,
    #[serde(rename(deserialize = "opponentScore"), default)]
    opponent_score: Option<u32>,
    location: Location,
    #[serde(rename(deserialize = "isConferenceGame"), default)]
    conference_game: bool,
    #[serde(default = "default_true")]
    eligible: bool,
    #[serde(default)]
    postseason: bool,
    #[serde(rename(deserialize = "nationalTournament"), default)]
    national_tournament: bool,
    #[serde(rename(deserialize = "teamBox"), default)]
    team_box: Option<BoxScore>,
    #[serde(rename(deserialize = "opponentBox"), default)]
    opponent_box: Option<BoxScore>,
}

impl JsonGame {
    fn into_result(self) -> Result<GameResult> {
        let (Some(team_score), Some(opponent_score)) = (self.team_score, self.opponent_score) else {
            return Err(EngineError::MissingScore { team: self.team, date: self.date });
        };

        let game = GameResult {
            date: self.date,
            season: self.season,
            team: self.team,
            opponent: self.opponent,
            team_score,
            opponent_score,
            location: self.location,
            conference_game: self.conference_game,
            eligible: self.eligible,
            postseason: self.postseason,
            national_tournament: self.national_tournament,
            team_box: self.team_box,
            opponent_box: self.opponent_box,
        };
        game.validate()?;
        Ok(game)
    }
}

/// One completed game seen from one team's side. Every game between two members appears twice.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct GameResult {
    pub date: NaiveDate,
    pub season: u16,
    pub team: TeamId,
    pub opponent: Option<TeamId>,
    pub team_score: u32,
    pub opponent_score: u32,
    pub location: Location,
    pub conference_game: bool,
    pub eligible: bool,
    pub postseason: bool,
    pub national_tournament: bool,
    pub team_box: Option<BoxScore>,
    pub opponent_box: Option<BoxScore>,
}

impl GameResult {
    pub fn new(
        date: NaiveDate,
        team: TeamId,
        opponent: Option<TeamId>,
        team_score: u32,
        opponent_score: u32,
        location: Location,
    ) -> Self {
        Self {
            date,
            season: 0,
            team,
            opponent,
            team_score,
            opponent_score,
            location,
            conference_game: false,
            eligible: true,
            postseason: false,
            national_tournament: false,
            team_box: None,
            opponent_box: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.team_score == self.opponent_score {
            return Err(EngineError::TiedScore {
                team: self.team,
                date: self.date,
                score: self.team_score,
            });
        }
        Ok(())
    }

    pub fn won(&self) -> bool {
        self.team_score > self.opponent_score
    }

    /// Winner's id, if the winner is a known team.
    pub fn winner(&self) -> Option<TeamId> {
        if self.won() { Some(self.team) } else { self.opponent }
    }

    /// True when `other` is this game seen from the opponent's bench.
    pub fn mirrors(&self, other: &GameResult) -> bool {
        self.date == other.date
            && other.opponent == Some(self.team)
            && self.opponent == Some(other.team)
            && other.team_score == self.opponent_score
            && other.opponent_score == self.team_score
            && other.location == self.location.flip()
    }

    /// The opponent's record of this game. None when the opponent is not a member.
    pub fn mirrored(&self) -> Option<Self> {
        let opponent = self.opponent?;
        Some(Self {
            team: opponent,
            opponent: Some(self.team),
            team_score: self.opponent_score,
            opponent_score: self.team_score,
            location: self.location.flip(),
            team_box: self.opponent_box,
            opponent_box: self.team_box,
            ..self.clone()
        })
    }
}

fn default_true() -> bool { true }
