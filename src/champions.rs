use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::data_loader::{GameResult, Team, TeamId};
use crate::ranking_context::RankingContext;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConferenceChampion {
    pub conference: String,
    pub team: TeamId,
    pub title_game_date: NaiveDate,
}

/// Conference tournament winners, one per conference at most, in conference name order.
/// National tournament and regular season records are ignored. A conference without
/// postseason games simply has no entry.
pub fn detect_champions(teams: &[Team], games: &[GameResult], ctx: &RankingContext) -> Vec<ConferenceChampion> {
    let conference_of: HashMap<TeamId, &str> = teams.iter().map(|t| (t.id, t.conference.as_str())).collect();

    let mut by_conference: BTreeMap<&str, Vec<&GameResult>> = BTreeMap::new();
    for g in games {
        if !g.postseason || g.national_tournament { continue; }
        let Some(&conference) = conference_of.get(&g.team) else { continue };
        by_conference.entry(conference).or_default().push(g);
    }

    let mut champions = Vec::new();
    for (conference, conference_games) in by_conference {
        match conference_champion(&conference_games, ctx) {
            Some((team, title_game_date)) => champions.push(ConferenceChampion {
                conference: conference.to_string(),
                team,
                title_game_date,
            }),
            None => debug!(conference, "postseason games found but no resolvable champion"),
        }
    }

    debug!(champions = champions.len(), "conference champions detected");
    champions
}

fn conference_champion(games: &[&GameResult], ctx: &RankingContext) -> Option<(TeamId, NaiveDate)> {
    // Distinct teams per date, from both sides of each record
    let mut teams_on: BTreeMap<NaiveDate, BTreeSet<TeamId>> = BTreeMap::new();
    for g in games {
        let entry = teams_on.entry(g.date).or_default();
        entry.insert(g.team);
        if let Some(o) = g.opponent { entry.insert(o); }
    }

    // Main bracket opening round: busiest date, earliest on ties
    let (&peak, _) = teams_on
        .iter()
        .max_by(|a, b| a.1.len().cmp(&b.1.len()).then(b.0.cmp(a.0)))?;

    let window_start = peak - chrono::Duration::days(ctx.champion_days_before_peak);
    let window_end = peak + chrono::Duration::days(ctx.champion_days_after_peak);
    let active: Vec<NaiveDate> = teams_on.range(window_start..=window_end).map(|(&d, _)| d).collect();

    // The run of closely spaced dates around the peak. Drops a qualifier played well before it.
    let peak_idx = active.iter().position(|&d| d == peak)?;
    let close = |i: usize| (active[i + 1] - active[i]).num_days() <= ctx.champion_max_gap_days;
    let mut first = peak_idx;
    while first > 0 && close(first - 1) { first -= 1; }
    let mut last = peak_idx;
    while last + 1 < active.len() && close(last) { last += 1; }

    let final_date = active[first..=last]
        .iter()
        .rev()
        .find(|d| teams_on[*d].len() >= 2)
        .copied()?;

    // Several games on the title date: the last record entered decides
    games
        .iter()
        .filter(|g| g.date == final_date)
        .filter_map(|g| g.winner())
        .last()
        .map(|team| (team, final_date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_loader::Location;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn post(date: NaiveDate, winner: TeamId, loser: TeamId) -> Vec<GameResult> {
        let mut g = GameResult::new(date, winner, Some(loser), 75, 70, Location::Neutral);
        g.postseason = true;
        let m = g.mirrored().unwrap();
        vec![g, m]
    }

    fn conference(ids: std::ops::RangeInclusive<TeamId>, name: &str) -> Vec<Team> {
        ids.map(|id| Team::new(id, &format!("T{id}"), name)).collect()
    }

    // Eight team bracket: quarterfinals on the 5th, semis on the 7th, final on the 9th
    fn bracket_games() -> Vec<GameResult> {
        let mut games = Vec::new();
        games.extend(post(day(3, 5), 1, 8));
        games.extend(post(day(3, 5), 2, 7));
        games.extend(post(day(3, 5), 3, 6));
        games.extend(post(day(3, 5), 4, 5));
        games.extend(post(day(3, 7), 1, 4));
        games.extend(post(day(3, 7), 2, 3));
        games.extend(post(day(3, 9), 2, 1));
        games
    }

    #[test]
    fn final_winner_is_champion() {
        let teams = conference(1..=8, "GLIAC");
        let champs = detect_champions(&teams, &bracket_games(), &RankingContext::default());
        assert_eq!(champs, vec![ConferenceChampion {
            conference: "GLIAC".into(),
            team: 2,
            title_game_date: day(3, 9),
        }]);
    }

    #[test]
    fn early_qualifier_and_national_tournament_are_ignored() {
        let teams = conference(1..=10, "GLIAC");
        let mut games = bracket_games();
        // Play-in two weeks before the bracket sits outside the window
        games.extend(post(day(2, 20), 9, 10));
        // A national tournament game after the final must not count
        let mut national = post(day(3, 14), 1, 2);
        for g in &mut national { g.national_tournament = true; }
        games.extend(national);

        let champs = detect_champions(&teams, &games, &RankingContext::default());
        assert_eq!(champs[0].team, 2);
    }

    #[test]
    fn qualifier_inside_window_but_detached_is_dropped() {
        let teams = conference(1..=12, "NE10");
        let mut games = Vec::new();
        // Busiest date is the 10th; a lone qualifier on the 9th is inside the window and kept,
        // but a late consolation game eight days after the final run is detached
        games.extend(post(day(3, 10), 1, 8));
        games.extend(post(day(3, 10), 2, 7));
        games.extend(post(day(3, 10), 3, 6));
        games.extend(post(day(3, 10), 4, 5));
        games.extend(post(day(3, 9), 5, 11));
        games.extend(post(day(3, 12), 1, 2));
        games.extend(post(day(3, 20), 9, 10));

        let champs = detect_champions(&teams, &games, &RankingContext::default());
        assert_eq!(champs[0].team, 1);
        assert_eq!(champs[0].title_game_date, day(3, 12));
    }

    #[test]
    fn regular_season_only_means_no_champion() {
        let teams = conference(1..=4, "PSAC");
        let games = vec![GameResult::new(day(1, 10), 1, Some(2), 80, 70, Location::Home)];
        assert!(detect_champions(&teams, &games, &RankingContext::default()).is_empty());
        assert!(detect_champions(&teams, &[], &RankingContext::default()).is_empty());
    }

    #[test]
    fn same_date_tie_goes_to_last_record() {
        let teams = conference(1..=4, "CACC");
        let mut games = Vec::new();
        games.extend(post(day(3, 1), 1, 4));
        games.extend(post(day(3, 1), 2, 3));
        games.extend(post(day(3, 3), 1, 2));
        // Second game on the final date, entered after the real final
        games.extend(post(day(3, 3), 3, 4));

        let champs = detect_champions(&teams, &games, &RankingContext::default());
        assert_eq!(champs[0].team, 3);
    }

    #[test]
    fn conferences_are_independent() {
        let mut teams = conference(1..=8, "GLIAC");
        teams.extend(conference(20..=21, "GNAC"));
        let mut games = bracket_games();
        games.extend(post(day(3, 2), 21, 20));

        let champs = detect_champions(&teams, &games, &RankingContext::default());
        assert_eq!(champs.len(), 2);
        assert_eq!(champs[0].conference, "GLIAC");
        assert_eq!(champs[1].team, 21);
    }
}
