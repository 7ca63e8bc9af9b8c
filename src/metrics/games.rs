//! Game results seen from one team
//!
//! Filters are free functions over a single slice of [`TeamGame`]s; the
//! run-differential log keeps running totals over date-ordered games.

use crate::data::normalize::GameRecord;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

/// A game from the subject team's side
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamGame {
    pub date: NaiveDate,
    pub team: String,
    pub opponent: String,
    pub runs_scored: u32,
    pub runs_allowed: u32,
    pub field: String,
}

impl TeamGame {
    /// The subject's view of a game, or None when the subject did not play in it
    pub fn from_record(game: &GameRecord, team: &str) -> Option<Self> {
        let (opponent, scored, allowed) = if same_team(&game.team_1, team) {
            (&game.team_2, game.team_1_score, game.team_2_score)
        } else if same_team(&game.team_2, team) {
            (&game.team_1, game.team_2_score, game.team_1_score)
        } else {
            return None;
        };
        Some(TeamGame {
            date: game.date,
            team: team.to_string(),
            opponent: opponent.clone(),
            runs_scored: scored,
            runs_allowed: allowed,
            field: game.field.clone(),
        })
    }

    pub fn run_difference(&self) -> i64 {
        self.runs_scored as i64 - self.runs_allowed as i64
    }

    pub fn is_win(&self) -> bool {
        self.runs_scored > self.runs_allowed
    }

    pub fn is_loss(&self) -> bool {
        self.runs_scored < self.runs_allowed
    }

    pub fn season(&self) -> u16 {
        self.date.year() as u16
    }
}

fn same_team(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Every game involving `team`, stably ordered by date
pub fn team_games(games: &[GameRecord], team: &str) -> Vec<TeamGame> {
    let mut out: Vec<TeamGame> = games
        .iter()
        .filter_map(|g| TeamGame::from_record(g, team))
        .collect();
    out.sort_by_key(|g| g.date);
    out
}

pub fn wins(games: &[TeamGame]) -> Vec<&TeamGame> {
    games.iter().filter(|g| g.is_win()).collect()
}

pub fn losses(games: &[TeamGame]) -> Vec<&TeamGame> {
    games.iter().filter(|g| g.is_loss()).collect()
}

pub fn against<'a>(games: &'a [TeamGame], opponent: &str) -> Vec<&'a TeamGame> {
    games
        .iter()
        .filter(|g| same_team(&g.opponent, opponent))
        .collect()
}

/// Games against other members of `conference`
pub fn in_conference<'a>(games: &'a [TeamGame], conference: &[&str]) -> Vec<&'a TeamGame> {
    games
        .iter()
        .filter(|g| {
            conference
                .iter()
                .any(|member| same_team(member, &g.opponent) && !same_team(member, &g.team))
        })
        .collect()
}

/// When cumulative sums start over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CumulativeReset {
    PerSeason,
    Continuous,
}

/// Running totals up to and including one game
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunningTotals {
    pub runs_scored: u32,
    pub runs_allowed: u32,
    pub run_difference: i64,
}

/// One line of a run-differential log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameLogEntry {
    pub game: TeamGame,
    pub season: u16,
    /// 1-based, restarts every season
    pub game_number: u32,
    pub cumulative: RunningTotals,
}

/// Running game number and cumulative run totals over date-ordered games
pub fn run_differential_log(games: &[TeamGame], reset: CumulativeReset) -> Vec<GameLogEntry> {
    let mut ordered: Vec<&TeamGame> = games.iter().collect();
    ordered.sort_by_key(|g| g.date);

    let mut entries = Vec::with_capacity(ordered.len());
    let mut totals = RunningTotals::default();
    let mut current_season = None;
    let mut game_number = 0;

    for game in ordered {
        let season = game.season();
        if current_season != Some(season) {
            current_season = Some(season);
            game_number = 0;
            if reset == CumulativeReset::PerSeason {
                totals = RunningTotals::default();
            }
        }
        game_number += 1;
        totals.runs_scored += game.runs_scored;
        totals.runs_allowed += game.runs_allowed;
        totals.run_difference += game.run_difference();

        entries.push(GameLogEntry {
            game: game.clone(),
            season,
            game_number,
            cumulative: totals,
        });
    }
    entries
}
