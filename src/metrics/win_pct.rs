//! Actual and Pythagenpat win percentages

use super::games::{in_conference, TeamGame};
use super::{round_to, MetricValue};
use serde::Serialize;

/// Exponent applied to runs per game in the Pythagenpat model
pub const PYTHAGENPAT_POWER: f64 = 0.287;

/// Wins and runs over a set of games
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WinTotals {
    pub games: u32,
    pub wins: u32,
    pub runs_scored: u32,
    pub runs_allowed: u32,
}

impl WinTotals {
    pub fn from_games<'a, I>(games: I) -> Self
    where
        I: IntoIterator<Item = &'a TeamGame>,
    {
        let mut totals = WinTotals::default();
        for game in games {
            totals.games += 1;
            if game.is_win() {
                totals.wins += 1;
            }
            totals.runs_scored += game.runs_scored;
            totals.runs_allowed += game.runs_allowed;
        }
        totals
    }
}

/// wins / games
pub fn actual_win_pct(totals: &WinTotals) -> MetricValue {
    if totals.games == 0 {
        return MetricValue::unresolvable("no games played");
    }
    MetricValue::Value(totals.wins as f64 / totals.games as f64)
}

/// ((RS + RA) / G) ^ 0.287
pub fn pythagenpat_exponent(totals: &WinTotals) -> MetricValue {
    if totals.games == 0 {
        return MetricValue::unresolvable("no games played");
    }
    let runs_per_game = (totals.runs_scored + totals.runs_allowed) as f64 / totals.games as f64;
    MetricValue::Value(runs_per_game.powf(PYTHAGENPAT_POWER))
}

/// RS^x / (RS^x + RA^x); exactly 0.5 when runs scored equal runs allowed
pub fn pythagenpat_win_pct(totals: &WinTotals) -> MetricValue {
    let exponent = match pythagenpat_exponent(totals) {
        MetricValue::Value(x) => x,
        unresolved => return unresolved,
    };
    if totals.runs_scored == totals.runs_allowed {
        return MetricValue::Value(0.5);
    }
    let scored = (totals.runs_scored as f64).powf(exponent);
    let allowed = (totals.runs_allowed as f64).powf(exponent);
    MetricValue::Value(scored / (scored + allowed))
}

/// Expected vs actual in-conference record of one team
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConferencePythag {
    pub team: String,
    pub pythagenpat_pct: MetricValue,
    pub actual_pct: MetricValue,
    pub deviation: MetricValue,
}

impl ConferencePythag {
    pub fn compute(team: &str, games: &[TeamGame], conference: &[&str], places: u32) -> Self {
        let totals = WinTotals::from_games(in_conference(games, conference));
        let pythag = pythagenpat_win_pct(&totals);
        let actual = actual_win_pct(&totals);
        let deviation = match (pythag.value(), actual.value()) {
            (Some(p), Some(a)) => MetricValue::Value(round_to(p - a, places).abs()),
            _ => MetricValue::unresolvable("no conference games"),
        };
        ConferencePythag {
            team: team.to_string(),
            pythagenpat_pct: pythag.rounded(places),
            actual_pct: actual.rounded(places),
            deviation,
        }
    }
}
