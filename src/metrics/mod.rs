//! Sabermetric formulas
//!
//! Batting and pitching rates per player season, game filters and win
//! percentage models per team. Every division checks its denominator first.

pub mod batting;
pub mod engine;
pub mod games;
pub mod pitching;
pub mod win_pct;

pub use batting::{BattingLine, BattingMetrics};
pub use engine::{MetricEngine, MetricOutcome};
pub use games::{GameLogEntry, RunningTotals, TeamGame};
pub use pitching::{InningsPitched, LeagueTotals, PitchingLine, PitchingMetrics};
pub use win_pct::{ConferencePythag, WinTotals};

use crate::{Result, StatsError};
use serde::Serialize;

/// A derived number, or the reason it cannot be computed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MetricValue {
    Value(f64),
    Unresolvable { reason: String },
}

impl MetricValue {
    pub fn unresolvable(reason: impl Into<String>) -> Self {
        MetricValue::Unresolvable {
            reason: reason.into(),
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            MetricValue::Value(v) => Some(*v),
            MetricValue::Unresolvable { .. } => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, MetricValue::Value(_))
    }

    pub fn rounded(&self, places: u32) -> Self {
        match self {
            MetricValue::Value(v) => MetricValue::Value(round_to(*v, places)),
            other => other.clone(),
        }
    }

    pub fn map<F: FnOnce(f64) -> f64>(self, f: F) -> Self {
        match self {
            MetricValue::Value(v) => MetricValue::Value(f(v)),
            other => other,
        }
    }

    /// Turn an unresolvable marker into an error for callers that need a number
    pub fn into_result(self, metric: &'static str) -> Result<f64> {
        match self {
            MetricValue::Value(v) => Ok(v),
            MetricValue::Unresolvable { reason } => {
                Err(StatsError::UnresolvableMetric { metric, reason })
            }
        }
    }
}

/// Round half away from zero to `places` decimals
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}
