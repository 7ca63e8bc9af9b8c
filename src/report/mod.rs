//! Dashboard-ready record batches
//!
//! Composes lookup, fetch, parse, normalization and metrics for one request.

pub mod builder;

pub use builder::ReportBuilder;

use crate::data::scrapers::Entity;
use crate::metrics::{BattingMetrics, GameLogEntry, MetricOutcome, PitchingMetrics};
use crate::SchoolId;

/// Player and team batting values for one school season
#[derive(Debug)]
pub struct TeamBattingReport {
    pub school_id: SchoolId,
    pub season: u16,
    pub players: Vec<MetricOutcome<BattingMetrics>>,
    /// Computed from the `Totals` row when the page has one
    pub team: Option<MetricOutcome<BattingMetrics>>,
}

/// Player and team pitching values for one school season
#[derive(Debug)]
pub struct TeamPitchingReport {
    pub school_id: SchoolId,
    pub season: u16,
    pub players: Vec<MetricOutcome<PitchingMetrics>>,
    pub team: Option<MetricOutcome<PitchingMetrics>>,
}

/// Game log with cumulative run differential, plus seasons that failed to load
#[derive(Debug, Default)]
pub struct RunDifferentialReport {
    pub log: Vec<GameLogEntry>,
    pub failed: Vec<Entity>,
}
