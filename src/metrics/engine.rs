//! Joins normalized records with season weights and computes derived values

use super::batting::BattingMetrics;
use super::pitching::{fip_constant, LeagueTotals, PitchingMetrics};
use super::MetricValue;
use crate::data::normalize::PlayerSeasonRecord;
use crate::data::reference::WeightsIndex;
use crate::{MetricsConfig, PlayerId, Result};

/// Derived values (or the reason they failed) for one record
#[derive(Debug)]
pub struct MetricOutcome<T> {
    pub player_id: PlayerId,
    pub season: u16,
    pub result: Result<T>,
}

impl<T> MetricOutcome<T> {
    pub fn new(record: &PlayerSeasonRecord, result: Result<T>) -> Self {
        if let Err(e) = &result {
            log::warn!("Player {} ({}): {}", record.player_id, record.season, e);
        }
        MetricOutcome {
            player_id: record.player_id.clone(),
            season: record.season,
            result,
        }
    }

    pub fn ok(&self) -> Option<&T> {
        self.result.as_ref().ok()
    }
}

/// Metric computation over one batch, with weights loaded once
pub struct MetricEngine {
    weights: WeightsIndex,
    config: MetricsConfig,
}

impl MetricEngine {
    pub fn new(weights: WeightsIndex, config: MetricsConfig) -> Self {
        MetricEngine { weights, config }
    }

    /// wOBA, wRAA, wRC and BABIP; a season without weights is a lookup miss
    pub fn batting(&self, record: &PlayerSeasonRecord) -> Result<BattingMetrics> {
        let weights = self.weights.get(record.season)?;
        Ok(BattingMetrics::compute(record, weights, self.config.round_to))
    }

    /// FIP against the season's published constant, plus WHIP and runs per inning
    pub fn pitching(&self, record: &PlayerSeasonRecord) -> Result<PitchingMetrics> {
        let weights = self.weights.get(record.season)?;
        self.pitching_with_constant(record, weights.fip_constant)
    }

    /// Same as [`MetricEngine::pitching`] with an explicit FIP constant
    pub fn pitching_with_constant(
        &self,
        record: &PlayerSeasonRecord,
        constant: f64,
    ) -> Result<PitchingMetrics> {
        PitchingMetrics::compute(record, constant, &self.config.fip, self.config.round_to)
    }

    /// cFIP from a league (or conference) totals record
    pub fn fip_constant(&self, league: &PlayerSeasonRecord) -> Result<MetricValue> {
        let totals = LeagueTotals::from_record(league)?;
        Ok(fip_constant(&totals, &self.config.fip))
    }

    pub fn batting_batch(&self, records: &[PlayerSeasonRecord]) -> Vec<MetricOutcome<BattingMetrics>> {
        records
            .iter()
            .map(|r| MetricOutcome::new(r, self.batting(r)))
            .collect()
    }

    pub fn pitching_batch(&self, records: &[PlayerSeasonRecord]) -> Vec<MetricOutcome<PitchingMetrics>> {
        records
            .iter()
            .map(|r| MetricOutcome::new(r, self.pitching(r)))
            .collect()
    }
}
