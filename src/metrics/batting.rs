//! Batting metrics: wOBA, wRAA, wRC and BABIP

use super::{round_to, MetricValue};
use crate::data::normalize::{PlayerName, PlayerSeasonRecord};
use crate::data::reference::SeasonWeights;
use crate::{PlayerId, SchoolId};
use serde::Serialize;

/// Counting stats the batting formulas read
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BattingLine {
    pub at_bats: f64,
    pub hits: f64,
    pub doubles: f64,
    pub triples: f64,
    pub home_runs: f64,
    pub walks: f64,
    pub intentional_walks: f64,
    pub hit_by_pitch: f64,
    pub sac_flies: f64,
    pub sac_bunts: f64,
    pub strikeouts: f64,
}

impl BattingLine {
    pub fn from_record(record: &PlayerSeasonRecord) -> Self {
        BattingLine {
            at_bats: record.stat(&["AB"]),
            hits: record.stat(&["H"]),
            doubles: record.stat(&["2B"]),
            triples: record.stat(&["3B"]),
            home_runs: record.stat(&["HR"]),
            walks: record.stat(&["BB"]),
            intentional_walks: record.stat(&["IBB"]),
            hit_by_pitch: record.stat(&["HBP", "HB"]),
            sac_flies: record.stat(&["SF"]),
            sac_bunts: record.stat(&["SH", "SAC"]),
            strikeouts: record.stat(&["K", "SO"]),
        }
    }

    /// Not clamped: a negative result means the source row is inconsistent
    pub fn singles(&self) -> f64 {
        self.hits - self.doubles - self.triples - self.home_runs
    }

    pub fn plate_appearances(&self) -> f64 {
        self.at_bats + self.walks + self.sac_flies + self.sac_bunts + self.hit_by_pitch
            - self.intentional_walks
    }
}

/// Weighted on-base average; 0 without plate appearances
pub fn woba(line: &BattingLine, w: &SeasonWeights) -> f64 {
    let pa = line.plate_appearances();
    if pa <= 0.0 {
        return 0.0;
    }
    (w.w_bb * line.walks
        + w.w_hbp * line.hit_by_pitch
        + w.w_1b * line.singles()
        + w.w_2b * line.doubles
        + w.w_3b * line.triples
        + w.w_hr * line.home_runs)
        / pa
}

fn runs_above_average_per_pa(line: &BattingLine, w: &SeasonWeights) -> MetricValue {
    if w.woba_scale == 0.0 {
        return MetricValue::unresolvable(format!("wOBA scale is 0 for {}", w.season));
    }
    MetricValue::Value((woba(line, w) - w.league_woba) / w.woba_scale)
}

/// Weighted runs above average; 0 without plate appearances
pub fn wraa(line: &BattingLine, w: &SeasonWeights) -> MetricValue {
    let pa = line.plate_appearances();
    if pa <= 0.0 {
        return MetricValue::Value(0.0);
    }
    runs_above_average_per_pa(line, w).map(|per_pa| per_pa * pa)
}

/// Weighted runs created; 0 without plate appearances
pub fn wrc(line: &BattingLine, w: &SeasonWeights) -> MetricValue {
    let pa = line.plate_appearances();
    if pa <= 0.0 {
        return MetricValue::Value(0.0);
    }
    runs_above_average_per_pa(line, w).map(|per_pa| (per_pa + w.league_runs_per_pa) * pa)
}

/// Batting average on balls in play
pub fn babip(line: &BattingLine) -> MetricValue {
    let balls_in_play = line.at_bats - line.strikeouts - line.home_runs + line.sac_flies;
    if balls_in_play <= 0.0 {
        return MetricValue::unresolvable("no balls in play");
    }
    MetricValue::Value((line.hits - line.home_runs) / balls_in_play)
}

/// Derived batting values for one player season
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BattingMetrics {
    pub player_id: PlayerId,
    pub season: u16,
    pub school_id: SchoolId,
    pub name: PlayerName,
    pub plate_appearances: f64,
    pub singles: f64,
    pub woba: f64,
    pub wraa: MetricValue,
    pub wrc: MetricValue,
    pub babip: MetricValue,
}

impl BattingMetrics {
    pub fn compute(record: &PlayerSeasonRecord, weights: &SeasonWeights, places: u32) -> Self {
        let line = BattingLine::from_record(record);
        BattingMetrics {
            player_id: record.player_id.clone(),
            season: record.season,
            school_id: record.school_id,
            name: record.name.clone(),
            plate_appearances: line.plate_appearances(),
            singles: line.singles(),
            woba: round_to(woba(&line, weights), places),
            wraa: wraa(&line, weights).rounded(places),
            wrc: wrc(&line, weights).rounded(places),
            babip: babip(&line).rounded(places),
        }
    }
}
