//! Pitching metrics: FIP, WHIP, runs per inning and the FIP constant
//!
//! Innings arrive in thirds notation (`6.2` is six innings and two outs) and
//! are converted to true innings before any division.

use super::{round_to, MetricValue};
use crate::data::normalize::{PlayerName, PlayerSeasonRecord};
use crate::{FipCoefficients, PlayerId, Result, SchoolId, StatsError};
use serde::Serialize;

/// Innings pitched as whole innings plus extra outs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InningsPitched {
    pub whole: u32,
    pub outs: u8,
}

impl InningsPitched {
    /// Parse the box-score form, where the tenths digit counts outs
    pub fn from_notation(value: f64) -> Result<Self> {
        if !value.is_finite() || value < 0.0 {
            return Err(StatsError::Parse(format!("invalid innings pitched {}", value)));
        }
        let whole = value.trunc();
        let outs = ((value - whole) * 10.0).round();
        if outs > 2.0 {
            return Err(StatsError::Parse(format!(
                "innings pitched {} has {} outs past the last full inning",
                value, outs
            )));
        }
        Ok(InningsPitched {
            whole: whole as u32,
            outs: outs as u8,
        })
    }

    pub fn from_outs(outs: u32) -> Self {
        InningsPitched {
            whole: outs / 3,
            outs: (outs % 3) as u8,
        }
    }

    pub fn total_outs(&self) -> u32 {
        self.whole * 3 + self.outs as u32
    }

    /// True innings, e.g. 6.2 -> 6.667
    pub fn innings(&self) -> f64 {
        self.whole as f64 + self.outs as f64 / 3.0
    }
}

/// Counting stats the pitching formulas read
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PitchingLine {
    pub innings: InningsPitched,
    pub hits_allowed: f64,
    pub runs_allowed: f64,
    pub walks_allowed: f64,
    pub hit_batters: f64,
    pub home_runs_allowed: f64,
    pub strikeouts: f64,
    pub era: Option<f64>,
}

impl PitchingLine {
    pub fn from_record(record: &PlayerSeasonRecord) -> Result<Self> {
        Ok(PitchingLine {
            innings: InningsPitched::from_notation(record.stat(&["IP"]))?,
            hits_allowed: record.stat(&["H"]),
            runs_allowed: record.stat(&["R"]),
            walks_allowed: record.stat(&["BB"]),
            hit_batters: record.stat(&["HB", "HBP"]),
            home_runs_allowed: record.stat(&["HR-A", "HR"]),
            strikeouts: record.stat(&["SO", "K"]),
            era: record.stats.get("ERA").copied(),
        })
    }
}

fn fip_core(hr: f64, bb: f64, hbp: f64, k: f64, coeffs: &FipCoefficients) -> f64 {
    coeffs.hr_weight * hr + coeffs.bb_weight * (bb + hbp) - coeffs.k_weight * k
}

/// Fielding independent pitching; unresolvable without a recorded out
pub fn fip(line: &PitchingLine, fip_constant: f64, coeffs: &FipCoefficients) -> MetricValue {
    let ip = line.innings.innings();
    if ip == 0.0 {
        return MetricValue::unresolvable("0 innings pitched");
    }
    let core = fip_core(
        line.home_runs_allowed,
        line.walks_allowed,
        line.hit_batters,
        line.strikeouts,
        coeffs,
    );
    MetricValue::Value(core / ip + fip_constant)
}

/// Walks plus hits per inning; 0 without innings
pub fn whip(line: &PitchingLine) -> f64 {
    let ip = line.innings.innings();
    if ip <= 0.0 {
        return 0.0;
    }
    (line.walks_allowed + line.hits_allowed) / ip
}

/// Runs allowed per inning; 0 without innings
pub fn runs_per_ip(line: &PitchingLine) -> f64 {
    let ip = line.innings.innings();
    if ip <= 0.0 {
        return 0.0;
    }
    line.runs_allowed / ip
}

/// League pitching totals used to derive cFIP
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LeagueTotals {
    pub era: f64,
    pub home_runs: f64,
    pub walks: f64,
    pub hit_batters: f64,
    pub strikeouts: f64,
    pub innings: InningsPitched,
}

impl LeagueTotals {
    pub fn from_record(record: &PlayerSeasonRecord) -> Result<Self> {
        let line = PitchingLine::from_record(record)?;
        Ok(LeagueTotals {
            era: line.era.unwrap_or(0.0),
            home_runs: line.home_runs_allowed,
            walks: line.walks_allowed,
            hit_batters: line.hit_batters,
            strikeouts: line.strikeouts,
            innings: line.innings,
        })
    }
}

/// cFIP = lgERA - (13 lgHR + 3 (lgBB + lgHBP) - 2 lgK) / lgIP
pub fn fip_constant(league: &LeagueTotals, coeffs: &FipCoefficients) -> MetricValue {
    let ip = league.innings.innings();
    if ip == 0.0 {
        return MetricValue::unresolvable("league has 0 innings pitched");
    }
    let core = fip_core(
        league.home_runs,
        league.walks,
        league.hit_batters,
        league.strikeouts,
        coeffs,
    );
    MetricValue::Value(league.era - core / ip)
}

/// Derived pitching values for one player season
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PitchingMetrics {
    pub player_id: PlayerId,
    pub season: u16,
    pub school_id: SchoolId,
    pub name: PlayerName,
    /// True innings, not thirds notation
    pub innings_pitched: f64,
    pub era: Option<f64>,
    pub fip: MetricValue,
    pub whip: f64,
    pub runs_per_ip: f64,
}

impl PitchingMetrics {
    pub fn compute(
        record: &PlayerSeasonRecord,
        fip_constant: f64,
        coeffs: &FipCoefficients,
        places: u32,
    ) -> Result<Self> {
        let line = PitchingLine::from_record(record)?;
        Ok(PitchingMetrics {
            player_id: record.player_id.clone(),
            season: record.season,
            school_id: record.school_id,
            name: record.name.clone(),
            innings_pitched: round_to(line.innings.innings(), places),
            era: line.era.map(|era| round_to(era, places)),
            fip: fip(&line, fip_constant, coeffs).rounded(places),
            whip: round_to(whip(&line), places),
            runs_per_ip: round_to(runs_per_ip(&line), places),
        })
    }
}
