//! Collegiate baseball statistics and sabermetrics
//!
//! Scrapes stats.ncaa.org and boydsworld.com, normalizes the irregular HTML
//! tables into typed records, and computes wOBA, wRAA, wRC, BABIP, FIP, WHIP
//! and Pythagenpat win percentages for dashboards.

pub mod data;
pub mod metrics;
pub mod report;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Opaque NCAA organization id for a school
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SchoolId(pub u32);

impl fmt::Display for SchoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque player token (`stats_player_seq` on stats.ncaa.org)
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Remote site a table was scraped from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    Ncaa,
    BoydsWorld,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Ncaa => write!(f, "stats.ncaa.org"),
            DataSource::BoydsWorld => write!(f, "boydsworld.com"),
        }
    }
}

/// Which half of a team's season statistics to request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatVariant {
    Batting,
    Pitching,
}

impl fmt::Display for StatVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatVariant::Batting => write!(f, "batting"),
            StatVariant::Pitching => write!(f, "pitching"),
        }
    }
}

/// Crate-wide errors
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("No {table} entry for '{key}'")]
    LookupMiss { table: &'static str, key: String },

    #[error("Fetch failed for {entity}: {message}")]
    Fetch { entity: String, message: String },

    #[error("Unexpected page structure for {entity}: {message}")]
    StructuralParse { entity: String, message: String },

    #[error("Cannot compute {metric}: {reason}")]
    UnresolvableMetric { metric: &'static str, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl StatsError {
    /// Transport failures may succeed on a later attempt; a changed page
    /// layout or a missing lookup entry will not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StatsError::Fetch { .. })
    }
}

pub type Result<T> = std::result::Result<T, StatsError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub sources: SourceConfig,
    pub data: DataConfig,
    pub metrics: MetricsConfig,
    pub roster: RosterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Upper bound of the random pause between bulk requests; 0 disables it
    pub max_request_delay_ms: u64,
    /// Number of response bodies memoized per process run
    pub cache_capacity: usize,
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn max_request_delay(&self) -> Duration {
        Duration::from_millis(self.max_request_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub season_lookup_path: String,
    pub school_lookup_path: String,
    pub weights_path: String,
    /// Conference used when a report names none; members come from the
    /// `conference` column of the school table
    pub default_conference: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub round_to: u32,
    pub fip: FipCoefficients,
}

/// Multipliers applied to home runs, free passes and strikeouts in FIP
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FipCoefficients {
    pub hr_weight: f64,
    pub bb_weight: f64,
    pub k_weight: f64,
}

impl Default for FipCoefficients {
    fn default() -> Self {
        FipCoefficients {
            hr_weight: 13.0,
            bb_weight: 3.0,
            k_weight: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterConfig {
    /// Output columns of a roster row; the player cell expands into
    /// `stats_player_seq` and `name`
    pub default_columns: Vec<String>,
    /// Seasons whose roster pages carry a different column set
    pub season_overrides: Vec<SeasonColumns>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonColumns {
    pub season: u16,
    pub columns: Vec<String>,
}

fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            sources: SourceConfig {
                user_agent: "Mozilla/5.0".to_string(),
                timeout_secs: 30,
                max_request_delay_ms: 250,
                cache_capacity: 64,
            },
            data: DataConfig {
                season_lookup_path: "data/ncaa/ncaa_seasonid_lu.csv".to_string(),
                school_lookup_path: "data/ncaa/school_lookup.csv".to_string(),
                weights_path: "data/guts/ncaa_d1_woba_linear_weights.csv".to_string(),
                default_conference: "Ivy League".to_string(),
            },
            metrics: MetricsConfig {
                round_to: 3,
                fip: FipCoefficients::default(),
            },
            roster: RosterConfig {
                default_columns: columns(&[
                    "jersey",
                    "stats_player_seq",
                    "name",
                    "position",
                    "class_year",
                    "games_played",
                    "games_started",
                ]),
                season_overrides: vec![SeasonColumns {
                    season: 2019,
                    columns: columns(&[
                        "jersey",
                        "stats_player_seq",
                        "name",
                        "position",
                        "height",
                        "class_year",
                        "games_played",
                        "games_started",
                    ]),
                }],
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StatsError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| StatsError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| StatsError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
