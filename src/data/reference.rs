//! Read-only reference tables
//!
//! Season id lookup, school id lookup and the per-season linear weights.
//! Each table is loaded once per batch into a typed key -> row index.

use crate::{Result, SchoolId, StatsError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;

/// NCAA identifiers attached to one season
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonIds {
    pub season: u16,
    /// `game_sport_year_ctl_id`
    pub season_id: u32,
    /// `year_stat_category_id` for batting tables
    pub batting_id: u32,
    /// `year_stat_category_id` for pitching tables
    pub pitching_id: u32,
}

/// Season year -> NCAA ids
#[derive(Debug, Clone, Default)]
pub struct SeasonLookup {
    by_season: BTreeMap<u16, SeasonIds>,
}

impl SeasonLookup {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(rdr: R) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(rdr);
        let mut by_season = BTreeMap::new();
        for row in reader.deserialize() {
            let ids: SeasonIds = row?;
            by_season.insert(ids.season, ids);
        }
        Ok(SeasonLookup { by_season })
    }

    pub fn from_rows(rows: impl IntoIterator<Item = SeasonIds>) -> Self {
        SeasonLookup {
            by_season: rows.into_iter().map(|r| (r.season, r)).collect(),
        }
    }

    pub fn get(&self, season: u16) -> Result<SeasonIds> {
        self.by_season
            .get(&season)
            .copied()
            .ok_or_else(|| StatsError::LookupMiss {
                table: "season lookup",
                key: season.to_string(),
            })
    }

    /// Reverse lookup from `game_sport_year_ctl_id` to the season year
    pub fn season_for_id(&self, season_id: u32) -> Option<u16> {
        self.by_season
            .values()
            .find(|ids| ids.season_id == season_id)
            .map(|ids| ids.season)
    }

    pub fn len(&self) -> usize {
        self.by_season.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_season.is_empty()
    }
}

/// One row of the school lookup file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchoolEntry {
    pub school: String,
    pub school_id: u32,
    #[serde(default)]
    pub conference: Option<String>,
}

/// School name -> NCAA org id
#[derive(Debug, Clone, Default)]
pub struct SchoolLookup {
    entries: Vec<SchoolEntry>,
    by_name: HashMap<String, usize>,
}

impl SchoolLookup {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(rdr: R) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(rdr);
        let mut entries = Vec::new();
        for row in reader.deserialize() {
            let entry: SchoolEntry = row?;
            entries.push(entry);
        }
        Ok(Self::from_entries(entries))
    }

    pub fn from_entries(entries: Vec<SchoolEntry>) -> Self {
        let mut by_name = HashMap::new();
        for (idx, entry) in entries.iter().enumerate() {
            by_name.entry(name_key(&entry.school)).or_insert(idx);
        }
        SchoolLookup { entries, by_name }
    }

    pub fn school_id(&self, school: &str) -> Result<SchoolId> {
        self.by_name
            .get(&name_key(school))
            .map(|idx| SchoolId(self.entries[*idx].school_id))
            .ok_or_else(|| StatsError::LookupMiss {
                table: "school lookup",
                key: school.to_string(),
            })
    }

    pub fn name_of(&self, id: SchoolId) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.school_id == id.0)
            .map(|e| e.school.as_str())
    }

    /// Schools listed under a conference, in file order
    pub fn in_conference(&self, conference: &str) -> Vec<&SchoolEntry> {
        let wanted = name_key(conference);
        self.entries
            .iter()
            .filter(|e| e.conference.as_deref().map(name_key).as_deref() == Some(wanted.as_str()))
            .collect()
    }

    pub fn entries(&self) -> &[SchoolEntry] {
        &self.entries
    }
}

fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Linear weights and league constants for one season
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeasonWeights {
    #[serde(rename = "Season")]
    pub season: u16,
    #[serde(rename = "wOBA")]
    pub league_woba: f64,
    #[serde(rename = "wOBAScale")]
    pub woba_scale: f64,
    #[serde(rename = "wBB")]
    pub w_bb: f64,
    #[serde(rename = "wHBP")]
    pub w_hbp: f64,
    #[serde(rename = "w1B")]
    pub w_1b: f64,
    #[serde(rename = "w2B")]
    pub w_2b: f64,
    #[serde(rename = "w3B")]
    pub w_3b: f64,
    #[serde(rename = "wHR")]
    pub w_hr: f64,
    #[serde(rename = "R/PA")]
    pub league_runs_per_pa: f64,
    #[serde(rename = "cFIP")]
    pub fip_constant: f64,
}

/// Season -> weights, exactly one row per season
#[derive(Debug, Clone, Default)]
pub struct WeightsIndex {
    by_season: BTreeMap<u16, SeasonWeights>,
}

impl WeightsIndex {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(rdr: R) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(rdr);
        let mut rows = Vec::new();
        for row in reader.deserialize() {
            let weights: SeasonWeights = row?;
            rows.push(weights);
        }
        Self::from_rows(rows)
    }

    pub fn from_rows(rows: impl IntoIterator<Item = SeasonWeights>) -> Result<Self> {
        let mut by_season = BTreeMap::new();
        for weights in rows {
            if by_season.insert(weights.season, weights).is_some() {
                return Err(StatsError::Parse(format!(
                    "duplicate linear weights row for season {}",
                    weights.season
                )));
            }
        }
        log::debug!("Loaded linear weights for {} seasons", by_season.len());
        Ok(WeightsIndex { by_season })
    }

    pub fn get(&self, season: u16) -> Result<&SeasonWeights> {
        self.by_season
            .get(&season)
            .ok_or_else(|| StatsError::LookupMiss {
                table: "linear weights",
                key: season.to_string(),
            })
    }

    pub fn seasons(&self) -> impl Iterator<Item = u16> + '_ {
        self.by_season.keys().copied()
    }
}

/// All reference tables needed for one computation batch
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub seasons: SeasonLookup,
    pub schools: SchoolLookup,
    pub weights: WeightsIndex,
}

impl ReferenceData {
    pub fn load(config: &crate::DataConfig) -> Result<Self> {
        Ok(ReferenceData {
            seasons: SeasonLookup::from_path(&config.season_lookup_path)?,
            schools: SchoolLookup::from_path(&config.school_lookup_path)?,
            weights: WeightsIndex::from_path(&config.weights_path)?,
        })
    }
}
