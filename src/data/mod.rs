//! Data ingestion
//!
//! Scrapers for stats.ncaa.org and boydsworld.com, the reference tables that
//! key them, and normalization of the raw rows they return.

pub mod normalize;
pub mod reference;
pub mod scrapers;

pub use normalize::{GameRecord, PlayerName, PlayerSeasonRecord, RecordContext};
pub use reference::{ReferenceData, SchoolLookup, SeasonLookup, SeasonWeights, WeightsIndex};
pub use scrapers::{BoydsWorldScraper, NcaaScraper, RawRecord, RawTable};
