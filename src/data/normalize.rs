//! Cleaning and typing of raw scraped rows
//!
//! Turns [`RawTable`]s plus the resolved entity context into
//! [`PlayerSeasonRecord`]s and [`GameRecord`]s. Dash placeholders count as
//! zero occurrences, names are flipped from "Last, First", and rows without
//! a usable identity are dropped.

use super::scrapers::table::pattern;
use super::scrapers::{RawRecord, RawTable};
use crate::{PlayerId, Result, SchoolId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Placeholder glyphs the stat tables use for "none"
pub const DASH_SENTINELS: [&str; 6] = ["-", "--", "---", "  -", "- -", "-  "];

/// Columns that always go to `details`, even when they look numeric
const TEXT_COLUMNS: [&str; 8] = [
    "jersey", "Jersey", "position", "Pos", "class_year", "Yr", "height", "Team",
];

const ID_COLUMN: &str = "stats_player_seq";
const NAME_COLUMNS: [&str; 2] = ["name", "Player"];
const SEASON_COLUMN: &str = "Year";

/// A cell after normalization
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
}

/// Sentinels and blanks become 0.0, numbers lose their thousands separators,
/// anything else is text.
pub fn normalize_cell(raw: &str) -> CellValue {
    if DASH_SENTINELS.contains(&raw) {
        return CellValue::Number(0.0);
    }
    let trimmed = raw.trim();
    if trimmed.is_empty() || DASH_SENTINELS.contains(&trimmed) {
        return CellValue::Number(0.0);
    }
    let cleaned = trimmed.replace(',', "");
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => CellValue::Number(v),
        _ => CellValue::Text(trimmed.to_string()),
    }
}

/// Display name of a player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerName {
    Known(String),
    NotAvailable,
}

impl fmt::Display for PlayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerName::Known(name) => f.write_str(name),
            PlayerName::NotAvailable => f.write_str("N/A"),
        }
    }
}

/// "Savino, Nate" -> "Nate Savino"
pub fn format_name(raw: &str) -> PlayerName {
    if !raw.contains(',') {
        return PlayerName::NotAvailable;
    }
    let mut parts: Vec<&str> = raw.split(',').collect();
    parts.reverse();
    let joined = parts.join(" ");
    let name = title_case(&joined.split_whitespace().collect::<Vec<_>>().join(" "));
    if name.is_empty() {
        PlayerName::NotAvailable
    } else {
        PlayerName::Known(name)
    }
}

/// Uppercase the first letter of every alphabetic run, lowercase the rest
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}

/// Digits of a `stats_player_seq` cell
pub fn clean_player_id(raw: &str) -> PlayerId {
    PlayerId(raw.chars().filter(|c| c.is_ascii_digit()).collect())
}

/// "2018-19" -> 2019, "2019" -> 2019
pub fn parse_season(raw: &str) -> Result<Option<u16>> {
    let re = pattern(r"^(\d{4})(?:\s*-\s*(\d{2}|\d{4}))?$")?;
    let caps = match re.captures(raw.trim()) {
        Some(caps) => caps,
        None => return Ok(None),
    };
    let first: u16 = match caps[1].parse() {
        Ok(v) => v,
        Err(_) => return Ok(None),
    };
    let season = match caps.get(2) {
        None => first,
        Some(m) if m.as_str().len() == 4 => m.as_str().parse().unwrap_or(first),
        Some(m) => {
            let suffix: u16 = m.as_str().parse().unwrap_or(0);
            let century = first - first % 100;
            if suffix < first % 100 {
                century + 100 + suffix
            } else {
                century + suffix
            }
        }
    };
    Ok(Some(season))
}

/// Identity known from the request rather than the row
#[derive(Debug, Clone, Default)]
pub struct RecordContext {
    pub player_id: Option<PlayerId>,
    pub season: Option<u16>,
    pub school_id: Option<SchoolId>,
    /// Raw "Last, First" name for tables without a name column
    pub name: Option<String>,
}

impl RecordContext {
    pub fn for_team(school_id: SchoolId, season: u16) -> Self {
        RecordContext {
            school_id: Some(school_id),
            season: Some(season),
            ..Default::default()
        }
    }

    pub fn for_player(player_id: PlayerId, school_id: SchoolId, name: Option<String>) -> Self {
        RecordContext {
            player_id: Some(player_id),
            school_id: Some(school_id),
            name,
            ..Default::default()
        }
    }
}

/// One player's line for one season at one school
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSeasonRecord {
    pub player_id: PlayerId,
    pub season: u16,
    pub school_id: SchoolId,
    pub name: PlayerName,
    pub stats: BTreeMap<String, f64>,
    pub details: BTreeMap<String, String>,
}

impl PlayerSeasonRecord {
    /// Stat by column name, trying each alias in turn; absent reads as 0
    pub fn stat(&self, names: &[&str]) -> f64 {
        names
            .iter()
            .find_map(|n| self.stats.get(*n).copied())
            .unwrap_or(0.0)
    }

    pub fn has_stat(&self, name: &str) -> bool {
        self.stats.contains_key(name)
    }

    pub fn detail(&self, name: &str) -> Option<&str> {
        self.details.get(name).map(|s| s.as_str())
    }
}

/// Normalize every row of a player table; invalid rows are logged and dropped
pub fn player_records(table: &RawTable, ctx: &RecordContext) -> Result<Vec<PlayerSeasonRecord>> {
    let mut records = Vec::with_capacity(table.len());
    let mut dropped = 0;

    for row in &table.rows {
        let player_id = match table.cell(row, ID_COLUMN) {
            Some(raw) => clean_player_id(raw),
            None => ctx.player_id.clone().unwrap_or_default(),
        };
        let season = match table.cell(row, SEASON_COLUMN) {
            Some(raw) => parse_season(raw)?,
            None => ctx.season,
        };
        let raw_name = NAME_COLUMNS
            .iter()
            .find_map(|c| table.cell(row, c))
            .or(ctx.name.as_deref());

        let (season, school_id) = match (season, ctx.school_id) {
            (Some(season), Some(school_id)) if !player_id.is_empty() => (season, school_id),
            _ => {
                log::debug!(
                    "Dropping row without identity (player '{}', cells {:?})",
                    player_id,
                    row.cells
                );
                dropped += 1;
                continue;
            }
        };

        let mut stats = BTreeMap::new();
        let mut details = BTreeMap::new();
        for (header, raw) in table.headers.iter().zip(row.cells.iter()) {
            let header = header.as_str();
            if header == ID_COLUMN || header == SEASON_COLUMN || NAME_COLUMNS.contains(&header) {
                continue;
            }
            if TEXT_COLUMNS.contains(&header) {
                details.insert(header.to_string(), raw.trim().to_string());
                continue;
            }
            match normalize_cell(raw) {
                CellValue::Number(v) if v < 0.0 => {
                    log::warn!(
                        "Player {} {}: negative {} ({}) rejected",
                        player_id,
                        season,
                        header,
                        v
                    );
                }
                CellValue::Number(v) => {
                    stats.insert(header.to_string(), v);
                }
                CellValue::Text(text) => {
                    details.insert(header.to_string(), text);
                }
            }
        }

        records.push(PlayerSeasonRecord {
            player_id,
            season,
            school_id,
            name: raw_name.map(format_name).unwrap_or(PlayerName::NotAvailable),
            stats,
            details,
        });
    }

    if dropped > 0 {
        log::warn!("Dropped {} of {} rows without identity", dropped, table.len());
    }
    Ok(records)
}

/// One completed game as listed by boydsworld
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub date: NaiveDate,
    pub team_1: String,
    pub team_1_score: u32,
    pub team_2: String,
    pub team_2_score: u32,
    pub field: String,
}

fn cell_text<'a>(table: &RawTable, row: &'a RawRecord, name: &str) -> &'a str {
    table.cell(row, name).unwrap_or("").trim()
}

pub fn parse_game_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    ["%m/%d/%Y", "%Y-%m-%d", "%m/%d/%y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Typed games from a results table, stably ordered by date
pub fn game_records(table: &RawTable) -> Vec<GameRecord> {
    let mut games = Vec::with_capacity(table.len());
    for row in &table.rows {
        let cell = |name: &str| cell_text(table, row, name);
        let date = parse_game_date(cell("date"));
        let score_1 = cell("team_1_score").parse::<u32>().ok();
        let score_2 = cell("team_2_score").parse::<u32>().ok();

        match (date, score_1, score_2) {
            (Some(date), Some(team_1_score), Some(team_2_score)) => games.push(GameRecord {
                date,
                team_1: cell("team_1").to_string(),
                team_1_score,
                team_2: cell("team_2").to_string(),
                team_2_score,
                field: cell("field").to_string(),
            }),
            _ => log::warn!("Skipping unparseable game row {:?}", row.cells),
        }
    }
    games.sort_by_key(|g| g.date);
    games
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| RawRecord::new(r.iter().map(|c| c.to_string()).collect()))
                .collect(),
        )
    }

    #[test]
    fn test_dash_sentinels_are_zero() {
        for raw in DASH_SENTINELS {
            assert_eq!(normalize_cell(raw), CellValue::Number(0.0), "sentinel {:?}", raw);
        }
        assert_eq!(normalize_cell(""), CellValue::Number(0.0));
        assert_eq!(normalize_cell("1,204"), CellValue::Number(1204.0));
        assert_eq!(normalize_cell(" 6.2 "), CellValue::Number(6.2));
        assert_eq!(normalize_cell("RHP"), CellValue::Text("RHP".into()));
    }

    #[test]
    fn test_format_name() {
        assert_eq!(format_name("Savino, Nate"), PlayerName::Known("Nate Savino".into()));
        assert_eq!(format_name("SMITH JR., AL"), PlayerName::Known("Al Smith Jr.".into()));
        assert_eq!(format_name("O'neil,  sean "), PlayerName::Known("Sean O'Neil".into()));
        assert_eq!(format_name("Nate Savino"), PlayerName::NotAvailable);
    }

    #[test]
    fn test_parse_season() {
        assert_eq!(parse_season("2018-19").unwrap(), Some(2019));
        assert_eq!(parse_season("2019").unwrap(), Some(2019));
        assert_eq!(parse_season("1999-00").unwrap(), Some(2000));
        assert_eq!(parse_season("Totals").unwrap(), None);
    }

    #[test]
    fn test_team_table_records() {
        let raw = table(
            &["Jersey", "Player", "Yr", "AB", "H", "BB", "stats_player_seq"],
            &[
                &["7", "Savino, Nate", "Jr", "40", "12", "-", "1234567"],
                &["9", "Anonymous", "So", "1,002", "--", "3", "7654321"],
                &["", "Walk, On", "Fr", "0", "0", "0", ""],
            ],
        );
        let records = player_records(&raw, &RecordContext::for_team(SchoolId(167), 2021)).unwrap();

        // the third row has no player id
        assert_eq!(records.len(), 2);
        let nate = &records[0];
        assert_eq!(nate.player_id, PlayerId("1234567".into()));
        assert_eq!(nate.season, 2021);
        assert_eq!(nate.name, PlayerName::Known("Nate Savino".into()));
        assert_eq!(nate.stat(&["H"]), 12.0);
        assert_eq!(nate.stat(&["BB"]), 0.0);
        assert_eq!(nate.detail("Jersey"), Some("7"));

        // name fails soft, the rest of the record survives
        let anon = &records[1];
        assert_eq!(anon.name, PlayerName::NotAvailable);
        assert_eq!(anon.stat(&["AB"]), 1002.0);
        assert_eq!(anon.stat(&["H"]), 0.0);
    }

    #[test]
    fn test_career_rows_take_season_from_year() {
        let raw = table(
            &["Year", "Team", "GP", "H"],
            &[&["2018-19", "Cornell", "20", "15"], &["2020-21", "Cornell", "8", "-"]],
        );
        let ctx = RecordContext::for_player(
            PlayerId("1234567".into()),
            SchoolId(167),
            Some("Savino, Nate".into()),
        );
        let records = player_records(&raw, &ctx).unwrap();

        assert_eq!(records.iter().map(|r| r.season).collect::<Vec<_>>(), vec![2019, 2021]);
        assert!(records.iter().all(|r| r.name == PlayerName::Known("Nate Savino".into())));
        assert_eq!(records[0].detail("Team"), Some("Cornell"));
    }

    #[test]
    fn test_negative_stat_rejected() {
        let raw = table(&["stats_player_seq", "H", "R"], &[&["1", "-3", "2"]]);
        let records = player_records(&raw, &RecordContext::for_team(SchoolId(1), 2021)).unwrap();
        assert!(!records[0].has_stat("H"));
        assert_eq!(records[0].stat(&["R"]), 2.0);
    }

    #[test]
    fn test_game_records_sorted_and_typed() {
        let raw = table(
            &["date", "team_1", "team_1_score", "team_2", "team_2_score", "field"],
            &[
                &["3/3/2019", "Bucknell", "7", "Cornell", "2", "@ Lewisburg, PA"],
                &["3/2/2019", "Cornell", "5", "Bucknell", "3", "@ Lewisburg, PA"],
                &["ppd", "Cornell", "", "Army", "", ""],
            ],
        );
        let games = game_records(&raw);
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].date, NaiveDate::from_ymd_opt(2019, 3, 2).unwrap());
        assert_eq!(games[0].team_1_score, 5);
        assert_eq!(games[1].team_1, "Bucknell");
    }
}
