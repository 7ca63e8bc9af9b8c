//! boydsworld.com scraper for completed game results

use super::table::{locate_table, selector, RawRecord, RawTable};
use super::{http_source, Entity, EntityOutcome, Fetched, PageRequest, PageSource, Politeness};
use crate::{Config, Result, StatsError};
use scraper::Html;

const SCORES_URL: &str = "http://www.boydsworld.com/cgi/scores.pl";

/// The results are the second table on the page
const SCORES_TABLE: usize = 1;

/// Anything shorter than this is the site's "no games found" response
const MIN_BODY_LEN: usize = 10;

pub const GAME_COLUMNS: [&str; 6] = [
    "date",
    "team_1",
    "team_1_score",
    "team_2",
    "team_2_score",
    "field",
];

/// Scraper for boydsworld.com
pub struct BoydsWorldScraper {
    source: Box<dyn PageSource>,
    politeness: Politeness,
}

impl BoydsWorldScraper {
    pub fn new(source: Box<dyn PageSource>, politeness: Politeness) -> Self {
        BoydsWorldScraper { source, politeness }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            http_source(&config.sources)?,
            Politeness::new(config.sources.max_request_delay()),
        ))
    }

    /// All games of `team` from `start` through `end`, optionally only
    /// against one opponent
    pub fn games(
        &self,
        team: &str,
        opponent: Option<&str>,
        start: u16,
        end: u16,
    ) -> Result<Fetched<RawTable>> {
        let entity = Entity::Games {
            team: team.to_string(),
            opponent: opponent.map(|o| o.to_string()),
            start,
            end,
        };
        let request = PageRequest::new(SCORES_URL)
            .param("team1", team)
            .param("firstyear", start)
            .param("team2", opponent.unwrap_or("all"))
            .param("lastyear", end)
            .param("format", "HTML")
            .param("submit", "Fetch");

        let body = self.source.fetch(&request)?;
        parse_games(&body, &entity)
    }

    /// Politeness pause for callers looping over several teams
    pub fn pause(&self) {
        self.politeness.pause();
    }

    /// One request per season, accumulated in ascending season order
    pub fn games_by_season(&self, team: &str, start: u16, end: u16) -> Vec<EntityOutcome<RawTable>> {
        let mut outcomes = Vec::new();
        for season in start..=end {
            if season > start {
                self.politeness.pause();
            }
            log::info!("Fetching {} games for {}", team, season);
            let entity = Entity::Games {
                team: team.to_string(),
                opponent: None,
                start: season,
                end: season,
            };
            outcomes.push(EntityOutcome::new(entity, self.games(team, None, season, season)));
        }
        outcomes
    }
}

fn parse_games(body: &str, entity: &Entity) -> Result<Fetched<RawTable>> {
    if body.trim().len() < MIN_BODY_LEN {
        log::info!("{}: no games found", entity);
        return Ok(Fetched::NoData);
    }

    let document = Html::parse_document(body);
    let table = locate_table(&document, SCORES_TABLE, entity)?;
    let tr_sel = selector("tr")?;
    let td_sel = selector("td")?;

    let raw_rows: Vec<Vec<String>> = table
        .select(&tr_sel)
        .map(|tr| {
            tr.select(&td_sel)
                .map(|td| {
                    td.text()
                        .collect::<String>()
                        .split_whitespace()
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect::<Vec<_>>()
        })
        .filter(|cells| !cells.is_empty())
        .collect();

    if raw_rows.is_empty() {
        log::info!("{}: results table is empty", entity);
        return Ok(Fetched::NoData);
    }

    // spacer columns are blank in every row
    let width = raw_rows.iter().map(|r| r.len()).max().unwrap_or(0);
    let kept: Vec<usize> = (0..width)
        .filter(|&col| {
            raw_rows
                .iter()
                .any(|r| r.get(col).map(|c| !c.is_empty()).unwrap_or(false))
        })
        .collect();

    if kept.len() != GAME_COLUMNS.len() {
        return Err(StatsError::StructuralParse {
            entity: entity.to_string(),
            message: format!(
                "expected {} populated columns, found {}",
                GAME_COLUMNS.len(),
                kept.len()
            ),
        });
    }

    let rows = raw_rows
        .iter()
        .map(|r| {
            RawRecord::new(
                kept.iter()
                    .map(|&col| r.get(col).cloned().unwrap_or_default())
                    .collect(),
            )
        })
        .collect();

    let headers = GAME_COLUMNS.iter().map(|c| c.to_string()).collect();
    let table = RawTable::new(headers, rows);
    log::debug!("{}: {} games", entity, table.len());
    Ok(Fetched::Data(table))
}
