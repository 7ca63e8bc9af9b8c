//! stats.ncaa.org scraper
//!
//! Rosters, per-player career logs and team season totals. Every page is
//! addressed by opaque NCAA ids resolved from the season lookup first.

use super::table::{
    document_cells, group_by_delimiter, group_fixed_width, header_cells, locate_table,
    table_cells, trailing_digits, ParsedCell, RawRecord, RawTable,
};
use super::{http_source, Entity, EntityOutcome, Fetched, PageRequest, PageSource, Politeness};
use crate::data::reference::{SchoolLookup, SeasonLookup};
use crate::{Config, PlayerId, Result, RosterConfig, SchoolId, StatVariant, StatsError};
use scraper::Html;
use std::collections::HashSet;

const NCAA_BASE: &str = "https://stats.ncaa.org";

/// Career logs and team totals both sit in the third table on the page
const CAREER_TABLE: usize = 2;
const TEAM_STATS_TABLE: usize = 2;

const PLAYER_ID_COLUMN: &str = "stats_player_seq";
const NAME_COLUMN: &str = "name";

/// Team season totals split into player rows and the aggregate rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamStatsPage {
    /// One row per player, with `stats_player_seq` appended as the last column
    pub players: RawTable,
    pub totals: Option<RawRecord>,
    pub opponent_totals: Option<RawRecord>,
}

impl TeamStatsPage {
    /// The team `Totals` row as a one-row table under the page headers
    pub fn totals_table(&self) -> Option<RawTable> {
        let headers: Vec<String> = self
            .players
            .headers
            .iter()
            .filter(|h| h.as_str() != PLAYER_ID_COLUMN)
            .cloned()
            .collect();
        self.totals
            .as_ref()
            .map(|row| RawTable::new(headers, vec![row.clone()]))
    }
}

/// Career log of one player, tagged with where they were first seen
#[derive(Debug, Clone, PartialEq)]
pub struct CareerLog {
    pub player_id: PlayerId,
    /// Roster display name, still in "Last, First" form
    pub name: String,
    pub school_id: SchoolId,
    pub first_season: u16,
    pub table: RawTable,
}

/// Scraper for stats.ncaa.org
pub struct NcaaScraper {
    source: Box<dyn PageSource>,
    seasons: SeasonLookup,
    roster: RosterConfig,
    politeness: Politeness,
}

impl NcaaScraper {
    pub fn new(
        source: Box<dyn PageSource>,
        seasons: SeasonLookup,
        roster: RosterConfig,
        politeness: Politeness,
    ) -> Self {
        NcaaScraper {
            source,
            seasons,
            roster,
            politeness,
        }
    }

    /// HTTP-backed scraper with the memo and politeness delay from config
    pub fn from_config(config: &Config, seasons: SeasonLookup) -> Result<Self> {
        Ok(Self::new(
            http_source(&config.sources)?,
            seasons,
            config.roster.clone(),
            Politeness::new(config.sources.max_request_delay()),
        ))
    }

    /// Output columns of a roster row for the given season
    pub fn roster_columns(&self, season: u16) -> &[String] {
        self.roster
            .season_overrides
            .iter()
            .find(|o| o.season == season)
            .map(|o| o.columns.as_slice())
            .unwrap_or(self.roster.default_columns.as_slice())
    }

    /// Roster of one school for one season
    pub fn roster(&self, school_id: SchoolId, season: u16) -> Result<Fetched<RawTable>> {
        let ids = self.seasons.get(season)?;
        let entity = Entity::Roster { school_id, season };
        let request = PageRequest::new(format!(
            "{}/team/{}/roster/{}",
            NCAA_BASE, school_id, ids.season_id
        ));
        let html = self.source.fetch(&request)?;
        self.parse_roster(&html, season, &entity)
    }

    fn parse_roster(&self, html: &str, season: u16, entity: &Entity) -> Result<Fetched<RawTable>> {
        let document = Html::parse_document(html);
        let cells = document_cells(&document)?;
        if cells.is_empty() {
            log::info!("{}: no roster cells", entity);
            return Ok(Fetched::NoData);
        }

        let columns = self.roster_columns(season).to_vec();
        let player_cell = columns.iter().position(|c| c == PLAYER_ID_COLUMN);
        // the player cell expands into id + name
        let raw_width = match player_cell {
            Some(_) => columns.len().saturating_sub(1),
            None => columns.len(),
        };
        if raw_width == 0 {
            return Err(StatsError::Config(format!(
                "roster column set for {} is empty",
                season
            )));
        }

        let mut rows = Vec::new();
        for chunk in group_fixed_width(&cells, raw_width) {
            let mut values = Vec::with_capacity(columns.len());
            for (idx, cell) in chunk.iter().enumerate() {
                if Some(idx) == player_cell {
                    values.push(player_id_of(cell)?);
                    values.push(cell.value.clone());
                } else {
                    values.push(cell.value.clone());
                }
            }
            rows.push(RawRecord::new(values));
        }

        let table = RawTable::new(columns, rows);
        table.check_shape(entity)?;
        log::info!("{}: {} players", entity, table.len());
        Ok(Fetched::Data(table))
    }

    /// Game-by-game career page of one player; the career totals row is dropped
    pub fn career(
        &self,
        player_id: &PlayerId,
        season_id: u32,
        school_id: SchoolId,
    ) -> Result<Fetched<RawTable>> {
        let entity = Entity::Career {
            player_id: player_id.clone(),
            season_id,
            school_id,
        };
        let request = PageRequest::new(format!("{}/player/game_by_game", NCAA_BASE))
            .param("game_sport_year_ctl_id", season_id)
            .param("stats_player_seq", player_id)
            .param("org_id", school_id);
        let html = self.source.fetch(&request)?;
        parse_career(&html, &entity)
    }

    /// Batting or pitching season totals for one school
    pub fn team_stats(
        &self,
        school_id: SchoolId,
        season: u16,
        variant: StatVariant,
    ) -> Result<Fetched<TeamStatsPage>> {
        let ids = self.seasons.get(season)?;
        let category_id = match variant {
            StatVariant::Batting => ids.batting_id,
            StatVariant::Pitching => ids.pitching_id,
        };
        let entity = Entity::TeamStats {
            school_id,
            season,
            variant,
        };
        let request = PageRequest::new(format!("{}/team/{}/stats", NCAA_BASE, school_id))
            .param("game_sport_year_ctl_id", ids.season_id)
            .param("id", ids.season_id)
            .param("year_stat_category_id", category_id);
        let html = self.source.fetch(&request)?;
        parse_team_stats(&html, &entity)
    }

    /// Rosters for every season in `start..=end`, ascending
    pub fn multiyear_roster(
        &self,
        school_id: SchoolId,
        start: u16,
        end: u16,
    ) -> Vec<EntityOutcome<RawTable>> {
        let pairs: Vec<_> = (start..=end).map(|season| (school_id, season)).collect();
        self.roster_database(&pairs)
    }

    /// Rosters for an arbitrary list of (school, season) pairs, in list order
    pub fn roster_database(&self, school_seasons: &[(SchoolId, u16)]) -> Vec<EntityOutcome<RawTable>> {
        let mut outcomes = Vec::with_capacity(school_seasons.len());
        for (idx, &(school_id, season)) in school_seasons.iter().enumerate() {
            if idx > 0 {
                self.politeness.pause();
            }
            let entity = Entity::Roster { school_id, season };
            outcomes.push(EntityOutcome::new(entity, self.roster(school_id, season)));
            if (idx + 1) % 50 == 0 {
                log::info!("Rosters fetched: {}/{}", idx + 1, school_seasons.len());
            }
        }
        outcomes
    }

    /// Career logs of everyone who appeared on a roster in `start..=end`.
    /// Roster failures are passed through under their roster entity.
    pub fn team_career_records(
        &self,
        school_id: SchoolId,
        start: u16,
        end: u16,
    ) -> Vec<EntityOutcome<CareerLog>> {
        let mut outcomes = Vec::new();
        let mut players: Vec<(PlayerId, String, u16)> = Vec::new();
        let mut seen = HashSet::new();

        for roster in self.multiyear_roster(school_id, start, end) {
            let season = match &roster.entity {
                Entity::Roster { season, .. } => *season,
                _ => continue,
            };
            match roster.result {
                Ok(Fetched::Data(table)) => {
                    for row in &table.rows {
                        let id = table.cell(row, PLAYER_ID_COLUMN).unwrap_or("").trim();
                        if id.is_empty() || !seen.insert(id.to_string()) {
                            continue;
                        }
                        let name = table.cell(row, NAME_COLUMN).unwrap_or("").to_string();
                        players.push((PlayerId(id.to_string()), name, season));
                    }
                }
                Ok(Fetched::NoData) => {}
                Err(e) => outcomes.push(EntityOutcome {
                    entity: roster.entity,
                    result: Err(e),
                }),
            }
        }
        log::info!(
            "School {}: {} players on rosters {}-{}",
            school_id,
            players.len(),
            start,
            end
        );

        for (player_id, name, first_season) in players {
            self.politeness.pause();
            let season_id = match self.seasons.get(first_season) {
                Ok(ids) => ids.season_id,
                Err(e) => {
                    log::warn!("{}: {}", player_id, e);
                    continue;
                }
            };
            let entity = Entity::Career {
                player_id: player_id.clone(),
                season_id,
                school_id,
            };
            let result = self.career(&player_id, season_id, school_id).map(|fetched| {
                fetched.map(|table| CareerLog {
                    player_id: player_id.clone(),
                    name: name.clone(),
                    school_id,
                    first_season,
                    table,
                })
            });
            outcomes.push(EntityOutcome::new(entity, result));
        }
        outcomes
    }

    /// Career logs for every school listed under `conference`
    pub fn conference_records(
        &self,
        schools: &SchoolLookup,
        conference: &str,
        start: u16,
        end: u16,
    ) -> Result<Vec<EntityOutcome<CareerLog>>> {
        let members = schools.in_conference(conference);
        if members.is_empty() {
            return Err(StatsError::LookupMiss {
                table: "school lookup",
                key: conference.to_string(),
            });
        }

        let mut outcomes = Vec::new();
        for (idx, member) in members.iter().enumerate() {
            if idx > 0 {
                self.politeness.pause();
            }
            log::info!("Conference {}: fetching {}", conference, member.school);
            outcomes.extend(self.team_career_records(SchoolId(member.school_id), start, end));
        }
        Ok(outcomes)
    }
}

fn player_id_of(cell: &ParsedCell) -> Result<String> {
    match &cell.href {
        Some(href) => Ok(trailing_digits(href)?.unwrap_or_default()),
        None => Ok(String::new()),
    }
}

fn parse_career(html: &str, entity: &Entity) -> Result<Fetched<RawTable>> {
    let document = Html::parse_document(html);
    let table = locate_table(&document, CAREER_TABLE, entity)?;
    let headers = header_cells(table)?;
    let rows = group_by_delimiter(&table_cells(table)?);
    if rows.is_empty() {
        log::info!("{}: no season rows", entity);
        return Ok(Fetched::NoData);
    }

    let table = RawTable::new(headers, rows);
    table.check_shape(entity)?;
    Ok(Fetched::Data(table))
}

fn parse_team_stats(html: &str, entity: &Entity) -> Result<Fetched<TeamStatsPage>> {
    let document = Html::parse_document(html);
    let table = locate_table(&document, TEAM_STATS_TABLE, entity)?;
    let headers = header_cells(table)?;
    if headers.is_empty() {
        return Err(StatsError::StructuralParse {
            entity: entity.to_string(),
            message: "stats table has no header row".to_string(),
        });
    }
    let player_col = headers.iter().position(|h| h == "Player");

    let mut page = TeamStatsPage::default();
    for chunk in group_fixed_width(&table_cells(table)?, headers.len()) {
        let label = player_col
            .and_then(|idx| chunk.get(idx))
            .map(|c| c.text.as_str())
            .unwrap_or("");
        let mut values: Vec<String> = chunk.iter().map(|c| c.value.clone()).collect();

        match label {
            "Totals" => page.totals = Some(RawRecord::new(values)),
            "Opponent Totals" => page.opponent_totals = Some(RawRecord::new(values)),
            _ => {
                let id = match player_col.and_then(|idx| chunk.get(idx)) {
                    Some(cell) => player_id_of(cell)?,
                    None => String::new(),
                };
                values.push(id);
                page.players.rows.push(RawRecord::new(values));
            }
        }
    }

    if page.players.rows.is_empty() && page.totals.is_none() {
        log::info!("{}: empty stats table", entity);
        return Ok(Fetched::NoData);
    }

    let mut player_headers = headers;
    player_headers.push(PLAYER_ID_COLUMN.to_string());
    page.players.headers = player_headers;
    page.players.check_shape(entity)?;
    Ok(Fetched::Data(page))
}

#[cfg(test)]
mod tests {
    use super::super::testing::StubSource;
    use super::*;
    use crate::data::reference::{SchoolEntry, SeasonIds};
    use crate::SeasonColumns;
    use std::rc::Rc;

    fn seasons() -> SeasonLookup {
        SeasonLookup::from_rows(vec![
            SeasonIds {
                season: 2019,
                season_id: 14781,
                batting_id: 14643,
                pitching_id: 14644,
            },
            SeasonIds {
                season: 2021,
                season_id: 15580,
                batting_id: 14841,
                pitching_id: 14842,
            },
        ])
    }

    fn scraper(stub: Rc<StubSource>) -> NcaaScraper {
        NcaaScraper::new(
            Box::new(stub),
            seasons(),
            Config::default().roster,
            Politeness::disabled(),
        )
    }

    fn roster_row(jersey: &str, id: &str, name: &str) -> String {
        format!(
            r#"<tr><td>{}</td><td><a href="/players/{}">{}</a></td><td>P</td><td>Jr</td><td>12</td><td>4</td></tr>"#,
            jersey, id, name
        )
    }

    const CAREER_HTML: &str = r#"
        <table><tr><td>header</td></tr></table>
        <table><tr><td>nav</td></tr></table>
        <table>
          <tr><th>Year</th><th>Team</th><th>GP</th><th>H</th></tr>
          <tr><td>2018-19</td><td><a href="/teams/1">Cornell</a></td><td data-order="20">20</td><td data-order="15">15</td></tr>
          <tr><td>2020-21</td><td><a href="/teams/2">Cornell</a></td><td data-order="8">8</td><td data-order="-">-</td></tr>
          <tr><td>Career</td><td></td><td data-order="28">28</td><td data-order="15">15</td></tr>
        </table>"#;

    const TEAM_STATS_HTML: &str = r#"
        <table></table><table></table>
        <table>
          <tr><th>Jersey</th><th>Player</th><th>AB</th><th>H</th></tr>
          <tr><td>7</td><td><a href="/players/1234567">Savino, Nate</a></td><td data-order="40">40</td><td data-order="12">12</td></tr>
          <tr><td>9</td><td><a href="/players/7654321">Smith, Al</a></td><td data-order="30">30</td><td data-order="9">9</td></tr>
          <tr><td></td><td>Totals</td><td data-order="70">70</td><td data-order="21">21</td></tr>
          <tr><td></td><td>Opponent Totals</td><td data-order="75">75</td><td data-order="19">19</td></tr>
        </table>"#;

    #[test]
    fn test_roster_fixed_width() {
        let html = format!(
            "<table>{}{}</table>",
            roster_row("7", "1234567", "Savino, Nate"),
            roster_row("9", "7654321", "Smith, Al")
        );
        let stub = Rc::new(StubSource::new().page("https://stats.ncaa.org/team/167/roster/15580", &html));
        let table = scraper(Rc::clone(&stub))
            .roster(SchoolId(167), 2021)
            .unwrap()
            .data()
            .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(&table.rows[0], "stats_player_seq"), Some("1234567"));
        assert_eq!(table.cell(&table.rows[0], "name"), Some("Savino, Nate"));
        assert_eq!(table.cell(&table.rows[1], "games_started"), Some("4"));
    }

    #[test]
    fn test_roster_shape_follows_season_override() {
        let mut roster = Config::default().roster;
        roster.season_overrides = vec![SeasonColumns {
            season: 2021,
            columns: vec!["jersey".into(), "stats_player_seq".into(), "name".into()],
        }];
        let stub = Rc::new(StubSource::new().page(
            "https://stats.ncaa.org/team/167/roster/15580",
            r#"<table><tr><td>7</td><td>Walk, On</td></tr></table>"#,
        ));
        let ncaa = NcaaScraper::new(Box::new(stub), seasons(), roster, Politeness::disabled());

        let table = ncaa.roster(SchoolId(167), 2021).unwrap().data().unwrap();
        assert_eq!(table.headers.len(), 3);
        // no link, so no id
        assert_eq!(table.cell(&table.rows[0], "stats_player_seq"), Some(""));
        assert_eq!(table.cell(&table.rows[0], "name"), Some("Walk, On"));
        assert_eq!(ncaa.roster_columns(2019).len(), 7);
    }

    #[test]
    fn test_roster_unknown_season_never_requests() {
        let stub = Rc::new(StubSource::new());
        let err = scraper(Rc::clone(&stub)).roster(SchoolId(167), 1999).unwrap_err();
        assert!(matches!(err, StatsError::LookupMiss { .. }));
        assert_eq!(stub.calls.get(), 0);
    }

    #[test]
    fn test_empty_roster_is_no_data() {
        let stub = Rc::new(StubSource::new().page("https://stats.ncaa.org/team/", "<html><body></body></html>"));
        let fetched = scraper(stub).roster(SchoolId(167), 2021).unwrap();
        assert_eq!(fetched, Fetched::NoData);
    }

    #[test]
    fn test_career_rows_exclude_totals() {
        let stub = Rc::new(StubSource::new().page("https://stats.ncaa.org/player/game_by_game", CAREER_HTML));
        let table = scraper(Rc::clone(&stub))
            .career(&PlayerId("1234567".into()), 15580, SchoolId(167))
            .unwrap()
            .data()
            .unwrap();

        assert_eq!(table.headers, vec!["Year", "Team", "GP", "H"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0].cells, vec!["2018-19", "Cornell", "20", "15"]);
        assert_eq!(table.cell(&table.rows[1], "H"), Some("-"));
        assert_eq!(
            stub.seen.borrow()[0],
            "https://stats.ncaa.org/player/game_by_game?game_sport_year_ctl_id=15580&stats_player_seq=1234567&org_id=167"
        );
    }

    #[test]
    fn test_career_too_few_tables_is_structural() {
        let stub = Rc::new(StubSource::new().page("https://stats.ncaa.org/player/", "<table></table>"));
        let err = scraper(stub)
            .career(&PlayerId("1".into()), 15580, SchoolId(167))
            .unwrap_err();
        assert!(matches!(err, StatsError::StructuralParse { .. }));
    }

    #[test]
    fn test_team_stats_splits_totals() {
        let stub = Rc::new(StubSource::new().page("https://stats.ncaa.org/team/167/stats", TEAM_STATS_HTML));
        let page = scraper(Rc::clone(&stub))
            .team_stats(SchoolId(167), 2021, StatVariant::Pitching)
            .unwrap()
            .data()
            .unwrap();

        assert_eq!(page.players.len(), 2);
        assert_eq!(page.players.headers.last().map(|s| s.as_str()), Some("stats_player_seq"));
        assert_eq!(page.players.cell(&page.players.rows[1], "stats_player_seq"), Some("7654321"));
        assert_eq!(page.totals.as_ref().and_then(|r| r.get(2)), Some("70"));
        assert_eq!(page.opponent_totals.as_ref().and_then(|r| r.get(3)), Some("19"));
        assert_eq!(page.totals_table().unwrap().len(), 1);
        assert!(stub.seen.borrow()[0].ends_with("game_sport_year_ctl_id=15580&id=15580&year_stat_category_id=14842"));
    }

    #[test]
    fn test_bulk_roster_continues_past_failures() {
        let html = format!("<table>{}</table>", roster_row("7", "1234567", "Savino, Nate"));
        let stub = Rc::new(StubSource::new().page("https://stats.ncaa.org/team/167/roster/15580", &html));
        let outcomes = scraper(stub).multiyear_roster(SchoolId(167), 2019, 2021);

        assert_eq!(outcomes.len(), 3);
        // 2019 page missing from the stub, 2020 missing from the lookup
        assert!(matches!(outcomes[0].result, Err(StatsError::Fetch { .. })));
        assert!(matches!(outcomes[1].result, Err(StatsError::LookupMiss { .. })));
        assert!(outcomes[2].data().is_some());
        assert_eq!(
            outcomes[2].entity,
            Entity::Roster {
                school_id: SchoolId(167),
                season: 2021
            }
        );
    }

    #[test]
    fn test_team_career_records_fetch_each_player_once() {
        let roster_2019 = format!(
            "<table>{}{}</table>",
            roster_row("7", "1234567", "Savino, Nate"),
            roster_row("9", "7654321", "Smith, Al")
        );
        let roster_2021 = format!("<table>{}</table>", roster_row("7", "1234567", "Savino, Nate"));
        let stub = Rc::new(
            StubSource::new()
                .page("https://stats.ncaa.org/team/167/roster/14781", &roster_2019)
                .page("https://stats.ncaa.org/team/167/roster/15580", &roster_2021)
                .page("https://stats.ncaa.org/player/game_by_game", CAREER_HTML),
        );
        let ncaa = scraper(Rc::clone(&stub));
        let outcomes = ncaa.team_career_records(SchoolId(167), 2021, 2021);
        assert_eq!(outcomes.len(), 1);

        let outcomes = ncaa.team_career_records(SchoolId(167), 2019, 2019);
        let logs: Vec<_> = outcomes.iter().filter_map(|o| o.data()).collect();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].name, "Savino, Nate");
        assert_eq!(logs[0].first_season, 2019);
        assert_eq!(logs[1].player_id, PlayerId("7654321".into()));
    }

    #[test]
    fn test_conference_records_unknown_conference() {
        let schools = SchoolLookup::from_entries(vec![SchoolEntry {
            school: "Cornell".into(),
            school_id: 167,
            conference: Some("Ivy League".into()),
        }]);
        let stub = Rc::new(StubSource::new());
        let err = scraper(stub)
            .conference_records(&schools, "Big Ten", 2021, 2021)
            .unwrap_err();
        assert!(matches!(err, StatsError::LookupMiss { .. }));
    }

    #[test]
    fn test_conference_records_pause_between_schools() {
        let schools = SchoolLookup::from_entries(vec![
            SchoolEntry {
                school: "Cornell".into(),
                school_id: 167,
                conference: Some("Ivy League".into()),
            },
            SchoolEntry {
                school: "Yale".into(),
                school_id: 813,
                conference: Some("Ivy League".into()),
            },
        ]);
        let stub = Rc::new(StubSource::new());
        let ncaa = scraper(Rc::clone(&stub));
        let outcomes = ncaa.conference_records(&schools, "Ivy League", 2021, 2021).unwrap();

        // one failed roster per school, no players to follow up
        assert_eq!(outcomes.len(), 2);
        assert_eq!(stub.calls.get(), 2);
        assert_eq!(ncaa.politeness.pauses(), 1);
    }
}
