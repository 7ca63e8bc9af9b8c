//! Report builder
//!
//! Resolves human-readable keys, fetches pages, normalizes rows and runs the
//! metric engine. Per-entity failures are carried in the output instead of
//! aborting the batch.

use super::{RunDifferentialReport, TeamBattingReport, TeamPitchingReport};
use crate::data::normalize::{game_records, player_records, PlayerSeasonRecord, RecordContext};
use crate::data::reference::{ReferenceData, SchoolLookup};
use crate::data::scrapers::ncaa::CareerLog;
use crate::data::scrapers::{
    BoydsWorldScraper, Entity, EntityOutcome, Fetched, NcaaScraper, TeamStatsPage,
};
use crate::metrics::games::{run_differential_log, team_games, CumulativeReset, TeamGame};
use crate::metrics::{ConferencePythag, MetricEngine, MetricOutcome};
use crate::{Config, PlayerId, Result, SchoolId, StatVariant, StatsError};

/// Pythagenpat comparisons are reported to two places
const PYTHAG_PLACES: u32 = 2;

/// Entry point for dashboard record batches
pub struct ReportBuilder {
    schools: SchoolLookup,
    ncaa: NcaaScraper,
    boyds: BoydsWorldScraper,
    engine: MetricEngine,
    default_conference: String,
}

impl ReportBuilder {
    pub fn new(reference: ReferenceData, ncaa: NcaaScraper, boyds: BoydsWorldScraper, config: &Config) -> Self {
        ReportBuilder {
            schools: reference.schools,
            ncaa,
            boyds,
            engine: MetricEngine::new(reference.weights, config.metrics.clone()),
            default_conference: config.data.default_conference.clone(),
        }
    }

    /// Load the reference tables and build HTTP scrapers from config
    pub fn from_config(config: &Config) -> Result<Self> {
        let reference = ReferenceData::load(&config.data)?;
        log::info!(
            "Loaded {} seasons, {} schools and weights for {} seasons",
            reference.seasons.len(),
            reference.schools.entries().len(),
            reference.weights.seasons().count()
        );
        let ncaa = NcaaScraper::from_config(config, reference.seasons.clone())?;
        let boyds = BoydsWorldScraper::from_config(config)?;
        Ok(Self::new(reference, ncaa, boyds, config))
    }

    /// Batting metrics for every player of a school season, plus team totals
    pub fn team_batting(&self, school: &str, season: u16) -> Result<Fetched<TeamBattingReport>> {
        let school_id = self.schools.school_id(school)?;
        let page = match self.ncaa.team_stats(school_id, season, StatVariant::Batting)? {
            Fetched::Data(page) => page,
            Fetched::NoData => return Ok(Fetched::NoData),
        };

        let records = player_records(&page.players, &RecordContext::for_team(school_id, season))?;
        let players = self.engine.batting_batch(&records);
        let team = totals_record(&page, school_id, season)?
            .map(|r| MetricOutcome::new(&r, self.engine.batting(&r)));

        Ok(Fetched::Data(TeamBattingReport {
            school_id,
            season,
            players,
            team,
        }))
    }

    /// Pitching metrics for every player of a school season, plus team totals
    pub fn team_pitching(&self, school: &str, season: u16) -> Result<Fetched<TeamPitchingReport>> {
        let school_id = self.schools.school_id(school)?;
        let page = match self.ncaa.team_stats(school_id, season, StatVariant::Pitching)? {
            Fetched::Data(page) => page,
            Fetched::NoData => return Ok(Fetched::NoData),
        };

        let records = player_records(&page.players, &RecordContext::for_team(school_id, season))?;
        let players = self.engine.pitching_batch(&records);
        let team = totals_record(&page, school_id, season)?
            .map(|r| MetricOutcome::new(&r, self.engine.pitching(&r)));

        Ok(Fetched::Data(TeamPitchingReport {
            school_id,
            season,
            players,
            team,
        }))
    }

    /// Normalized career seasons of everyone on a school's rosters in range
    pub fn career_records(
        &self,
        school: &str,
        start: u16,
        end: u16,
    ) -> Result<Vec<EntityOutcome<Vec<PlayerSeasonRecord>>>> {
        let school_id = self.schools.school_id(school)?;
        Ok(self
            .ncaa
            .team_career_records(school_id, start, end)
            .into_iter()
            .map(normalize_career)
            .collect())
    }

    /// Normalized career seasons for every school of a conference
    pub fn conference_records(
        &self,
        conference: &str,
        start: u16,
        end: u16,
    ) -> Result<Vec<EntityOutcome<Vec<PlayerSeasonRecord>>>> {
        Ok(self
            .ncaa
            .conference_records(&self.schools, conference, start, end)?
            .into_iter()
            .map(normalize_career)
            .collect())
    }

    /// One outcome per season, each holding that season's games in date order
    pub fn season_games(&self, team: &str, start: u16, end: u16) -> Vec<EntityOutcome<Vec<TeamGame>>> {
        self.boyds
            .games_by_season(team, start, end)
            .into_iter()
            .map(|outcome| EntityOutcome {
                entity: outcome.entity,
                result: outcome
                    .result
                    .map(|fetched| fetched.map(|table| team_games(&game_records(&table), team))),
            })
            .collect()
    }

    /// Running game number and cumulative run differential across seasons
    pub fn run_differential(
        &self,
        team: &str,
        start: u16,
        end: u16,
        reset: CumulativeReset,
    ) -> RunDifferentialReport {
        let mut games = Vec::new();
        let mut failed = Vec::new();
        for outcome in self.season_games(team, start, end) {
            match outcome.result {
                Ok(Fetched::Data(season)) => games.extend(season),
                Ok(Fetched::NoData) => {}
                Err(_) => failed.push(outcome.entity),
            }
        }
        RunDifferentialReport {
            log: run_differential_log(&games, reset),
            failed,
        }
    }

    /// Pythagenpat vs actual in-conference win percentage for every school
    /// the school table lists under `conference`
    pub fn conference_pythag(
        &self,
        conference: &str,
        start: u16,
        end: u16,
    ) -> Result<Vec<EntityOutcome<ConferencePythag>>> {
        let members: Vec<&str> = self
            .schools
            .in_conference(conference)
            .into_iter()
            .map(|entry| entry.school.as_str())
            .collect();
        if members.is_empty() {
            return Err(StatsError::LookupMiss {
                table: "school lookup",
                key: conference.to_string(),
            });
        }
        log::info!("Conference {}: {} teams", conference, members.len());
        Ok(self.members_pythag(&members, start, end))
    }

    /// [`ReportBuilder::conference_pythag`] for `data.default_conference`
    pub fn default_conference_pythag(&self, start: u16, end: u16) -> Result<Vec<EntityOutcome<ConferencePythag>>> {
        self.conference_pythag(&self.default_conference, start, end)
    }

    fn members_pythag(&self, members: &[&str], start: u16, end: u16) -> Vec<EntityOutcome<ConferencePythag>> {
        let mut outcomes = Vec::with_capacity(members.len());
        for (idx, team) in members.iter().enumerate() {
            if idx > 0 {
                self.boyds.pause();
            }
            let entity = Entity::Games {
                team: team.to_string(),
                opponent: None,
                start,
                end,
            };
            let result = self.boyds.games(team, None, start, end).map(|fetched| {
                fetched.map(|table| {
                    let games = team_games(&game_records(&table), team);
                    ConferencePythag::compute(team, &games, members, PYTHAG_PLACES)
                })
            });
            outcomes.push(EntityOutcome::new(entity, result));
        }
        outcomes
    }
}

/// The `Totals` row as a record keyed by the school id
fn totals_record(page: &TeamStatsPage, school_id: SchoolId, season: u16) -> Result<Option<PlayerSeasonRecord>> {
    let table = match page.totals_table() {
        Some(table) => table,
        None => return Ok(None),
    };
    let ctx = RecordContext {
        player_id: Some(PlayerId(school_id.to_string())),
        season: Some(season),
        school_id: Some(school_id),
        name: None,
    };
    Ok(player_records(&table, &ctx)?.into_iter().next())
}

fn normalize_career(outcome: EntityOutcome<CareerLog>) -> EntityOutcome<Vec<PlayerSeasonRecord>> {
    let result = outcome.result.and_then(|fetched| match fetched {
        Fetched::Data(log) => {
            let ctx = RecordContext::for_player(log.player_id.clone(), log.school_id, Some(log.name.clone()));
            player_records(&log.table, &ctx).map(Fetched::Data)
        }
        Fetched::NoData => Ok(Fetched::NoData),
    });
    EntityOutcome {
        entity: outcome.entity,
        result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::reference::{SchoolEntry, SeasonIds, SeasonLookup, SeasonWeights, WeightsIndex};
    use crate::data::scrapers::testing::StubSource;
    use crate::data::scrapers::Politeness;
    use crate::metrics::MetricValue;

    const BATTING_HTML: &str = r#"
        <table></table><table></table>
        <table>
          <tr><th>Player</th><th>AB</th><th>H</th><th>2B</th><th>BB</th><th>K</th></tr>
          <tr><td><a href="/players/1234567">Savino, Nate</a></td><td>40</td><td>12</td><td>3</td><td>5</td><td>8</td></tr>
          <tr><td><a href="/players/7654321">Smith, Al</a></td><td>0</td><td>-</td><td>-</td><td>-</td><td>-</td></tr>
          <tr><td>Totals</td><td>40</td><td>12</td><td>3</td><td>5</td><td>8</td></tr>
        </table>"#;

    const PITCHING_HTML: &str = r#"
        <table></table><table></table>
        <table>
          <tr><th>Player</th><th>IP</th><th>H</th><th>R</th><th>BB</th><th>SO</th><th>HR-A</th><th>ERA</th></tr>
          <tr><td><a href="/players/1234567">Savino, Nate</a></td><td>30.1</td><td>28</td><td>12</td><td>9</td><td>31</td><td>2</td><td>3.26</td></tr>
          <tr><td><a href="/players/7654321">Smith, Al</a></td><td>0.0</td><td>2</td><td>3</td><td>1</td><td>0</td><td>0</td><td>-</td></tr>
        </table>"#;

    fn games_page(rows: &[(&str, &str, u32, &str, u32)]) -> String {
        let body: String = rows
            .iter()
            .map(|(date, t1, s1, t2, s2)| {
                format!(
                    "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>@ Ithaca, NY</td></tr>",
                    date, t1, s1, t2, s2
                )
            })
            .collect();
        format!("<table></table><table>{}</table>", body)
    }

    fn reference() -> ReferenceData {
        ReferenceData {
            seasons: SeasonLookup::from_rows(vec![SeasonIds {
                season: 2021,
                season_id: 15580,
                batting_id: 14841,
                pitching_id: 14842,
            }]),
            schools: SchoolLookup::from_entries(vec![
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
                SchoolEntry {
                    school: "Army".into(),
                    school_id: 725,
                    conference: Some("Patriot League".into()),
                },
                SchoolEntry {
                    school: "Navy".into(),
                    school_id: 726,
                    conference: Some("Patriot League".into()),
                },
            ]),
            weights: WeightsIndex::from_rows(vec![SeasonWeights {
                season: 2021,
                league_woba: 0.350,
                woba_scale: 1.2,
                w_bb: 0.7,
                w_hbp: 0.73,
                w_1b: 0.9,
                w_2b: 1.25,
                w_3b: 1.6,
                w_hr: 2.0,
                league_runs_per_pa: 0.15,
                fip_constant: 4.1,
            }])
            .unwrap(),
        }
    }

    fn builder(ncaa: StubSource, boyds: StubSource) -> ReportBuilder {
        let _ = env_logger::builder().is_test(true).try_init();
        let config = Config::default();
        let reference = reference();
        let ncaa = NcaaScraper::new(
            Box::new(ncaa),
            reference.seasons.clone(),
            config.roster.clone(),
            Politeness::disabled(),
        );
        let boyds = BoydsWorldScraper::new(Box::new(boyds), Politeness::disabled());
        ReportBuilder::new(reference, ncaa, boyds, &config)
    }

    #[test]
    fn test_team_batting_report() {
        let b = builder(
            StubSource::new().page("https://stats.ncaa.org/team/167/stats", BATTING_HTML),
            StubSource::new(),
        );
        let report = b.team_batting("Cornell", 2021).unwrap().data().unwrap();

        assert_eq!(report.school_id, SchoolId(167));
        assert_eq!(report.players.len(), 2);
        let nate = report.players[0].ok().unwrap();
        assert_eq!(nate.plate_appearances, 45.0);
        assert!(nate.woba > 0.0);

        // no plate appearances at all
        let al = report.players[1].ok().unwrap();
        assert_eq!(al.woba, 0.0);
        assert_eq!(al.wrc, MetricValue::Value(0.0));

        let team = report.team.as_ref().and_then(|t| t.ok()).unwrap();
        assert_eq!(team.player_id, PlayerId("167".into()));
        assert_eq!(team.woba, nate.woba);
    }

    #[test]
    fn test_team_pitching_report() {
        let b = builder(
            StubSource::new().page("https://stats.ncaa.org/team/167/stats", PITCHING_HTML),
            StubSource::new(),
        );
        let report = b.team_pitching("cornell", 2021).unwrap().data().unwrap();

        assert_eq!(report.players.len(), 2);
        assert!(report.team.is_none());
        let nate = report.players[0].ok().unwrap();
        assert_eq!(nate.innings_pitched, 30.333);
        assert_eq!(nate.era, Some(3.26));
        assert!(nate.fip.is_resolved());

        let al = report.players[1].ok().unwrap();
        assert_eq!(al.whip, 0.0);
        assert!(!al.fip.is_resolved());
    }

    #[test]
    fn test_unknown_school_fails_before_fetch() {
        let b = builder(StubSource::new(), StubSource::new());
        assert!(matches!(
            b.team_batting("Harvard", 2021),
            Err(crate::StatsError::LookupMiss { .. })
        ));
    }

    #[test]
    fn test_run_differential_across_seasons() {
        let boyds = StubSource::new()
            .page(
                "http://www.boydsworld.com/cgi/scores.pl?team1=Cornell&firstyear=2019",
                &games_page(&[
                    ("4/7/2019", "Yale", 6, "Cornell", 2),
                    ("4/6/2019", "Cornell", 5, "Yale", 3),
                ]),
            )
            .page(
                "http://www.boydsworld.com/cgi/scores.pl?team1=Cornell&firstyear=2021",
                &games_page(&[("3/20/2021", "Cornell", 8, "Army", 1)]),
            );
        let b = builder(StubSource::new(), boyds);
        let report = b.run_differential("Cornell", 2019, 2021, CumulativeReset::Continuous);

        // 2020 has no page in the stub
        assert_eq!(report.failed.len(), 1);
        let diffs: Vec<_> = report.log.iter().map(|e| e.cumulative.run_difference).collect();
        assert_eq!(diffs, vec![2, -2, 5]);
        assert!(report.log.windows(2).all(|w| w[0].game.date <= w[1].game.date));
    }

    #[test]
    fn test_conference_pythag() {
        let boyds = StubSource::new()
            .page(
                "http://www.boydsworld.com/cgi/scores.pl?team1=Cornell",
                &games_page(&[
                    ("4/6/2019", "Cornell", 5, "Yale", 3),
                    ("4/7/2019", "Yale", 6, "Cornell", 2),
                    ("3/20/2019", "Cornell", 8, "Army", 1),
                ]),
            )
            .page(
                "http://www.boydsworld.com/cgi/scores.pl?team1=Yale",
                &games_page(&[
                    ("4/6/2019", "Cornell", 5, "Yale", 3),
                    ("4/7/2019", "Yale", 6, "Cornell", 2),
                ]),
            );
        let b = builder(StubSource::new(), boyds);
        let rows = b.default_conference_pythag(2019, 2019).unwrap();

        assert_eq!(rows.len(), 2);
        let cornell = rows[0].data().unwrap();
        assert_eq!(cornell.actual_pct, MetricValue::Value(0.5));
        let yale = rows[1].data().unwrap();
        assert_eq!(yale.actual_pct, MetricValue::Value(0.5));
        let total = cornell.pythagenpat_pct.value().unwrap() + yale.pythagenpat_pct.value().unwrap();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(cornell.pythagenpat_pct.value().unwrap() < 0.5);
    }

    #[test]
    fn test_conference_pythag_members_from_school_table() {
        let boyds = StubSource::new()
            .page(
                "http://www.boydsworld.com/cgi/scores.pl?team1=Army",
                &games_page(&[
                    ("4/10/2021", "Army", 9, "Navy", 1),
                    ("4/11/2021", "Army", 4, "Navy", 3),
                    ("3/20/2021", "Cornell", 8, "Army", 1),
                ]),
            )
            .page(
                "http://www.boydsworld.com/cgi/scores.pl?team1=Navy",
                &games_page(&[("4/10/2021", "Army", 9, "Navy", 1)]),
            );
        let b = builder(StubSource::new(), boyds);
        let rows = b.conference_pythag("patriot league", 2021, 2021).unwrap();

        let teams: Vec<_> = rows.iter().filter_map(|r| r.data()).map(|p| p.team.as_str()).collect();
        assert_eq!(teams, vec!["Army", "Navy"]);
        // the loss to Cornell is outside the conference
        let army = rows[0].data().unwrap();
        assert_eq!(army.actual_pct, MetricValue::Value(1.0));
        let navy = rows[1].data().unwrap();
        assert_eq!(navy.actual_pct, MetricValue::Value(0.0));
    }

    #[test]
    fn test_conference_pythag_unknown_conference() {
        let b = builder(StubSource::new(), StubSource::new());
        assert!(matches!(
            b.conference_pythag("Big Ten", 2021, 2021),
            Err(StatsError::LookupMiss { .. })
        ));
    }
}
