//! Web scrapers for collegiate baseball data
//!
//! Every request goes through a [`PageSource`]; the HTTP implementation sits
//! behind a bounded memo so one report never fetches the same page twice.

pub mod boydsworld;
pub mod ncaa;
pub mod table;

pub use boydsworld::BoydsWorldScraper;
pub use ncaa::{NcaaScraper, TeamStatsPage};
pub use table::{RawRecord, RawTable};

use crate::{DataSource, PlayerId, Result, SchoolId, SourceConfig, StatVariant, StatsError};
use rand::Rng;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::time::Duration;

/// A single outbound GET: base URL plus query parameters in send order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
}

impl PageRequest {
    pub fn new(url: impl Into<String>) -> Self {
        PageRequest {
            url: url.into(),
            query: Vec::new(),
        }
    }

    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// URL with the query appended; used as the memo key and in logs
    pub fn cache_key(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        let query: Vec<String> = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        format!("{}?{}", self.url, query.join("&"))
    }
}

/// Anything that can turn a request into a response body
pub trait PageSource {
    fn fetch(&self, request: &PageRequest) -> Result<String>;
}

impl<S: PageSource + ?Sized> PageSource for Box<S> {
    fn fetch(&self, request: &PageRequest) -> Result<String> {
        (**self).fetch(request)
    }
}

/// Blocking reqwest client with the configured user agent and timeout
pub struct HttpPageSource {
    client: reqwest::blocking::Client,
}

impl HttpPageSource {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout())
            .build()
            .map_err(|e| StatsError::Config(format!("HTTP client: {}", e)))?;
        Ok(HttpPageSource { client })
    }
}

impl PageSource for HttpPageSource {
    fn fetch(&self, request: &PageRequest) -> Result<String> {
        let key = request.cache_key();
        log::info!("GET {}", key);

        let response = self
            .client
            .get(&request.url)
            .query(&request.query)
            .send()
            .map_err(|e| StatsError::Fetch {
                entity: key.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(StatsError::Fetch {
                entity: key,
                message: "HTTP 403, request blocked by the remote site".to_string(),
            });
        }
        if !status.is_success() {
            return Err(StatsError::Fetch {
                entity: key,
                message: format!("HTTP {}", status),
            });
        }

        response.text().map_err(|e| StatsError::Fetch {
            entity: key,
            message: e.to_string(),
        })
    }
}

/// FIFO-evicting map of response bodies
#[derive(Debug, Default)]
pub struct PageCache {
    capacity: usize,
    order: VecDeque<String>,
    bodies: HashMap<String, String>,
}

impl PageCache {
    pub fn new(capacity: usize) -> Self {
        PageCache {
            capacity,
            order: VecDeque::new(),
            bodies: HashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.bodies.get(key)
    }

    pub fn insert(&mut self, key: String, body: String) {
        if self.capacity == 0 {
            return;
        }
        if self.bodies.contains_key(&key) {
            self.bodies.insert(key, body);
            return;
        }
        while self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.bodies.remove(&oldest);
            }
        }
        self.order.push_back(key.clone());
        self.bodies.insert(key, body);
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}

/// Memoizing wrapper around another source
pub struct CachedSource<S> {
    inner: S,
    cache: RefCell<PageCache>,
}

impl<S: PageSource> CachedSource<S> {
    pub fn new(inner: S, capacity: usize) -> Self {
        CachedSource {
            inner,
            cache: RefCell::new(PageCache::new(capacity)),
        }
    }

    pub fn cached_pages(&self) -> usize {
        self.cache.borrow().len()
    }
}

impl<S: PageSource> PageSource for CachedSource<S> {
    fn fetch(&self, request: &PageRequest) -> Result<String> {
        let key = request.cache_key();
        if let Some(body) = self.cache.borrow().get(&key) {
            log::debug!("Cache hit: {}", key);
            return Ok(body.clone());
        }
        let body = self.inner.fetch(request)?;
        self.cache.borrow_mut().insert(key, body.clone());
        Ok(body)
    }
}

/// Build the standard HTTP source from config, memoized
pub fn http_source(config: &SourceConfig) -> Result<Box<dyn PageSource>> {
    let http = HttpPageSource::new(config)?;
    Ok(Box::new(CachedSource::new(http, config.cache_capacity)))
}

/// Random pause between consecutive bulk requests
#[derive(Debug, Clone, Default)]
pub struct Politeness {
    max_delay: Duration,
    taken: Cell<usize>,
}

impl Politeness {
    pub fn new(max_delay: Duration) -> Self {
        Politeness {
            max_delay,
            taken: Cell::new(0),
        }
    }

    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn is_enabled(&self) -> bool {
        !self.max_delay.is_zero()
    }

    pub fn next_delay(&self) -> Duration {
        if !self.is_enabled() {
            return Duration::ZERO;
        }
        let max_ms = self.max_delay.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }

    pub fn pause(&self) {
        self.taken.set(self.taken.get() + 1);
        let delay = self.next_delay();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }

    /// Pauses requested so far, counted even when disabled
    pub fn pauses(&self) -> usize {
        self.taken.get()
    }
}

/// What a single request is about; carried into errors and outcomes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    Roster {
        school_id: SchoolId,
        season: u16,
    },
    Career {
        player_id: PlayerId,
        season_id: u32,
        school_id: SchoolId,
    },
    TeamStats {
        school_id: SchoolId,
        season: u16,
        variant: StatVariant,
    },
    Games {
        team: String,
        opponent: Option<String>,
        start: u16,
        end: u16,
    },
}

impl Entity {
    pub fn source(&self) -> DataSource {
        match self {
            Entity::Games { .. } => DataSource::BoydsWorld,
            _ => DataSource::Ncaa,
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Roster { school_id, season } => {
                write!(f, "roster (school {}, season {})", school_id, season)
            }
            Entity::Career {
                player_id,
                season_id,
                school_id,
            } => write!(
                f,
                "career log (player {}, season id {}, school {})",
                player_id, season_id, school_id
            ),
            Entity::TeamStats {
                school_id,
                season,
                variant,
            } => write!(
                f,
                "{} totals (school {}, season {})",
                variant, school_id, season
            ),
            Entity::Games {
                team,
                opponent,
                start,
                end,
            } => write!(
                f,
                "games ({} vs {}, {}-{})",
                team,
                opponent.as_deref().unwrap_or("all"),
                start,
                end
            ),
        }
    }
}

/// A parsed page, or an explicit signal that the entity has nothing to show
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<T> {
    Data(T),
    NoData,
}

impl<T> Fetched<T> {
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Fetched<U> {
        match self {
            Fetched::Data(v) => Fetched::Data(f(v)),
            Fetched::NoData => Fetched::NoData,
        }
    }

    pub fn data(self) -> Option<T> {
        match self {
            Fetched::Data(v) => Some(v),
            Fetched::NoData => None,
        }
    }
}

/// Per-entity result of a bulk operation
#[derive(Debug)]
pub struct EntityOutcome<T> {
    pub entity: Entity,
    pub result: Result<Fetched<T>>,
}

impl<T> EntityOutcome<T> {
    pub fn new(entity: Entity, result: Result<Fetched<T>>) -> Self {
        if let Err(e) = &result {
            log::warn!("{} failed: {}", entity, e);
        }
        EntityOutcome { entity, result }
    }

    pub fn data(&self) -> Option<&T> {
        match &self.result {
            Ok(Fetched::Data(v)) => Some(v),
            _ => None,
        }
    }
}
