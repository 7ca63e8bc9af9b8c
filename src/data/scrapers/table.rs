//! Positional HTML table extraction
//!
//! Neither site gives its tables an id, so tables are found by ordinal
//! position and rows are rebuilt from flat `<td>` sequences.

use super::Entity;
use crate::{Result, StatsError};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

/// One row of raw string cells, in page order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    pub cells: Vec<String>,
}

impl RawRecord {
    pub fn new(cells: Vec<String>) -> Self {
        RawRecord { cells }
    }

    pub fn get(&self, idx: usize) -> Option<&str> {
        self.cells.get(idx).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Header list plus the rows parsed beneath it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRecord>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<RawRecord>) -> Self {
        RawTable { headers, rows }
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell under a header; a short row reads as absent
    pub fn cell<'a>(&self, row: &'a RawRecord, name: &str) -> Option<&'a str> {
        self.column(name).and_then(|idx| row.get(idx))
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Rows may drift from the header width one at a time, but a table where
    /// no row lines up with its headers means the page layout changed.
    pub fn check_shape(&self, entity: &Entity) -> Result<()> {
        let width = self.headers.len();
        let mut matching = 0;
        for (idx, row) in self.rows.iter().enumerate() {
            if row.len() == width {
                matching += 1;
            } else {
                log::debug!(
                    "{}: row {} has {} cells, header has {}",
                    entity,
                    idx,
                    row.len(),
                    width
                );
            }
        }
        if !self.rows.is_empty() && matching == 0 {
            return Err(StatsError::StructuralParse {
                entity: entity.to_string(),
                message: format!("no row matches the {} header columns", width),
            });
        }
        Ok(())
    }
}

/// A `<td>` reduced to the parts the row builders look at
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedCell {
    /// `data-order` when present, else the trimmed display text
    pub value: String,
    pub text: String,
    pub href: Option<String>,
    pub has_sort_value: bool,
    pub has_width: bool,
}

impl ParsedCell {
    /// Cells with no sort value, no link and no width open a career-log row
    pub fn is_plain(&self) -> bool {
        !self.has_sort_value && self.href.is_none() && !self.has_width
    }
}

pub fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| StatsError::Parse(format!("bad selector '{}': {:?}", css, e)))
}

pub fn pattern(re: &str) -> Result<Regex> {
    Regex::new(re).map_err(|e| StatsError::Parse(format!("bad pattern '{}': {}", re, e)))
}

/// The `ordinal`-th `<table>` in the document
pub fn locate_table<'a>(document: &'a Html, ordinal: usize, entity: &Entity) -> Result<ElementRef<'a>> {
    let table_sel = selector("table")?;
    let tables: Vec<_> = document.select(&table_sel).collect();
    let found = tables.len();
    tables
        .into_iter()
        .nth(ordinal)
        .ok_or_else(|| StatsError::StructuralParse {
            entity: entity.to_string(),
            message: format!("expected at least {} tables, found {}", ordinal + 1, found),
        })
}

fn collapse_text(element: ElementRef) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn parse_cell(td: ElementRef, link_sel: &Selector) -> ParsedCell {
    let text = collapse_text(td);
    let link = td.select(link_sel).next();
    let href = link.and_then(|a| a.value().attr("href")).map(|h| h.to_string());
    let sort_value = td.value().attr("data-order").map(|v| v.trim().to_string());

    let value = match (&sort_value, link) {
        (Some(v), _) => v.clone(),
        (None, Some(a)) => collapse_text(a),
        (None, None) => text.clone(),
    };

    ParsedCell {
        value,
        text,
        href,
        has_sort_value: sort_value.is_some(),
        has_width: td.value().attr("width").is_some(),
    }
}

pub fn header_cells(table: ElementRef) -> Result<Vec<String>> {
    let th_sel = selector("th")?;
    Ok(table.select(&th_sel).map(collapse_text).collect())
}

pub fn table_cells(scope: ElementRef) -> Result<Vec<ParsedCell>> {
    let td_sel = selector("td")?;
    let link_sel = selector("a")?;
    Ok(scope.select(&td_sel).map(|td| parse_cell(td, &link_sel)).collect())
}

pub fn document_cells(document: &Html) -> Result<Vec<ParsedCell>> {
    let td_sel = selector("td")?;
    let link_sel = selector("a")?;
    Ok(document
        .select(&td_sel)
        .map(|td| parse_cell(td, &link_sel))
        .collect())
}

/// Chunk a flat cell run into rows of `width`; a short trailing chunk is kept
pub fn group_fixed_width<T: Clone>(cells: &[T], width: usize) -> Vec<Vec<T>> {
    if width == 0 {
        return Vec::new();
    }
    cells.chunks(width).map(|chunk| chunk.to_vec()).collect()
}

/// Rebuild career-log rows: a non-empty plain cell opens a row, `Career`
/// closes the season rows and everything after it up to the next opening
/// cell is dropped.
pub fn group_by_delimiter(cells: &[ParsedCell]) -> Vec<RawRecord> {
    let mut rows = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut in_totals = false;

    for cell in cells {
        if cell.text == "Career" {
            if !current.is_empty() && !in_totals {
                rows.push(RawRecord::new(std::mem::take(&mut current)));
            }
            current.clear();
            in_totals = true;
            continue;
        }

        if cell.is_plain() && !cell.text.is_empty() {
            if !current.is_empty() && !in_totals {
                rows.push(RawRecord::new(std::mem::take(&mut current)));
            }
            current.clear();
            in_totals = false;
            current.push(cell.value.clone());
        } else if !in_totals {
            current.push(cell.value.clone());
        }
    }

    if !current.is_empty() && !in_totals {
        rows.push(RawRecord::new(current));
    }
    rows
}

/// Trailing run of digits in a link, e.g. the `stats_player_seq` of a player
pub fn trailing_digits(href: &str) -> Result<Option<String>> {
    let re = pattern(r"(\d+)\D*$")?;
    Ok(re.captures(href).map(|c| c[1].to_string()))
}
