//! Source fetcher: retrieve a tabular file and parse it into a [`Table`].
//!
//! Two formats are supported:
//! - **Delimited text** (CSV), optionally skipping leading metadata lines
//!   (World Bank bulk downloads carry four of them before the header).
//! - **Spreadsheets** (`.xlsx`, `.xls`, `.ods`), read from memory with `calamine`.
//!
//! Retrieval goes through the [`Fetch`] trait. [`HttpFetcher`] handles
//! `http(s)://` URLs with a blocking `reqwest` client and falls back to the
//! local filesystem for plain paths and `file://` URLs.
//!
//! Typical usage:
//! ```no_run
//! # use envdash::fetch::{read_table, Format, HttpFetcher};
//! let fetcher = HttpFetcher::new()?;
//! let table = read_table(
//!     &fetcher,
//!     "https://example.org/EnergyUse.csv",
//!     &Format::Delimited { skip_rows: 4 },
//! )?;
//! println!("{} rows", table.height());
//! # Ok::<(), anyhow::Error>(())
//! ```

use crate::models::{Cell, Table};
use anyhow::{Context, Result, anyhow, bail};
use calamine::{Data, Reader, open_workbook_auto_from_rs};
use chrono::{NaiveDateTime, NaiveTime};
use csv::ReaderBuilder;
use log::{debug, info};
use reqwest::blocking::Client as HttpClient;
use reqwest::redirect::Policy;
use std::collections::HashMap;
use std::io::Cursor;
use std::time::Duration;

/// Anything that can turn a location string into raw bytes.
pub trait Fetch {
    fn fetch(&self, location: &str) -> Result<Vec<u8>>;
}

/// Blocking HTTP fetcher with a local-file fallback.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: HttpClient,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(30)) // total request timeout
            .connect_timeout(Duration::from_secs(10))
            .redirect(Policy::limited(5))
            .user_agent(concat!("envdash/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build http client")?;
        Ok(Self { http })
    }
}

pub fn is_remote(location: &str) -> bool {
    let l = location.trim_start().to_ascii_lowercase();
    l.starts_with("http://") || l.starts_with("https://")
}

impl Fetch for HttpFetcher {
    fn fetch(&self, location: &str) -> Result<Vec<u8>> {
        if is_remote(location) {
            info!("GET {}", location);
            let resp = self
                .http
                .get(location)
                .send()
                .with_context(|| format!("GET {}", location))?;
            let status = resp.status();
            if !status.is_success() {
                bail!("GET {} failed with HTTP {}", location, status);
            }
            let body = resp
                .bytes()
                .with_context(|| format!("read body of {}", location))?;
            debug!("{} bytes from {}", body.len(), location);
            Ok(body.to_vec())
        } else {
            let path = location.strip_prefix("file://").unwrap_or(location);
            std::fs::read(path).with_context(|| format!("read {}", path))
        }
    }
}

/// Which worksheet of a spreadsheet to read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SheetSelector {
    Index(usize),
    Name(String),
}

impl Default for SheetSelector {
    fn default() -> Self {
        SheetSelector::Index(0)
    }
}

/// How to parse a fetched file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Format {
    /// Comma-separated text; `skip_rows` physical lines are dropped before the header.
    Delimited { skip_rows: usize },
    /// Spreadsheet; the first row of the chosen sheet is the header.
    Spreadsheet { sheet: SheetSelector },
}

/// Fetch `location` and parse it according to `format`.
pub fn read_table(fetcher: &dyn Fetch, location: &str, format: &Format) -> Result<Table> {
    let bytes = fetcher.fetch(location)?;
    let parsed = match format {
        Format::Delimited { skip_rows } => parse_delimited(&bytes, *skip_rows),
        Format::Spreadsheet { sheet } => parse_spreadsheet(bytes, sheet),
    };
    parsed.with_context(|| format!("parse {}", location))
}

/// Parse comma-separated text into a table.
///
/// - A leading UTF-8 BOM is ignored.
/// - `skip_rows` physical lines are dropped, the next record is the header.
/// - Blank lines are skipped; short rows are padded with empty cells.
/// - A row with more fields than the header is an error.
pub fn parse_delimited(bytes: &[u8], skip_rows: usize) -> Result<Table> {
    let mut body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    for skipped in 0..skip_rows {
        match body.iter().position(|&b| b == b'\n') {
            Some(i) => body = &body[i + 1..],
            None => bail!(
                "expected {} metadata lines before the header, found {}",
                skip_rows,
                skipped
            ),
        }
    }

    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body);
    let mut records = rdr.records();

    let header = match records.next() {
        Some(rec) => rec.context("read header row")?,
        None => bail!("no columns to parse"),
    };
    let headers = normalize_headers(header.iter().map(str::to_string));
    let width = headers.len();

    let mut rows: Vec<Vec<Cell>> = Vec::new();
    for rec in records {
        let rec = rec.context("read record")?;
        if rec.len() > width {
            let line = rec.position().map(|p| p.line() as usize + skip_rows);
            bail!(
                "expected {} fields, saw {} (line {})",
                width,
                rec.len(),
                line.map_or_else(|| "?".to_string(), |l| l.to_string())
            );
        }
        rows.push(rec.iter().map(Cell::from_text).collect());
    }
    debug!("parsed {} rows x {} columns", rows.len(), width);
    Ok(Table::new(headers, rows))
}

/// Parse a spreadsheet held in memory.
pub fn parse_spreadsheet(bytes: Vec<u8>, sheet: &SheetSelector) -> Result<Table> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes)).context("open spreadsheet")?;
    let range = match sheet {
        SheetSelector::Index(i) => workbook
            .worksheet_range_at(*i)
            .ok_or_else(|| anyhow!("worksheet index {} not found", i))?
            .with_context(|| format!("read worksheet {}", i))?,
        SheetSelector::Name(name) => workbook
            .worksheet_range(name)
            .with_context(|| format!("read worksheet {:?}", name))?,
    };

    let mut rows_iter = range.rows();
    let header = rows_iter
        .next()
        .ok_or_else(|| anyhow!("worksheet is empty"))?;
    let headers = normalize_headers(header.iter().map(|d| data_to_cell(d).to_string()));
    let rows: Vec<Vec<Cell>> = rows_iter
        .map(|r| r.iter().map(data_to_cell).collect())
        .collect();
    Ok(Table::new(headers, rows))
}

fn data_to_cell(d: &Data) -> Cell {
    match d {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::String(s) if s.trim().is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ts) if !dt.is_duration() => Cell::Text(iso_datetime(ts)),
            _ => Cell::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}

/// `2020-01-15` for midnight timestamps, `2020-01-15T08:30:00` otherwise.
fn iso_datetime(ts: NaiveDateTime) -> String {
    if ts.time() == NaiveTime::MIN {
        ts.format("%Y-%m-%d").to_string()
    } else {
        ts.format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}

/// Give unnamed columns a positional name and make duplicates unique
/// (`x`, `x.1`, `x.2`, ...).
pub fn normalize_headers(raw: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    raw.into_iter()
        .enumerate()
        .map(|(i, h)| {
            let base = if h.trim().is_empty() {
                format!("Unnamed: {}", i)
            } else {
                h
            };
            match seen.get_mut(&base) {
                Some(n) => {
                    *n += 1;
                    format!("{}.{}", base, n)
                }
                None => {
                    seen.insert(base.clone(), 0);
                    base
                }
            }
        })
        .collect()
}
