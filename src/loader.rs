//! Loader façade: fetch + parse (+ reshape) per source, with memoization.
//!
//! Every read goes through [`try_load`], which turns any failure (including a
//! panic inside a parser) into a [`LoadError`] value. The five sources are loaded
//! independently into a [`Sources`] record, so one broken URL never prevents
//! the others from loading.
//!
//! Successful reads are cached in the [`Loader`] keyed by reader and URL. The
//! cache lives as long as the loader and is only cleared by [`Loader::reset`].

use crate::config::SourceUrls;
use crate::fetch::{Fetch, Format, HttpFetcher, SheetSelector, read_table};
use crate::models::{LongTable, SourceId, Table};
use crate::reshape::melt_years;
use anyhow::Result;
use log::{debug, warn};
use serde::Serialize;
use std::any::Any;
use std::collections::HashMap;
use std::hash::Hash;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// A failed source load: which source, and the full error text.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{id}: {message}")]
pub struct LoadError {
    pub id: SourceId,
    pub message: String,
}

/// The read functions the dashboard uses, with their arguments.
///
/// Together with the URL this is the cache key, so the same URL read two
/// different ways is cached twice.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LongReader {
    /// Gapminder-style CSV: `country` plus one column per year, value `CO2_pc`.
    Co2,
    /// World Bank bulk CSV: 4 metadata lines, identifier `country_col`, value `Value`.
    WorldBankWide { country_col: String },
}

impl LongReader {
    pub fn world_bank() -> Self {
        LongReader::WorldBankWide {
            country_col: "Country Name".to_string(),
        }
    }

    fn format(&self) -> Format {
        match self {
            LongReader::Co2 => Format::Delimited { skip_rows: 0 },
            LongReader::WorldBankWide { .. } => Format::Delimited { skip_rows: 4 },
        }
    }

    fn id_column(&self) -> &str {
        match self {
            LongReader::Co2 => "country",
            LongReader::WorldBankWide { country_col } => country_col,
        }
    }

    fn value_name(&self) -> &'static str {
        match self {
            LongReader::Co2 => "CO2_pc",
            LongReader::WorldBankWide { .. } => "Value",
        }
    }
}

type LongKey = (LongReader, String);
type RawKey = (SheetSelector, String);

/// Run `read`, converting any error or panic into a [`LoadError`] for `id`.
pub fn try_load<T>(id: SourceId, read: impl FnOnce() -> Result<T>) -> Result<T, LoadError> {
    let outcome = match catch_unwind(AssertUnwindSafe(read)) {
        Ok(Ok(v)) => return Ok(v),
        Ok(Err(err)) => format!("{:#}", err),
        Err(payload) => format!("reader panicked: {}", panic_message(payload.as_ref())),
    };
    warn!("{} failed to load: {}", id, outcome);
    Err(LoadError {
        id,
        message: outcome,
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// The five load results shown by the dashboard.
#[derive(Debug, Clone)]
pub struct Sources {
    pub co2: Result<Arc<LongTable>, LoadError>,
    pub energy: Result<Arc<LongTable>, LoadError>,
    pub gdp: Result<Arc<LongTable>, LoadError>,
    pub disaster: Result<Arc<Table>, LoadError>,
    pub temperature: Result<Arc<Table>, LoadError>,
}

impl Sources {
    /// Result for one of the three reshaped sources.
    pub fn long(&self, id: SourceId) -> Option<&Result<Arc<LongTable>, LoadError>> {
        match id {
            SourceId::Co2 => Some(&self.co2),
            SourceId::Energy => Some(&self.energy),
            SourceId::Gdp => Some(&self.gdp),
            SourceId::Disaster | SourceId::Temperature => None,
        }
    }

    /// Result for one of the two raw sources.
    pub fn raw(&self, id: SourceId) -> Option<&Result<Arc<Table>, LoadError>> {
        match id {
            SourceId::Disaster => Some(&self.disaster),
            SourceId::Temperature => Some(&self.temperature),
            _ => None,
        }
    }

    /// Successfully loaded long tables, in CO2, Energy, GDP order.
    pub fn long_tables(&self) -> impl Iterator<Item = &LongTable> {
        [&self.co2, &self.energy, &self.gdp]
            .into_iter()
            .filter_map(|r| r.as_ref().ok().map(|t| &**t))
    }

    /// All failures in reporting order (CO2, Energy, GDP, Disaster, Temperature).
    pub fn errors(&self) -> Vec<LoadError> {
        [
            self.co2.as_ref().err(),
            self.energy.as_ref().err(),
            self.gdp.as_ref().err(),
            self.disaster.as_ref().err(),
            self.temperature.as_ref().err(),
        ]
        .into_iter()
        .flatten()
        .cloned()
        .collect()
    }
}

/// Memoizing loader over a [`Fetch`] implementation.
pub struct Loader<F: Fetch = HttpFetcher> {
    fetcher: F,
    long_cache: Mutex<HashMap<LongKey, Arc<LongTable>>>,
    raw_cache: Mutex<HashMap<RawKey, Arc<Table>>>,
}

impl Loader<HttpFetcher> {
    /// Loader backed by the HTTP/local-file fetcher.
    pub fn http() -> Result<Self> {
        Ok(Self::new(HttpFetcher::new()?))
    }
}

fn cached<K, V>(cache: &Mutex<HashMap<K, Arc<V>>>, key: &K) -> Option<Arc<V>>
where
    K: Eq + Hash,
{
    cache
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .get(key)
        .cloned()
}

fn store<K, V>(cache: &Mutex<HashMap<K, Arc<V>>>, key: K, value: Arc<V>)
where
    K: Eq + Hash,
{
    cache
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .insert(key, value);
}

impl<F: Fetch> Loader<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            long_cache: Mutex::new(HashMap::new()),
            raw_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch, parse and reshape `url` with `reader`. Cached on success.
    pub fn read_long(&self, reader: &LongReader, url: &str) -> Result<Arc<LongTable>> {
        let key = (reader.clone(), url.to_string());
        if let Some(hit) = cached(&self.long_cache, &key) {
            debug!("cache hit: {:?} {}", reader, url);
            return Ok(hit);
        }
        let wide = read_table(&self.fetcher, url, &reader.format())?;
        let long = Arc::new(melt_years(&wide, reader.id_column(), reader.value_name())?);
        debug!("{} long rows from {}", long.len(), url);
        store(&self.long_cache, key, Arc::clone(&long));
        Ok(long)
    }

    /// Fetch and parse a spreadsheet without reshaping. Cached on success.
    pub fn read_raw(&self, sheet: &SheetSelector, url: &str) -> Result<Arc<Table>> {
        let key = (sheet.clone(), url.to_string());
        if let Some(hit) = cached(&self.raw_cache, &key) {
            debug!("cache hit: sheet {:?} {}", sheet, url);
            return Ok(hit);
        }
        let format = Format::Spreadsheet {
            sheet: sheet.clone(),
        };
        let table = Arc::new(read_table(&self.fetcher, url, &format)?);
        store(&self.raw_cache, key, Arc::clone(&table));
        Ok(table)
    }

    /// Load all five sources; each failure is captured independently.
    pub fn load_all(&self, urls: &SourceUrls) -> Sources {
        let long = |id: SourceId, reader: LongReader| {
            try_load(id, || self.read_long(&reader, urls.get(id)))
        };
        let raw = |id: SourceId| {
            try_load(id, || self.read_raw(&SheetSelector::default(), urls.get(id)))
        };
        Sources {
            co2: long(SourceId::Co2, LongReader::Co2),
            energy: long(SourceId::Energy, LongReader::world_bank()),
            gdp: long(SourceId::Gdp, LongReader::world_bank()),
            disaster: raw(SourceId::Disaster),
            temperature: raw(SourceId::Temperature),
        }
    }

    /// Drop every cached table.
    pub fn reset(&self) {
        self.long_cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
        self.raw_cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    /// Number of cached tables.
    pub fn cached_len(&self) -> usize {
        let long = self
            .long_cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len();
        let raw = self
            .raw_cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len();
        long + raw
    }
}
