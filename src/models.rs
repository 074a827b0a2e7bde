use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the five datasets shown on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SourceId {
    Co2,
    Energy,
    Gdp,
    Disaster,
    Temperature,
}

impl SourceId {
    /// All sources in the order they are loaded and reported.
    pub const ALL: [SourceId; 5] = [
        SourceId::Co2,
        SourceId::Energy,
        SourceId::Gdp,
        SourceId::Disaster,
        SourceId::Temperature,
    ];

    /// Short display name used in error panels and log lines.
    pub fn name(self) -> &'static str {
        match self {
            SourceId::Co2 => "CO2",
            SourceId::Energy => "Energy",
            SourceId::Gdp => "GDP",
            SourceId::Disaster => "Disaster",
            SourceId::Temperature => "Temperature",
        }
    }

    /// Name of the configuration/secrets key holding this source's URL.
    pub fn config_key(self) -> &'static str {
        match self {
            SourceId::Co2 => "URL_CO2",
            SourceId::Energy => "URL_ENERGY",
            SourceId::Gdp => "URL_GDP",
            SourceId::Disaster => "URL_DISASTER",
            SourceId::Temperature => "URL_TEMP",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single parsed cell. Serializes as a bare JSON value (`null` for empty).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    #[default]
    Empty,
    Number(f64),
    Bool(bool),
    Text(String),
}

/// Markers treated as missing data in delimited text.
const NA_MARKERS: [&str; 9] = ["", "NA", "N/A", "n/a", "NaN", "nan", "NULL", "null", "#N/A"];

impl Cell {
    /// Infer a cell from delimited text: NA markers become `Empty`,
    /// anything that parses as `f64` becomes `Number`, the rest is `Text`.
    pub fn from_text(raw: &str) -> Cell {
        let s = raw.trim();
        if NA_MARKERS.contains(&s) {
            return Cell::Empty;
        }
        match s.parse::<f64>() {
            Ok(v) => Cell::Number(v),
            Err(_) => Cell::Text(raw.to_string()),
        }
    }

    /// Finite numeric value; `inf` and `NaN` count as missing.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(v) if v.is_finite() => Some(*v),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Number(v) => write!(f, "{}", v),
            Cell::Bool(b) => write!(f, "{}", b),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

/// An in-memory table as parsed from a source file.
///
/// Used both for wide tables (one column per year, before reshaping) and for
/// raw tables that are shown as-is. Every row has exactly `headers.len()` cells.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Build a table, padding short rows with empty cells and truncating long ones.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut r| {
                r.resize(width, Cell::Empty);
                r
            })
            .collect();
        Self { headers, rows }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// First `n` rows as a new table.
    pub fn head(&self, n: usize) -> Table {
        Table {
            headers: self.headers.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }
}

/// One observation of a long table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongRow {
    pub country: String,
    pub year: i32,
    pub value: Option<f64>,
}

/// Long-format table: one row per (country, year) pair.
///
/// `value_name` records what the value column measures (e.g. `CO2_pc`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LongTable {
    pub value_name: String,
    pub rows: Vec<LongRow>,
}

impl LongTable {
    pub fn new(value_name: impl Into<String>, rows: Vec<LongRow>) -> Self {
        Self {
            value_name: value_name.into(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LongRow> {
        self.rows.iter()
    }
}

/// Inclusive year interval. A range with `start > end` contains nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, year: i32) -> bool {
        self.start <= year && year <= self.end
    }
}

impl fmt::Display for YearRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}–{}", self.start, self.end)
    }
}
