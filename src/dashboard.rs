//! Dashboard view model.
//!
//! [`build_view`] is a pure function from the loaded [`Sources`] and the
//! user's [`Selection`] to a [`DashboardView`]. Front ends (the desktop app,
//! the CLI) only draw what the view contains: each panel is either ready or
//! carries the message to show in its place.

use crate::filter::{countries, select, year_bounds};
use crate::loader::{LoadError, Sources};
use crate::models::{LongTable, SourceId, Table, YearRange};
use crate::stats::{Summary, summarize};
use serde::Serialize;

/// Country offered when no long table loaded.
pub const FALLBACK_COUNTRY: &str = "China";
/// Year bounds used when the CO2 table is unavailable.
pub const FALLBACK_YEARS: YearRange = YearRange {
    start: 1960,
    end: 2020,
};
/// Preferred initial window, clamped to the bounds.
pub const PREFERRED_YEARS: YearRange = YearRange {
    start: 1980,
    end: 2020,
};
/// Rows shown in a raw table preview.
pub const PREVIEW_ROWS: usize = 100;

/// What the user picked in the sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub country: String,
    pub years: YearRange,
}

/// Options and defaults for the sidebar widgets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Controls {
    /// Sorted, never empty.
    pub countries: Vec<String>,
    pub default_country: String,
    pub bounds: YearRange,
    pub default_years: YearRange,
}

impl Controls {
    pub fn from_sources(sources: &Sources) -> Self {
        let mut options: Vec<String> = countries(sources.long_tables()).into_iter().collect();
        if options.is_empty() {
            options.push(FALLBACK_COUNTRY.to_string());
        }
        let default_country = if options.iter().any(|c| c == FALLBACK_COUNTRY) {
            FALLBACK_COUNTRY.to_string()
        } else {
            options[0].clone()
        };

        let bounds = sources
            .co2
            .as_ref()
            .ok()
            .and_then(|t| year_bounds(t))
            .unwrap_or(FALLBACK_YEARS);
        let default_years = clamp_range(PREFERRED_YEARS, bounds);

        Self {
            countries: options,
            default_country,
            bounds,
            default_years,
        }
    }

    pub fn default_selection(&self) -> Selection {
        Selection {
            country: self.default_country.clone(),
            years: self.default_years,
        }
    }

    /// Replace an unknown country with the default and clamp the years into bounds.
    pub fn normalize(&self, selection: &Selection) -> Selection {
        let country = if self.countries.contains(&selection.country) {
            selection.country.clone()
        } else {
            self.default_country.clone()
        };
        Selection {
            country,
            years: clamp_range(selection.years, self.bounds),
        }
    }
}

/// Clamp both ends of `wanted` into `bounds`, keeping `start <= end`.
pub fn clamp_range(wanted: YearRange, bounds: YearRange) -> YearRange {
    let start = wanted.start.clamp(bounds.start, bounds.end);
    let end = wanted.end.clamp(bounds.start, bounds.end);
    if start <= end {
        YearRange::new(start, end)
    } else {
        YearRange::new(end, start)
    }
}

/// A panel slot: content, or the message shown instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Panel<T> {
    Ready(T),
    Missing(String),
}

/// Filtered rows of one long source plus their summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub rows: LongTable,
    pub summary: Summary,
}

impl ChartSeries {
    /// Finite `(year, value)` points sorted by year.
    pub fn points(&self) -> Vec<(i32, f64)> {
        let mut pts: Vec<(i32, f64)> = self
            .rows
            .iter()
            .filter_map(|r| r.value.filter(|v| v.is_finite()).map(|v| (r.year, v)))
            .collect();
        pts.sort_by_key(|(y, _)| *y);
        pts
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPanel {
    pub id: SourceId,
    pub title: String,
    pub y_label: &'static str,
    pub body: Panel<ChartSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TablePreview {
    pub table: Table,
    pub total_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewPanel {
    pub id: SourceId,
    pub title: &'static str,
    pub body: Panel<TablePreview>,
}

/// Everything a front end needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub controls: Controls,
    pub selection: Selection,
    pub charts: [ChartPanel; 3],
    pub previews: [PreviewPanel; 2],
    pub errors: Vec<LoadError>,
}

impl DashboardView {
    /// One-line description of the current selection.
    pub fn headline(&self) -> String {
        format!(
            "Country: {} | Years: {}",
            self.selection.country, self.selection.years
        )
    }
}

fn chart_labels(id: SourceId) -> (&'static str, &'static str) {
    match id {
        SourceId::Co2 => ("CO₂ per capita", "CO2 per capita"),
        SourceId::Energy => ("Energy use", "Energy use (per capita)"),
        SourceId::Gdp => ("GDP growth", "GDP growth (%)"),
        SourceId::Disaster => ("Natural disasters", "Value"),
        SourceId::Temperature => ("Temperature", "Value"),
    }
}

fn chart_panel(sources: &Sources, id: SourceId, selection: &Selection) -> ChartPanel {
    let (title, y_label) = chart_labels(id);
    let body = match sources.long(id) {
        Some(Ok(table)) => {
            let rows = select(table, &selection.country, selection.years);
            let summary = summarize(&rows);
            Panel::Ready(ChartSeries { rows, summary })
        }
        _ => Panel::Missing(format!("{} data not loaded.", id.name())),
    };
    ChartPanel {
        id,
        title: format!("{} ({})", title, selection.country),
        y_label,
        body,
    }
}

fn preview_panel(sources: &Sources, id: SourceId, title: &'static str) -> PreviewPanel {
    let body = match sources.raw(id) {
        Some(Ok(table)) => Panel::Ready(TablePreview {
            table: table.head(PREVIEW_ROWS),
            total_rows: table.height(),
        }),
        _ => Panel::Missing("Not loaded.".to_string()),
    };
    PreviewPanel { id, title, body }
}

/// Build the full view for `selection` (normalized against the loaded data first).
pub fn build_view(sources: &Sources, selection: Option<&Selection>) -> DashboardView {
    let controls = Controls::from_sources(sources);
    let selection = match selection {
        Some(s) => controls.normalize(s),
        None => controls.default_selection(),
    };
    let charts = [
        chart_panel(sources, SourceId::Co2, &selection),
        chart_panel(sources, SourceId::Energy, &selection),
        chart_panel(sources, SourceId::Gdp, &selection),
    ];
    let previews = [
        preview_panel(sources, SourceId::Temperature, "Temperature data"),
        preview_panel(sources, SourceId::Disaster, "Natural disaster data"),
    ];
    DashboardView {
        controls,
        selection,
        charts,
        previews,
        errors: sources.errors(),
    }
}
