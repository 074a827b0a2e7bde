use crate::dashboard::{DashboardView, Panel};
use crate::models::SourceId;
use anyhow::Result;
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// One exported observation of the current view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    pub source: SourceId,
    pub country: String,
    pub year: i32,
    pub value: Option<f64>,
}

/// Flatten the ready chart panels of `view` into export rows.
pub fn export_rows(view: &DashboardView) -> Vec<ExportRow> {
    let mut out = Vec::new();
    for chart in &view.charts {
        if let Panel::Ready(series) = &chart.body {
            out.extend(series.rows.iter().map(|r| ExportRow {
                source: chart.id,
                country: r.country.clone(),
                year: r.year,
                value: r.value,
            }));
        }
    }
    out
}

/// Prefix cells that a spreadsheet would evaluate as a formula.
fn neutralize(cell: &str) -> String {
    match cell.chars().next() {
        Some('=' | '+' | '-' | '@' | '\t' | '\r') => format!("'{}", cell),
        _ => cell.to_string(),
    }
}

/// Save rows as CSV with header.
pub fn save_csv<P: AsRef<Path>>(rows: &[ExportRow], path: P) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_path(path)?;
    wtr.serialize(("source", "country", "year", "value"))?;
    for r in rows {
        wtr.serialize((r.source.name(), neutralize(&r.country), r.year, r.value))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Save rows as pretty JSON array.
pub fn save_json<P: AsRef<Path>>(rows: &[ExportRow], path: P) -> Result<()> {
    let mut f = File::create(path)?;
    let s = serde_json::to_string_pretty(rows)?;
    f.write_all(s.as_bytes())?;
    Ok(())
}
