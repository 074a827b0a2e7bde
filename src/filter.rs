//! Row selection over long tables.
//!
//! Everything here is pure: inputs are borrowed and results are new values,
//! so selections can be recomputed on every interaction.

use crate::models::{LongRow, LongTable, YearRange};
use std::collections::BTreeSet;

/// Rows whose country equals `country` exactly and whose year lies in `years`.
///
/// Matching is case-sensitive with no normalization. Input order is kept.
pub fn select(table: &LongTable, country: &str, years: YearRange) -> LongTable {
    let rows: Vec<LongRow> = table
        .iter()
        .filter(|r| r.country == country && years.contains(r.year))
        .cloned()
        .collect();
    LongTable::new(table.value_name.clone(), rows)
}

/// Sorted union of the non-empty country names of `tables`.
pub fn countries<'a>(tables: impl IntoIterator<Item = &'a LongTable>) -> BTreeSet<String> {
    tables
        .into_iter()
        .flat_map(|t| t.iter())
        .filter(|r| !r.country.trim().is_empty())
        .map(|r| r.country.clone())
        .collect()
}

/// Smallest and largest year present in `table`, or `None` when it is empty.
pub fn year_bounds(table: &LongTable) -> Option<YearRange> {
    let min = table.iter().map(|r| r.year).min()?;
    let max = table.iter().map(|r| r.year).max()?;
    Some(YearRange::new(min, max))
}
