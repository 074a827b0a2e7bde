//! Wide → long reshaping ("melt") of year-column tables.

use crate::models::{LongRow, LongTable, Table};
use thiserror::Error;

/// Canonical name of the identifier column after reshaping.
pub const COUNTRY: &str = "country";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReshapeError {
    #[error("identifier column {column:?} not found (columns: {available})")]
    MissingColumn { column: String, available: String },
    #[error("year column {0:?} does not fit a 32-bit year")]
    BadYear(String),
}

/// A column is a year column when its name is non-empty and all ASCII digits.
pub fn is_year_column(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit())
}

/// Year columns of `table` as `(column index, year)` in left-to-right order.
pub fn year_columns(table: &Table) -> Result<Vec<(usize, i32)>, ReshapeError> {
    table
        .headers
        .iter()
        .enumerate()
        .filter(|(_, h)| is_year_column(h))
        .map(|(i, h)| {
            h.parse::<i32>()
                .map(|y| (i, y))
                .map_err(|_| ReshapeError::BadYear(h.clone()))
        })
        .collect()
}

/// Melt every year column of `table` into long rows keyed by `id_column`.
///
/// Produces one row per (source row, year column), grouped by source row and
/// then by year column left to right. Duplicate source rows are kept.
/// A table without year columns yields an empty result.
pub fn melt_years(
    table: &Table,
    id_column: &str,
    value_name: &str,
) -> Result<LongTable, ReshapeError> {
    let id_idx = table
        .column_index(id_column)
        .ok_or_else(|| ReshapeError::MissingColumn {
            column: id_column.to_string(),
            available: table.headers.join(", "),
        })?;
    let years = year_columns(table)?;

    let mut rows = Vec::with_capacity(table.height() * years.len());
    for row in &table.rows {
        let country = row[id_idx].to_string();
        for &(col, year) in &years {
            rows.push(LongRow {
                country: country.clone(),
                year,
                value: row[col].as_f64(),
            });
        }
    }
    Ok(LongTable::new(value_name, rows))
}
