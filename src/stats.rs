use crate::models::LongTable;
use serde::{Deserialize, Serialize};

/// Summary statistics for one filtered series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub missing: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
}

/// Compute count/missing/min/max/mean/median over the values of `table`.
pub fn summarize(table: &LongTable) -> Summary {
    let mut vals: Vec<f64> = table.iter().filter_map(|r| r.value).collect();
    let missing = table.len() - vals.len();
    vals.sort_by(|a, b| a.total_cmp(b));
    let count = vals.len();
    let min = vals.first().cloned();
    let max = vals.last().cloned();
    let mean = if count > 0 {
        Some(vals.iter().copied().sum::<f64>() / count as f64)
    } else {
        None
    };
    let median = if count == 0 {
        None
    } else if count % 2 == 1 {
        Some(vals[count / 2])
    } else {
        Some((vals[count / 2 - 1] + vals[count / 2]) / 2.0)
    };
    Summary {
        count,
        missing,
        min,
        max,
        mean,
        median,
    }
}

/// Format an optional value with up to 4 decimals, trailing zeros trimmed; `NA` when absent.
pub fn fmt_opt(v: Option<f64>) -> String {
    match v {
        Some(x) if x.is_finite() => {
            let s = format!("{:.4}", x);
            s.trim_end_matches('0').trim_end_matches('.').to_string()
        }
        _ => "NA".to_string(),
    }
}
