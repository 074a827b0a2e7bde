//! envdash
//!
//! A small Rust library behind an environment/economy dashboard: it loads five
//! tabular sources (CO₂ per capita, energy use, GDP growth, temperature and
//! natural disasters), reshapes the three year-column tables into long
//! `(country, year, value)` form, and narrows them by country and year range.
//! Pairs with the `envdash` CLI and the `envdash-gui` desktop dashboard.
//!
//! ### Features
//! - Fetch CSV and spreadsheet sources over HTTP (or from local paths)
//! - Wide → long reshape of year columns
//! - Tolerant loading: each source yields a table or a load error, never a panic
//! - Memoized reads with an explicit reset
//! - Pure view model for the dashboard, SVG/PNG charts, CSV/JSON export
//!
//! ### Example
//! ```no_run
//! use envdash::{Loader, SourceUrls, build_view};
//!
//! let loader = Loader::http()?;
//! let sources = loader.load_all(&SourceUrls::resolve(None)?);
//! let view = build_view(&sources, None);
//! println!("{}", view.headline());
//! for err in &view.errors {
//!     eprintln!("{}", err);
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod config;
pub mod dashboard;
pub mod fetch;
pub mod filter;
pub mod loader;
pub mod models;
pub mod reshape;
pub mod stats;
pub mod storage;
pub mod viz;

pub use config::SourceUrls;
pub use dashboard::{DashboardView, Selection, build_view};
pub use loader::{LoadError, Loader, Sources};
pub use models::{LongRow, LongTable, SourceId, Table, YearRange};
