//! eia_trends
//!
//! A lightweight Rust library for retrieving, storing, visualizing, and
//! analyzing EIA energy statistics. Pairs with the `eia-trends` CLI and the
//! `eia-trends-gui` desktop dashboard.
//!
//! ### Features
//! - Fetch paginated data routes fault-tolerantly (per-page retries with
//!   linear backoff, partial results on retry exhaustion, protocol-violation
//!   detection, cooperative cancellation)
//! - Normalize raw rows into a tidy, analysis-friendly schema
//! - Save as CSV or JSON, optionally split per sector
//! - Quick summary statistics, yearly growth, and moving averages
//! - Generate SVG/PNG line charts by state and sector
//!
//! ### Example
//! ```no_run
//! use eia_trends::{Client, FetchOptions, Metric};
//!
//! let client = Client::from_env()?;
//! let report = client.fetch_retail_sales(
//!     &FetchOptions::retail_sales().with_states(["CO", "TX"]),
//! )?;
//! let table = eia_trends::normalize::observations(&report.rows);
//! eia_trends::storage::save_csv(&table, "energy_data.csv")?;
//! eia_trends::viz::plot_lines(&table, Metric::Customers, "customers.svg", 1000, 600)?;
//! let stats = eia_trends::stats::grouped_summary(&table, Metric::Customers);
//! println!("{:#?}", stats);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod api;
pub mod models;
pub mod normalize;
pub mod stats;
pub mod storage;
pub mod viz;

pub use api::{
    CancelToken, Client, Completion, FetchError, FetchOptions, FetchReport, ProtocolViolation,
    Transport, TransportError,
};
pub use models::{Frequency, Metric, Observation, Record, SeriesKey};
