//! # Usage Statistics Derivation Library
//!
//! `usagestats` turns the JSON files published by an offline log-processing
//! pipeline into chart-ready series for a usage-analytics dashboard.
//!
//! ## Features
//!
//! - Zero-safe ratios and compact number/month formatting
//! - Rollup of raw categories into configured buckets
//! - Square-root weighted layered flow (sankey) graphs
//! - Cohort retention matrices with right-censoring marks
//! - Top-N selection for ranked charts
//! - Memoized report generation over a whole data directory
//!
//! ## Example
//!
//! ```no_run
//! use usagestats::{load_dataset_async, Config, Dashboard};
//!
//! # async fn run() -> usagestats::Result<()> {
//! let config = Config::default();
//! let dataset = load_dataset_async(config.data_dir.clone(), config.max_concurrent_loads).await?;
//!
//! let mut dashboard = Dashboard::new(config)?;
//! let report = dashboard.report(&dataset)?;
//! println!("{} cohorts", report.retention.cohorts.len());
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod config;
pub mod data;
pub mod error;
pub mod report;
pub mod types;
pub mod utils;

// Re-export main types for convenience
pub use analysis::{build_cohort_matrix, build_flow, split_scaled, FlowBranch, FlowGraph, FlowScale};
pub use config::Config;
pub use data::{load_dataset_async, Dataset};
pub use error::{Result, StatsError};
pub use report::{build_report, Dashboard, DashboardReport};
pub use types::{CacheKey, CohortMatrix, CohortMatrixCell, CohortRow, CountedRow, FlowLink, FlowNode};
