//! # Common Types
//!
//! Immutable value records shared by the derivations. Every derived series
//! is recomputed from these; nothing here is mutated after construction.

use serde::{Deserialize, Serialize};

use crate::utils::percent_of;

/// A key used for memoizing reports.
///
/// Two reports are interchangeable when both the dataset and the
/// configuration they were derived from hash to the same values.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub struct CacheKey {
    /// Hash of the serialized dataset
    pub dataset: u64,
    /// Hash of the serialized configuration
    pub config: u64,
}

/// A labeled raw frequency (event type, tool visits, traffic type, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountedRow {
    pub key: String,
    pub count: u64,
}

impl CountedRow {
    pub fn new(key: impl Into<String>, count: u64) -> Self {
        Self {
            key: key.into(),
            count,
        }
    }
}

/// Result of rolling counted rows up into named buckets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryBucket {
    pub name: String,
    pub value: u64,
}

/// A categorical value together with its share of the whole.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareRow {
    pub name: String,
    pub value: u64,
    /// Percentage of the total, 0 when the total is 0
    pub pct: f64,
}

/// A node of a layered flow diagram.
///
/// `value` is the visual (scaled) weight used for drawing; `actual_value`
/// is the true count shown in labels and tooltips. The two are never
/// interchangeable.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowNode {
    pub name: String,
    pub depth: u32,
    pub value: f64,
    pub actual_value: f64,
    /// `actual_value` as a percentage of the root's actual value
    pub pct_of_total: f64,
}

/// A link between two flow nodes, carrying both the visual and the true weight.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowLink {
    pub source: String,
    pub target: String,
    pub value: f64,
    pub actual_value: f64,
}

/// One observation of a retention cohort, as published by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortRow {
    /// Period identifier of the cohort, `YYYY-MM`
    #[serde(rename = "cohort_month")]
    pub cohort_key: String,
    /// Months elapsed since the cohort's first visit
    #[serde(rename = "months_since_first")]
    pub lag: u32,
    #[serde(rename = "retained_sessions")]
    pub retained_count: u64,
    pub cohort_size: u64,
}

impl CohortRow {
    /// Retained share of the cohort in percent.
    pub fn retention_pct(&self) -> f64 {
        percent_of(self.retained_count as f64, self.cohort_size as f64)
    }
}

/// One cell of the retention matrix.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortMatrixCell {
    pub cohort_key: String,
    pub lag: u32,
    /// `None` renders as a gap, never as zero
    pub value: Option<f64>,
    /// The cell's calendar period is at or past the last observed period,
    /// so it holds partial data
    pub is_truncated: bool,
    pub retained_count: Option<u64>,
    pub cohort_size: u64,
}

/// Lag-indexed retention series for every eligible cohort.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortMatrix {
    pub cohorts: Vec<String>,
    pub max_lag: u32,
    /// One row per entry of `cohorts`, each `max_lag + 1` cells long
    pub matrix: Vec<Vec<CohortMatrixCell>>,
}

impl CohortMatrix {
    pub fn is_empty(&self) -> bool {
        self.cohorts.is_empty()
    }

    /// The cell for `cohort` at `lag`, if the cohort is in the matrix.
    pub fn cell(&self, cohort: &str, lag: u32) -> Option<&CohortMatrixCell> {
        let row = self.cohorts.iter().position(|c| c == cohort)?;
        self.matrix.get(row)?.get(lag as usize)
    }
}
