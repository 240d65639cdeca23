//! Raw records published by the offline log-processing pipeline.
//!
//! Field names follow the pipeline's JSON. Wrapped files (`{"rules": [...]}`
//! and friends) are unwrapped by the loader.

mod loader;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{CohortRow, CountedRow};

pub use loader::{load_dataset_async, DataFile};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficTypeRow {
    #[serde(rename = "type")]
    pub traffic_type: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolVisitRow {
    pub tool: String,
    pub visits: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestTypeRow {
    pub request_type: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoRow {
    pub c_country: String,
    pub visits: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventTypeRow {
    pub event: String,
    pub count: u64,
}

/// Visits per tool for one month; tools are the non-`month_year` keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyToolVisits {
    pub month_year: String,
    #[serde(flatten)]
    pub tools: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolErrors {
    pub tool: String,
    pub errors: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyToolErrors {
    pub month_year: String,
    pub tool: String,
    pub errors: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyErrors {
    pub month_year: String,
    pub total_errors: u64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorBreakdown {
    pub by_source: Vec<ToolErrors>,
    pub by_tool: Vec<MonthlyToolErrors>,
    pub by_month: Vec<MonthlyErrors>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorClusterRow {
    pub cluster_id: i64,
    pub label: String,
    pub count: u64,
    #[serde(default)]
    pub pct: f64,
    #[serde(default)]
    pub top_terms: Vec<String>,
    #[serde(default)]
    pub sample_error: String,
}

/// An association rule `antecedents -> consequent` mined from sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleRow {
    pub antecedents: Vec<String>,
    pub consequent: String,
    pub support: f64,
    pub confidence: f64,
    pub lift: f64,
    #[serde(default)]
    pub leverage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub month: String,
    pub tool: String,
    pub predicted: f64,
    pub lower: f64,
    pub upper: f64,
    #[serde(default)]
    pub method: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpikeKind {
    MomSpike,
    NewBaselineJump,
    LevelShift,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpikeRow {
    pub tool: String,
    pub month: String,
    pub event_type: SpikeKind,
    #[serde(default)]
    pub magnitude_pct: Option<f64>,
    #[serde(default)]
    pub absolute_jump: Option<f64>,
    #[serde(default)]
    pub from_value: Option<f64>,
    #[serde(default)]
    pub to_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoAnomalyRow {
    pub c_country: String,
    pub anomaly_score: f64,
    pub bot_ratio: f64,
    #[serde(default)]
    pub total_requests: Option<u64>,
    #[serde(default)]
    pub session_count: Option<u64>,
    #[serde(default)]
    pub likely_artifact: bool,
}

/// Every input the derivations read, fully materialized.
///
/// A file the pipeline did not publish leaves its field empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Dataset {
    pub traffic_types: Vec<TrafficTypeRow>,
    pub tool_visits: Vec<ToolVisitRow>,
    pub request_types: Vec<RequestTypeRow>,
    pub geo: Vec<GeoRow>,
    pub monthly_tool_visits: Vec<MonthlyToolVisits>,
    pub event_types: Vec<EventTypeRow>,
    pub cohort_retention: Vec<CohortRow>,
    pub error_breakdown: ErrorBreakdown,
    pub error_clusters: Vec<ErrorClusterRow>,
    pub rules: Vec<RuleRow>,
    pub forecasts: Vec<ForecastRow>,
    pub spikes: Vec<SpikeRow>,
    pub geo_anomalies: Vec<GeoAnomalyRow>,
}

impl From<&TrafficTypeRow> for CountedRow {
    fn from(row: &TrafficTypeRow) -> Self {
        CountedRow::new(row.traffic_type.clone(), row.count)
    }
}

impl From<&ToolVisitRow> for CountedRow {
    fn from(row: &ToolVisitRow) -> Self {
        CountedRow::new(row.tool.clone(), row.visits)
    }
}

impl From<&RequestTypeRow> for CountedRow {
    fn from(row: &RequestTypeRow) -> Self {
        CountedRow::new(row.request_type.clone(), row.count)
    }
}

impl From<&GeoRow> for CountedRow {
    fn from(row: &GeoRow) -> Self {
        CountedRow::new(row.c_country.clone(), row.visits)
    }
}

impl From<&EventTypeRow> for CountedRow {
    fn from(row: &EventTypeRow) -> Self {
        CountedRow::new(row.event.clone(), row.count)
    }
}

/// Convert any slice of raw rows into counted rows.
pub fn counted<'a, T>(rows: &'a [T]) -> Vec<CountedRow>
where
    &'a T: Into<CountedRow>,
{
    rows.iter().map(Into::into).collect()
}
