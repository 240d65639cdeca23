//! Shaping of the offline model outputs: error clusters, association
//! rules, visit forecasts, detected spikes and geographic anomalies.
//!
//! Ranked series come back smallest first so horizontal bar charts draw
//! the largest entry on top.

use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

use crate::data::{ErrorClusterRow, ForecastRow, GeoAnomalyRow, RuleRow, SpikeKind, SpikeRow};
use crate::error::Result;
use crate::utils::{format_month, percent_of, round_to, sort_by_metric, top_n, SortDirection};

const TOKEN_PREFIXES: [&str; 3] = ["feature:", "event:", "tool:"];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterBar {
    pub cluster_id: i64,
    pub label: String,
    pub count: u64,
    pub share_pct: f64,
    pub top_terms: Vec<String>,
    pub sample_error: String,
}

/// Error clusters, largest first, with shares recomputed from the counts.
pub fn error_cluster_bars(clusters: &[ErrorClusterRow]) -> Vec<ClusterBar> {
    let total: u64 = clusters.iter().map(|c| c.count).sum();
    sort_by_metric(clusters, |c| c.count as f64, SortDirection::Descending)
        .into_iter()
        .map(|c| ClusterBar {
            share_pct: percent_of(c.count as f64, total as f64),
            label: if c.label.is_empty() {
                format!("Cluster {}", c.cluster_id)
            } else {
                c.label
            },
            cluster_id: c.cluster_id,
            count: c.count,
            top_terms: c.top_terms,
            sample_error: c.sample_error,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleBar {
    pub label: String,
    pub confidence_pct: f64,
    pub support: f64,
    pub lift: f64,
}

/// Display form of a rule token: namespace prefix dropped, underscores as spaces.
pub fn short_token(token: &str) -> String {
    let bare = TOKEN_PREFIXES
        .iter()
        .find_map(|p| token.strip_prefix(p))
        .unwrap_or(token);
    bare.replace('_', " ")
}

pub fn rule_label(rule: &RuleRow) -> String {
    let lhs: Vec<String> = rule.antecedents.iter().map(|a| short_token(a)).collect();
    format!("{} -> {}", lhs.join(" + "), short_token(&rule.consequent))
}

/// The `n` most confident rules with at least `min_support`.
pub fn top_rules(rules: &[RuleRow], min_support: f64, n: usize) -> Vec<RuleBar> {
    let supported: Vec<&RuleRow> = rules.iter().filter(|r| r.support >= min_support).collect();
    top_n(&supported, |r| r.confidence, n, SortDirection::Ascending)
        .into_iter()
        .map(|r| RuleBar {
            label: rule_label(r),
            confidence_pct: round_to(r.confidence * 100.0, 2),
            support: r.support,
            lift: r.lift,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub predicted: f64,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastSeries {
    pub tool: String,
    /// Aligned with [`ForecastChart::months`]; `None` where no forecast exists
    pub points: Vec<Option<ForecastPoint>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ForecastChart {
    pub months: Vec<String>,
    pub labels: Vec<String>,
    pub series: Vec<ForecastSeries>,
}

/// One forecast series per tool in `tool_order` that has any rows.
pub fn forecast_chart(rows: &[ForecastRow], tool_order: &[String]) -> Result<ForecastChart> {
    let months: Vec<String> = rows
        .iter()
        .map(|r| r.month.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let labels = months
        .iter()
        .map(|m| format_month(m))
        .collect::<Result<Vec<_>>>()?;

    let by_key: HashMap<(&str, &str), &ForecastRow> = rows
        .iter()
        .map(|r| ((r.tool.as_str(), r.month.as_str()), r))
        .collect();

    let series = tool_order
        .iter()
        .filter(|tool| rows.iter().any(|r| &r.tool == *tool))
        .map(|tool| ForecastSeries {
            tool: tool.clone(),
            points: months
                .iter()
                .map(|m| {
                    by_key.get(&(tool.as_str(), m.as_str())).map(|r| ForecastPoint {
                        predicted: r.predicted,
                        lower: r.lower,
                        upper: r.upper,
                    })
                })
                .collect(),
        })
        .collect();

    Ok(ForecastChart {
        months,
        labels,
        series,
    })
}

impl SpikeKind {
    pub fn label(&self) -> &'static str {
        match self {
            SpikeKind::MomSpike => "Spike",
            SpikeKind::NewBaselineJump => "New baseline",
            SpikeKind::LevelShift => "Level shift",
        }
    }
}

/// Visits gained by a spike, never negative.
pub fn visit_jump(spike: &SpikeRow) -> f64 {
    match (spike.from_value, spike.to_value) {
        (Some(from), Some(to)) => (to - from).max(0.0),
        _ => spike.absolute_jump.unwrap_or(0.0).max(0.0),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpikeBar {
    pub label: String,
    pub tool: String,
    pub month: String,
    pub kind: String,
    pub visit_jump: f64,
    pub magnitude_pct: Option<f64>,
}

/// The `n` spikes with the largest visit jump.
pub fn top_spikes(spikes: &[SpikeRow], n: usize) -> Result<Vec<SpikeBar>> {
    top_n(spikes, visit_jump, n, SortDirection::Ascending)
        .into_iter()
        .map(|s| -> Result<SpikeBar> {
            Ok(SpikeBar {
                label: format!("{} · {}", format_month(&s.month)?, s.tool),
                kind: s.event_type.label().to_string(),
                visit_jump: visit_jump(&s),
                magnitude_pct: s.magnitude_pct,
                tool: s.tool,
                month: s.month,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoAnomalyBar {
    pub country: String,
    pub anomaly_score: f64,
    pub bot_pct: f64,
    pub likely_artifact: bool,
}

/// The `n` most anomalous countries.
pub fn top_geo_anomalies(rows: &[GeoAnomalyRow], n: usize) -> Vec<GeoAnomalyBar> {
    top_n(rows, |r| r.anomaly_score, n, SortDirection::Ascending)
        .into_iter()
        .map(|r| GeoAnomalyBar {
            bot_pct: round_to(r.bot_ratio * 100.0, 2),
            country: r.c_country,
            anomaly_score: r.anomaly_score,
            likely_artifact: r.likely_artifact,
        })
        .collect()
}
