//! Traffic summaries: overview numbers, tool and country rankings, region
//! rollup, and the monthly error trend.

use log::warn;
use serde::Serialize;
use std::collections::HashMap;

use super::funnel::{overhead_ratio, traffic_count, HUMAN_TRAFFIC};
use crate::data::{counted, Dataset, ErrorBreakdown, GeoRow, ToolVisitRow};
use crate::error::Result;
use crate::types::{CountedRow, ShareRow};
use crate::utils::{
    format_month, format_month_long, is_unknown_key, percent_of, round_to, sort_by_metric, top_n,
    with_shares, BucketTable, SortDirection,
};

/// Residual series for errors not attributed to a known tool.
pub const PORTAL_OTHER: &str = "Portal/Other";
/// Tool name the pipeline uses for unattributed errors.
pub const UNKNOWN_TOOL: &str = "Unknown";

/// Headline numbers for the overview page.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewStats {
    pub total_visits: u64,
    pub total_requests: u64,
    /// Share of requests classified as human, one decimal
    pub human_pct: f64,
    pub tool_count: usize,
    pub country_count: usize,
    pub first_month: Option<String>,
    pub last_month: Option<String>,
    pub month_count: usize,
    pub overhead_ratio: f64,
}

pub fn overview_stats(dataset: &Dataset, sentinel: &str) -> Result<OverviewStats> {
    let total_visits: u64 = dataset.tool_visits.iter().map(|t| t.visits).sum();
    let total_requests: u64 = dataset.traffic_types.iter().map(|t| t.count).sum();
    let human = if dataset.traffic_types.is_empty() {
        0
    } else {
        traffic_count(&dataset.traffic_types, HUMAN_TRAFFIC)
    };

    let months = &dataset.monthly_tool_visits;
    let first_month = months
        .first()
        .map(|m| format_month_long(&m.month_year))
        .transpose()?;
    let last_month = months
        .last()
        .map(|m| format_month_long(&m.month_year))
        .transpose()?;

    Ok(OverviewStats {
        total_visits,
        total_requests,
        human_pct: round_to(percent_of(human as f64, total_requests as f64), 1),
        tool_count: dataset.tool_visits.len(),
        country_count: dataset
            .geo
            .iter()
            .filter(|g| !is_unknown_key(&g.c_country, sentinel))
            .count(),
        first_month,
        last_month,
        month_count: months.len(),
        overhead_ratio: overhead_ratio(human, total_visits),
    })
}

/// Tools with their share of all visits, smallest first.
pub fn tool_ranking(tool_visits: &[ToolVisitRow]) -> Vec<ShareRow> {
    sort_by_metric(
        &with_shares(&counted(tool_visits)),
        |r| r.value as f64,
        SortDirection::Ascending,
    )
}

/// Visits rolled up into world regions, with shares.
pub fn region_shares(geo: &[GeoRow], regions: &BucketTable, sentinel: &str) -> Vec<ShareRow> {
    let buckets: Vec<CountedRow> = regions
        .rollup(&counted(geo), sentinel)
        .into_iter()
        .map(|b| CountedRow::new(b.name, b.value))
        .collect();
    with_shares(&buckets)
}

/// The `n` busiest known countries, smallest first. Shares are of all
/// known-country visits.
pub fn top_countries(geo: &[GeoRow], n: usize, sentinel: &str) -> Vec<ShareRow> {
    let known: Vec<CountedRow> = counted(geo)
        .into_iter()
        .filter(|r| !is_unknown_key(&r.key, sentinel))
        .collect();
    top_n(&with_shares(&known), |r| r.value as f64, n, SortDirection::Ascending)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorSeries {
    pub name: String,
    pub data: Vec<u64>,
}

/// Stacked monthly error counts, one series per tool plus [`PORTAL_OTHER`].
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ErrorTrend {
    pub months: Vec<String>,
    pub labels: Vec<String>,
    pub series: Vec<ErrorSeries>,
}

impl ErrorTrend {
    pub fn series(&self, name: &str) -> Option<&ErrorSeries> {
        self.series.iter().find(|s| s.name == name)
    }
}

/// Per-month error counts for each tool in `tool_order`, with the
/// remainder of each month's total as [`PORTAL_OTHER`].
///
/// Months follow `by_month`. A month whose tool errors exceed its total
/// gets a zero residual and a warning.
pub fn monthly_error_trend(breakdown: &ErrorBreakdown, tool_order: &[String]) -> Result<ErrorTrend> {
    let mut per_tool: HashMap<(&str, &str), u64> = HashMap::new();
    for row in breakdown
        .by_tool
        .iter()
        .filter(|r| r.tool != UNKNOWN_TOOL)
    {
        *per_tool
            .entry((row.month_year.as_str(), row.tool.as_str()))
            .or_insert(0) += row.errors;
    }

    let months: Vec<String> = breakdown
        .by_month
        .iter()
        .map(|m| m.month_year.clone())
        .collect();
    let labels = months
        .iter()
        .map(|m| format_month(m))
        .collect::<Result<Vec<_>>>()?;

    let mut series: Vec<ErrorSeries> = tool_order
        .iter()
        .map(|tool| ErrorSeries {
            name: tool.clone(),
            data: months
                .iter()
                .map(|m| per_tool.get(&(m.as_str(), tool.as_str())).copied().unwrap_or(0))
                .collect(),
        })
        .collect();

    let residual = breakdown
        .by_month
        .iter()
        .enumerate()
        .map(|(i, month)| {
            let known: u64 = series.iter().map(|s| s.data[i]).sum();
            if known > month.total_errors {
                warn!(
                    "{}: tool errors ({}) exceed the monthly total ({}), clamping {} to zero",
                    month.month_year, known, month.total_errors, PORTAL_OTHER
                );
            }
            month.total_errors.saturating_sub(known)
        })
        .collect();
    series.push(ErrorSeries {
        name: PORTAL_OTHER.to_string(),
        data: residual,
    });

    Ok(ErrorTrend {
        months,
        labels,
        series,
    })
}
