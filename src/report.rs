//! Assembly of every derived series into one serializable report.

use log::info;
use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;
use std::sync::Arc;
use std::time::Instant;

use crate::analysis::insights::{
    error_cluster_bars, forecast_chart, top_geo_anomalies, top_rules, top_spikes, ClusterBar,
    ForecastChart, GeoAnomalyBar, RuleBar, SpikeBar,
};
use crate::analysis::traffic::ErrorTrend;
use crate::analysis::{
    build_cohort_matrix, last_observed_month, monthly_error_trend, overview_stats, region_shares,
    request_funnel, tool_ranking, top_countries, OverviewStats, ReportCache, RequestFunnel,
};
use crate::config::Config;
use crate::data::{counted, Dataset};
use crate::error::{Result, StatsError};
use crate::types::{CacheKey, CohortMatrix, ShareRow};
use crate::utils::{sort_by_metric, with_shares, SortDirection};

/// Everything the dashboard draws, derived from one dataset.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardReport {
    pub overview: OverviewStats,
    pub traffic_types: Vec<ShareRow>,
    pub tool_visits: Vec<ShareRow>,
    /// Largest first
    pub event_types: Vec<ShareRow>,
    pub request_funnel: RequestFunnel,
    pub regions: Vec<ShareRow>,
    pub top_countries: Vec<ShareRow>,
    pub error_trend: ErrorTrend,
    pub retention: CohortMatrix,
    /// Last calendar month with retention data; cells reaching it are partial
    pub retention_through: Option<String>,
    pub error_clusters: Vec<ClusterBar>,
    pub rules: Vec<RuleBar>,
    pub forecasts: ForecastChart,
    pub spikes: Vec<SpikeBar>,
    pub geo_anomalies: Vec<GeoAnomalyBar>,
}

/// Derive a full report. Pure: the same inputs always give the same report.
pub fn build_report(dataset: &Dataset, config: &Config) -> Result<DashboardReport> {
    let sentinel = config.unknown_key.as_str();
    let total_visits: u64 = dataset.tool_visits.iter().map(|t| t.visits).sum();

    Ok(DashboardReport {
        overview: overview_stats(dataset, sentinel)?,
        traffic_types: with_shares(&counted(&dataset.traffic_types)),
        tool_visits: tool_ranking(&dataset.tool_visits),
        event_types: sort_by_metric(
            &with_shares(&counted(&dataset.event_types)),
            |r| r.value as f64,
            SortDirection::Descending,
        ),
        request_funnel: request_funnel(
            &dataset.traffic_types,
            total_visits,
            &dataset.tool_visits,
            &dataset.request_types,
            config.flow_scale()?,
        )?,
        regions: region_shares(&dataset.geo, &config.regions, sentinel),
        top_countries: top_countries(&dataset.geo, config.limits.countries, sentinel),
        error_trend: monthly_error_trend(&dataset.error_breakdown, &config.tool_order)?,
        retention: build_cohort_matrix(&dataset.cohort_retention, config.min_cohort_size)?,
        retention_through: last_observed_month(&dataset.cohort_retention)?.map(|m| m.to_string()),
        error_clusters: error_cluster_bars(&dataset.error_clusters),
        rules: top_rules(&dataset.rules, config.min_rule_support, config.limits.rules),
        forecasts: forecast_chart(&dataset.forecasts, &config.tool_order)?,
        spikes: top_spikes(&dataset.spikes, config.limits.spikes)?,
        geo_anomalies: top_geo_anomalies(&dataset.geo_anomalies, config.limits.geo_anomalies),
    })
}

struct HashWriter(DefaultHasher);

impl std::io::Write for HashWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.write(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Hash of a value's JSON form.
pub fn fingerprint<T: Serialize>(value: &T, what: &'static str) -> Result<u64> {
    let mut writer = HashWriter(DefaultHasher::new());
    serde_json::to_writer(&mut writer, value).map_err(|source| StatsError::Serialize { what, source })?;
    Ok(writer.0.finish())
}

/// A validated configuration plus memoized reports.
pub struct Dashboard {
    config: Config,
    config_hash: u64,
    cache: ReportCache,
}

impl Dashboard {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config_hash: fingerprint(&config, "config")?,
            cache: ReportCache::new(config.cache_capacity),
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &ReportCache {
        &self.cache
    }

    /// The report for `dataset`, reused when an identical dataset was seen before.
    pub fn report(&mut self, dataset: &Dataset) -> Result<Arc<DashboardReport>> {
        let key = CacheKey {
            dataset: fingerprint(dataset, "dataset")?,
            config: self.config_hash,
        };
        if let Some(report) = self.cache.get(&key) {
            return Ok(report);
        }

        let start_time = Instant::now();
        let report = Arc::new(build_report(dataset, &self.config)?);
        info!(
            "built report: {} cohorts, {} flow nodes, {} rules in {:.2}ms",
            report.retention.cohorts.len(),
            report.request_funnel.graph.nodes.len(),
            report.rules.len(),
            start_time.elapsed().as_secs_f64() * 1000.0
        );
        self.cache.store(key, Arc::clone(&report));
        Ok(report)
    }
}
