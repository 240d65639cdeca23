use futures::future::join_all;
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::spawn_blocking;

use super::{Dataset, ErrorClusterRow, GeoAnomalyRow, RuleRow};
use crate::error::{Result, StatsError};

/// The pipeline files the derivations read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataFile {
    TrafficTypes,
    ToolVisits,
    RequestTypes,
    Geo,
    MonthlyToolVisits,
    EventTypes,
    CohortRetention,
    ErrorBreakdown,
    ErrorClusters,
    FeatureCooccurrence,
    Forecasts,
    DetectedEvents,
    SuspiciousCountries,
}

impl DataFile {
    pub const ALL: [DataFile; 13] = [
        DataFile::TrafficTypes,
        DataFile::ToolVisits,
        DataFile::RequestTypes,
        DataFile::Geo,
        DataFile::MonthlyToolVisits,
        DataFile::EventTypes,
        DataFile::CohortRetention,
        DataFile::ErrorBreakdown,
        DataFile::ErrorClusters,
        DataFile::FeatureCooccurrence,
        DataFile::Forecasts,
        DataFile::DetectedEvents,
        DataFile::SuspiciousCountries,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            DataFile::TrafficTypes => "traffic_types.json",
            DataFile::ToolVisits => "total_tool_visits.json",
            DataFile::RequestTypes => "request_types.json",
            DataFile::Geo => "geo_distribution.json",
            DataFile::MonthlyToolVisits => "tool_visits_by_month.json",
            DataFile::EventTypes => "event_types.json",
            DataFile::CohortRetention => "cohort_retention.json",
            DataFile::ErrorBreakdown => "error_breakdown.json",
            DataFile::ErrorClusters => "error_clusters.json",
            DataFile::FeatureCooccurrence => "feature_cooccurrence.json",
            DataFile::Forecasts => "forecast_tool_visits.json",
            DataFile::DetectedEvents => "detected_events.json",
            DataFile::SuspiciousCountries => "suspicious_countries.json",
        }
    }
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct ClustersFile {
    clusters: Vec<ErrorClusterRow>,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct RulesFile {
    rules: Vec<RuleRow>,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct SuspiciousCountriesFile {
    suspicious_countries: Vec<GeoAnomalyRow>,
}

/// Read a file, treating "not found" as "not published".
fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(StatsError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn parse<T>(dir: &Path, file: DataFile, raw: &HashMap<DataFile, Vec<u8>>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    match raw.get(&file) {
        None => Ok(T::default()),
        Some(bytes) => serde_json::from_slice(bytes).map_err(|source| StatsError::Json {
            path: dir.join(file.file_name()),
            source,
        }),
    }
}

fn assemble(dir: &Path, raw: &HashMap<DataFile, Vec<u8>>) -> Result<Dataset> {
    Ok(Dataset {
        traffic_types: parse(dir, DataFile::TrafficTypes, raw)?,
        tool_visits: parse(dir, DataFile::ToolVisits, raw)?,
        request_types: parse(dir, DataFile::RequestTypes, raw)?,
        geo: parse(dir, DataFile::Geo, raw)?,
        monthly_tool_visits: parse(dir, DataFile::MonthlyToolVisits, raw)?,
        event_types: parse(dir, DataFile::EventTypes, raw)?,
        cohort_retention: parse(dir, DataFile::CohortRetention, raw)?,
        error_breakdown: parse(dir, DataFile::ErrorBreakdown, raw)?,
        error_clusters: parse::<ClustersFile>(dir, DataFile::ErrorClusters, raw)?.clusters,
        rules: parse::<RulesFile>(dir, DataFile::FeatureCooccurrence, raw)?.rules,
        forecasts: parse(dir, DataFile::Forecasts, raw)?,
        spikes: parse(dir, DataFile::DetectedEvents, raw)?,
        geo_anomalies: parse::<SuspiciousCountriesFile>(dir, DataFile::SuspiciousCountries, raw)?
            .suspicious_countries,
    })
}

/// Load every pipeline file under `dir`.
///
/// Reads run on the blocking pool, at most `max_tasks` at a time. Missing
/// files leave their section empty; a missing directory, or unreadable or
/// malformed files, fail the whole load.
pub async fn load_dataset_async(dir: PathBuf, max_tasks: usize) -> Result<Dataset> {
    let start_time = Instant::now();
    let metadata = tokio::fs::metadata(&dir)
        .await
        .map_err(|source| StatsError::Io {
            path: dir.clone(),
            source,
        })?;
    if !metadata.is_dir() {
        return Err(StatsError::Io {
            path: dir,
            source: std::io::Error::new(std::io::ErrorKind::Other, "not a directory"),
        });
    }
    let semaphore = Arc::new(Semaphore::new(max_tasks.max(1)));
    let mut handles = Vec::with_capacity(DataFile::ALL.len());

    for file in DataFile::ALL {
        let path = dir.join(file.file_name());
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| StatsError::Task(format!("failed to acquire semaphore: {}", e)))?;

        handles.push(tokio::spawn(async move {
            let _permit = permit;
            let bytes = spawn_blocking(move || read_optional(&path))
                .await
                .map_err(|e| StatsError::Task(e.to_string()))??;
            Ok::<_, StatsError>((file, bytes))
        }));
    }

    let mut raw = HashMap::with_capacity(DataFile::ALL.len());
    for joined in join_all(handles).await {
        let (file, bytes) = joined.map_err(|e| StatsError::Task(e.to_string()))??;
        match bytes {
            Some(bytes) => {
                debug!("read {} ({} bytes)", file.file_name(), bytes.len());
                raw.insert(file, bytes);
            }
            None => debug!("{} not published, section left empty", file.file_name()),
        }
    }

    let dataset = assemble(&dir, &raw)?;
    info!(
        "loaded {}/{} data files from {} in {:.2}s",
        raw.len(),
        DataFile::ALL.len(),
        dir.display(),
        start_time.elapsed().as_secs_f64()
    );
    Ok(dataset)
}
