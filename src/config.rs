//! Dashboard configuration.
//!
//! Loaded from JSON; every field is optional and falls back to the
//! defaults below.

use log::debug;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::analysis::FlowScale;
use crate::error::{Result, StatsError};
use crate::utils::{BucketTable, UNKNOWN_KEY};

pub const CONFIG_ENV: &str = "USAGESTATS_CONFIG";
const CONFIG_DIR: &str = "usagestats";
const CONFIG_FILE: &str = "config.json";

const REGION_GROUPS: [(&str, &[&str]); 5] = [
    (
        "Americas",
        &[
            "US", "CA", "MX", "BR", "EC", "AR", "CO", "CL", "VE", "PE", "UY", "BO", "PY", "CR",
            "GT", "PA", "DO", "NI", "JM", "BS", "BZ", "GD", "VG",
        ],
    ),
    (
        "Europe",
        &[
            "GB", "DE", "FR", "NL", "IE", "AT", "CH", "SE", "FI", "BG", "HU", "ES", "PL", "IT",
            "SC", "RO", "BE", "NO", "PT", "HR", "CZ", "RS", "GR", "LT", "EE", "LV", "LU", "IS",
            "BY", "UA", "AL", "BA", "SI", "XK",
        ],
    ),
    (
        "Asia-Pacific",
        &[
            "JP", "KR", "CN", "HK", "SG", "AU", "IN", "VN", "TW", "PH", "ID", "MY", "TH", "BD",
            "NP", "NZ", "PK", "LK", "KH", "MM", "MN", "KI",
        ],
    ),
    (
        "Middle East & Africa",
        &[
            "IR", "TR", "SA", "AE", "IQ", "IL", "JO", "OM", "KW", "BH", "PS", "AM", "AZ", "GE",
            "UZ", "KZ", "KG", "SY", "LB", "LY", "DZ", "MA", "TN", "EG", "KE", "ZA", "NG", "SN",
            "UG", "SD", "GA", "CD", "CG", "CI", "CM",
        ],
    ),
    ("Other", &["RU"]),
];

static DEFAULT_REGIONS: Lazy<BucketTable> =
    Lazy::new(|| BucketTable::from_groups("Other", REGION_GROUPS));

/// How many rows each ranked chart keeps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub countries: usize,
    pub rules: usize,
    pub spikes: usize,
    pub geo_anomalies: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            countries: 20,
            rules: 12,
            spikes: 10,
            geo_anomalies: 12,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Exponent of the flow diagram's concave transform, in `(0, 1]`
    pub flow_exponent: f64,
    pub min_cohort_size: u64,
    pub min_rule_support: f64,
    /// Key the pipeline writes for unresolved values
    pub unknown_key: String,
    /// Series order for per-tool charts
    pub tool_order: Vec<String>,
    pub limits: Limits,
    pub regions: BucketTable,
    pub max_concurrent_loads: usize,
    /// Number of reports kept in memory
    pub cache_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("public/data"),
            output_dir: PathBuf::from("out"),
            flow_exponent: crate::analysis::DEFAULT_EXPONENT,
            min_cohort_size: 10,
            min_rule_support: 0.005,
            unknown_key: UNKNOWN_KEY.to_string(),
            tool_order: ["EUI", "RUI", "CDE", "FTU Explorer", "KG Explorer"]
                .iter()
                .map(|t| t.to_string())
                .collect(),
            limits: Limits::default(),
            regions: DEFAULT_REGIONS.clone(),
            max_concurrent_loads: (num_cpus::get() * 3 / 4).max(1),
            cache_capacity: 8,
        }
    }
}

impl Config {
    /// Read and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|source| StatsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = serde_json::from_slice(&bytes).map_err(|source| StatsError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Find the config file to use: `explicit`, then `$USAGESTATS_CONFIG`,
    /// then the per-user config directory. Built-in defaults when none exists.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Self::load(Path::new(&path));
        }
        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => {
                debug!("no config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.flow_scale()?;
        if self.cache_capacity == 0 {
            return Err(StatsError::InvalidConfig(
                "cache_capacity must be at least 1".to_string(),
            ));
        }
        if !(self.min_rule_support >= 0.0) {
            return Err(StatsError::InvalidConfig(format!(
                "min_rule_support must be non-negative, got {}",
                self.min_rule_support
            )));
        }
        Ok(())
    }

    pub fn flow_scale(&self) -> Result<FlowScale> {
        FlowScale::new(self.flow_exponent)
    }
}

/// `<config dir>/usagestats/config.json`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
}
