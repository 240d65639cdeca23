//! Error types shared by every derivation and by the loader.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the crate.
///
/// Degenerate inputs (empty slices, zero totals, unmapped keys) are not
/// errors; they resolve to zero-valued or empty results. Only contract
/// violations in the source data and loader failures surface here.
#[derive(Debug, Error)]
pub enum StatsError {
    /// A key did not match the format the pipeline promises.
    #[error("invalid format: {value:?} (expected {expected})")]
    InvalidFormat { value: String, expected: &'static str },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Flow node names double as the rendering layer's node ids.
    #[error("duplicate flow node name: {0:?}")]
    DuplicateFlowNode(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("loader task failed: {0}")]
    Task(String),
}

impl StatsError {
    pub(crate) fn invalid_month(value: &str) -> Self {
        StatsError::InvalidFormat {
            value: value.to_string(),
            expected: "YYYY-MM",
        }
    }
}

pub type Result<T, E = StatsError> = std::result::Result<T, E>;
