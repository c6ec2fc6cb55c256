use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{resource} resource not found at {}", .path.display())]
    ResourceNotFound { resource: String, path: PathBuf },
    #[error("{resource} is missing required column {column}")]
    MissingColumn { resource: String, column: String },
    #[error("{resource} line {line} has {found} fields, header has {expected}")]
    RowTooWide {
        resource: String,
        line: u64,
        expected: usize,
        found: usize,
    },
    #[error("failed to read {resource}: {source}")]
    Csv {
        resource: String,
        #[source]
        source: csv::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}
