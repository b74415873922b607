use thiserror::Error;

/// Errors raised while fetching events from a telemetry source.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("source unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised while persisting or querying detection records.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Failure of a single rule evaluation. Errors are per-rule; a failed
/// rule never aborts the rest of a batch run.
#[derive(Error, Debug)]
pub enum DetectError {
    #[error("rule configuration error: {0}")]
    Config(#[from] argus_rules::ConfigError),

    #[error("event source '{source_name}' unavailable: {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    #[error("detection sink error: {0}")]
    Sink(#[from] SinkError),
}
