use std::path::PathBuf;

use thiserror::Error;

use depotwatch_ai::AiError;

/// Rejected rule definition.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("unknown order field `{0}`")]
    UnknownField(String),

    #[error("unknown condition operator `{0}`")]
    UnknownOperator(String),

    #[error("unknown action type `{0}`")]
    UnknownAction(String),

    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("result store lock poisoned")]
    Poisoned,
}

#[derive(Debug, Error)]
pub enum EngineError {
    /// Anomaly detection or order analysis failed; the batch was aborted.
    #[error("collaborator failed: {0}")]
    Collaborator(#[from] AiError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse rules: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid value for {key}: `{value}`")]
    InvalidValue { key: String, value: String },
}
