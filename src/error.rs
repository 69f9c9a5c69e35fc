//! Error types for the field engine

use thiserror::Error;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, FieldError>;

/// Errors produced by engine and configuration operations.
#[derive(Debug, Error)]
pub enum FieldError {
    /// A bound particle references a configuration id the registry does not hold.
    /// Never caused by valid external input.
    #[error("unknown binding configuration id {config_id}")]
    UnknownConfiguration { config_id: u32 },

    /// A caller-side capacity check failed. The field itself never caps insertion.
    #[error("capacity exceeded: {requested} particles requested, maximum is {max}")]
    CapacityExceeded { requested: usize, max: usize },

    /// Degenerate geometric input, e.g. normalizing a zero-length vector.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(&'static str),

    /// A configuration value is out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Configuration JSON could not be parsed or produced.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
