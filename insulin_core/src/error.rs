//! Error types for the insulin_core library.

use crate::types::EntryType;
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for insulin_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Blood-sugar reading text was empty or contained non-digits
    #[error("Invalid blood sugar reading: {0:?}")]
    InvalidReading(String),

    /// Entry type text did not name a known entry type
    #[error("Unknown entry type: {0}")]
    UnknownEntryType(String),

    /// The dose table has no row for this entry type and range
    #[error("No recommendation for {entry_type} readings in range {bucket}")]
    NoRecommendationForRange {
        entry_type: EntryType,
        bucket: &'static str,
    },

    /// A draft entry is missing fields required by the requested action
    #[error("Validation error: {0}")]
    Validation(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
