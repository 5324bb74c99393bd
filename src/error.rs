//! Error types for SheetQL
//!
//! Engine failures are wrapped as they are; everything the application layer
//! adds (configuration, ingestion, file IO) gets its own variant.

use sheetql_engine::EngineError;
use thiserror::Error;

/// Result type alias for SheetQL operations
pub type Result<T> = std::result::Result<T, SheetqlError>;

/// Errors from the SheetQL application layer.
#[derive(Debug, Error)]
pub enum SheetqlError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Ingest error: {0}")]
    Ingest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SheetqlError {
    /// Short hint printed under the error by the CLI, if one applies.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            SheetqlError::Config(_) => {
                Some("Run `sheetql init-config` to print a valid example configuration")
            }
            SheetqlError::Ingest(_) => {
                Some("Supported inputs are .xlsx, .xlsm, .xls, .ods, .csv and .tsv files")
            }
            SheetqlError::Engine(EngineError::Unavailable(_)) => {
                Some("The embedded database could not be opened; check available memory")
            }
            _ => None,
        }
    }
}

impl From<calamine::Error> for SheetqlError {
    fn from(e: calamine::Error) -> Self {
        SheetqlError::Ingest(e.to_string())
    }
}

impl From<csv::Error> for SheetqlError {
    fn from(e: csv::Error) -> Self {
        SheetqlError::Ingest(e.to_string())
    }
}
