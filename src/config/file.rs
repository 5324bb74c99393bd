//! Configuration file support for SheetQL
//!
//! This module provides TOML configuration file parsing. Every key is
//! optional; absent keys fall back to command-line flags and then defaults.
//!
//! ## Priority Order
//!
//! 1. Command-line arguments (and their `SHEETQL_*` environment variables)
//! 2. Configuration file
//! 3. Default values
//!
//! ## Example Configuration
//!
//! ```toml
//! # sheetql.toml
//!
//! [engine]
//! batch_size = 10000
//! result_cap = 10000
//! case_folding = "preserve-literals"
//! hide_row_index = true
//!
//! [export]
//! format = "xlsx"
//! output_dir = "./exports"
//!
//! [log]
//! level = "info"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::defaults::CONFIG_FILE_NAME;
use crate::error::{Result, SheetqlError};

/// Root configuration structure for TOML file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Engine configuration
    pub engine: EngineSection,

    /// Export configuration
    pub export: ExportSection,

    /// Prompt context configuration
    pub prompt: PromptSection,

    /// Query history configuration
    pub history: HistorySection,

    /// Logging configuration
    pub log: LogSection,
}

/// Engine section configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// Rows per insert transaction
    pub batch_size: Option<usize>,

    /// Row cap appended to select statements without a LIMIT
    pub result_cap: Option<usize>,

    /// "preserve-literals" or "full"
    pub case_folding: Option<String>,

    /// Drop the row index column from query results
    pub hide_row_index: Option<bool>,
}

/// Export section configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSection {
    /// "xlsx" or "csv"
    pub format: Option<String>,

    /// Directory exports are written to
    pub output_dir: Option<PathBuf>,
}

/// Prompt section configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSection {
    /// Sample rows attached to a prompt context
    pub sample_rows: Option<usize>,
}

/// History section configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySection {
    /// Statements kept in memory
    pub capacity: Option<usize>,
}

/// Log section configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// Log level (trace, debug, info, warn, error)
    pub level: Option<String>,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SheetqlError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        Self::parse(&contents).map_err(|e| match e {
            SheetqlError::Config(msg) => {
                SheetqlError::Config(format!("Failed to parse config file {:?}: {}", path, msg))
            }
            other => other,
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| SheetqlError::Config(e.to_string()))
    }

    /// Try to load configuration from default locations
    ///
    /// Searches in order:
    /// 1. ./sheetql.toml
    /// 2. ~/.config/sheetql/sheetql.toml
    pub fn load_default() -> Option<Self> {
        let default_paths = [
            PathBuf::from(CONFIG_FILE_NAME),
            dirs::config_dir()
                .map(|p| p.join("sheetql").join(CONFIG_FILE_NAME))
                .unwrap_or_default(),
        ];

        for path in default_paths.iter().filter(|p| !p.as_os_str().is_empty()) {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => {
                        tracing::info!("Loaded configuration from {:?}", path);
                        return Some(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        None
    }

    /// Generate an example configuration file
    pub fn generate_example() -> String {
        r#"# SheetQL Configuration File
# Copy to sheetql.toml and customize as needed
#
# Configuration priority (highest to lowest):
# 1. Command-line arguments
# 2. This configuration file
# 3. Default values

[engine]
# Rows inserted per transaction while loading a workbook
batch_size = 10000

# Row cap appended as "limit N" to select statements without a limit
result_cap = 10000

# "preserve-literals" lowercases the statement but keeps quoted text as typed
# "full" lowercases everything, quoted text included
case_folding = "preserve-literals"

# Hide the __rowindex__ column from query results
hide_row_index = true

[export]
# Export container: "xlsx" or "csv"
format = "xlsx"

# Directory exports are written to
output_dir = "."

[prompt]
# Sample rows attached to a natural-language query context
sample_rows = 10

[history]
# Statements kept in the in-memory query history
capacity = 100

[log]
# Log level (trace, debug, info, warn, error)
level = "info"
"#
        .to_string()
    }
}
