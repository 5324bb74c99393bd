//! Configuration module for SheetQL
//!
//! This module is organized into submodules:
//! - `defaults` - Default constants and values
//! - `args` - CLI argument definitions
//! - `file` - TOML configuration file
//! - `merge` - Applying file values under CLI arguments

mod args;
mod defaults;
pub mod file;
mod merge;

pub use args::SessionArgs;
pub use defaults::*;
pub use file::ConfigFile;
pub use merge::merge_config_with_args;

use serde::{Deserialize, Serialize};
use sheetql_engine::{CaseFolding, ExportFormat, QueryOptions, StoreOptions};
use std::path::PathBuf;

use crate::error::{Result, SheetqlError};

/// Resolved runtime configuration of a [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Rows per insert transaction.
    pub batch_size: usize,
    /// Row cap appended to uncapped selects.
    pub result_cap: usize,
    /// How statements are lowercased.
    pub case_folding: CaseFolding,
    /// Drop `__rowindex__` from query results.
    pub hide_row_index: bool,
    /// Container used by exports.
    pub export_format: ExportFormat,
    /// Where exports are written.
    pub output_dir: PathBuf,
    /// Sample rows attached to a prompt context.
    pub sample_rows: usize,
    /// Statements kept in the query history.
    pub history_capacity: usize,
    /// Log level used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            result_cap: DEFAULT_RESULT_CAP,
            case_folding: CaseFolding::default(),
            hide_row_index: true,
            export_format: ExportFormat::default(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            sample_rows: DEFAULT_SAMPLE_ROWS,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl SessionConfig {
    /// Load the config file named by `args.config` (or the first one found
    /// in the default locations) and resolve it under `args`.
    pub fn load(args: &SessionArgs) -> Result<Self> {
        let file = match &args.config {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::load_default().unwrap_or_default(),
        };
        Self::resolve(args.clone(), &file)
    }

    /// Resolve CLI arguments and file values into a runtime configuration.
    pub fn resolve(args: SessionArgs, file: &ConfigFile) -> Result<Self> {
        let args = merge_config_with_args(args, file);

        let case_folding = parse_case_folding(&args.case_folding)?;
        let export_format = args
            .export_format
            .parse::<ExportFormat>()
            .map_err(|e| SheetqlError::Config(e.to_string()))?;

        if args.batch_size == 0 {
            return Err(SheetqlError::Config("batch_size must be at least 1".to_string()));
        }
        if args.result_cap == 0 {
            return Err(SheetqlError::Config("result_cap must be at least 1".to_string()));
        }

        Ok(Self {
            batch_size: args.batch_size,
            result_cap: args.result_cap,
            case_folding,
            hide_row_index: !args.show_row_index,
            export_format,
            output_dir: args.output_dir,
            sample_rows: file.prompt.sample_rows.unwrap_or(DEFAULT_SAMPLE_ROWS),
            history_capacity: file.history.capacity.unwrap_or(DEFAULT_HISTORY_CAPACITY),
            log_level: args.log_level,
        })
    }

    /// Options for the relation store.
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            batch_size: self.batch_size,
        }
    }

    /// Options for the query executor.
    pub fn query_options(&self) -> QueryOptions {
        QueryOptions {
            result_cap: self.result_cap,
            case_folding: self.case_folding,
            hide_row_index: self.hide_row_index,
        }
    }
}

fn parse_case_folding(s: &str) -> Result<CaseFolding> {
    match s.to_ascii_lowercase().as_str() {
        "preserve-literals" | "preserve_literals" => Ok(CaseFolding::PreserveLiterals),
        "full" => Ok(CaseFolding::Full),
        other => Err(SheetqlError::Config(format!(
            "Unknown case_folding '{}', expected \"preserve-literals\" or \"full\"",
            other
        ))),
    }
}
