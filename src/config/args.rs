//! Command-line arguments shared by every SheetQL subcommand
//!
//! Flags left at their defaults yield to the configuration file, see
//! [`merge_config_with_args`](super::merge_config_with_args).

use clap::Args;
use std::path::PathBuf;

use super::defaults::*;

/// Engine and export settings that can be set on the command line.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct SessionArgs {
    /// Path to configuration file (TOML format).
    /// If not specified, looks for sheetql.toml in the current directory,
    /// then in ~/.config/sheetql/
    #[arg(short, long, global = true, env = "SHEETQL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "SHEETQL_LOG_LEVEL", default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,

    /// Rows per insert transaction while loading
    #[arg(long, global = true, env = "SHEETQL_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Row cap appended to select statements without a LIMIT
    #[arg(long, global = true, env = "SHEETQL_RESULT_CAP", default_value_t = DEFAULT_RESULT_CAP)]
    pub result_cap: usize,

    /// Case folding of statements: "preserve-literals" keeps quoted text as
    /// typed, "full" lowercases the whole statement
    #[arg(long, global = true, default_value = DEFAULT_CASE_FOLDING)]
    pub case_folding: String,

    /// Include the __rowindex__ column in query results
    #[arg(long, global = true)]
    pub show_row_index: bool,

    /// Export container (xlsx, csv)
    #[arg(long, global = true, env = "SHEETQL_EXPORT_FORMAT", default_value = DEFAULT_EXPORT_FORMAT)]
    pub export_format: String,

    /// Directory exports are written to
    #[arg(long, global = true, env = "SHEETQL_OUTPUT_DIR", default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,
}

impl Default for SessionArgs {
    fn default() -> Self {
        Self {
            config: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            result_cap: DEFAULT_RESULT_CAP,
            case_folding: DEFAULT_CASE_FOLDING.to_string(),
            show_row_index: false,
            export_format: DEFAULT_EXPORT_FORMAT.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}
