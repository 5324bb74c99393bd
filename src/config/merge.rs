//! Configuration merging utilities
//!
//! This module provides functions to merge configuration from files
//! with command-line arguments, where CLI arguments take precedence.

use super::args::SessionArgs;
use super::defaults::*;
use super::file::ConfigFile;

/// Merge configuration file values with CLI arguments.
/// CLI arguments take precedence over config file values.
/// Only applies config file values where CLI uses defaults.
pub fn merge_config_with_args(mut args: SessionArgs, config: &ConfigFile) -> SessionArgs {
    // Helper macro to apply config value if CLI is at default
    macro_rules! apply_if_default {
        ($field:ident, $config_val:expr, $default:expr) => {
            if let Some(val) = $config_val {
                if args.$field == $default {
                    args.$field = val;
                }
            }
        };
    }

    macro_rules! apply_if_default_string {
        ($field:ident, $config_val:expr, $default:expr) => {
            if let Some(ref val) = $config_val {
                if args.$field == $default {
                    args.$field = val.clone();
                }
            }
        };
    }

    // Engine section
    apply_if_default!(batch_size, config.engine.batch_size, DEFAULT_BATCH_SIZE);
    apply_if_default!(result_cap, config.engine.result_cap, DEFAULT_RESULT_CAP);
    apply_if_default_string!(
        case_folding,
        config.engine.case_folding,
        DEFAULT_CASE_FOLDING
    );
    if !args.show_row_index && config.engine.hide_row_index == Some(false) {
        args.show_row_index = true;
    }

    // Export section
    apply_if_default_string!(export_format, config.export.format, DEFAULT_EXPORT_FORMAT);
    if let Some(ref path) = config.export.output_dir {
        if args.output_dir == std::path::Path::new(DEFAULT_OUTPUT_DIR) {
            args.output_dir = path.clone();
        }
    }

    // Log section
    apply_if_default_string!(log_level, config.log.level, DEFAULT_LOG_LEVEL);

    args
}
