//! Default constants for SheetQL configuration

/// Default log level
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default rows per insert transaction
pub const DEFAULT_BATCH_SIZE: usize = sheetql_engine::store::DEFAULT_BATCH_SIZE;

/// Default row cap appended to uncapped selects
pub const DEFAULT_RESULT_CAP: usize = sheetql_engine::executor::DEFAULT_RESULT_CAP;

/// Default case folding mode name
pub const DEFAULT_CASE_FOLDING: &str = "preserve-literals";

/// Default export container
pub const DEFAULT_EXPORT_FORMAT: &str = "xlsx";

/// Default directory exports are written to
pub const DEFAULT_OUTPUT_DIR: &str = ".";

/// Default number of sample rows attached to a prompt context
pub const DEFAULT_SAMPLE_ROWS: usize = 10;

/// Default number of statements kept in the query history
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Config file name searched in the default locations
pub const CONFIG_FILE_NAME: &str = "sheetql.toml";
