//! Error types for the SheetQL engine.
//!
//! The variants follow how each failure is handled: validation, evaluation,
//! mutation and export errors reach the caller, while schema and insert
//! errors are recovered per item during a reload (logged, item skipped) and
//! only show up in the [`ResetReport`](crate::store::ResetReport).

/// Errors from the tabular engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The input was rejected before reaching the evaluator
    /// (empty statement, nothing to export).
    #[error("Validation error: {0}")]
    Validation(String),

    /// A table or column could not be created as requested.
    #[error("Schema error: {0}")]
    Schema(String),

    /// The embedded SQL evaluator rejected or failed a statement.
    ///
    /// The inner string contains the evaluator's diagnostic message.
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// A single row could not be inserted.
    #[error("Insert error in table '{table}' at row {row_index}: {detail}")]
    Insert {
        /// Canonical table name.
        table: String,
        /// Row index the record would have received.
        row_index: usize,
        /// Evaluator diagnostic.
        detail: String,
    },

    /// A point update could not be applied.
    #[error("Mutation error: {0}")]
    Mutation(String),

    /// Writing an export container failed.
    #[error("Export error: {0}")]
    Export(String),

    /// The evaluator could not be reached at all.
    #[error("Evaluator unavailable: {0}")]
    Unavailable(String),
}

impl EngineError {
    /// Create an `Evaluation` error that carries a preview of the statement.
    ///
    /// # Examples
    ///
    /// ```
    /// use sheetql_engine::error::EngineError;
    ///
    /// let err = EngineError::evaluation(
    ///     "select * form sales",
    ///     "near \"form\": syntax error",
    /// );
    /// assert!(err.to_string().contains("syntax error"));
    /// ```
    pub fn evaluation(sql: &str, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        // Truncate very long statements in the message
        let sql_preview = if sql.chars().count() > 120 {
            let head: String = sql.chars().take(120).collect();
            format!("{}...", head)
        } else {
            sql.to_string()
        };
        Self::Evaluation(format!("{} (statement: {})", detail, sql_preview))
    }

    /// Create a `Mutation` error.
    pub fn mutation(detail: impl Into<String>) -> Self {
        Self::Mutation(detail.into())
    }

    /// Create a `Validation` error.
    pub fn validation(detail: impl Into<String>) -> Self {
        Self::Validation(detail.into())
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(e: rusqlite::Error) -> Self {
        EngineError::Evaluation(e.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for EngineError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        EngineError::Export(e.to_string())
    }
}

impl From<csv::Error> for EngineError {
    fn from(e: csv::Error) -> Self {
        EngineError::Export(e.to_string())
    }
}

/// A specialised `Result` type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
