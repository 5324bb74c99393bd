//! Point updates of single cells, addressed by row index.

use crate::error::{EngineError, Result};
use crate::identifier::{normalize, quote, ROW_INDEX_COLUMN};
use crate::store::RelationStore;
use crate::value::CellValue;
use tracing::{debug, info, warn};

/// Applies single-cell edits to a borrowed store.
///
/// Only the table inside the evaluator changes; callers that keep their own
/// copy of the source records must mirror the edit themselves.
pub struct MutationGateway<'a> {
    store: &'a RelationStore,
}

impl<'a> MutationGateway<'a> {
    pub fn new(store: &'a RelationStore) -> Self {
        Self { store }
    }

    /// Set one cell.
    ///
    /// `table` and `column` may be given in any casing. The value goes through
    /// the same literal rules as bulk inserts.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Mutation`] if the table or column does not exist, the
    ///   column is the row index itself, or no row has `row_index`.
    /// - [`EngineError::Evaluation`] if the evaluator rejects the update.
    pub fn set_cell(
        &self,
        table: &str,
        row_index: usize,
        column: &str,
        value: &CellValue,
    ) -> Result<()> {
        let table_name = normalize(table);
        let column_name = normalize(column);

        if column_name == ROW_INDEX_COLUMN {
            return Err(EngineError::mutation("The row index column cannot be edited"));
        }

        let state = self.store.lock();
        let entry = state
            .catalog
            .get(&table_name)
            .ok_or_else(|| EngineError::mutation(format!("Table '{}' does not exist", table)))?;
        if !entry.columns.iter().any(|c| c.canonical_name == column_name) {
            return Err(EngineError::mutation(format!(
                "Column '{}' does not exist in table '{}'",
                column, entry.name.display
            )));
        }

        let sql = format!(
            "UPDATE {} SET {} = {} WHERE {} = {}",
            entry.name.quoted(),
            quote(&column_name),
            value.sql_literal(),
            quote(ROW_INDEX_COLUMN),
            row_index
        );
        debug!(sql = %sql, "Applying cell update");

        let changed = state
            .conn
            .execute(&sql, [])
            .map_err(|e| EngineError::evaluation(&sql, e.to_string()))?;

        if changed == 0 {
            warn!(table = %table_name, row_index, "No row matched the update");
            return Err(EngineError::mutation(format!(
                "Row {} does not exist in table '{}'",
                row_index, entry.name.display
            )));
        }

        info!(table = %table_name, column = %column_name, row_index, "Cell updated");
        Ok(())
    }
}
