//! Schema inference for source records.
//!
//! The first record of a source is authoritative: its keys, in order, become
//! the column list. Keys that only appear in later records are ignored, and
//! later records missing a key insert NULL for it. Values are inspected only
//! to find boolean columns; other typing is left to the evaluator at insert
//! time.

use crate::identifier::{normalize, ROW_INDEX_COLUMN};
use crate::value::{CellValue, Record};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A column of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Field label as it appeared in the source; also the key used to read
    /// values out of source records.
    pub display_name: String,
    /// Lowercase storage name.
    pub canonical_name: String,
    /// Every non-null value is a boolean. Stored as `BOOLEAN` so reads can
    /// tell `true` from `1`.
    #[serde(default)]
    pub boolean: bool,
}

impl ColumnDef {
    pub fn new(display_name: impl Into<String>) -> Self {
        let display_name = display_name.into();
        let canonical_name = normalize(&display_name);
        Self {
            display_name,
            canonical_name,
            boolean: false,
        }
    }
}

/// Derive the column list of a source from its first record.
///
/// Returns an empty list for an empty source; the caller must not create a
/// table in that case. Two labels with the same canonical name share one
/// column: the later label takes over the slot of the first. A label that
/// canonicalizes to the reserved row index column is dropped.
///
/// ```
/// use sheetql_engine::schema::infer;
/// use sheetql_engine::value::record;
///
/// let rows = vec![record([("Name", "Kim".into()), ("Age", 31.0.into())])];
/// let cols = infer(&rows);
/// assert_eq!(cols[0].canonical_name, "name");
/// assert_eq!(cols[1].display_name, "Age");
/// ```
pub fn infer(records: &[Record]) -> Vec<ColumnDef> {
    let Some(first) = records.first() else {
        return Vec::new();
    };

    let mut columns: Vec<ColumnDef> = Vec::with_capacity(first.len());
    for key in first.keys() {
        let column = ColumnDef::new(key.as_str());

        if column.canonical_name == ROW_INDEX_COLUMN {
            warn!(column = %key, "Column name is reserved for the row index, dropping it");
            continue;
        }

        match columns
            .iter_mut()
            .find(|c| c.canonical_name == column.canonical_name)
        {
            Some(existing) => {
                warn!(
                    first = %existing.display_name,
                    later = %key,
                    canonical = %column.canonical_name,
                    "Column names collide after normalization, later one wins"
                );
                *existing = column;
            }
            None => columns.push(column),
        }
    }

    for column in &mut columns {
        column.boolean = holds_only_booleans(records, &column.display_name);
    }
    columns
}

fn holds_only_booleans(records: &[Record], label: &str) -> bool {
    let mut values = records
        .iter()
        .filter_map(|r| r.get(label))
        .filter(|v| !v.is_null())
        .peekable();
    values.peek().is_some() && values.all(|v| matches!(v, CellValue::Bool(_)))
}
