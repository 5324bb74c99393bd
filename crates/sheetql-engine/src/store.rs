//! The relation store: the set of live tables inside the embedded evaluator.
//!
//! Every load replaces the whole table set. Each non-empty source becomes a
//! table with the following shape:
//!
//! ```sql
//! CREATE TABLE "<canonical source name>" (
//!     "__rowindex__" INTEGER NOT NULL,   -- position of the record in its source
//!     "<canonical column 1>",            -- untyped: values keep their own type
//!     "<canonical column 2>" BOOLEAN,    -- only when every value is a boolean
//!     ...
//! );
//! CREATE UNIQUE INDEX "idx_<name>_rowindex" ON "<name>" ("__rowindex__");
//! ```
//!
//! Rows are inserted in fixed-size chunks, one evaluator transaction per
//! chunk. Chunking bounds the working set only; rows keep their order and a
//! row is either fully inserted or skipped.
//!
//! The connection and the catalog sit behind one mutex, so a reload is a
//! single critical section and a concurrent reader never sees a partially
//! rebuilt table set.

use crate::error::{EngineError, Result};
use crate::identifier::{normalize, quote, Identifier, ROW_INDEX_COLUMN};
use crate::schema::{infer, ColumnDef};
use crate::value::{is_boolean_type, CellValue, Record, SourceSet, BOOLEAN_TYPE};
use indexmap::IndexMap;
use parking_lot::{Mutex, MutexGuard};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Number of rows inserted per evaluator transaction.
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Options for a [`RelationStore`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreOptions {
    /// Rows per insert chunk.
    pub batch_size: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Metadata of a live table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    /// Source name in its original casing.
    pub display_name: String,
    /// Lowercase name used by statements.
    pub canonical_name: String,
    /// Columns in source order, row index excluded.
    pub columns: Vec<ColumnDef>,
    /// Rows currently in the table.
    pub row_count: usize,
}

impl TableInfo {
    /// Find a column by display or canonical name.
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        let canonical = normalize(name);
        self.columns.iter().find(|c| c.canonical_name == canonical)
    }
}

/// A source that did not become a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedSource {
    /// Source display name.
    pub source: String,
    /// Why it was skipped.
    pub reason: String,
}

/// Outcome of [`RelationStore::insert_batch`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsertReport {
    /// Rows inserted.
    pub inserted: usize,
    /// Rows rejected by the evaluator and skipped.
    pub failed: usize,
    /// Chunks processed.
    pub batches: usize,
}

/// Outcome of [`RelationStore::reset`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResetReport {
    /// `false` only when no table could be created.
    pub success: bool,
    /// Tables live after the reset, in creation order.
    pub tables: Vec<TableInfo>,
    /// Sources that produced no table.
    pub skipped: Vec<SkippedSource>,
    /// Rows inserted across all tables.
    pub rows_inserted: usize,
    /// Rows rejected across all tables.
    pub rows_failed: usize,
    /// Wall-clock duration of the reset in milliseconds.
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone)]
pub(crate) struct CatalogEntry {
    pub(crate) name: Identifier,
    pub(crate) columns: Vec<ColumnDef>,
}

/// Evaluator connection plus the catalog of tables it holds.
pub(crate) struct StoreState {
    pub(crate) conn: Connection,
    /// Canonical name -> entry, in creation order.
    pub(crate) catalog: IndexMap<String, CatalogEntry>,
}

/// Owner of the live tables.
///
/// A store is an explicit handle: independent stores share nothing, and
/// every operation goes through `&self`. All access is serialized through a
/// `Mutex` because `rusqlite::Connection` is not `Sync`.
pub struct RelationStore {
    state: Mutex<StoreState>,
    options: StoreOptions,
}

impl RelationStore {
    /// Create an empty store backed by an in-memory evaluator.
    pub fn new() -> Result<Self> {
        Self::with_options(StoreOptions::default())
    }

    /// Create an empty store with custom options.
    pub fn with_options(options: StoreOptions) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            EngineError::Unavailable(format!("Failed to open in-memory database: {}", e))
        })?;

        info!(batch_size = options.batch_size, "Relation store initialized (in-memory)");

        Ok(Self {
            state: Mutex::new(StoreState {
                conn,
                catalog: IndexMap::new(),
            }),
            options,
        })
    }

    /// Options this store was created with.
    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock()
    }

    /// Replace the whole table set with one table per non-empty source.
    ///
    /// Every live table is dropped first, including tables whose source is
    /// absent from `sources`. Sources are then created in iteration order.
    /// A source that fails to create or populate is logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Unavailable`] only when the evaluator cannot be
    /// reached at all. Everything else is reported in the [`ResetReport`].
    pub fn reset(&self, sources: &SourceSet) -> Result<ResetReport> {
        let start = Instant::now();
        let mut state = self.state.lock();

        state.ping()?;
        state.drop_all();

        let mut report = ResetReport::default();

        for (display_name, records) in sources {
            if records.is_empty() {
                warn!(source = %display_name, "Source has no rows, no table created");
                report.skipped.push(SkippedSource {
                    source: display_name.clone(),
                    reason: "source has no rows".to_string(),
                });
                continue;
            }

            match state.build_table(display_name, records, self.options.batch_size) {
                Ok(insert) => {
                    report.rows_inserted += insert.inserted;
                    report.rows_failed += insert.failed;
                }
                Err(e) => {
                    error!(source = %display_name, error = %e, "Failed to build table, skipping source");
                    report.skipped.push(SkippedSource {
                        source: display_name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        report.tables = state.table_infos();
        report.success = !report.tables.is_empty();
        report.elapsed_ms = start.elapsed().as_millis() as u64;

        info!(
            tables = report.tables.len(),
            skipped = report.skipped.len(),
            rows = report.rows_inserted,
            failed_rows = report.rows_failed,
            elapsed_ms = report.elapsed_ms,
            "Relation store reset"
        );

        Ok(report)
    }

    /// Append rows to a live table.
    ///
    /// Row indexes continue from the table's next free index. Values are read
    /// by the table's column display names; missing fields insert NULL.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Schema`] if the table does not exist. Rows the
    /// evaluator rejects are counted in [`InsertReport::failed`].
    pub fn insert_batch(&self, table: &str, rows: &[Record]) -> Result<InsertReport> {
        let mut state = self.state.lock();
        let entry = state.entry(table)?.clone();

        let next_index_sql = format!(
            "SELECT COALESCE(MAX({idx}) + 1, 0) FROM {t}",
            idx = quote(ROW_INDEX_COLUMN),
            t = entry.name.quoted()
        );
        let next_index: i64 = state
            .conn
            .query_row(&next_index_sql, [], |row| row.get(0))?;

        insert_rows(
            &mut state.conn,
            &entry.name,
            &entry.columns,
            rows,
            next_index.max(0) as usize,
            self.options.batch_size,
        )
    }

    /// Canonical names of the live tables.
    pub fn table_names(&self) -> BTreeSet<String> {
        self.state.lock().catalog.keys().cloned().collect()
    }

    /// Metadata of all live tables, in creation order.
    pub fn tables(&self) -> Vec<TableInfo> {
        self.state.lock().table_infos()
    }

    /// Metadata of one table, looked up by display or canonical name.
    pub fn table(&self, name: &str) -> Option<TableInfo> {
        let state = self.state.lock();
        let entry = state.catalog.get(&normalize(name))?;
        Some(state.table_info(entry))
    }

    /// All rows of a table ordered by row index, keyed by display column
    /// names, without the row index.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Schema`] if the table does not exist.
    pub fn snapshot(&self, table: &str) -> Result<Vec<Record>> {
        let state = self.state.lock();
        let entry = state.entry(table)?;

        if entry.columns.is_empty() {
            return Ok(Vec::new());
        }

        let select_list: Vec<String> = entry
            .columns
            .iter()
            .map(|c| quote(&c.canonical_name))
            .collect();
        let sql = format!(
            "SELECT {} FROM {} ORDER BY {}",
            select_list.join(", "),
            entry.name.quoted(),
            quote(ROW_INDEX_COLUMN)
        );

        let mut stmt = state.conn.prepare(&sql)?;
        let boolean: Vec<bool> = stmt
            .columns()
            .iter()
            .map(|c| is_boolean_type(c.decl_type()))
            .collect();
        let rows = stmt.query_map([], |row| {
            let mut record = Record::with_capacity(entry.columns.len());
            for (i, column) in entry.columns.iter().enumerate() {
                let value = CellValue::from_stored(row.get_ref(i)?, boolean[i]);
                record.insert(column.display_name.clone(), value);
            }
            Ok(record)
        })?;

        let records = rows.collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

impl StoreState {
    /// Check that the evaluator answers at all.
    fn ping(&self) -> Result<()> {
        self.conn
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map(|_| ())
            .map_err(|e| EngineError::Unavailable(e.to_string()))
    }

    pub(crate) fn entry(&self, table: &str) -> Result<&CatalogEntry> {
        self.catalog
            .get(&normalize(table))
            .ok_or_else(|| EngineError::Schema(format!("Table '{}' does not exist", table)))
    }

    /// Names and kinds of every user object in the evaluator.
    fn user_objects(&self) -> Result<Vec<(String, String)>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, type FROM sqlite_master \
             WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%'",
        )?;
        let objects = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(objects)
    }

    /// Drop every live table and view.
    fn drop_all(&mut self) {
        let objects = match self.user_objects() {
            Ok(objects) => objects,
            Err(e) => {
                warn!(error = %e, "Failed to list live tables, dropping catalog entries only");
                self.catalog
                    .keys()
                    .map(|name| (name.clone(), "table".to_string()))
                    .collect()
            }
        };

        // Views first, they may depend on tables.
        for (name, kind) in objects.iter().filter(|(_, k)| k == "view") {
            self.drop_object(name, kind);
        }
        for (name, kind) in objects.iter().filter(|(_, k)| k == "table") {
            self.drop_object(name, kind);
        }

        self.catalog.clear();
    }

    fn drop_object(&self, name: &str, kind: &str) {
        let keyword = if kind == "view" { "VIEW" } else { "TABLE" };
        let sql = format!("DROP {} IF EXISTS {}", keyword, quote(name));
        match self.conn.execute_batch(&sql) {
            Ok(()) => debug!(name = %name, kind = %kind, "Dropped"),
            Err(e) => warn!(name = %name, error = %e, "Failed to drop"),
        }
    }

    /// Create and populate the table for one source.
    fn build_table(
        &mut self,
        display_name: &str,
        records: &[Record],
        batch_size: usize,
    ) -> Result<InsertReport> {
        let name = Identifier::new(display_name);
        let columns = infer(records);
        if columns.is_empty() {
            return Err(EngineError::Schema(format!(
                "Source '{}' has no usable columns",
                display_name
            )));
        }

        if let Some(previous) = self.catalog.shift_remove(&name.canonical) {
            warn!(
                previous = %previous.name.display,
                replacement = %display_name,
                canonical = %name.canonical,
                "Table names collide after normalization, later one wins"
            );
            self.drop_object(&name.canonical, "table");
        }

        let mut column_list = vec![format!("{} INTEGER NOT NULL", quote(ROW_INDEX_COLUMN))];
        column_list.extend(columns.iter().map(|c| {
            if c.boolean {
                format!("{} {}", quote(&c.canonical_name), BOOLEAN_TYPE)
            } else {
                quote(&c.canonical_name)
            }
        }));
        let create_sql = format!(
            "CREATE TABLE {} ({})",
            name.quoted(),
            column_list.join(", ")
        );
        debug!(sql = %create_sql, "Creating table");
        self.conn.execute_batch(&create_sql).map_err(|e| {
            EngineError::Schema(format!("Failed to create table '{}': {}", display_name, e))
        })?;

        let index_sql = format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} ({})",
            quote(&format!("idx_{}_rowindex", name.canonical)),
            name.quoted(),
            quote(ROW_INDEX_COLUMN)
        );
        if let Err(e) = self.conn.execute_batch(&index_sql) {
            // Point updates still work without it, only slower.
            debug!(table = %name.canonical, error = %e, "Row index not indexed");
        }

        self.catalog.insert(
            name.canonical.clone(),
            CatalogEntry {
                name: name.clone(),
                columns: columns.clone(),
            },
        );

        info!(
            table = %name.canonical,
            source = %display_name,
            columns = columns.len(),
            rows = records.len(),
            "Inserting rows"
        );
        insert_rows(&mut self.conn, &name, &columns, records, 0, batch_size)
    }

    /// Bring the catalog in line with the evaluator after arbitrary user
    /// statements: forget dropped tables, adopt created ones.
    pub(crate) fn reconcile_catalog(&mut self) {
        let objects = match self.user_objects() {
            Ok(objects) => objects,
            Err(e) => {
                warn!(error = %e, "Failed to reconcile catalog");
                return;
            }
        };
        let live: Vec<&String> = objects
            .iter()
            .filter(|(_, kind)| kind == "table")
            .map(|(name, _)| name)
            .collect();

        self.catalog.retain(|canonical, _| {
            let keep = live.iter().any(|name| *name == canonical);
            if !keep {
                debug!(table = %canonical, "Table dropped by statement");
            }
            keep
        });

        for name in live {
            if self.catalog.contains_key(name) {
                continue;
            }
            match self.declared_columns(name) {
                Ok(columns) => {
                    debug!(table = %name, "Table created by statement");
                    self.catalog.insert(
                        name.clone(),
                        CatalogEntry {
                            name: Identifier::new(name.as_str()),
                            columns: columns
                                .into_iter()
                                .filter(|(column, _)| column != ROW_INDEX_COLUMN)
                                .map(|(column, decl_type)| ColumnDef {
                                    boolean: is_boolean_type(Some(&decl_type)),
                                    ..ColumnDef::new(column)
                                })
                                .collect(),
                        },
                    );
                }
                Err(e) => warn!(table = %name, error = %e, "Failed to read table columns"),
            }
        }
    }

    /// Column names and declared types of a table.
    fn declared_columns(&self, table: &str) -> Result<Vec<(String, String)>> {
        let sql = format!("PRAGMA table_info({})", quote(table));
        let mut stmt = self.conn.prepare(&sql)?;
        let columns = stmt
            .query_map([], |row| Ok((row.get(1)?, row.get(2)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(columns)
    }

    fn row_count(&self, table: &Identifier) -> usize {
        let sql = format!("SELECT COUNT(*) FROM {}", table.quoted());
        self.conn
            .query_row(&sql, [], |row| row.get::<_, i64>(0))
            .unwrap_or(0) as usize
    }

    pub(crate) fn table_info(&self, entry: &CatalogEntry) -> TableInfo {
        TableInfo {
            display_name: entry.name.display.clone(),
            canonical_name: entry.name.canonical.clone(),
            columns: entry.columns.clone(),
            row_count: self.row_count(&entry.name),
        }
    }

    pub(crate) fn table_infos(&self) -> Vec<TableInfo> {
        self.catalog
            .values()
            .map(|entry| self.table_info(entry))
            .collect()
    }
}

/// Insert `rows` in chunks of `batch_size`, one transaction per chunk.
///
/// Row `i` of `rows` receives row index `first_index + i`. A row the
/// evaluator rejects is logged and skipped; its index stays unused.
fn insert_rows(
    conn: &mut Connection,
    table: &Identifier,
    columns: &[ColumnDef],
    rows: &[Record],
    first_index: usize,
    batch_size: usize,
) -> Result<InsertReport> {
    let mut column_list = vec![quote(ROW_INDEX_COLUMN)];
    column_list.extend(columns.iter().map(|c| quote(&c.canonical_name)));
    let insert_prefix = format!(
        "INSERT INTO {} ({}) VALUES",
        table.quoted(),
        column_list.join(", ")
    );

    let batch_size = batch_size.max(1);
    let mut report = InsertReport::default();

    for (batch_no, chunk) in rows.chunks(batch_size).enumerate() {
        let chunk_start = first_index + batch_no * batch_size;
        debug!(
            table = %table.canonical,
            batch = batch_no + 1,
            from = chunk_start,
            to = chunk_start + chunk.len(),
            "Processing batch"
        );

        let tx = conn.transaction()?;
        for (offset, row) in chunk.iter().enumerate() {
            let row_index = chunk_start + offset;
            let values: Vec<String> = columns
                .iter()
                .map(|c| {
                    row.get(&c.display_name)
                        .map(CellValue::sql_literal)
                        .unwrap_or_else(|| "NULL".to_string())
                })
                .collect();
            let sql = format!("{} ({}, {})", insert_prefix, row_index, values.join(", "));

            match tx.execute(&sql, []) {
                Ok(_) => report.inserted += 1,
                Err(e) => {
                    let err = EngineError::Insert {
                        table: table.canonical.clone(),
                        row_index,
                        detail: e.to_string(),
                    };
                    error!(error = %err, "Row insert failed, skipping row");
                    report.failed += 1;
                }
            }
        }
        tx.commit()?;
        report.batches += 1;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::record;

    fn sales_rows(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| {
                record([
                    ("Region", CellValue::from(if i % 2 == 0 { "Seoul" } else { "Busan" })),
                    ("Amount", CellValue::from((i * 10) as f64)),
                ])
            })
            .collect()
    }

    fn sources(pairs: Vec<(&str, Vec<Record>)>) -> SourceSet {
        pairs
            .into_iter()
            .map(|(name, rows)| (name.to_string(), rows))
            .collect()
    }

    #[test]
    fn test_reset_creates_one_table_per_non_empty_source() {
        let store = RelationStore::new().unwrap();
        let report = store
            .reset(&sources(vec![
                ("Sales", sales_rows(3)),
                ("Empty", vec![]),
                ("Other", sales_rows(1)),
            ]))
            .unwrap();

        assert!(report.success);
        assert_eq!(report.tables.len(), 2);
        assert_eq!(report.tables[0].canonical_name, "sales");
        assert_eq!(report.tables[0].display_name, "Sales");
        assert_eq!(report.tables[0].row_count, 3);
        assert_eq!(report.tables[1].row_count, 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].source, "Empty");
        assert_eq!(
            store.table_names().into_iter().collect::<Vec<_>>(),
            ["other", "sales"]
        );
    }

    #[test]
    fn test_reset_with_only_empty_sources_is_unsuccessful() {
        let store = RelationStore::new().unwrap();
        let report = store.reset(&sources(vec![("A", vec![])])).unwrap();
        assert!(!report.success);
        assert!(store.table_names().is_empty());
    }

    #[test]
    fn test_reload_drops_tables_of_missing_sources() {
        let store = RelationStore::new().unwrap();
        store
            .reset(&sources(vec![("Old", sales_rows(2)), ("Kept", sales_rows(2))]))
            .unwrap();
        store.reset(&sources(vec![("Kept", sales_rows(5))])).unwrap();

        assert_eq!(
            store.table_names().into_iter().collect::<Vec<_>>(),
            ["kept"]
        );
        assert_eq!(store.table("kept").unwrap().row_count, 5);

        let state = store.lock();
        let err = state.conn.prepare("SELECT * FROM old").unwrap_err();
        assert!(err.to_string().contains("no such table"));
    }

    #[test]
    fn test_table_name_collision_last_write_wins() {
        let store = RelationStore::new().unwrap();
        let report = store
            .reset(&sources(vec![("Data", sales_rows(2)), ("DATA", sales_rows(7))]))
            .unwrap();

        assert_eq!(report.tables.len(), 1);
        assert_eq!(report.tables[0].display_name, "DATA");
        assert_eq!(report.tables[0].row_count, 7);
    }

    #[test]
    fn test_row_index_is_dense_in_insertion_order() {
        let store = RelationStore::with_options(StoreOptions { batch_size: 4 }).unwrap();
        store.reset(&sources(vec![("T", sales_rows(10))])).unwrap();

        let state = store.lock();
        let mut stmt = state
            .conn
            .prepare("SELECT __rowindex__, amount FROM t ORDER BY __rowindex__")
            .unwrap();
        let rows: Vec<(i64, f64)> = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(rows.len(), 10);
        for (i, (idx, amount)) in rows.iter().enumerate() {
            assert_eq!(*idx, i as i64);
            assert_eq!(*amount, (i * 10) as f64);
        }
    }

    #[test]
    fn test_chunking_reports_batches() {
        let store = RelationStore::with_options(StoreOptions { batch_size: 3 }).unwrap();
        store.reset(&sources(vec![("T", sales_rows(1))])).unwrap();

        let report = store.insert_batch("T", &sales_rows(7)).unwrap();
        assert_eq!(report.inserted, 7);
        assert_eq!(report.batches, 3);
        assert_eq!(store.table("t").unwrap().row_count, 8);

        let snapshot = store.snapshot("t").unwrap();
        assert_eq!(snapshot.len(), 8);
        // Appended rows continue after the loaded one.
        assert_eq!(snapshot[1]["Amount"], CellValue::Number(0.0));
        assert_eq!(snapshot[7]["Amount"], CellValue::Number(60.0));
    }

    #[test]
    fn test_bad_row_is_skipped_not_fatal() {
        let store = RelationStore::new().unwrap();
        let rows = vec![
            record([("v", CellValue::Number(1.0))]),
            record([("v", CellValue::Number(f64::NAN))]),
            record([("v", CellValue::Number(3.0))]),
        ];
        let report = store.reset(&sources(vec![("T", rows)])).unwrap();

        assert!(report.success);
        assert_eq!(report.rows_inserted, 2);
        assert_eq!(report.rows_failed, 1);
        assert_eq!(store.table("t").unwrap().row_count, 2);
    }

    #[test]
    fn test_insert_quotes_strings_and_nulls() {
        let store = RelationStore::new().unwrap();
        let rows = vec![
            record([("Name", CellValue::from("O'Brien")), ("Note", CellValue::Null)]),
            // Missing key inserts NULL; extra key ignored.
            record([("Name", CellValue::from("Lee")), ("Extra", CellValue::from(1.0))]),
        ];
        store.reset(&sources(vec![("People", rows)])).unwrap();

        let snapshot = store.snapshot("PEOPLE").unwrap();
        assert_eq!(snapshot[0]["Name"], CellValue::from("O'Brien"));
        assert_eq!(snapshot[0]["Note"], CellValue::Null);
        assert_eq!(snapshot[1]["Note"], CellValue::Null);
        assert!(!snapshot[1].contains_key("Extra"));
    }

    #[test]
    fn test_snapshot_uses_display_names() {
        let store = RelationStore::new().unwrap();
        store.reset(&sources(vec![("Sales", sales_rows(2))])).unwrap();
        let snapshot = store.snapshot("sales").unwrap();
        let keys: Vec<&String> = snapshot[0].keys().collect();
        assert_eq!(keys, ["Region", "Amount"]);
    }

    #[test]
    fn test_unknown_table_errors() {
        let store = RelationStore::new().unwrap();
        assert!(matches!(store.snapshot("nope"), Err(EngineError::Schema(_))));
        assert!(matches!(
            store.insert_batch("nope", &[]),
            Err(EngineError::Schema(_))
        ));
        assert!(store.table("nope").is_none());
    }

    #[test]
    fn test_source_with_keyless_first_record_is_skipped() {
        let store = RelationStore::new().unwrap();
        let report = store
            .reset(&sources(vec![("Blank", vec![Record::new()]), ("Ok", sales_rows(1))]))
            .unwrap();
        assert!(report.success);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].source, "Blank");
    }

    #[test]
    fn test_reconcile_tracks_user_ddl() {
        let store = RelationStore::new().unwrap();
        store.reset(&sources(vec![("A", sales_rows(1))])).unwrap();
        {
            let mut state = store.lock();
            state
                .conn
                .execute_batch("DROP TABLE a; CREATE TABLE made (x, y)")
                .unwrap();
            state.reconcile_catalog();
        }
        let names: Vec<String> = store.table_names().into_iter().collect();
        assert_eq!(names, ["made"]);
        let made = store.table("made").unwrap();
        assert_eq!(made.columns.len(), 2);
        assert!(made.column("X").is_some());
    }
}
