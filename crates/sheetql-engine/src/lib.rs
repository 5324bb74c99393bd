//! Embedded tabular query engine for SheetQL.
//!
//! Turns loosely typed spreadsheet rows into relations inside an in-memory
//! SQLite database, runs case-insensitive SQL against them under a bounded
//! result policy, applies single-cell edits, and encodes record sequences
//! back into spreadsheet containers.
//!
//! # Overview
//!
//! 1. A loader hands the engine a [`SourceSet`]: source name to records.
//! 2. [`RelationStore::reset`] drops every live table and creates one table
//!    per non-empty source, with an explicit `__rowindex__` column.
//! 3. [`QueryExecutor::execute`] folds and caps a statement, runs it, and
//!    wraps the outcome in a [`QueryResult`].
//! 4. [`MutationGateway::set_cell`] updates one cell by row index.
//! 5. [`export`](export::export) encodes records as XLSX or CSV.
//!
//! ```
//! use sheetql_engine::{record, CellValue, QueryExecutor, RelationStore, SourceSet};
//!
//! let store = RelationStore::new().unwrap();
//! let mut sources = SourceSet::new();
//! sources.insert(
//!     "Sales".to_string(),
//!     vec![record([("Region", CellValue::from("Seoul")), ("Amount", 10.0.into())])],
//! );
//! store.reset(&sources).unwrap();
//!
//! let result = QueryExecutor::new(&store).execute("SELECT Region FROM Sales");
//! assert!(result.success);
//! assert_eq!(result.data[0]["region"], CellValue::from("Seoul"));
//! ```
//!
//! # Modules
//!
//! - [`identifier`] -- Display and canonical names.
//! - [`schema`] -- Column inference from the first record.
//! - [`store`] -- The live table set.
//! - [`executor`] -- Statement preparation and execution.
//! - [`mutation`] -- Point updates.
//! - [`export`] -- XLSX and CSV encoding.
//! - [`error`] -- Engine error type.

pub mod error;
pub mod executor;
pub mod export;
pub mod identifier;
pub mod mutation;
pub mod schema;
pub mod store;
pub mod value;

pub use error::{EngineError, Result};
pub use executor::{CaseFolding, QueryExecutor, QueryOptions, QueryResult};
pub use export::{export, export_as, ExportArtifact, ExportFormat};
pub use identifier::{normalize, Identifier, ROW_INDEX_COLUMN};
pub use mutation::MutationGateway;
pub use schema::ColumnDef;
pub use store::{InsertReport, RelationStore, ResetReport, StoreOptions, TableInfo};
pub use value::{record, CellValue, Record, SourceSet};
