#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

//! # SheetQL
//!
//! SheetQL loads spreadsheet workbooks and delimited files into an in-memory
//! SQL engine so they can be queried, edited cell by cell and exported again.
//!
//! ## Features
//!
//! - **Any sheet is a table**: sheet and column labels are normalized into
//!   case-insensitive identifiers, column types are inferred from the data
//! - **Plain SQL**: selects are capped automatically, writes report the
//!   number of changed rows
//! - **Cell edits**: addressed by sheet, source row and column label
//! - **Exports**: query results or edited sheets as XLSX or CSV
//!
//! ## Quick Start
//!
//! ```bash
//! # List the tables of a workbook
//! $ sheetql tables sales.xlsx
//!
//! # Run a query
//! $ sheetql query sales.xlsx -e "select region, sum(amount) from sales group by region"
//!
//! # Interactive shell
//! $ sheetql shell sales.xlsx regions.csv
//! ```
//!
//! ## Library Usage
//!
//! ```
//! use sheetql::{record, CellValue, Session, SessionConfig, SourceSet};
//!
//! fn main() -> sheetql::Result<()> {
//!     let mut sources = SourceSet::new();
//!     sources.insert(
//!         "Sales".to_string(),
//!         vec![record([("Region", CellValue::from("Seoul")), ("Amount", CellValue::from(10.0))])],
//!     );
//!
//!     let mut session = Session::new(SessionConfig::default())?;
//!     session.load(sources)?;
//!
//!     let outcome = session.execute("select region from sales where amount > 5");
//!     assert_eq!(outcome.result.row_count, 1);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod history;
pub mod ingest;
pub mod prompt;
pub mod session;

pub use config::{ConfigFile, SessionArgs, SessionConfig};
pub use error::{Result, SheetqlError};
pub use history::{HistoryEntry, QueryHistory};
pub use prompt::QueryPromptContext;
pub use session::{ExportTarget, QueryOutcome, Session};

pub use sheetql_engine::{
    record, CaseFolding, CellValue, ColumnDef, EngineError, ExportArtifact, ExportFormat,
    QueryOptions, QueryResult, Record, RelationStore, ResetReport, SourceSet, StoreOptions,
    TableInfo,
};
