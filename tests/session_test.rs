//! Integration tests for the session facade
//!
//! Files are written to a temporary directory and loaded through the
//! ingestion adapters, so these tests cover the whole path from a file on
//! disk to a query result or an exported file.

use sheetql::{
    CellValue, ConfigFile, ExportFormat, ExportTarget, Session, SessionArgs, SessionConfig,
    SheetqlError,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ── Test helpers ────────────────────────────────────────────────────────

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn fixture() -> (TempDir, Vec<PathBuf>) {
    let dir = tempfile::tempdir().unwrap();
    let orders = write_file(
        dir.path(),
        "Orders.csv",
        "Item,Qty,Unit Price,Paid\n\
         pen,2,1.5,TRUE\n\
         \n\
         ink,5,3,FALSE\n\
         paper,10,0.25,\n",
    );
    let stock = write_file(dir.path(), "stock.tsv", "item\ton_hand\npen\t40\nink\t0\n");
    (dir, vec![orders, stock])
}

fn session_with(config: SessionConfig) -> (TempDir, Session) {
    let (dir, files) = fixture();
    let mut session = Session::new(config).unwrap();
    session.load_files(&files).unwrap();
    (dir, session)
}

// ── Loading ─────────────────────────────────────────────────────────────

#[test]
fn test_files_become_tables() {
    let (_dir, session) = session_with(SessionConfig::default());

    let names: Vec<String> = session.tables().into_iter().map(|t| t.canonical_name).collect();
    assert_eq!(names, ["orders", "stock"]);
    assert_eq!(session.active_sheet(), Some("Orders"));
    assert_eq!(
        session.columns_of("ORDERS").unwrap(),
        ["Item", "Qty", "Unit Price", "Paid"]
    );
    // The blank line is not a row.
    assert_eq!(session.sheet("orders").unwrap().len(), 3);
}

#[test]
fn test_unsupported_file_is_an_ingest_error() {
    let dir = tempfile::tempdir().unwrap();
    let notes = write_file(dir.path(), "notes.txt", "hello");
    let mut session = Session::new(SessionConfig::default()).unwrap();

    let err = session.load_files(&[notes]).unwrap_err();
    assert!(matches!(err, SheetqlError::Ingest(_)));
    assert!(err.hint().is_some());
}

#[test]
fn test_header_only_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let empty = write_file(dir.path(), "empty.csv", "a,b\n");
    let mut session = Session::new(SessionConfig::default()).unwrap();

    let err = session.load_files(&[empty]).unwrap_err();
    assert!(matches!(err, SheetqlError::Validation(ref m) if m == "no data"));
}

// ── Queries ─────────────────────────────────────────────────────────────

#[test]
fn test_typed_values_from_delimited_text() {
    let (_dir, mut session) = session_with(SessionConfig::default());
    let outcome = session.execute(
        "select item, qty * \"unit price\" as total, paid from orders order by total desc",
    );

    assert!(outcome.result.success, "{:?}", outcome.result.error);
    let first = &outcome.result.data[0];
    assert_eq!(first["item"], CellValue::from("ink"));
    assert_eq!(first["total"], CellValue::Number(15.0));
    assert_eq!(first["paid"], CellValue::Bool(false));
    assert!(outcome.result.data[2]["paid"].is_null());
}

#[test]
fn test_join_across_files() {
    let (_dir, mut session) = session_with(SessionConfig::default());
    let outcome = session.execute(
        "select o.item from orders o join stock s on s.item = o.item where s.on_hand = 0",
    );
    assert_eq!(outcome.result.row_count, 1);
    assert_eq!(outcome.result.data[0]["item"], CellValue::from("ink"));
}

#[test]
fn test_history_follows_statements() {
    let config = SessionConfig {
        history_capacity: 2,
        ..SessionConfig::default()
    };
    let (_dir, mut session) = session_with(config);
    session.execute("select 1");
    session.execute("select * from missing");
    session.execute_with_prompt("select count(*) from orders", Some("how many orders"));

    let entries: Vec<_> = session.history().entries().collect();
    assert_eq!(entries.len(), 2);
    assert!(!entries[0].success);
    assert_eq!(entries[1].prompt.as_deref(), Some("how many orders"));
}

// ── Edits and exports ───────────────────────────────────────────────────

#[test]
fn test_edit_then_export_sheet_as_csv() {
    let (dir, mut session) = session_with(SessionConfig {
        export_format: ExportFormat::Csv,
        ..SessionConfig::default()
    });
    session
        .set_cell("orders", 2, "QTY", CellValue::infer_from_text("12"))
        .unwrap();

    let artifact = session.export(&ExportTarget::Sheet("Orders".into())).unwrap();
    let path = artifact.write_to_dir(dir.path().join("out")).unwrap();
    let text = std::fs::read_to_string(path).unwrap();

    assert_eq!(
        text,
        "Item,Qty,Unit Price,Paid\npen,2,1.5,true\nink,5,3,false\npaper,12,0.25,\n"
    );
}

#[test]
fn test_export_last_result_to_output_dir() {
    let dir = tempfile::tempdir().unwrap();
    let (_files, mut session) = session_with(SessionConfig {
        output_dir: dir.path().join("exports"),
        ..SessionConfig::default()
    });

    let err = session.export_to_dir(&ExportTarget::LastResult).unwrap_err();
    assert!(err.to_string().contains("No data to export"));

    session.execute("select item from orders");
    let path = session.export_to_dir(&ExportTarget::LastResult).unwrap();
    assert_eq!(path, dir.path().join("exports").join("query_result.xlsx"));
    assert!(path.exists());
}

// ── Configuration ───────────────────────────────────────────────────────

#[test]
fn test_config_file_values_reach_the_session() {
    let file = ConfigFile::parse(
        r#"
        [engine]
        result_cap = 2
        hide_row_index = false

        [export]
        format = "csv"
        "#,
    )
    .unwrap();
    let config = SessionConfig::resolve(SessionArgs::default(), &file).unwrap();
    assert_eq!(config.export_format, ExportFormat::Csv);

    let (_dir, mut session) = session_with(config);
    let outcome = session.execute("select * from orders");
    assert!(outcome.result.capped);
    assert_eq!(outcome.result.row_count, 2);
    assert_eq!(outcome.result.columns[0], "__rowindex__");
}

#[test]
fn test_cli_flags_override_config_file() {
    let file = ConfigFile::parse("[engine]\nresult_cap = 2\n").unwrap();
    let args = SessionArgs {
        result_cap: 7,
        ..SessionArgs::default()
    };
    let config = SessionConfig::resolve(args, &file).unwrap();
    assert_eq!(config.result_cap, 7);
}
