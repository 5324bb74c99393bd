//! Export followed by ingestion
//!
//! An exported workbook or CSV file must load back into the same records:
//! same sheet name, same column labels in order, same typed values.

use sheetql::ingest::load_path;
use sheetql::{record, CellValue, ExportFormat, Record, Session, SessionConfig};
use sheetql_engine::export_as;

fn records() -> Vec<Record> {
    vec![
        record([
            ("Region", CellValue::from("Seoul")),
            ("Total Sales", CellValue::from(1200.5)),
            ("Active", CellValue::from(true)),
            ("Note", CellValue::from("a, \"quoted\" note")),
        ]),
        record([
            ("Region", CellValue::from("Busan")),
            ("Total Sales", CellValue::from(80.0)),
            ("Active", CellValue::from(false)),
            ("Note", CellValue::Null),
        ]),
    ]
}

#[test]
fn test_xlsx_export_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = export_as(&records(), "Q1 Sales", ExportFormat::Xlsx).unwrap();
    assert_eq!(artifact.file_name, "Q1 Sales.xlsx");
    let path = artifact.write_to_dir(dir.path()).unwrap();

    let sources = load_path(&path).unwrap();
    assert_eq!(sources.keys().collect::<Vec<_>>(), ["Q1 Sales"]);
    assert_eq!(sources["Q1 Sales"], records());
}

#[test]
fn test_csv_export_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = export_as(&records(), "sales", ExportFormat::Csv).unwrap();
    let path = artifact.write_to_dir(dir.path()).unwrap();

    let sources = load_path(&path).unwrap();
    assert_eq!(sources["sales"], records());
}

#[test]
fn test_long_label_is_trimmed_to_a_valid_sheet_name() {
    let dir = tempfile::tempdir().unwrap();
    let label = "Quarterly revenue by region: draft [v2]";
    let artifact = export_as(&records(), label, ExportFormat::Xlsx).unwrap();
    let path = artifact.write_to_dir(dir.path()).unwrap();

    let sources = load_path(&path).unwrap();
    let sheet = sources.keys().next().unwrap();
    assert!(sheet.chars().count() <= 31);
    assert!(!sheet.contains(':') && !sheet.contains('['));
}

#[test]
fn test_non_finite_numbers_export_as_text() {
    let dir = tempfile::tempdir().unwrap();
    let rows = vec![record([("x", CellValue::Number(f64::NAN))])];
    let path = export_as(&rows, "odd", ExportFormat::Xlsx)
        .unwrap()
        .write_to_dir(dir.path())
        .unwrap();

    let sources = load_path(&path).unwrap();
    assert_eq!(sources["odd"][0]["x"], CellValue::from("NaN"));
}

#[test]
fn test_edited_sheet_survives_a_reload() {
    let dir = tempfile::tempdir().unwrap();
    let original = export_as(&records(), "Sales", ExportFormat::Xlsx)
        .unwrap()
        .write_to_dir(dir.path().join("in"))
        .unwrap();

    let mut session = Session::new(SessionConfig {
        output_dir: dir.path().join("out"),
        ..SessionConfig::default()
    })
    .unwrap();
    session.load_files(&[&original]).unwrap();
    session
        .set_cell("sales", 1, "note", CellValue::from("updated"))
        .unwrap();
    let edited = session
        .export_to_dir(&sheetql::ExportTarget::Sheet("Sales".into()))
        .unwrap();

    let mut reloaded = Session::new(SessionConfig::default()).unwrap();
    reloaded.load_files(&[&edited]).unwrap();
    let outcome = reloaded.execute("select note from sales where region = 'Busan'");
    assert_eq!(outcome.result.data[0]["note"], CellValue::from("updated"));
}
