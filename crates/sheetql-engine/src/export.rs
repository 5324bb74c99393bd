//! Export of record sequences to spreadsheet containers.
//!
//! The header row is the key list of the first record, in its original
//! casing. Every later record is written by header key; keys a record lacks
//! leave a blank cell and keys the first record lacks are not exported.

use crate::error::{EngineError, Result};
use crate::value::{CellValue, Record};
use rust_xlsxwriter::{Workbook, Worksheet};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, error, info};

/// Longest sheet name a workbook accepts.
pub const MAX_SHEET_NAME_LEN: usize = 31;

const FORBIDDEN_SHEET_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

/// Container format of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Office Open XML workbook with a single sheet.
    #[default]
    Xlsx,
    /// Comma-separated text.
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportFormat::Csv => "text/csv",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "xlsx" => Ok(ExportFormat::Xlsx),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(EngineError::validation(format!(
                "Unknown export format '{}', expected xlsx or csv",
                other
            ))),
        }
    }
}

/// An encoded export ready to be saved or downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    /// Suggested file name, `<label>.<extension>`.
    pub file_name: String,
    /// MIME type of `bytes`.
    pub content_type: String,
    /// Encoded container.
    pub bytes: Vec<u8>,
}

impl ExportArtifact {
    /// Write the artifact into `dir` under its file name and return the path.
    /// `dir` is created if missing.
    pub fn write_to_dir(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| {
            EngineError::Export(format!("Failed to create {}: {}", dir.display(), e))
        })?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes).map_err(|e| {
            EngineError::Export(format!("Failed to write {}: {}", path.display(), e))
        })?;
        info!(path = %path.display(), bytes = self.bytes.len(), "Export written");
        Ok(path)
    }
}

/// Export records as a single-sheet XLSX workbook.
///
/// # Errors
///
/// Returns [`EngineError::Validation`] if `records` is empty or its first
/// record has no keys, and [`EngineError::Export`] if encoding fails.
pub fn export(records: &[Record], label: &str) -> Result<ExportArtifact> {
    export_as(records, label, ExportFormat::Xlsx)
}

/// Export records in the given format.
pub fn export_as(records: &[Record], label: &str, format: ExportFormat) -> Result<ExportArtifact> {
    let Some(first) = records.first().filter(|r| !r.is_empty()) else {
        error!(label = %label, "Nothing to export");
        return Err(EngineError::validation("No data to export"));
    };
    let headers: Vec<&str> = first.keys().map(String::as_str).collect();

    let bytes = match format {
        ExportFormat::Xlsx => encode_xlsx(&headers, records, &sanitize_sheet_name(label))?,
        ExportFormat::Csv => encode_csv(&headers, records)?,
    };

    let artifact = ExportArtifact {
        file_name: format!("{}.{}", file_stem(label), format.extension()),
        content_type: format.content_type().to_string(),
        bytes,
    };
    info!(
        file = %artifact.file_name,
        rows = records.len(),
        columns = headers.len(),
        bytes = artifact.bytes.len(),
        "Export encoded"
    );
    Ok(artifact)
}

/// Make `label` acceptable as a worksheet name.
///
/// ```
/// use sheetql_engine::export::sanitize_sheet_name;
///
/// assert_eq!(sanitize_sheet_name("Q1/Q2 [draft]"), "Q1_Q2 _draft_");
/// assert_eq!(sanitize_sheet_name(""), "Sheet1");
/// ```
pub fn sanitize_sheet_name(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .map(|c| if FORBIDDEN_SHEET_CHARS.contains(&c) { '_' } else { c })
        .take(MAX_SHEET_NAME_LEN)
        .collect();
    let cleaned = cleaned.trim_matches('\'');

    if cleaned.trim().is_empty() {
        "Sheet1".to_string()
    } else if cleaned.eq_ignore_ascii_case("history") {
        // Reserved by Excel.
        format!("{}_", cleaned)
    } else {
        cleaned.to_string()
    }
}

fn file_stem(label: &str) -> String {
    let stem: String = label
        .chars()
        .map(|c| if c == '/' || c == '\\' || c.is_control() { '_' } else { c })
        .collect();
    if stem.trim().is_empty() {
        "export".to_string()
    } else {
        stem
    }
}

fn encode_xlsx(headers: &[&str], records: &[Record], sheet_name: &str) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string(0, column_number(col)?, *header)?;
    }

    for (i, record) in records.iter().enumerate() {
        let row = u32::try_from(i + 1)
            .map_err(|_| EngineError::Export("Too many rows for a worksheet".to_string()))?;
        for (col, header) in headers.iter().enumerate() {
            if let Some(value) = record.get(*header) {
                write_cell(worksheet, row, column_number(col)?, value)?;
            }
        }
    }

    debug!(sheet = %sheet_name, rows = records.len(), "Encoding workbook");
    Ok(workbook.save_to_buffer()?)
}

fn column_number(col: usize) -> Result<u16> {
    u16::try_from(col).map_err(|_| EngineError::Export("Too many columns for a worksheet".to_string()))
}

fn write_cell(worksheet: &mut Worksheet, row: u32, col: u16, value: &CellValue) -> Result<()> {
    match value {
        CellValue::Null => {}
        CellValue::Bool(b) => {
            worksheet.write_boolean(row, col, *b)?;
        }
        CellValue::Number(n) if n.is_finite() => {
            worksheet.write_number(row, col, *n)?;
        }
        // Workbooks cannot hold NaN or infinities.
        CellValue::Number(n) => {
            worksheet.write_string(row, col, n.to_string())?;
        }
        CellValue::Text(s) => {
            worksheet.write_string(row, col, s.as_str())?;
        }
    }
    Ok(())
}

fn encode_csv(headers: &[&str], records: &[Record]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(headers)?;
    for record in records {
        let row: Vec<String> = headers
            .iter()
            .map(|h| record.get(*h).map(|v| v.to_string()).unwrap_or_default())
            .collect();
        writer.write_record(&row)?;
    }
    writer
        .into_inner()
        .map_err(|e| EngineError::Export(format!("Failed to flush CSV: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::record;
    use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
    use std::io::Cursor;

    fn sample() -> Vec<Record> {
        vec![
            record([
                ("Region", CellValue::from("Seoul")),
                ("Total Sales", CellValue::from(1200.5)),
                ("Active", CellValue::from(true)),
            ]),
            record([
                ("Region", CellValue::from("Busan")),
                ("Active", CellValue::from(false)),
                ("Ignored", CellValue::from("x")),
            ]),
        ]
    }

    fn read_back(bytes: Vec<u8>) -> (Vec<String>, Vec<Vec<Data>>) {
        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
        let names = workbook.sheet_names().to_vec();
        let range = workbook.worksheet_range(&names[0]).unwrap();
        let rows = range.rows().map(|r| r.to_vec()).collect();
        (names, rows)
    }

    #[test]
    fn test_empty_input_is_rejected() {
        assert!(matches!(export(&[], "x"), Err(EngineError::Validation(_))));
        assert!(matches!(
            export(&[Record::new()], "x"),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn test_xlsx_header_and_cells() {
        let artifact = export(&sample(), "Sales").unwrap();
        assert_eq!(artifact.file_name, "Sales.xlsx");
        assert_eq!(artifact.content_type, ExportFormat::Xlsx.content_type());

        let (names, rows) = read_back(artifact.bytes);
        assert_eq!(names, ["Sales"]);
        assert_eq!(
            rows[0],
            [
                Data::String("Region".into()),
                Data::String("Total Sales".into()),
                Data::String("Active".into()),
            ]
        );
        assert_eq!(rows[1][1], Data::Float(1200.5));
        assert_eq!(rows[1][2], Data::Bool(true));
        // Missing key leaves a blank cell; extra key is dropped.
        assert_eq!(rows[2][1], Data::Empty);
        assert_eq!(rows[2].len(), 3);
    }

    #[test]
    fn test_csv_export() {
        let artifact = export_as(&sample(), "Sales", ExportFormat::Csv).unwrap();
        assert_eq!(artifact.file_name, "Sales.csv");
        let text = String::from_utf8(artifact.bytes).unwrap();
        assert_eq!(
            text,
            "Region,Total Sales,Active\nSeoul,1200.5,true\nBusan,,false\n"
        );
    }

    #[test]
    fn test_sheet_name_sanitizing() {
        assert_eq!(sanitize_sheet_name("a:b*c?"), "a_b_c_");
        assert_eq!(sanitize_sheet_name(&"x".repeat(40)).len(), MAX_SHEET_NAME_LEN);
        assert_eq!(sanitize_sheet_name("'quoted'"), "quoted");
        assert_eq!(sanitize_sheet_name("History"), "History_");
        assert_eq!(sanitize_sheet_name("   "), "Sheet1");
    }

    #[test]
    fn test_label_with_path_separator_stays_in_dir() {
        let artifact = export(&sample(), "a/b").unwrap();
        assert_eq!(artifact.file_name, "a_b.xlsx");

        let dir = tempfile::tempdir().unwrap();
        let path = artifact.write_to_dir(dir.path()).unwrap();
        assert_eq!(path.parent().unwrap(), dir.path());
        assert!(path.exists());
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("XLSX".parse::<ExportFormat>().unwrap(), ExportFormat::Xlsx);
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert!("ods".parse::<ExportFormat>().is_err());
    }
}
