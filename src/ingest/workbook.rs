//! Workbook ingestion through calamine.
//!
//! Every sheet becomes a source under its sheet name, including sheets with
//! no data rows; the relation store decides what to do with those.

use calamine::{open_workbook_auto, Data, Range, Reader};
use sheetql_engine::{CellValue, Record, SourceSet};
use std::path::Path;
use tracing::{debug, warn};

use super::unique_headers;
use crate::error::{Result, SheetqlError};

/// Load every sheet of a workbook.
pub fn load_workbook(path: &Path) -> Result<SourceSet> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet_names = workbook.sheet_names();
    if sheet_names.is_empty() {
        return Err(SheetqlError::Ingest(format!(
            "Workbook {} has no sheets",
            path.display()
        )));
    }

    let mut sources = SourceSet::new();
    for name in sheet_names {
        let range = workbook.worksheet_range(&name)?;
        let records = records_from_range(&range);
        if records.is_empty() {
            warn!(sheet = %name, "Sheet has no data rows");
        } else {
            debug!(sheet = %name, rows = records.len(), "Read sheet");
        }
        sources.insert(name, records);
    }
    Ok(sources)
}

/// Convert a sheet range into records keyed by its header row.
pub fn records_from_range(range: &Range<Data>) -> Vec<Record> {
    let mut rows = range.rows().filter(|row| !is_blank_row(row));

    let Some(header_row) = rows.next() else {
        return Vec::new();
    };
    let headers = unique_headers(header_row.iter().map(header_text));

    rows.map(|row| {
        headers
            .iter()
            .enumerate()
            .map(|(i, key)| (key.clone(), row.get(i).map(cell_value).unwrap_or(CellValue::Null)))
            .collect()
    })
    .collect()
}

fn is_blank_row(row: &[Data]) -> bool {
    row.iter().all(|cell| match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    })
}

fn header_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

/// Map a sheet cell to a cell value. Dates become their serial number.
pub fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Null,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(e.to_string()),
    }
}
