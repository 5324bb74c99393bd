//! Delimited text (CSV/TSV) ingestion.
//!
//! Fields are typed the way spreadsheet tools open text files: empty is
//! null, `TRUE`/`FALSE` are booleans, numerals are numbers, anything else is
//! text. Short rows fill the missing trailing fields with null.

use sheetql_engine::{CellValue, Record, SourceSet};
use std::io::Read;
use std::path::Path;
use tracing::debug;

use super::unique_headers;
use crate::error::{Result, SheetqlError};

/// Load a delimited file as a single source named after the file stem.
pub fn load_delimited(path: &Path, delimiter: u8) -> Result<SourceSet> {
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| SheetqlError::Ingest(format!("Invalid file name: {}", path.display())))?
        .to_string();

    let file = std::fs::File::open(path)?;
    let records = read_records(file, delimiter)?;

    let mut sources = SourceSet::new();
    sources.insert(name, records);
    Ok(sources)
}

/// Parse delimited text into records.
pub fn read_records<R: Read>(reader: R, delimiter: u8) -> Result<Vec<Record>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut headers: Option<Vec<String>> = None;
    let mut records = Vec::new();

    for row in csv_reader.records() {
        let row = row?;
        if row.iter().all(|field| field.trim().is_empty()) {
            continue;
        }

        let Some(keys) = headers.as_ref() else {
            headers = Some(unique_headers(row.iter()));
            continue;
        };

        let record: Record = keys
            .iter()
            .enumerate()
            .map(|(i, key)| {
                let value = row
                    .get(i)
                    .map(CellValue::infer_from_text)
                    .unwrap_or(CellValue::Null);
                (key.clone(), value)
            })
            .collect();
        records.push(record);
    }

    debug!(rows = records.len(), "Parsed delimited text");
    Ok(records)
}
