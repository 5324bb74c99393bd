//! Ingestion adapters: spreadsheet and delimited-text files to a [`SourceSet`].
//!
//! Workbooks contribute one source per sheet, delimited files one source
//! named after the file stem. Within a source, the first non-blank row is the
//! header row and every later non-blank row becomes one record keyed by it.

pub mod delimited;
pub mod workbook;

use sheetql_engine::SourceSet;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{Result, SheetqlError};

/// Key given to a blank header cell.
pub const BLANK_HEADER: &str = "__EMPTY";

/// File kinds the loader understands, by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// `.xlsx`, `.xlsm`, `.xlsb`, `.xls`, `.ods`
    Workbook,
    /// `.csv`
    Csv,
    /// `.tsv`, `.tab`
    Tsv,
}

impl SourceKind {
    /// Detect the kind of a file from its extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(SourceKind::Workbook),
            "csv" => Some(SourceKind::Csv),
            "tsv" | "tab" => Some(SourceKind::Tsv),
            _ => None,
        }
    }
}

/// Load one file into a source set.
pub fn load_path(path: impl AsRef<Path>) -> Result<SourceSet> {
    let path = path.as_ref();
    let kind = SourceKind::from_path(path).ok_or_else(|| {
        SheetqlError::Ingest(format!("Unsupported file type: {}", path.display()))
    })?;

    let sources = match kind {
        SourceKind::Workbook => workbook::load_workbook(path)?,
        SourceKind::Csv => delimited::load_delimited(path, b',')?,
        SourceKind::Tsv => delimited::load_delimited(path, b'\t')?,
    };

    info!(
        path = %path.display(),
        sources = sources.len(),
        rows = sources.values().map(Vec::len).sum::<usize>(),
        "Loaded file"
    );
    Ok(sources)
}

/// Load several files into one source set, in argument order.
///
/// A source name seen twice keeps its first position and the later file's
/// records.
pub fn load_paths<P: AsRef<Path>>(paths: &[P]) -> Result<SourceSet> {
    let mut merged = SourceSet::new();
    for path in paths {
        for (name, records) in load_path(path)? {
            if merged.contains_key(&name) {
                warn!(source = %name, path = %path.as_ref().display(), "Duplicate source name, replacing earlier one");
            }
            merged.insert(name, records);
        }
    }
    Ok(merged)
}

/// Turn raw header cells into unique record keys.
///
/// Blank cells become `__EMPTY`, `__EMPTY_1`, ... and repeated labels get a
/// numeric suffix: `Name`, `Name_1`, `Name_2`.
pub(crate) fn unique_headers<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut headers: Vec<String> = Vec::new();
    for cell in raw {
        let cell = cell.as_ref();
        let base = if cell.trim().is_empty() {
            BLANK_HEADER
        } else {
            cell
        };

        let mut candidate = base.to_string();
        let mut n = 0;
        while headers.contains(&candidate) {
            n += 1;
            candidate = format!("{}_{}", base, n);
        }
        headers.push(candidate);
    }
    headers
}
