//! Cell values, records and source sets.
//!
//! Source records arrive loosely typed from spreadsheet and delimited-text
//! parsers. Every cell is carried as a [`CellValue`], a closed set of the
//! scalar shapes a sheet can hold, and every record keeps its field order.

use base64::Engine;
use indexmap::IndexMap;
use rusqlite::types::ValueRef;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One record: field label to value, in order of appearance.
pub type Record = IndexMap<String, CellValue>;

/// Source display name to the records of that source, in load order.
pub type SourceSet = IndexMap<String, Vec<Record>>;

/// Declared type of columns holding only booleans. The evaluator stores
/// booleans as integers; the declared type is how they are read back.
pub const BOOLEAN_TYPE: &str = "BOOLEAN";

pub(crate) fn is_boolean_type(decl_type: Option<&str>) -> bool {
    decl_type.is_some_and(|t| t.eq_ignore_ascii_case(BOOLEAN_TYPE))
}

/// A single scalar cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Empty or absent cell.
    Null,
    /// Boolean cell.
    Bool(bool),
    /// Numeric cell. Spreadsheet numbers are IEEE doubles.
    Number(f64),
    /// Text cell.
    Text(String),
}

impl CellValue {
    /// Render the value as a SQL literal.
    ///
    /// Text is single-quoted with embedded quotes doubled, `Null` becomes
    /// `NULL`, and other scalars use their native literal form. Non-finite
    /// numbers render as `NaN`/`inf`, which the evaluator rejects.
    ///
    /// ```
    /// use sheetql_engine::CellValue;
    ///
    /// assert_eq!(CellValue::from("O'Brien").sql_literal(), "'O''Brien'");
    /// assert_eq!(CellValue::Null.sql_literal(), "NULL");
    /// assert_eq!(CellValue::Number(42.0).sql_literal(), "42");
    /// ```
    pub fn sql_literal(&self) -> String {
        match self {
            CellValue::Null => "NULL".to_string(),
            CellValue::Bool(true) => "TRUE".to_string(),
            CellValue::Bool(false) => "FALSE".to_string(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
        }
    }

    /// Returns `true` for [`CellValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Parse a raw text field the way spreadsheet tools type delimited text:
    /// empty is null, `TRUE`/`FALSE` are booleans, numerals are numbers,
    /// anything else stays text.
    pub fn infer_from_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return CellValue::Null;
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return CellValue::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return CellValue::Bool(false);
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() && looks_numeric(trimmed) => CellValue::Number(n),
            _ => CellValue::Text(raw.to_string()),
        }
    }

    /// Convert a stored value. Integer 0 and 1 read from a boolean column
    /// come back as [`CellValue::Bool`].
    pub fn from_stored(value: ValueRef<'_>, boolean_column: bool) -> Self {
        match value {
            ValueRef::Integer(0) if boolean_column => CellValue::Bool(false),
            ValueRef::Integer(1) if boolean_column => CellValue::Bool(true),
            other => CellValue::from(other),
        }
    }
}

// `f64::from_str` accepts "inf", "NaN" and "infinity"; sheets treat those as text.
fn looks_numeric(s: &str) -> bool {
    s.bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'))
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(CellValue::Null)
    }
}

impl From<ValueRef<'_>> for CellValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => CellValue::Null,
            ValueRef::Integer(i) => CellValue::Number(i as f64),
            ValueRef::Real(f) => CellValue::Number(f),
            ValueRef::Text(s) => CellValue::Text(String::from_utf8_lossy(s).into_owned()),
            ValueRef::Blob(b) => {
                CellValue::Text(base64::engine::general_purpose::STANDARD.encode(b))
            }
        }
    }
}

/// Build a [`Record`] from `(label, value)` pairs.
///
/// ```
/// use sheetql_engine::value::record;
///
/// let r = record([("City", "Seoul".into()), ("Population", 9.7.into())]);
/// assert_eq!(r.keys().collect::<Vec<_>>(), ["City", "Population"]);
/// ```
pub fn record<K, I>(fields: I) -> Record
where
    K: Into<String>,
    I: IntoIterator<Item = (K, CellValue)>,
{
    fields.into_iter().map(|(k, v)| (k.into(), v)).collect()
}
