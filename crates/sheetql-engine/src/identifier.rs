//! Identifier normalization.
//!
//! Table and column names have two forms: the display name exactly as it
//! appeared at ingestion (grid headers, export headers, sheet titles) and the
//! canonical name used as the storage key and inside generated statements.
//! The canonical form is the lowercase of the display form and nothing else.

use serde::{Deserialize, Serialize};

/// Name of the engine-assigned row identity column present in every table.
pub const ROW_INDEX_COLUMN: &str = "__rowindex__";

/// Canonicalize a table or column name.
///
/// ```
/// use sheetql_engine::identifier::normalize;
///
/// assert_eq!(normalize("Sales Q1"), "sales q1");
/// assert_eq!(normalize("ÄRGER"), "ärger");
/// ```
pub fn normalize(name: &str) -> String {
    name.to_lowercase()
}

/// Quote an identifier for a generated statement.
pub(crate) fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// A display name paired with its canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    /// Original casing.
    pub display: String,
    /// Lowercase storage key.
    pub canonical: String,
}

impl Identifier {
    pub fn new(display: impl Into<String>) -> Self {
        let display = display.into();
        let canonical = normalize(&display);
        Self { display, canonical }
    }

    /// The canonical name quoted for a generated statement.
    pub(crate) fn quoted(&self) -> String {
        quote(&self.canonical)
    }
}

impl From<&str> for Identifier {
    fn from(s: &str) -> Self {
        Identifier::new(s)
    }
}
