//! Context for natural-language query generation.
//!
//! SheetQL does not generate SQL itself. It builds the payload an external
//! text-to-SQL service needs (the target table, its columns and annotations,
//! and a few sample rows) and vets the statement that comes back.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sheetql_engine::{Record, TableInfo};

use crate::error::{Result, SheetqlError};

/// Sample rows included in the rendered prompt text.
pub const RENDERED_SAMPLE_ROWS: usize = 5;

const ACCEPTED_STATEMENT_PREFIXES: &[&str] = &["select", "insert", "update", "delete"];

/// Request payload for a text-to-SQL service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPromptContext {
    /// The user's request in natural language.
    pub prompt: String,
    /// Display name of the target table.
    pub table_name: String,
    /// Display names of its columns.
    pub columns: Vec<String>,
    #[serde(default)]
    pub table_description: String,
    /// Column display name to annotation.
    #[serde(default)]
    pub column_descriptions: IndexMap<String, String>,
    /// Leading rows of the table.
    #[serde(default)]
    pub sample_data: Vec<Record>,
}

impl QueryPromptContext {
    /// Build a context for `table` with up to `sample_rows` rows of `records`.
    pub fn new(
        prompt: impl Into<String>,
        table: &TableInfo,
        records: &[Record],
        sample_rows: usize,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            table_name: table.display_name.clone(),
            columns: table.columns.iter().map(|c| c.display_name.clone()).collect(),
            table_description: String::new(),
            column_descriptions: IndexMap::new(),
            sample_data: records.iter().take(sample_rows).cloned().collect(),
        }
    }

    pub fn with_table_description(mut self, description: impl Into<String>) -> Self {
        self.table_description = description.into();
        self
    }

    pub fn with_column_descriptions(mut self, descriptions: IndexMap<String, String>) -> Self {
        self.column_descriptions = descriptions;
        self
    }

    /// Check the fields a service requires.
    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(SheetqlError::Validation("prompt is required".to_string()));
        }
        if self.table_name.is_empty() {
            return Err(SheetqlError::Validation("tableName is required".to_string()));
        }
        if self.columns.is_empty() {
            return Err(SheetqlError::Validation("columns are required".to_string()));
        }
        Ok(())
    }

    /// Render the prompt text sent to a language model.
    pub fn render(&self) -> Result<String> {
        let samples: Vec<&Record> = self.sample_data.iter().take(RENDERED_SAMPLE_ROWS).collect();
        let sample_json = serde_json::to_string_pretty(&samples)?;

        let mut out = String::new();
        out.push_str("Translate the request below into a single SQL statement.\n\n");
        out.push_str("### Table\n");
        out.push_str(&format!("Name: {}\n", self.table_name));
        out.push_str(&format!("Description: {}\n\n", self.table_description));
        out.push_str("### Columns\n");
        for column in &self.columns {
            let description = self
                .column_descriptions
                .get(column)
                .map(String::as_str)
                .unwrap_or("");
            out.push_str(&format!("- [{}]: {}\n", column, description));
        }
        out.push_str("\n### Sample rows\n");
        out.push_str(&format!("{}\n\n", sample_json));
        out.push_str("### Request\n");
        out.push_str(&format!("{}\n\n", self.prompt));
        out.push_str("Rules:\n");
        out.push_str(
            "1. Wrap every table and column name in square brackets, e.g. SELECT [col] FROM [table].\n",
        );
        out.push_str("2. Use plain ANSI SQL.\n");
        out.push_str("3. Answer with the statement only: no code fences, no explanation.\n");
        out.push_str("4. Table and column names are case-insensitive.\n");
        Ok(out)
    }
}

/// Strip formatting a model tends to add around a statement and accept it
/// only if it is a select, insert, update or delete.
///
/// ```
/// use sheetql::prompt::clean_generated_statement;
///
/// let sql = clean_generated_statement("```sql\nSELECT [a] FROM [t]\n```").unwrap();
/// assert_eq!(sql, "SELECT [a] FROM [t]");
/// assert!(clean_generated_statement("Sure! Here you go").is_err());
/// ```
pub fn clean_generated_statement(raw: &str) -> Result<String> {
    let unfenced = raw.replace("```", "");
    let mut body = unfenced.trim_start();
    if let (Some(tag), Some(rest)) = (body.get(..3), body.get(3..)) {
        if tag.eq_ignore_ascii_case("sql") && rest.starts_with(char::is_whitespace) {
            body = rest;
        }
    }
    let statement = body.trim().to_string();

    let lower = statement.to_lowercase();
    if ACCEPTED_STATEMENT_PREFIXES
        .iter()
        .any(|prefix| lower.starts_with(prefix))
    {
        Ok(statement)
    } else {
        Err(SheetqlError::Validation(format!(
            "Generated text is not a SQL statement: {}",
            statement
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetql_engine::{record, CellValue, ColumnDef};

    fn table() -> TableInfo {
        TableInfo {
            display_name: "Sales".to_string(),
            canonical_name: "sales".to_string(),
            columns: vec![ColumnDef::new("Region"), ColumnDef::new("Amount")],
            row_count: 8,
        }
    }

    fn rows(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| record([("Region", CellValue::from("Seoul")), ("Amount", (i as f64).into())]))
            .collect()
    }

    #[test]
    fn test_context_takes_sample_rows() {
        let ctx = QueryPromptContext::new("total by region", &table(), &rows(8), 3);
        assert_eq!(ctx.columns, ["Region", "Amount"]);
        assert_eq!(ctx.sample_data.len(), 3);
        assert!(ctx.validate().is_ok());
    }

    #[test]
    fn test_serializes_camel_case() {
        let ctx = QueryPromptContext::new("q", &table(), &[], 10);
        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json["tableName"], "Sales");
        assert!(json.get("columnDescriptions").is_some());
        assert!(json.get("sampleData").is_some());
    }

    #[test]
    fn test_render_limits_samples_and_brackets_columns() {
        let mut descriptions = IndexMap::new();
        descriptions.insert("Amount".to_string(), "KRW".to_string());
        let text = QueryPromptContext::new("sum", &table(), &rows(8), 10)
            .with_table_description("monthly")
            .with_column_descriptions(descriptions)
            .render()
            .unwrap();

        assert!(text.contains("- [Region]: \n"));
        assert!(text.contains("- [Amount]: KRW"));
        assert!(text.contains("Description: monthly"));
        assert_eq!(text.matches("\"Region\"").count(), RENDERED_SAMPLE_ROWS);
    }

    #[test]
    fn test_validate_requires_prompt() {
        let ctx = QueryPromptContext::new("  ", &table(), &[], 1);
        assert!(matches!(ctx.validate(), Err(SheetqlError::Validation(_))));
    }

    #[test]
    fn test_clean_generated_statement() {
        assert_eq!(
            clean_generated_statement("sql\nupdate [t] set [a] = 1").unwrap(),
            "update [t] set [a] = 1"
        );
        assert_eq!(
            clean_generated_statement("  DELETE FROM [t]  ").unwrap(),
            "DELETE FROM [t]"
        );
        // Only a standalone tag is stripped.
        assert!(clean_generated_statement("sqlite_version()").is_err());
        assert!(clean_generated_statement("drop table t").is_err());
    }
}
