//! Session facade: one loaded workbook, its engine, and what the user did
//! with it.
//!
//! A [`Session`] owns the [`RelationStore`] together with a display copy of
//! the loaded sources. Cell edits go to both, so exporting a sheet after an
//! edit yields the edited values in their original column labels.

use chrono::Utc;
use indexmap::IndexMap;
use sheetql_engine::{
    export_as, normalize, CellValue, ExportArtifact, MutationGateway, QueryExecutor, QueryResult,
    Record, RelationStore, ResetReport, SourceSet, TableInfo,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::{Result, SheetqlError};
use crate::history::{HistoryEntry, QueryHistory};
use crate::ingest;
use crate::prompt::{clean_generated_statement, QueryPromptContext};

/// Label used when exporting a query result.
pub const QUERY_RESULT_LABEL: &str = "query_result";

/// Notice attached to successful results with no rows.
pub const EMPTY_RESULT_NOTICE: &str = "Query returned no rows";

/// What to export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportTarget {
    /// A loaded sheet, including edits made through the session.
    Sheet(String),
    /// The last successful, non-empty query result.
    LastResult,
}

/// A query result plus a user-facing remark.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub result: QueryResult,
    /// Soft message for results that succeeded but are worth a remark.
    pub notice: Option<String>,
}

/// A loaded workbook and the engine holding it.
pub struct Session {
    store: RelationStore,
    config: SessionConfig,
    sources: SourceSet,
    active_sheet: Option<String>,
    last_result: Option<QueryResult>,
    history: QueryHistory,
    table_descriptions: IndexMap<String, String>,
    column_descriptions: IndexMap<String, IndexMap<String, String>>,
}

impl Session {
    /// Create an empty session.
    pub fn new(config: SessionConfig) -> Result<Self> {
        let store = RelationStore::with_options(config.store_options())?;
        Ok(Self {
            store,
            history: QueryHistory::new(config.history_capacity),
            config,
            sources: SourceSet::new(),
            active_sheet: None,
            last_result: None,
            table_descriptions: IndexMap::new(),
            column_descriptions: IndexMap::new(),
        })
    }

    /// Replace everything loaded so far with `sources`.
    ///
    /// # Errors
    ///
    /// [`SheetqlError::Validation`] if there are no sources or every source
    /// is empty; the previous load stays in place in that case. Also
    /// [`SheetqlError::Validation`] if no source could become a table; the
    /// session is then left empty.
    pub fn load(&mut self, sources: SourceSet) -> Result<ResetReport> {
        if sources.is_empty() {
            return Err(SheetqlError::Validation("no sheets".to_string()));
        }
        if sources.values().all(Vec::is_empty) {
            return Err(SheetqlError::Validation("no data".to_string()));
        }

        let report = self.store.reset(&sources)?;
        self.last_result = None;
        self.table_descriptions.clear();
        self.column_descriptions.clear();

        if !report.success {
            self.sources = SourceSet::new();
            self.active_sheet = None;
            let reasons: Vec<String> = report
                .skipped
                .iter()
                .map(|s| format!("{}: {}", s.source, s.reason))
                .collect();
            warn!(skipped = report.skipped.len(), "No table could be created");
            return Err(SheetqlError::Validation(format!(
                "no table could be created ({})",
                reasons.join("; ")
            )));
        }

        self.active_sheet = sources
            .iter()
            .find(|(_, records)| !records.is_empty())
            .map(|(name, _)| name.clone());
        self.sources = sources;

        info!(
            sheets = self.sources.len(),
            tables = report.tables.len(),
            active = ?self.active_sheet,
            "Session loaded"
        );
        Ok(report)
    }

    /// Load files through the ingestion adapters.
    pub fn load_files<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<ResetReport> {
        let sources = ingest::load_paths(paths)?;
        self.load(sources)
    }

    /// Run a statement and record it in the history.
    pub fn execute(&mut self, sql: &str) -> QueryOutcome {
        self.execute_with_prompt(sql, None)
    }

    /// Run a statement generated from a natural-language `prompt`.
    ///
    /// With a prompt, `sql` is model output: it is cleaned with
    /// [`clean_generated_statement`] first, and text that is not a statement
    /// fails without reaching the engine.
    pub fn execute_with_prompt(&mut self, sql: &str, prompt: Option<&str>) -> QueryOutcome {
        let (statement, result) = match prompt {
            Some(_) => match clean_generated_statement(sql) {
                Ok(statement) => {
                    let result = self.run(&statement);
                    (statement, result)
                }
                Err(e) => {
                    warn!(error = %e, "Rejected generated statement");
                    let result = QueryResult {
                        success: false,
                        error: Some(e.to_string()),
                        ..QueryResult::default()
                    };
                    (sql.trim().to_string(), result)
                }
            },
            None => (sql.trim().to_string(), self.run(sql)),
        };

        if !statement.is_empty() {
            self.history.push(HistoryEntry {
                prompt: prompt.map(str::to_string),
                statement,
                success: result.success,
                row_count: result.row_count,
                executed_at: Utc::now(),
            });
        }

        let notice = if result.success && result.is_empty() {
            Some(EMPTY_RESULT_NOTICE.to_string())
        } else {
            None
        };
        if result.success {
            self.last_result = Some(result.clone());
        }

        QueryOutcome { result, notice }
    }

    fn run(&self, sql: &str) -> QueryResult {
        QueryExecutor::with_options(&self.store, self.config.query_options()).execute(sql)
    }

    /// Edit one cell in the engine and in the display copy.
    pub fn set_cell(
        &mut self,
        table: &str,
        row_index: usize,
        column: &str,
        value: CellValue,
    ) -> Result<()> {
        MutationGateway::new(&self.store).set_cell(table, row_index, column, &value)?;

        let Some(info) = self.store.table(table) else {
            return Ok(());
        };
        let Some(column_def) = info.column(column) else {
            return Ok(());
        };
        let label = column_def.display_name.clone();

        match self
            .sources
            .get_mut(&info.display_name)
            .and_then(|records| records.get_mut(row_index))
        {
            Some(record) => {
                record.insert(label, value);
            }
            None => {
                // Rows added by statements have no display copy.
                debug!(table = %info.canonical_name, row_index, "Edit not mirrored");
            }
        }
        Ok(())
    }

    /// Encode an export of `target` in the configured format.
    pub fn export(&self, target: &ExportTarget) -> Result<ExportArtifact> {
        let (records, label) = match target {
            ExportTarget::Sheet(name) => {
                let (label, records) = self.source(name).ok_or_else(|| {
                    SheetqlError::Validation(format!("Unknown sheet '{}'", name))
                })?;
                (records.as_slice(), label.to_string())
            }
            ExportTarget::LastResult => {
                let data = self
                    .last_result
                    .as_ref()
                    .filter(|r| r.success && !r.is_empty())
                    .map(|r| r.data.as_slice())
                    .unwrap_or_default();
                (data, QUERY_RESULT_LABEL.to_string())
            }
        };

        Ok(export_as(records, &label, self.config.export_format)?)
    }

    /// Export `target` into the configured output directory.
    pub fn export_to_dir(&self, target: &ExportTarget) -> Result<PathBuf> {
        let artifact = self.export(target)?;
        Ok(artifact.write_to_dir(&self.config.output_dir)?)
    }

    /// Make `name` the active sheet.
    pub fn select_sheet(&mut self, name: &str) -> Result<()> {
        let (label, _) = self
            .source(name)
            .ok_or_else(|| SheetqlError::Validation(format!("Unknown sheet '{}'", name)))?;
        self.active_sheet = Some(label.to_string());
        Ok(())
    }

    /// Loaded sheet names in load order.
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sources.keys().map(String::as_str).collect()
    }

    pub fn active_sheet(&self) -> Option<&str> {
        self.active_sheet.as_deref()
    }

    /// Display column names of a live table.
    pub fn columns_of(&self, table: &str) -> Option<Vec<String>> {
        self.store
            .table(table)
            .map(|t| t.columns.into_iter().map(|c| c.display_name).collect())
    }

    /// Records of a loaded sheet, edits included.
    pub fn sheet(&self, name: &str) -> Option<&[Record]> {
        self.source(name).map(|(_, records)| records.as_slice())
    }

    pub fn tables(&self) -> Vec<TableInfo> {
        self.store.tables()
    }

    pub fn store(&self) -> &RelationStore {
        &self.store
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn history(&self) -> &QueryHistory {
        &self.history
    }

    pub fn last_result(&self) -> Option<&QueryResult> {
        self.last_result.as_ref()
    }

    /// Annotate a table for prompt contexts.
    pub fn set_table_description(&mut self, table: &str, description: impl Into<String>) {
        self.table_descriptions
            .insert(normalize(table), description.into());
    }

    /// Annotate a column for prompt contexts.
    pub fn set_column_description(
        &mut self,
        table: &str,
        column: &str,
        description: impl Into<String>,
    ) {
        self.column_descriptions
            .entry(normalize(table))
            .or_default()
            .insert(column.to_string(), description.into());
    }

    /// Build the context for a natural-language request against the active
    /// sheet.
    pub fn prompt_context(&self, prompt: &str) -> Result<QueryPromptContext> {
        let sheet = self
            .active_sheet
            .as_deref()
            .ok_or_else(|| SheetqlError::Validation("no active sheet".to_string()))?;
        let table = self.store.table(sheet).ok_or_else(|| {
            SheetqlError::Validation(format!("Sheet '{}' has no table", sheet))
        })?;
        let records = self.sheet(sheet).unwrap_or_default();
        let key = normalize(sheet);

        let context = QueryPromptContext::new(prompt, &table, records, self.config.sample_rows)
            .with_table_description(self.table_descriptions.get(&key).cloned().unwrap_or_default())
            .with_column_descriptions(self.column_descriptions.get(&key).cloned().unwrap_or_default());
        context.validate()?;
        Ok(context)
    }

    /// Look up a source by exact name, then by canonical name.
    fn source(&self, name: &str) -> Option<(&str, &Vec<Record>)> {
        if let Some((key, records)) = self.sources.get_key_value(name) {
            return Some((key.as_str(), records));
        }
        let canonical = normalize(name);
        let mut matches = self
            .sources
            .iter()
            .filter(|(key, _)| normalize(key) == canonical);
        let found = matches.next_back();
        if found.is_some() && matches.next().is_some() {
            warn!(sheet = %name, "Several sheets match, using the last one");
        }
        found.map(|(key, records)| (key.as_str(), records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetql_engine::{record, ExportFormat};

    fn sources() -> SourceSet {
        let mut sources = SourceSet::new();
        sources.insert(
            "Orders".to_string(),
            vec![
                record([("Item", CellValue::from("pen")), ("Qty", CellValue::from(2.0))]),
                record([("Item", CellValue::from("ink")), ("Qty", CellValue::from(5.0))]),
            ],
        );
        sources.insert("Notes".to_string(), vec![]);
        sources
    }

    fn session() -> Session {
        let mut session = Session::new(SessionConfig::default()).unwrap();
        session.load(sources()).unwrap();
        session
    }

    #[test]
    fn test_load_rejects_empty_inputs() {
        let mut session = Session::new(SessionConfig::default()).unwrap();
        let err = session.load(SourceSet::new()).unwrap_err();
        assert_eq!(err.to_string(), "Validation error: no sheets");

        let mut empty = SourceSet::new();
        empty.insert("A".to_string(), vec![]);
        let err = session.load(empty).unwrap_err();
        assert_eq!(err.to_string(), "Validation error: no data");
    }

    #[test]
    fn test_load_with_no_buildable_table_fails() {
        let mut session = session();
        let mut unusable = SourceSet::new();
        unusable.insert(
            "Ids".to_string(),
            vec![record([("__RowIndex__", CellValue::from(1.0))])],
        );

        let err = session.load(unusable).unwrap_err();
        assert!(matches!(err, SheetqlError::Validation(ref m) if m.starts_with("no table")));
        assert!(session.tables().is_empty());
        assert!(session.sheet_names().is_empty());
        assert_eq!(session.active_sheet(), None);
    }

    #[test]
    fn test_generated_statement_is_cleaned_before_running() {
        let mut session = session();
        let outcome = session.execute_with_prompt(
            "```sql\nSELECT [Item] FROM [Orders] WHERE [Qty] > 3\n```",
            Some("orders over three"),
        );
        assert!(outcome.result.success, "{:?}", outcome.result.error);
        assert_eq!(outcome.result.data[0]["item"], CellValue::from("ink"));
        assert_eq!(
            session.history().entries().last().unwrap().statement,
            "SELECT [Item] FROM [Orders] WHERE [Qty] > 3"
        );

        let outcome = session.execute_with_prompt("Sorry, I can't help.", Some("???"));
        assert!(!outcome.result.success);
        assert!(!session.history().entries().last().unwrap().success);
    }

    #[test]
    fn test_load_activates_first_sheet_with_data() {
        let mut all = SourceSet::new();
        all.insert("Blank".to_string(), vec![]);
        all.extend(sources());
        let mut session = Session::new(SessionConfig::default()).unwrap();
        session.load(all).unwrap();
        assert_eq!(session.active_sheet(), Some("Orders"));
        assert_eq!(session.sheet_names(), ["Blank", "Orders", "Notes"]);
    }

    #[test]
    fn test_execute_records_history_and_notice() {
        let mut session = session();
        let outcome = session.execute("select * from orders where qty > 100");
        assert!(outcome.result.success);
        assert_eq!(outcome.notice.as_deref(), Some(EMPTY_RESULT_NOTICE));

        let outcome = session.execute("select * from nowhere");
        assert!(!outcome.result.success);
        assert!(outcome.notice.is_none());

        assert_eq!(session.history().len(), 2);
        assert!(!session.history().entries().last().unwrap().success);
        // Failed statements do not replace the last result.
        assert!(session.last_result().unwrap().success);
    }

    #[test]
    fn test_set_cell_mirrors_display_copy() {
        let mut session = session();
        session
            .set_cell("ORDERS", 1, "qty", CellValue::from(9.0))
            .unwrap();

        assert_eq!(session.sheet("Orders").unwrap()[1]["Qty"], CellValue::Number(9.0));
        let outcome = session.execute("select qty from orders where item = 'ink'");
        assert_eq!(outcome.result.data[0]["qty"], CellValue::Number(9.0));
    }

    #[test]
    fn test_set_cell_failure_leaves_copy_untouched() {
        let mut session = session();
        assert!(session.set_cell("orders", 7, "Qty", CellValue::from(1.0)).is_err());
        assert_eq!(session.sheet("orders").unwrap()[0]["Qty"], CellValue::Number(2.0));
    }

    #[test]
    fn test_export_targets() {
        let mut session = session();
        assert!(session.export(&ExportTarget::LastResult).is_err());

        let sheet = session.export(&ExportTarget::Sheet("orders".into())).unwrap();
        assert_eq!(sheet.file_name, "Orders.xlsx");

        session.execute("select item from orders");
        let result = session.export(&ExportTarget::LastResult).unwrap();
        assert_eq!(result.file_name, "query_result.xlsx");

        assert!(session.export(&ExportTarget::Sheet("Notes".into())).is_err());
        assert!(session.export(&ExportTarget::Sheet("Missing".into())).is_err());
    }

    #[test]
    fn test_export_uses_configured_format() {
        let config = SessionConfig {
            export_format: ExportFormat::Csv,
            ..SessionConfig::default()
        };
        let mut session = Session::new(config).unwrap();
        session.load(sources()).unwrap();
        let artifact = session.export(&ExportTarget::Sheet("Orders".into())).unwrap();
        assert_eq!(artifact.file_name, "Orders.csv");
        assert!(String::from_utf8(artifact.bytes).unwrap().starts_with("Item,Qty\n"));
    }

    #[test]
    fn test_select_sheet_and_columns() {
        let mut session = session();
        assert!(session.select_sheet("NOTES").is_ok());
        assert_eq!(session.active_sheet(), Some("Notes"));
        assert!(session.select_sheet("nope").is_err());
        assert_eq!(session.columns_of("orders").unwrap(), ["Item", "Qty"]);
        assert!(session.columns_of("notes").is_none());
    }

    #[test]
    fn test_prompt_context_uses_annotations() {
        let mut session = session();
        session.set_table_description("Orders", "stationery orders");
        session.set_column_description("orders", "Qty", "units");
        let ctx = session.prompt_context("how many pens").unwrap();
        assert_eq!(ctx.table_name, "Orders");
        assert_eq!(ctx.table_description, "stationery orders");
        assert_eq!(ctx.column_descriptions["Qty"], "units");
        assert_eq!(ctx.sample_data.len(), 2);
    }
}
