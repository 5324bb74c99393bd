//! Query executor.
//!
//! Runs one statement against a [`RelationStore`] and always answers with a
//! [`QueryResult`]; evaluator failures become `success = false` with the
//! diagnostic in `error`, never an `Err` or a panic.
//!
//! Before execution a statement is case folded (identifiers are canonical
//! lowercase) and, if it is a `select` without a `limit`, capped at
//! [`QueryOptions::result_cap`] rows by appending ` limit <cap>`.

use crate::error::{EngineError, Result};
use crate::identifier::ROW_INDEX_COLUMN;
use crate::store::RelationStore;
use crate::value::{is_boolean_type, CellValue, Record};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Row cap appended to uncapped `select` statements.
pub const DEFAULT_RESULT_CAP: usize = 10_000;

/// Column label of the single record returned by statements without a row set.
pub const RESULT_COLUMN: &str = "result";

/// How a statement is lowercased before execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaseFolding {
    /// Lowercase everything except single-quoted literals and comments.
    #[default]
    PreserveLiterals,
    /// Lowercase the whole statement, literals included.
    Full,
}

/// Options for a [`QueryExecutor`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Rows appended as ` limit <cap>` to uncapped selects.
    pub result_cap: usize,
    /// Case folding mode.
    pub case_folding: CaseFolding,
    /// Drop the row index column from result records.
    pub hide_row_index: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            result_cap: DEFAULT_RESULT_CAP,
            case_folding: CaseFolding::default(),
            hide_row_index: true,
        }
    }
}

/// Result of executing one statement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResult {
    /// Whether the evaluator accepted the statement.
    pub success: bool,
    /// Result column labels in order.
    pub columns: Vec<String>,
    /// Result rows keyed by column label.
    pub data: Vec<Record>,
    /// Number of records in `data`.
    pub row_count: usize,
    /// Whether the result cap was appended to the statement.
    pub capped: bool,
    /// Evaluator diagnostic on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock execution time in milliseconds.
    pub execution_ms: u64,
}

impl QueryResult {
    fn failure(error: impl Into<String>, start: Instant) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            execution_ms: start.elapsed().as_millis() as u64,
            ..Default::default()
        }
    }

    /// Successful with zero records.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A statement after case folding and result capping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedStatement {
    /// Text handed to the evaluator.
    pub sql: String,
    /// Whether ` limit <cap>` was appended.
    pub capped: bool,
}

/// Case fold and cap a statement.
///
/// # Errors
///
/// Returns [`EngineError::Validation`] if the statement is empty or only
/// whitespace.
///
/// ```
/// use sheetql_engine::executor::{prepare_statement, QueryOptions};
///
/// let p = prepare_statement("SELECT * FROM Sales;", &QueryOptions::default()).unwrap();
/// assert_eq!(p.sql, "select * from sales limit 10000");
/// assert!(p.capped);
///
/// let p = prepare_statement("select * from sales limit 5", &QueryOptions::default()).unwrap();
/// assert_eq!(p.sql, "select * from sales limit 5");
/// assert!(!p.capped);
/// ```
pub fn prepare_statement(statement: &str, options: &QueryOptions) -> Result<PreparedStatement> {
    if statement.trim().is_empty() {
        return Err(EngineError::validation("empty statement"));
    }

    let folded = match options.case_folding {
        CaseFolding::Full => statement.to_lowercase(),
        CaseFolding::PreserveLiterals => fold_identifiers(statement),
    };
    let trimmed = folded.trim();

    let scan = scan(trimmed);
    if !trimmed.starts_with("select") || has_limit_keyword(&scan.masked) {
        return Ok(PreparedStatement {
            sql: trimmed.to_string(),
            capped: false,
        });
    }

    // Only the first statement runs; comments and anything after its `;` go.
    Ok(PreparedStatement {
        sql: format!("{} limit {}", &trimmed[..scan.code_end], options.result_cap),
        capped: true,
    })
}

fn has_limit_keyword(masked: &str) -> bool {
    masked
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .any(|word| word == "limit")
}

/// Lowercase keywords and identifiers, quoted ones included. String
/// literals and comments are copied unchanged.
fn fold_identifiers(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    for (_, c, region) in Lexer::new(sql) {
        match region {
            Region::Code | Region::Quoted => out.extend(c.to_lowercase()),
            Region::Literal | Region::Comment => out.push(c),
        }
    }
    out
}

/// What part of a statement a character belongs to. Delimiters belong to
/// the region they open or close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    Code,
    Literal,
    Quoted,
    Comment,
}

#[derive(Clone, Copy)]
enum LexState {
    Code,
    Literal,
    /// Inside a quoted identifier, waiting for this closing character.
    Quoted(char),
    LineComment,
    BlockOpen,
    BlockComment,
    BlockClose,
}

/// Classifies every character of a statement by [`Region`].
struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    state: LexState,
}

impl<'a> Lexer<'a> {
    fn new(sql: &'a str) -> Self {
        Self {
            chars: sql.char_indices().peekable(),
            state: LexState::Code,
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = (usize, char, Region);

    fn next(&mut self) -> Option<Self::Item> {
        let (i, c) = self.chars.next()?;
        let peek = self.chars.peek().map(|&(_, p)| p);

        let region = match self.state {
            LexState::Code => match c {
                '\'' => {
                    self.state = LexState::Literal;
                    Region::Literal
                }
                '"' | '`' => {
                    self.state = LexState::Quoted(c);
                    Region::Quoted
                }
                '[' => {
                    self.state = LexState::Quoted(']');
                    Region::Quoted
                }
                '-' if peek == Some('-') => {
                    self.state = LexState::LineComment;
                    Region::Comment
                }
                '/' if peek == Some('*') => {
                    self.state = LexState::BlockOpen;
                    Region::Comment
                }
                _ => Region::Code,
            },
            // `''` closes and reopens, which keeps the pair inside the literal.
            LexState::Literal => {
                if c == '\'' {
                    self.state = LexState::Code;
                }
                Region::Literal
            }
            LexState::Quoted(close) => {
                if c == close {
                    self.state = LexState::Code;
                }
                Region::Quoted
            }
            LexState::LineComment => {
                if c == '\n' {
                    self.state = LexState::Code;
                }
                Region::Comment
            }
            LexState::BlockOpen => {
                self.state = LexState::BlockComment;
                Region::Comment
            }
            LexState::BlockComment => {
                if c == '*' && peek == Some('/') {
                    self.state = LexState::BlockClose;
                }
                Region::Comment
            }
            LexState::BlockClose => {
                self.state = LexState::Code;
                Region::Comment
            }
        };

        Some((i, c, region))
    }
}

struct Scan {
    /// First statement with literal, quoted identifier and comment contents
    /// blanked.
    masked: String,
    /// Byte offset just past the last significant character of the first
    /// statement.
    code_end: usize,
}

/// Scan up to the first statement terminator.
fn scan(sql: &str) -> Scan {
    let mut masked = String::with_capacity(sql.len());
    let mut code_end = 0;

    for (i, c, region) in Lexer::new(sql) {
        if region == Region::Code && c == ';' {
            break;
        }
        if region != Region::Comment && !c.is_whitespace() {
            code_end = i + c.len_utf8();
        }
        masked.push(if region == Region::Code { c } else { ' ' });
    }

    Scan { masked, code_end }
}

/// Executes statements against a borrowed store.
pub struct QueryExecutor<'a> {
    store: &'a RelationStore,
    options: QueryOptions,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(store: &'a RelationStore) -> Self {
        Self::with_options(store, QueryOptions::default())
    }

    pub fn with_options(store: &'a RelationStore, options: QueryOptions) -> Self {
        Self { store, options }
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// Execute one statement.
    ///
    /// Statements that produce a row set return one record per row.
    /// Statements that do not (inserts, updates, DDL) return a single
    /// `{"result": <changed rows>}` record, and the store's catalog is
    /// reconciled afterwards so created and dropped tables are tracked.
    pub fn execute(&self, statement: &str) -> QueryResult {
        let start = Instant::now();

        let prepared = match prepare_statement(statement, &self.options) {
            Ok(p) => p,
            Err(EngineError::Validation(msg)) => {
                debug!("Rejected empty statement");
                return QueryResult::failure(msg, start);
            }
            Err(e) => return QueryResult::failure(e.to_string(), start),
        };
        debug!(sql = %prepared.sql, capped = prepared.capped, "Executing statement");

        match self.run(&prepared.sql) {
            Ok((columns, data)) => {
                let row_count = data.len();
                let execution_ms = start.elapsed().as_millis() as u64;
                info!(rows = row_count, capped = prepared.capped, execution_ms, "Query executed");
                QueryResult {
                    success: true,
                    columns,
                    data,
                    row_count,
                    capped: prepared.capped,
                    error: None,
                    execution_ms,
                }
            }
            Err(e) => {
                warn!(error = %e, "Query failed");
                let mut result = QueryResult::failure(e.to_string(), start);
                result.capped = prepared.capped;
                result
            }
        }
    }

    fn run(&self, sql: &str) -> Result<(Vec<String>, Vec<Record>)> {
        let mut state = self.store.lock();

        let (columns, data, changed_catalog) = {
            let mut stmt = state
                .conn
                .prepare(sql)
                .map_err(|e| EngineError::evaluation(sql, e.to_string()))?;

            if stmt.column_count() == 0 {
                let changes = stmt
                    .execute([])
                    .map_err(|e| EngineError::evaluation(sql, e.to_string()))?;
                let mut record = Record::with_capacity(1);
                record.insert(RESULT_COLUMN.to_string(), CellValue::from(changes as i64));
                (vec![RESULT_COLUMN.to_string()], vec![record], true)
            } else {
                let (columns, data) = self.collect_rows(&mut stmt, sql)?;
                (columns, data, false)
            }
        };

        if changed_catalog {
            state.reconcile_catalog();
        }
        Ok((columns, data))
    }

    fn collect_rows(
        &self,
        stmt: &mut rusqlite::Statement<'_>,
        sql: &str,
    ) -> Result<(Vec<String>, Vec<Record>)> {
        // (position, label, declared boolean) of every column kept in the result.
        let visible: Vec<(usize, String, bool)> = stmt
            .columns()
            .iter()
            .enumerate()
            .filter(|(_, c)| {
                !(self.options.hide_row_index && c.name().eq_ignore_ascii_case(ROW_INDEX_COLUMN))
            })
            .map(|(i, c)| (i, c.name().to_string(), is_boolean_type(c.decl_type())))
            .collect();

        let rows = stmt
            .query_map([], |row| {
                let mut record = Record::with_capacity(visible.len());
                for (i, name, boolean) in &visible {
                    record.insert(name.clone(), CellValue::from_stored(row.get_ref(*i)?, *boolean));
                }
                Ok(record)
            })
            .map_err(|e| EngineError::evaluation(sql, e.to_string()))?;

        let data = rows
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| EngineError::evaluation(sql, e.to_string()))?;
        let columns = visible.into_iter().map(|(_, name, _)| name).collect();
        Ok((columns, data))
    }
}
