use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};
use sheetql::{QueryResult, TableInfo};
use sheetql_engine::CellValue;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
    Tsv,
}

impl OutputFormat {
    /// Returns the delimiter for CSV/TSV formats
    pub(crate) fn delimiter(&self) -> Option<&'static str> {
        match self {
            Self::Csv => Some(","),
            Self::Tsv => Some("\t"),
            _ => None,
        }
    }
}

/// Escape a field for CSV output (handles commas, quotes, newlines)
pub(crate) fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Escape a field for TSV output (replaces tabs and newlines)
pub(crate) fn tsv_escape(field: &str) -> String {
    field
        .replace('\t', "\\t")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

/// Format fields as a delimited row (CSV or TSV)
pub(crate) fn format_delimited_row(format: OutputFormat, fields: &[&str]) -> String {
    let escaped: Vec<String> = match format {
        OutputFormat::Csv => fields.iter().map(|f| csv_escape(f)).collect(),
        OutputFormat::Tsv => fields.iter().map(|f| tsv_escape(f)).collect(),
        _ => fields.iter().map(|s| s.to_string()).collect(),
    };
    let delimiter = format.delimiter().unwrap_or(",");
    escaped.join(delimiter)
}

fn cell(value: &CellValue) -> Cell {
    match value {
        CellValue::Null => Cell::new("NULL").fg(Color::DarkGrey),
        CellValue::Number(_) => Cell::new(value.to_string()).fg(Color::Yellow),
        _ => Cell::new(value.to_string()),
    }
}

/// Render a query result in the given format.
pub(crate) fn format_result(result: &QueryResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(result).unwrap_or_default(),
        OutputFormat::Csv | OutputFormat::Tsv => {
            let mut lines = Vec::with_capacity(result.data.len() + 1);
            let header: Vec<&str> = result.columns.iter().map(String::as_str).collect();
            lines.push(format_delimited_row(format, &header));
            for record in &result.data {
                let values: Vec<String> = result
                    .columns
                    .iter()
                    .map(|c| record.get(c).map(|v| v.to_string()).unwrap_or_default())
                    .collect();
                let fields: Vec<&str> = values.iter().map(String::as_str).collect();
                lines.push(format_delimited_row(format, &fields));
            }
            lines.join("\n")
        }
        OutputFormat::Text => {
            if !result.success {
                return format!(
                    "{} {}",
                    "✗".red(),
                    result.error.as_deref().unwrap_or("query failed")
                );
            }

            let mut table = Table::new();
            table.load_preset(UTF8_FULL_CONDENSED);
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(
                result
                    .columns
                    .iter()
                    .map(|c| Cell::new(c).fg(Color::Cyan))
                    .collect::<Vec<_>>(),
            );
            for record in &result.data {
                table.add_row(
                    result
                        .columns
                        .iter()
                        .map(|c| record.get(c).map(cell).unwrap_or_else(|| Cell::new("")))
                        .collect::<Vec<_>>(),
                );
            }

            let footer = format!(
                "{} row{}{} in {} ms",
                result.row_count,
                if result.row_count == 1 { "" } else { "s" },
                if result.capped { " (capped)" } else { "" },
                result.execution_ms
            );
            format!("{}\n{}", table, footer.dimmed())
        }
    }
}

/// Render the live tables in the given format.
pub(crate) fn format_tables(tables: &[TableInfo], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(tables).unwrap_or_default(),
        OutputFormat::Csv | OutputFormat::Tsv => {
            let mut lines = vec![format_delimited_row(format, &["table", "columns", "rows"])];
            for t in tables {
                let columns: Vec<&str> = t.columns.iter().map(|c| c.display_name.as_str()).collect();
                let rows = t.row_count.to_string();
                lines.push(format_delimited_row(
                    format,
                    &[&t.canonical_name, &columns.join(" "), &rows],
                ));
            }
            lines.join("\n")
        }
        OutputFormat::Text => {
            if tables.is_empty() {
                return "No tables loaded".to_string();
            }
            let mut table = Table::new();
            table.load_preset(UTF8_FULL_CONDENSED);
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec![
                Cell::new("Table").fg(Color::Cyan),
                Cell::new("Sheet").fg(Color::Cyan),
                Cell::new("Columns").fg(Color::Cyan),
                Cell::new("Rows").fg(Color::Cyan),
            ]);
            for t in tables {
                let columns: Vec<&str> = t.columns.iter().map(|c| c.display_name.as_str()).collect();
                table.add_row(vec![
                    Cell::new(&t.canonical_name),
                    Cell::new(&t.display_name),
                    Cell::new(columns.join(", ")),
                    Cell::new(t.row_count),
                ]);
            }
            table.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetql_engine::record;

    fn result() -> QueryResult {
        QueryResult {
            success: true,
            columns: vec!["name".into(), "note".into()],
            data: vec![record([
                ("name", CellValue::from("a,b")),
                ("note", CellValue::Null),
            ])],
            row_count: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_csv_escape() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_tsv_escape() {
        assert_eq!(tsv_escape("a\tb\nc"), "a\\tb\\nc");
    }

    #[test]
    fn test_format_result_csv() {
        assert_eq!(format_result(&result(), OutputFormat::Csv), "name,note\n\"a,b\",");
    }

    #[test]
    fn test_format_result_json_has_data() {
        let json: serde_json::Value =
            serde_json::from_str(&format_result(&result(), OutputFormat::Json)).unwrap();
        assert_eq!(json["data"][0]["name"], "a,b");
        assert!(json["data"][0]["note"].is_null());
    }

    #[test]
    fn test_format_failed_result_text() {
        let failed = QueryResult {
            error: Some("no such table: x".into()),
            ..Default::default()
        };
        assert!(format_result(&failed, OutputFormat::Text).contains("no such table: x"));
    }
}
