//! Result export.
//!
//! Implements the `export_query_results` tool: JSON passes the query result
//! through, CSV flattens it into a single string.

use crate::db::QueryExecutor;
use crate::error::{DbError, DbResult};
use crate::models::QueryResult;
use csv::{Terminator, WriterBuilder};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// Supported export formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl FromStr for ExportFormat {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(DbError::invalid_input(format!(
                "Unsupported export format '{other}'. Use 'json' or 'csv'"
            ))),
        }
    }
}

/// Input for the export_query_results tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ExportInput {
    /// SQL query to export (SELECT, DESCRIBE, EXPLAIN)
    pub sql: String,
    /// Export format: "json" (default) or "csv"
    #[serde(default)]
    pub format: Option<String>,
}

/// CSV export payload.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct CsvExport {
    pub csv_content: String,
    pub row_count: usize,
}

/// Output from the export tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum ExportOutput {
    Json(QueryResult),
    Csv(CsvExport),
}

/// Handler for the export tool.
pub struct ExportToolHandler {
    executor: Arc<QueryExecutor>,
}

impl ExportToolHandler {
    pub fn new(executor: Arc<QueryExecutor>) -> Self {
        Self { executor }
    }

    pub async fn export(&self, input: ExportInput) -> DbResult<ExportOutput> {
        // Reject a bad format before touching the database.
        let format: ExportFormat = input.format.as_deref().unwrap_or_default().parse()?;
        let result = self.executor.execute_for_export(&input.sql, &[]).await?;

        info!(rows = result.row_count, ?format, "Exported query results");
        Ok(match format {
            ExportFormat::Json => ExportOutput::Json(result),
            ExportFormat::Csv => ExportOutput::Csv(CsvExport {
                csv_content: to_csv(&result.columns, &result.rows)?,
                row_count: result.row_count,
            }),
        })
    }
}

/// Header record then one record per row, `\n`-terminated with no trailing newline.
///
/// Fields are quoted only when they hold a delimiter, quote or line break. Nulls
/// are empty fields.
pub fn to_csv(columns: &[String], rows: &[Vec<JsonValue>]) -> DbResult<String> {
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(columns).map_err(csv_error)?;
    for row in rows {
        writer
            .write_record(row.iter().map(csv_field))
            .map_err(csv_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| DbError::internal(format!("CSV export failed: {}", e.error())))?;
    let mut content = String::from_utf8(bytes)
        .map_err(|e| DbError::internal(format!("CSV export produced invalid UTF-8: {e}")))?;
    if content.ends_with('\n') {
        content.pop();
    }
    Ok(content)
}

fn csv_field(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn csv_error(e: csv::Error) -> DbError {
    DbError::internal(format!("CSV export failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_csv_quoting_and_nulls() {
        let csv = to_csv(
            &["A".to_string(), "B".to_string(), "C".to_string()],
            &[vec![json!("a,b"), JsonValue::Null, json!("x\"y")]],
        )
        .unwrap();
        assert_eq!(csv, "A,B,C\n\"a,b\",,\"x\"\"y\"");
    }

    #[test]
    fn test_csv_numbers_and_plain_text() {
        let csv = to_csv(
            &["ID".to_string(), "NAME".to_string()],
            &[vec![json!(1), json!("Alice")], vec![json!(2.5), json!(true)]],
        )
        .unwrap();
        assert_eq!(csv, "ID,NAME\n1,Alice\n2.5,true");
    }

    #[test]
    fn test_csv_header_only() {
        assert_eq!(to_csv(&["ID".to_string()], &[]).unwrap(), "ID");
    }

    #[test]
    fn test_csv_line_breaks_and_quoted_header() {
        let csv = to_csv(
            &["NOTE".to_string(), "A,B".to_string()],
            &[vec![json!("line one\nline two"), json!("")]],
        )
        .unwrap();
        assert_eq!(csv, "NOTE,\"A,B\"\n\"line one\nline two\",");
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("CSV".parse::<ExportFormat>().ok(), Some(ExportFormat::Csv));
        assert_eq!("".parse::<ExportFormat>().ok(), Some(ExportFormat::Json));
        let err = "xml".parse::<ExportFormat>().unwrap_err();
        assert!(matches!(err, DbError::InvalidInput { .. }));
    }
}
