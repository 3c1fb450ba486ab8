//! Text rendering for tabular tool output.
//!
//! Query results and execution plans can be returned either as JSON or as a
//! pre-rendered text block. Column widths are measured in display cells so
//! wide characters line up.

use crate::models::{PlanNode, QueryResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use unicode_width::UnicodeWidthStr;

/// Output format for query and plan results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Structured JSON (default)
    #[default]
    Json,
    /// Boxed ASCII table, SQL*Plus style
    Table,
    /// Markdown table
    Markdown,
}

impl OutputFormat {
    pub fn is_text(self) -> bool {
        !matches!(self, Self::Json)
    }
}

/// Render one cell.
pub fn format_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "NULL".to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render a result set in the requested text format.
pub fn render_result(result: &QueryResult, format: OutputFormat) -> String {
    if let Some(message) = &result.message {
        return message.clone();
    }
    match format {
        OutputFormat::Markdown => format_as_markdown(&result.columns, &result.rows),
        _ => {
            let mut out = format_as_table(&result.columns, &result.rows);
            let noun = if result.row_count == 1 { "row" } else { "rows" };
            out.push_str(&format!(
                "{} {} selected ({:.2} sec)\n",
                result.row_count, noun, result.execution_time
            ));
            out
        }
    }
}

/// Boxed table with right-aligned numbers.
pub fn format_as_table(columns: &[String], rows: &[Vec<JsonValue>]) -> String {
    if columns.is_empty() {
        return "no rows selected\n".to_string();
    }

    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(format_value).collect())
        .collect();

    let mut widths: Vec<usize> = columns.iter().map(|c| c.width()).collect();
    for row in &cells {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(cell.width());
        }
    }

    let separator: String = widths
        .iter()
        .map(|w| format!("+{}", "-".repeat(w + 2)))
        .collect::<String>()
        + "+\n";

    let mut output = separator.clone();
    for (name, w) in columns.iter().zip(&widths) {
        output.push_str(&format!("| {} ", pad(name, *w, Align::Center)));
    }
    output.push_str("|\n");
    output.push_str(&separator);

    for (row, cells) in rows.iter().zip(&cells) {
        for (i, w) in widths.iter().enumerate() {
            let cell = cells.get(i).map(String::as_str).unwrap_or("NULL");
            let align = match row.get(i) {
                Some(JsonValue::Number(_)) => Align::Right,
                _ => Align::Left,
            };
            output.push_str(&format!("| {} ", pad(cell, *w, align)));
        }
        output.push_str("|\n");
    }
    output.push_str(&separator);
    output
}

pub fn format_as_markdown(columns: &[String], rows: &[Vec<JsonValue>]) -> String {
    if columns.is_empty() {
        return "*no rows selected*".to_string();
    }

    let mut output: String = columns
        .iter()
        .map(|c| format!("| {} ", markdown_cell(c)))
        .collect::<String>()
        + "|\n";
    output.push_str(&(columns.iter().map(|_| "|---").collect::<String>() + "|\n"));

    for row in rows {
        let line: String = row
            .iter()
            .map(|value| format!("| {} ", markdown_cell(&format_value(value))))
            .collect::<String>()
            + "|\n";
        output.push_str(&line);
    }

    output.push_str(&format!("\n*{} rows*", rows.len()));
    output
}

/// Keep a cell on one table row: pipes escaped, line breaks flattened to spaces.
fn markdown_cell(text: &str) -> String {
    text.replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
        .replace('|', "\\|")
}

/// Render an execution plan with operations indented by depth.
pub fn render_plan(plan: &[PlanNode], format: OutputFormat) -> String {
    let columns: Vec<String> = ["ID", "OPERATION", "OBJECT", "COST", "ROWS", "BYTES"]
        .into_iter()
        .map(String::from)
        .collect();
    let rows: Vec<Vec<JsonValue>> = plan
        .iter()
        .map(|node| {
            vec![
                JsonValue::from(node.id),
                JsonValue::from(match format {
                    // Markdown collapses leading spaces
                    OutputFormat::Markdown => format!("{}{}", "·".repeat(node.depth * 2), node.operation),
                    _ => node.indented_operation(),
                }),
                node.object_name.clone().map_or(JsonValue::Null, JsonValue::from),
                node.cost.map_or(JsonValue::Null, integral),
                node.cardinality.map_or(JsonValue::Null, integral),
                node.bytes
                    .map_or(JsonValue::Null, |b| JsonValue::from(format_size(b))),
            ]
        })
        .collect();

    match format {
        OutputFormat::Markdown => format_as_markdown(&columns, &rows),
        _ => format_as_table(&columns, &rows),
    }
}

/// Byte estimate in binary units.
pub fn format_size(bytes: f64) -> String {
    humansize::format_size(bytes.max(0.0) as u64, humansize::WINDOWS)
}

fn integral(value: f64) -> JsonValue {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        JsonValue::from(value as i64)
    } else {
        JsonValue::from(value)
    }
}

#[derive(Clone, Copy)]
enum Align {
    Left,
    Right,
    Center,
}

/// Pad by display width; `format!` width counts chars, not cells.
fn pad(text: &str, width: usize, align: Align) -> String {
    let fill = width.saturating_sub(text.width());
    match align {
        Align::Left => format!("{text}{}", " ".repeat(fill)),
        Align::Right => format!("{}{text}", " ".repeat(fill)),
        Align::Center => {
            let left = fill / 2;
            format!("{}{text}{}", " ".repeat(left), " ".repeat(fill - left))
        }
    }
}
