//! Result normalization.
//!
//! Turns driver-native row sets into JSON-safe columns and rows. Dates become
//! ISO-8601 strings, large objects are read to completion, and nothing
//! driver-specific survives the conversion.

use crate::db::provider::{LobHandle, LobKind, RawRowSet, RawValue};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, FixedOffset, NaiveDateTime, SecondsFormat};
use serde_json::Value as JsonValue;

/// Format used for zone-less temporal values.
pub const NAIVE_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Normalized columns and rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NormalizedRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<JsonValue>>,
    /// Large objects that could not be read, rendered as null in `rows`
    pub errors: Vec<String>,
}

impl NormalizedRows {
    /// Errors joined into one message, if any.
    pub fn error_summary(&self) -> Option<String> {
        (!self.errors.is_empty()).then(|| self.errors.join("; "))
    }
}

static NULL: JsonValue = JsonValue::Null;

/// Name-based view over one normalized row.
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    columns: &'a [String],
    cells: &'a [JsonValue],
}

impl<'a> RowView<'a> {
    /// Cell by column name, case-insensitive. Missing columns read as null.
    pub fn get(&self, name: &str) -> &'a JsonValue {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .and_then(|idx| self.cells.get(idx))
            .unwrap_or(&NULL)
    }

    pub fn text(&self, name: &str) -> Option<String> {
        match self.get(name) {
            JsonValue::Null => None,
            JsonValue::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        match self.get(name) {
            JsonValue::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            JsonValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        match self.get(name) {
            JsonValue::Number(n) => n.as_f64(),
            JsonValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl NormalizedRows {
    /// Iterate rows with name-based access.
    pub fn views(&self) -> impl Iterator<Item = RowView<'_>> {
        self.rows.iter().map(|cells| RowView {
            columns: &self.columns,
            cells,
        })
    }
}

/// Stateless converter from raw driver values to JSON values.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultNormalizer;

impl ResultNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Normalize a whole row set.
    ///
    /// Rows shorter than the column list are padded with null and longer rows are
    /// truncated, so every row has exactly one cell per column.
    pub fn normalize(&self, raw: RawRowSet) -> NormalizedRows {
        let columns: Vec<String> = raw.columns.into_iter().map(|c| c.name).collect();
        let width = columns.len();
        let mut errors = Vec::new();

        let rows = raw
            .rows
            .into_iter()
            .map(|row| {
                let mut cells: Vec<JsonValue> = row
                    .into_iter()
                    .take(width)
                    .enumerate()
                    .map(|(idx, value)| match self.normalize_value(value) {
                        Ok(v) => v,
                        Err(e) => {
                            errors.push(format!("column {}: {}", columns[idx], e));
                            JsonValue::Null
                        }
                    })
                    .collect();
                cells.resize(width, JsonValue::Null);
                cells
            })
            .collect();

        NormalizedRows {
            columns,
            rows,
            errors,
        }
    }

    /// Normalize one value. Only large-object reads can fail.
    pub fn normalize_value(&self, value: RawValue) -> std::io::Result<JsonValue> {
        let json = match value {
            RawValue::Null => JsonValue::Null,
            RawValue::Bool(b) => JsonValue::Bool(b),
            RawValue::Integer(i) => JsonValue::from(i),
            RawValue::Float(f) => float_value(f),
            RawValue::Number(text) => number_value(text),
            RawValue::Text(s) => JsonValue::String(s),
            RawValue::DateTime(dt) => JsonValue::String(format_naive(&dt)),
            RawValue::DateTimeTz(dt) => JsonValue::String(format_with_offset(&dt)),
            RawValue::Bytes(bytes) => bytes_value(bytes),
            RawValue::Lob(handle) => lob_value(handle)?,
            RawValue::Opaque { text, .. } => JsonValue::String(text),
        };
        Ok(json)
    }
}

/// ISO-8601 without offset, fractional seconds only when present.
pub fn format_naive(dt: &NaiveDateTime) -> String {
    dt.format(NAIVE_DATETIME_FORMAT).to_string()
}

/// RFC 3339 with the original offset.
pub fn format_with_offset(dt: &DateTime<FixedOffset>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

fn float_value(f: f64) -> JsonValue {
    serde_json::Number::from_f64(f)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(f.to_string()))
}

/// Oracle NUMBER text: integer when integral and in range, float when finite, text otherwise.
///
/// Integral text too wide for `i64` stays text so no digits are lost.
fn number_value(text: String) -> JsonValue {
    let trimmed = text.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return JsonValue::from(i);
    }
    if is_integral(trimmed) {
        return JsonValue::String(trimmed.to_string());
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() => float_value(f),
        _ => JsonValue::String(text),
    }
}

fn is_integral(text: &str) -> bool {
    let digits = text.strip_prefix(['-', '+']).unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// UTF-8 text when valid, base64 otherwise.
fn bytes_value(bytes: Vec<u8>) -> JsonValue {
    match String::from_utf8(bytes) {
        Ok(s) => JsonValue::String(s),
        Err(e) => JsonValue::String(STANDARD.encode(e.as_bytes())),
    }
}

fn lob_value(handle: LobHandle) -> std::io::Result<JsonValue> {
    let kind = handle.kind();
    let bytes = handle.read_all()?;
    Ok(match kind {
        LobKind::Character => JsonValue::String(String::from_utf8_lossy(&bytes).into_owned()),
        LobKind::Binary => bytes_value(bytes),
    })
}
