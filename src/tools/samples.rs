//! Sample query templates for a table.
//!
//! Purely string construction: nothing here talks to the database.

use crate::models::ColumnMetadata;
use schemars::JsonSchema;
use serde::Serialize;

/// Columns beyond this ordinal get no per-column sample.
pub const MAX_SAMPLED_COLUMNS: usize = 5;

/// Row bound on the select-all sample.
pub const SELECT_ALL_ROWS: u32 = 10;

/// Row bound on distinct-value samples.
pub const DISTINCT_ROWS: u32 = 20;

/// One generated statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct SampleQuery {
    pub sql: String,
    pub description: String,
}

impl SampleQuery {
    fn new(description: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            description: description.into(),
        }
    }

    /// `-- <description>` on the first line, the statement with a terminator on the second.
    pub fn render(&self) -> String {
        format!("-- {}\n{};", self.description, self.sql)
    }
}

/// Broad type family of a column, by its catalog type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypeFamily {
    Text,
    Numeric,
    Temporal,
    Other,
}

impl TypeFamily {
    fn of(data_type: &str) -> Self {
        let upper = data_type.trim().to_uppercase();
        // TIMESTAMP(6) WITH TIME ZONE, NVARCHAR2, NCLOB ...
        if ["VARCHAR2", "NVARCHAR2", "CHAR", "NCHAR", "CLOB", "NCLOB"]
            .iter()
            .any(|t| upper == *t)
        {
            Self::Text
        } else if ["NUMBER", "INTEGER", "FLOAT", "BINARY_FLOAT", "BINARY_DOUBLE"]
            .iter()
            .any(|t| upper == *t)
        {
            Self::Numeric
        } else if upper == "DATE" || upper.starts_with("TIMESTAMP") {
            Self::Temporal
        } else {
            Self::Other
        }
    }
}

/// Generates exploratory queries from column metadata.
#[derive(Debug, Default, Clone, Copy)]
pub struct SampleQuerySynthesizer;

impl SampleQuerySynthesizer {
    pub fn new() -> Self {
        Self
    }

    /// Build samples for `table_ref`.
    ///
    /// Always starts with a bounded select-all and a row count, then adds one sample for
    /// each of the first five columns whose type is textual, numeric or temporal.
    pub fn synthesize(&self, table_ref: &str, columns: &[ColumnMetadata]) -> Vec<SampleQuery> {
        let mut samples = vec![
            SampleQuery::new(
                "Basic select all",
                format!("SELECT * FROM {table_ref} WHERE ROWNUM <= {SELECT_ALL_ROWS}"),
            ),
            SampleQuery::new("Count total rows", format!("SELECT COUNT(*) FROM {table_ref}")),
        ];

        let mut ordered: Vec<&ColumnMetadata> = columns.iter().collect();
        ordered.sort_by_key(|c| c.column_id);

        for column in ordered.into_iter().take(MAX_SAMPLED_COLUMNS) {
            let name = &column.column_name;
            let sample = match TypeFamily::of(&column.data_type) {
                TypeFamily::Text => SampleQuery::new(
                    format!("Find distinct values for {name}"),
                    format!(
                        "SELECT DISTINCT {name} FROM {table_ref} \
                         WHERE {name} IS NOT NULL AND ROWNUM <= {DISTINCT_ROWS}"
                    ),
                ),
                TypeFamily::Numeric => SampleQuery::new(
                    format!("Statistics for {name}"),
                    format!("SELECT MIN({name}), MAX({name}), AVG({name}) FROM {table_ref}"),
                ),
                TypeFamily::Temporal => SampleQuery::new(
                    format!("Date range for {name}"),
                    format!("SELECT MIN({name}), MAX({name}) FROM {table_ref}"),
                ),
                TypeFamily::Other => continue,
            };
            samples.push(sample);
        }
        samples
    }
}

/// `OWNER.TABLE` when an owner is given, else the bare table name.
pub fn table_ref(table_name: &str, owner: Option<&str>) -> String {
    match owner.map(str::trim).filter(|o| !o.is_empty()) {
        Some(owner) => format!("{owner}.{}", table_name.trim()),
        None => table_name.trim().to_string(),
    }
}
