//! Query-related data models.
//!
//! This module defines types for SQL query parameters, results and execution plans.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Message returned for statements that produce no column set.
pub const NO_RESULT_SET_MESSAGE: &str = "Query executed successfully";

/// A bind value for parameterized queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum QueryParam {
    /// NULL value
    Null,
    /// Boolean value, bound as 1/0
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// String value
    String(String),
}

impl QueryParam {
    /// Get the type name of this parameter for debugging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
        }
    }
}

impl From<&str> for QueryParam {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for QueryParam {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for QueryParam {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

/// Normalized outcome of one executed statement.
///
/// Every row has exactly `columns.len()` cells and `row_count == rows.len()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<JsonValue>>,
    pub row_count: usize,
    #[serde(rename = "execution_time_seconds")]
    pub execution_time: f64,
    /// The statement actually sent to the database
    #[serde(rename = "query")]
    pub rewritten_sql: String,
    /// Set for statements that return no column set
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
    /// Non-fatal problem encountered while normalizing values
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl QueryResult {
    /// Build a result from normalized rows.
    pub fn with_rows(
        columns: Vec<String>,
        rows: Vec<Vec<JsonValue>>,
        execution_time: f64,
        rewritten_sql: impl Into<String>,
    ) -> Self {
        Self {
            row_count: rows.len(),
            columns,
            rows,
            execution_time,
            rewritten_sql: rewritten_sql.into(),
            message: None,
            error: None,
        }
    }

    /// Build the message-only result for statements without a column set.
    pub fn message_only(execution_time: f64, rewritten_sql: impl Into<String>) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            row_count: 0,
            execution_time,
            rewritten_sql: rewritten_sql.into(),
            message: Some(NO_RESULT_SET_MESSAGE.to_string()),
            error: None,
        }
    }

    /// Whether the statement produced a column set.
    pub fn has_result_set(&self) -> bool {
        self.message.is_none()
    }
}

/// One step of an execution plan, in pre-order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PlanNode {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub parent_id: Option<i64>,
    /// Operation and options, e.g. "TABLE ACCESS FULL"
    pub operation: String,
    pub object_name: Option<String>,
    pub cost: Option<f64>,
    pub cardinality: Option<f64>,
    pub bytes: Option<f64>,
    /// Zero for the root
    pub depth: usize,
}

impl PlanNode {
    /// Operation text indented two spaces per level.
    pub fn indented_operation(&self) -> String {
        format!("{}{}", "  ".repeat(self.depth), self.operation)
    }
}

/// Plan returned by explain_query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExplainResult {
    pub execution_plan: Vec<PlanNode>,
    pub statement_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_result_serializes_original_field_names() {
        let result = QueryResult::with_rows(
            vec!["ID".into()],
            vec![vec![JsonValue::from(1)]],
            0.25,
            "SELECT id FROM t WHERE ROWNUM <= 100",
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["row_count"], 1);
        assert_eq!(json["execution_time_seconds"], 0.25);
        assert_eq!(json["query"], "SELECT id FROM t WHERE ROWNUM <= 100");
        assert!(json.get("message").is_none());
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_message_only_result() {
        let result = QueryResult::message_only(0.1, "BEGIN NULL; END;");
        assert!(!result.has_result_set());
        assert_eq!(result.row_count, 0);
        assert_eq!(result.message.as_deref(), Some(NO_RESULT_SET_MESSAGE));
    }

    #[test]
    fn test_query_param_untagged() {
        let params: Vec<QueryParam> = serde_json::from_str(r#"[null, true, 5, 1.5, "HR"]"#).unwrap();
        assert_eq!(
            params,
            vec![
                QueryParam::Null,
                QueryParam::Bool(true),
                QueryParam::Int(5),
                QueryParam::Float(1.5),
                QueryParam::String("HR".into()),
            ]
        );
        assert_eq!(params[4].type_name(), "string");
    }

    #[test]
    fn test_indented_operation() {
        let node = PlanNode {
            id: 2,
            parent_id: Some(1),
            operation: "INDEX RANGE SCAN".into(),
            object_name: Some("EMP_IDX".into()),
            cost: Some(1.0),
            cardinality: None,
            bytes: None,
            depth: 2,
        };
        assert_eq!(node.indented_operation(), "    INDEX RANGE SCAN");
    }
}
