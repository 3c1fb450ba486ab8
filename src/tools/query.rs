//! Query execution tool.
//!
//! This module implements the `execute_query` MCP tool. Statements pass through
//! the guard and row-limit rewrite before they reach the database.

use crate::db::QueryExecutor;
use crate::error::DbResult;
use crate::models::{QueryParam, QueryResult};
use crate::tools::format::{OutputFormat, render_result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Input for the execute_query tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct QueryInput {
    /// SQL statement to execute. Only SELECT, DESCRIBE and EXPLAIN PLAN are allowed.
    pub sql: String,
    /// Positional bind values for :1, :2 ... placeholders
    #[serde(default)]
    pub params: Vec<QueryParam>,
    /// Output format: "json" returns structured data, "table" returns an ASCII table, "markdown" returns a markdown table
    #[serde(default)]
    pub format: OutputFormat,
}

/// Pre-rendered result for the text formats.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct FormattedResult {
    pub formatted: String,
    pub row_count: usize,
    pub execution_time_seconds: f64,
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Output from the execute_query tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum QueryOutput {
    Result(QueryResult),
    Formatted(FormattedResult),
}

impl QueryOutput {
    pub fn from_result(result: QueryResult, format: OutputFormat) -> Self {
        if !format.is_text() {
            return Self::Result(result);
        }
        Self::Formatted(FormattedResult {
            formatted: render_result(&result, format),
            row_count: result.row_count,
            execution_time_seconds: result.execution_time,
            query: result.rewritten_sql,
            error: result.error,
        })
    }

    pub fn row_count(&self) -> usize {
        match self {
            Self::Result(r) => r.row_count,
            Self::Formatted(f) => f.row_count,
        }
    }
}

/// Handler for the execute_query tool.
pub struct QueryToolHandler {
    executor: Arc<QueryExecutor>,
}

impl QueryToolHandler {
    pub fn new(executor: Arc<QueryExecutor>) -> Self {
        Self { executor }
    }

    /// Handle the execute_query tool call.
    pub async fn query(&self, input: QueryInput) -> DbResult<QueryOutput> {
        let result = self.executor.execute(&input.sql, &input.params).await?;
        Ok(QueryOutput::from_result(result, input.format))
    }
}
