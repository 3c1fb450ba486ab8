//! Query execution plan tool.
//!
//! This module implements the `explain_query` MCP tool on top of Oracle's
//! `EXPLAIN PLAN` and `plan_table`.

use crate::db::QueryExecutor;
use crate::error::DbResult;
use crate::models::{ExplainResult, PlanNode};
use crate::tools::format::{OutputFormat, render_plan};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Input for the explain_query tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ExplainInput {
    /// SQL statement to explain
    pub sql: String,
    /// Output format: "json" returns plan nodes, "table" and "markdown" return a rendered plan
    #[serde(default)]
    pub format: OutputFormat,
}

/// Output from the explain_query tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ExplainOutput {
    /// Plan steps in pre-order. Absent if format is table/markdown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_plan: Option<Vec<PlanNode>>,
    pub statement_id: String,
    /// Rendered plan when format is table or markdown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted: Option<String>,
}

impl ExplainOutput {
    pub fn from_result(result: ExplainResult, format: OutputFormat) -> Self {
        if format.is_text() {
            Self {
                formatted: Some(render_plan(&result.execution_plan, format)),
                execution_plan: None,
                statement_id: result.statement_id,
            }
        } else {
            Self {
                execution_plan: Some(result.execution_plan),
                statement_id: result.statement_id,
                formatted: None,
            }
        }
    }
}

/// Handler for the explain_query tool.
pub struct ExplainToolHandler {
    executor: Arc<QueryExecutor>,
}

impl ExplainToolHandler {
    pub fn new(executor: Arc<QueryExecutor>) -> Self {
        Self { executor }
    }

    pub async fn explain(&self, input: ExplainInput) -> DbResult<ExplainOutput> {
        let result = self.executor.explain(&input.sql).await?;
        info!(
            statement_id = %result.statement_id,
            steps = result.execution_plan.len(),
            "Explained statement"
        );
        Ok(ExplainOutput::from_result(result, input.format))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_result() -> ExplainResult {
        ExplainResult {
            execution_plan: Vec::new(),
            statement_id: "MCP_EXPLAIN_1".to_string(),
        }
    }

    #[test]
    fn test_json_keeps_empty_plan_key() {
        let out = ExplainOutput::from_result(empty_result(), OutputFormat::Json);
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["execution_plan"], serde_json::json!([]));
        assert_eq!(json["statement_id"], "MCP_EXPLAIN_1");
        assert!(json.get("formatted").is_none());
    }

    #[test]
    fn test_text_format_omits_plan_key() {
        let out = ExplainOutput::from_result(empty_result(), OutputFormat::Markdown);
        let json = serde_json::to_value(&out).unwrap();
        assert!(json.get("execution_plan").is_none());
        assert!(json["formatted"].is_string());
    }
}
