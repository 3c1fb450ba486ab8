//! Data models for the Oracle MCP Server.
//!
//! This module re-exports all model types used throughout the application.

pub mod query;
pub mod schema;

// Re-export commonly used types
pub use query::{ExplainResult, NO_RESULT_SET_MESSAGE, PlanNode, QueryParam, QueryResult};
pub use schema::{ColumnMetadata, ProcedureKind, ProcedureMetadata, TableMetadata, ViewMetadata};
