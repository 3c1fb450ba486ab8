//! MCP tool implementations.
//!
//! This module contains all tool handlers:
//! - `execute_query`: Run a guarded, row-limited statement
//! - `list_tables`, `list_views`, `list_procedures`: Browse the data dictionary
//! - `describe_table`: Column metadata for one table
//! - `explain_query`: Execution plan via `plan_table`
//! - `generate_sample_queries`: Templated exploratory statements
//! - `export_query_results`: JSON or CSV export
//! - `guard`: Statement classification and row-limit rewriting

pub mod explain;
pub mod export;
pub mod format;
pub mod guard;
pub mod query;
pub mod samples;
pub mod schema;

pub use explain::{ExplainInput, ExplainOutput, ExplainToolHandler};
pub use export::{ExportInput, ExportOutput, ExportToolHandler};
pub use format::OutputFormat;
pub use guard::StatementGuard;
pub use query::{QueryInput, QueryOutput, QueryToolHandler};
pub use samples::{SampleQuery, SampleQuerySynthesizer};
pub use schema::{
    DescribeTableOutput, ListProceduresOutput, ListTablesOutput, ListViewsOutput, OwnerInput,
    SampleQueriesOutput, SchemaToolHandler, TableInput,
};
