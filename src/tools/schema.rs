//! Schema introspection tools.
//!
//! This module implements the `list_tables`, `list_views`, `list_procedures`,
//! `describe_table` and `generate_sample_queries` MCP tools.

use crate::db::SchemaInspector;
use crate::error::DbResult;
use crate::models::{ColumnMetadata, ProcedureMetadata, TableMetadata, ViewMetadata};
use crate::tools::samples::{SampleQuerySynthesizer, table_ref};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Input for the owner-filtered listing tools.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct OwnerInput {
    /// Schema owner to filter by, exact match (e.g. "HR"). Omit for every visible schema.
    #[serde(default)]
    pub owner: Option<String>,
}

/// Input for describe_table and generate_sample_queries.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TableInput {
    /// Table name as stored in the data dictionary (usually uppercase)
    pub table_name: String,
    /// Schema owner of the table
    #[serde(default)]
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListTablesOutput {
    pub tables: Vec<TableMetadata>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListViewsOutput {
    pub views: Vec<ViewMetadata>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListProceduresOutput {
    pub procedures: Vec<ProcedureMetadata>,
}

/// Output from the describe_table tool.
///
/// An unknown table is not an error: it describes as zero columns.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct DescribeTableOutput {
    pub table_name: String,
    pub owner: Option<String>,
    pub columns: Vec<ColumnMetadata>,
    pub column_count: usize,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SampleQueriesOutput {
    pub table_name: String,
    pub sample_queries: Vec<String>,
}

/// Handler for schema tools.
pub struct SchemaToolHandler {
    inspector: Arc<SchemaInspector>,
    synthesizer: SampleQuerySynthesizer,
}

impl SchemaToolHandler {
    pub fn new(inspector: Arc<SchemaInspector>) -> Self {
        Self {
            inspector,
            synthesizer: SampleQuerySynthesizer::new(),
        }
    }

    pub async fn list_tables(&self, input: OwnerInput) -> DbResult<ListTablesOutput> {
        let tables = self.inspector.list_tables(input.owner.as_deref()).await?;
        info!(owner = ?input.owner, count = tables.len(), "Listed tables");
        Ok(ListTablesOutput { tables })
    }

    pub async fn list_views(&self, input: OwnerInput) -> DbResult<ListViewsOutput> {
        let views = self.inspector.list_views(input.owner.as_deref()).await?;
        info!(owner = ?input.owner, count = views.len(), "Listed views");
        Ok(ListViewsOutput { views })
    }

    pub async fn list_procedures(&self, input: OwnerInput) -> DbResult<ListProceduresOutput> {
        let procedures = self
            .inspector
            .list_procedures(input.owner.as_deref())
            .await?;
        info!(owner = ?input.owner, count = procedures.len(), "Listed procedures");
        Ok(ListProceduresOutput { procedures })
    }

    pub async fn describe_table(&self, input: TableInput) -> DbResult<DescribeTableOutput> {
        let columns = self
            .inspector
            .list_columns(&input.table_name, input.owner.as_deref())
            .await?;
        info!(
            table = %input.table_name,
            owner = ?input.owner,
            columns = columns.len(),
            "Described table"
        );
        Ok(DescribeTableOutput {
            table_name: input.table_name,
            owner: input.owner,
            column_count: columns.len(),
            columns,
        })
    }

    pub async fn generate_sample_queries(&self, input: TableInput) -> DbResult<SampleQueriesOutput> {
        let columns = self
            .inspector
            .list_columns(&input.table_name, input.owner.as_deref())
            .await?;
        let target = table_ref(&input.table_name, input.owner.as_deref());
        let sample_queries = self
            .synthesizer
            .synthesize(&target, &columns)
            .iter()
            .map(|q| q.render())
            .collect();
        Ok(SampleQueriesOutput {
            table_name: input.table_name,
            sample_queries,
        })
    }
}
