//! MCP service implementation using rmcp.
//!
//! This module defines the OracleService struct with all Oracle tools and
//! schema resources exposed via the MCP protocol using the rmcp framework's macros.

use crate::config::QueryPolicy;
use crate::db::{ConnectionProvider, QueryExecutor, SchemaInspector};
use crate::error::{DbError, DbResult};
use crate::tools::explain::{ExplainInput, ExplainToolHandler};
use crate::tools::export::{ExportInput, ExportToolHandler};
use crate::tools::query::{QueryInput, QueryToolHandler};
use crate::tools::schema::{OwnerInput, SchemaToolHandler, TableInput};
use chrono::{SecondsFormat, Utc};
use futures_util::future::try_join3;
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{
        AnnotateAble, CallToolResult, Content, Implementation, ListResourcesResult,
        PaginatedRequestParam, ProtocolVersion, RawResource, ReadResourceRequestParam,
        ReadResourceResult, Resource, ResourceContents, ServerCapabilities, ServerInfo,
    },
    service::RequestContext,
    tool, tool_handler, tool_router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

/// URI of the schema overview resource.
pub const OVERVIEW_URI: &str = "oracle://schema/overview";

/// URI prefix of per-table resources, followed by `OWNER.TABLE`.
pub const TABLE_URI_PREFIX: &str = "oracle://table/";

/// Tables listed as individual resources.
pub const MAX_TABLE_RESOURCES: usize = 50;

/// A parsed resource URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceUri {
    Overview,
    Table { owner: String, table_name: String },
}

impl ResourceUri {
    pub fn parse(uri: &str) -> Option<Self> {
        if uri == OVERVIEW_URI {
            return Some(Self::Overview);
        }
        let (owner, table_name) = uri.strip_prefix(TABLE_URI_PREFIX)?.split_once('.')?;
        if owner.is_empty() || table_name.is_empty() {
            return None;
        }
        Some(Self::Table {
            owner: owner.to_string(),
            table_name: table_name.to_string(),
        })
    }

    pub fn table(owner: &str, table_name: &str) -> String {
        format!("{TABLE_URI_PREFIX}{owner}.{table_name}")
    }
}

#[derive(Clone)]
pub struct OracleService {
    queries: Arc<QueryToolHandler>,
    schema: Arc<SchemaToolHandler>,
    explain: Arc<ExplainToolHandler>,
    export: Arc<ExportToolHandler>,
    inspector: Arc<SchemaInspector>,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl OracleService {
    /// Wire the tool handlers over one provider and policy.
    pub fn new(provider: Arc<dyn ConnectionProvider>, policy: Arc<QueryPolicy>) -> Self {
        let executor = Arc::new(QueryExecutor::new(provider.clone(), policy.clone()));
        let inspector = Arc::new(SchemaInspector::new(provider, policy));
        Self {
            queries: Arc::new(QueryToolHandler::new(executor.clone())),
            schema: Arc::new(SchemaToolHandler::new(inspector.clone())),
            explain: Arc::new(ExplainToolHandler::new(executor.clone())),
            export: Arc::new(ExportToolHandler::new(executor)),
            inspector,
            tool_router: Self::tool_router(),
        }
    }

    async fn schema_overview(&self) -> DbResult<serde_json::Value> {
        let (tables, views, procedures) = try_join3(
            self.inspector.list_tables(None),
            self.inspector.list_views(None),
            self.inspector.list_procedures(None),
        )
        .await?;
        Ok(json!({
            "table_count": tables.len(),
            "view_count": views.len(),
            "procedure_count": procedures.len(),
            "tables": tables,
            "views": views,
            "procedures": procedures,
            "database_type": "Oracle",
            "generated_at": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }))
    }

    async fn table_details(&self, owner: &str, table_name: &str) -> DbResult<serde_json::Value> {
        let columns = self
            .inspector
            .list_columns(table_name, Some(owner))
            .await?;
        Ok(json!({
            "owner": owner,
            "table_name": table_name,
            "column_count": columns.len(),
            "columns": columns,
        }))
    }
}

/// Render a handler outcome as a tool result.
///
/// Failures become an `Error: <message>` text payload flagged as an error rather
/// than a protocol error, so the client sees the database message verbatim.
fn tool_result<T: Serialize>(outcome: DbResult<T>) -> Result<CallToolResult, McpError> {
    match outcome {
        Ok(output) => Ok(CallToolResult::success(vec![Content::json(output)?])),
        Err(e) => {
            warn!(error = %e, "Tool call failed");
            Ok(CallToolResult::error(vec![Content::text(format!("Error: {e}"))]))
        }
    }
}

fn json_resource(uri: &str, value: &serde_json::Value) -> Result<ReadResourceResult, McpError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::from(DbError::internal(e.to_string())))?;
    Ok(ReadResourceResult {
        contents: vec![ResourceContents::text(text, uri)],
    })
}

fn listed_resource(uri: String, name: String, description: String) -> Resource {
    let mut raw = RawResource::new(uri, name);
    raw.description = Some(description);
    raw.mime_type = Some("application/json".to_string());
    raw.no_annotation()
}

#[tool_router]
impl OracleService {
    #[tool(
        description = "Execute a read-only SQL query against Oracle.\nOnly SELECT, DESCRIBE and EXPLAIN PLAN statements are allowed.\nResults are capped with ROWNUM unless the query already limits rows.\nOutput format: json (default), table, or markdown."
    )]
    async fn execute_query(
        &self,
        Parameters(input): Parameters<QueryInput>,
    ) -> Result<CallToolResult, McpError> {
        tool_result(self.queries.query(input).await)
    }

    #[tool(
        description = "Get column metadata for a table: data types, lengths, precision, nullability, defaults and comments."
    )]
    async fn describe_table(
        &self,
        Parameters(input): Parameters<TableInput>,
    ) -> Result<CallToolResult, McpError> {
        tool_result(self.schema.describe_table(input).await)
    }

    #[tool(description = "List tables with row counts, last analyzed time, comments and tablespace.\nCan filter by owner.")]
    async fn list_tables(
        &self,
        Parameters(input): Parameters<OwnerInput>,
    ) -> Result<CallToolResult, McpError> {
        tool_result(self.schema.list_tables(input).await)
    }

    #[tool(description = "List views with comments.\nCan filter by owner.")]
    async fn list_views(
        &self,
        Parameters(input): Parameters<OwnerInput>,
    ) -> Result<CallToolResult, McpError> {
        tool_result(self.schema.list_views(input).await)
    }

    #[tool(description = "List stored procedures, functions and packages.\nCan filter by owner.")]
    async fn list_procedures(
        &self,
        Parameters(input): Parameters<OwnerInput>,
    ) -> Result<CallToolResult, McpError> {
        tool_result(self.schema.list_procedures(input).await)
    }

    #[tool(
        description = "Show the Oracle execution plan for a statement without running it.\nPlan steps are returned in tree order with depth for indentation.\nOutput format: \"json\" returns plan nodes, \"table\" returns ASCII table, \"markdown\" returns markdown table."
    )]
    async fn explain_query(
        &self,
        Parameters(input): Parameters<ExplainInput>,
    ) -> Result<CallToolResult, McpError> {
        tool_result(self.explain.explain(input).await)
    }

    #[tool(
        description = "Generate sample SELECT statements for exploring a table, based on its column types."
    )]
    async fn generate_sample_queries(
        &self,
        Parameters(input): Parameters<TableInput>,
    ) -> Result<CallToolResult, McpError> {
        tool_result(self.schema.generate_sample_queries(input).await)
    }

    #[tool(
        description = "Run a read-only query and export the results as json (default) or csv.\nExports are capped at the configured maximum export rows."
    )]
    async fn export_query_results(
        &self,
        Parameters(input): Parameters<ExportInput>,
    ) -> Result<CallToolResult, McpError> {
        tool_result(self.export.export(input).await)
    }
}

#[tool_handler]
impl ServerHandler for OracleService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: "oracle-mcp-server".to_owned(),
                title: Some("Oracle MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Read-only tools for exploring an Oracle database.\n\
                \n\
                ## Workflow\n\
                1. Call `list_tables` (optionally with `owner`) to find tables\n\
                2. Call `describe_table` to see columns before writing queries\n\
                3. Use `generate_sample_queries` for starting points\n\
                4. Run queries with `execute_query`; check plans with `explain_query`\n\
                \n\
                ## Restrictions\n\
                - Only SELECT, DESCRIBE and EXPLAIN PLAN statements are allowed\n\
                - Results are capped with ROWNUM unless the query already limits rows\n\
                - Some tables or columns may be hidden by the server's allow-lists\n\
                \n\
                ## Resources\n\
                - `oracle://schema/overview`: tables, views and procedures\n\
                - `oracle://table/OWNER.TABLE`: columns of one table"
                    .to_string(),
            ),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        let mut resources = vec![listed_resource(
            OVERVIEW_URI.to_string(),
            "Schema overview".to_string(),
            "Tables, views and procedures in the database".to_string(),
        )];

        let tables = self.inspector.list_tables(None).await?;
        resources.extend(tables.iter().take(MAX_TABLE_RESOURCES).map(|t| {
            listed_resource(
                ResourceUri::table(&t.owner, &t.table_name),
                t.qualified_name(),
                t.table_comment
                    .clone()
                    .unwrap_or_else(|| format!("Columns of {}", t.qualified_name())),
            )
        }));

        Ok(ListResourcesResult::with_all_items(resources))
    }

    async fn read_resource(
        &self,
        ReadResourceRequestParam { uri }: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        match ResourceUri::parse(&uri) {
            Some(ResourceUri::Overview) => json_resource(&uri, &self.schema_overview().await?),
            Some(ResourceUri::Table { owner, table_name }) => {
                json_resource(&uri, &self.table_details(&owner, &table_name).await?)
            }
            None => Err(McpError::resource_not_found(
                format!("Unknown resource: {uri}"),
                Some(json!({ "uri": uri })),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::provider::Session;
    use async_trait::async_trait;

    struct UnreachableProvider;

    #[async_trait]
    impl ConnectionProvider for UnreachableProvider {
        async fn acquire(&self) -> DbResult<Box<dyn Session>> {
            Err(DbError::backend("ORA-12541: TNS:no listener"))
        }

        async fn shutdown(&self) {}

        fn name(&self) -> &'static str {
            "unreachable"
        }
    }

    fn create_test_service() -> OracleService {
        OracleService::new(
            Arc::new(UnreachableProvider),
            Arc::new(QueryPolicy::default()),
        )
    }

    #[test]
    fn test_server_info() {
        let info = create_test_service().get_info();
        assert_eq!(info.server_info.name, "oracle-mcp-server");
        assert!(info.capabilities.tools.is_some());
        assert!(info.capabilities.resources.is_some());
    }

    #[test]
    fn test_tool_names() {
        let mut names: Vec<String> = OracleService::tool_router()
            .list_all()
            .into_iter()
            .map(|t| t.name.to_string())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "describe_table",
                "execute_query",
                "explain_query",
                "export_query_results",
                "generate_sample_queries",
                "list_procedures",
                "list_tables",
                "list_views",
            ]
        );
    }

    #[test]
    fn test_resource_uri_parsing() {
        assert_eq!(ResourceUri::parse(OVERVIEW_URI), Some(ResourceUri::Overview));
        assert_eq!(
            ResourceUri::parse("oracle://table/HR.EMPLOYEES"),
            Some(ResourceUri::Table {
                owner: "HR".into(),
                table_name: "EMPLOYEES".into()
            })
        );
        assert_eq!(ResourceUri::parse("oracle://table/EMPLOYEES"), None);
        assert_eq!(ResourceUri::parse("oracle://table/.X"), None);
        assert_eq!(ResourceUri::parse("file:///etc/passwd"), None);
        assert_eq!(
            ResourceUri::table("HR", "EMPLOYEES"),
            "oracle://table/HR.EMPLOYEES"
        );
    }

    #[tokio::test]
    async fn test_backend_failure_is_error_text() {
        let service = create_test_service();
        let result = service
            .list_tables(Parameters(OwnerInput::default()))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        let text = result.content[0]
            .as_text()
            .map(|t| t.text.clone())
            .unwrap_or_default();
        assert_eq!(text, "Error: ORA-12541: TNS:no listener");
    }

    #[tokio::test]
    async fn test_rejected_statement_is_error_text() {
        let service = create_test_service();
        let input = QueryInput {
            sql: "DROP TABLE t".into(),
            params: Vec::new(),
            format: Default::default(),
        };
        let result = service.execute_query(Parameters(input)).await.unwrap();
        assert_eq!(result.is_error, Some(true));
        let text = result.content[0]
            .as_text()
            .map(|t| t.text.clone())
            .unwrap_or_default();
        assert_eq!(
            text,
            "Error: Only SELECT, DESCRIBE, and EXPLAIN PLAN statements are allowed"
        );
    }
}
