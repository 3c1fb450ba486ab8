//! Schema introspection.
//!
//! Read-only lookups against the Oracle data dictionary (`all_*` views). Each call
//! issues one catalog query on a fresh lease; nothing is cached.

use crate::config::QueryPolicy;
use crate::db::normalize::{NormalizedRows, ResultNormalizer};
use crate::db::provider::{ConnectionProvider, SessionLease};
use crate::error::{DbError, DbResult};
use crate::models::{
    ColumnMetadata, ProcedureKind, ProcedureMetadata, QueryParam, TableMetadata, ViewMetadata,
};
use std::sync::Arc;
use tracing::debug;

/// SQL for catalog queries.
mod queries {
    pub const TABLES: &str = "SELECT t.owner, t.table_name, t.num_rows, t.last_analyzed, \
         tc.comments, t.tablespace_name \
         FROM all_tables t \
         LEFT JOIN all_tab_comments tc ON t.owner = tc.owner AND t.table_name = tc.table_name \
         WHERE 1=1";
    pub const TABLES_ORDER: &str = " ORDER BY t.owner, t.table_name";

    pub const VIEWS: &str = "SELECT v.owner, v.view_name, vc.comments \
         FROM all_views v \
         LEFT JOIN all_tab_comments vc ON v.owner = vc.owner AND v.view_name = vc.table_name \
         WHERE 1=1";
    pub const VIEWS_ORDER: &str = " ORDER BY v.owner, v.view_name";

    pub const PROCEDURES: &str = "SELECT owner, object_name, object_type, status, created, \
         last_ddl_time \
         FROM all_objects \
         WHERE object_type IN ('PROCEDURE', 'FUNCTION', 'PACKAGE')";
    pub const PROCEDURES_ORDER: &str = " ORDER BY owner, object_type, object_name";

    pub const COLUMNS: &str = "SELECT c.column_name, c.data_type, c.data_length, \
         c.data_precision, c.data_scale, c.nullable, c.data_default, cc.comments, c.column_id \
         FROM all_tab_columns c \
         LEFT JOIN all_col_comments cc ON c.owner = cc.owner \
         AND c.table_name = cc.table_name \
         AND c.column_name = cc.column_name \
         WHERE c.table_name = :table_name";
    pub const COLUMNS_ORDER: &str = " ORDER BY c.column_id";
}

/// A catalog statement with its positional binds.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogQuery {
    pub sql: String,
    pub params: Vec<QueryParam>,
}

impl CatalogQuery {
    fn new(base: &str) -> Self {
        Self {
            sql: base.to_string(),
            params: Vec::new(),
        }
    }

    /// Append `AND <column> = :owner` when an owner is given.
    fn owner_filter(mut self, column: &str, owner: Option<&str>) -> Self {
        if let Some(owner) = owner {
            self.sql.push_str(&format!(" AND {column} = :owner"));
            self.params.push(QueryParam::from(owner));
        }
        self
    }

    fn order_by(mut self, clause: &str) -> Self {
        self.sql.push_str(clause);
        self
    }

    /// Tables, optionally narrowed by owner and by the table allow-list.
    pub fn tables(owner: Option<&str>, allow_list: &[String]) -> Self {
        let mut query = Self::new(queries::TABLES).owner_filter("t.owner", owner);
        if !allow_list.is_empty() {
            let placeholders: Vec<String> =
                (0..allow_list.len()).map(|i| format!(":table_{i}")).collect();
            query
                .sql
                .push_str(&format!(" AND t.table_name IN ({})", placeholders.join(", ")));
            query
                .params
                .extend(allow_list.iter().map(|name| QueryParam::from(name.as_str())));
        }
        query.order_by(queries::TABLES_ORDER)
    }

    pub fn views(owner: Option<&str>) -> Self {
        Self::new(queries::VIEWS)
            .owner_filter("v.owner", owner)
            .order_by(queries::VIEWS_ORDER)
    }

    pub fn procedures(owner: Option<&str>) -> Self {
        Self::new(queries::PROCEDURES)
            .owner_filter("owner", owner)
            .order_by(queries::PROCEDURES_ORDER)
    }

    pub fn columns(table_name: &str, owner: Option<&str>) -> Self {
        let mut query = Self::new(queries::COLUMNS);
        query.params.push(QueryParam::from(table_name));
        query
            .owner_filter("c.owner", owner)
            .order_by(queries::COLUMNS_ORDER)
    }
}

/// Blank owner filters are treated as absent.
fn owner_arg(owner: Option<&str>) -> Option<&str> {
    owner.map(str::trim).filter(|o| !o.is_empty())
}

/// Schema inspector for Oracle data dictionary views.
pub struct SchemaInspector {
    provider: Arc<dyn ConnectionProvider>,
    policy: Arc<QueryPolicy>,
    normalizer: ResultNormalizer,
}

impl SchemaInspector {
    /// Create a new schema inspector.
    pub fn new(provider: Arc<dyn ConnectionProvider>, policy: Arc<QueryPolicy>) -> Self {
        Self {
            provider,
            policy,
            normalizer: ResultNormalizer::new(),
        }
    }

    /// Run one catalog query on its own lease.
    async fn fetch(&self, query: CatalogQuery) -> DbResult<NormalizedRows> {
        debug!(sql = %query.sql, params = query.params.len(), "Catalog query");
        let mut lease = SessionLease::acquire(self.provider.as_ref()).await?;
        let outcome = lease.query(&query.sql, &query.params).await;
        lease.release().await;
        let raw = outcome?.into_rows()?;
        Ok(self.normalizer.normalize(raw))
    }

    /// List tables, filtered by owner and the table allow-list.
    pub async fn list_tables(&self, owner: Option<&str>) -> DbResult<Vec<TableMetadata>> {
        let query = CatalogQuery::tables(owner_arg(owner), &self.policy.table_allow_list);
        let rows = self.fetch(query).await?;

        Ok(rows
            .views()
            .map(|row| {
                TableMetadata::new(
                    row.text("OWNER").unwrap_or_default(),
                    row.text("TABLE_NAME").unwrap_or_default(),
                )
                .with_num_rows(row.int("NUM_ROWS"))
                .with_last_analyzed(row.text("LAST_ANALYZED"))
                .with_comment(row.text("COMMENTS"))
                .with_tablespace(row.text("TABLESPACE_NAME"))
            })
            .collect())
    }

    /// List views, filtered by owner.
    pub async fn list_views(&self, owner: Option<&str>) -> DbResult<Vec<ViewMetadata>> {
        let rows = self.fetch(CatalogQuery::views(owner_arg(owner))).await?;

        Ok(rows
            .views()
            .map(|row| ViewMetadata {
                owner: row.text("OWNER").unwrap_or_default(),
                view_name: row.text("VIEW_NAME").unwrap_or_default(),
                view_comment: row.text("COMMENTS"),
            })
            .collect())
    }

    /// List procedures, functions and packages, filtered by owner.
    pub async fn list_procedures(&self, owner: Option<&str>) -> DbResult<Vec<ProcedureMetadata>> {
        let rows = self
            .fetch(CatalogQuery::procedures(owner_arg(owner)))
            .await?;

        Ok(rows
            .views()
            .filter_map(|row| {
                let object_type = row.text("OBJECT_TYPE")?;
                Some(ProcedureMetadata {
                    owner: row.text("OWNER").unwrap_or_default(),
                    object_name: row.text("OBJECT_NAME").unwrap_or_default(),
                    object_type: ProcedureKind::from_object_type(&object_type)?,
                    status: row.text("STATUS"),
                    created: row.text("CREATED"),
                    last_ddl_time: row.text("LAST_DDL_TIME"),
                })
            })
            .collect())
    }

    /// List the columns of one table in ordinal order.
    ///
    /// An unknown table yields an empty list. The column allow-list is applied
    /// after the fetch against `TABLE.COLUMN` keys.
    pub async fn list_columns(
        &self,
        table_name: &str,
        owner: Option<&str>,
    ) -> DbResult<Vec<ColumnMetadata>> {
        let table_name = table_name.trim();
        if table_name.is_empty() {
            return Err(DbError::invalid_input("table_name is required"));
        }

        let rows = self
            .fetch(CatalogQuery::columns(table_name, owner_arg(owner)))
            .await?;

        Ok(rows
            .views()
            .map(|row| ColumnMetadata {
                column_name: row.text("COLUMN_NAME").unwrap_or_default(),
                data_type: row.text("DATA_TYPE").unwrap_or_default(),
                data_length: row.int("DATA_LENGTH"),
                data_precision: row.int("DATA_PRECISION"),
                data_scale: row.int("DATA_SCALE"),
                nullable: row.text("NULLABLE").is_none_or(|n| n.eq_ignore_ascii_case("Y")),
                data_default: row.text("DATA_DEFAULT").map(|d| d.trim().to_string()),
                column_comment: row.text("COMMENTS"),
                column_id: row.int("COLUMN_ID").unwrap_or_default(),
            })
            .filter(|column| self.policy.column_allowed(table_name, &column.column_name))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_query_without_filters() {
        let query = CatalogQuery::tables(None, &[]);
        assert!(query.sql.contains("FROM all_tables t"));
        assert!(query.sql.ends_with("ORDER BY t.owner, t.table_name"));
        assert!(!query.sql.contains(":owner"));
        assert!(query.params.is_empty());
    }

    #[test]
    fn test_tables_query_with_owner_and_allow_list() {
        let allow = vec!["EMPLOYEES".to_string(), "DEPARTMENTS".to_string()];
        let query = CatalogQuery::tables(Some("HR"), &allow);
        assert!(query.sql.contains("AND t.owner = :owner"));
        assert!(query.sql.contains("AND t.table_name IN (:table_0, :table_1)"));
        // Positional binds follow placeholder order
        assert_eq!(
            query.params,
            vec![
                QueryParam::from("HR"),
                QueryParam::from("EMPLOYEES"),
                QueryParam::from("DEPARTMENTS"),
            ]
        );
    }

    #[test]
    fn test_columns_query_binds_table_then_owner() {
        let query = CatalogQuery::columns("EMPLOYEES", Some("HR"));
        assert!(query.sql.contains("WHERE c.table_name = :table_name AND c.owner = :owner"));
        assert!(query.sql.ends_with("ORDER BY c.column_id"));
        assert_eq!(
            query.params,
            vec![QueryParam::from("EMPLOYEES"), QueryParam::from("HR")]
        );
    }

    #[test]
    fn test_procedures_query_order() {
        let query = CatalogQuery::procedures(None);
        assert!(query.sql.contains("'PROCEDURE', 'FUNCTION', 'PACKAGE'"));
        assert!(query.sql.ends_with("ORDER BY owner, object_type, object_name"));
    }

    #[test]
    fn test_blank_owner_is_ignored() {
        assert_eq!(owner_arg(Some("  ")), None);
        assert_eq!(owner_arg(Some(" HR ")), Some("HR"));
        assert_eq!(owner_arg(None), None);
    }
}
