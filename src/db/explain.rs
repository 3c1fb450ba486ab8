//! Execution plan extraction.
//!
//! `EXPLAIN PLAN` writes one row per plan step into `plan_table`, keyed by a
//! statement id. The builder mints a fresh id, reads the rows back, rebuilds the
//! tree in pre-order and deletes the rows again on the same session.

use crate::db::normalize::{NormalizedRows, ResultNormalizer};
use crate::db::provider::{ConnectionProvider, SessionLease};
use crate::error::{DbError, DbResult};
use crate::models::{ExplainResult, PlanNode, QueryParam};
use crate::tools::guard::strip_terminator;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Prefix of every statement id written to `plan_table`.
pub const STATEMENT_ID_PREFIX: &str = "MCP_EXPLAIN_";

mod queries {
    pub const PLAN_ROWS: &str = "SELECT id, parent_id, operation, options, object_name, \
         cost, cardinality, bytes \
         FROM plan_table \
         WHERE statement_id = :statement_id \
         ORDER BY id";

    pub const DELETE_PLAN: &str = "DELETE FROM plan_table WHERE statement_id = :statement_id";

    pub fn explain(statement_id: &str, sql: &str) -> String {
        format!("EXPLAIN PLAN SET STATEMENT_ID = '{statement_id}' FOR {sql}")
    }
}

/// Mint a statement id.
///
/// `MCP_EXPLAIN_` + `yymmddHHMMSS` + 6 random hex digits, 30 characters, which is the
/// width of `plan_table.statement_id`. The random suffix separates calls made within
/// the same second.
pub fn new_statement_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}{}{}",
        STATEMENT_ID_PREFIX,
        Utc::now().format("%y%m%d%H%M%S"),
        suffix[..6].to_uppercase()
    )
}

/// One `plan_table` row before tree reconstruction.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatPlanRow {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub operation: String,
    pub options: Option<String>,
    pub object_name: Option<String>,
    pub cost: Option<f64>,
    pub cardinality: Option<f64>,
    pub bytes: Option<f64>,
}

impl FlatPlanRow {
    fn from_rows(rows: &NormalizedRows) -> Vec<Self> {
        rows.views()
            .filter_map(|row| {
                Some(Self {
                    id: row.int("ID")?,
                    parent_id: row.int("PARENT_ID"),
                    operation: row.text("OPERATION").unwrap_or_default(),
                    options: row.text("OPTIONS"),
                    object_name: row.text("OBJECT_NAME"),
                    cost: row.float("COST"),
                    cardinality: row.float("CARDINALITY"),
                    bytes: row.float("BYTES"),
                })
            })
            .collect()
    }

    fn operation_text(&self) -> String {
        match self.options.as_deref().map(str::trim) {
            Some(options) if !options.is_empty() => format!("{} {}", self.operation, options),
            _ => self.operation.clone(),
        }
    }
}

/// Rebuild the plan tree in pre-order.
///
/// Traversal starts at rows without a parent and follows `parent_id -> id` edges,
/// visiting siblings in id order. Rows not reachable from a root are dropped.
pub fn build_plan(rows: Vec<FlatPlanRow>) -> Vec<PlanNode> {
    let ids: HashSet<i64> = rows.iter().map(|r| r.id).collect();
    let mut children: HashMap<Option<i64>, Vec<usize>> = HashMap::new();
    for (idx, row) in rows.iter().enumerate() {
        // A parent that is not in the set makes the row unreachable, not a root.
        let key = match row.parent_id {
            Some(p) if ids.contains(&p) => Some(p),
            Some(_) => continue,
            None => None,
        };
        children.entry(key).or_default().push(idx);
    }
    for list in children.values_mut() {
        list.sort_by_key(|&idx| rows[idx].id);
    }

    let mut plan = Vec::with_capacity(rows.len());
    let mut visited = HashSet::new();
    let mut stack: Vec<(usize, usize)> = children
        .get(&None)
        .map(|roots| roots.iter().rev().map(|&idx| (idx, 0)).collect())
        .unwrap_or_default();

    while let Some((idx, depth)) = stack.pop() {
        let row = &rows[idx];
        if !visited.insert(row.id) {
            continue;
        }
        plan.push(PlanNode {
            id: row.id,
            parent_id: row.parent_id,
            operation: row.operation_text(),
            object_name: row.object_name.clone(),
            cost: row.cost,
            cardinality: row.cardinality,
            bytes: row.bytes,
            depth,
        });
        if let Some(kids) = children.get(&Some(row.id)) {
            stack.extend(kids.iter().rev().map(|&kid| (kid, depth + 1)));
        }
    }
    plan
}

/// Builds execution plans through `plan_table`.
pub struct ExplainPlanBuilder {
    provider: Arc<dyn ConnectionProvider>,
    normalizer: ResultNormalizer,
}

impl ExplainPlanBuilder {
    pub fn new(provider: Arc<dyn ConnectionProvider>) -> Self {
        Self {
            provider,
            normalizer: ResultNormalizer::new(),
        }
    }

    /// Explain `sql` and return the plan in pre-order.
    ///
    /// Plan rows are deleted and committed whether or not planning succeeded. A failed
    /// cleanup is logged and does not fail the call.
    pub async fn explain(&self, sql: &str) -> DbResult<ExplainResult> {
        let statement = strip_terminator(sql);
        if statement.is_empty() {
            return Err(DbError::invalid_input("SQL statement is empty"));
        }

        let statement_id = new_statement_id();
        debug!(statement_id = %statement_id, "Explaining statement");

        let mut lease = SessionLease::acquire(self.provider.as_ref()).await?;
        let plan = self.generate(&mut lease, statement, &statement_id).await;
        if let Err(e) = self.cleanup(&mut lease, &statement_id).await {
            warn!(
                statement_id = %statement_id,
                error = %e,
                "Failed to clear plan_table rows"
            );
        }
        lease.release().await;

        Ok(ExplainResult {
            execution_plan: plan?,
            statement_id,
        })
    }

    async fn generate(
        &self,
        lease: &mut SessionLease,
        sql: &str,
        statement_id: &str,
    ) -> DbResult<Vec<PlanNode>> {
        lease
            .query(&queries::explain(statement_id, sql), &[])
            .await?;

        let raw = lease
            .query(queries::PLAN_ROWS, &[QueryParam::from(statement_id)])
            .await?
            .into_rows()?;
        let rows = self.normalizer.normalize(raw);
        Ok(build_plan(FlatPlanRow::from_rows(&rows)))
    }

    async fn cleanup(&self, lease: &mut SessionLease, statement_id: &str) -> DbResult<()> {
        lease
            .query(queries::DELETE_PLAN, &[QueryParam::from(statement_id)])
            .await?;
        lease.commit().await
    }
}
