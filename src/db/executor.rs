//! Query execution engine.
//!
//! Every call runs the statement guard first, then leases one session, executes,
//! normalizes the rows and releases the session on every exit path. Rejected
//! statements never touch the pool.

use crate::config::QueryPolicy;
use crate::db::explain::ExplainPlanBuilder;
use crate::db::normalize::ResultNormalizer;
use crate::db::provider::{ConnectionProvider, RawOutcome, SessionLease};
use crate::error::DbResult;
use crate::models::{ExplainResult, QueryParam, QueryResult};
use crate::tools::guard::StatementGuard;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Query executor that handles guarded, row-limited statement execution.
pub struct QueryExecutor {
    provider: Arc<dyn ConnectionProvider>,
    policy: Arc<QueryPolicy>,
    guard: StatementGuard,
    normalizer: ResultNormalizer,
}

impl QueryExecutor {
    /// Create a new query executor.
    pub fn new(provider: Arc<dyn ConnectionProvider>, policy: Arc<QueryPolicy>) -> Self {
        Self {
            provider,
            policy,
            guard: StatementGuard::new(),
            normalizer: ResultNormalizer::new(),
        }
    }

    /// Execute a statement capped at the configured row limit.
    pub async fn execute(&self, sql: &str, params: &[QueryParam]) -> DbResult<QueryResult> {
        self.execute_with_limit(sql, params, self.policy.row_limit)
            .await
    }

    /// Execute a statement capped at the configured export limit.
    pub async fn execute_for_export(
        &self,
        sql: &str,
        params: &[QueryParam],
    ) -> DbResult<QueryResult> {
        self.execute_with_limit(sql, params, self.policy.max_export_rows)
            .await
    }

    /// Execute a statement with an explicit row limit.
    pub async fn execute_with_limit(
        &self,
        sql: &str,
        params: &[QueryParam],
        row_limit: u32,
    ) -> DbResult<QueryResult> {
        let rewritten = self.guard.classify_and_rewrite(sql, row_limit)?;

        debug!(
            sql = %rewritten,
            params = params.len(),
            limit = row_limit,
            "Executing query"
        );

        let mut lease = SessionLease::acquire(self.provider.as_ref()).await?;
        let result = self.run(&mut lease, &rewritten, params).await;
        lease.release().await;

        if let Ok(ref r) = result {
            info!(
                row_count = r.row_count,
                execution_time_ms = (r.execution_time * 1000.0) as u64,
                "Query completed"
            );
        }
        result
    }

    async fn run(
        &self,
        lease: &mut SessionLease,
        sql: &str,
        params: &[QueryParam],
    ) -> DbResult<QueryResult> {
        let start = Instant::now();
        let outcome = lease.query(sql, params).await?;

        match outcome {
            RawOutcome::Rows(raw) => {
                // Large objects may block while they are read.
                let normalizer = self.normalizer;
                let normalized =
                    tokio::task::spawn_blocking(move || normalizer.normalize(raw)).await?;
                let error = normalized.error_summary();
                let mut result = QueryResult::with_rows(
                    normalized.columns,
                    normalized.rows,
                    start.elapsed().as_secs_f64(),
                    sql,
                );
                result.error = error;
                Ok(result)
            }
            RawOutcome::Completed { .. } => Ok(QueryResult::message_only(
                start.elapsed().as_secs_f64(),
                sql,
            )),
        }
    }

    /// Build the execution plan for a statement.
    pub async fn explain(&self, sql: &str) -> DbResult<ExplainResult> {
        ExplainPlanBuilder::new(self.provider.clone())
            .explain(sql)
            .await
    }

    /// Get the active policy.
    pub fn policy(&self) -> &QueryPolicy {
        &self.policy
    }
}
