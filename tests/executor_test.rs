//! Integration tests for guarded query execution.

mod common;

use common::{Cell, FakeProvider, Reply};
use oracle_mcp_server::config::QueryPolicy;
use oracle_mcp_server::db::QueryExecutor;
use oracle_mcp_server::error::DbError;
use oracle_mcp_server::models::{NO_RESULT_SET_MESSAGE, QueryParam};
use serde_json::json;
use std::sync::Arc;

fn executor(provider: &FakeProvider) -> QueryExecutor {
    QueryExecutor::new(provider.shared(), Arc::new(QueryPolicy::default()))
}

fn executor_with(provider: &FakeProvider, row_limit: u32, max_export_rows: u32) -> QueryExecutor {
    let policy = QueryPolicy::new(row_limit, max_export_rows, &[], &[]).unwrap();
    QueryExecutor::new(provider.shared(), Arc::new(policy))
}

#[tokio::test]
async fn test_drop_never_reaches_the_pool() {
    let provider = FakeProvider::unreachable();
    let err = executor(&provider)
        .execute("DROP TABLE t", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::UnsafeStatement { .. }));
    assert_eq!(
        err.to_string(),
        "Only SELECT, DESCRIBE, and EXPLAIN PLAN statements are allowed"
    );
}

#[tokio::test]
async fn test_select_is_capped_at_row_limit() {
    let provider = FakeProvider::new().on(
        "FROM t",
        Reply::rows(&["ID"], vec![vec![Cell::Int(1)], vec![Cell::Int(2)]]),
    );
    let result = executor(&provider)
        .execute("SELECT id FROM t", &[])
        .await
        .unwrap();

    assert_eq!(
        provider.executed_sql(),
        vec!["SELECT id FROM t WHERE ROWNUM <= 100"]
    );
    assert_eq!(result.rewritten_sql, "SELECT id FROM t WHERE ROWNUM <= 100");
    assert_eq!(result.columns, vec!["ID"]);
    assert_eq!(result.rows, vec![vec![json!(1)], vec![json!(2)]]);
    assert_eq!(result.row_count, 2);
    assert!(result.execution_time >= 0.0);
    assert_eq!(provider.acquired(), 1);
    assert_eq!(provider.released(), 1);
}

#[tokio::test]
async fn test_custom_row_limit_is_applied() {
    let provider = FakeProvider::new();
    executor_with(&provider, 50, 1000)
        .execute("SELECT * FROM employees WHERE department_id = :1", &[QueryParam::Int(10)])
        .await
        .unwrap();

    let executed = provider.executed();
    assert_eq!(
        executed[0].0,
        "SELECT * FROM employees WHERE department_id = :1 AND ROWNUM <= 50"
    );
    assert_eq!(executed[0].1, vec![QueryParam::Int(10)]);
}

#[tokio::test]
async fn test_existing_rownum_is_sent_unchanged() {
    let provider = FakeProvider::new();
    executor(&provider)
        .execute("SELECT * FROM t WHERE ROWNUM <= 5", &[])
        .await
        .unwrap();
    assert_eq!(provider.executed_sql(), vec!["SELECT * FROM t WHERE ROWNUM <= 5"]);
}

#[tokio::test]
async fn test_export_uses_export_limit() {
    let provider = FakeProvider::new();
    executor_with(&provider, 100, 5000)
        .execute_for_export("SELECT * FROM t ORDER BY id", &[])
        .await
        .unwrap();
    assert_eq!(
        provider.executed_sql(),
        vec!["SELECT * FROM (SELECT * FROM t ORDER BY id) WHERE ROWNUM <= 5000"]
    );
}

#[tokio::test]
async fn test_backend_error_still_releases_session() {
    let provider = FakeProvider::new().on("FROM missing", Reply::fail("ORA-00942: table or view does not exist"));
    let err = executor(&provider)
        .execute("SELECT * FROM missing", &[])
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "ORA-00942: table or view does not exist");
    assert!(err.suggestion().is_some());
    assert_eq!(provider.acquired(), 1);
    assert_eq!(provider.released(), 1);
}

#[tokio::test]
async fn test_statement_without_column_set_returns_message() {
    let provider = FakeProvider::new().on("DESCRIBE", Reply::Completed);
    let result = executor(&provider)
        .execute("DESCRIBE employees", &[])
        .await
        .unwrap();

    assert_eq!(result.message.as_deref(), Some(NO_RESULT_SET_MESSAGE));
    assert!(result.columns.is_empty());
    assert!(result.rows.is_empty());
    assert_eq!(result.row_count, 0);
}

#[tokio::test]
async fn test_values_are_normalized() {
    let provider = FakeProvider::new().on(
        "FROM docs",
        Reply::rows(
            &["ID", "PRICE", "BODY", "NOTE"],
            vec![vec![
                Cell::Number("7".into()),
                Cell::Number("19.5".into()),
                Cell::Clob("long text".into()),
                Cell::Null,
            ]],
        ),
    );
    let result = executor(&provider)
        .execute("SELECT id, price, body, note FROM docs", &[])
        .await
        .unwrap();

    assert_eq!(
        result.rows,
        vec![vec![json!(7), json!(19.5), json!("long text"), json!(null)]]
    );
    assert!(result.error.is_none());
}

#[tokio::test]
async fn test_unreadable_lob_becomes_null_with_error() {
    let provider = FakeProvider::new().on(
        "FROM docs",
        Reply::rows(&["ID", "BODY"], vec![vec![Cell::Int(1), Cell::BrokenLob]]),
    );
    let result = executor(&provider)
        .execute("SELECT id, body FROM docs", &[])
        .await
        .unwrap();

    assert_eq!(result.rows, vec![vec![json!(1), json!(null)]]);
    let error = result.error.unwrap();
    assert!(error.contains("BODY"), "{error}");
    assert!(error.contains("ORA-22922"), "{error}");
}

#[tokio::test]
async fn test_concurrent_calls_use_separate_sessions() {
    let provider = FakeProvider::new();
    let executor = Arc::new(executor(&provider));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let executor = executor.clone();
            tokio::spawn(async move {
                executor
                    .execute(&format!("SELECT {i} FROM dual"), &[])
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(provider.acquired(), 8);
    assert_eq!(provider.released(), 8);
}
