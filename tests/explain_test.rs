//! Integration tests for execution plans via plan_table.

mod common;

use common::{Cell, FakeProvider, Reply};
use oracle_mcp_server::db::ExplainPlanBuilder;
use oracle_mcp_server::db::explain::STATEMENT_ID_PREFIX;
use oracle_mcp_server::error::DbError;
use oracle_mcp_server::models::QueryParam;

const PLAN_COLUMNS: &[&str] = &[
    "ID",
    "PARENT_ID",
    "OPERATION",
    "OPTIONS",
    "OBJECT_NAME",
    "COST",
    "CARDINALITY",
    "BYTES",
];

fn plan_step(id: i64, parent: Option<i64>, op: &str, options: Option<&str>, object: Option<&str>) -> Vec<Cell> {
    vec![
        Cell::Int(id),
        parent.map_or(Cell::Null, Cell::Int),
        Cell::text(op),
        options.map_or(Cell::Null, Cell::text),
        object.map_or(Cell::Null, Cell::text),
        Cell::Number("3".into()),
        Cell::Number("14".into()),
        Cell::Number("532".into()),
    ]
}

fn scripted_plan() -> FakeProvider {
    FakeProvider::new()
        .on("DELETE FROM plan_table", Reply::Completed)
        .on("EXPLAIN PLAN", Reply::Completed)
        .on(
            "FROM plan_table",
            Reply::rows(
                PLAN_COLUMNS,
                vec![
                    plan_step(0, None, "SELECT STATEMENT", None, None),
                    plan_step(1, Some(0), "HASH JOIN", None, None),
                    plan_step(2, Some(1), "TABLE ACCESS", Some("FULL"), Some("DEPARTMENTS")),
                    plan_step(3, Some(1), "TABLE ACCESS", Some("FULL"), Some("EMPLOYEES")),
                ],
            ),
        )
}

#[tokio::test]
async fn test_explain_returns_plan_in_tree_order() {
    let provider = scripted_plan();
    let result = ExplainPlanBuilder::new(provider.shared())
        .explain("SELECT * FROM employees e JOIN departments d ON e.department_id = d.department_id")
        .await
        .unwrap();

    let ops: Vec<String> = result
        .execution_plan
        .iter()
        .map(|n| n.indented_operation())
        .collect();
    assert_eq!(
        ops,
        vec![
            "SELECT STATEMENT",
            "  HASH JOIN",
            "    TABLE ACCESS FULL",
            "    TABLE ACCESS FULL",
        ]
    );
    assert_eq!(result.execution_plan[3].object_name.as_deref(), Some("EMPLOYEES"));
    assert_eq!(result.execution_plan[0].cost, Some(3.0));
    assert!(result.statement_id.starts_with(STATEMENT_ID_PREFIX));
}

#[tokio::test]
async fn test_explain_issues_plan_read_delete_and_commit() {
    let provider = scripted_plan();
    let result = ExplainPlanBuilder::new(provider.shared())
        .explain("SELECT * FROM employees;")
        .await
        .unwrap();

    let executed = provider.executed();
    assert_eq!(executed.len(), 3);
    assert_eq!(
        executed[0].0,
        format!(
            "EXPLAIN PLAN SET STATEMENT_ID = '{}' FOR SELECT * FROM employees",
            result.statement_id
        )
    );
    let id_bind = vec![QueryParam::from(result.statement_id.as_str())];
    assert!(executed[1].0.contains("FROM plan_table"));
    assert_eq!(executed[1].1, id_bind);
    assert!(executed[2].0.starts_with("DELETE FROM plan_table"));
    assert_eq!(executed[2].1, id_bind);
    assert_eq!(provider.commits(), 1);
    assert_eq!(provider.acquired(), 1);
    assert_eq!(provider.released(), 1);
}

#[tokio::test]
async fn test_failed_plan_still_cleans_up() {
    let provider = FakeProvider::new()
        .on("DELETE FROM plan_table", Reply::Completed)
        .on("EXPLAIN PLAN", Reply::fail("ORA-00942: table or view does not exist"));

    let err = ExplainPlanBuilder::new(provider.shared())
        .explain("SELECT * FROM no_such_table")
        .await
        .unwrap_err();

    assert!(matches!(err, DbError::Backend { .. }));
    let executed = provider.executed_sql();
    assert!(executed.last().unwrap().starts_with("DELETE FROM plan_table"));
    assert_eq!(provider.commits(), 1);
    assert_eq!(provider.released(), 1);
}

#[tokio::test]
async fn test_cleanup_failure_does_not_fail_the_call() {
    let provider = scripted_plan().failing_commit();
    let result = ExplainPlanBuilder::new(provider.shared())
        .explain("SELECT * FROM employees")
        .await
        .unwrap();

    assert_eq!(result.execution_plan.len(), 4);
    assert_eq!(provider.released(), 1);
}

#[tokio::test]
async fn test_empty_statement_is_rejected_without_a_session() {
    let provider = FakeProvider::unreachable();
    let err = ExplainPlanBuilder::new(provider.shared())
        .explain("  ;  ")
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::InvalidInput { .. }));
}

#[tokio::test]
async fn test_statement_ids_are_distinct() {
    let provider = scripted_plan();
    let builder = ExplainPlanBuilder::new(provider.shared());
    let (a, b) = tokio::join!(
        builder.explain("SELECT 1 FROM dual"),
        builder.explain("SELECT 2 FROM dual")
    );
    assert_ne!(a.unwrap().statement_id, b.unwrap().statement_id);
}
