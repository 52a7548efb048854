//! Query executor integration tests against SQLite files.

use super::sqlite_fixture;
use nimbusdata::db::{SqlxConnector, Value};
use nimbusdata::error::NimbusError;
use nimbusdata::query::{self, QueryExecutor, QueryRequest};
use pretty_assertions::assert_eq;
use serde_json::json;

#[tokio::test]
async fn test_select_returns_rows_in_column_order() {
    let (_dir, descriptor) = sqlite_fixture().await;

    let rows = query::execute(&descriptor, "SELECT id, name FROM items ORDER BY id", &[], false)
        .await
        .unwrap();

    assert_eq!(rows.columns(), ["id", "name"]);
    assert_eq!(
        serde_json::to_value(&rows).unwrap(),
        json!([{ "id": 1, "name": "lamp" }, { "id": 2, "name": "desk" }])
    );
}

#[tokio::test]
async fn test_select_star_renders_blob_as_base64() {
    let (_dir, descriptor) = sqlite_fixture().await;

    let rows = query::execute(&descriptor, "SELECT * FROM items ORDER BY id", &[], false)
        .await
        .unwrap();

    assert_eq!(rows.columns(), ["id", "name", "price", "image"]);
    let first = rows.row(0).unwrap();
    assert_eq!(first.get("image"), Some(&Value::String("3q2+7w==".to_string())));
    assert_eq!(first.get("price"), Some(&Value::Float(19.5)));
    assert_eq!(rows.row(1).unwrap().get("image"), Some(&Value::Null));
}

#[tokio::test]
async fn test_parameterized_select() {
    let (_dir, descriptor) = sqlite_fixture().await;

    let rows = query::execute(
        &descriptor,
        "SELECT name FROM items WHERE price > ?",
        &[Value::Float(100.0)],
        false,
    )
    .await
    .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows.row(0).unwrap().get("name"), Some(&Value::from("desk")));
}

#[tokio::test]
async fn test_committed_insert_persists() {
    let (_dir, descriptor) = sqlite_fixture().await;
    let connector = SqlxConnector::new();
    let executor = QueryExecutor::new(&connector);

    let insert = QueryRequest::new("INSERT INTO items (id, name) VALUES (?, ?)")
        .bind(3)
        .bind("chair")
        .committed();
    let rows = executor.execute(&descriptor, &insert).await.unwrap();
    assert!(rows.is_empty());
    assert!(rows.columns().is_empty());

    let count = executor
        .execute(&descriptor, &QueryRequest::new("SELECT COUNT(*) AS n FROM items"))
        .await
        .unwrap();
    assert_eq!(count.row(0).unwrap().get("n"), Some(&Value::Int(3)));
}

#[tokio::test]
async fn test_uncommitted_insert_is_discarded() {
    let (_dir, descriptor) = sqlite_fixture().await;

    query::execute(
        &descriptor,
        "INSERT INTO items (id, name) VALUES (?, ?)",
        &[Value::Int(3), Value::from("chair")],
        false,
    )
    .await
    .unwrap();

    let count = query::execute(&descriptor, "SELECT COUNT(*) AS n FROM items", &[], false)
        .await
        .unwrap();
    assert_eq!(count.row(0).unwrap().get("n"), Some(&Value::Int(2)));
}

#[tokio::test]
async fn test_constraint_violation_is_execution_error_and_rolled_back() {
    let (_dir, descriptor) = sqlite_fixture().await;

    let err = query::execute(
        &descriptor,
        "INSERT INTO items (id, name) VALUES (?, ?)",
        &[Value::Int(1), Value::from("duplicate")],
        true,
    )
    .await
    .unwrap_err();

    assert!(err.is_execution(), "expected execution error, got {err:?}");
    assert!(err.sqlstate().is_some());

    let rows = query::execute(&descriptor, "SELECT name FROM items WHERE id = 1", &[], false)
        .await
        .unwrap();
    assert_eq!(rows.row(0).unwrap().get("name"), Some(&Value::from("lamp")));
}

#[tokio::test]
async fn test_syntax_error_is_execution_error() {
    let (_dir, descriptor) = sqlite_fixture().await;

    let err = query::execute(&descriptor, "SELEC nonsense", &[], false)
        .await
        .unwrap_err();

    assert!(matches!(err, NimbusError::Execution { .. }));
}

#[tokio::test]
async fn test_execute_json() {
    let (_dir, descriptor) = sqlite_fixture().await;
    let connector = SqlxConnector::new();

    let body = QueryExecutor::new(&connector)
        .execute_json(
            &descriptor,
            &QueryRequest::new("SELECT name FROM items WHERE id = ?").bind(2),
        )
        .await
        .unwrap();

    assert_eq!(body, r#"[{"name":"desk"}]"#);
}
