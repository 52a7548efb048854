//! Query executor integration tests against PostgreSQL.
//!
//! Skipped unless `SQL_DRIVER=postgres` and the other `SQL_*` variables point
//! at a reachable server. Each test works on its own table.

use nimbusdata::config::ConnectionDescriptor;
use nimbusdata::db::{DatabaseBackend, Value};
use nimbusdata::query;
use pretty_assertions::assert_eq;
use serde_json::json;

fn get_test_descriptor() -> Option<ConnectionDescriptor> {
    let descriptor = ConnectionDescriptor::from_env();
    match descriptor.driver().and_then(DatabaseBackend::parse) {
        Some(DatabaseBackend::Postgres) => Some(descriptor),
        _ => None,
    }
}

/// Creates `name (id INTEGER PRIMARY KEY, name TEXT NOT NULL)` seeded with
/// `(1,'a')` and `(2,'b')`, and returns the unique table name.
async fn seeded_table(descriptor: &ConnectionDescriptor, label: &str) -> String {
    let table = format!("nimbus_it_{label}_{}", std::process::id());

    query::execute(descriptor, &format!("DROP TABLE IF EXISTS {table}"), &[], true)
        .await
        .unwrap();
    query::execute(
        descriptor,
        &format!("CREATE TABLE {table} (id INTEGER PRIMARY KEY, name TEXT NOT NULL)"),
        &[],
        true,
    )
    .await
    .unwrap();
    query::execute(
        descriptor,
        &format!("INSERT INTO {table} VALUES (1, 'a'), (2, 'b')"),
        &[],
        true,
    )
    .await
    .unwrap();

    table
}

async fn drop_table(descriptor: &ConnectionDescriptor, table: &str) {
    query::execute(descriptor, &format!("DROP TABLE IF EXISTS {table}"), &[], true)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_postgres_select_returns_rows_in_column_order() {
    let Some(descriptor) = get_test_descriptor() else {
        eprintln!("Skipping test: SQL_DRIVER is not postgres");
        return;
    };
    let table = seeded_table(&descriptor, "select").await;

    let rows = query::execute(
        &descriptor,
        &format!("SELECT * FROM {table} ORDER BY id"),
        &[],
        false,
    )
    .await
    .unwrap();

    assert_eq!(
        serde_json::to_value(&rows).unwrap(),
        json!([{ "id": 1, "name": "a" }, { "id": 2, "name": "b" }])
    );
    drop_table(&descriptor, &table).await;
}

#[tokio::test]
async fn test_postgres_committed_insert_with_untyped_placeholders() {
    let Some(descriptor) = get_test_descriptor() else {
        eprintln!("Skipping test: SQL_DRIVER is not postgres");
        return;
    };
    let table = seeded_table(&descriptor, "insert").await;

    let rows = query::execute(
        &descriptor,
        &format!("INSERT INTO {table} VALUES ($1, $2)"),
        &[Value::Int(3), Value::from("c")],
        true,
    )
    .await
    .unwrap();
    assert!(rows.is_empty());

    let rows = query::execute(
        &descriptor,
        &format!("SELECT name FROM {table} WHERE id = $1"),
        &[Value::Int(3)],
        false,
    )
    .await
    .unwrap();
    assert_eq!(rows.row(0).unwrap().get("name"), Some(&Value::from("c")));
    drop_table(&descriptor, &table).await;
}

#[tokio::test]
async fn test_postgres_uncommitted_insert_is_discarded() {
    let Some(descriptor) = get_test_descriptor() else {
        eprintln!("Skipping test: SQL_DRIVER is not postgres");
        return;
    };
    let table = seeded_table(&descriptor, "discard").await;

    query::execute(
        &descriptor,
        &format!("INSERT INTO {table} VALUES ($1, $2)"),
        &[Value::Int(3), Value::from("c")],
        false,
    )
    .await
    .unwrap();

    let rows = query::execute(
        &descriptor,
        &format!("SELECT COUNT(*) AS n FROM {table}"),
        &[],
        false,
    )
    .await
    .unwrap();
    assert_eq!(rows.row(0).unwrap().get("n"), Some(&Value::Int(2)));
    drop_table(&descriptor, &table).await;
}

#[tokio::test]
async fn test_postgres_constraint_violation_is_rolled_back() {
    let Some(descriptor) = get_test_descriptor() else {
        eprintln!("Skipping test: SQL_DRIVER is not postgres");
        return;
    };
    let table = seeded_table(&descriptor, "conflict").await;

    let err = query::execute(
        &descriptor,
        &format!("INSERT INTO {table} VALUES ($1, $2)"),
        &[Value::Int(1), Value::from("duplicate")],
        true,
    )
    .await
    .unwrap_err();

    assert!(err.is_execution(), "expected execution error, got {err:?}");
    assert_eq!(err.sqlstate(), Some("23505"));

    let rows = query::execute(
        &descriptor,
        &format!("SELECT name FROM {table} WHERE id = $1"),
        &[Value::Int(1)],
        false,
    )
    .await
    .unwrap();
    assert_eq!(rows.row(0).unwrap().get("name"), Some(&Value::from("a")));
    drop_table(&descriptor, &table).await;
}

#[tokio::test]
async fn test_postgres_numeric_price_reaches_catalog_records() {
    #[derive(Debug, serde::Deserialize, PartialEq)]
    struct Priced {
        price: Option<f64>,
    }

    let Some(descriptor) = get_test_descriptor() else {
        eprintln!("Skipping test: SQL_DRIVER is not postgres");
        return;
    };

    let rows = query::execute(
        &descriptor,
        "SELECT 7.19::numeric(10, 2) AS price, 5.25::money AS fee",
        &[],
        false,
    )
    .await
    .unwrap();

    assert_eq!(rows.row(0).unwrap().get("fee"), Some(&Value::Float(5.25)));
    let records: Vec<Priced> = rows.to_records().unwrap();
    assert_eq!(records, vec![Priced { price: Some(7.19) }]);
}
