//! Connection integration tests.
//!
//! Tests session acquisition and connection error handling.

use nimbusdata::config::ConnectionDescriptor;
use nimbusdata::db::{self, Connector, MockConnector, SqlxConnector};
use nimbusdata::error::NimbusError;
use nimbusdata::query::{QueryExecutor, QueryRequest};
use std::time::Duration;

#[tokio::test(flavor = "current_thread")]
async fn test_connect_timeout_is_connection_error() {
    // Accepts TCP connections but never answers the startup handshake.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let descriptor = ConnectionDescriptor::new("postgres")
        .with_server(format!("127.0.0.1,{}", addr.port()))
        .with_database("testdb")
        .with_credentials("testuser", "testpass");
    let connector = SqlxConnector::new().with_timeout(Duration::from_millis(300));

    let err = QueryExecutor::new(&connector)
        .execute(&descriptor, &QueryRequest::new("SELECT 1"))
        .await
        .unwrap_err();

    assert!(matches!(err, NimbusError::Connection(_)), "got {err:?}");
    assert!(err.to_string().contains("timed out"));
    drop(listener);
}

#[tokio::test(flavor = "current_thread")]
async fn test_connect_refused_is_connection_error() {
    let descriptor = ConnectionDescriptor::new("postgres")
        .with_server("127.0.0.1:1")
        .with_database("testdb")
        .with_credentials("testuser", "testpass");

    let result = db::acquire(&descriptor).await;
    assert!(matches!(result, Err(NimbusError::Connection(_))));
}

#[tokio::test]
async fn test_missing_sqlite_file_is_connection_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.db");
    let descriptor = ConnectionDescriptor::new("sqlite").with_database(path.to_string_lossy());

    let result = db::acquire(&descriptor).await;
    assert!(matches!(result, Err(NimbusError::Connection(_))));
    assert!(!path.exists(), "database file must not be created implicitly");
}

#[tokio::test]
async fn test_unknown_driver_is_unexpected_error() {
    let descriptor = ConnectionDescriptor::new("{Oracle}").with_database("orders");

    let result = db::acquire(&descriptor).await;
    assert!(matches!(result, Err(NimbusError::Unexpected(_))));
}

#[tokio::test]
async fn test_braced_driver_name_is_accepted() {
    let descriptor = ConnectionDescriptor::new("{SQLite3}").with_database(":memory:");

    let session = SqlxConnector::new().acquire(&descriptor).await.unwrap();
    session.close().await.unwrap();
}

#[tokio::test]
async fn test_connection_failure_creates_no_session() {
    let connector = MockConnector::new().failing_connect("network unreachable");

    let err = QueryExecutor::new(&connector)
        .execute(&ConnectionDescriptor::default(), &QueryRequest::new("SELECT 1").committed())
        .await
        .unwrap_err();

    assert!(matches!(err, NimbusError::Connection(_)));
    let journal = connector.journal();
    assert_eq!(journal.connects, 1);
    assert_eq!(journal.executes, 0);
    assert_eq!(journal.rollbacks, 0);
    assert_eq!(journal.closes, 0);
}

#[tokio::test]
async fn test_connect_with_env_credentials() {
    let descriptor = ConnectionDescriptor::from_env();
    if descriptor.driver().is_none() {
        eprintln!("Skipping test: SQL_DRIVER not set");
        return;
    }

    let session = db::acquire(&descriptor).await.unwrap();
    session.close().await.unwrap();
}
