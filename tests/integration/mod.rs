//! Integration tests for NimbusData.

pub mod connection_test;
pub mod executor_test;
pub mod postgres_test;

use nimbusdata::config::ConnectionDescriptor;
use tempfile::TempDir;

/// Creates an SQLite database file with an `items` table and returns a
/// descriptor pointing at it. The directory must outlive the descriptor.
pub async fn sqlite_fixture() -> (TempDir, ConnectionDescriptor) {
    use sqlx::{Connection as _, Executor as _};

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("items.db");

    let options = sqlx::sqlite::SqliteConnectOptions::new()
        .filename(&path)
        .create_if_missing(true);
    let mut conn = sqlx::SqliteConnection::connect_with(&options).await.unwrap();
    conn.execute(
        "CREATE TABLE items (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            price REAL,
            image BLOB
        )",
    )
    .await
    .unwrap();
    conn.execute(
        "INSERT INTO items (id, name, price, image) VALUES
            (1, 'lamp', 19.5, X'DEADBEEF'),
            (2, 'desk', 120.0, NULL)",
    )
    .await
    .unwrap();
    conn.close().await.unwrap();

    let descriptor = ConnectionDescriptor::new("sqlite").with_database(path.to_string_lossy());
    (dir, descriptor)
}
