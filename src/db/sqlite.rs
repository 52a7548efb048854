//! SQLite session implementation.
//!
//! The descriptor's database field is the file path (or `:memory:`); the
//! server address and credentials do not apply and are ignored.

use crate::config::ConnectionDescriptor;
use crate::db::{
    map_connection_error, map_execution_error, ColumnInfo, Row, Session, StatementOutput, Value,
};
use crate::error::{NimbusError, Result};
use async_trait::async_trait;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{
    Column as _, Connection as _, Executor as _, Row as _, Statement as _, TypeInfo as _,
    ValueRef as _,
};
use std::str::FromStr;
use tracing::debug;

/// SQLite session.
#[derive(Debug)]
pub struct SqliteSession {
    conn: SqliteConnection,
}

impl SqliteSession {
    /// Opens an existing database file and starts the session's transaction.
    pub async fn connect(descriptor: &ConnectionDescriptor) -> Result<Self> {
        let options = connect_options(descriptor)?;
        let mut conn = SqliteConnection::connect_with(&options)
            .await
            .map_err(map_connection_error)?;

        conn.execute("BEGIN").await.map_err(map_connection_error)?;
        debug!("Opened SQLite session in manual-commit mode");

        Ok(Self { conn })
    }
}

fn connect_options(descriptor: &ConnectionDescriptor) -> Result<SqliteConnectOptions> {
    match descriptor.database().map(str::trim) {
        None | Some("") => Err(NimbusError::connection(
            "No SQLite database file configured",
        )),
        Some(":memory:") => {
            SqliteConnectOptions::from_str("sqlite::memory:").map_err(map_connection_error)
        }
        Some(path) => Ok(SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(false)),
    }
}

#[async_trait]
impl Session for SqliteSession {
    async fn execute(&mut self, statement: &str, params: &[Value]) -> Result<StatementOutput> {
        let prepared = self
            .conn
            .prepare(statement)
            .await
            .map_err(map_execution_error)?;
        let columns: Vec<ColumnInfo> = prepared
            .columns()
            .iter()
            .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
            .collect();

        let query = params
            .iter()
            .fold(sqlx::query(statement), |query, value| bind_value(query, value));
        let rows = query
            .fetch_all(&mut self.conn)
            .await
            .map_err(map_execution_error)?;

        if columns.is_empty() {
            return Ok(StatementOutput::no_columns());
        }

        let rows = rows
            .iter()
            .map(|row| convert_row(row, &columns))
            .collect::<Result<Vec<_>>>()?;
        Ok(StatementOutput::with_rows(columns, rows))
    }

    async fn commit(&mut self) -> Result<()> {
        self.conn
            .execute("COMMIT")
            .await
            .map_err(map_execution_error)?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.conn
            .execute("ROLLBACK")
            .await
            .map_err(map_execution_error)?;
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.conn.close().await.map_err(map_execution_error)
    }
}

fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &Value,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Int(i) => query.bind(*i),
        Value::Float(f) => query.bind(*f),
        Value::String(s) => query.bind(s.clone()),
        Value::Bytes(b) => query.bind(b.clone()),
    }
}

fn convert_row(row: &SqliteRow, columns: &[ColumnInfo]) -> Result<Row> {
    columns
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col))
        .collect()
}

/// SQLite is dynamically typed, so the storage class of each cell decides
/// the decoding. Declared BOOLEAN columns map integers back to booleans.
fn convert_value(row: &SqliteRow, index: usize, column: &ColumnInfo) -> Result<Value> {
    let decode_error = |e: sqlx::Error| {
        NimbusError::unexpected(format!(
            "Cannot decode column '{}' of type {}: {e}",
            column.name, column.data_type
        ))
    };

    let raw = row.try_get_raw(index).map_err(decode_error)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let storage_class = raw.type_info().name().to_uppercase();
    let declared = column.data_type.to_uppercase();

    let value = match (storage_class.as_str(), declared.as_str()) {
        ("INTEGER", "BOOLEAN") => row.try_get::<bool, _>(index).map(Value::Bool),
        ("INTEGER", _) => row.try_get::<i64, _>(index).map(Value::Int),
        ("REAL", _) => row.try_get::<f64, _>(index).map(Value::Float),
        ("BLOB", _) => row.try_get::<Vec<u8>, _>(index).map(Value::Bytes),
        _ => row.try_get::<String, _>(index).map(Value::String),
    };

    value.map_err(decode_error)
}
