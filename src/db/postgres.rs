//! PostgreSQL session implementation.
//!
//! Provides `PostgresSession`, a single `PgConnection` opened inside an
//! explicit transaction so that writes persist only on `commit`.

use crate::config::ConnectionDescriptor;
use crate::db::{
    map_connection_error, map_execution_error, split_server_address, ColumnInfo, DatabaseBackend,
    Row, Session, StatementOutput, Value,
};
use crate::error::{NimbusError, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use sqlx::postgres::types::{Oid, PgInterval, PgMoney};
use sqlx::postgres::{
    PgArguments, PgConnectOptions, PgConnection, PgRow, PgTypeInfo, PgValueFormat, Postgres,
};
use sqlx::query::Query;
use sqlx::types::chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::types::{BigDecimal, JsonValue, Uuid};
use sqlx::{
    Column as _, Connection as _, Executor as _, Row as _, Statement as _, Type, TypeInfo as _,
    ValueRef as _,
};
use std::net::IpAddr;
use tracing::debug;

/// PostgreSQL session.
#[derive(Debug)]
pub struct PostgresSession {
    conn: PgConnection,
}

impl PostgresSession {
    /// Connects and opens the session's transaction.
    pub async fn connect(descriptor: &ConnectionDescriptor) -> Result<Self> {
        let options = connect_options(descriptor)?;
        let mut conn = PgConnection::connect_with(&options)
            .await
            .map_err(map_connection_error)?;

        conn.execute("BEGIN").await.map_err(map_connection_error)?;
        debug!("Opened PostgreSQL session in manual-commit mode");

        Ok(Self { conn })
    }
}

/// Builds connect options from the descriptor; unset fields fall back to
/// the libpq environment defaults.
fn connect_options(descriptor: &ConnectionDescriptor) -> Result<PgConnectOptions> {
    let mut options = PgConnectOptions::new();

    if let Some(server) = descriptor.server() {
        let (host, port) = split_server_address(server)?;
        options = options.host(&host);
        if let Some(port) = port.or(DatabaseBackend::Postgres.default_port()) {
            options = options.port(port);
        }
    }
    if let Some(database) = descriptor.database() {
        options = options.database(database);
    }
    if let Some(username) = descriptor.username() {
        options = options.username(username);
    }
    if let Some(password) = descriptor.password() {
        options = options.password(password);
    }

    Ok(options)
}

#[async_trait]
impl Session for PostgresSession {
    async fn execute(&mut self, statement: &str, params: &[Value]) -> Result<StatementOutput> {
        // The prepared statement is cached by SQL text, so its parameter
        // types must match what `bind_value` sends.
        let types = param_types(params);
        let prepared = self
            .conn
            .prepare_with(statement, &types)
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

        let rows = rows.iter().map(convert_row).collect::<Result<Vec<_>>>()?;
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

/// Declared parameter types, one per bound value.
///
/// NULL is left unspecified (OID 0) so the server infers the slot's type.
fn param_types(params: &[Value]) -> Vec<PgTypeInfo> {
    params
        .iter()
        .map(|value| match value {
            Value::Null => PgTypeInfo::with_oid(Oid(0)),
            Value::Bool(_) => <bool as Type<Postgres>>::type_info(),
            Value::Int(_) => <i64 as Type<Postgres>>::type_info(),
            Value::Float(_) => <f64 as Type<Postgres>>::type_info(),
            Value::String(_) => <String as Type<Postgres>>::type_info(),
            Value::Bytes(_) => <Vec<u8> as Type<Postgres>>::type_info(),
        })
        .collect()
}

/// Binds one parameter with the closest Postgres type.
fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &Value,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Int(i) => query.bind(*i),
        Value::Float(f) => query.bind(*f),
        Value::String(s) => query.bind(s.clone()),
        Value::Bytes(b) => query.bind(b.clone()),
    }
}

/// Converts a sqlx PgRow to our Row type.
fn convert_row(row: &PgRow) -> Result<Row> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.name(), col.type_info().name()))
        .collect()
}

/// Converts a single column value from a PgRow to our Value type.
fn convert_value(row: &PgRow, index: usize, name: &str, type_name: &str) -> Result<Value> {
    let decode_error = |e: sqlx::Error| {
        NimbusError::unexpected(format!(
            "Cannot decode column '{name}' of type {type_name}: {e}"
        ))
    };

    let value = match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => row.try_get::<Option<bool>, _>(index).map(Value::from),
        "INT2" | "SMALLINT" => row
            .try_get::<Option<i16>, _>(index)
            .map(|v| Value::from(v.map(i64::from))),
        "INT4" | "INT" | "INTEGER" => row.try_get::<Option<i32>, _>(index).map(Value::from),
        "INT8" | "BIGINT" => row.try_get::<Option<i64>, _>(index).map(Value::from),
        "FLOAT4" | "REAL" => row
            .try_get::<Option<f32>, _>(index)
            .map(|v| Value::from(v.map(f64::from))),
        "FLOAT8" | "DOUBLE PRECISION" => row.try_get::<Option<f64>, _>(index).map(Value::from),
        "BYTEA" => row.try_get::<Option<Vec<u8>>, _>(index).map(Value::from),
        "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(index)
            .map(|v| Value::from(v.map(|t| t.to_string()))),
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(index)
            .map(|v| Value::from(v.map(|t| t.to_rfc3339()))),
        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(index)
            .map(|v| Value::from(v.map(|d| d.to_string()))),
        "TIME" => row
            .try_get::<Option<NaiveTime>, _>(index)
            .map(|v| Value::from(v.map(|t| t.to_string()))),
        "UUID" => row
            .try_get::<Option<Uuid>, _>(index)
            .map(|v| Value::from(v.map(|u| u.to_string()))),
        "JSON" | "JSONB" => row
            .try_get::<Option<JsonValue>, _>(index)
            .map(|v| Value::from(v.map(|j| j.to_string()))),
        "NUMERIC" => row
            .try_get::<Option<BigDecimal>, _>(index)
            .map(|v| v.map(numeric_value).unwrap_or_default()),
        "MONEY" => row
            .try_get::<Option<PgMoney>, _>(index)
            .map(|v| v.map(money_value).unwrap_or_default()),
        "OID" => row
            .try_get::<Option<Oid>, _>(index)
            .map(|v| Value::from(v.map(|oid| i64::from(oid.0)))),
        "INTERVAL" => row
            .try_get::<Option<PgInterval>, _>(index)
            .map(|v| Value::from(v.as_ref().map(render_interval))),
        "INT2[]" | "INT4[]" | "INT8[]" => row
            .try_get::<Option<Vec<Option<i64>>>, _>(index)
            .or_else(|_| {
                row.try_get::<Option<Vec<Option<i32>>>, _>(index)
                    .map(|v| v.map(|a| a.into_iter().map(|x| x.map(i64::from)).collect()))
            })
            .or_else(|_| {
                row.try_get::<Option<Vec<Option<i16>>>, _>(index)
                    .map(|v| v.map(|a| a.into_iter().map(|x| x.map(i64::from)).collect()))
            })
            .map(|v| array_value(v.as_deref())),
        "FLOAT4[]" | "FLOAT8[]" => row
            .try_get::<Option<Vec<Option<f64>>>, _>(index)
            .or_else(|_| {
                row.try_get::<Option<Vec<Option<f32>>>, _>(index)
                    .map(|v| v.map(|a| a.into_iter().map(|x| x.map(f64::from)).collect()))
            })
            .map(|v| array_value(v.as_deref())),
        "BOOL[]" => row
            .try_get::<Option<Vec<Option<bool>>>, _>(index)
            .map(|v| array_value(v.as_deref())),
        "TEXT[]" | "VARCHAR[]" | "CHAR[]" | "NAME[]" => row
            .try_get::<Option<Vec<Option<String>>>, _>(index)
            .map(|v| array_value(v.as_deref())),
        "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" => {
            row.try_get::<Option<String>, _>(index).map(Value::from)
        }

        // Anything else is rendered from its wire bytes
        _ => return raw_value(row, index, type_name).map_err(decode_error),
    };

    value.map_err(decode_error)
}

/// NUMERIC as a float when it fits, otherwise its exact decimal text.
fn numeric_value(decimal: BigDecimal) -> Value {
    let text = decimal.to_string();
    match text.parse::<f64>() {
        Ok(f) if f.is_finite() => Value::Float(f),
        _ => Value::String(text),
    }
}

/// MONEY is stored as an integer count of cents.
fn money_value(money: PgMoney) -> Value {
    Value::Float(money.0 as f64 / 100.0)
}

/// Arrays leave as JSON text.
fn array_value<T: serde::Serialize>(items: Option<&[Option<T>]>) -> Value {
    match items.map(serde_json::to_string) {
        Some(Ok(json)) => Value::String(json),
        _ => Value::Null,
    }
}

/// Renders an interval the way `psql` prints it, e.g. `1 year 2 mons 3 days 04:05:06.5`.
fn render_interval(interval: &PgInterval) -> String {
    fn unit(n: i32, name: &str) -> String {
        if n.abs() == 1 {
            format!("{n} {name}")
        } else {
            format!("{n} {name}s")
        }
    }

    let mut parts = Vec::new();
    let (years, months) = (interval.months / 12, interval.months % 12);
    if years != 0 {
        parts.push(unit(years, "year"));
    }
    if months != 0 {
        parts.push(unit(months, "mon"));
    }
    if interval.days != 0 {
        parts.push(unit(interval.days, "day"));
    }

    if interval.microseconds != 0 || parts.is_empty() {
        let sign = if interval.microseconds < 0 { "-" } else { "" };
        let micros = interval.microseconds.unsigned_abs();
        let secs = micros / 1_000_000;
        let mut clock = format!(
            "{sign}{:02}:{:02}:{:02}",
            secs / 3600,
            secs / 60 % 60,
            secs % 60
        );
        let fraction = micros % 1_000_000;
        if fraction != 0 {
            let digits = format!("{fraction:06}");
            clock.push('.');
            clock.push_str(digits.trim_end_matches('0'));
        }
        parts.push(clock);
    }

    parts.join(" ")
}

/// Decodes the binary form of INET/CIDR: family, bits, is_cidr, length, address.
fn render_inet(bytes: &[u8]) -> Option<String> {
    let [family, bits, is_cidr, len, addr @ ..] = bytes else {
        return None;
    };
    let (ip, max_bits) = match (*family, *len as usize) {
        (2, 4) => (IpAddr::from(<[u8; 4]>::try_from(addr).ok()?), 32),
        (3, 16) => (IpAddr::from(<[u8; 16]>::try_from(addr).ok()?), 128),
        _ => return None,
    };
    if *is_cidr != 0 || *bits != max_bits {
        Some(format!("{ip}/{bits}"))
    } else {
        Some(ip.to_string())
    }
}

fn render_macaddr(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}

/// Renders a value of a type without a dedicated decoder.
///
/// Network types are decoded; other UTF-8 payloads (enums, XML, domains over
/// text) pass through as text; anything else becomes base64.
fn raw_value(
    row: &PgRow,
    index: usize,
    type_name: &str,
) -> std::result::Result<Value, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let text_format = raw.format() == PgValueFormat::Text;
    let bytes = raw.as_bytes().map_err(sqlx::Error::Decode)?;
    debug!(type_name, len = bytes.len(), "Rendering column from raw bytes");

    if text_format {
        return Ok(Value::String(String::from_utf8_lossy(bytes).into_owned()));
    }

    let rendered = match type_name.to_uppercase().as_str() {
        "INET" | "CIDR" => render_inet(bytes),
        "MACADDR" | "MACADDR8" => Some(render_macaddr(bytes)),
        _ => std::str::from_utf8(bytes).ok().map(str::to_string),
    };

    Ok(Value::String(rendered.unwrap_or_else(|| STANDARD.encode(bytes))))
}
