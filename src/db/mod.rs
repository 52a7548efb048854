//! Database abstraction layer for NimbusData.
//!
//! A `Connector` turns a `ConnectionDescriptor` into a `Session`: a single-use,
//! exclusively owned connection opened in manual-commit mode. Nothing is
//! pooled; every call pays the full connection cost.

mod mock;
mod postgres;
mod sqlite;
mod types;

pub use mock::{MockConnector, MockJournal, MockSession};
pub use postgres::PostgresSession;
pub use sqlite::SqliteSession;
pub use types::{ColumnInfo, Row, RowRef, RowSet, StatementOutput, Value};

use crate::config::ConnectionDescriptor;
use crate::error::{NimbusError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{error, info};

/// Upper bound on a single connection attempt.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    Postgres,
    Sqlite,
}

impl DatabaseBackend {
    /// Returns the backend as a string for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        }
    }

    /// Parses a driver identifier, accepting ODBC-style braces.
    pub fn parse(s: &str) -> Option<Self> {
        let name = s.trim().trim_start_matches('{').trim_end_matches('}');
        match name.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Some(Self::Postgres),
            "sqlite" | "sqlite3" => Some(Self::Sqlite),
            _ => None,
        }
    }

    /// Returns the default port for this backend, if it uses one.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Self::Postgres => Some(5432),
            Self::Sqlite => None,
        }
    }
}

/// Produces live sessions from a connection descriptor.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a new session. Each call yields a fresh, unshared connection.
    async fn acquire(&self, descriptor: &ConnectionDescriptor) -> Result<Box<dyn Session>>;
}

/// An open, single-use connection to the store.
///
/// Sessions start in manual-commit mode: nothing a statement writes is
/// persisted unless `commit` is called before `close`.
#[async_trait]
pub trait Session: Send {
    /// Prepares and executes one statement, binding `params` positionally.
    async fn execute(&mut self, statement: &str, params: &[Value]) -> Result<StatementOutput>;

    /// Commits the pending transaction.
    async fn commit(&mut self) -> Result<()>;

    /// Discards the pending transaction.
    async fn rollback(&mut self) -> Result<()>;

    /// Closes the connection, releasing every handle it owns.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// The production connector, backed by sqlx.
#[derive(Debug, Clone)]
pub struct SqlxConnector {
    timeout: Duration,
}

impl SqlxConnector {
    pub fn new() -> Self {
        Self {
            timeout: CONNECT_TIMEOUT,
        }
    }

    /// Overrides the connection attempt limit.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for SqlxConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for SqlxConnector {
    async fn acquire(&self, descriptor: &ConnectionDescriptor) -> Result<Box<dyn Session>> {
        info!(store = %descriptor.display_string(), "Connecting to database");

        let result = match tokio::time::timeout(self.timeout, open_session(descriptor)).await {
            Ok(result) => result,
            Err(_) => Err(NimbusError::connection(format!(
                "Connection attempt timed out after {:?}",
                self.timeout
            ))),
        };

        match &result {
            Ok(_) => info!("Connected to database"),
            Err(NimbusError::Connection(msg)) => {
                error!(error = %msg, "Database connection error")
            }
            Err(e) => error!(error = %e, "Unexpected error while connecting"),
        }

        result
    }
}

async fn open_session(descriptor: &ConnectionDescriptor) -> Result<Box<dyn Session>> {
    let driver = descriptor.driver().unwrap_or_default();
    let backend = DatabaseBackend::parse(driver)
        .ok_or_else(|| NimbusError::unexpected(format!("Unsupported driver '{driver}'")))?;

    match backend {
        DatabaseBackend::Postgres => {
            let session = PostgresSession::connect(descriptor).await?;
            Ok(Box::new(session))
        }
        DatabaseBackend::Sqlite => {
            let session = SqliteSession::connect(descriptor).await?;
            Ok(Box::new(session))
        }
    }
}

/// Opens a session with the production connector.
pub async fn acquire(descriptor: &ConnectionDescriptor) -> Result<Box<dyn Session>> {
    SqlxConnector::new().acquire(descriptor).await
}

/// Splits a server address into host and optional port.
///
/// Accepts `host`, `host:port`, `host,port`, `tcp:host,port` and
/// `[v6addr]:port`.
pub(crate) fn split_server_address(server: &str) -> Result<(String, Option<u16>)> {
    let server = server.trim();
    let server = server.strip_prefix("tcp:").unwrap_or(server);

    let (host, port) = if let Some(rest) = server.strip_prefix('[') {
        match rest.split_once(']') {
            Some((host, tail)) => (host, tail.strip_prefix(':').or(tail.strip_prefix(','))),
            None => (server, None),
        }
    } else if let Some((host, port)) = server.rsplit_once(',') {
        (host, Some(port))
    } else if server.matches(':').count() == 1 {
        let (host, port) = server.split_once(':').unwrap_or((server, ""));
        (host, Some(port))
    } else {
        (server, None)
    };

    let port = match port {
        Some(p) => Some(p.trim().parse::<u16>().map_err(|_| {
            NimbusError::unexpected(format!("Invalid port '{}' in server address", p.trim()))
        })?),
        None => None,
    };

    Ok((host.trim().to_string(), port))
}

/// Maps a sqlx error raised while connecting.
pub(crate) fn map_connection_error(error: sqlx::Error) -> NimbusError {
    match error {
        sqlx::Error::Configuration(e) => {
            NimbusError::unexpected(format!("Invalid connection configuration: {e}"))
        }
        other => NimbusError::connection(other.to_string()),
    }
}

/// Maps a sqlx error raised while executing, committing or rolling back.
pub(crate) fn map_execution_error(error: sqlx::Error) -> NimbusError {
    match error {
        sqlx::Error::Database(db_error) => match db_error.code() {
            Some(code) => NimbusError::execution_with_code(code, db_error.message()),
            None => NimbusError::execution(db_error.message()),
        },
        e @ (sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::Configuration(_)) => NimbusError::unexpected(e.to_string()),
        other => NimbusError::execution(other.to_string()),
    }
}
