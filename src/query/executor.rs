//! Single-statement query execution.
//!
//! Every call opens its own session, runs exactly one statement, optionally
//! commits, and closes the session on every path after it was opened.

use crate::config::ConnectionDescriptor;
use crate::db::{Connector, RowSet, Session, StatementOutput, Value};
use crate::error::Result;
use tracing::{error, info, warn};

/// A statement template, its positional parameters, and whether a
/// successful run must be committed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRequest {
    pub statement: String,
    pub params: Vec<Value>,
    pub commit: bool,
}

impl QueryRequest {
    /// Creates a read-only request without parameters.
    pub fn new(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            params: Vec::new(),
            commit: false,
        }
    }

    /// Sets the positional parameters.
    pub fn with_params<I, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.params = params.into_iter().map(Into::into).collect();
        self
    }

    /// Appends one positional parameter.
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }

    /// Marks the request as a write to be committed on success.
    pub fn committed(mut self) -> Self {
        self.commit = true;
        self
    }
}

/// Runs requests against sessions obtained from a `Connector`.
pub struct QueryExecutor<'a> {
    connector: &'a dyn Connector,
}

impl<'a> QueryExecutor<'a> {
    /// Creates a new query executor.
    pub fn new(connector: &'a dyn Connector) -> Self {
        Self { connector }
    }

    /// Executes one request and returns its rows.
    ///
    /// Execution failures of a commit-intended request are rolled back before
    /// the error is returned; a failing rollback is logged and the original
    /// error wins. Unexpected failures are returned without a rollback.
    pub async fn execute(
        &self,
        descriptor: &ConnectionDescriptor,
        request: &QueryRequest,
    ) -> Result<RowSet> {
        let mut session = self.connector.acquire(descriptor).await?;

        info!(
            statement = %request.statement,
            params = request.params.len(),
            commit = request.commit,
            "Executing statement"
        );

        let result = run(session.as_mut(), request).await;

        if let Err(err) = &result {
            if err.is_execution() {
                error!(
                    statement = %request.statement,
                    params = request.params.len(),
                    sqlstate = err.sqlstate().unwrap_or("-"),
                    error = %err,
                    "Statement execution failed"
                );
                if request.commit {
                    warn!("Rolling back transaction after failure");
                    if let Err(rollback_err) = session.rollback().await {
                        error!(error = %rollback_err, "Rollback failed");
                    }
                }
            } else {
                error!(
                    statement = %request.statement,
                    params = request.params.len(),
                    error = %err,
                    "Unexpected error during statement execution"
                );
            }
        }

        match session.close().await {
            Ok(()) => info!("Connection closed"),
            Err(close_err) => warn!(error = %close_err, "Connection close failed"),
        }

        result
    }

    /// Executes one request and serializes its rows to JSON.
    pub async fn execute_json(
        &self,
        descriptor: &ConnectionDescriptor,
        request: &QueryRequest,
    ) -> Result<String> {
        self.execute(descriptor, request).await?.to_json()
    }
}

async fn run(session: &mut dyn Session, request: &QueryRequest) -> Result<RowSet> {
    let output = session
        .execute(&request.statement, &request.params)
        .await?;
    let rows = materialize(output)?;

    if request.commit {
        info!("Committing transaction");
        session.commit().await?;
    }

    Ok(rows)
}

/// Builds the row set from raw statement output.
fn materialize(output: StatementOutput) -> Result<RowSet> {
    let Some(columns) = output.columns.filter(|c| !c.is_empty()) else {
        info!("Statement returned no result columns");
        return Ok(RowSet::empty());
    };

    let names: Vec<String> = columns.into_iter().map(|c| c.name).collect();
    info!(columns = ?names, "Result columns");

    let mut rows = RowSet::with_columns(names);
    for row in output.rows {
        rows.push_row(row)?;
    }
    Ok(rows)
}
