//! Query execution for NimbusData.
//!
//! Isolates single-statement execution, commit/rollback handling and row
//! materialization from the HTTP layer.

pub mod executor;

pub use executor::{QueryExecutor, QueryRequest};

use crate::config::ConnectionDescriptor;
use crate::db::{RowSet, SqlxConnector, Value};
use crate::error::Result;

/// Executes one statement with the production connector.
///
/// Empty `params` runs the statement unparameterized.
pub async fn execute(
    descriptor: &ConnectionDescriptor,
    statement: &str,
    params: &[Value],
    commit: bool,
) -> Result<RowSet> {
    let request = QueryRequest {
        statement: statement.to_string(),
        params: params.to_vec(),
        commit,
    };
    let connector = SqlxConnector::new();
    QueryExecutor::new(&connector)
        .execute(descriptor, &request)
        .await
}
