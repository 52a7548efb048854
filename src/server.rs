//! HTTP API for NimbusData.
//!
//! Thin axum handlers that translate executor results and errors into
//! JSON responses.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::catalog::{fetch_epic_catalog, EpicCatalog};
use crate::config::ConnectionDescriptor;
use crate::db::Connector;
use crate::error::NimbusError;
use crate::query::QueryExecutor;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub descriptor: Arc<ConnectionDescriptor>,
    pub connector: Arc<dyn Connector>,
}

impl AppState {
    pub fn new(descriptor: ConnectionDescriptor, connector: Arc<dyn Connector>) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            connector,
        }
    }

    fn executor(&self) -> QueryExecutor<'_> {
        QueryExecutor::new(self.connector.as_ref())
    }
}

/// Error body returned for failed calls.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    details: String,
}

impl IntoResponse for NimbusError {
    fn into_response(self) -> Response {
        let status = match &self {
            NimbusError::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorResponse {
            error: self.category().to_string(),
            details: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/test-db", get(test_db_handler))
        .route("/epic/catalogs", get(epic_catalog_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root_handler() -> Json<serde_json::Value> {
    Json(json!({ "hello": "world" }))
}

/// Checks that a connection to the store can be opened and closed.
async fn test_db_handler(State(state): State<AppState>) -> Response {
    let result = match state.connector.acquire(&state.descriptor).await {
        Ok(session) => session.close().await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => Json(json!({ "message": "Database connection successful" })).into_response(),
        Err(err) => {
            error!(error = %err, "Database connectivity check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse {
                    error: "Database connection failed".to_string(),
                    details: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}

async fn epic_catalog_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<EpicCatalog>>, Response> {
    let catalog = fetch_epic_catalog(&state.executor(), &state.descriptor)
        .await
        .map_err(IntoResponse::into_response)?;

    if catalog.is_empty() {
        return Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": "No series catalogs found" })),
        )
            .into_response());
    }

    Ok(Json(catalog))
}
