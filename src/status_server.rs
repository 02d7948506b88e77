//! Read-only HTTP view of supervisor status

use crate::config::HttpConfig;
use crate::error::{CasebotError, Result};
use crate::supervisor::Supervisor;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Shared state for the Axum server
#[derive(Clone)]
pub struct ServerState {
    pub(crate) supervisor: Arc<Supervisor>,
}

pub struct StatusServer {
    config: HttpConfig,
    supervisor: Arc<Supervisor>,
}

impl StatusServer {
    pub fn new(config: HttpConfig, supervisor: Arc<Supervisor>) -> Self {
        Self { config, supervisor }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/components", get(components_handler))
            .route("/components/:name", get(component_handler))
            .with_state(ServerState {
                supervisor: Arc::clone(&self.supervisor),
            })
    }

    /// Serve until `shutdown` is cancelled
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        let addr = format!("{}:{}", self.config.ip, self.config.port);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| CasebotError::system(format!("Failed to bind {}: {}", addr, e)))?;

        info!("Status server listening on {}", addr);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
            .map_err(|e| CasebotError::system(format!("Status server error: {}", e)))?;

        info!("Status server stopped");
        Ok(())
    }
}

/// Aggregate health: 200 when every component is healthy, 503 otherwise
pub async fn health_handler(State(state): State<ServerState>) -> impl IntoResponse {
    let records = state.supervisor.get_all_statuses().await;
    let unhealthy: Vec<&str> = records
        .iter()
        .filter(|record| !record.healthy)
        .map(|record| record.name.as_str())
        .collect();

    let (code, status) = if unhealthy.is_empty() {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let body = serde_json::json!({
        "status": status,
        "components": records.len(),
        "unhealthy": unhealthy,
        "monitoring": state.supervisor.is_monitoring().await,
    });

    (code, Json(body))
}

pub async fn components_handler(State(state): State<ServerState>) -> impl IntoResponse {
    Json(state.supervisor.get_all_statuses().await)
}

pub async fn component_handler(
    State(state): State<ServerState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.supervisor.get_component_status(&name).await {
        Ok(record) => (StatusCode::OK, Json(serde_json::json!(record))),
        Err(e) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": e.to_string() })),
        ),
    }
}
