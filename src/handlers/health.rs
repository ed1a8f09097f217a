use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::state::AppState;

/// Health probe response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HealthResponse {
    /// Always `ok` when the process answers
    #[cfg_attr(feature = "openapi", schema(example = "ok"))]
    pub status: String,
    /// Crate version
    #[cfg_attr(feature = "openapi", schema(example = "1.0.0"))]
    pub version: String,
    /// Seconds since startup
    pub uptime_seconds: u64,
}

/// Handler for GET /health - liveness probe
#[cfg_attr(
    feature = "openapi",
    utoipa::path(
        get,
        path = "/health",
        responses(
            (status = 200, description = "Service is up", body = HealthResponse)
        ),
        tag = "health"
    )
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
    })
}
