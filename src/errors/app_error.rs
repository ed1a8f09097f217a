//! HTTP-facing error type.
//!
//! Every handler returns [`AppResult`]. Domain errors convert in via `From`
//! and map onto a status code plus a `{"error": ...}` JSON body; internal
//! detail is logged but the response body stays terse.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::core::cache::CacheError;
use crate::core::catalog::CatalogError;
use crate::core::synthesis::SynthesisError;
use crate::core::voice::VoiceIdError;
use crate::playback::{PlaybackError, ProgressError};

/// Result alias used by all HTTP handlers
pub type AppResult<T> = Result<T, AppError>;

/// Errors a handler can surface to the client
#[derive(Debug, Error)]
pub enum AppError {
    /// Request body or path parameter failed validation
    #[error("{0}")]
    BadRequest(String),

    /// The addressed resource does not exist
    #[error("{0}")]
    NotFound(String),

    /// Service misconfiguration discovered while building state
    #[error("{0}")]
    Configuration(String),

    #[error(transparent)]
    Voice(#[from] VoiceIdError),

    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),

    #[error(transparent)]
    Progress(#[from] ProgressError),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::Voice(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Catalog(CatalogError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Catalog(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Playback(PlaybackError::GenerationNotReady { .. }) => StatusCode::NOT_FOUND,
            AppError::Playback(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Synthesis(SynthesisError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            AppError::Synthesis(SynthesisError::RateLimited { .. }) => {
                StatusCode::TOO_MANY_REQUESTS
            }
            AppError::Synthesis(_) => StatusCode::BAD_GATEWAY,
            AppError::Cache(_) | AppError::Progress(_) | AppError::Configuration(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();

        if status.is_server_error() {
            error!("Request failed ({status}): {message}");
        } else {
            warn!("Request rejected ({status}): {message}");
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}
