//! Listening progress handlers.
//!
//! Progress writes are idempotent upserts keyed by `(user_id, content_id)`;
//! a replayed request leaves the store unchanged. Reads return the stored
//! record or a 404 when the user has never touched the content.

use axum::extract::{Path, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::errors::{AppError, AppResult};
use crate::playback::ProgressRecord;
use crate::state::AppState;

/// Request body for PUT /v1/progress
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ProgressUpdateRequest {
    #[cfg_attr(feature = "openapi", schema(example = "user-7"))]
    pub user_id: String,
    #[cfg_attr(feature = "openapi", schema(example = "book-42"))]
    pub content_id: String,
    /// Percent listened, 0.0 through 100.0
    #[cfg_attr(feature = "openapi", schema(example = 40.0))]
    pub percentage: f64,
    /// Chunk index playback stands at
    pub chunk_index: usize,
}

/// Handler for PUT /v1/progress - record where a user stands.
///
/// A percentage of 100 marks the content completed; the completion stamp
/// is set from the stored record's update time.
#[cfg_attr(
    feature = "openapi",
    utoipa::path(
        put,
        path = "/v1/progress",
        request_body = ProgressUpdateRequest,
        responses(
            (status = 200, description = "Stored record", body = ProgressRecord),
            (status = 400, description = "Percentage out of range or empty ids")
        ),
        tag = "progress"
    )
)]
pub async fn put_progress(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ProgressUpdateRequest>,
) -> AppResult<Json<ProgressRecord>> {
    if request.user_id.trim().is_empty() || request.content_id.trim().is_empty() {
        return Err(AppError::BadRequest(
            "user_id and content_id cannot be empty".to_string(),
        ));
    }
    if !(0.0..=100.0).contains(&request.percentage) || !request.percentage.is_finite() {
        return Err(AppError::BadRequest(format!(
            "percentage must be between 0 and 100, got {}",
            request.percentage
        )));
    }

    let record = if request.percentage >= 100.0 {
        ProgressRecord::completed(&request.user_id, &request.content_id, request.chunk_index)
    } else {
        ProgressRecord::new(
            &request.user_id,
            &request.content_id,
            request.percentage,
            request.chunk_index,
        )
    };

    state.progress.upsert(record.clone()).await?;
    Ok(Json(record))
}

/// Handler for GET /v1/progress/{user_id}/{content_id}
#[cfg_attr(
    feature = "openapi",
    utoipa::path(
        get,
        path = "/v1/progress/{user_id}/{content_id}",
        params(
            ("user_id" = String, Path, description = "User id"),
            ("content_id" = String, Path, description = "Catalog content id")
        ),
        responses(
            (status = 200, description = "Stored record", body = ProgressRecord),
            (status = 404, description = "No progress recorded")
        ),
        tag = "progress"
    )
)]
pub async fn get_progress(
    State(state): State<Arc<AppState>>,
    Path((user_id, content_id)): Path<(String, String)>,
) -> AppResult<Json<ProgressRecord>> {
    let record = state
        .progress
        .get(&user_id, &content_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("No progress for {user_id} on {content_id}"))
        })?;
    Ok(Json(record))
}
