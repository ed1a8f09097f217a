//! Content registration handler.
//!
//! Upstream systems push finished summaries here. Registration doubles as
//! the generation trigger for new content: a worker run covering every
//! required voice is spawned as soon as the item lands in the catalog.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::core::catalog::ContentItem;
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

/// Request body for POST /v1/content
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateContentRequest {
    /// Stable catalog id
    #[cfg_attr(feature = "openapi", schema(example = "book-42"))]
    pub content_id: String,
    /// Display title
    #[cfg_attr(feature = "openapi", schema(example = "Thinking in Systems"))]
    pub title: String,
    /// Summary text to narrate
    pub summary_text: String,
}

/// Response body for POST /v1/content
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateContentResponse {
    pub content_id: String,
    /// Job id of the spawned narration run
    pub job_id: Uuid,
    /// Always `accepted`
    #[cfg_attr(feature = "openapi", schema(example = "accepted"))]
    pub status: String,
}

/// Handler for POST /v1/content - register a summary and start narrating it.
///
/// Re-registering an existing id replaces the catalog entry. The spawned
/// worker skips voices already cached, so replays cost nothing beyond a
/// cache read.
#[cfg_attr(
    feature = "openapi",
    utoipa::path(
        post,
        path = "/v1/content",
        request_body = CreateContentRequest,
        responses(
            (status = 202, description = "Content registered, narration dispatched", body = CreateContentResponse),
            (status = 400, description = "Empty content id or summary")
        ),
        tag = "content"
    )
)]
pub async fn create_content(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateContentRequest>,
) -> AppResult<(StatusCode, Json<CreateContentResponse>)> {
    if request.content_id.trim().is_empty() {
        return Err(AppError::BadRequest("content_id cannot be empty".to_string()));
    }
    if request.summary_text.trim().is_empty() {
        return Err(AppError::BadRequest(
            "summary_text cannot be empty".to_string(),
        ));
    }

    let item = ContentItem {
        content_id: request.content_id.clone(),
        title: request.title,
        summary_text: request.summary_text,
    };
    state.catalog.insert(item.clone());

    let job_id = Uuid::new_v4();
    let worker = state.worker.clone();
    info!(
        "Registered {} ({}), dispatching narration job {job_id}",
        item.content_id, item.title
    );
    tokio::spawn(async move {
        match worker.run(&item).await {
            Ok(outcome) => {
                info!("Narration job {job_id} finished: {outcome:?}");
            }
            Err(e) => {
                error!("Narration job {job_id} failed: {e}");
            }
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(CreateContentResponse {
            content_id: request.content_id,
            job_id,
            status: "accepted".to_string(),
        }),
    ))
}
