//! Narration generation and chunk retrieval handlers.
//!
//! Generation is fire-and-forget: the request is validated, a worker run is
//! spawned onto the runtime, and a 202 with a job id goes back immediately.
//! Chunk retrieval only ever serves ready cache entries; anything else is a
//! 404 the client may retry after generation catches up.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;
use tracing::{error, info};
use uuid::Uuid;

use crate::core::catalog::ContentCatalog;
use crate::core::voice::VoiceId;
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

// =============================================================================
// Generation
// =============================================================================

/// Request body for POST /v1/audio/generate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct GenerateRequest {
    /// Catalog id of the content to narrate
    #[cfg_attr(feature = "openapi", schema(example = "book-42"))]
    pub content_id: String,
    /// Voice to synthesize
    #[cfg_attr(feature = "openapi", schema(example = "alloy"))]
    pub voice_id: VoiceId,
}

/// Response body for accepted generation requests
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct GenerateResponse {
    /// Identifier for the dispatched job
    pub job_id: Uuid,
    pub content_id: String,
    pub voice_id: String,
    /// Always `accepted`
    #[cfg_attr(feature = "openapi", schema(example = "accepted"))]
    pub status: String,
}

/// Handler for POST /v1/audio/generate - dispatch synthesis for one voice.
///
/// Returns 202 once the job is on the runtime. Re-requesting a voice that is
/// already cached is harmless; the worker skips ready entries.
#[cfg_attr(
    feature = "openapi",
    utoipa::path(
        post,
        path = "/v1/audio/generate",
        request_body = GenerateRequest,
        responses(
            (status = 202, description = "Generation dispatched", body = GenerateResponse),
            (status = 404, description = "Unknown content id"),
            (status = 400, description = "Invalid voice id")
        ),
        tag = "audio"
    )
)]
pub async fn generate_audio(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GenerateRequest>,
) -> AppResult<(StatusCode, Json<GenerateResponse>)> {
    let item = state.catalog.get(&request.content_id).await?;

    let job_id = Uuid::new_v4();
    let voice = request.voice_id.clone();
    let worker = state.worker_for_voice(voice.clone());

    info!(
        "Dispatching synthesis job {job_id} for {} (voice: {voice})",
        item.content_id
    );
    tokio::spawn(async move {
        match worker.run(&item).await {
            Ok(outcome) => {
                info!("Synthesis job {job_id} finished: {outcome:?}");
            }
            Err(e) => {
                error!("Synthesis job {job_id} failed: {e}");
            }
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(GenerateResponse {
            job_id,
            content_id: request.content_id,
            voice_id: voice.into_inner(),
            status: "accepted".to_string(),
        }),
    ))
}

// =============================================================================
// Chunk Retrieval
// =============================================================================

/// Response body for GET /v1/audio/chunks/{content_id}/{voice_id}
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ChunksResponse {
    pub content_id: String,
    pub voice_id: String,
    /// Container format of the chunks
    #[cfg_attr(feature = "openapi", schema(example = "mp3"))]
    pub format: String,
    /// Ordered base64-encoded audio chunks
    pub chunks: Vec<String>,
    pub total_chunks: usize,
    /// Total decoded byte length
    pub byte_len: u64,
}

/// Handler for GET /v1/audio/chunks/{content_id}/{voice_id}.
///
/// Serves the ordered chunk list for a ready voice. Not-ready and unknown
/// combinations are both a 404; the distinction is not observable and the
/// client reacts the same way to either.
#[cfg_attr(
    feature = "openapi",
    utoipa::path(
        get,
        path = "/v1/audio/chunks/{content_id}/{voice_id}",
        params(
            ("content_id" = String, Path, description = "Catalog content id"),
            ("voice_id" = String, Path, description = "Voice id")
        ),
        responses(
            (status = 200, description = "Ready chunk list", body = ChunksResponse),
            (status = 404, description = "No ready narration for this voice"),
            (status = 400, description = "Invalid voice id")
        ),
        tag = "audio"
    )
)]
pub async fn get_chunks(
    State(state): State<Arc<AppState>>,
    Path((content_id, voice_id)): Path<(String, String)>,
) -> AppResult<Json<ChunksResponse>> {
    let voice = VoiceId::new(&voice_id)?;

    let entry = state
        .ready_entry(&content_id, &voice)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "No ready narration for {content_id} (voice: {voice})"
            ))
        })?;

    Ok(Json(ChunksResponse {
        content_id,
        voice_id: voice.into_inner(),
        format: entry.format.extension().to_string(),
        chunks: entry.chunks.clone(),
        total_chunks: entry.chunks.len(),
        byte_len: entry.byte_len,
    }))
}

// =============================================================================
// Backlog Status and Dispatch
// =============================================================================

/// Response body for GET /v1/audio/status
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StatusResponse {
    /// Catalog items considered
    pub total: usize,
    /// Items with every required voice ready
    pub full: usize,
    /// Items with some required voices ready
    pub partial: usize,
    /// Items with no required voice ready
    pub none: usize,
    /// The configured required voice set
    pub required_voices: Vec<String>,
    /// RFC 3339 timestamp of this scan
    #[cfg_attr(feature = "openapi", schema(example = "2026-08-24T12:00:00Z"))]
    pub generated_at: String,
}

/// Handler for GET /v1/audio/status - narration coverage over the catalog.
///
/// Every call runs a fresh scan; nothing is memoized between calls.
#[cfg_attr(
    feature = "openapi",
    utoipa::path(
        get,
        path = "/v1/audio/status",
        responses(
            (status = 200, description = "Coverage counts", body = StatusResponse),
            (status = 500, description = "Catalog listing failed")
        ),
        tag = "audio"
    )
)]
pub async fn audio_status(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<StatusResponse>> {
    let status = state.scanner.status().await?;
    let generated_at = time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();

    Ok(Json(StatusResponse {
        total: status.total_items,
        full: status.full,
        partial: status.partial,
        none: status.missing,
        required_voices: status.required_voices,
        generated_at,
    }))
}

/// Response body for POST /v1/audio/backlog/run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BacklogRunResponse {
    /// Whether a job was dispatched this call
    pub dispatched: bool,
    /// Job id of the dispatched run, when one happened
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<Uuid>,
    /// Content the job is narrating, when one happened
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,
    /// Items needing work at scan time, the dispatched one included
    pub remaining: usize,
}

/// Handler for POST /v1/audio/backlog/run - dispatch at most one backlog job.
///
/// Scans the catalog and spawns a worker run for the first item that is not
/// fully narrated. One item per call keeps provider pressure predictable;
/// callers drive the backlog down by invoking this repeatedly.
#[cfg_attr(
    feature = "openapi",
    utoipa::path(
        post,
        path = "/v1/audio/backlog/run",
        responses(
            (status = 200, description = "Dispatch report", body = BacklogRunResponse),
            (status = 500, description = "Catalog listing failed")
        ),
        tag = "audio"
    )
)]
pub async fn run_backlog(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<BacklogRunResponse>> {
    let report = state.scanner.run_one().await?;

    let (dispatched, job_id, content_id) = match report.dispatched {
        Some(job) => (true, Some(job.job_id), Some(job.content_id)),
        None => (false, None, None),
    };

    Ok(Json(BacklogRunResponse {
        dispatched,
        job_id,
        content_id,
        remaining: report.remaining,
    }))
}
