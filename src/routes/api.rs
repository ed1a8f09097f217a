use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{audio, content, progress, voices};
use crate::state::AppState;
use std::sync::Arc;

/// Create the versioned API router.
///
/// The health route is mounted separately in main so probes bypass the
/// rate limiter and CORS layers.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/content", post(content::create_content))
        .route("/audio/generate", post(audio::generate_audio))
        .route(
            "/audio/chunks/{content_id}/{voice_id}",
            get(audio::get_chunks),
        )
        .route("/audio/status", get(audio::audio_status))
        .route("/audio/backlog/run", post(audio::run_backlog))
        .route("/progress", put(progress::put_progress))
        .route(
            "/progress/{user_id}/{content_id}",
            get(progress::get_progress),
        )
        .route("/voices", get(voices::list_voices))
        .layer(TraceLayer::new_for_http())
}
