//! Voice listing handler.
//!
//! The OpenAI catalog is static and always available. The ElevenLabs
//! catalog is fetched live when a key is configured; a fetch failure is
//! logged and the provider is simply absent from the response.

use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::core::synthesis::base::build_http_client;
use crate::core::synthesis::elevenlabs::ELEVENLABS_API_URL;
use crate::core::synthesis::openai::OpenAIVoice;
use crate::core::synthesis::SynthesisConfig;
use crate::state::AppState;

/// One selectable voice
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Voice {
    /// Voice id accepted by the generate endpoint
    #[cfg_attr(feature = "openapi", schema(example = "alloy"))]
    pub id: String,
    /// Display name
    #[cfg_attr(feature = "openapi", schema(example = "Alloy"))]
    pub name: String,
}

/// Response body for GET /v1/voices
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct VoicesResponse {
    /// The provider narration is synthesized with
    #[cfg_attr(feature = "openapi", schema(example = "openai"))]
    pub provider: String,
    /// Voices every content item is narrated in
    pub required_voices: Vec<String>,
    /// All voices available, grouped by provider
    pub available: HashMap<String, Vec<Voice>>,
}

#[derive(Debug, Deserialize)]
struct ElevenLabsVoicesResponse {
    voices: Vec<ElevenLabsVoice>,
}

#[derive(Debug, Deserialize)]
struct ElevenLabsVoice {
    voice_id: String,
    name: String,
}

fn capitalize(id: &str) -> String {
    let mut chars = id.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn openai_voices() -> Vec<Voice> {
    OpenAIVoice::all()
        .iter()
        .map(|v| Voice {
            id: v.as_str().to_string(),
            name: capitalize(v.as_str()),
        })
        .collect()
}

async fn fetch_elevenlabs_voices(
    api_key: &str,
    base_url: &str,
) -> Result<Vec<Voice>, Box<dyn std::error::Error + Send + Sync>> {
    // Same timed client as the synthesis path; both timeouts apply
    let client = build_http_client(&SynthesisConfig::default())?;
    let response = client
        .get(format!("{}/v1/voices", base_url.trim_end_matches('/')))
        .header("xi-api-key", api_key)
        .send()
        .await?
        .error_for_status()?;

    let listing: ElevenLabsVoicesResponse = response.json().await?;
    Ok(listing
        .voices
        .into_iter()
        .map(|v| Voice {
            id: v.voice_id,
            name: v.name,
        })
        .collect())
}

/// Handler for GET /v1/voices - available voices per provider
#[cfg_attr(
    feature = "openapi",
    utoipa::path(
        get,
        path = "/v1/voices",
        responses(
            (status = 200, description = "Available voices", body = VoicesResponse)
        ),
        tag = "voices"
    )
)]
pub async fn list_voices(State(state): State<Arc<AppState>>) -> Json<VoicesResponse> {
    let mut available = HashMap::new();
    available.insert("openai".to_string(), openai_voices());

    if let Ok(api_key) = state.config.get_api_key("elevenlabs") {
        match fetch_elevenlabs_voices(&api_key, ELEVENLABS_API_URL).await {
            Ok(voices) => {
                available.insert("elevenlabs".to_string(), voices);
            }
            Err(e) => {
                warn!("Failed to fetch ElevenLabs voices: {e}");
            }
        }
    } else {
        debug!("ElevenLabs API key not configured, skipping");
    }

    Json(VoicesResponse {
        provider: state.config.synthesis_provider.clone(),
        required_voices: state.config.required_voices.clone(),
        available,
    })
}
