//! OpenAI speech synthesis client.
//!
//! Implements [`SynthesisClient`] over OpenAI's text-to-speech API.
//!
//! # API Reference
//!
//! - Endpoint: `POST https://api.openai.com/v1/audio/speech`
//! - Models: tts-1, tts-1-hd, gpt-4o-mini-tts
//! - Voices: alloy, ash, ballad, coral, echo, fable, onyx, nova, sage, shimmer, verse
//! - Output: mp3, opus, aac, flac, wav
//! - Speed: 0.25 to 4.0

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use xxhash_rust::xxh3::xxh3_128;

use super::config::{OpenAISpeechModel, OpenAIVoice, SpeechOutputFormat};
use crate::core::synthesis::base::{
    AudioPayload, RateLimitInfo, SynthesisClient, SynthesisConfig, SynthesisError,
    SynthesisResult, build_http_client, classify_status, map_transport_error,
    validate_input_text,
};
use crate::core::voice::VoiceId;
use crate::utils::url_validation::validate_base_url;

/// OpenAI speech API endpoint
pub const OPENAI_SPEECH_URL: &str = "https://api.openai.com/v1/audio/speech";

/// Error envelope returned by the OpenAI API on failure
#[derive(Debug, Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIErrorBody,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorBody {
    message: String,
    #[serde(rename = "type", default)]
    error_type: String,
}

// =============================================================================
// Config Hash
// =============================================================================

/// Compute a hash of the client configuration, used in cache keys and logs
fn compute_config_hash(
    model: &OpenAISpeechModel,
    format: &SpeechOutputFormat,
    speed: f32,
) -> String {
    let mut s = String::new();
    s.push_str("openai");
    s.push('|');
    s.push_str(model.as_str());
    s.push('|');
    s.push_str(format.as_str());
    s.push('|');
    s.push_str(&format!("{speed:.3}"));
    let hash = xxh3_128(s.as_bytes());
    format!("{hash:032x}")
}

// =============================================================================
// OpenAI Synthesis Client
// =============================================================================

/// OpenAI speech synthesis client.
///
/// # Example
///
/// ```rust,ignore
/// use narrata_audio::core::synthesis::{OpenAISynthesis, SynthesisClient, SynthesisConfig};
/// use narrata_audio::core::voice::VoiceId;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = SynthesisConfig {
///         api_key: "sk-...".to_string(),
///         model: "tts-1".to_string(),
///         ..Default::default()
///     };
///     let client = OpenAISynthesis::new(config)?;
///     let voice = VoiceId::new("nova")?;
///     let payload = client.synthesize("Hello, world!", &voice).await?;
///     println!("Received {} bytes of {}", payload.len(), payload.format);
///     Ok(())
/// }
/// ```
pub struct OpenAISynthesis {
    http_client: reqwest::Client,
    api_key: String,
    model: OpenAISpeechModel,
    response_format: SpeechOutputFormat,
    /// Speaking speed (0.25 to 4.0)
    speed: f32,
    url: String,
    config_hash: String,
}

impl OpenAISynthesis {
    /// Create a new OpenAI synthesis client
    pub fn new(config: SynthesisConfig) -> SynthesisResult<Self> {
        if config.api_key.is_empty() {
            return Err(SynthesisError::Configuration(
                "OpenAI API key is required".to_string(),
            ));
        }

        let model = if config.model.is_empty() {
            OpenAISpeechModel::default()
        } else {
            OpenAISpeechModel::from_str_or_default(&config.model)
        };

        let response_format = config
            .output_format
            .as_deref()
            .map(SpeechOutputFormat::from_str_or_default)
            .unwrap_or_default();

        let speed = config.speaking_rate.unwrap_or(1.0).clamp(0.25, 4.0);

        let url = match config.base_url.as_deref() {
            Some(base) => {
                validate_base_url(base).map_err(|e| {
                    SynthesisError::Configuration(format!("Invalid OpenAI base URL: {e}"))
                })?;
                format!("{}/v1/audio/speech", base.trim_end_matches('/'))
            }
            None => OPENAI_SPEECH_URL.to_string(),
        };

        let http_client = build_http_client(&config)?;
        let config_hash = compute_config_hash(&model, &response_format, speed);
        tracing::debug!(
            "OpenAI synthesis client ready (model: {}, format: {}, config_hash: {})",
            model,
            response_format,
            config_hash
        );

        Ok(Self {
            http_client,
            api_key: config.api_key,
            model,
            response_format,
            speed,
            url,
            config_hash,
        })
    }

    /// Get the configured model
    pub fn model(&self) -> OpenAISpeechModel {
        self.model
    }

    /// Get the configured output format
    pub fn output_format(&self) -> SpeechOutputFormat {
        self.response_format
    }

    /// Hash of the request-shaping configuration
    pub fn config_hash(&self) -> &str {
        &self.config_hash
    }

    fn build_request(&self, text: &str, voice: OpenAIVoice) -> reqwest::RequestBuilder {
        let mut body = json!({
            "model": self.model.as_str(),
            "input": text,
            "voice": voice.as_str(),
            "response_format": self.response_format.as_str(),
        });

        // Add speed if not default (1.0)
        if (self.speed - 1.0).abs() > 0.001 {
            body["speed"] = json!(self.speed);
        }

        self.http_client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
    }
}

#[async_trait]
impl SynthesisClient for OpenAISynthesis {
    fn provider_name(&self) -> &'static str {
        "openai"
    }

    async fn synthesize(&self, text: &str, voice: &VoiceId) -> SynthesisResult<AudioPayload> {
        validate_input_text(text)?;

        // Unknown voices are rejected locally instead of burning a request
        let voice = OpenAIVoice::from_voice_id(voice).ok_or_else(|| {
            SynthesisError::InvalidVoice(format!(
                "'{voice}' is not an OpenAI voice (expected one of: {})",
                OpenAIVoice::all()
                    .iter()
                    .map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })?;

        let response = self
            .build_request(text, voice)
            .send()
            .await
            .map_err(map_transport_error)?;

        let rate_limit = RateLimitInfo::from_headers(response.headers());
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<OpenAIErrorResponse>(&body) {
                Ok(err) => {
                    if err.error.error_type.is_empty() {
                        format!("OpenAI API error: {}", err.error.message)
                    } else {
                        format!(
                            "OpenAI API error: {} ({})",
                            err.error.message, err.error.error_type
                        )
                    }
                }
                Err(_) => format!("OpenAI API error ({status}): {body}"),
            };
            return Err(classify_status(status.as_u16(), message, &rate_limit));
        }

        let data = response.bytes().await.map_err(map_transport_error)?;
        if data.is_empty() {
            return Err(SynthesisError::Provider {
                status: status.as_u16(),
                message: "OpenAI returned an empty audio body".to_string(),
            });
        }

        tracing::debug!(
            "OpenAI synthesized {} bytes (voice: {}, remaining requests: {:?})",
            data.len(),
            voice,
            rate_limit.remaining_requests
        );

        Ok(AudioPayload::sniffed(data))
    }
}
