//! ElevenLabs speech synthesis client.
//!
//! Implements [`SynthesisClient`] over the ElevenLabs text-to-speech API.
//!
//! # API Reference
//!
//! - Endpoint: `POST https://api.elevenlabs.io/v1/text-to-speech/{voice_id}`
//! - Auth: `xi-api-key` header
//! - Output format is a query parameter; the body carries text, model and
//!   voice settings

use async_trait::async_trait;
use serde_json::json;
use xxhash_rust::xxh3::xxh3_128;

use super::config::{ElevenLabsModel, ElevenLabsOutputFormat, VoiceSettings};
use crate::core::synthesis::base::{
    AudioPayload, RateLimitInfo, SynthesisClient, SynthesisConfig, SynthesisError,
    SynthesisResult, build_http_client, classify_status, map_transport_error,
    validate_input_text,
};
use crate::core::voice::VoiceId;
use crate::utils::url_validation::validate_base_url;

/// ElevenLabs API base URL
pub const ELEVENLABS_API_URL: &str = "https://api.elevenlabs.io";

/// Compute a hash of the client configuration, used in cache keys and logs
fn compute_config_hash(
    model: &ElevenLabsModel,
    format: &ElevenLabsOutputFormat,
    settings: &VoiceSettings,
) -> String {
    let mut s = String::new();
    s.push_str("elevenlabs");
    s.push('|');
    s.push_str(model.as_str());
    s.push('|');
    s.push_str(format.as_str());
    s.push('|');
    s.push_str(&format!(
        "{:.3}|{:.3}",
        settings.stability, settings.similarity_boost
    ));
    let hash = xxh3_128(s.as_bytes());
    format!("{hash:032x}")
}

/// ElevenLabs speech synthesis client.
///
/// Unlike OpenAI, ElevenLabs voice ids are arbitrary catalog ids, so any
/// well-formed [`VoiceId`] is passed through in the request path and the
/// provider decides whether it exists.
pub struct ElevenLabsSynthesis {
    http_client: reqwest::Client,
    api_key: String,
    model: ElevenLabsModel,
    output_format: ElevenLabsOutputFormat,
    voice_settings: VoiceSettings,
    base_url: String,
}

impl ElevenLabsSynthesis {
    /// Create a new ElevenLabs synthesis client
    pub fn new(config: SynthesisConfig) -> SynthesisResult<Self> {
        if config.api_key.is_empty() {
            return Err(SynthesisError::Configuration(
                "ElevenLabs API key is required".to_string(),
            ));
        }

        let model = if config.model.is_empty() {
            ElevenLabsModel::default()
        } else {
            ElevenLabsModel::from_str_or_default(&config.model)
        };

        let output_format = config
            .output_format
            .as_deref()
            .map(ElevenLabsOutputFormat::from_str_or_default)
            .unwrap_or_default();

        let base_url = match config.base_url.as_deref() {
            Some(base) => {
                validate_base_url(base).map_err(|e| {
                    SynthesisError::Configuration(format!("Invalid ElevenLabs base URL: {e}"))
                })?;
                base.trim_end_matches('/').to_string()
            }
            None => ELEVENLABS_API_URL.to_string(),
        };

        let http_client = build_http_client(&config)?;
        let voice_settings = VoiceSettings::default();
        tracing::debug!(
            "ElevenLabs synthesis client ready (model: {}, format: {}, config_hash: {})",
            model,
            output_format,
            compute_config_hash(&model, &output_format, &voice_settings)
        );

        Ok(Self {
            http_client,
            api_key: config.api_key,
            model,
            output_format,
            voice_settings,
            base_url,
        })
    }

    /// Get the configured model
    pub fn model(&self) -> ElevenLabsModel {
        self.model
    }

    /// Get the configured output format
    pub fn output_format(&self) -> ElevenLabsOutputFormat {
        self.output_format
    }

    fn build_request(&self, text: &str, voice: &VoiceId) -> reqwest::RequestBuilder {
        let url = format!(
            "{}/v1/text-to-speech/{}?output_format={}",
            self.base_url,
            voice.as_str(),
            self.output_format.as_str()
        );

        let body = json!({
            "text": text,
            "model_id": self.model.as_str(),
            "voice_settings": self.voice_settings.clamped(),
        });

        self.http_client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
    }
}

#[async_trait]
impl SynthesisClient for ElevenLabsSynthesis {
    fn provider_name(&self) -> &'static str {
        "elevenlabs"
    }

    async fn synthesize(&self, text: &str, voice: &VoiceId) -> SynthesisResult<AudioPayload> {
        validate_input_text(text)?;

        let response = self
            .build_request(text, voice)
            .send()
            .await
            .map_err(map_transport_error)?;

        let rate_limit = RateLimitInfo::from_headers(response.headers());
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // ElevenLabs wraps errors as {"detail": {"status": ..., "message": ...}}
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| {
                    v.get("detail")
                        .and_then(|d| d.get("message"))
                        .and_then(|m| m.as_str())
                        .map(|m| format!("ElevenLabs API error: {m}"))
                })
                .unwrap_or_else(|| format!("ElevenLabs API error ({status}): {body}"));
            return Err(classify_status(status.as_u16(), message, &rate_limit));
        }

        let data = response.bytes().await.map_err(map_transport_error)?;
        if data.is_empty() {
            return Err(SynthesisError::Provider {
                status: status.as_u16(),
                message: "ElevenLabs returned an empty audio body".to_string(),
            });
        }

        tracing::debug!(
            "ElevenLabs synthesized {} bytes (voice: {}, remaining requests: {:?})",
            data.len(),
            voice,
            rate_limit.remaining_requests
        );

        Ok(AudioPayload::sniffed(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> SynthesisConfig {
        SynthesisConfig {
            api_key: "el_test_key".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_client_creation() {
        let client = ElevenLabsSynthesis::new(SynthesisConfig {
            api_key: "k".into(),
            model: "turbo".into(),
            output_format: Some("pcm_24000".into()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(client.model(), ElevenLabsModel::TurboV2_5);
        assert_eq!(client.output_format(), ElevenLabsOutputFormat::Pcm24000);
        assert_eq!(client.provider_name(), "elevenlabs");
    }

    #[test]
    fn test_missing_api_key_rejected() {
        let result = ElevenLabsSynthesis::new(SynthesisConfig::default());
        assert!(matches!(result, Err(SynthesisError::Configuration(_))));
    }

    #[test]
    fn test_request_building_voice_in_path() {
        let client = ElevenLabsSynthesis::new(test_config()).unwrap();
        let voice = VoiceId::new("EXAVITQu4vr4xnSDxMaL").unwrap();
        let built = client.build_request("Hello there", &voice).build().unwrap();

        assert_eq!(
            built.url().as_str(),
            "https://api.elevenlabs.io/v1/text-to-speech/EXAVITQu4vr4xnSDxMaL?output_format=mp3_44100_128"
        );
        assert_eq!(built.headers().get("xi-api-key").unwrap(), "el_test_key");

        let body = built.body().unwrap().as_bytes().unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert_eq!(parsed["text"], "Hello there");
        assert_eq!(parsed["model_id"], "eleven_multilingual_v2");
        assert!((parsed["voice_settings"]["stability"].as_f64().unwrap() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_base_url_override() {
        let client = ElevenLabsSynthesis::new(SynthesisConfig {
            api_key: "k".into(),
            base_url: Some("https://mock.example.com/".into()),
            ..Default::default()
        })
        .unwrap();
        let voice = VoiceId::new("v1").unwrap();
        let built = client.build_request("Hi", &voice).build().unwrap();
        assert!(
            built
                .url()
                .as_str()
                .starts_with("https://mock.example.com/v1/text-to-speech/v1")
        );
    }

    #[tokio::test]
    async fn test_empty_text_fails_without_network() {
        let client = ElevenLabsSynthesis::new(test_config()).unwrap();
        let voice = VoiceId::new("v1").unwrap();
        let err = client.synthesize("", &voice).await.unwrap_err();
        assert!(matches!(err, SynthesisError::InvalidInput(_)));
    }

    #[test]
    fn test_config_hash_changes_with_model() {
        let settings = VoiceSettings::default();
        let h1 = compute_config_hash(
            &ElevenLabsModel::MultilingualV2,
            &ElevenLabsOutputFormat::Mp3_44100_128,
            &settings,
        );
        let h2 = compute_config_hash(
            &ElevenLabsModel::FlashV2_5,
            &ElevenLabsOutputFormat::Mp3_44100_128,
            &settings,
        );
        assert_ne!(h1, h2);
    }
}
