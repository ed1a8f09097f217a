pub mod base;
pub mod elevenlabs;
pub mod openai;

pub use base::{
    AudioFormat, AudioPayload, DEFAULT_RETRY_AFTER_SECS, RateLimitInfo, SynthesisClient,
    SynthesisConfig, SynthesisError, SynthesisResult,
};
pub use elevenlabs::{ELEVENLABS_API_URL, ElevenLabsModel, ElevenLabsSynthesis};
pub use openai::{OPENAI_SPEECH_URL, OpenAISpeechModel, OpenAISynthesis, OpenAIVoice};
use std::collections::HashMap;

/// Factory function to create a synthesis client.
///
/// # Supported Providers
///
/// - `"openai"` - OpenAI speech API (tts-1, tts-1-hd, gpt-4o-mini-tts)
/// - `"elevenlabs"` or `"eleven-labs"` or `"11labs"` - ElevenLabs API
///
/// # Example
///
/// ```rust,ignore
/// use narrata_audio::core::synthesis::{SynthesisConfig, create_synthesis_client};
///
/// let config = SynthesisConfig {
///     api_key: "your-api-key".to_string(),
///     ..Default::default()
/// };
///
/// let client = create_synthesis_client("openai", config)?;
/// ```
pub fn create_synthesis_client(
    provider: &str,
    config: SynthesisConfig,
) -> SynthesisResult<Box<dyn SynthesisClient>> {
    match provider.to_lowercase().as_str() {
        "openai" => Ok(Box::new(OpenAISynthesis::new(config)?)),
        "elevenlabs" | "eleven-labs" | "eleven_labs" | "11labs" => {
            Ok(Box::new(ElevenLabsSynthesis::new(config)?))
        }
        _ => Err(SynthesisError::Configuration(format!(
            "Unsupported synthesis provider: {provider}. Supported providers: openai, elevenlabs"
        ))),
    }
}

/// Returns a map of provider names to their default API endpoint URLs.
pub fn get_synthesis_provider_urls() -> HashMap<String, String> {
    let mut urls = HashMap::new();
    urls.insert("openai".to_string(), OPENAI_SPEECH_URL.to_string());
    urls.insert("elevenlabs".to_string(), ELEVENLABS_API_URL.to_string());
    urls
}
