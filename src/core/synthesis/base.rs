//! Base trait and shared types for speech synthesis providers.
//!
//! Every provider client implements [`SynthesisClient`]: one text-plus-voice
//! request in, one audio payload out. Failures carry enough type information
//! for the worker to decide between honoring a Retry-After, backing off, and
//! giving up on a voice.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::core::voice::VoiceId;

// =============================================================================
// Constants
// =============================================================================

/// Default request timeout for synthesis calls (seconds).
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default connect timeout for synthesis calls (seconds).
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Retry delay assumed when a 429 arrives without a usable Retry-After header
/// (seconds).
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 1;

/// User-Agent header value for provider API requests.
pub const USER_AGENT: &str = concat!("Narrata-Audio/", env!("CARGO_PKG_VERSION"));

// =============================================================================
// Result and Error Types
// =============================================================================

/// Result type for synthesis operations
pub type SynthesisResult<T> = Result<T, SynthesisError>;

/// Errors produced by synthesis providers.
///
/// The variants partition into three classes the worker reacts to
/// differently: rate limited (sleep the provider-supplied delay), transient
/// (exponential backoff), and permanent (abort the voice, no retry).
#[derive(Debug, Clone, Error)]
pub enum SynthesisError {
    /// Provider returned 429; retry no sooner than the carried delay.
    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Request or connect timeout. Transient.
    #[error("Synthesis request timed out: {0}")]
    Timeout(String),

    /// Connection-level failure (DNS, refused, reset). Transient.
    #[error("Connection to provider failed: {0}")]
    Connection(String),

    /// Provider-side 5xx. Transient.
    #[error("Provider error ({status}): {message}")]
    Provider { status: u16, message: String },

    /// Voice rejected by the provider. Permanent.
    #[error("Voice not accepted by provider: {0}")]
    InvalidVoice(String),

    /// Credentials rejected. Permanent.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Input rejected before or by the provider (empty text, oversized
    /// request, malformed body). Permanent.
    #[error("Invalid synthesis input: {0}")]
    InvalidInput(String),

    /// Client misconfiguration (unknown provider, missing key). Permanent.
    #[error("Synthesis configuration error: {0}")]
    Configuration(String),
}

impl SynthesisError {
    /// Whether the worker may retry after this error.
    ///
    /// Rate-limited and transient errors are retryable; everything else
    /// aborts the voice.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SynthesisError::RateLimited { .. }
                | SynthesisError::Timeout(_)
                | SynthesisError::Connection(_)
                | SynthesisError::Provider { status: 500..=599, .. }
        )
    }

    /// Provider-mandated retry delay, when one was supplied
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            SynthesisError::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        }
    }
}

/// Map a non-success HTTP status from a synthesis endpoint to a typed error.
///
/// Shared by the provider clients so retry behavior stays uniform: 429 picks
/// up the Retry-After delay, 5xx is transient, the interesting 4xx codes get
/// their own permanent variants.
pub fn classify_status(
    status: u16,
    message: String,
    rate_limit: &RateLimitInfo,
) -> SynthesisError {
    match status {
        429 => SynthesisError::RateLimited {
            retry_after_secs: rate_limit
                .retry_after_secs
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        },
        401 | 403 => SynthesisError::AuthenticationFailed(message),
        404 | 422 => SynthesisError::InvalidVoice(message),
        400 | 413 => SynthesisError::InvalidInput(message),
        500..=599 => SynthesisError::Provider { status, message },
        _ => SynthesisError::Provider { status, message },
    }
}

/// Reject text that has no synthesizable content.
///
/// Runs before any network call so an empty request never consumes an
/// attempt.
pub fn validate_input_text(text: &str) -> SynthesisResult<()> {
    if text.trim().is_empty() {
        return Err(SynthesisError::InvalidInput(
            "Text to synthesize cannot be empty".to_string(),
        ));
    }
    Ok(())
}

// =============================================================================
// Provider Configuration
// =============================================================================

/// Provider-agnostic synthesis configuration.
///
/// Provider-specific fields (model names, output formats) are carried as
/// strings and parsed by each client with sensible defaults, so one config
/// shape feeds every provider the factory knows about.
#[derive(Debug, Clone, Default)]
pub struct SynthesisConfig {
    /// Provider API key
    pub api_key: String,
    /// Provider model name; empty selects the provider default
    pub model: String,
    /// Requested output format; `None` selects the provider default
    pub output_format: Option<String>,
    /// Speaking rate multiplier where the provider supports one
    pub speaking_rate: Option<f32>,
    /// Endpoint override, mainly for tests and self-hosted relays
    pub base_url: Option<String>,
    /// Request timeout override (seconds)
    pub timeout_secs: Option<u64>,
    /// Connect timeout override (seconds)
    pub connect_timeout_secs: Option<u64>,
}

/// Build the shared HTTP client for a synthesis provider.
///
/// Every remote call carries a request timeout and a connect timeout;
/// elapsed deadlines surface as [`SynthesisError::Timeout`].
pub fn build_http_client(config: &SynthesisConfig) -> SynthesisResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(
            config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        ))
        .connect_timeout(std::time::Duration::from_secs(
            config
                .connect_timeout_secs
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
        ))
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(std::time::Duration::from_secs(90))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| SynthesisError::Configuration(format!("Failed to build HTTP client: {e}")))
}

/// Map a reqwest transport error to the synthesis taxonomy.
pub fn map_transport_error(e: reqwest::Error) -> SynthesisError {
    if e.is_timeout() {
        SynthesisError::Timeout(e.to_string())
    } else {
        SynthesisError::Connection(e.to_string())
    }
}

// =============================================================================
// Rate Limit Parsing
// =============================================================================

/// Rate limit information from provider response headers.
#[derive(Debug, Clone, Default)]
pub struct RateLimitInfo {
    /// Remaining requests in the current window.
    pub remaining_requests: Option<u32>,
    /// Retry-After value from a 429 response (seconds).
    pub retry_after_secs: Option<u64>,
}

impl RateLimitInfo {
    /// Parse rate limit headers from an HTTP response.
    pub fn from_headers(headers: &reqwest::header::HeaderMap) -> Self {
        Self {
            remaining_requests: headers
                .get("x-ratelimit-remaining-requests")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok()),
            retry_after_secs: headers
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(Self::parse_retry_after),
        }
    }

    /// Parse a Retry-After header value into whole seconds.
    ///
    /// Accepts an integer second count or a duration string like "1s",
    /// "500ms", "1m". Sub-second values round up so a mandated delay is never
    /// shortened. HTTP-date forms are not parsed; callers fall back to
    /// [`DEFAULT_RETRY_AFTER_SECS`].
    pub fn parse_retry_after(s: &str) -> Option<u64> {
        if let Ok(secs) = s.trim().parse::<u64>() {
            return Some(secs);
        }
        Self::parse_duration_string(s).map(|ms| ms.div_ceil(1000))
    }

    /// Parse duration strings like "1s", "500ms", "1m" into milliseconds.
    pub fn parse_duration_string(s: &str) -> Option<u64> {
        let s = s.trim();
        if s.ends_with("ms") {
            s.trim_end_matches("ms").parse().ok()
        } else if s.ends_with('s') {
            s.trim_end_matches('s')
                .parse::<u64>()
                .ok()
                .map(|v| v * 1000)
        } else if s.ends_with('m') {
            s.trim_end_matches('m')
                .parse::<u64>()
                .ok()
                .map(|v| v * 60 * 1000)
        } else {
            None
        }
    }
}

// =============================================================================
// Audio Payload
// =============================================================================

/// Container format of a synthesized audio payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
    Wav,
    Ogg,
    Flac,
    M4a,
}

impl AudioFormat {
    /// MIME type for HTTP responses
    #[inline]
    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Ogg => "audio/ogg",
            AudioFormat::Flac => "audio/flac",
            AudioFormat::M4a => "audio/mp4",
        }
    }

    /// Conventional file extension
    #[inline]
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Flac => "flac",
            AudioFormat::M4a => "m4a",
        }
    }

    /// Detect the container format from magic bytes.
    ///
    /// Providers do not always label their responses, so the payload is
    /// sniffed: ID3 tag or MPEG sync for MP3, RIFF/WAVE, ftyp box for M4A,
    /// OggS, fLaC. Anything unrecognized (including payloads shorter than 12
    /// bytes) is treated as MP3, the format every configured provider is
    /// asked for.
    pub fn detect(data: &[u8]) -> AudioFormat {
        if data.len() < 12 {
            return AudioFormat::Mp3;
        }

        // MP3: ID3 tag or MPEG frame sync
        if data.starts_with(b"ID3") || (data[0] == 0xFF && (data[1] & 0xE0) == 0xE0) {
            return AudioFormat::Mp3;
        }

        // WAV: RIFF container with WAVE type
        if data.starts_with(b"RIFF") && &data[8..12] == b"WAVE" {
            return AudioFormat::Wav;
        }

        // M4A/MP4: ftyp box at offset 4
        if &data[4..8] == b"ftyp" {
            return AudioFormat::M4a;
        }

        // OGG container
        if data.starts_with(b"OggS") {
            return AudioFormat::Ogg;
        }

        // FLAC stream marker
        if data.starts_with(b"fLaC") {
            return AudioFormat::Flac;
        }

        AudioFormat::Mp3
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// A synthesized audio payload: raw bytes plus detected container format.
#[derive(Debug, Clone)]
pub struct AudioPayload {
    pub data: Bytes,
    pub format: AudioFormat,
}

impl AudioPayload {
    pub fn new(data: Bytes, format: AudioFormat) -> Self {
        Self { data, format }
    }

    /// Build a payload, sniffing the format from the leading bytes
    pub fn sniffed(data: Bytes) -> Self {
        let format = AudioFormat::detect(&data);
        Self { data, format }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

// =============================================================================
// Synthesis Client Trait
// =============================================================================

/// Common interface for speech synthesis providers.
///
/// Implementations must be `Send + Sync` so a boxed client can be shared by
/// the worker and handlers. A call is one-shot: no streaming, no session
/// state, every request carries its own timeout.
#[async_trait]
pub trait SynthesisClient: Send + Sync {
    /// Canonical provider name ("openai", "elevenlabs")
    fn provider_name(&self) -> &'static str;

    /// Synthesize `text` in the given voice.
    ///
    /// # Arguments
    /// * `text` - Sanitized text to speak; must be non-empty
    /// * `voice` - Provider-interpreted voice identifier
    ///
    /// # Returns
    /// * `Ok(AudioPayload)` - Raw audio bytes with detected format
    /// * `Err(SynthesisError)` - Typed failure; see [`SynthesisError::is_retryable`]
    async fn synthesize(&self, text: &str, voice: &VoiceId) -> SynthesisResult<AudioPayload>;
}
