//! YAML configuration file support.
//!
//! Every field is optional; the file only has to mention what it overrides.
//! [`crate::config::ServerConfig`] merges a parsed [`YamlConfig`] over the
//! environment-derived base, so precedence stays YAML > environment >
//! defaults.
//!
//! ```yaml
//! server:
//!   host: "0.0.0.0"
//!   port: 8080
//!
//! synthesis:
//!   provider: "openai"
//!   model: "tts-1"
//!
//! cache:
//!   path: "/var/lib/narrata/audio"
//!   min_ready_bytes: 1024
//!
//! narration:
//!   required_voices: ["alloy", "nova", "shimmer"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root of the YAML configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct YamlConfig {
    #[serde(default)]
    pub server: Option<ServerSection>,
    #[serde(default)]
    pub providers: Option<ProvidersSection>,
    #[serde(default)]
    pub synthesis: Option<SynthesisSection>,
    #[serde(default)]
    pub cache: Option<CacheSection>,
    #[serde(default)]
    pub narration: Option<NarrationSection>,
    #[serde(default)]
    pub playback: Option<PlaybackSection>,
    #[serde(default)]
    pub security: Option<SecuritySection>,
}

/// Bind address and TLS material
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub tls_cert_path: Option<String>,
    #[serde(default)]
    pub tls_key_path: Option<String>,
}

/// Provider credentials. Environment variables are the usual home for
/// these; the file form exists for development setups.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProvidersSection {
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub elevenlabs_api_key: Option<String>,
}

/// Which provider synthesizes, and how
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SynthesisSection {
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub output_format: Option<String>,
    #[serde(default)]
    pub speaking_rate: Option<f32>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Voice cache backing store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSection {
    /// Filesystem root for cache records; unset (and no S3 bucket) means
    /// an in-process memory store
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub s3_bucket: Option<String>,
    #[serde(default)]
    pub s3_region: Option<String>,
    #[serde(default)]
    pub s3_endpoint: Option<String>,
    #[serde(default)]
    pub s3_access_key: Option<String>,
    #[serde(default)]
    pub s3_secret_key: Option<String>,
    /// Key prefix inside the store
    #[serde(default)]
    pub prefix: Option<String>,
    /// Byte floor below which a synthesized voice is not marked ready
    #[serde(default)]
    pub min_ready_bytes: Option<usize>,
    /// TTL for the in-memory chunk response cache (seconds)
    #[serde(default)]
    pub chunk_ttl_secs: Option<u64>,
}

/// Worker behavior for the synthesis pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NarrationSection {
    #[serde(default)]
    pub required_voices: Option<Vec<String>>,
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub base_retry_delay_ms: Option<u64>,
    #[serde(default)]
    pub max_retry_after_secs: Option<u64>,
    #[serde(default)]
    pub voice_cooldown_ms: Option<u64>,
    #[serde(default)]
    pub max_segment_chars: Option<usize>,
}

/// Readiness poller timing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlaybackSection {
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,
    #[serde(default)]
    pub poll_budget_secs: Option<u64>,
}

/// CORS and rate limiting
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecuritySection {
    /// Comma-separated origin list, `*`, or unset for same-origin only
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,
    #[serde(default)]
    pub rate_limit_per_second: Option<u32>,
    #[serde(default)]
    pub rate_limit_burst: Option<u32>,
}

impl YamlConfig {
    /// Parse a configuration file. Unknown keys are rejected so typos fail
    /// loudly at startup instead of silently falling back to defaults.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;
        serde_yaml::from_str(&raw)
            .map_err(|e| format!("Failed to parse config file {}: {e}", path.display()))
    }
}
