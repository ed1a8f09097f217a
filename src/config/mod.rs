//! Service configuration.
//!
//! Configuration is assembled from three layers, strongest last applied
//! first: a YAML file (when `--config` is given), process environment
//! variables, and built-in defaults. `.env` files are loaded into the
//! environment by `main` before any of this runs.
//!
//! API keys and S3 credentials are zeroized on drop.

pub mod yaml;

use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use zeroize::Zeroize;

use crate::core::cache::{DEFAULT_MIN_READY_BYTES, StoreLocation};
use crate::core::synthesis::SynthesisConfig;
use crate::core::voice::{VoiceId, VoiceIdError, parse_voice_ids};
use crate::pipeline::worker::{
    BASE_RETRY_DELAY_MS, DEFAULT_VOICE_COOLDOWN_MS, MAX_RETRY_AFTER_SECS, MAX_SYNTHESIS_ATTEMPTS,
    WorkerSettings,
};
use crate::playback::poller::{
    DEFAULT_POLL_BUDGET_SECS, DEFAULT_POLL_INTERVAL_MS, PollerSettings,
};
use crate::utils::text::DEFAULT_MAX_SEGMENT_CHARS;
use yaml::YamlConfig;

/// Default bind host
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default bind port
pub const DEFAULT_PORT: u16 = 8080;

/// Default object store key prefix for voice cache records
pub const DEFAULT_CACHE_PREFIX: &str = "narration";

/// Default TTL for the in-memory chunk response cache (seconds)
pub const DEFAULT_CHUNK_TTL_SECS: u64 = 300;

/// Default voice set every content item is narrated in
pub const DEFAULT_REQUIRED_VOICES: &[&str] = &["alloy", "nova", "shimmer"];

/// Default rate limit (requests per second per client IP)
pub const DEFAULT_RATE_LIMIT_PER_SECOND: u32 = 50;

/// Default rate limit burst size
pub const DEFAULT_RATE_LIMIT_BURST: u32 = 100;

/// Runtime configuration for the narration service
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
    /// TLS certificate path (PEM); TLS is enabled when both paths are set
    pub tls_cert_path: Option<String>,
    /// TLS private key path (PEM)
    pub tls_key_path: Option<String>,

    /// OpenAI API key
    pub openai_api_key: Option<String>,
    /// ElevenLabs API key
    pub elevenlabs_api_key: Option<String>,

    /// Synthesis provider name (`openai` or `elevenlabs`)
    pub synthesis_provider: String,
    /// Provider model; empty selects the provider default
    pub synthesis_model: String,
    /// Requested audio output format
    pub synthesis_output_format: Option<String>,
    /// Speaking rate multiplier, where the provider supports one
    pub synthesis_speaking_rate: Option<f32>,
    /// Provider endpoint override
    pub synthesis_base_url: Option<String>,
    /// Provider request timeout override (seconds)
    pub synthesis_timeout_secs: Option<u64>,

    /// Filesystem root for the voice cache; `None` with no S3 bucket means
    /// an in-memory store
    pub cache_path: Option<PathBuf>,
    /// S3 bucket for the voice cache
    pub cache_s3_bucket: Option<String>,
    /// S3 region
    pub cache_s3_region: Option<String>,
    /// S3 endpoint override, for S3-compatible stores
    pub cache_s3_endpoint: Option<String>,
    /// S3 access key
    pub cache_s3_access_key: Option<String>,
    /// S3 secret key
    pub cache_s3_secret_key: Option<String>,
    /// Key prefix inside the store
    pub cache_prefix: String,
    /// Byte floor below which a synthesized voice is not marked ready
    pub min_ready_bytes: usize,
    /// TTL for the in-memory chunk response cache (seconds)
    pub chunk_ttl_secs: u64,

    /// Voices every content item must be narrated in
    pub required_voices: Vec<String>,
    /// Attempt budget per synthesis request
    pub max_synthesis_attempts: u32,
    /// Base backoff delay for transient synthesis errors (ms)
    pub base_retry_delay_ms: u64,
    /// Cap on a provider-mandated Retry-After sleep (seconds)
    pub max_retry_after_secs: u64,
    /// Cooldown between consecutive voices of one item (ms)
    pub voice_cooldown_ms: u64,
    /// Character cap per synthesis request segment
    pub max_segment_chars: usize,

    /// Gap between readiness poll fetches (ms)
    pub poll_interval_ms: u64,
    /// Total readiness poll budget (seconds)
    pub poll_budget_secs: u64,

    /// CORS origins: comma-separated list, `*`, or `None` for same-origin
    pub cors_allowed_origins: Option<String>,
    /// Rate limit, requests per second per client IP
    pub rate_limit_per_second: u32,
    /// Rate limit burst size
    pub rate_limit_burst: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            tls_cert_path: None,
            tls_key_path: None,
            openai_api_key: None,
            elevenlabs_api_key: None,
            synthesis_provider: "openai".to_string(),
            synthesis_model: String::new(),
            synthesis_output_format: None,
            synthesis_speaking_rate: None,
            synthesis_base_url: None,
            synthesis_timeout_secs: None,
            cache_path: None,
            cache_s3_bucket: None,
            cache_s3_region: None,
            cache_s3_endpoint: None,
            cache_s3_access_key: None,
            cache_s3_secret_key: None,
            cache_prefix: DEFAULT_CACHE_PREFIX.to_string(),
            min_ready_bytes: DEFAULT_MIN_READY_BYTES,
            chunk_ttl_secs: DEFAULT_CHUNK_TTL_SECS,
            required_voices: DEFAULT_REQUIRED_VOICES
                .iter()
                .map(|v| v.to_string())
                .collect(),
            max_synthesis_attempts: MAX_SYNTHESIS_ATTEMPTS,
            base_retry_delay_ms: BASE_RETRY_DELAY_MS,
            max_retry_after_secs: MAX_RETRY_AFTER_SECS,
            voice_cooldown_ms: DEFAULT_VOICE_COOLDOWN_MS,
            max_segment_chars: DEFAULT_MAX_SEGMENT_CHARS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            poll_budget_secs: DEFAULT_POLL_BUDGET_SECS,
            cors_allowed_origins: None,
            rate_limit_per_second: DEFAULT_RATE_LIMIT_PER_SECOND,
            rate_limit_burst: DEFAULT_RATE_LIMIT_BURST,
        }
    }
}

impl Drop for ServerConfig {
    fn drop(&mut self) {
        if let Some(key) = self.openai_api_key.as_mut() {
            key.zeroize();
        }
        if let Some(key) = self.elevenlabs_api_key.as_mut() {
            key.zeroize();
        }
        if let Some(key) = self.cache_s3_access_key.as_mut() {
            key.zeroize();
        }
        if let Some(key) = self.cache_s3_secret_key.as_mut() {
            key.zeroize();
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    match env_string(name) {
        Some(raw) => match raw.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring unparseable {name}={raw}");
                None
            }
        },
        None => None,
    }
}

impl ServerConfig {
    /// Build from environment variables over built-in defaults
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        let config = Self {
            host: env_string("HOST").unwrap_or(defaults.host.clone()),
            port: env_parsed("PORT").unwrap_or(defaults.port),
            tls_cert_path: env_string("TLS_CERT_PATH"),
            tls_key_path: env_string("TLS_KEY_PATH"),
            openai_api_key: env_string("OPENAI_API_KEY"),
            elevenlabs_api_key: env_string("ELEVENLABS_API_KEY"),
            synthesis_provider: env_string("SYNTHESIS_PROVIDER")
                .unwrap_or(defaults.synthesis_provider.clone()),
            synthesis_model: env_string("SYNTHESIS_MODEL")
                .unwrap_or(defaults.synthesis_model.clone()),
            synthesis_output_format: env_string("SYNTHESIS_OUTPUT_FORMAT"),
            synthesis_speaking_rate: env_parsed("SYNTHESIS_SPEAKING_RATE"),
            synthesis_base_url: env_string("SYNTHESIS_BASE_URL"),
            synthesis_timeout_secs: env_parsed("SYNTHESIS_TIMEOUT_SECS"),
            cache_path: env_string("CACHE_PATH").map(PathBuf::from),
            cache_s3_bucket: env_string("CACHE_S3_BUCKET"),
            cache_s3_region: env_string("CACHE_S3_REGION"),
            cache_s3_endpoint: env_string("CACHE_S3_ENDPOINT"),
            cache_s3_access_key: env_string("CACHE_S3_ACCESS_KEY"),
            cache_s3_secret_key: env_string("CACHE_S3_SECRET_KEY"),
            cache_prefix: env_string("CACHE_PREFIX").unwrap_or(defaults.cache_prefix.clone()),
            min_ready_bytes: env_parsed("MIN_READY_BYTES").unwrap_or(defaults.min_ready_bytes),
            chunk_ttl_secs: env_parsed("CHUNK_TTL_SECS").unwrap_or(defaults.chunk_ttl_secs),
            required_voices: env_string("REQUIRED_VOICES")
                .map(|raw| {
                    raw.split(',')
                        .map(|v| v.trim().to_string())
                        .filter(|v| !v.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.required_voices.clone()),
            max_synthesis_attempts: env_parsed("MAX_SYNTHESIS_ATTEMPTS")
                .unwrap_or(defaults.max_synthesis_attempts),
            base_retry_delay_ms: env_parsed("BASE_RETRY_DELAY_MS")
                .unwrap_or(defaults.base_retry_delay_ms),
            max_retry_after_secs: env_parsed("MAX_RETRY_AFTER_SECS")
                .unwrap_or(defaults.max_retry_after_secs),
            voice_cooldown_ms: env_parsed("VOICE_COOLDOWN_MS")
                .unwrap_or(defaults.voice_cooldown_ms),
            max_segment_chars: env_parsed("MAX_SEGMENT_CHARS")
                .unwrap_or(defaults.max_segment_chars),
            poll_interval_ms: env_parsed("POLL_INTERVAL_MS").unwrap_or(defaults.poll_interval_ms),
            poll_budget_secs: env_parsed("POLL_BUDGET_SECS").unwrap_or(defaults.poll_budget_secs),
            cors_allowed_origins: env_string("CORS_ALLOWED_ORIGINS"),
            rate_limit_per_second: env_parsed("RATE_LIMIT_PER_SECOND")
                .unwrap_or(defaults.rate_limit_per_second),
            rate_limit_burst: env_parsed("RATE_LIMIT_BURST").unwrap_or(defaults.rate_limit_burst),
        };

        config.validate()?;
        Ok(config)
    }

    /// Build from a YAML file merged over the environment-derived base
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let file = YamlConfig::from_file(path)?;
        info!("Loaded configuration file {}", path.display());

        let mut config = Self::from_env()?;
        config.apply_yaml(file);
        config.validate()?;
        Ok(config)
    }

    fn apply_yaml(&mut self, file: YamlConfig) {
        if let Some(server) = file.server {
            if let Some(host) = server.host {
                self.host = host;
            }
            if let Some(port) = server.port {
                self.port = port;
            }
            if server.tls_cert_path.is_some() {
                self.tls_cert_path = server.tls_cert_path;
            }
            if server.tls_key_path.is_some() {
                self.tls_key_path = server.tls_key_path;
            }
        }

        if let Some(providers) = file.providers {
            if providers.openai_api_key.is_some() {
                self.openai_api_key = providers.openai_api_key;
            }
            if providers.elevenlabs_api_key.is_some() {
                self.elevenlabs_api_key = providers.elevenlabs_api_key;
            }
        }

        if let Some(synthesis) = file.synthesis {
            if let Some(provider) = synthesis.provider {
                self.synthesis_provider = provider;
            }
            if let Some(model) = synthesis.model {
                self.synthesis_model = model;
            }
            if synthesis.output_format.is_some() {
                self.synthesis_output_format = synthesis.output_format;
            }
            if synthesis.speaking_rate.is_some() {
                self.synthesis_speaking_rate = synthesis.speaking_rate;
            }
            if synthesis.base_url.is_some() {
                self.synthesis_base_url = synthesis.base_url;
            }
            if synthesis.timeout_secs.is_some() {
                self.synthesis_timeout_secs = synthesis.timeout_secs;
            }
        }

        if let Some(cache) = file.cache {
            if let Some(path) = cache.path {
                self.cache_path = Some(PathBuf::from(path));
            }
            if cache.s3_bucket.is_some() {
                self.cache_s3_bucket = cache.s3_bucket;
            }
            if cache.s3_region.is_some() {
                self.cache_s3_region = cache.s3_region;
            }
            if cache.s3_endpoint.is_some() {
                self.cache_s3_endpoint = cache.s3_endpoint;
            }
            if cache.s3_access_key.is_some() {
                self.cache_s3_access_key = cache.s3_access_key;
            }
            if cache.s3_secret_key.is_some() {
                self.cache_s3_secret_key = cache.s3_secret_key;
            }
            if let Some(prefix) = cache.prefix {
                self.cache_prefix = prefix;
            }
            if let Some(bytes) = cache.min_ready_bytes {
                self.min_ready_bytes = bytes;
            }
            if let Some(ttl) = cache.chunk_ttl_secs {
                self.chunk_ttl_secs = ttl;
            }
        }

        if let Some(narration) = file.narration {
            if let Some(voices) = narration.required_voices {
                self.required_voices = voices;
            }
            if let Some(attempts) = narration.max_attempts {
                self.max_synthesis_attempts = attempts;
            }
            if let Some(delay) = narration.base_retry_delay_ms {
                self.base_retry_delay_ms = delay;
            }
            if let Some(cap) = narration.max_retry_after_secs {
                self.max_retry_after_secs = cap;
            }
            if let Some(cooldown) = narration.voice_cooldown_ms {
                self.voice_cooldown_ms = cooldown;
            }
            if let Some(chars) = narration.max_segment_chars {
                self.max_segment_chars = chars;
            }
        }

        if let Some(playback) = file.playback {
            if let Some(interval) = playback.poll_interval_ms {
                self.poll_interval_ms = interval;
            }
            if let Some(budget) = playback.poll_budget_secs {
                self.poll_budget_secs = budget;
            }
        }

        if let Some(security) = file.security {
            if security.cors_allowed_origins.is_some() {
                self.cors_allowed_origins = security.cors_allowed_origins;
            }
            if let Some(rps) = security.rate_limit_per_second {
                self.rate_limit_per_second = rps;
            }
            if let Some(burst) = security.rate_limit_burst {
                self.rate_limit_burst = burst;
            }
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.required_voices.is_empty() {
            return Err("At least one required voice must be configured".to_string());
        }
        self.required_voice_ids()
            .map_err(|e| format!("Invalid required voice: {e}"))?;

        if self.max_synthesis_attempts == 0 {
            return Err("max_attempts must be at least 1".to_string());
        }

        if self.tls_cert_path.is_some() != self.tls_key_path.is_some() {
            return Err("TLS requires both a certificate path and a key path".to_string());
        }

        if self.cache_path.is_some() && self.cache_s3_bucket.is_some() {
            return Err(
                "Configure either a filesystem cache path or an S3 bucket, not both".to_string(),
            );
        }

        Ok(())
    }

    /// Socket address string to bind
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether TLS material is configured
    pub fn is_tls_enabled(&self) -> bool {
        self.tls_cert_path.is_some() && self.tls_key_path.is_some()
    }

    /// Look up the API key for a provider, accepting the common aliases
    pub fn get_api_key(&self, provider: &str) -> Result<String, String> {
        let key = match provider.to_lowercase().as_str() {
            "openai" | "open-ai" | "open_ai" => self.openai_api_key.clone(),
            "elevenlabs" | "eleven-labs" | "eleven_labs" | "11labs" => {
                self.elevenlabs_api_key.clone()
            }
            other => return Err(format!("Unknown synthesis provider: {other}")),
        };
        key.ok_or_else(|| format!("No API key configured for provider {provider}"))
    }

    /// Provider client configuration for the configured synthesis provider
    pub fn synthesis_config(&self) -> Result<SynthesisConfig, String> {
        Ok(SynthesisConfig {
            api_key: self.get_api_key(&self.synthesis_provider)?,
            model: self.synthesis_model.clone(),
            output_format: self.synthesis_output_format.clone(),
            speaking_rate: self.synthesis_speaking_rate,
            base_url: self.synthesis_base_url.clone(),
            timeout_secs: self.synthesis_timeout_secs,
            connect_timeout_secs: None,
        })
    }

    /// Where voice cache records live
    pub fn store_location(&self) -> StoreLocation {
        if let Some(bucket) = &self.cache_s3_bucket {
            StoreLocation::S3 {
                bucket: bucket.clone(),
                region: self.cache_s3_region.clone(),
                endpoint: self.cache_s3_endpoint.clone(),
                access_key: self.cache_s3_access_key.clone(),
                secret_key: self.cache_s3_secret_key.clone(),
            }
        } else if let Some(path) = &self.cache_path {
            StoreLocation::Filesystem(path.clone())
        } else {
            StoreLocation::Memory
        }
    }

    /// The configured required voices as validated ids
    pub fn required_voice_ids(&self) -> Result<Vec<VoiceId>, VoiceIdError> {
        parse_voice_ids(&self.required_voices)
    }

    /// Worker knobs assembled from the narration settings
    pub fn worker_settings(&self) -> WorkerSettings {
        WorkerSettings {
            max_attempts: self.max_synthesis_attempts,
            base_retry_delay_ms: self.base_retry_delay_ms,
            max_retry_after_secs: self.max_retry_after_secs,
            voice_cooldown_ms: self.voice_cooldown_ms,
            max_segment_chars: self.max_segment_chars,
        }
    }

    /// Readiness poller knobs
    pub fn poller_settings(&self) -> PollerSettings {
        PollerSettings {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            budget: Duration::from_secs(self.poll_budget_secs),
        }
    }
}
