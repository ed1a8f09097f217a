//! ElevenLabs speech synthesis provider module.
//!
//! Text-to-speech through the ElevenLabs API. Voice ids address the account's
//! voice catalog and are passed through opaquely; the provider validates
//! their existence.
//!
//! # Supported Models
//!
//! - `eleven_multilingual_v2` - highest quality
//! - `eleven_turbo_v2_5` - balanced latency and quality
//! - `eleven_flash_v2_5` - lowest latency

mod config;
mod provider;

pub use config::{ElevenLabsModel, ElevenLabsOutputFormat, VoiceSettings};
pub use provider::{ELEVENLABS_API_URL, ElevenLabsSynthesis};
