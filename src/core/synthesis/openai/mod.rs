//! OpenAI speech synthesis provider module.
//!
//! This module provides text-to-speech through OpenAI's Audio Speech API.
//!
//! # Supported Models
//!
//! - `tts-1` - Standard quality, lower latency
//! - `tts-1-hd` - High definition quality, higher latency
//! - `gpt-4o-mini-tts` - Latest model with improved quality
//!
//! # Supported Voices
//!
//! alloy, ash, ballad, coral, echo, fable, onyx, nova, sage, shimmer, verse
//!
//! # Example
//!
//! ```rust,ignore
//! use narrata_audio::core::synthesis::{OpenAISynthesis, SynthesisClient, SynthesisConfig};
//! use narrata_audio::core::voice::VoiceId;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SynthesisConfig {
//!         api_key: "sk-...".to_string(),
//!         model: "tts-1-hd".to_string(),
//!         ..Default::default()
//!     };
//!     let client = OpenAISynthesis::new(config)?;
//!     let audio = client.synthesize("Hello, world!", &VoiceId::new("nova")?).await?;
//!     Ok(())
//! }
//! ```

mod config;
mod provider;

pub use config::{OpenAISpeechModel, OpenAIVoice, SpeechOutputFormat};
pub use provider::{OPENAI_SPEECH_URL, OpenAISynthesis};
