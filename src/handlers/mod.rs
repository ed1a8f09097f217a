//! HTTP request handlers
//!
//! - `health`: liveness probe
//! - `content`: summary registration (doubles as the generation trigger)
//! - `audio`: synthesis dispatch, chunk retrieval, backlog status and runs
//! - `progress`: listening progress upserts and reads
//! - `voices`: voice catalog listing

pub mod audio;
pub mod content;
pub mod health;
pub mod progress;
pub mod voices;

pub use audio::{audio_status, generate_audio, get_chunks, run_backlog};
pub use content::create_content;
pub use health::health_check;
pub use progress::{get_progress, put_progress};
pub use voices::list_voices;
