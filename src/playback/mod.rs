//! Narration playback: chunk sequencing, transports, progress, readiness

pub mod chunk;
#[cfg(feature = "device-audio")]
pub mod device;
pub mod engine;
pub mod poller;
pub mod progress;
pub mod transport;

#[cfg(feature = "device-audio")]
pub use device::DeviceTransport;
pub use engine::{CompletionCallback, EngineState, PlaybackEngine};
pub use poller::{
    DEFAULT_POLL_BUDGET_SECS, DEFAULT_POLL_INTERVAL_MS, GenerationTrigger, PollerSettings,
    ReadinessPoller, TriggerError,
};
pub use progress::{MemoryProgressStore, ProgressError, ProgressRecord, ProgressStore};
pub use transport::{
    AudioTransport, CacheChunkSource, ChunkEnd, ChunkSource, PlaybackError, decode_chunk,
};
