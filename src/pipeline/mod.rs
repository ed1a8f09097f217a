//! Narration pipeline: synthesis worker and backlog scanner

pub mod backlog;
pub mod worker;

pub use backlog::{BacklogItem, BacklogRunReport, BacklogScanner, BacklogStatus, DispatchedJob, NarrationCoverage};
pub use worker::{
    BASE_RETRY_DELAY_MS, DEFAULT_VOICE_COOLDOWN_MS, MAX_RETRY_AFTER_SECS, MAX_SYNTHESIS_ATTEMPTS,
    SynthesisWorker, WorkerError, WorkerOutcome, WorkerSettings,
};
