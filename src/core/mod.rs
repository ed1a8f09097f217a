pub mod cache;
pub mod catalog;
pub mod synthesis;
pub mod voice;

// Re-export commonly used types for convenience
pub use cache::{
    CacheError, StoreLocation, VoiceCacheRecord, VoiceCacheStore, VoiceEntry, build_store,
};
pub use catalog::{CatalogError, ContentCatalog, ContentItem, MemoryCatalog};
pub use synthesis::{
    AudioFormat, AudioPayload, SynthesisClient, SynthesisConfig, SynthesisError, SynthesisResult,
    create_synthesis_client, get_synthesis_provider_urls,
};
pub use voice::{VoiceId, VoiceIdError, parse_voice_ids};
