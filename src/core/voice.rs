//! Validated voice identifiers.
//!
//! Voice identifiers are opaque to the core pipeline: only the synthesis
//! provider interprets them. Validation here is purely structural so that a
//! malformed id is rejected at the boundary instead of deep inside a request
//! builder.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Maximum accepted length for a voice identifier
pub const MAX_VOICE_ID_LEN: usize = 64;

/// Errors produced when validating a voice identifier
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoiceIdError {
    #[error("Voice id cannot be empty")]
    Empty,

    #[error("Voice id exceeds {MAX_VOICE_ID_LEN} characters")]
    TooLong,

    #[error("Voice id contains invalid character {0:?} (allowed: A-Z a-z 0-9 . _ -)")]
    InvalidCharacter(char),
}

/// An opaque, validated voice identifier.
///
/// Accepted ids are non-empty, at most [`MAX_VOICE_ID_LEN`] characters, and
/// restricted to `[A-Za-z0-9._-]`. The restriction keeps ids safe to embed in
/// URL paths and object store keys without escaping.
///
/// # Example
/// ```rust,ignore
/// let voice = VoiceId::new("alloy")?;
/// assert_eq!(voice.as_str(), "alloy");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct VoiceId(String);

impl VoiceId {
    /// Validate a raw string into a `VoiceId`
    pub fn new(raw: impl Into<String>) -> Result<Self, VoiceIdError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(VoiceIdError::Empty);
        }
        if raw.len() > MAX_VOICE_ID_LEN {
            return Err(VoiceIdError::TooLong);
        }
        if let Some(bad) = raw
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '.' | '_' | '-'))
        {
            return Err(VoiceIdError::InvalidCharacter(bad));
        }
        Ok(Self(raw))
    }

    /// Return the identifier as a string slice
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the id, returning the inner string
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VoiceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for VoiceId {
    type Err = VoiceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for VoiceId {
    type Error = VoiceIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

// Deserialization goes through validation so malformed ids are rejected at
// the wire instead of surfacing later as provider errors.
impl<'de> Deserialize<'de> for VoiceId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        VoiceId::new(raw).map_err(serde::de::Error::custom)
    }
}

/// Parse a list of raw voice id strings, failing on the first invalid entry.
///
/// Used when turning the configured required-voice list into validated ids at
/// startup.
pub fn parse_voice_ids(raw: &[String]) -> Result<Vec<VoiceId>, VoiceIdError> {
    raw.iter().map(|s| VoiceId::new(s.clone())).collect()
}
