//! Configuration types for the ElevenLabs text-to-speech API.

use serde::{Deserialize, Serialize};

// =============================================================================
// ElevenLabs Models
// =============================================================================

/// Supported ElevenLabs models.
///
/// - `eleven_multilingual_v2`: Highest quality, 29 languages
/// - `eleven_turbo_v2_5`: Lower latency, good quality
/// - `eleven_flash_v2_5`: Lowest latency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ElevenLabsModel {
    /// Multilingual v2 - highest quality (default)
    #[default]
    #[serde(rename = "eleven_multilingual_v2")]
    MultilingualV2,
    /// Turbo v2.5 - balanced latency and quality
    #[serde(rename = "eleven_turbo_v2_5")]
    TurboV2_5,
    /// Flash v2.5 - lowest latency
    #[serde(rename = "eleven_flash_v2_5")]
    FlashV2_5,
}

impl ElevenLabsModel {
    /// Convert to the API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MultilingualV2 => "eleven_multilingual_v2",
            Self::TurboV2_5 => "eleven_turbo_v2_5",
            Self::FlashV2_5 => "eleven_flash_v2_5",
        }
    }

    /// Parse from string, with fallback to default.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "eleven_multilingual_v2" | "multilingual_v2" | "multilingual" => Self::MultilingualV2,
            "eleven_turbo_v2_5" | "turbo_v2_5" | "turbo" => Self::TurboV2_5,
            "eleven_flash_v2_5" | "flash_v2_5" | "flash" => Self::FlashV2_5,
            _ => Self::default(),
        }
    }
}

impl std::fmt::Display for ElevenLabsModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Output Format
// =============================================================================

/// Output formats accepted by the ElevenLabs API (query parameter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ElevenLabsOutputFormat {
    /// MP3 at 22.05kHz, 32kbps
    #[serde(rename = "mp3_22050_32")]
    Mp3_22050_32,
    /// MP3 at 44.1kHz, 64kbps
    #[serde(rename = "mp3_44100_64")]
    Mp3_44100_64,
    /// MP3 at 44.1kHz, 128kbps (default)
    #[default]
    #[serde(rename = "mp3_44100_128")]
    Mp3_44100_128,
    /// Raw PCM at 16kHz
    #[serde(rename = "pcm_16000")]
    Pcm16000,
    /// Raw PCM at 24kHz
    #[serde(rename = "pcm_24000")]
    Pcm24000,
}

impl ElevenLabsOutputFormat {
    /// Convert to the API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mp3_22050_32 => "mp3_22050_32",
            Self::Mp3_44100_64 => "mp3_44100_64",
            Self::Mp3_44100_128 => "mp3_44100_128",
            Self::Pcm16000 => "pcm_16000",
            Self::Pcm24000 => "pcm_24000",
        }
    }

    /// Parse from string, with fallback to default.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "mp3_22050_32" => Self::Mp3_22050_32,
            "mp3_44100_64" => Self::Mp3_44100_64,
            "mp3_44100_128" | "mp3" => Self::Mp3_44100_128,
            "pcm_16000" => Self::Pcm16000,
            "pcm_24000" => Self::Pcm24000,
            _ => Self::default(),
        }
    }
}

impl std::fmt::Display for ElevenLabsOutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Voice Settings
// =============================================================================

/// Voice rendering settings sent with every request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiceSettings {
    /// Stability (0.0 - 1.0); lower is more expressive
    pub stability: f32,
    /// Similarity boost (0.0 - 1.0); higher tracks the reference voice closer
    pub similarity_boost: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.5,
            similarity_boost: 0.75,
        }
    }
}

impl VoiceSettings {
    /// Clamp both knobs into the valid 0.0 - 1.0 range
    pub fn clamped(self) -> Self {
        Self {
            stability: self.stability.clamp(0.0, 1.0),
            similarity_boost: self.similarity_boost.clamp(0.0, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_values() {
        assert_eq!(
            ElevenLabsModel::MultilingualV2.as_str(),
            "eleven_multilingual_v2"
        );
        assert_eq!(ElevenLabsModel::TurboV2_5.as_str(), "eleven_turbo_v2_5");
        assert_eq!(ElevenLabsModel::FlashV2_5.as_str(), "eleven_flash_v2_5");
    }

    #[test]
    fn test_model_aliases() {
        assert_eq!(
            ElevenLabsModel::from_str_or_default("turbo"),
            ElevenLabsModel::TurboV2_5
        );
        assert_eq!(
            ElevenLabsModel::from_str_or_default("FLASH"),
            ElevenLabsModel::FlashV2_5
        );
        assert_eq!(
            ElevenLabsModel::from_str_or_default("bogus"),
            ElevenLabsModel::MultilingualV2
        );
    }

    #[test]
    fn test_output_format_values() {
        assert_eq!(
            ElevenLabsOutputFormat::default().as_str(),
            "mp3_44100_128"
        );
        assert_eq!(
            ElevenLabsOutputFormat::from_str_or_default("mp3"),
            ElevenLabsOutputFormat::Mp3_44100_128
        );
        assert_eq!(
            ElevenLabsOutputFormat::from_str_or_default("pcm_24000"),
            ElevenLabsOutputFormat::Pcm24000
        );
    }

    #[test]
    fn test_voice_settings_defaults_and_clamping() {
        let defaults = VoiceSettings::default();
        assert!((defaults.stability - 0.5).abs() < f32::EPSILON);
        assert!((defaults.similarity_boost - 0.75).abs() < f32::EPSILON);

        let wild = VoiceSettings {
            stability: 3.0,
            similarity_boost: -1.0,
        }
        .clamped();
        assert!((wild.stability - 1.0).abs() < f32::EPSILON);
        assert!(wild.similarity_boost.abs() < f32::EPSILON);
    }
}
