//! Configuration types for the OpenAI speech API.
//!
//! This module contains configuration types for OpenAI's text-to-speech API:
//! - Model selection (tts-1, tts-1-hd, gpt-4o-mini-tts)
//! - Voice selection (11 available voices)
//! - Output format and speaking speed

use serde::{Deserialize, Serialize};

use crate::core::voice::VoiceId;

// =============================================================================
// OpenAI Speech Models
// =============================================================================

/// Supported OpenAI speech models.
///
/// - `tts-1`: Standard quality, lower latency
/// - `tts-1-hd`: High definition quality, higher latency
/// - `gpt-4o-mini-tts`: Latest model with improved quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OpenAISpeechModel {
    /// Standard quality model - good balance of quality and latency
    #[default]
    #[serde(rename = "tts-1")]
    Tts1,
    /// High definition model - best quality, higher latency
    #[serde(rename = "tts-1-hd")]
    Tts1Hd,
    /// GPT-4o mini speech model - latest improvements
    #[serde(rename = "gpt-4o-mini-tts")]
    Gpt4oMiniTts,
}

impl OpenAISpeechModel {
    /// Convert to the API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tts1 => "tts-1",
            Self::Tts1Hd => "tts-1-hd",
            Self::Gpt4oMiniTts => "gpt-4o-mini-tts",
        }
    }

    /// Parse from string, with fallback to default.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "tts-1" | "tts1" => Self::Tts1,
            "tts-1-hd" | "tts1-hd" | "tts1hd" => Self::Tts1Hd,
            "gpt-4o-mini-tts" | "gpt4o-mini-tts" => Self::Gpt4oMiniTts,
            _ => Self::default(),
        }
    }
}

impl std::fmt::Display for OpenAISpeechModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// OpenAI Voices
// =============================================================================

/// Available voices for the OpenAI speech API.
///
/// OpenAI provides 11 distinct voices:
/// - Alloy, Echo, Fable, Onyx, Nova, Shimmer: original voices
/// - Ash, Ballad, Coral, Sage, Verse: additional voices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenAIVoice {
    /// Alloy voice
    #[default]
    Alloy,
    /// Ash voice
    Ash,
    /// Ballad voice
    Ballad,
    /// Coral voice
    Coral,
    /// Echo voice
    Echo,
    /// Fable voice
    Fable,
    /// Onyx voice
    Onyx,
    /// Nova voice
    Nova,
    /// Sage voice
    Sage,
    /// Shimmer voice
    Shimmer,
    /// Verse voice
    Verse,
}

impl OpenAIVoice {
    /// Convert to the API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alloy => "alloy",
            Self::Ash => "ash",
            Self::Ballad => "ballad",
            Self::Coral => "coral",
            Self::Echo => "echo",
            Self::Fable => "fable",
            Self::Onyx => "onyx",
            Self::Nova => "nova",
            Self::Sage => "sage",
            Self::Shimmer => "shimmer",
            Self::Verse => "verse",
        }
    }

    /// Resolve an opaque voice id to a known OpenAI voice.
    ///
    /// Returns `None` for ids OpenAI would reject, so the client can fail the
    /// voice without spending a network round trip.
    pub fn from_voice_id(voice: &VoiceId) -> Option<Self> {
        match voice.as_str().to_lowercase().as_str() {
            "alloy" => Some(Self::Alloy),
            "ash" => Some(Self::Ash),
            "ballad" => Some(Self::Ballad),
            "coral" => Some(Self::Coral),
            "echo" => Some(Self::Echo),
            "fable" => Some(Self::Fable),
            "onyx" => Some(Self::Onyx),
            "nova" => Some(Self::Nova),
            "sage" => Some(Self::Sage),
            "shimmer" => Some(Self::Shimmer),
            "verse" => Some(Self::Verse),
            _ => None,
        }
    }

    /// Get all available voices.
    pub fn all() -> &'static [OpenAIVoice] {
        &[
            Self::Alloy,
            Self::Ash,
            Self::Ballad,
            Self::Coral,
            Self::Echo,
            Self::Fable,
            Self::Onyx,
            Self::Nova,
            Self::Sage,
            Self::Shimmer,
            Self::Verse,
        ]
    }
}

impl std::fmt::Display for OpenAIVoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Output Format
// =============================================================================

/// Supported output formats for the OpenAI speech API.
///
/// The default response format is mp3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechOutputFormat {
    /// MP3 format (default)
    #[default]
    Mp3,
    /// Opus format
    Opus,
    /// AAC format
    Aac,
    /// FLAC format
    Flac,
    /// WAV format
    Wav,
}

impl SpeechOutputFormat {
    /// Convert to the API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Opus => "opus",
            Self::Aac => "aac",
            Self::Flac => "flac",
            Self::Wav => "wav",
        }
    }

    /// Parse from string, with fallback to default.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "mp3" => Self::Mp3,
            "opus" => Self::Opus,
            "aac" => Self::Aac,
            "flac" => Self::Flac,
            "wav" => Self::Wav,
            _ => Self::default(),
        }
    }
}

impl std::fmt::Display for SpeechOutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_as_str() {
        assert_eq!(OpenAISpeechModel::Tts1.as_str(), "tts-1");
        assert_eq!(OpenAISpeechModel::Tts1Hd.as_str(), "tts-1-hd");
        assert_eq!(OpenAISpeechModel::Gpt4oMiniTts.as_str(), "gpt-4o-mini-tts");
    }

    #[test]
    fn test_model_from_str_aliases() {
        assert_eq!(
            OpenAISpeechModel::from_str_or_default("tts1hd"),
            OpenAISpeechModel::Tts1Hd
        );
        assert_eq!(
            OpenAISpeechModel::from_str_or_default("TTS-1"),
            OpenAISpeechModel::Tts1
        );
        assert_eq!(
            OpenAISpeechModel::from_str_or_default("unknown"),
            OpenAISpeechModel::Tts1
        );
    }

    #[test]
    fn test_voice_from_voice_id() {
        let nova = VoiceId::new("nova").unwrap();
        assert_eq!(OpenAIVoice::from_voice_id(&nova), Some(OpenAIVoice::Nova));

        let upper = VoiceId::new("NOVA").unwrap();
        assert_eq!(OpenAIVoice::from_voice_id(&upper), Some(OpenAIVoice::Nova));

        let unknown = VoiceId::new("EXAVITQu4vr4xnSDxMaL").unwrap();
        assert_eq!(OpenAIVoice::from_voice_id(&unknown), None);
    }

    #[test]
    fn test_voice_all_covers_api_values() {
        let all = OpenAIVoice::all();
        assert_eq!(all.len(), 11);
        for voice in all {
            let id = VoiceId::new(voice.as_str()).unwrap();
            assert_eq!(OpenAIVoice::from_voice_id(&id), Some(*voice));
        }
    }

    #[test]
    fn test_output_format_round_trip() {
        for format in [
            SpeechOutputFormat::Mp3,
            SpeechOutputFormat::Opus,
            SpeechOutputFormat::Aac,
            SpeechOutputFormat::Flac,
            SpeechOutputFormat::Wav,
        ] {
            assert_eq!(
                SpeechOutputFormat::from_str_or_default(format.as_str()),
                format
            );
        }
        assert_eq!(
            SpeechOutputFormat::from_str_or_default("pcm24"),
            SpeechOutputFormat::Mp3
        );
    }

    #[test]
    fn test_serde_renames() {
        assert_eq!(
            serde_json::to_string(&OpenAISpeechModel::Gpt4oMiniTts).unwrap(),
            "\"gpt-4o-mini-tts\""
        );
        assert_eq!(
            serde_json::to_string(&OpenAIVoice::Shimmer).unwrap(),
            "\"shimmer\""
        );
    }
}
