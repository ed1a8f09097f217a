//! Text preparation for speech synthesis.
//!
//! Providers impose per-request character limits and choke on raw control
//! characters, so summary text is sanitized and split into ordered segments
//! before synthesis. Each segment becomes one audio chunk, and chunk order
//! must match text order.

use once_cell::sync::Lazy;
use regex::Regex;

/// Default per-request character cap. Matches the OpenAI speech API limit;
/// ElevenLabs accepts more, so the smaller bound is safe for both.
pub const DEFAULT_MAX_SEGMENT_CHARS: usize = 4096;

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex is valid"));

static SENTENCE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[.!?]['")\]]*\s"#).expect("sentence regex is valid"));

/// Neutralize control characters and normalize whitespace.
///
/// Newlines and tabs become single spaces; other control characters are
/// dropped entirely. Runs of whitespace collapse to one space and the result
/// is trimmed. The output is safe to embed in a provider request body.
pub fn sanitize_text(text: &str) -> String {
    let mapped: String = text
        .chars()
        .filter_map(|c| {
            if c == '\n' || c == '\r' || c == '\t' {
                Some(' ')
            } else if c.is_control() {
                None
            } else {
                Some(c)
            }
        })
        .collect();

    WHITESPACE_RUN.replace_all(&mapped, " ").trim().to_string()
}

/// Split sanitized text into ordered segments of at most `max_chars`
/// characters.
///
/// Splits prefer sentence boundaries; sentences pack greedily into segments.
/// A single sentence longer than `max_chars` falls back to word-boundary
/// splits, and a single oversized word is cut at the character limit. Empty
/// input yields no segments.
pub fn segment_text(text: &str, max_chars: usize) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() || max_chars == 0 {
        return Vec::new();
    }

    let mut segments = Vec::new();
    let mut current = String::new();

    for sentence in split_sentences(text) {
        if sentence.chars().count() > max_chars {
            // Oversized sentence: flush what we have, then split it by words
            if !current.is_empty() {
                segments.push(std::mem::take(&mut current));
            }
            segments.extend(split_long_sentence(&sentence, max_chars));
            continue;
        }

        let needed = if current.is_empty() {
            sentence.chars().count()
        } else {
            current.chars().count() + 1 + sentence.chars().count()
        };

        if needed > max_chars && !current.is_empty() {
            segments.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&sentence);
    }

    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// Sanitize then segment with the default character cap
pub fn prepare_for_synthesis(text: &str, max_chars: usize) -> Vec<String> {
    segment_text(&sanitize_text(text), max_chars)
}

fn split_sentences(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut last = 0;
    for m in SENTENCE_END.find_iter(text) {
        // Keep the terminator, drop the trailing whitespace the regex ate
        let end = m.end();
        let sentence = text[last..end].trim();
        if !sentence.is_empty() {
            out.push(sentence.to_string());
        }
        last = end;
    }
    let tail = text[last..].trim();
    if !tail.is_empty() {
        out.push(tail.to_string());
    }
    out
}

fn split_long_sentence(sentence: &str, max_chars: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();

    for word in sentence.split_whitespace() {
        if word.chars().count() > max_chars {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            // Single word over the cap: hard cut at the character limit
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max_chars) {
                out.push(piece.iter().collect());
            }
            continue;
        }

        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > max_chars && !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }

    if !current.is_empty() {
        out.push(current);
    }
    out
}
