//! Shared audio fixtures for integration tests.

#![allow(dead_code)]

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::io::Cursor;

/// MP3-shaped bytes of the requested length (sync word, zero padding)
pub fn mp3_bytes(len: usize) -> Vec<u8> {
    let mut data = vec![0xFF, 0xFB, 0x90, 0x00];
    data.resize(len.max(4), 0x55);
    data
}

/// A small valid WAV file: 16-bit mono, 100ms of silence at 16kHz
pub fn wav_bytes() -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for _ in 0..1_600 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Base64-encode raw audio the way the voice cache stores chunks
pub fn encode_chunk(data: &[u8]) -> String {
    BASE64.encode(data)
}
