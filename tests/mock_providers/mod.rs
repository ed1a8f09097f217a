//! Scripted synthesis provider mock for integration tests.
//!
//! Stands in for the OpenAI speech endpoint. Tests point a client at
//! [`MockSpeechServer::base_url`] and script responses per voice or
//! globally. Mocks match in mount order, so a bounded failure mounted
//! before a success script produces fail-then-recover sequences.

#![allow(dead_code)]

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// The endpoint path the OpenAI client posts to
pub const SPEECH_PATH: &str = "/v1/audio/speech";

pub struct MockSpeechServer {
    server: MockServer,
}

impl MockSpeechServer {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL for `SynthesisConfig::base_url`
    pub fn base_url(&self) -> String {
        self.server.uri()
    }

    /// Respond 200 with the given audio bytes for every request
    pub async fn always_succeed(&self, audio: Vec<u8>) {
        Mock::given(method("POST"))
            .and(path(SPEECH_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(audio)
                    .insert_header("content-type", "audio/mpeg"),
            )
            .mount(&self.server)
            .await;
    }

    /// Respond 200 with the given audio bytes, but only for one voice
    pub async fn succeed_for_voice(&self, voice: &str, audio: Vec<u8>) {
        Mock::given(method("POST"))
            .and(path(SPEECH_PATH))
            .and(body_partial_json(json!({ "voice": voice })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(audio)
                    .insert_header("content-type", "audio/mpeg"),
            )
            .mount(&self.server)
            .await;
    }

    /// Respond with a permanent failure for one voice
    pub async fn reject_voice(&self, voice: &str, status: u16) {
        Mock::given(method("POST"))
            .and(path(SPEECH_PATH))
            .and(body_partial_json(json!({ "voice": voice })))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "error": { "message": "voice rejected", "type": "invalid_request_error" }
            })))
            .mount(&self.server)
            .await;
    }

    /// Respond 429 with a Retry-After header for the first `n` requests
    pub async fn rate_limit_first(&self, n: u64, retry_after_secs: u64) {
        Mock::given(method("POST"))
            .and(path(SPEECH_PATH))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("retry-after", retry_after_secs.to_string().as_str())
                    .set_body_json(json!({
                        "error": { "message": "rate limited", "type": "rate_limit_error" }
                    })),
            )
            .up_to_n_times(n)
            .mount(&self.server)
            .await;
    }

    /// Respond with the given error status for every request
    pub async fn always_fail(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path(SPEECH_PATH))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "error": { "message": "upstream unavailable", "type": "server_error" }
            })))
            .mount(&self.server)
            .await;
    }

    /// Number of synthesis requests received so far
    pub async fn request_count(&self) -> usize {
        self.received().await.len()
    }

    /// All requests received so far
    pub async fn received(&self) -> Vec<Request> {
        self.server.received_requests().await.unwrap_or_default()
    }

    /// Parsed JSON bodies of all received requests, in arrival order
    pub async fn received_bodies(&self) -> Vec<serde_json::Value> {
        self.received()
            .await
            .iter()
            .filter_map(|r| serde_json::from_slice(&r.body).ok())
            .collect()
    }
}
