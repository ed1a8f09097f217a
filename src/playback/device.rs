//! Local audio output behind the `device-audio` feature.
//!
//! rodio's output stream is not `Send`, so a dedicated OS thread owns the
//! device and the current sink. The async transport talks to it over a
//! command channel; pause/resume/stop are fire-and-forget, `play_chunk`
//! waits on a oneshot reply that arrives when the chunk ends.

use bytes::Bytes;
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink};
use std::io::Cursor;
use std::sync::mpsc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use async_trait::async_trait;

use crate::playback::transport::{AudioTransport, ChunkEnd, PlaybackError};

/// How often the audio thread checks the sink while a chunk plays
const SINK_POLL_INTERVAL: Duration = Duration::from_millis(50);

enum DeviceCommand {
    Play {
        index: usize,
        audio: Bytes,
        done: oneshot::Sender<Result<ChunkEnd, PlaybackError>>,
    },
    Pause,
    Resume,
    Stop,
}

/// Speaker-backed transport
pub struct DeviceTransport {
    commands: mpsc::Sender<DeviceCommand>,
}

impl DeviceTransport {
    /// Open the default output device. Fails when no device is available.
    pub fn new() -> Result<Self, PlaybackError> {
        let (commands, receiver) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        std::thread::Builder::new()
            .name("narrata-audio-device".to_string())
            .spawn(move || {
                let stream = match OutputStreamBuilder::open_default_stream() {
                    Ok(stream) => {
                        let _ = ready_tx.send(Ok(()));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                audio_loop(stream, receiver);
            })
            .map_err(|e| PlaybackError::TransportFailure(format!("Audio thread spawn failed: {e}")))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self { commands }),
            Ok(Err(e)) => Err(PlaybackError::TransportFailure(format!(
                "No audio output device: {e}"
            ))),
            Err(_) => Err(PlaybackError::TransportFailure(
                "Audio thread exited during startup".to_string(),
            )),
        }
    }
}

#[async_trait]
impl AudioTransport for DeviceTransport {
    async fn play_chunk(&self, index: usize, audio: Bytes) -> Result<ChunkEnd, PlaybackError> {
        let (done, reply) = oneshot::channel();
        self.commands
            .send(DeviceCommand::Play { index, audio, done })
            .map_err(|_| {
                PlaybackError::TransportFailure("Audio thread is gone".to_string())
            })?;
        reply.await.map_err(|_| {
            PlaybackError::TransportFailure("Audio thread dropped the chunk".to_string())
        })?
    }

    fn pause(&self) {
        let _ = self.commands.send(DeviceCommand::Pause);
    }

    fn resume(&self) {
        let _ = self.commands.send(DeviceCommand::Resume);
    }

    fn stop(&self) {
        let _ = self.commands.send(DeviceCommand::Stop);
    }
}

/// Device thread: one sink at a time, command-driven
fn audio_loop(stream: OutputStream, commands: mpsc::Receiver<DeviceCommand>) {
    while let Ok(command) = commands.recv() {
        let DeviceCommand::Play { index, audio, done } = command else {
            // Pause/resume/stop with no chunk in flight are no-ops
            continue;
        };

        let source = match Decoder::new(Cursor::new(audio)) {
            Ok(source) => source,
            Err(e) => {
                let _ = done.send(Err(PlaybackError::DecodeFailure {
                    index,
                    reason: e.to_string(),
                }));
                continue;
            }
        };

        let sink = Sink::connect_new(stream.mixer());
        sink.append(source);
        debug!("Device playback of chunk {index} started");

        // Service control commands until the sink drains or is stopped
        let end = loop {
            match commands.recv_timeout(SINK_POLL_INTERVAL) {
                Ok(DeviceCommand::Pause) => sink.pause(),
                Ok(DeviceCommand::Resume) => sink.play(),
                Ok(DeviceCommand::Stop) => {
                    sink.stop();
                    break ChunkEnd::Interrupted;
                }
                Ok(DeviceCommand::Play { done, .. }) => {
                    // The engine plays chunks strictly one at a time; an
                    // overlapping request means the caller gave up on this one
                    warn!("Overlapping device play request, interrupting chunk {index}");
                    sink.stop();
                    let _ = done.send(Err(PlaybackError::TransportFailure(
                        "Previous chunk was still playing".to_string(),
                    )));
                    break ChunkEnd::Interrupted;
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    if sink.empty() {
                        break ChunkEnd::Finished;
                    }
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    sink.stop();
                    break ChunkEnd::Interrupted;
                }
            }
        };

        debug!("Device playback of chunk {index} ended: {end:?}");
        let _ = done.send(Ok(end));
    }
}
