//! Streaming speech-to-text provider contract (spec §4.4, §6): a
//! bidirectional upstream connection that accepts raw audio frames and
//! yields interim/final transcripts plus voice-activity events.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use tutor_domain::error::{Error, Result};

/// An event emitted by an open STT session, upstream to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SttEvent {
    SpeechStarted,
    InterimTranscript(String),
    FinalTranscript(String),
}

/// Hints the Connection Gateway forwards when opening an STT stream
/// (spec §4.4: "configured codec/encoding hints").
#[derive(Debug, Clone)]
pub struct SttOpenConfig {
    pub encoding: String,
    pub sample_rate_hz: u32,
}

impl Default for SttOpenConfig {
    fn default() -> Self {
        Self {
            encoding: "opus".into(),
            sample_rate_hz: 48_000,
        }
    }
}

/// One open STT upstream connection, bound to a single "listening" period.
#[async_trait::async_trait]
pub trait SttSession: Send {
    /// Forward one decoded audio frame verbatim.
    async fn send_audio(&mut self, frame: Vec<u8>) -> Result<()>;

    /// Await the next transcript/voice-activity event, or `None` when the
    /// upstream connection has closed.
    async fn next_event(&mut self) -> Option<Result<SttEvent>>;

    /// Close the upstream stream (spec §4.4: on `audio_stop` or session end).
    async fn close(&mut self) -> Result<()>;
}

/// Opens STT sessions.
#[async_trait::async_trait]
pub trait SttProvider: Send + Sync {
    async fn open(&self, cfg: &SttOpenConfig) -> Result<Box<dyn SttSession>>;
}

/// Generic websocket-based STT provider: frames are sent as binary
/// messages, events arrive as a small JSON envelope
/// `{"type": "speech_started" | "interim" | "final", "text"?: string}`.
pub struct WsSttProvider {
    endpoint: String,
}

impl WsSttProvider {
    pub fn new(endpoint: String) -> Self {
        Self { endpoint }
    }
}

#[async_trait::async_trait]
impl SttProvider for WsSttProvider {
    async fn open(&self, cfg: &SttOpenConfig) -> Result<Box<dyn SttSession>> {
        let url = format!(
            "{}?encoding={}&sample_rate={}",
            self.endpoint, cfg.encoding, cfg.sample_rate_hz
        );
        let (stream, _) = tokio_tungstenite::connect_async(&url)
            .await
            .map_err(|e| Error::Provider {
                provider: "stt".into(),
                message: e.to_string(),
            })?;
        Ok(Box::new(WsSttSession { stream }))
    }
}

struct WsSttSession {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait::async_trait]
impl SttSession for WsSttSession {
    async fn send_audio(&mut self, frame: Vec<u8>) -> Result<()> {
        self.stream
            .send(WsMessage::Binary(frame))
            .await
            .map_err(|e| Error::Provider {
                provider: "stt".into(),
                message: e.to_string(),
            })
    }

    async fn next_event(&mut self) -> Option<Result<SttEvent>> {
        loop {
            let msg = self.stream.next().await?;
            let msg = match msg {
                Ok(m) => m,
                Err(e) => {
                    return Some(Err(Error::Provider {
                        provider: "stt".into(),
                        message: e.to_string(),
                    }))
                }
            };
            match msg {
                WsMessage::Text(text) => return Some(parse_stt_event(&text)),
                WsMessage::Close(_) => return None,
                _ => continue,
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        let _ = self.stream.close(None).await;
        Ok(())
    }
}

fn parse_stt_event(text: &str) -> Result<SttEvent> {
    let v: serde_json::Value = serde_json::from_str(text)?;
    let kind = v.get("type").and_then(|t| t.as_str()).unwrap_or("");
    let text_field = || {
        v.get("text")
            .and_then(|t| t.as_str())
            .unwrap_or("")
            .to_string()
    };
    match kind {
        "speech_started" => Ok(SttEvent::SpeechStarted),
        "interim" => Ok(SttEvent::InterimTranscript(text_field())),
        "final" => Ok(SttEvent::FinalTranscript(text_field())),
        other => Err(Error::Provider {
            provider: "stt".into(),
            message: format!("unrecognized event type: {other}"),
        }),
    }
}
