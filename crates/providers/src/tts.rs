//! Streaming text-to-speech provider contract (spec §4.5, §6): given text
//! and a voice id, stream back raw `pcm16le@22050Hz` mono frames.

use futures_core::Stream;
use futures_util::StreamExt;
use std::pin::Pin;

use tutor_domain::error::{Error, Result};

use crate::util::from_reqwest;

pub type AudioChunkStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>>> + Send>>;

/// Opens a streaming TTS request for one turn's speech text.
#[async_trait::async_trait]
pub trait TtsProvider: Send + Sync {
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<AudioChunkStream>;
}

/// ElevenLabs-style HTTP streaming adapter: POST text, read the response
/// body as a stream of raw PCM byte chunks.
pub struct HttpTtsProvider {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpTtsProvider {
    pub fn new(base_url: String, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(from_reqwest)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }
}

#[async_trait::async_trait]
impl TtsProvider for HttpTtsProvider {
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<AudioChunkStream> {
        let url = format!(
            "{}/v1/text-to-speech/{voice_id}/stream?output_format=pcm_22050",
            self.base_url
        );

        let resp = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Provider {
                provider: "tts".into(),
                message: format!("HTTP {} - {}", status.as_u16(), body),
            });
        }

        let stream = resp.bytes_stream().map(|chunk| {
            chunk
                .map(|b| b.to_vec())
                .map_err(|e| Error::Provider {
                    provider: "tts".into(),
                    message: e.to_string(),
                })
        });

        Ok(Box::pin(stream))
    }
}
