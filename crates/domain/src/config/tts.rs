use serde::{Deserialize, Serialize};

use super::env_string_or;

fn d_voice_id() -> String {
    "21m00Tcm4TlvDq8ikWAM".to_string()
}

/// Text-to-speech provider settings. Audio format is fixed by the spec
/// (`pcm16le@22050Hz mono`), so only the voice is configurable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    #[serde(default = "d_voice_id")]
    pub voice_id: String,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            voice_id: d_voice_id(),
        }
    }
}

impl TtsConfig {
    pub fn from_env() -> Self {
        Self {
            voice_id: env_string_or("ELEVENLABS_VOICE_ID", &d_voice_id()),
        }
    }
}
