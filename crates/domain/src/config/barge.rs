use serde::{Deserialize, Serialize};

use super::env_or;

fn d_echo_cooldown_sec() -> f64 {
    1.5
}

fn d_auto_barge_debounce_sec() -> f64 {
    2.0
}

fn d_start_guard_sec() -> f64 {
    0.6
}

fn d_confirm_window_sec() -> f64 {
    1.2
}

fn d_stt_merge_window_sec() -> f64 {
    0.8
}

/// Echo suppression and barge-in timing windows (spec §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BargeConfig {
    /// Window after TTS end during which transcripts are checked against the
    /// last tutor utterance and dropped as self-transcription if similar.
    #[serde(default = "d_echo_cooldown_sec")]
    pub echo_cooldown_sec: f64,
    /// Minimum interval between two accepted auto-barges.
    #[serde(default = "d_auto_barge_debounce_sec")]
    pub auto_barge_debounce_sec: f64,
    /// `SpeechStarted` within this window of TTS begin is ignored outright.
    #[serde(default = "d_start_guard_sec")]
    pub start_guard_sec: f64,
    /// Max delay after `SpeechStarted` within which a corroborating interim
    /// transcript must arrive for the signal to count as a real barge-in.
    #[serde(default = "d_confirm_window_sec")]
    pub confirm_window_sec: f64,
    /// Consecutive final transcripts within this window are coalesced.
    #[serde(default = "d_stt_merge_window_sec")]
    pub stt_merge_window_sec: f64,
}

impl Default for BargeConfig {
    fn default() -> Self {
        Self {
            echo_cooldown_sec: d_echo_cooldown_sec(),
            auto_barge_debounce_sec: d_auto_barge_debounce_sec(),
            start_guard_sec: d_start_guard_sec(),
            confirm_window_sec: d_confirm_window_sec(),
            stt_merge_window_sec: d_stt_merge_window_sec(),
        }
    }
}

impl BargeConfig {
    pub fn from_env() -> Self {
        Self {
            echo_cooldown_sec: env_or("ECHO_COOLDOWN_SEC", d_echo_cooldown_sec()),
            auto_barge_debounce_sec: env_or(
                "AUTO_BARGE_DEBOUNCE_SEC",
                d_auto_barge_debounce_sec(),
            ),
            start_guard_sec: env_or("BARGE_START_GUARD_SEC", d_start_guard_sec()),
            confirm_window_sec: env_or(
                "AUTO_BARGE_CONFIRM_WINDOW_SEC",
                d_confirm_window_sec(),
            ),
            stt_merge_window_sec: env_or("STT_MERGE_WINDOW_SEC", d_stt_merge_window_sec()),
        }
    }
}
