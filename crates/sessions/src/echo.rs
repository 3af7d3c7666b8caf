//! Self-echo / auto-barge gating (spec §4.4): the windows that decide
//! whether the student's voice activity while the tutor is speaking is a
//! real interruption or the tutor hearing itself.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

struct State {
    tts_active: bool,
    tts_started_at: Option<Instant>,
    tts_ended_at: Option<Instant>,
    pending_speech_started_at: Option<Instant>,
    last_auto_barge_at: Option<Instant>,
    last_tutor_utterance: String,
}

/// Decision returned by [`EchoGate::note_interim`] for one interim
/// transcript received while the tutor may be speaking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterimDecision {
    /// Not a confirmation of pending voice activity; forward as a normal
    /// `transcript_interim` notice.
    Passthrough,
    /// A real interruption: confirmed voice activity, outside the debounce
    /// window since the last auto-barge.
    AutoBarge,
}

pub struct EchoGate {
    state: Mutex<State>,
    start_guard: Duration,
    confirm_window: Duration,
    auto_barge_debounce: Duration,
    echo_cooldown: Duration,
}

impl EchoGate {
    pub fn new(
        start_guard_sec: f64,
        confirm_window_sec: f64,
        auto_barge_debounce_sec: f64,
        echo_cooldown_sec: f64,
    ) -> Self {
        Self {
            state: Mutex::new(State {
                tts_active: false,
                tts_started_at: None,
                tts_ended_at: None,
                pending_speech_started_at: None,
                last_auto_barge_at: None,
                last_tutor_utterance: String::new(),
            }),
            start_guard: Duration::from_secs_f64(start_guard_sec.max(0.0)),
            confirm_window: Duration::from_secs_f64(confirm_window_sec.max(0.0)),
            auto_barge_debounce: Duration::from_secs_f64(auto_barge_debounce_sec.max(0.0)),
            echo_cooldown: Duration::from_secs_f64(echo_cooldown_sec.max(0.0)),
        }
    }

    pub fn mark_tts_start(&self) {
        let mut s = self.state.lock();
        s.tts_active = true;
        s.tts_started_at = Some(Instant::now());
    }

    pub fn mark_tts_end(&self, utterance: &str) {
        let mut s = self.state.lock();
        s.tts_active = false;
        s.tts_ended_at = Some(Instant::now());
        s.last_tutor_utterance = utterance.trim().to_lowercase();
    }

    /// A `SpeechStarted` voice-activity event arrived. Returns `true` if it
    /// should be ignored outright (within the start guard window right
    /// after TTS began), `false` if it is recorded as pending confirmation.
    pub fn note_speech_started(&self) -> bool {
        let mut s = self.state.lock();
        let now = Instant::now();
        if s.tts_active {
            if let Some(started) = s.tts_started_at {
                if now.duration_since(started) < self.start_guard {
                    return true;
                }
            }
        }
        s.pending_speech_started_at = Some(now);
        false
    }

    /// A non-empty interim transcript arrived. Confirms (or clears) a
    /// pending `SpeechStarted`, subject to the auto-barge debounce.
    pub fn note_interim(&self, text: &str) -> InterimDecision {
        if text.trim().is_empty() {
            return InterimDecision::Passthrough;
        }
        let mut s = self.state.lock();
        let now = Instant::now();
        let confirmed = s
            .pending_speech_started_at
            .is_some_and(|t| now.duration_since(t) <= self.confirm_window);
        s.pending_speech_started_at = None;
        if !confirmed {
            return InterimDecision::Passthrough;
        }
        let debounced = s
            .last_auto_barge_at
            .is_some_and(|t| now.duration_since(t) < self.auto_barge_debounce);
        if debounced {
            return InterimDecision::Passthrough;
        }
        s.last_auto_barge_at = Some(now);
        InterimDecision::AutoBarge
    }

    /// Whether a final transcript arriving now looks like self-transcription
    /// of the tutor's own last utterance (spec §4.4 cooldown comparison).
    pub fn is_likely_echo(&self, text: &str) -> bool {
        let s = self.state.lock();
        let Some(ended) = s.tts_ended_at else {
            return false;
        };
        if Instant::now().duration_since(ended) > self.echo_cooldown {
            return false;
        }
        let candidate = text.trim().to_lowercase();
        !candidate.is_empty()
            && (s.last_tutor_utterance.contains(&candidate) || candidate.contains(&s.last_tutor_utterance))
    }
}
