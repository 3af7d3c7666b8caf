//! Wire message envelopes for the `/ws/{session_id}` duplex channel (spec §6).
//! Every message is a `{"type": ...}`-tagged record; this module is the only
//! place that touches that framing.

use serde::{Deserialize, Serialize};

use tutor_domain::action::{Action, StrokeBatch};
use tutor_domain::session::Mode;

/// Inbound records, client → server.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    SessionStart {
        #[serde(default)]
        subject: Option<String>,
    },
    AudioStart,
    AudioData {
        data: String,
    },
    AudioStop,
    Transcript {
        text: String,
    },
    BoardSnapshot {
        image_base64: String,
        width: u32,
        height: u32,
        #[serde(default)]
        student_max_y: Option<i64>,
    },
    BargeIn,
}

/// A non-stroke board mutation, carried inside `board_action`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BoardActionPayload {
    Underline {
        area: tutor_domain::action::Rect,
        color: String,
    },
    Clear {},
}

impl BoardActionPayload {
    /// Project a rebased `Action` into its outbound `board_action` payload.
    /// Returns `None` for `Write`, which is emitted as `strokes` instead.
    pub fn from_action(action: &Action) -> Option<Self> {
        match action {
            Action::Underline { area, color } => Some(Self::Underline {
                area: *area,
                color: color.clone(),
            }),
            Action::Clear {} => Some(Self::Clear {}),
            Action::Write { .. } => None,
        }
    }
}

/// Outbound records, server → client. Every variant that is produced by a
/// turn carries that turn's `epoch` so the gateway can drop superseded
/// output at send time (spec §4.7).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Connected {
        session_id: String,
        message: String,
    },
    SpeechText {
        text: String,
        epoch: u64,
    },
    AudioChunk {
        data: String,
        epoch: u64,
    },
    Strokes {
        strokes: StrokeBatch,
        epoch: u64,
    },
    BoardAction {
        action: BoardActionPayload,
        epoch: u64,
    },
    TranscriptInterim {
        text: String,
    },
    StateUpdate {
        tutor_state: Mode,
        wait_for_student: bool,
        epoch: u64,
    },
    ScrollBoard {
        scroll_by: i64,
        epoch: u64,
    },
    BargeIn,
    Error {
        message: String,
    },
}

impl ServerMessage {
    /// The epoch this message was produced under, or `None` for messages
    /// that are not subject to epoch supersession (handshake, interim
    /// transcripts, barge-in notices, and errors are always delivered).
    pub fn epoch(&self) -> Option<u64> {
        match self {
            Self::SpeechText { epoch, .. }
            | Self::AudioChunk { epoch, .. }
            | Self::Strokes { epoch, .. }
            | Self::BoardAction { epoch, .. }
            | Self::StateUpdate { epoch, .. }
            | Self::ScrollBoard { epoch, .. } => Some(*epoch),
            Self::Connected { .. }
            | Self::TranscriptInterim { .. }
            | Self::BargeIn
            | Self::Error { .. } => None,
        }
    }
}
