use serde::{Deserialize, Serialize};

/// The tutor's current pedagogical posture, reported to the client on every
/// `state_update`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Listening,
    Guiding,
    Demonstrating,
    Evaluating,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Tutor,
}

/// One entry in a session's append-only conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn student(content: impl Into<String>) -> Self {
        Self {
            role: Role::Student,
            content: content.into(),
        }
    }

    pub fn tutor(content: impl Into<String>) -> Self {
        Self {
            role: Role::Tutor,
            content: content.into(),
        }
    }
}

/// The most recently received whiteboard snapshot. Immutable after
/// publish — sessions hold it behind an `Arc` so readers can clone the
/// handle cheaply and release the session mutex before decoding it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub image_base64: String,
    pub width: u32,
    pub height: u32,
}

/// Synthetic content appended to `history` when the Idle/Proactive Scheduler
/// fires a `proactive_check` — removed again if the LLM returns empty.
pub const PROACTIVE_CHECK_NOTE: &str = "[checking my work on the board]";
