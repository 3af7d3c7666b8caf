use serde::{Deserialize, Serialize};

use crate::session::Mode;

/// A point on the board, in client pixel space.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

/// An axis-aligned rectangle, used by `underline`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActionFormat {
    Text,
    Latex,
}

/// A board mutation proposed by the LLM, before rebasing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Action {
    Write {
        content: String,
        format: ActionFormat,
        position: Point,
        color: String,
    },
    Underline {
        area: Rect,
        color: String,
    },
    Clear {},
}

/// The structured document returned by the LLM for one turn.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LlmResult {
    pub speech: String,
    #[serde(default)]
    pub board_actions: Vec<Action>,
    pub mode: Option<Mode>,
    #[serde(default)]
    pub wait_for_student: bool,
}

impl LlmResult {
    /// Validity per §4.3 step 6: `speech` non-empty.
    pub fn is_valid(&self) -> bool {
        !self.speech.trim().is_empty()
    }
}

/// A single polyline point with simulated pen pressure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StrokePoint {
    pub x: f64,
    pub y: f64,
    pub pressure: f64,
}

/// One continuous pen-down-to-pen-up polyline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stroke {
    pub points: Vec<StrokePoint>,
    pub color: String,
    pub width: f64,
}

/// Output of the handwriting synthesizer for a single `write` action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrokeBatch {
    pub strokes: Vec<Stroke>,
    pub animation_speed: f64,
}
