use serde::{Deserialize, Serialize};

use super::env_or;

fn d_write_x() -> i64 {
    40
}

fn d_top_margin() -> i64 {
    40
}

fn d_margin_below_student() -> i64 {
    24
}

fn d_interline_margin() -> i64 {
    12
}

fn d_max_board_height() -> i64 {
    6000
}

/// Board layout constants consumed by the Stroke Emitter's rebase step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    /// `x0`: tutor's default x-origin for writes.
    #[serde(default = "d_write_x")]
    pub write_x: i64,
    /// `y0`: top margin, and the cursor reset value after `clear`.
    #[serde(default = "d_top_margin")]
    pub top_margin: i64,
    /// Gap kept below the student's known drawing extent.
    #[serde(default = "d_margin_below_student")]
    pub margin_below_student: i64,
    /// Vertical gap left between consecutive writes.
    #[serde(default = "d_interline_margin")]
    pub interline_margin: i64,
    /// Hard ceiling on `boardCursorY`; crossing it triggers an auto-clear.
    #[serde(default = "d_max_board_height")]
    pub max_board_height: i64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            write_x: d_write_x(),
            top_margin: d_top_margin(),
            margin_below_student: d_margin_below_student(),
            interline_margin: d_interline_margin(),
            max_board_height: d_max_board_height(),
        }
    }
}

impl BoardConfig {
    pub fn from_env() -> Self {
        Self {
            write_x: env_or("BOARD_WRITE_X", d_write_x()),
            top_margin: env_or("BOARD_TOP_MARGIN", d_top_margin()),
            margin_below_student: env_or("BOARD_MARGIN_BELOW_STUDENT", d_margin_below_student()),
            interline_margin: env_or("BOARD_INTERLINE_MARGIN", d_interline_margin()),
            max_board_height: env_or("BOARD_MAX_HEIGHT", d_max_board_height()),
        }
    }
}
