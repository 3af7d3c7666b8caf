use serde::{Deserialize, Serialize};

use super::{env_or, env_string_or};

fn d_render_url() -> String {
    "http://localhost:4001".to_string()
}

fn d_inline_height() -> u32 {
    28
}

fn d_display_height() -> u32 {
    48
}

/// LaTeX-to-SVG renderer microservice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatexConfig {
    #[serde(default = "d_render_url")]
    pub render_url: String,
    /// Target pixel height used to scale inline (`display: false`) math.
    #[serde(default = "d_inline_height")]
    pub target_height_inline: u32,
    /// Target pixel height used to scale display (`display: true`) math.
    #[serde(default = "d_display_height")]
    pub target_height_display: u32,
}

impl Default for LatexConfig {
    fn default() -> Self {
        Self {
            render_url: d_render_url(),
            target_height_inline: d_inline_height(),
            target_height_display: d_display_height(),
        }
    }
}

impl LatexConfig {
    pub fn from_env() -> Self {
        Self {
            render_url: env_string_or("LATEX_RENDER_URL", &d_render_url()),
            target_height_inline: env_or("LATEX_TARGET_HEIGHT_INLINE", d_inline_height()),
            target_height_display: env_or("LATEX_TARGET_HEIGHT_DISPLAY", d_display_height()),
        }
    }
}
