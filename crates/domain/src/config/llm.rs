use serde::{Deserialize, Serialize};

use super::env_string_or;

fn d_model() -> String {
    "claude-sonnet-4-5".to_string()
}

/// Which model the Turn Orchestrator calls for each turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "d_model")]
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self { model: d_model() }
    }
}

impl LlmConfig {
    pub fn from_env() -> Self {
        Self {
            model: env_string_or("LLM_MODEL", &d_model()),
        }
    }
}
