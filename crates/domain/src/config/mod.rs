mod barge;
mod board;
mod latex;
mod llm;
mod scheduler;
mod server;
mod tts;

pub use barge::*;
pub use board::*;
pub use latex::*;
pub use llm::*;
pub use scheduler::*;
pub use server::*;
pub use tts::*;

use serde::{Deserialize, Serialize};

/// Top-level configuration, assembled from environment variables with
/// defaults matching the values the source system shipped with.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub tts: TtsConfig,
    #[serde(default)]
    pub latex: LatexConfig,
    #[serde(default)]
    pub board: BoardConfig,
    #[serde(default)]
    pub barge: BargeConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl Config {
    /// Load configuration from process environment variables, falling back
    /// to defaults for anything unset.
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig::from_env(),
            llm: LlmConfig::from_env(),
            tts: TtsConfig::from_env(),
            latex: LatexConfig::from_env(),
            board: BoardConfig::from_env(),
            barge: BargeConfig::from_env(),
            scheduler: SchedulerConfig::from_env(),
        }
    }
}

pub(crate) fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

pub(crate) fn env_string_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
