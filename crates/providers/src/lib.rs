//! Adapters to the three out-of-scope upstream services the orchestrator
//! calls: the vision-capable LLM, streaming STT, streaming TTS, plus the
//! LaTeX-to-SVG renderer's HTTP contract.

pub mod latex;
pub mod llm;
pub mod stt;
pub mod tts;
pub(crate) mod util;

pub use latex::LatexClient;
pub use llm::{AnthropicLlmProvider, LlmProvider, LlmRequest};
pub use stt::{SttEvent, SttOpenConfig, SttProvider, SttSession, WsSttProvider};
pub use tts::{AudioChunkStream, HttpTtsProvider, TtsProvider};
