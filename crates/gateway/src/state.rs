use std::sync::Arc;

use tutor_domain::config::Config;
use tutor_providers::{LatexClient, LlmProvider, SttProvider, TtsProvider};
use tutor_sessions::SessionRegistry;

/// Shared application state, handed to every axum handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionRegistry>,
    pub llm: Arc<dyn LlmProvider>,
    pub stt: Arc<dyn SttProvider>,
    pub tts: Arc<dyn TtsProvider>,
    pub latex: Arc<LatexClient>,
}
