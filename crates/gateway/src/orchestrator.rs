//! Turn Orchestrator's single-consumer trigger queue (spec §4.3).
//!
//! Each session owns one `mpsc::Receiver<Trigger>` drained by a single task.
//! Because that task fully processes one trigger (through completion or
//! cancellation) before pulling the next, the channel gives the same
//! exclusive-lease guarantee the source gets from an async lock per
//! session — a second trigger simply waits in the channel instead of being
//! rejected or racing the first.

use uuid::Uuid;

use tutor_protocol::ServerMessage;

use crate::state::AppState;
use crate::turn;

/// A multiplexed input to the Turn Orchestrator (spec §4.3 trigger sources
/// 1, 2 and 4 — the sources that start a turn). `board_snapshot` and
/// `barge_in` bypass this queue entirely: the former just updates session
/// state, the latter is applied immediately rather than queued (§5).
#[derive(Debug, Clone)]
pub enum Trigger {
    SessionStart { subject: Option<String> },
    Transcript(String),
    ProactiveCheck,
}

pub type TriggerSender = tokio::sync::mpsc::Sender<Trigger>;
pub type OutboundSender = tokio::sync::mpsc::Sender<ServerMessage>;

const TRIGGER_QUEUE_CAPACITY: usize = 32;

/// Spawn the per-session trigger-draining task and return the sender half
/// other components use to enqueue triggers.
pub fn spawn(state: AppState, session_id: Uuid, outbound: OutboundSender) -> TriggerSender {
    let (tx, mut rx) = tokio::sync::mpsc::channel(TRIGGER_QUEUE_CAPACITY);
    tokio::spawn(async move {
        while let Some(trigger) = rx.recv().await {
            turn::run_turn(&state, session_id, trigger, &outbound).await;
        }
        tracing::debug!(%session_id, "orchestrator trigger queue closed");
    });
    tx
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tutor_domain::config::Config;
    use tutor_domain::error::Result;
    use tutor_providers::{AudioChunkStream, LatexClient, LlmRequest, SttOpenConfig, SttProvider, SttSession, TtsProvider};
    use tutor_sessions::{EchoGate, SessionRegistry};

    use super::*;

    struct FakeLlm;

    #[async_trait::async_trait]
    impl tutor_providers::LlmProvider for FakeLlm {
        async fn complete(&self, _req: &LlmRequest) -> Result<String> {
            Ok(r#"{"speech":"ok","boardActions":[],"waitForStudent":false}"#.to_string())
        }
    }

    struct EmptyTts;

    #[async_trait::async_trait]
    impl TtsProvider for EmptyTts {
        async fn synthesize(&self, _text: &str, _voice_id: &str) -> Result<AudioChunkStream> {
            Ok(Box::pin(futures_util::stream::empty()))
        }
    }

    struct UnusedStt;

    #[async_trait::async_trait]
    impl SttProvider for UnusedStt {
        async fn open(&self, _cfg: &SttOpenConfig) -> Result<Box<dyn SttSession>> {
            unimplemented!("not exercised by orchestrator tests")
        }
    }

    #[tokio::test]
    async fn two_triggers_are_processed_in_fifo_order() {
        let state = AppState {
            config: Arc::new(Config::default()),
            sessions: Arc::new(SessionRegistry::new()),
            llm: Arc::new(FakeLlm),
            stt: Arc::new(UnusedStt),
            tts: Arc::new(EmptyTts),
            latex: Arc::new(LatexClient::new("http://localhost:9".into()).unwrap()),
        };
        let session_id = Uuid::new_v4();
        let handle = state
            .sessions
            .create(session_id, 40, EchoGate::new(0.6, 1.2, 2.0, 1.5))
            .await;
        let (outbound_tx, _outbound_rx) = tokio::sync::mpsc::channel(32);

        let triggers = spawn(state, session_id, outbound_tx);
        triggers.send(Trigger::Transcript("first question".into())).await.unwrap();
        triggers.send(Trigger::Transcript("second question".into())).await.unwrap();
        drop(triggers);

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let history = handle.session.history_snapshot();
        // each transcript becomes a student turn followed by a committed
        // tutor turn, processed strictly in arrival order
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].content, "first question");
        assert_eq!(history[2].content, "second question");
    }
}
