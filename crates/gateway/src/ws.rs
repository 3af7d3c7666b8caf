//! Connection Gateway (spec §4.1): owns the duplex `/ws/{session_id}`
//! channel for one session, frames inbound/outbound records, and is the
//! only thing in this crate that touches wire framing.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::Response;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use uuid::Uuid;

use tutor_domain::session::Snapshot;
use tutor_protocol::{ClientMessage, ServerMessage};
use tutor_sessions::{EchoGate, Session};

use crate::barge;
use crate::orchestrator::{self, Trigger};
use crate::scheduler;
use crate::state::AppState;
use crate::stt_pipeline::{self, SttListening};

const OUTBOUND_QUEUE_CAPACITY: usize = 128;

pub async fn handler(
    Path(session_id): Path<Uuid>,
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| run(socket, state, session_id))
}

async fn run(socket: WebSocket, state: AppState, session_id: Uuid) {
    let barge_cfg = &state.config.barge;
    let echo = EchoGate::new(
        barge_cfg.start_guard_sec,
        barge_cfg.confirm_window_sec,
        barge_cfg.auto_barge_debounce_sec,
        barge_cfg.echo_cooldown_sec,
    );
    let handle = state
        .sessions
        .create(session_id, state.config.board.top_margin, echo)
        .await;

    let (outbound_tx, outbound_rx) = tokio::sync::mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
    let triggers = orchestrator::spawn(state.clone(), session_id, outbound_tx.clone());
    let scheduler_task = scheduler::spawn(
        handle.clone(),
        session_id,
        triggers.clone(),
        state.config.scheduler.clone(),
    );

    let (sink, mut stream) = socket.split();
    let writer = tokio::spawn(write_loop(sink, outbound_rx, handle.session.clone()));

    let _ = outbound_tx
        .send(ServerMessage::Connected {
            session_id: session_id.to_string(),
            message: "ready".into(),
        })
        .await;

    let mut listening: Option<SttListening> = None;

    while let Some(Ok(msg)) = stream.next().await {
        let text = match msg {
            Message::Text(t) => t,
            Message::Close(_) => break,
            _ => continue,
        };

        let client_msg: ClientMessage = match serde_json::from_str(&text) {
            Ok(m) => m,
            Err(err) => {
                tracing::debug!(error = %err, "dropping malformed inbound record");
                continue;
            }
        };

        match client_msg {
            ClientMessage::SessionStart { subject } => {
                let _ = triggers.send(Trigger::SessionStart { subject }).await;
            }
            ClientMessage::AudioStart => {
                if let Some(prev) = listening.take() {
                    prev.stop().await;
                }
                listening = Some(stt_pipeline::start(
                    state.clone(),
                    handle.clone(),
                    triggers.clone(),
                    outbound_tx.clone(),
                ));
            }
            ClientMessage::AudioData { data } => {
                if let Some(l) = &listening {
                    match BASE64.decode(data) {
                        Ok(bytes) => l.push_frame(bytes),
                        Err(err) => tracing::debug!(error = %err, "dropping malformed audio_data"),
                    }
                }
            }
            ClientMessage::AudioStop => {
                if let Some(l) = listening.take() {
                    l.stop().await;
                }
            }
            ClientMessage::Transcript { text } => {
                let _ = triggers.send(Trigger::Transcript(text)).await;
            }
            ClientMessage::BoardSnapshot {
                image_base64,
                width,
                height,
                student_max_y,
            } => {
                handle
                    .session
                    .set_snapshot(Snapshot { image_base64, width, height }, student_max_y);
            }
            ClientMessage::BargeIn => {
                barge::apply(&handle, &outbound_tx).await;
            }
        }
    }

    if let Some(l) = listening.take() {
        l.stop().await;
    }
    scheduler_task.abort();
    drop(outbound_tx);
    let _ = writer.await;
    state.sessions.remove(&session_id).await;
    tracing::info!(%session_id, "session closed");
}

/// Gateway outbound writer: single consumer of the multi-producer outbound
/// queue (spec §4.1, §5). Drops any message whose epoch has been
/// superseded by a later turn before it reaches the wire (spec §4.7 step 4).
async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound_rx: tokio::sync::mpsc::Receiver<ServerMessage>,
    session: Arc<Session>,
) {
    while let Some(msg) = outbound_rx.recv().await {
        if let Some(epoch) = msg.epoch() {
            if epoch < session.current_epoch() {
                continue;
            }
        }
        let Ok(json) = serde_json::to_string(&msg) else {
            continue;
        };
        if sink.send(Message::Text(json)).await.is_err() {
            break;
        }
    }
}
