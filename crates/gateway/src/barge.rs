//! Shared entry point for both barge-in triggers (spec §4.7): an explicit
//! inbound `barge_in` message and an STT auto-barge.

use tutor_protocol::ServerMessage;
use tutor_sessions::SessionHandle;

use crate::orchestrator::OutboundSender;

/// Stop the in-flight turn's output and notify the client. Cancelling the
/// active turn's token aborts the LLM call, TTS stream, and stroke loop at
/// their next suspension point; advancing the epoch immediately (rather
/// than waiting for the next turn to start) means the outbound writer's
/// epoch filter drops any output already queued for the superseded turn.
pub async fn apply(handle: &SessionHandle, outbound: &OutboundSender) {
    let cancelled = handle.barge.barge_in();
    handle.session.next_epoch();
    if cancelled.is_some() {
        let _ = outbound.send(ServerMessage::BargeIn).await;
    }
}
