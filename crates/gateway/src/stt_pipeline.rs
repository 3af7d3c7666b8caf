//! STT Pipeline (spec §4.4): one upstream STT connection per "listening"
//! period (`audio_start`..`audio_stop`), echo/barge gating on its events.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use tutor_providers::{SttEvent, SttOpenConfig, SttSession};
use tutor_sessions::{InterimDecision, SessionHandle};

use crate::barge;
use crate::orchestrator::{OutboundSender, Trigger, TriggerSender};
use crate::state::AppState;

const AUDIO_QUEUE_CAPACITY: usize = 64;
const STT_RECONNECT_BACKOFF: Duration = Duration::from_millis(500);
const STT_DISABLED_MESSAGE: &str = "speech recognition is unavailable for the rest of this session";

/// Bounded single-producer single-consumer audio frame queue that drops the
/// oldest frame on overflow (spec §5: "real-time audio").
struct AudioQueue {
    buf: Mutex<VecDeque<Vec<u8>>>,
    notify: Notify,
    closed: std::sync::atomic::AtomicBool,
    capacity: usize,
}

impl AudioQueue {
    fn new(capacity: usize) -> Self {
        Self {
            buf: Mutex::new(VecDeque::with_capacity(capacity)),
            notify: Notify::new(),
            closed: std::sync::atomic::AtomicBool::new(false),
            capacity,
        }
    }

    fn push(&self, frame: Vec<u8>) {
        let mut buf = self.buf.lock();
        if buf.len() >= self.capacity {
            buf.pop_front();
        }
        buf.push_back(frame);
        drop(buf);
        self.notify.notify_one();
    }

    fn close(&self) {
        self.closed.store(true, std::sync::atomic::Ordering::Release);
        self.notify.notify_one();
    }

    async fn pop(&self) -> Option<Vec<u8>> {
        loop {
            if let Some(frame) = self.buf.lock().pop_front() {
                return Some(frame);
            }
            if self.closed.load(std::sync::atomic::Ordering::Acquire) {
                return None;
            }
            self.notify.notified().await;
        }
    }
}

/// Handle to one active listening period, held by the Connection Gateway
/// between `audio_start` and `audio_stop`.
pub struct SttListening {
    queue: Arc<AudioQueue>,
    task: JoinHandle<()>,
}

impl SttListening {
    pub fn push_frame(&self, frame: Vec<u8>) {
        self.queue.push(frame);
    }

    /// Close the upstream and wait for the pipeline task to finish.
    pub async fn stop(self) {
        self.queue.close();
        let _ = self.task.await;
    }
}

pub fn start(
    state: AppState,
    handle: SessionHandle,
    triggers: TriggerSender,
    outbound: OutboundSender,
) -> SttListening {
    let queue = Arc::new(AudioQueue::new(AUDIO_QUEUE_CAPACITY));
    let task_queue = queue.clone();
    let task = tokio::spawn(async move {
        run(state, handle, triggers, outbound, task_queue).await;
    });
    SttListening { queue, task }
}

/// A final transcript awaiting coalescing with whatever arrives next within
/// `STT_MERGE_WINDOW_SEC` (spec §4.4).
struct PendingFinal {
    text: String,
    deadline: Instant,
}

/// Merge `text` into `pending`, starting a new entry if none is buffered,
/// and resetting the coalescing window so a burst of finals keeps extending
/// it rather than flushing partway through.
fn merge_final(pending: &mut Option<PendingFinal>, text: String, window: Duration) {
    let deadline = Instant::now() + window;
    match pending {
        Some(p) => {
            p.text.push(' ');
            p.text.push_str(&text);
            p.deadline = deadline;
        }
        None => *pending = Some(PendingFinal { text, deadline }),
    }
}

/// Resolves once `pending`'s coalescing window has elapsed; never resolves
/// while nothing is buffered, so it is safe to hold in a `select!` branch
/// alongside the audio/event branches.
async fn wait_for_merge_flush(pending: &Option<PendingFinal>) {
    match pending {
        Some(p) => tokio::time::sleep(p.deadline.saturating_duration_since(Instant::now())).await,
        None => std::future::pending::<()>().await,
    }
}

/// Open an STT session, retrying once after a short backoff on failure
/// (spec §5: "STT reconnect: one retry, then surface error").
async fn open_with_retry(state: &AppState) -> Result<Box<dyn SttSession>, ()> {
    match state.stt.open(&SttOpenConfig::default()).await {
        Ok(session) => Ok(session),
        Err(err) => {
            tracing::warn!(error = %err, "stt open failed, retrying once");
            tokio::time::sleep(STT_RECONNECT_BACKOFF).await;
            state.stt.open(&SttOpenConfig::default()).await.map_err(|err| {
                tracing::warn!(error = %err, "stt open failed after retry");
            })
        }
    }
}

/// Reopen the upstream session in place after a mid-stream disconnect.
/// Only ever attempted once per listening period; `already_tried` tracks
/// that across calls.
async fn try_reconnect(
    state: &AppState,
    session: &mut Box<dyn SttSession>,
    already_tried: &mut bool,
) -> Result<(), ()> {
    if *already_tried {
        return Err(());
    }
    *already_tried = true;
    tracing::info!("stt upstream disconnected, attempting one reconnect");
    tokio::time::sleep(STT_RECONNECT_BACKOFF).await;
    match state.stt.open(&SttOpenConfig::default()).await {
        Ok(new_session) => {
            *session = new_session;
            Ok(())
        }
        Err(err) => {
            tracing::warn!(error = %err, "stt reconnect failed, disabling stt for session");
            Err(())
        }
    }
}

async fn run(
    state: AppState,
    handle: SessionHandle,
    triggers: TriggerSender,
    outbound: OutboundSender,
    queue: Arc<AudioQueue>,
) {
    let mut session = match open_with_retry(&state).await {
        Ok(session) => session,
        Err(()) => {
            let _ = outbound
                .send(tutor_protocol::ServerMessage::Error { message: STT_DISABLED_MESSAGE.into() })
                .await;
            return;
        }
    };

    let merge_window = Duration::from_secs_f64(state.config.barge.stt_merge_window_sec.max(0.0));
    let mut pending: Option<PendingFinal> = None;
    let mut reconnected_once = false;

    loop {
        tokio::select! {
            frame = queue.pop() => {
                match frame {
                    Some(bytes) => {
                        if session.send_audio(bytes).await.is_err() {
                            tracing::warn!("stt send_audio failed, ending listening period");
                            break;
                        }
                    }
                    None => break,
                }
            }
            event = session.next_event() => {
                match event {
                    Some(Ok(ev)) => handle_event(ev, &handle, &outbound, &mut pending, merge_window).await,
                    Some(Err(err)) => {
                        tracing::warn!(error = %err, "stt upstream error");
                        if try_reconnect(&state, &mut session, &mut reconnected_once).await.is_err() {
                            let _ = outbound
                                .send(tutor_protocol::ServerMessage::Error { message: STT_DISABLED_MESSAGE.into() })
                                .await;
                            break;
                        }
                    }
                    None => {
                        tracing::warn!("stt upstream closed unexpectedly");
                        if try_reconnect(&state, &mut session, &mut reconnected_once).await.is_err() {
                            let _ = outbound
                                .send(tutor_protocol::ServerMessage::Error { message: STT_DISABLED_MESSAGE.into() })
                                .await;
                            break;
                        }
                    }
                }
            }
            _ = wait_for_merge_flush(&pending) => {
                if let Some(p) = pending.take() {
                    let _ = triggers.send(Trigger::Transcript(p.text)).await;
                }
            }
        }
    }

    if let Some(p) = pending.take() {
        let _ = triggers.send(Trigger::Transcript(p.text)).await;
    }
    let _ = session.close().await;
}

async fn handle_event(
    event: SttEvent,
    handle: &SessionHandle,
    outbound: &OutboundSender,
    pending: &mut Option<PendingFinal>,
    merge_window: Duration,
) {
    match event {
        SttEvent::SpeechStarted => {
            handle.echo.note_speech_started();
        }
        SttEvent::InterimTranscript(text) => match handle.echo.note_interim(&text) {
            InterimDecision::AutoBarge => barge::apply(handle, outbound).await,
            InterimDecision::Passthrough => {
                let _ = outbound
                    .send(tutor_protocol::ServerMessage::TranscriptInterim { text })
                    .await;
            }
        },
        SttEvent::FinalTranscript(text) => {
            if handle.echo.is_likely_echo(&text) {
                tracing::debug!(%text, "dropping likely self-transcription");
                return;
            }
            merge_final(pending, text, merge_window);
        }
    }
}
