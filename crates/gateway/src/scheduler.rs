//! Idle/Proactive Scheduler (spec §4.8): a coarse periodic tick per
//! session that fires a synthetic `proactive_check` trigger when the
//! student has drawn recently and neither party has spoken for a while.

use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use tutor_domain::config::SchedulerConfig;
use tutor_sessions::SessionHandle;

use crate::orchestrator::{Trigger, TriggerSender};

fn seconds_since(t: chrono::DateTime<Utc>, now: chrono::DateTime<Utc>) -> f64 {
    (now - t).num_milliseconds() as f64 / 1000.0
}

pub fn spawn(
    handle: SessionHandle,
    session_id: Uuid,
    triggers: TriggerSender,
    cfg: SchedulerConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs_f64(cfg.tick_interval_sec.max(0.1)));
        loop {
            ticker.tick().await;

            if !handle.session.board_dirty_since_proactive() {
                continue;
            }

            let now = Utc::now();
            if seconds_since(handle.session.last_interaction(), now) < cfg.silence_threshold_sec {
                continue;
            }

            let since_last_proactive = handle
                .session
                .last_proactive_at()
                .map(|t| seconds_since(t, now))
                .unwrap_or(f64::INFINITY);
            if since_last_proactive < cfg.min_proactive_interval_sec {
                continue;
            }

            handle.session.mark_proactive_checked(now);
            tracing::debug!(%session_id, "scheduler firing proactive check");
            if triggers.send(Trigger::ProactiveCheck).await.is_err() {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use tutor_domain::session::Snapshot;
    use tutor_sessions::{EchoGate, SessionRegistry};

    use super::*;

    fn fast_cfg() -> SchedulerConfig {
        SchedulerConfig {
            tick_interval_sec: 0.02,
            silence_threshold_sec: 0.0,
            min_proactive_interval_sec: 0.0,
        }
    }

    async fn handle() -> SessionHandle {
        let registry = SessionRegistry::new();
        registry
            .create(Uuid::new_v4(), 40, EchoGate::new(0.6, 1.2, 2.0, 1.5))
            .await
    }

    #[tokio::test]
    async fn fires_proactive_check_once_board_is_dirty_and_silent() {
        let handle = handle().await;
        handle.session.set_snapshot(
            Snapshot { image_base64: "x".into(), width: 10, height: 10 },
            None,
        );
        let (tx, mut rx) = tokio::sync::mpsc::channel(4);
        let task = spawn(handle.clone(), Uuid::new_v4(), tx, fast_cfg());

        let trigger = tokio::time::timeout(Duration::from_millis(500), rx.recv())
            .await
            .expect("scheduler should have fired")
            .expect("channel should stay open");
        assert!(matches!(trigger, Trigger::ProactiveCheck));
        task.abort();
    }

    #[tokio::test]
    async fn does_not_fire_when_board_is_not_dirty() {
        let handle = handle().await;
        let (tx, mut rx) = tokio::sync::mpsc::channel(4);
        let task = spawn(handle, Uuid::new_v4(), tx, fast_cfg());

        let result = tokio::time::timeout(Duration::from_millis(150), rx.recv()).await;
        assert!(result.is_err(), "no board_snapshot since last check, scheduler must stay quiet");
        task.abort();
    }
}
