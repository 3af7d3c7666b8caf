//! In-memory per-connection session state (spec §4.2).
//!
//! Every mutable attribute that more than one task touches — `mode`,
//! `history`, `boardCursorY`, `boardMaxY`, timestamps, `turnEpoch` — lives
//! behind one `parking_lot::Mutex`. Critical sections here are pure field
//! reads/writes; nothing here ever awaits, so the mutex is never held
//! across a suspension point. `lastSnapshot` is large and immutable once
//! published, so it is stored behind an `Arc` — readers clone the handle
//! and drop the lock before decoding the image.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use tutor_domain::session::{Mode, Snapshot, Turn, PROACTIVE_CHECK_NOTE};

struct Inner {
    subject: Option<String>,
    mode: Mode,
    history: Vec<Turn>,
    board_cursor_y: i64,
    board_max_y: i64,
    last_snapshot: Option<Arc<Snapshot>>,
    last_interaction: DateTime<Utc>,
    last_proactive_at: Option<DateTime<Utc>>,
    board_dirty_since_proactive: bool,
    turn_epoch: u64,
}

pub struct Session {
    pub id: Uuid,
    inner: Mutex<Inner>,
}

impl Session {
    pub fn new(id: Uuid, top_margin: i64) -> Self {
        let now = Utc::now();
        Self {
            id,
            inner: Mutex::new(Inner {
                subject: None,
                mode: Mode::default(),
                history: Vec::new(),
                board_cursor_y: top_margin,
                board_max_y: top_margin,
                last_snapshot: None,
                last_interaction: now,
                last_proactive_at: None,
                board_dirty_since_proactive: false,
                turn_epoch: 0,
            }),
        }
    }

    pub fn set_subject(&self, subject: Option<String>) {
        self.inner.lock().subject = subject;
    }

    pub fn subject(&self) -> Option<String> {
        self.inner.lock().subject.clone()
    }

    /// Reserve the next turn epoch. Used both to start a new turn (§4.3
    /// step 1) and by the Barge-in Controller to supersede the one in
    /// flight (§4.7 step 4).
    pub fn next_epoch(&self) -> u64 {
        let mut inner = self.inner.lock();
        inner.turn_epoch += 1;
        inner.turn_epoch
    }

    pub fn current_epoch(&self) -> u64 {
        self.inner.lock().turn_epoch
    }

    pub fn mode(&self) -> Mode {
        self.inner.lock().mode
    }

    pub fn set_mode(&self, mode: Mode) {
        self.inner.lock().mode = mode;
    }

    /// Append a turn and record it as the most recent interaction, for the
    /// Idle/Proactive Scheduler's silence check (spec §4.8).
    pub fn append_turn(&self, turn: Turn) {
        let mut inner = self.inner.lock();
        inner.history.push(turn);
        inner.last_interaction = Utc::now();
    }

    /// Remove a trailing synthetic proactive-check note, e.g. after the LLM
    /// returned an empty response for it (spec §4.8).
    pub fn remove_trailing_proactive_note(&self) {
        let mut inner = self.inner.lock();
        if inner
            .history
            .last()
            .is_some_and(|t| t.content == PROACTIVE_CHECK_NOTE)
        {
            inner.history.pop();
        }
    }

    pub fn history_snapshot(&self) -> Vec<Turn> {
        self.inner.lock().history.clone()
    }

    pub fn history_len(&self) -> usize {
        self.inner.lock().history.len()
    }

    pub fn board_cursor_y(&self) -> i64 {
        self.inner.lock().board_cursor_y
    }

    pub fn set_board_cursor_y(&self, y: i64) {
        self.inner.lock().board_cursor_y = y;
    }

    /// Reset the cursor to the top margin, per a `clear` action.
    pub fn reset_board_cursor(&self, top_margin: i64) {
        self.inner.lock().board_cursor_y = top_margin;
    }

    pub fn board_max_y(&self) -> i64 {
        self.inner.lock().board_max_y
    }

    /// Widen `boardMaxY` if the client reports a larger student extent.
    /// Never shrinks: the board only ever grows downward during a session.
    pub fn observe_student_max_y(&self, student_max_y: i64) {
        let mut inner = self.inner.lock();
        if student_max_y > inner.board_max_y {
            inner.board_max_y = student_max_y;
        }
    }

    /// Publish a new whiteboard snapshot and mark the board dirty for the
    /// idle/proactive scheduler.
    pub fn set_snapshot(&self, snapshot: Snapshot, student_max_y: Option<i64>) {
        let mut inner = self.inner.lock();
        inner.last_snapshot = Some(Arc::new(snapshot));
        inner.board_dirty_since_proactive = true;
        if let Some(y) = student_max_y {
            if y > inner.board_max_y {
                inner.board_max_y = y;
            }
        }
    }

    /// Clone the `Arc` handle to the last snapshot, releasing the lock
    /// immediately — the caller decodes/uses the image without holding it.
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.inner.lock().last_snapshot.clone()
    }

    pub fn touch_interaction(&self, now: DateTime<Utc>) {
        self.inner.lock().last_interaction = now;
    }

    pub fn last_interaction(&self) -> DateTime<Utc> {
        self.inner.lock().last_interaction
    }

    pub fn last_proactive_at(&self) -> Option<DateTime<Utc>> {
        self.inner.lock().last_proactive_at
    }

    pub fn mark_proactive_checked(&self, now: DateTime<Utc>) {
        let mut inner = self.inner.lock();
        inner.last_proactive_at = Some(now);
        inner.board_dirty_since_proactive = false;
    }

    pub fn board_dirty_since_proactive(&self) -> bool {
        self.inner.lock().board_dirty_since_proactive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_increments_monotonically() {
        let s = Session::new(Uuid::new_v4(), 40);
        assert_eq!(s.next_epoch(), 1);
        assert_eq!(s.next_epoch(), 2);
        assert_eq!(s.current_epoch(), 2);
    }

    #[test]
    fn board_max_y_never_shrinks() {
        let s = Session::new(Uuid::new_v4(), 40);
        s.observe_student_max_y(500);
        s.observe_student_max_y(100);
        assert_eq!(s.board_max_y(), 500);
    }

    #[test]
    fn clear_resets_cursor_to_top_margin() {
        let s = Session::new(Uuid::new_v4(), 40);
        s.set_board_cursor_y(900);
        s.reset_board_cursor(40);
        assert_eq!(s.board_cursor_y(), 40);
    }

    #[test]
    fn proactive_note_removed_only_when_trailing() {
        let s = Session::new(Uuid::new_v4(), 40);
        s.append_turn(Turn::student(PROACTIVE_CHECK_NOTE));
        s.remove_trailing_proactive_note();
        assert_eq!(s.history_len(), 0);
    }

    #[test]
    fn snapshot_is_cheap_to_read_after_publish() {
        let s = Session::new(Uuid::new_v4(), 40);
        s.set_snapshot(
            Snapshot {
                image_base64: "abc".into(),
                width: 10,
                height: 10,
            },
            Some(250),
        );
        let snap = s.snapshot().unwrap();
        assert_eq!(snap.width, 10);
        assert_eq!(s.board_max_y(), 250);
        assert!(s.board_dirty_since_proactive());
    }
}
