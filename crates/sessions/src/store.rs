//! In-memory session registry. No persistence: a session exists only for
//! the lifetime of its connection (spec §1 Non-goals, §3 Lifecycle).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::cancel::BargeController;
use crate::echo::EchoGate;
use crate::session::Session;

/// A session plus the barge-in and echo-gating fabric bound to its
/// in-flight turn and listening periods.
pub struct SessionHandle {
    pub session: Arc<Session>,
    pub barge: Arc<BargeController>,
    pub echo: Arc<EchoGate>,
}

impl Clone for SessionHandle {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            barge: self.barge.clone(),
            echo: self.echo.clone(),
        }
    }
}

#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, id: Uuid, top_margin: i64, echo: EchoGate) -> SessionHandle {
        let handle = SessionHandle {
            session: Arc::new(Session::new(id, top_margin)),
            barge: Arc::new(BargeController::new()),
            echo: Arc::new(echo),
        };
        let clone = handle.clone();
        self.sessions.write().await.insert(id, handle);
        clone
    }

    pub async fn get(&self, id: &Uuid) -> Option<SessionHandle> {
        self.sessions.read().await.get(id).map(SessionHandle::clone)
    }

    pub async fn remove(&self, id: &Uuid) {
        self.sessions.write().await.remove(id);
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_get_then_remove() {
        let reg = SessionRegistry::new();
        let id = Uuid::new_v4();
        reg.create(id, 40, EchoGate::new(0.6, 1.2, 2.0, 1.5)).await;
        assert_eq!(reg.count().await, 1);
        assert!(reg.get(&id).await.is_some());
        reg.remove(&id).await;
        assert_eq!(reg.count().await, 0);
    }
}
