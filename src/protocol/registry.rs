use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::protocol::session::SessionLink;

/// Shared view of the sessions currently attached to the room.
///
/// The transport layer adds and removes entries; broadcast resolution only
/// reads. Groups are recomputed on every lookup, never persisted.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, Arc<dyn SessionLink>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn add(&self, session: Arc<dyn SessionLink>) {
        let id = session.id();
        self.sessions.write().await.insert(id, session);
        debug!(session = %id, "session registered");
    }

    pub async fn remove(&self, id: &Uuid) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            debug!(session = %id, "session deregistered");
        }
        removed
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Resolve the connection group for `session`: every open session that
    /// shares its peer id. The triggering session is always a member of its
    /// own group, whether or not it is registered. The snapshot is taken
    /// under the read lock and the lock released before any caller sends.
    pub async fn related_sessions(
        &self,
        session: &Arc<dyn SessionLink>,
    ) -> Vec<Arc<dyn SessionLink>> {
        let peer_id = session.peer_id();
        let mut group: Vec<Arc<dyn SessionLink>> = {
            let sessions = self.sessions.read().await;
            sessions
                .values()
                .filter(|s| s.peer_id() == peer_id && s.is_open())
                .cloned()
                .collect()
        };

        if !group.iter().any(|s| s.id() == session.id()) {
            group.push(Arc::clone(session));
        }
        group
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
