use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{AppError, SendError};
use crate::protocol::close::CloseReason;
use crate::protocol::message::Message;
use crate::protocol::registry::SessionRegistry;
use crate::protocol::session::{try_to_close, SessionLink};
use crate::room::RoomLogic;

/// Lifecycle of one connection as seen by its endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Open,
    Closing(CloseReason),
    Closed,
}

/// Handle given to room logic for emitting responses. Sending is
/// fire-and-forget: delivery failures are classified and handled inside the
/// endpoint, never surfaced to the room.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Broadcast a message to every session related to `session`.
    async fn send_message(&self, session: &Arc<dyn SessionLink>, message: &Message);
}

/// Per-connection protocol endpoint for the room.
///
/// One instance exists for each connected client, driven by the transport's
/// lifecycle events. It acknowledges new connections, hands inbound
/// messages to the room logic, fans responses out to the connection group,
/// and tears the connection down on error.
pub struct RoomEndpoint {
    state: SessionState,
    room: Arc<dyn RoomLogic>,
    registry: Arc<SessionRegistry>,
}

impl RoomEndpoint {
    pub fn new(room: Arc<dyn RoomLogic>, registry: Arc<SessionRegistry>) -> Self {
        Self {
            state: SessionState::Connecting,
            room,
            registry,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// A new connection has been made to the room. All that happens here is
    /// the acknowledgement; no business logic runs on open.
    pub async fn on_open(&mut self, session: &Arc<dyn SessionLink>) {
        debug!(session = %session.id(), "new connection to the room");
        self.state = SessionState::Open;
        self.send_message(session, &Message::ack()).await;
    }

    /// An inbound frame arrived. Decode it and hand it to the room logic;
    /// a decode failure is reported as an error event, not a crash. This is
    /// the single dispatch point into business logic; message contents are
    /// never interpreted here.
    pub async fn on_message(&mut self, session: &Arc<dyn SessionLink>, raw: &str) {
        if self.state != SessionState::Open {
            warn!(
                session = %session.id(),
                state = ?self.state,
                "dropping message received outside the open state"
            );
            return;
        }

        match Message::decode(raw) {
            Ok(message) => {
                let room = Arc::clone(&self.room);
                if let Err(e) = room.handle_message(session, message, &*self).await {
                    self.on_error(session, e).await;
                }
            }
            Err(e) => self.on_error(session, e.into()).await,
        }
    }

    /// A problem occurred on the connection. Classify it by its kind name
    /// only and attempt a graceful close with that name as the reason.
    ///
    /// The kind name is echoed to the remote peer, which leaks a little of
    /// the implementation but makes remote debugging much easier. Careful
    /// with what this might reveal; we are opting for making debug easy.
    pub async fn on_error(&mut self, session: &Arc<dyn SessionLink>, cause: AppError) {
        if self.state == SessionState::Closed {
            return;
        }
        debug!(session = %session.id(), error = %cause, "a problem occurred on the connection");

        let reason = CloseReason::unexpected(cause.kind_name());
        self.state = SessionState::Closing(reason.clone());
        try_to_close(session.as_ref(), reason);
        self.state = SessionState::Closed;
    }

    /// The connection has been closed. The session is already gone, so this
    /// only records the fact.
    pub async fn on_close(&mut self, session: &Arc<dyn SessionLink>, reason: Option<CloseReason>) {
        debug!(session = %session.id(), reason = ?reason, "connection to the room closed");
        self.state = SessionState::Closed;
    }

    /// Attempt delivery of one message to one session.
    ///
    /// A session that is not open is an expected race, not a failure. An
    /// encoding failure means the message is bad but the connection is
    /// likely just fine, so it stays open. A transport failure suggests the
    /// connection is in a bad state, so it is proactively closed with a
    /// classified reason. Returns whether the message was delivered.
    pub fn send_to_session(&self, session: &dyn SessionLink, message: &Message) -> bool {
        if !session.is_open() {
            return false;
        }
        match session.send(message) {
            Ok(()) => true,
            Err(SendError::Encode(e)) => {
                debug!(session = %session.id(), error = %e, "unexpected condition writing message");
                false
            }
            Err(SendError::Transport(e)) => {
                debug!(session = %session.id(), error = %e, "unexpected condition writing message");
                try_to_close(session, CloseReason::unexpected(e.kind_name()));
                false
            }
        }
    }
}

#[async_trait]
impl Dispatcher for RoomEndpoint {
    /// Simple broadcast: deliver to every session in the resolved group.
    ///
    /// This is effectively always a broadcast: a player can be connected
    /// from more than one device, and each device is its own session.
    /// Topic filtering belongs on the receiving side. Deliveries are
    /// independent: one failure never aborts the rest, and no ordering
    /// across members is guaranteed.
    async fn send_message(&self, session: &Arc<dyn SessionLink>, message: &Message) {
        let group = self.registry.related_sessions(session).await;
        for member in group {
            self.send_to_session(member.as_ref(), message);
        }
    }
}
