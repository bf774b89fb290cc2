use std::sync::atomic::{AtomicBool, Ordering};

use futures::{Sink, SinkExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::debug;
use uuid::Uuid;

use crate::error::{SendError, TransportError};
use crate::protocol::close::CloseReason;
use crate::protocol::message::Message;

/// One live transport-level session.
///
/// The transport owns the connection; this layer only observes and acts on
/// it. Behind a trait so dispatch and lifecycle logic can run against mocks
/// instead of a real socket.
#[cfg_attr(test, mockall::automock)]
pub trait SessionLink: Send + Sync {
    fn id(&self) -> Uuid;

    /// Group key: sessions sharing a peer id belong to the same logical
    /// peer, e.g. one player connected from several devices.
    fn peer_id(&self) -> Uuid;

    fn is_open(&self) -> bool;

    /// Encode and transmit one message.
    fn send(&self, message: &Message) -> Result<(), SendError>;

    /// Graceful close carrying a reason. Closing an already-closed session
    /// is a no-op returning `Ok`.
    fn close(&self, reason: CloseReason) -> Result<(), TransportError>;

    /// Unconditional close. Never fails.
    fn force_close(&self);
}

/// Two-tier best-effort close: attempt a graceful close with the given
/// reason, and if that itself fails fall back to the unconditional close,
/// which cannot fail.
pub fn try_to_close(session: &dyn SessionLink, reason: CloseReason) {
    if let Err(e) = session.close(reason) {
        debug!(session = %session.id(), error = %e, "graceful close failed, forcing close");
        session.force_close();
    }
}

/// Best-effort close of a transport sink, discarding any failure. Used
/// during teardown once an error has already occurred.
pub async fn close_quietly<S>(sink: &mut S)
where
    S: Sink<WsMessage> + Unpin,
{
    let _ = sink.close().await;
}

/// Production [`SessionLink`] backed by the per-connection outbound channel.
///
/// Sends are channel pushes and never block, so a slow peer cannot stall a
/// broadcast; the forwarding task drains the channel onto the socket.
pub struct WsSession {
    id: Uuid,
    peer_id: Uuid,
    outbound: mpsc::UnboundedSender<WsMessage>,
    open: AtomicBool,
}

impl WsSession {
    pub fn new(peer_id: Uuid, outbound: mpsc::UnboundedSender<WsMessage>) -> Self {
        Self {
            id: Uuid::new_v4(),
            peer_id,
            outbound,
            open: AtomicBool::new(true),
        }
    }
}

impl SessionLink for WsSession {
    fn id(&self) -> Uuid {
        self.id
    }

    fn peer_id(&self) -> Uuid {
        self.peer_id
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn send(&self, message: &Message) -> Result<(), SendError> {
        let text = message.encode().map_err(SendError::Encode)?;
        self.outbound
            .send(WsMessage::Text(text))
            .map_err(|e| SendError::Transport(TransportError::Send(e.to_string())))
    }

    fn close(&self, reason: CloseReason) -> Result<(), TransportError> {
        if !self.open.swap(false, Ordering::SeqCst) {
            // Already closed.
            return Ok(());
        }
        self.outbound
            .send(WsMessage::Close(Some(reason.to_frame())))
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    fn force_close(&self) {
        self.open.store(false, Ordering::SeqCst);
        let _ = self.outbound.send(WsMessage::Close(None));
    }
}
