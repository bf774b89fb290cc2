//! Transport glue: accepts WebSocket connections and pumps their lifecycle
//! events into a per-connection [`RoomEndpoint`].

use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{AppError, TransportError};
use crate::protocol::{
    close_quietly, CloseReason, RoomEndpoint, SessionLink, SessionRegistry, SessionState,
    WsSession,
};
use crate::room::RoomLogic;

pub struct RoomServer {
    registry: Arc<SessionRegistry>,
    room: Arc<dyn RoomLogic>,
}

impl RoomServer {
    pub fn new(room: Arc<dyn RoomLogic>) -> Self {
        Self {
            registry: Arc::new(SessionRegistry::new()),
            room,
        }
    }

    pub fn registry(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.registry)
    }

    /// Drive one connection from handshake to teardown. Events for this
    /// connection are handled serially here; other connections run on their
    /// own tasks.
    pub async fn handle_connection(self: Arc<Self>, raw_stream: TcpStream, addr: SocketAddr) {
        info!("New WebSocket connection from: {}", addr);

        // The peer id groups sessions belonging to one logical player. It
        // comes from the handshake query string when given, otherwise the
        // session forms a group of its own.
        let mut peer_id = None;
        let callback = |req: &Request, resp: Response| {
            peer_id = peer_id_from_query(req.uri().query());
            Ok(resp)
        };
        let ws_stream = match tokio_tungstenite::accept_hdr_async(raw_stream, callback).await {
            Ok(ws) => ws,
            Err(e) => {
                error!("Error during WebSocket handshake: {}", e);
                return;
            }
        };
        let peer_id = peer_id.unwrap_or_else(Uuid::new_v4);

        let (ws_sink, mut ws_stream) = ws_stream.split();
        let (tx, rx) = mpsc::unbounded_channel();
        let pump_tx = tx.clone();

        let session: Arc<dyn SessionLink> = Arc::new(WsSession::new(peer_id, tx));
        let session_id = session.id();
        self.registry.add(Arc::clone(&session)).await;

        // Forward queued frames onto the socket. Stops after a close frame
        // goes out or the socket dies; either way the sink is closed
        // quietly.
        let send_task = tokio::spawn(async move {
            let mut ws_sink = ws_sink;
            let mut rx = rx;

            while let Some(frame) = rx.recv().await {
                let is_close = matches!(frame, WsMessage::Close(_));
                if let Err(e) = ws_sink.send(frame).await {
                    debug!("Error sending WebSocket message: {}", e);
                    break;
                }
                if is_close {
                    break;
                }
            }
            close_quietly(&mut ws_sink).await;
        });

        let mut endpoint = RoomEndpoint::new(Arc::clone(&self.room), self.registry());
        endpoint.on_open(&session).await;

        // Event pump: inbound frames drive the lifecycle handler.
        while let Some(frame) = ws_stream.next().await {
            match frame {
                Ok(WsMessage::Text(text)) => endpoint.on_message(&session, &text).await,
                Ok(WsMessage::Ping(data)) => {
                    let _ = pump_tx.send(WsMessage::Pong(data));
                }
                Ok(WsMessage::Pong(_)) => {}
                Ok(WsMessage::Close(frame)) => {
                    endpoint
                        .on_close(&session, frame.map(CloseReason::from))
                        .await;
                    break;
                }
                Ok(other) => {
                    warn!(session = %session_id, frame = ?other, "unsupported frame type");
                }
                Err(e) => {
                    let cause = AppError::Transport(classify_ws_error(e));
                    endpoint.on_error(&session, cause).await;
                    break;
                }
            }
        }

        // Stream ended without a close frame or error event.
        if *endpoint.state() != SessionState::Closed {
            endpoint.on_close(&session, None).await;
        }

        self.registry.remove(&session_id).await;
        session.force_close();

        // Release our ends of the outbound channel so the forwarding task
        // drains and exits.
        drop(session);
        drop(pump_tx);
        if let Err(e) = send_task.await {
            debug!("Forwarding task ended abnormally: {}", e);
        }

        info!("Connection {} closed", session_id);
    }
}

fn classify_ws_error(err: WsError) -> TransportError {
    match err {
        WsError::ConnectionClosed | WsError::AlreadyClosed => TransportError::ConnectionClosed,
        WsError::Io(e) => TransportError::Io(e),
        other => TransportError::Send(other.to_string()),
    }
}

fn peer_id_from_query(query: Option<&str>) -> Option<Uuid> {
    let query = query?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "player")
        .and_then(|(_, value)| Uuid::parse_str(&value).ok())
}
