//! The boundary into room business logic.
//!
//! The gateway calls exactly one thing on the room: `handle_message`. The
//! room emits responses by calling back into the dispatcher it is handed.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::config::RoomConfig;
use crate::error::AppError;
use crate::protocol::{Dispatcher, Message, SessionLink};

/// Business logic behind the room. Opaque to the gateway.
#[async_trait]
pub trait RoomLogic: Send + Sync {
    /// The hook into the interesting room behaviour.
    ///
    /// Failures are not caught here; they propagate to the caller, which
    /// routes them into the connection's error handling.
    async fn handle_message(
        &self,
        session: &Arc<dyn SessionLink>,
        message: Message,
        dispatcher: &dyn Dispatcher,
    ) -> Result<(), AppError>;
}

/// Minimal room: answers anything addressed to the room by broadcasting a
/// player event carrying the original content back to the sender's group.
pub struct EchoRoom {
    name: String,
}

impl EchoRoom {
    pub fn new(config: &RoomConfig) -> Self {
        Self {
            name: config.name.clone(),
        }
    }
}

#[async_trait]
impl RoomLogic for EchoRoom {
    async fn handle_message(
        &self,
        session: &Arc<dyn SessionLink>,
        message: Message,
        dispatcher: &dyn Dispatcher,
    ) -> Result<(), AppError> {
        match message {
            Message::Room(content) => {
                let reply = Message::Player(json!({
                    "room": self.name,
                    "content": content,
                }));
                dispatcher.send_message(session, &reply).await;
            }
            other => {
                debug!(message = ?other, "ignoring message not addressed to the room");
            }
        }
        Ok(())
    }
}
