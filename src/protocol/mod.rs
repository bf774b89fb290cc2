//! Per-connection room protocol: message envelope, session abstraction,
//! group resolution, and the lifecycle endpoint that ties them together.

mod close;
mod endpoint;
mod message;
mod registry;
mod session;

pub use close::{trim_reason, CloseCode, CloseReason, REASON_MAX_LEN};
pub use endpoint::{Dispatcher, RoomEndpoint, SessionState};
pub use message::Message;
pub use registry::SessionRegistry;
pub use session::{close_quietly, try_to_close, SessionLink, WsSession};
