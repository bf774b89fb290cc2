pub mod config;
pub mod error;
pub mod protocol;
pub mod room;
pub mod server;

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use config::Settings;

pub use protocol::{
    CloseCode, CloseReason, Dispatcher, Message, RoomEndpoint, SessionLink, SessionRegistry,
    SessionState,
};
pub use room::{EchoRoom, RoomLogic};
pub use server::RoomServer;
