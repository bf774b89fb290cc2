use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Transport(TransportError::Io(err))
    }
}

impl AppError {
    /// Type-level name of the failure, without the message payload.
    ///
    /// This is what gets echoed into a close reason sent to the remote
    /// peer. It names the error variant, not its contents, so a client
    /// sees e.g. `ProtocolError::Decode` rather than internal detail.
    pub fn kind_name(&self) -> &'static str {
        match self {
            AppError::Protocol(e) => e.kind_name(),
            AppError::Transport(e) => e.kind_name(),
            AppError::Config(_) => "AppError::Config",
            AppError::Internal(_) => "AppError::Internal",
        }
    }
}

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("failed to decode message: {0}")]
    Decode(String),

    #[error("failed to encode message: {0}")]
    Encode(String),
}

impl ProtocolError {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ProtocolError::Decode(_) => "ProtocolError::Decode",
            ProtocolError::Encode(_) => "ProtocolError::Encode",
        }
    }
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("connection is closed")]
    ConnectionClosed,

    #[error("send failed: {0}")]
    Send(String),

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    pub fn kind_name(&self) -> &'static str {
        match self {
            TransportError::ConnectionClosed => "TransportError::ConnectionClosed",
            TransportError::Send(_) => "TransportError::Send",
            TransportError::Handshake(_) => "TransportError::Handshake",
            TransportError::Io(_) => "TransportError::Io",
        }
    }
}

/// Outcome classification for a single session send.
///
/// An encoding failure means the message itself is bad; the transport is
/// presumed healthy and the connection must stay open. A transport failure
/// means the connection is in a bad state and should be closed.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("message could not be encoded: {0}")]
    Encode(#[source] ProtocolError),

    #[error("transport failure during send: {0}")]
    Transport(#[source] TransportError),
}

impl SendError {
    pub fn kind_name(&self) -> &'static str {
        match self {
            SendError::Encode(e) => e.kind_name(),
            SendError::Transport(e) => e.kind_name(),
        }
    }
}
