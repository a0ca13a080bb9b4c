//! Error types for the comment client.

use sajiki_shared::frame::FrameError;
use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// Server has no free viewer slot
    #[error("server is congested, try again later")]
    NetCongestion,

    /// Connection error
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// Framing error on the connection
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// Server closed the connection before answering the handshake
    #[error("server closed the connection during the handshake")]
    ClosedDuringHandshake,

    /// Server sent something other than a comment list after the handshake
    #[error("unexpected reply to handshake: {0}")]
    UnexpectedReply(String),
}
