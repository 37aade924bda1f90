//! Errors raised by the transport

use std::io;

use crate::frames;

/// Error reading from or writing to the framed transport
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error from the underlying stream
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Broker inactivity exceeded twice the negotiated heartbeat plus one
    /// second
    #[error("heartbeat missed: no inbound traffic from the peer")]
    HeartbeatMissed,

    /// Frame-level error
    #[error(transparent)]
    Frame(#[from] frames::Error),
}
