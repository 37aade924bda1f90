//! Errors raised by the frame codec

use std::io;

use siderite_amqp_types::{DecodeError, EncodeError};

/// Error reading or writing a frame
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error from the underlying stream
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Frame header or end octet invalid
    #[error("malformed frame: {0}")]
    Malformed(&'static str),

    /// Frame type octet outside the known set
    #[error("unknown frame type {0:#04x}")]
    UnknownFrameType(u8),

    /// The peer replied to our protocol header with its own, meaning it
    /// does not speak AMQP 0-9-1
    #[error("broker does not support AMQP 0-9-1, offered {major}.{minor}.{revision}")]
    VersionMismatch {
        /// Major version offered by the peer
        major: u8,
        /// Minor version offered by the peer
        minor: u8,
        /// Revision offered by the peer
        revision: u8,
    },

    /// Wire-level constraint violated while encoding
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// Malformed frame payload
    #[error(transparent)]
    Decode(#[from] DecodeError),
}
