//! Errors associated with the connection

use std::io;

use tokio::task::JoinError;

use crate::frames;
use crate::transport;

/// Error associated with opening a connection
#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    /// IO error
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Error parsing the URL
    #[error(transparent)]
    UrlError(#[from] url::ParseError),

    /// Only the `amqp` scheme is supported; encrypted streams plug in
    /// through `open_with_stream`
    #[error(r#"invalid scheme, only "amqp" is supported"#)]
    InvalidScheme,

    /// The connect timeout elapsed before the transport and preamble were
    /// established, or a handshake reply missed the read timeout
    #[error("connection handshake timed out")]
    Timeout,

    /// The broker answered the preamble with its own protocol header
    #[error("broker does not support AMQP 0-9-1, offered {major}.{minor}.{revision}")]
    VersionMismatch {
        /// Major version offered by the broker
        major: u8,
        /// Minor version offered by the broker
        minor: u8,
        /// Revision offered by the broker
        revision: u8,
    },

    /// The configured SASL mechanism is not in the broker's offer
    #[error("mechanism {0} is not offered by the broker")]
    MechanismNotSupported(String),

    /// `connection.close` with reply code 403 during negotiation
    #[error("authentication failed: {reply_text}")]
    AuthFailure {
        /// Reply text from `connection.close`
        reply_text: String,
    },

    /// The broker closed the connection during the handshake
    #[error("broker closed the connection: {reply_code} {reply_text}")]
    RemoteClosed {
        /// Reply code from `connection.close`
        reply_code: u16,
        /// Reply text from `connection.close`
        reply_text: String,
    },

    /// The broker sent something other than the expected handshake method
    #[error("unexpected frame during handshake: {0}")]
    UnexpectedFrame(&'static str),

    /// Transport-level failure
    #[error(transparent)]
    Transport(transport::Error),
}

impl From<transport::Error> for OpenError {
    fn from(err: transport::Error) -> Self {
        match err {
            transport::Error::Frame(frames::Error::VersionMismatch {
                major,
                minor,
                revision,
            }) => Self::VersionMismatch {
                major,
                minor,
                revision,
            },
            other => Self::Transport(other),
        }
    }
}

/// Error from an open connection
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport-level failure, including a missed heartbeat
    #[error(transparent)]
    Transport(#[from] transport::Error),

    /// The broker closed the connection with `connection.close`
    #[error("connection closed by broker: {reply_code} {reply_text}")]
    RemoteClosed {
        /// Reply code from `connection.close`
        reply_code: u16,
        /// Reply text from `connection.close`
        reply_text: String,
    },

    /// The peer broke the framing or method rules; the connection closes
    /// with the carried reply code
    #[error("protocol violation ({reply_code}): {reason}")]
    ProtocolViolation {
        /// Reply code sent in the resulting `connection.close`
        reply_code: u16,
        /// What went wrong
        reason: &'static str,
    },

    /// The connection is not open
    #[error("connection is not open")]
    IllegalState,

    /// The engine task was cancelled or panicked
    #[error(transparent)]
    JoinError(#[from] JoinError),
}

/// Error allocating a channel id
#[derive(Debug, thiserror::Error)]
pub(crate) enum AllocChannelError {
    #[error("connection is not open")]
    IllegalState,

    #[error("connection channel-max reached")]
    ChannelMaxReached,
}

impl From<AllocChannelError> for crate::channel::OpenError {
    fn from(err: AllocChannelError) -> Self {
        match err {
            AllocChannelError::IllegalState => Self::IllegalConnectionState,
            AllocChannelError::ChannelMaxReached => Self::ChannelMaxReached,
        }
    }
}
