//! Errors associated with channels

use siderite_amqp_types::EncodeError;

/// Error opening a channel
#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    /// The connection is not in a state that allows opening channels
    #[error("connection is not open")]
    IllegalConnectionState,

    /// Every channel id up to the negotiated channel-max is in use
    #[error("connection channel-max reached")]
    ChannelMaxReached,

    /// The broker refused the channel with `channel.close`
    #[error("channel refused by broker: {reply_code} {reply_text}")]
    Refused {
        /// Reply code from `channel.close`
        reply_code: u16,
        /// Reply text from `channel.close`
        reply_text: String,
    },

    /// The connection went away while the channel was opening
    #[error("connection closed")]
    ConnectionClosed,

    /// `channel.open-ok` did not arrive within the read timeout
    #[error("channel open timed out")]
    Timeout,

    /// The broker answered `channel.open` with something else entirely
    #[error("unexpected reply to channel.open")]
    UnexpectedReply,
}

/// Error from an operation on an open channel
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The broker closed the channel. Soft reply codes such as 404 or 406
    /// are scoped to the channel; the connection stays open.
    #[error("channel closed by broker: {reply_code} {reply_text}")]
    Closed {
        /// Reply code from `channel.close`
        reply_code: u16,
        /// Reply text from `channel.close`
        reply_text: String,
        /// Class of the method that caused the close, zero if none
        class_id: u16,
        /// Method that caused the close, zero if none
        method_id: u16,
    },

    /// The channel is closed or closing locally
    #[error("channel is not open")]
    NotOpen,

    /// The connection went away, taking the channel with it
    #[error("connection closed")]
    ConnectionClosed,

    /// The broker replied with a method absent from the registry
    #[error("unknown method {class_id}.{method_id} in reply position")]
    UnknownMethod {
        /// Class id read off the wire
        class_id: u16,
        /// Method id read off the wire
        method_id: u16,
    },

    /// The peer violated the channel's frame or method sequencing
    #[error("protocol violation: {0}")]
    ProtocolViolation(&'static str),

    /// The broker paused this channel with `channel.flow` and the
    /// connection is configured to fail rather than queue publishes
    #[error("outbound content is stopped by channel.flow")]
    FlowStopped,

    /// Acknowledging a delivery tag that is not outstanding
    #[error("delivery tag {0} is not outstanding")]
    UnknownDeliveryTag(u64),

    /// The operation's reply did not arrive within the read timeout
    #[error("operation timed out")]
    Timeout,

    /// Wire-level constraint violated while encoding the request
    #[error(transparent)]
    Encode(#[from] EncodeError),
}
