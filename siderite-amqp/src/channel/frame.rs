//! Frames as routed from the connection to one channel

use bytes::Bytes;
use siderite_amqp_types::{ContentHeader, Method};

/// One frame routed to a channel engine by the connection reader
#[derive(Debug)]
pub(crate) enum ChannelFrame {
    /// A decoded method frame
    Method(Method),

    /// A content header frame
    Header(ContentHeader),

    /// A content body frame
    Body(Bytes),

    /// A well-formed method frame with an unknown `(class_id, method_id)`
    /// pair; fails the channel's pending waiter
    UnknownMethod { class_id: u16, method_id: u16 },
}
