//! Assembled inbound messages

use bytes::Bytes;
use siderite_amqp_types::BasicProperties;

/// A message pushed by the broker to a consumer
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    /// Tag of the consumer the message was delivered to
    pub consumer_tag: String,

    /// Channel-scoped tag to acknowledge the message with
    pub delivery_tag: u64,

    /// Whether this message was delivered before
    pub redelivered: bool,

    /// Exchange the message was published to
    pub exchange: String,

    /// Routing key the message was published with
    pub routing_key: String,

    /// Message properties
    pub properties: BasicProperties,

    /// Message body
    pub body: Bytes,
}

/// Items observed on a consumer stream
#[derive(Debug)]
pub enum ConsumerMessage {
    /// A delivered message
    Delivery(Delivery),

    /// The broker cancelled the consumer, e.g. its queue was deleted.
    /// Announced only when `consumer_cancel_notify` is active, which this
    /// client always advertises.
    Cancelled,
}

/// A mandatory or immediate message the broker could not route
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnedMessage {
    /// Reply code explaining the return
    pub reply_code: u16,

    /// Human-readable reason
    pub reply_text: String,

    /// Exchange the message was published to
    pub exchange: String,

    /// Routing key the message was published with
    pub routing_key: String,

    /// Message properties
    pub properties: BasicProperties,

    /// Message body
    pub body: Bytes,
}

/// The response to a successful `basic.get`
#[derive(Debug, Clone, PartialEq)]
pub struct GetMessage {
    /// Channel-scoped tag to acknowledge the message with
    pub delivery_tag: u64,

    /// Whether this message was delivered before
    pub redelivered: bool,

    /// Exchange the message was published to
    pub exchange: String,

    /// Routing key the message was published with
    pub routing_key: String,

    /// Messages left in the queue after this one
    pub message_count: u32,

    /// Message properties
    pub properties: BasicProperties,

    /// Message body
    pub body: Bytes,
}

/// A publisher-confirm outcome in confirm mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirm {
    /// The publish sequence number being settled
    pub delivery_tag: u64,

    /// Whether all sequences up to and including `delivery_tag` settle
    pub multiple: bool,

    /// `true` for `basic.ack`, `false` for `basic.nack`
    pub ack: bool,
}
