//! Protocol constants defined in the AMQP 0-9-1 specification

/// Protocol major version
pub const MAJOR: u8 = 0;

/// Protocol minor version
pub const MINOR: u8 = 9;

/// Protocol revision
pub const REVISION: u8 = 1;

/// Default TCP port for plain connections
pub const DEFAULT_PORT: u16 = 5672;

/// Method frame
pub const FRAME_METHOD: u8 = 1;

/// Content header frame
pub const FRAME_HEADER: u8 = 2;

/// Content body frame
pub const FRAME_BODY: u8 = 3;

/// Heartbeat frame
pub const FRAME_HEARTBEAT: u8 = 8;

/// Every frame ends with this octet
pub const FRAME_END: u8 = 0xCE;

/// Octets of framing overhead per frame: 7-octet header plus the end octet
pub const FRAME_OVERHEAD: u32 = 8;

/// The smallest frame-max a peer may negotiate
pub const FRAME_MIN_SIZE: u32 = 4096;

/// `connection` class id
pub const CLASS_CONNECTION: u16 = 10;

/// `channel` class id
pub const CLASS_CHANNEL: u16 = 20;

/// `exchange` class id
pub const CLASS_EXCHANGE: u16 = 40;

/// `queue` class id
pub const CLASS_QUEUE: u16 = 50;

/// `basic` class id
pub const CLASS_BASIC: u16 = 60;

/// `confirm` class id (RabbitMQ extension)
pub const CLASS_CONFIRM: u16 = 85;

/// `tx` class id
pub const CLASS_TX: u16 = 90;

/// Reply code carried by `connection.close` and `channel.close`
pub type ReplyCode = u16;

/// Normal completion
pub const REPLY_SUCCESS: ReplyCode = 200;

/// Content body larger than the peer accepts
pub const CONTENT_TOO_LARGE: ReplyCode = 311;

/// Mandatory message could not be routed (RabbitMQ uses this for `basic.return`)
pub const NO_ROUTE: ReplyCode = 312;

/// Immediate message had no consumer
pub const NO_CONSUMERS: ReplyCode = 313;

/// Operator forced the connection closed
pub const CONNECTION_FORCED: ReplyCode = 320;

/// Virtual host path is invalid
pub const INVALID_PATH: ReplyCode = 402;

/// Access refused, including failed authentication
pub const ACCESS_REFUSED: ReplyCode = 403;

/// Referenced entity does not exist
pub const NOT_FOUND: ReplyCode = 404;

/// Resource is locked by another client
pub const RESOURCE_LOCKED: ReplyCode = 405;

/// Request failed a precondition, e.g. a passive declare mismatch
pub const PRECONDITION_FAILED: ReplyCode = 406;

/// Malformed frame
pub const FRAME_ERROR: ReplyCode = 501;

/// Malformed method arguments
pub const SYNTAX_ERROR: ReplyCode = 502;

/// Method invalid for the current state
pub const COMMAND_INVALID: ReplyCode = 503;

/// Frame delivered to a channel that does not exist
pub const CHANNEL_ERROR: ReplyCode = 504;

/// Frame that the peer was not expecting
pub const UNEXPECTED_FRAME: ReplyCode = 505;

/// Broker out of resources
pub const RESOURCE_ERROR: ReplyCode = 506;

/// Operation not allowed
pub const NOT_ALLOWED: ReplyCode = 530;

/// Operation not implemented by the peer
pub const NOT_IMPLEMENTED: ReplyCode = 540;

/// Internal broker error
pub const INTERNAL_ERROR: ReplyCode = 541;

/// Whether a reply code scopes to a single channel rather than the whole
/// connection. A `channel.close` with a soft code leaves the connection open.
pub fn is_soft_error(code: ReplyCode) -> bool {
    matches!(
        code,
        CONTENT_TOO_LARGE
            | NO_ROUTE
            | NO_CONSUMERS
            | ACCESS_REFUSED
            | NOT_FOUND
            | RESOURCE_LOCKED
            | PRECONDITION_FAILED
    )
}
