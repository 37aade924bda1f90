#![deny(missing_docs, missing_debug_implementations)]

//! Wire-level types for the AMQP 0-9-1 protocol as spoken by RabbitMQ-family
//! brokers.
//!
//! This crate implements the data layer only: the tagged field encodings used
//! in tables, arrays and content properties, the method classes with their
//! argument schemas, the content header, and the connection/channel state
//! enums. Framing and I/O live in the `siderite-amqp` crate.
//!
//! All integer encodings are big-endian. Two table dialects exist on the wire:
//! the RabbitMQ dialect and the strict 0-9-1 dialect, which differ only in the
//! tag letters emitted for the narrower integer types. Decoding always accepts
//! both; [`WireDialect`] selects what is emitted.
//!
//! [`WireDialect`]: primitives::WireDialect

pub mod definitions;
pub mod error;
pub mod methods;
pub mod primitives;
pub mod properties;
pub mod states;

pub use error::{DecodeError, EncodeError};
pub use methods::Method;
pub use primitives::{FieldArray, FieldTable, FieldValue, WireDialect};
pub use properties::{BasicProperties, ContentHeader};
