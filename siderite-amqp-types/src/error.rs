//! Errors raised by the wire codecs

/// Error encoding a value into its wire form.
///
/// Encoding never silently truncates; a value that cannot be represented in
/// the selected dialect is rejected instead.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EncodeError {
    /// Short strings are length-prefixed with a single octet
    #[error("short string exceeds 255 octets")]
    ShortStringTooLong,

    /// Long strings are length-prefixed with four octets
    #[error("long string exceeds u32::MAX octets")]
    LongStringTooLong,

    /// Field tables are length-prefixed with four octets
    #[error("serialized field table exceeds u32::MAX octets")]
    TableTooLong,

    /// Field arrays are length-prefixed with four octets
    #[error("serialized field array exceeds u32::MAX octets")]
    ArrayTooLong,

    /// The strict 0-9-1 dialect has no unsigned 64-bit field type
    #[error("integer value {0} is not representable in the strict 0-9-1 dialect")]
    IntegerOutOfRange(u64),
}

/// Error decoding wire bytes.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DecodeError {
    /// Reading past the end of the buffer
    #[error("unexpected end of buffer")]
    UnexpectedEof,

    /// A field tag octet outside of either dialect
    #[error("unknown field tag {:?}", char::from(*.0))]
    UnknownFieldTag(u8),

    /// A `(class_id, method_id)` pair absent from the method registry
    #[error("unknown method {class_id}.{method_id}")]
    UnknownMethod {
        /// Class id read off the wire
        class_id: u16,
        /// Method id read off the wire
        method_id: u16,
    },

    /// Short strings must be valid UTF-8
    #[error("string field is not valid utf-8")]
    InvalidUtf8,
}

impl From<std::str::Utf8Error> for DecodeError {
    fn from(_: std::str::Utf8Error) -> Self {
        Self::InvalidUtf8
    }
}

impl From<std::string::FromUtf8Error> for DecodeError {
    fn from(_: std::string::FromUtf8Error) -> Self {
        Self::InvalidUtf8
    }
}
