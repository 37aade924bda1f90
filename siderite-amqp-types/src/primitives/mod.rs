//! Primitive wire encodings shared by method arguments, content properties
//! and table-valued fields
//!
//! Integers are big-endian. Strings are length-prefixed and never
//! NUL-terminated. Reads past end-of-buffer fail with
//! [`DecodeError::UnexpectedEof`] rather than panicking.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{DecodeError, EncodeError};

mod table;
mod value;

pub use table::{FieldArray, FieldTable};
pub use value::FieldValue;

/// POSIX seconds, as carried by the `T` field type and the content-header
/// `timestamp` property
pub type Timestamp = u64;

/// Exact decimal: `value / 10^scale`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decimal {
    /// Number of decimal digits after the point
    pub scale: u8,
    /// Raw signed value before scaling
    pub value: i32,
}

/// Which set of field-type tag letters is emitted for tables and arrays.
///
/// The two dialects differ only in the tags used for the narrower integer
/// types; decoding accepts either dialect regardless of this setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireDialect {
    /// RabbitMQ's field-type table, the common case
    #[default]
    Rabbit,

    /// Strict 0-9-1: narrow integers are widened to the signed 32- or
    /// 64-bit types on emission
    Strict091,
}

pub(crate) fn ensure(src: &Bytes, n: usize) -> Result<(), DecodeError> {
    if src.remaining() < n {
        return Err(DecodeError::UnexpectedEof);
    }
    Ok(())
}

macro_rules! checked_read {
    ($($fn_name:ident -> $ty:ty, $get:ident, $n:expr;)*) => {
        $(
            pub(crate) fn $fn_name(src: &mut Bytes) -> Result<$ty, DecodeError> {
                ensure(src, $n)?;
                Ok(src.$get())
            }
        )*
    };
}

checked_read! {
    read_u8 -> u8, get_u8, 1;
    read_i8 -> i8, get_i8, 1;
    read_u16 -> u16, get_u16, 2;
    read_i16 -> i16, get_i16, 2;
    read_u32 -> u32, get_u32, 4;
    read_i32 -> i32, get_i32, 4;
    read_u64 -> u64, get_u64, 8;
    read_i64 -> i64, get_i64, 8;
    read_f32 -> f32, get_f32, 4;
    read_f64 -> f64, get_f64, 8;
}

pub(crate) fn write_shortstr(dst: &mut BytesMut, s: &str) -> Result<(), EncodeError> {
    if s.len() > u8::MAX as usize {
        return Err(EncodeError::ShortStringTooLong);
    }
    dst.put_u8(s.len() as u8);
    dst.put_slice(s.as_bytes());
    Ok(())
}

pub(crate) fn read_shortstr(src: &mut Bytes) -> Result<String, DecodeError> {
    let len = read_u8(src)? as usize;
    ensure(src, len)?;
    let raw = src.split_to(len);
    Ok(String::from_utf8(raw.to_vec())?)
}

pub(crate) fn write_longstr(dst: &mut BytesMut, bytes: &[u8]) -> Result<(), EncodeError> {
    if bytes.len() > u32::MAX as usize {
        return Err(EncodeError::LongStringTooLong);
    }
    dst.put_u32(bytes.len() as u32);
    dst.put_slice(bytes);
    Ok(())
}

pub(crate) fn read_longstr(src: &mut Bytes) -> Result<Bytes, DecodeError> {
    let len = read_u32(src)? as usize;
    ensure(src, len)?;
    Ok(src.split_to(len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortstr_round_trip() {
        let mut buf = BytesMut::new();
        write_shortstr(&mut buf, "en_US").unwrap();
        assert_eq!(&buf[..], b"\x05en_US");

        let mut src = buf.freeze();
        assert_eq!(read_shortstr(&mut src).unwrap(), "en_US");
        assert!(src.is_empty());
    }

    #[test]
    fn shortstr_over_255_octets_is_rejected() {
        let long = "x".repeat(256);
        let mut buf = BytesMut::new();
        assert!(matches!(
            write_shortstr(&mut buf, &long),
            Err(EncodeError::ShortStringTooLong)
        ));
    }

    #[test]
    fn truncated_longstr_fails_with_eof() {
        let mut src = Bytes::from_static(&[0, 0, 0, 10, b'a', b'b']);
        assert!(matches!(
            read_longstr(&mut src),
            Err(DecodeError::UnexpectedEof)
        ));
    }
}
