//! Tagged field values

use bytes::{Bytes, BytesMut};

use crate::error::{DecodeError, EncodeError};

use super::{
    ensure, read_f32, read_f64, read_i16, read_i32, read_i64, read_i8, read_longstr,
    read_shortstr, read_u16, read_u32, read_u64, read_u8, write_longstr, write_shortstr, Decimal,
    FieldArray, FieldTable, Timestamp, WireDialect,
};

/// A single tagged value as carried in field tables and field arrays.
///
/// The variants cover the RabbitMQ field-type table; the strict 0-9-1
/// dialect is a subset reached by widening the narrow integers on emission.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// `t`
    Boolean(bool),
    /// `b`
    I8(i8),
    /// `B`
    U8(u8),
    /// `U`
    I16(i16),
    /// `u`
    U16(u16),
    /// `I`
    I32(i32),
    /// `i`
    U32(u32),
    /// `L`
    I64(i64),
    /// `l`
    U64(u64),
    /// `f`
    Float(f32),
    /// `d`
    Double(f64),
    /// `D`
    Decimal(Decimal),
    /// `s`
    ShortString(String),
    /// `S`
    LongString(Bytes),
    /// `A`
    Array(FieldArray),
    /// `T`
    Timestamp(Timestamp),
    /// `F`
    Table(FieldTable),
    /// `V`
    Void,
    /// `x`
    ByteArray(Bytes),
}

impl FieldValue {
    /// Appends tag octet plus payload to `dst`.
    pub fn encode(&self, dialect: WireDialect, dst: &mut BytesMut) -> Result<(), EncodeError> {
        use bytes::BufMut;

        match dialect {
            WireDialect::Rabbit => {}
            WireDialect::Strict091 => {
                // Narrow integers collapse onto the wider signed types
                match *self {
                    FieldValue::I8(v) => return FieldValue::I32(v as i32).encode(dialect, dst),
                    FieldValue::U8(v) => return FieldValue::I32(v as i32).encode(dialect, dst),
                    FieldValue::I16(v) => return FieldValue::I32(v as i32).encode(dialect, dst),
                    FieldValue::U16(v) => return FieldValue::I32(v as i32).encode(dialect, dst),
                    FieldValue::U32(v) => {
                        return match i32::try_from(v) {
                            Ok(v) => FieldValue::I32(v).encode(dialect, dst),
                            Err(_) => FieldValue::I64(v as i64).encode(dialect, dst),
                        }
                    }
                    FieldValue::U64(v) => {
                        let v = i64::try_from(v)
                            .map_err(|_| EncodeError::IntegerOutOfRange(v))?;
                        return FieldValue::I64(v).encode(dialect, dst);
                    }
                    _ => {}
                }
            }
        }

        match self {
            FieldValue::Boolean(v) => {
                dst.put_u8(b't');
                dst.put_u8(*v as u8);
            }
            FieldValue::I8(v) => {
                dst.put_u8(b'b');
                dst.put_i8(*v);
            }
            FieldValue::U8(v) => {
                dst.put_u8(b'B');
                dst.put_u8(*v);
            }
            FieldValue::I16(v) => {
                dst.put_u8(b'U');
                dst.put_i16(*v);
            }
            FieldValue::U16(v) => {
                dst.put_u8(b'u');
                dst.put_u16(*v);
            }
            FieldValue::I32(v) => {
                dst.put_u8(b'I');
                dst.put_i32(*v);
            }
            FieldValue::U32(v) => {
                dst.put_u8(b'i');
                dst.put_u32(*v);
            }
            FieldValue::I64(v) => {
                dst.put_u8(b'L');
                dst.put_i64(*v);
            }
            FieldValue::U64(v) => {
                dst.put_u8(b'l');
                dst.put_u64(*v);
            }
            FieldValue::Float(v) => {
                dst.put_u8(b'f');
                dst.put_f32(*v);
            }
            FieldValue::Double(v) => {
                dst.put_u8(b'd');
                dst.put_f64(*v);
            }
            FieldValue::Decimal(v) => {
                dst.put_u8(b'D');
                dst.put_u8(v.scale);
                dst.put_i32(v.value);
            }
            FieldValue::ShortString(v) => {
                dst.put_u8(b's');
                write_shortstr(dst, v)?;
            }
            FieldValue::LongString(v) => {
                dst.put_u8(b'S');
                write_longstr(dst, v)?;
            }
            FieldValue::Array(v) => {
                dst.put_u8(b'A');
                v.encode(dialect, dst)?;
            }
            FieldValue::Timestamp(v) => {
                dst.put_u8(b'T');
                dst.put_u64(*v);
            }
            FieldValue::Table(v) => {
                dst.put_u8(b'F');
                v.encode(dialect, dst)?;
            }
            FieldValue::Void => {
                dst.put_u8(b'V');
            }
            FieldValue::ByteArray(v) => {
                dst.put_u8(b'x');
                write_longstr(dst, v)?;
            }
        }
        Ok(())
    }

    /// Reads tag octet plus payload from `src`. Both dialects are accepted.
    pub fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        let tag = read_u8(src)?;
        let value = match tag {
            b't' => FieldValue::Boolean(read_u8(src)? != 0),
            b'b' => FieldValue::I8(read_i8(src)?),
            b'B' => FieldValue::U8(read_u8(src)?),
            b'U' => FieldValue::I16(read_i16(src)?),
            b'u' => FieldValue::U16(read_u16(src)?),
            b'I' => FieldValue::I32(read_i32(src)?),
            b'i' => FieldValue::U32(read_u32(src)?),
            b'L' => FieldValue::I64(read_i64(src)?),
            b'l' => FieldValue::U64(read_u64(src)?),
            b'f' => FieldValue::Float(read_f32(src)?),
            b'd' => FieldValue::Double(read_f64(src)?),
            b'D' => {
                let scale = read_u8(src)?;
                let value = read_i32(src)?;
                FieldValue::Decimal(Decimal { scale, value })
            }
            b's' => FieldValue::ShortString(read_shortstr(src)?),
            b'S' => FieldValue::LongString(read_longstr(src)?),
            b'A' => FieldValue::Array(FieldArray::decode(src)?),
            b'T' => FieldValue::Timestamp(read_u64(src)?),
            b'F' => FieldValue::Table(FieldTable::decode(src)?),
            b'V' => FieldValue::Void,
            b'x' => {
                let len = read_u32(src)? as usize;
                ensure(src, len)?;
                FieldValue::ByteArray(src.split_to(len))
            }
            other => return Err(DecodeError::UnknownFieldTag(other)),
        };
        Ok(value)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        Self::I32(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::I64(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::LongString(Bytes::copy_from_slice(v.as_bytes()))
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::LongString(Bytes::from(v.into_bytes()))
    }
}

impl From<FieldTable> for FieldValue {
    fn from(v: FieldTable) -> Self {
        Self::Table(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(value: FieldValue, dialect: WireDialect) -> FieldValue {
        let mut buf = BytesMut::new();
        value.encode(dialect, &mut buf).unwrap();
        let mut src = buf.freeze();
        let decoded = FieldValue::decode(&mut src).unwrap();
        assert!(src.is_empty(), "decoder must consume the whole field");
        decoded
    }

    #[test]
    fn rabbit_dialect_round_trips_all_integer_widths() {
        for value in [
            FieldValue::I8(-5),
            FieldValue::U8(200),
            FieldValue::I16(-300),
            FieldValue::U16(40_000),
            FieldValue::I32(-70_000),
            FieldValue::U32(3_000_000_000),
            FieldValue::I64(-1 << 40),
            FieldValue::U64(1 << 63),
        ] {
            assert_eq!(round_trip(value.clone(), WireDialect::Rabbit), value);
        }
    }

    #[test]
    fn strict_dialect_widens_narrow_integers() {
        assert_eq!(
            round_trip(FieldValue::U16(7), WireDialect::Strict091),
            FieldValue::I32(7)
        );
        assert_eq!(
            round_trip(FieldValue::U32(u32::MAX), WireDialect::Strict091),
            FieldValue::I64(u32::MAX as i64)
        );
    }

    #[test]
    fn strict_dialect_rejects_huge_unsigned() {
        let mut buf = BytesMut::new();
        let err = FieldValue::U64(u64::MAX)
            .encode(WireDialect::Strict091, &mut buf)
            .unwrap_err();
        assert!(matches!(err, EncodeError::IntegerOutOfRange(_)));
    }

    #[test]
    fn decimal_and_timestamp_round_trip() {
        let dec = FieldValue::Decimal(Decimal {
            scale: 2,
            value: -12345,
        });
        assert_eq!(round_trip(dec.clone(), WireDialect::Rabbit), dec);

        let ts = FieldValue::Timestamp(1_700_000_000);
        assert_eq!(round_trip(ts.clone(), WireDialect::Rabbit), ts);
    }

    #[test]
    fn unknown_tag_is_reported() {
        let mut src = Bytes::from_static(b"Zxyz");
        assert!(matches!(
            FieldValue::decode(&mut src),
            Err(DecodeError::UnknownFieldTag(b'Z'))
        ));
    }
}
