//! Field tables and field arrays

use bytes::{BufMut, Bytes, BytesMut};
use indexmap::IndexMap;

use crate::error::{DecodeError, EncodeError};

use super::{ensure, read_shortstr, read_u32, write_shortstr, FieldValue, WireDialect};

/// An ordered mapping from short-string keys to tagged values.
///
/// Insertion order is preserved on the wire. Duplicate keys are accepted on
/// read (last wins) but never emitted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldTable(IndexMap<String, FieldValue>);

impl FieldTable {
    /// Creates an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, replacing any previous value for the key
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Looks up a value by key
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.get(key)
    }

    /// Whether the table holds no entries
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Appends the 4-octet byte length plus the table body to `dst`
    pub fn encode(&self, dialect: WireDialect, dst: &mut BytesMut) -> Result<(), EncodeError> {
        let body = self.encode_body(dialect)?;
        if body.len() > u32::MAX as usize {
            return Err(EncodeError::TableTooLong);
        }
        dst.put_u32(body.len() as u32);
        dst.put_slice(&body);
        Ok(())
    }

    /// Encodes the table body without the length prefix.
    ///
    /// The AMQPLAIN SASL response is a bare table body, which is the only
    /// place this appears on the wire without its length.
    pub fn encode_body(&self, dialect: WireDialect) -> Result<BytesMut, EncodeError> {
        let mut body = BytesMut::new();
        for (key, value) in &self.0 {
            write_shortstr(&mut body, key)?;
            value.encode(dialect, &mut body)?;
        }
        Ok(body)
    }

    /// Reads the 4-octet byte length plus that many octets of entries
    pub fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        let len = read_u32(src)? as usize;
        ensure(src, len)?;
        let mut body = src.split_to(len);

        let mut table = IndexMap::new();
        while !body.is_empty() {
            let key = read_shortstr(&mut body)?;
            let value = FieldValue::decode(&mut body)?;
            table.insert(key, value);
        }
        Ok(Self(table))
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for FieldTable {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// An ordered sequence of tagged values
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldArray(Vec<FieldValue>);

impl FieldArray {
    /// Creates an empty array
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value
    pub fn push(&mut self, value: impl Into<FieldValue>) {
        self.0.push(value.into());
    }

    /// The contained values
    pub fn values(&self) -> &[FieldValue] {
        &self.0
    }

    /// Appends the 4-octet byte length plus the tagged fields to `dst`
    pub fn encode(&self, dialect: WireDialect, dst: &mut BytesMut) -> Result<(), EncodeError> {
        let mut body = BytesMut::new();
        for value in &self.0 {
            value.encode(dialect, &mut body)?;
        }
        if body.len() > u32::MAX as usize {
            return Err(EncodeError::ArrayTooLong);
        }
        dst.put_u32(body.len() as u32);
        dst.put_slice(&body);
        Ok(())
    }

    /// Reads the 4-octet byte length plus that many octets of tagged fields
    pub fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        let len = read_u32(src)? as usize;
        ensure(src, len)?;
        let mut body = src.split_to(len);

        let mut values = Vec::new();
        while !body.is_empty() {
            values.push(FieldValue::decode(&mut body)?);
        }
        Ok(Self(values))
    }
}

impl<V: Into<FieldValue>> FromIterator<V> for FieldArray {
    fn from_iter<T: IntoIterator<Item = V>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> FieldTable {
        let mut table = FieldTable::new();
        table.insert("product", "siderite-amqp");
        table.insert("flag", true);
        table.insert("count", 42i32);
        let mut nested = FieldTable::new();
        nested.insert("inner", FieldValue::Void);
        table.insert("nested", nested);
        table.insert(
            "list",
            FieldValue::Array([1i32, 2, 3].into_iter().collect()),
        );
        table
    }

    #[test]
    fn table_round_trip_preserves_order() {
        let table = sample_table();
        let mut buf = BytesMut::new();
        table.encode(WireDialect::Rabbit, &mut buf).unwrap();

        let mut src = buf.freeze();
        let decoded = FieldTable::decode(&mut src).unwrap();
        assert!(src.is_empty());
        assert_eq!(decoded, table);

        let keys: Vec<_> = decoded.iter().map(|(k, _)| k.to_owned()).collect();
        assert_eq!(keys, ["product", "flag", "count", "nested", "list"]);
    }

    #[test]
    fn encode_of_decode_is_identity_on_wire_bytes() {
        let table = sample_table();
        let mut buf = BytesMut::new();
        table.encode(WireDialect::Rabbit, &mut buf).unwrap();
        let wire = buf.freeze();

        let decoded = FieldTable::decode(&mut wire.clone()).unwrap();
        let mut again = BytesMut::new();
        decoded.encode(WireDialect::Rabbit, &mut again).unwrap();
        assert_eq!(again.freeze(), wire);
    }

    #[test]
    fn duplicate_keys_last_wins() {
        // key "k" bound twice: once to I32(1), once to I32(2)
        let mut buf = BytesMut::new();
        write_shortstr(&mut buf, "k").unwrap();
        FieldValue::I32(1)
            .encode(WireDialect::Rabbit, &mut buf)
            .unwrap();
        write_shortstr(&mut buf, "k").unwrap();
        FieldValue::I32(2)
            .encode(WireDialect::Rabbit, &mut buf)
            .unwrap();

        let mut wire = BytesMut::new();
        wire.put_u32(buf.len() as u32);
        wire.put_slice(&buf);

        let table = FieldTable::decode(&mut wire.freeze()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("k"), Some(&FieldValue::I32(2)));
    }

    #[test]
    fn truncated_table_body_fails_with_eof() {
        let mut wire = BytesMut::new();
        wire.put_u32(64);
        wire.put_slice(b"\x01k");
        assert!(matches!(
            FieldTable::decode(&mut wire.freeze()),
            Err(DecodeError::UnexpectedEof)
        ));
    }
}
