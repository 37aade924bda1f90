//! The content header and its property list
//!
//! Every content-carrying method is followed by exactly one header frame:
//! `class-id:2 | weight:2 (=0) | body-size:8 | property-flags | property-list`.
//! The property flags are 16-bit words; bit 0 of each word except the last
//! signals a continuation word, and bits 15..2 of the first word mark the
//! presence of the fourteen `basic` properties in fixed order.

use bytes::{BufMut, Bytes, BytesMut};

use crate::definitions::CLASS_BASIC;
use crate::error::{DecodeError, EncodeError};
use crate::primitives::{
    read_shortstr, read_u16, read_u64, read_u8, write_shortstr, FieldTable, Timestamp, WireDialect,
};

const FLAG_CONTENT_TYPE: u16 = 1 << 15;
const FLAG_CONTENT_ENCODING: u16 = 1 << 14;
const FLAG_HEADERS: u16 = 1 << 13;
const FLAG_DELIVERY_MODE: u16 = 1 << 12;
const FLAG_PRIORITY: u16 = 1 << 11;
const FLAG_CORRELATION_ID: u16 = 1 << 10;
const FLAG_REPLY_TO: u16 = 1 << 9;
const FLAG_EXPIRATION: u16 = 1 << 8;
const FLAG_MESSAGE_ID: u16 = 1 << 7;
const FLAG_TIMESTAMP: u16 = 1 << 6;
const FLAG_MESSAGE_TYPE: u16 = 1 << 5;
const FLAG_USER_ID: u16 = 1 << 4;
const FLAG_APP_ID: u16 = 1 << 3;
const FLAG_CLUSTER_ID: u16 = 1 << 2;

const FLAG_CONTINUATION: u16 = 1;

/// The fourteen optional properties of a `basic` message
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BasicProperties {
    /// MIME content type
    pub content_type: Option<String>,

    /// MIME content encoding
    pub content_encoding: Option<String>,

    /// Application headers
    pub headers: Option<FieldTable>,

    /// 1 = transient, 2 = persistent
    pub delivery_mode: Option<u8>,

    /// 0..9
    pub priority: Option<u8>,

    /// Correlates a reply with its request
    pub correlation_id: Option<String>,

    /// Queue name to reply to
    pub reply_to: Option<String>,

    /// Per-message TTL in milliseconds, as a string
    pub expiration: Option<String>,

    /// Application message id
    pub message_id: Option<String>,

    /// Message timestamp in POSIX seconds
    pub timestamp: Option<Timestamp>,

    /// Application message type name
    pub message_type: Option<String>,

    /// Authenticated user id, validated by RabbitMQ
    pub user_id: Option<String>,

    /// Application id
    pub app_id: Option<String>,

    /// Reserved, unused by RabbitMQ
    pub cluster_id: Option<String>,
}

impl BasicProperties {
    fn flags(&self) -> u16 {
        let mut flags = 0;
        let mut set = |present: bool, flag: u16| {
            if present {
                flags |= flag;
            }
        };
        set(self.content_type.is_some(), FLAG_CONTENT_TYPE);
        set(self.content_encoding.is_some(), FLAG_CONTENT_ENCODING);
        set(self.headers.is_some(), FLAG_HEADERS);
        set(self.delivery_mode.is_some(), FLAG_DELIVERY_MODE);
        set(self.priority.is_some(), FLAG_PRIORITY);
        set(self.correlation_id.is_some(), FLAG_CORRELATION_ID);
        set(self.reply_to.is_some(), FLAG_REPLY_TO);
        set(self.expiration.is_some(), FLAG_EXPIRATION);
        set(self.message_id.is_some(), FLAG_MESSAGE_ID);
        set(self.timestamp.is_some(), FLAG_TIMESTAMP);
        set(self.message_type.is_some(), FLAG_MESSAGE_TYPE);
        set(self.user_id.is_some(), FLAG_USER_ID);
        set(self.app_id.is_some(), FLAG_APP_ID);
        set(self.cluster_id.is_some(), FLAG_CLUSTER_ID);
        flags
    }

    /// Appends the property flags and the property list to `dst`
    pub fn encode(&self, dialect: WireDialect, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u16(self.flags());

        let put_str = |dst: &mut BytesMut, s: &Option<String>| match s {
            Some(s) => write_shortstr(dst, s),
            None => Ok(()),
        };
        put_str(dst, &self.content_type)?;
        put_str(dst, &self.content_encoding)?;
        if let Some(headers) = &self.headers {
            headers.encode(dialect, dst)?;
        }
        if let Some(mode) = self.delivery_mode {
            dst.put_u8(mode);
        }
        if let Some(priority) = self.priority {
            dst.put_u8(priority);
        }
        put_str(dst, &self.correlation_id)?;
        put_str(dst, &self.reply_to)?;
        put_str(dst, &self.expiration)?;
        put_str(dst, &self.message_id)?;
        if let Some(timestamp) = self.timestamp {
            dst.put_u64(timestamp);
        }
        put_str(dst, &self.message_type)?;
        put_str(dst, &self.user_id)?;
        put_str(dst, &self.app_id)?;
        put_str(dst, &self.cluster_id)?;
        Ok(())
    }

    /// Reads the property flags and the marked properties from `src`
    pub fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        let flags = read_u16(src)?;
        // The basic class defines fourteen properties, all in the first
        // word; trailing continuation words are consumed and ignored.
        let mut word = flags;
        while word & FLAG_CONTINUATION != 0 {
            word = read_u16(src)?;
        }

        let get_str = |src: &mut Bytes, flag: u16| -> Result<Option<String>, DecodeError> {
            if flags & flag != 0 {
                Ok(Some(read_shortstr(src)?))
            } else {
                Ok(None)
            }
        };

        let content_type = get_str(src, FLAG_CONTENT_TYPE)?;
        let content_encoding = get_str(src, FLAG_CONTENT_ENCODING)?;
        let headers = if flags & FLAG_HEADERS != 0 {
            Some(FieldTable::decode(src)?)
        } else {
            None
        };
        let delivery_mode = if flags & FLAG_DELIVERY_MODE != 0 {
            Some(read_u8(src)?)
        } else {
            None
        };
        let priority = if flags & FLAG_PRIORITY != 0 {
            Some(read_u8(src)?)
        } else {
            None
        };
        let correlation_id = get_str(src, FLAG_CORRELATION_ID)?;
        let reply_to = get_str(src, FLAG_REPLY_TO)?;
        let expiration = get_str(src, FLAG_EXPIRATION)?;
        let message_id = get_str(src, FLAG_MESSAGE_ID)?;
        let timestamp = if flags & FLAG_TIMESTAMP != 0 {
            Some(read_u64(src)?)
        } else {
            None
        };
        let message_type = get_str(src, FLAG_MESSAGE_TYPE)?;
        let user_id = get_str(src, FLAG_USER_ID)?;
        let app_id = get_str(src, FLAG_APP_ID)?;
        let cluster_id = get_str(src, FLAG_CLUSTER_ID)?;

        Ok(Self {
            content_type,
            content_encoding,
            headers,
            delivery_mode,
            priority,
            correlation_id,
            reply_to,
            expiration,
            message_id,
            timestamp,
            message_type,
            user_id,
            app_id,
            cluster_id,
        })
    }
}

/// The payload of a content header frame
#[derive(Debug, Clone, PartialEq)]
pub struct ContentHeader {
    /// Class of the preceding content method, `basic` in practice
    pub class_id: u16,

    /// Total length of the following body frames in octets
    pub body_size: u64,

    /// The message properties
    pub properties: BasicProperties,
}

impl ContentHeader {
    /// Creates a header for a `basic` message
    pub fn basic(body_size: u64, properties: BasicProperties) -> Self {
        Self {
            class_id: CLASS_BASIC,
            body_size,
            properties,
        }
    }

    /// Appends the full header payload to `dst`
    pub fn encode(&self, dialect: WireDialect, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u16(self.class_id);
        dst.put_u16(0); // weight
        dst.put_u64(self.body_size);
        self.properties.encode(dialect, dst)
    }

    /// Reads the full header payload from `src`
    pub fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        let class_id = read_u16(src)?;
        let _weight = read_u16(src)?;
        let body_size = read_u64(src)?;
        let properties = BasicProperties::decode(src)?;
        Ok(Self {
            class_id,
            body_size,
            properties,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_properties_are_a_single_zero_flag_word() {
        let mut buf = BytesMut::new();
        BasicProperties::default()
            .encode(WireDialect::Rabbit, &mut buf)
            .unwrap();
        assert_eq!(&buf[..], &[0x00, 0x00]);
    }

    #[test]
    fn full_property_set_round_trips() {
        let props = BasicProperties {
            content_type: Some("application/json".into()),
            content_encoding: Some("gzip".into()),
            headers: Some([("retry", 3i32)].into_iter().collect()),
            delivery_mode: Some(2),
            priority: Some(5),
            correlation_id: Some("corr-9".into()),
            reply_to: Some("amq.rabbitmq.reply-to".into()),
            expiration: Some("60000".into()),
            message_id: Some("m-1".into()),
            timestamp: Some(1_700_000_000),
            message_type: Some("order.created".into()),
            user_id: Some("guest".into()),
            app_id: Some("billing".into()),
            cluster_id: None,
        };

        let header = ContentHeader::basic(4096, props);
        let mut buf = BytesMut::new();
        header.encode(WireDialect::Rabbit, &mut buf).unwrap();

        let mut src = buf.freeze();
        let decoded = ContentHeader::decode(&mut src).unwrap();
        assert!(src.is_empty());
        assert_eq!(decoded, header);
    }

    #[test]
    fn sparse_properties_round_trip() {
        let props = BasicProperties {
            delivery_mode: Some(1),
            message_id: Some("only-these-two".into()),
            ..Default::default()
        };
        let mut buf = BytesMut::new();
        props.encode(WireDialect::Rabbit, &mut buf).unwrap();

        let decoded = BasicProperties::decode(&mut buf.freeze()).unwrap();
        assert_eq!(decoded, props);
    }

    #[test]
    fn continuation_flag_words_are_skipped() {
        let mut buf = BytesMut::new();
        // first word: delivery-mode present plus continuation bit,
        // second word: empty and final
        buf.put_u16(FLAG_DELIVERY_MODE | FLAG_CONTINUATION);
        buf.put_u16(0);
        buf.put_u8(2);

        let decoded = BasicProperties::decode(&mut buf.freeze()).unwrap();
        assert_eq!(decoded.delivery_mode, Some(2));
    }
}
