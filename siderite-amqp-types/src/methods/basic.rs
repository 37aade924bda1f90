//! Methods of the `basic` class (class id 60)

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{DecodeError, EncodeError};
use crate::primitives::{
    read_shortstr, read_u16, read_u32, read_u64, read_u8, write_shortstr, FieldTable, WireDialect,
};

/// Sets prefetch limits for the channel (or connection with `global`).
/// <method name="qos" synchronous="1" index="10"/>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Qos {
    /// Window size in octets, zero meaning unlimited
    /// <field name="prefetch-size" domain="long"/>
    pub prefetch_size: u32,

    /// Window size in whole messages
    /// <field name="prefetch-count" domain="short"/>
    pub prefetch_count: u16,

    /// <field name="global" domain="bit"/>
    pub global: bool,
}

impl Qos {
    pub(crate) fn encode(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u32(self.prefetch_size);
        dst.put_u16(self.prefetch_count);
        dst.put_u8(self.global as u8);
        Ok(())
    }

    pub(crate) fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        Ok(Self {
            prefetch_size: read_u32(src)?,
            prefetch_count: read_u16(src)?,
            global: read_u8(src)? & 0x01 != 0,
        })
    }
}

/// <method name="qos-ok" synchronous="1" index="11"/>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QosOk {}

/// Starts a consumer on a queue.
/// <method name="consume" synchronous="1" index="20"/>
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Consume {
    /// <field name="queue" domain="queue-name"/>
    pub queue: String,

    /// Empty to let the broker generate a tag
    /// <field name="consumer-tag" domain="consumer-tag"/>
    pub consumer_tag: String,

    /// <field name="no-local" domain="no-local"/>
    pub no_local: bool,

    /// <field name="no-ack" domain="no-ack"/>
    pub no_ack: bool,

    /// <field name="exclusive" domain="bit"/>
    pub exclusive: bool,

    /// <field name="no-wait" domain="no-wait"/>
    pub nowait: bool,

    /// <field name="arguments" domain="table"/>
    pub arguments: FieldTable,
}

impl Consume {
    pub(crate) fn encode(&self, dialect: WireDialect, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u16(0); // reserved: ticket
        write_shortstr(dst, &self.queue)?;
        write_shortstr(dst, &self.consumer_tag)?;
        let bits = self.no_local as u8
            | (self.no_ack as u8) << 1
            | (self.exclusive as u8) << 2
            | (self.nowait as u8) << 3;
        dst.put_u8(bits);
        self.arguments.encode(dialect, dst)
    }

    pub(crate) fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        let _ticket = read_u16(src)?;
        let queue = read_shortstr(src)?;
        let consumer_tag = read_shortstr(src)?;
        let bits = read_u8(src)?;
        Ok(Self {
            queue,
            consumer_tag,
            no_local: bits & 0x01 != 0,
            no_ack: bits & 0x02 != 0,
            exclusive: bits & 0x04 != 0,
            nowait: bits & 0x08 != 0,
            arguments: FieldTable::decode(src)?,
        })
    }
}

/// <method name="consume-ok" synchronous="1" index="21"/>
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConsumeOk {
    /// <field name="consumer-tag" domain="consumer-tag"/>
    pub consumer_tag: String,
}

impl ConsumeOk {
    pub(crate) fn encode(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        write_shortstr(dst, &self.consumer_tag)
    }

    pub(crate) fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        Ok(Self {
            consumer_tag: read_shortstr(src)?,
        })
    }
}

/// Ends a consumer. Also sent by RabbitMQ brokers when a consumer is
/// cancelled server-side and `consumer_cancel_notify` was advertised.
/// <method name="cancel" synchronous="1" index="30"/>
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cancel {
    /// <field name="consumer-tag" domain="consumer-tag"/>
    pub consumer_tag: String,

    /// <field name="no-wait" domain="no-wait"/>
    pub nowait: bool,
}

impl Cancel {
    pub(crate) fn encode(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        write_shortstr(dst, &self.consumer_tag)?;
        dst.put_u8(self.nowait as u8);
        Ok(())
    }

    pub(crate) fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        Ok(Self {
            consumer_tag: read_shortstr(src)?,
            nowait: read_u8(src)? & 0x01 != 0,
        })
    }
}

/// <method name="cancel-ok" synchronous="1" index="31"/>
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CancelOk {
    /// <field name="consumer-tag" domain="consumer-tag"/>
    pub consumer_tag: String,
}

impl CancelOk {
    pub(crate) fn encode(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        write_shortstr(dst, &self.consumer_tag)
    }

    pub(crate) fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        Ok(Self {
            consumer_tag: read_shortstr(src)?,
        })
    }
}

/// Publishes a message. Carries content.
/// <method name="publish" content="1" index="40"/>
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Publish {
    /// Empty means the default exchange
    /// <field name="exchange" domain="exchange-name"/>
    pub exchange: String,

    /// <field name="routing-key" domain="shortstr"/>
    pub routing_key: String,

    /// Return the message if it cannot be routed
    /// <field name="mandatory" domain="bit"/>
    pub mandatory: bool,

    /// Return the message if it cannot be delivered immediately
    /// <field name="immediate" domain="bit"/>
    pub immediate: bool,
}

impl Publish {
    pub(crate) fn encode(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u16(0); // reserved: ticket
        write_shortstr(dst, &self.exchange)?;
        write_shortstr(dst, &self.routing_key)?;
        dst.put_u8(self.mandatory as u8 | (self.immediate as u8) << 1);
        Ok(())
    }

    pub(crate) fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        let _ticket = read_u16(src)?;
        let exchange = read_shortstr(src)?;
        let routing_key = read_shortstr(src)?;
        let bits = read_u8(src)?;
        Ok(Self {
            exchange,
            routing_key,
            mandatory: bits & 0x01 != 0,
            immediate: bits & 0x02 != 0,
        })
    }
}

/// An undeliverable mandatory or immediate message. Carries content.
/// <method name="return" content="1" index="50"/>
#[derive(Debug, Clone, PartialEq)]
pub struct Return {
    /// <field name="reply-code" domain="reply-code"/>
    pub reply_code: u16,

    /// <field name="reply-text" domain="reply-text"/>
    pub reply_text: String,

    /// <field name="exchange" domain="exchange-name"/>
    pub exchange: String,

    /// <field name="routing-key" domain="shortstr"/>
    pub routing_key: String,
}

impl Return {
    pub(crate) fn encode(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u16(self.reply_code);
        write_shortstr(dst, &self.reply_text)?;
        write_shortstr(dst, &self.exchange)?;
        write_shortstr(dst, &self.routing_key)
    }

    pub(crate) fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        Ok(Self {
            reply_code: read_u16(src)?,
            reply_text: read_shortstr(src)?,
            exchange: read_shortstr(src)?,
            routing_key: read_shortstr(src)?,
        })
    }
}

/// A message pushed to a consumer. Carries content.
/// <method name="deliver" content="1" index="60"/>
#[derive(Debug, Clone, PartialEq)]
pub struct Deliver {
    /// <field name="consumer-tag" domain="consumer-tag"/>
    pub consumer_tag: String,

    /// <field name="delivery-tag" domain="delivery-tag"/>
    pub delivery_tag: u64,

    /// <field name="redelivered" domain="redelivered"/>
    pub redelivered: bool,

    /// <field name="exchange" domain="exchange-name"/>
    pub exchange: String,

    /// <field name="routing-key" domain="shortstr"/>
    pub routing_key: String,
}

impl Deliver {
    pub(crate) fn encode(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        write_shortstr(dst, &self.consumer_tag)?;
        dst.put_u64(self.delivery_tag);
        dst.put_u8(self.redelivered as u8);
        write_shortstr(dst, &self.exchange)?;
        write_shortstr(dst, &self.routing_key)
    }

    pub(crate) fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        Ok(Self {
            consumer_tag: read_shortstr(src)?,
            delivery_tag: read_u64(src)?,
            redelivered: read_u8(src)? & 0x01 != 0,
            exchange: read_shortstr(src)?,
            routing_key: read_shortstr(src)?,
        })
    }
}

/// Synchronously fetches one message.
/// <method name="get" synchronous="1" index="70"/>
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Get {
    /// <field name="queue" domain="queue-name"/>
    pub queue: String,

    /// <field name="no-ack" domain="no-ack"/>
    pub no_ack: bool,
}

impl Get {
    pub(crate) fn encode(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u16(0); // reserved: ticket
        write_shortstr(dst, &self.queue)?;
        dst.put_u8(self.no_ack as u8);
        Ok(())
    }

    pub(crate) fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        let _ticket = read_u16(src)?;
        Ok(Self {
            queue: read_shortstr(src)?,
            no_ack: read_u8(src)? & 0x01 != 0,
        })
    }
}

/// A fetched message. Carries content.
/// <method name="get-ok" synchronous="1" content="1" index="71"/>
#[derive(Debug, Clone, PartialEq)]
pub struct GetOk {
    /// <field name="delivery-tag" domain="delivery-tag"/>
    pub delivery_tag: u64,

    /// <field name="redelivered" domain="redelivered"/>
    pub redelivered: bool,

    /// <field name="exchange" domain="exchange-name"/>
    pub exchange: String,

    /// <field name="routing-key" domain="shortstr"/>
    pub routing_key: String,

    /// Messages remaining in the queue
    /// <field name="message-count" domain="message-count"/>
    pub message_count: u32,
}

impl GetOk {
    pub(crate) fn encode(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u64(self.delivery_tag);
        dst.put_u8(self.redelivered as u8);
        write_shortstr(dst, &self.exchange)?;
        write_shortstr(dst, &self.routing_key)?;
        dst.put_u32(self.message_count);
        Ok(())
    }

    pub(crate) fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        Ok(Self {
            delivery_tag: read_u64(src)?,
            redelivered: read_u8(src)? & 0x01 != 0,
            exchange: read_shortstr(src)?,
            routing_key: read_shortstr(src)?,
            message_count: read_u32(src)?,
        })
    }
}

/// The queue had no messages to fetch.
/// <method name="get-empty" synchronous="1" index="72"/>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GetEmpty {}

impl GetEmpty {
    pub(crate) fn encode(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        // reserved: cluster-id shortstr
        dst.put_u8(0);
        Ok(())
    }

    pub(crate) fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        let _cluster_id = read_shortstr(src)?;
        Ok(Self {})
    }
}

/// Acknowledges one or more deliveries. Also sent by the broker in
/// confirm mode to confirm publishes.
/// <method name="ack" index="80"/>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Ack {
    /// <field name="delivery-tag" domain="delivery-tag"/>
    pub delivery_tag: u64,

    /// Acknowledge all unacknowledged tags up to and including this one
    /// <field name="multiple" domain="bit"/>
    pub multiple: bool,
}

impl Ack {
    pub(crate) fn encode(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u64(self.delivery_tag);
        dst.put_u8(self.multiple as u8);
        Ok(())
    }

    pub(crate) fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        Ok(Self {
            delivery_tag: read_u64(src)?,
            multiple: read_u8(src)? & 0x01 != 0,
        })
    }
}

/// Rejects a single delivery.
/// <method name="reject" index="90"/>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Reject {
    /// <field name="delivery-tag" domain="delivery-tag"/>
    pub delivery_tag: u64,

    /// <field name="requeue" domain="bit"/>
    pub requeue: bool,
}

impl Reject {
    pub(crate) fn encode(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u64(self.delivery_tag);
        dst.put_u8(self.requeue as u8);
        Ok(())
    }

    pub(crate) fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        Ok(Self {
            delivery_tag: read_u64(src)?,
            requeue: read_u8(src)? & 0x01 != 0,
        })
    }
}

/// Deprecated form of `recover` that expects no reply.
/// <method name="recover-async" index="100"/>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecoverAsync {
    /// <field name="requeue" domain="bit"/>
    pub requeue: bool,
}

impl RecoverAsync {
    pub(crate) fn encode(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u8(self.requeue as u8);
        Ok(())
    }

    pub(crate) fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        Ok(Self {
            requeue: read_u8(src)? & 0x01 != 0,
        })
    }
}

/// Redelivers all unacknowledged messages on the channel.
/// <method name="recover" synchronous="1" index="110"/>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Recover {
    /// Requeue rather than redeliver to the original recipient
    /// <field name="requeue" domain="bit"/>
    pub requeue: bool,
}

impl Recover {
    pub(crate) fn encode(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u8(self.requeue as u8);
        Ok(())
    }

    pub(crate) fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        Ok(Self {
            requeue: read_u8(src)? & 0x01 != 0,
        })
    }
}

/// <method name="recover-ok" synchronous="1" index="111"/>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecoverOk {}

/// Negatively acknowledges one or more deliveries (RabbitMQ extension).
/// <method name="nack" index="120"/>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Nack {
    /// <field name="delivery-tag" domain="delivery-tag"/>
    pub delivery_tag: u64,

    /// <field name="multiple" domain="bit"/>
    pub multiple: bool,

    /// <field name="requeue" domain="bit"/>
    pub requeue: bool,
}

impl Nack {
    pub(crate) fn encode(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u64(self.delivery_tag);
        dst.put_u8(self.multiple as u8 | (self.requeue as u8) << 1);
        Ok(())
    }

    pub(crate) fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        let delivery_tag = read_u64(src)?;
        let bits = read_u8(src)?;
        Ok(Self {
            delivery_tag,
            multiple: bits & 0x01 != 0,
            requeue: bits & 0x02 != 0,
        })
    }
}
