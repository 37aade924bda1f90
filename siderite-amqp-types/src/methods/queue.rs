//! Methods of the `queue` class (class id 50)

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{DecodeError, EncodeError};
use crate::primitives::{
    read_shortstr, read_u16, read_u32, read_u8, write_shortstr, FieldTable, WireDialect,
};

/// Creates or checks a queue.
/// <method name="declare" synchronous="1" index="10"/>
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Declare {
    /// Empty to let the broker generate a name
    /// <field name="queue" domain="queue-name"/>
    pub queue: String,

    /// Only check for existence rather than create
    /// <field name="passive" domain="bit"/>
    pub passive: bool,

    /// <field name="durable" domain="bit"/>
    pub durable: bool,

    /// <field name="exclusive" domain="bit"/>
    pub exclusive: bool,

    /// <field name="auto-delete" domain="bit"/>
    pub auto_delete: bool,

    /// <field name="no-wait" domain="no-wait"/>
    pub nowait: bool,

    /// <field name="arguments" domain="table"/>
    pub arguments: FieldTable,
}

impl Declare {
    pub(crate) fn encode(&self, dialect: WireDialect, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u16(0); // reserved: ticket
        write_shortstr(dst, &self.queue)?;
        let bits = self.passive as u8
            | (self.durable as u8) << 1
            | (self.exclusive as u8) << 2
            | (self.auto_delete as u8) << 3
            | (self.nowait as u8) << 4;
        dst.put_u8(bits);
        self.arguments.encode(dialect, dst)
    }

    pub(crate) fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        let _ticket = read_u16(src)?;
        let queue = read_shortstr(src)?;
        let bits = read_u8(src)?;
        Ok(Self {
            queue,
            passive: bits & 0x01 != 0,
            durable: bits & 0x02 != 0,
            exclusive: bits & 0x04 != 0,
            auto_delete: bits & 0x08 != 0,
            nowait: bits & 0x10 != 0,
            arguments: FieldTable::decode(src)?,
        })
    }
}

/// <method name="declare-ok" synchronous="1" index="11"/>
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeclareOk {
    /// The declared queue name, significant when the request left it empty
    /// <field name="queue" domain="queue-name"/>
    pub queue: String,

    /// <field name="message-count" domain="message-count"/>
    pub message_count: u32,

    /// <field name="consumer-count" domain="long"/>
    pub consumer_count: u32,
}

impl DeclareOk {
    pub(crate) fn encode(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        write_shortstr(dst, &self.queue)?;
        dst.put_u32(self.message_count);
        dst.put_u32(self.consumer_count);
        Ok(())
    }

    pub(crate) fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        Ok(Self {
            queue: read_shortstr(src)?,
            message_count: read_u32(src)?,
            consumer_count: read_u32(src)?,
        })
    }
}

/// Binds a queue to an exchange.
/// <method name="bind" synchronous="1" index="20"/>
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Bind {
    /// <field name="queue" domain="queue-name"/>
    pub queue: String,

    /// <field name="exchange" domain="exchange-name"/>
    pub exchange: String,

    /// <field name="routing-key" domain="shortstr"/>
    pub routing_key: String,

    /// <field name="no-wait" domain="no-wait"/>
    pub nowait: bool,

    /// <field name="arguments" domain="table"/>
    pub arguments: FieldTable,
}

impl Bind {
    pub(crate) fn encode(&self, dialect: WireDialect, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u16(0); // reserved: ticket
        write_shortstr(dst, &self.queue)?;
        write_shortstr(dst, &self.exchange)?;
        write_shortstr(dst, &self.routing_key)?;
        dst.put_u8(self.nowait as u8);
        self.arguments.encode(dialect, dst)
    }

    pub(crate) fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        let _ticket = read_u16(src)?;
        Ok(Self {
            queue: read_shortstr(src)?,
            exchange: read_shortstr(src)?,
            routing_key: read_shortstr(src)?,
            nowait: read_u8(src)? & 0x01 != 0,
            arguments: FieldTable::decode(src)?,
        })
    }
}

/// <method name="bind-ok" synchronous="1" index="21"/>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BindOk {}

/// Removes all messages from a queue.
/// <method name="purge" synchronous="1" index="30"/>
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Purge {
    /// <field name="queue" domain="queue-name"/>
    pub queue: String,

    /// <field name="no-wait" domain="no-wait"/>
    pub nowait: bool,
}

impl Purge {
    pub(crate) fn encode(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u16(0); // reserved: ticket
        write_shortstr(dst, &self.queue)?;
        dst.put_u8(self.nowait as u8);
        Ok(())
    }

    pub(crate) fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        let _ticket = read_u16(src)?;
        Ok(Self {
            queue: read_shortstr(src)?,
            nowait: read_u8(src)? & 0x01 != 0,
        })
    }
}

/// <method name="purge-ok" synchronous="1" index="31"/>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PurgeOk {
    /// <field name="message-count" domain="message-count"/>
    pub message_count: u32,
}

impl PurgeOk {
    pub(crate) fn encode(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u32(self.message_count);
        Ok(())
    }

    pub(crate) fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        Ok(Self {
            message_count: read_u32(src)?,
        })
    }
}

/// Deletes a queue.
/// <method name="delete" synchronous="1" index="40"/>
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Delete {
    /// <field name="queue" domain="queue-name"/>
    pub queue: String,

    /// <field name="if-unused" domain="bit"/>
    pub if_unused: bool,

    /// <field name="if-empty" domain="bit"/>
    pub if_empty: bool,

    /// <field name="no-wait" domain="no-wait"/>
    pub nowait: bool,
}

impl Delete {
    pub(crate) fn encode(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u16(0); // reserved: ticket
        write_shortstr(dst, &self.queue)?;
        let bits =
            self.if_unused as u8 | (self.if_empty as u8) << 1 | (self.nowait as u8) << 2;
        dst.put_u8(bits);
        Ok(())
    }

    pub(crate) fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        let _ticket = read_u16(src)?;
        let queue = read_shortstr(src)?;
        let bits = read_u8(src)?;
        Ok(Self {
            queue,
            if_unused: bits & 0x01 != 0,
            if_empty: bits & 0x02 != 0,
            nowait: bits & 0x04 != 0,
        })
    }
}

/// <method name="delete-ok" synchronous="1" index="41"/>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeleteOk {
    /// <field name="message-count" domain="message-count"/>
    pub message_count: u32,
}

impl DeleteOk {
    pub(crate) fn encode(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u32(self.message_count);
        Ok(())
    }

    pub(crate) fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        Ok(Self {
            message_count: read_u32(src)?,
        })
    }
}

/// Unbinds a queue from an exchange. Unlike `bind` there is no `no-wait`.
/// <method name="unbind" synchronous="1" index="50"/>
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Unbind {
    /// <field name="queue" domain="queue-name"/>
    pub queue: String,

    /// <field name="exchange" domain="exchange-name"/>
    pub exchange: String,

    /// <field name="routing-key" domain="shortstr"/>
    pub routing_key: String,

    /// <field name="arguments" domain="table"/>
    pub arguments: FieldTable,
}

impl Unbind {
    pub(crate) fn encode(&self, dialect: WireDialect, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u16(0); // reserved: ticket
        write_shortstr(dst, &self.queue)?;
        write_shortstr(dst, &self.exchange)?;
        write_shortstr(dst, &self.routing_key)?;
        self.arguments.encode(dialect, dst)
    }

    pub(crate) fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        let _ticket = read_u16(src)?;
        Ok(Self {
            queue: read_shortstr(src)?,
            exchange: read_shortstr(src)?,
            routing_key: read_shortstr(src)?,
            arguments: FieldTable::decode(src)?,
        })
    }
}

/// <method name="unbind-ok" synchronous="1" index="51"/>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnbindOk {}
