//! Methods of the `exchange` class (class id 40)

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{DecodeError, EncodeError};
use crate::primitives::{read_shortstr, read_u16, read_u8, write_shortstr, FieldTable, WireDialect};

/// Creates an exchange if it does not already exist.
/// <method name="declare" synchronous="1" index="10"/>
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Declare {
    /// <field name="exchange" domain="exchange-name"/>
    pub exchange: String,

    /// Exchange type, e.g. `direct`, `fanout`, `topic`, `headers`
    /// <field name="type" domain="shortstr"/>
    pub kind: String,

    /// Only check for existence rather than create
    /// <field name="passive" domain="bit"/>
    pub passive: bool,

    /// <field name="durable" domain="bit"/>
    pub durable: bool,

    /// Delete when the last binding is removed (RabbitMQ extension)
    /// <field name="auto-delete" domain="bit"/>
    pub auto_delete: bool,

    /// Not directly publishable; only bindable from other exchanges
    /// <field name="internal" domain="bit"/>
    pub internal: bool,

    /// <field name="no-wait" domain="no-wait"/>
    pub nowait: bool,

    /// <field name="arguments" domain="table"/>
    pub arguments: FieldTable,
}

impl Declare {
    pub(crate) fn encode(&self, dialect: WireDialect, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u16(0); // reserved: ticket
        write_shortstr(dst, &self.exchange)?;
        write_shortstr(dst, &self.kind)?;
        let bits = self.passive as u8
            | (self.durable as u8) << 1
            | (self.auto_delete as u8) << 2
            | (self.internal as u8) << 3
            | (self.nowait as u8) << 4;
        dst.put_u8(bits);
        self.arguments.encode(dialect, dst)
    }

    pub(crate) fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        let _ticket = read_u16(src)?;
        let exchange = read_shortstr(src)?;
        let kind = read_shortstr(src)?;
        let bits = read_u8(src)?;
        Ok(Self {
            exchange,
            kind,
            passive: bits & 0x01 != 0,
            durable: bits & 0x02 != 0,
            auto_delete: bits & 0x04 != 0,
            internal: bits & 0x08 != 0,
            nowait: bits & 0x10 != 0,
            arguments: FieldTable::decode(src)?,
        })
    }
}

/// <method name="declare-ok" synchronous="1" index="11"/>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeclareOk {}

/// Deletes an exchange.
/// <method name="delete" synchronous="1" index="20"/>
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Delete {
    /// <field name="exchange" domain="exchange-name"/>
    pub exchange: String,

    /// <field name="if-unused" domain="bit"/>
    pub if_unused: bool,

    /// <field name="no-wait" domain="no-wait"/>
    pub nowait: bool,
}

impl Delete {
    pub(crate) fn encode(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u16(0); // reserved: ticket
        write_shortstr(dst, &self.exchange)?;
        dst.put_u8(self.if_unused as u8 | (self.nowait as u8) << 1);
        Ok(())
    }

    pub(crate) fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        let _ticket = read_u16(src)?;
        let exchange = read_shortstr(src)?;
        let bits = read_u8(src)?;
        Ok(Self {
            exchange,
            if_unused: bits & 0x01 != 0,
            nowait: bits & 0x02 != 0,
        })
    }
}

/// <method name="delete-ok" synchronous="1" index="21"/>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeleteOk {}

/// Binds an exchange to another exchange (RabbitMQ extension).
/// <method name="bind" synchronous="1" index="30"/>
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Bind {
    /// <field name="destination" domain="exchange-name"/>
    pub destination: String,

    /// <field name="source" domain="exchange-name"/>
    pub source: String,

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
        write_shortstr(dst, &self.destination)?;
        write_shortstr(dst, &self.source)?;
        write_shortstr(dst, &self.routing_key)?;
        dst.put_u8(self.nowait as u8);
        self.arguments.encode(dialect, dst)
    }

    pub(crate) fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        let _ticket = read_u16(src)?;
        Ok(Self {
            destination: read_shortstr(src)?,
            source: read_shortstr(src)?,
            routing_key: read_shortstr(src)?,
            nowait: read_u8(src)? & 0x01 != 0,
            arguments: FieldTable::decode(src)?,
        })
    }
}

/// <method name="bind-ok" synchronous="1" index="31"/>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BindOk {}

/// Unbinds an exchange from an exchange (RabbitMQ extension).
/// <method name="unbind" synchronous="1" index="40"/>
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Unbind {
    /// <field name="destination" domain="exchange-name"/>
    pub destination: String,

    /// <field name="source" domain="exchange-name"/>
    pub source: String,

    /// <field name="routing-key" domain="shortstr"/>
    pub routing_key: String,

    /// <field name="no-wait" domain="no-wait"/>
    pub nowait: bool,

    /// <field name="arguments" domain="table"/>
    pub arguments: FieldTable,
}

impl Unbind {
    pub(crate) fn encode(&self, dialect: WireDialect, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u16(0); // reserved: ticket
        write_shortstr(dst, &self.destination)?;
        write_shortstr(dst, &self.source)?;
        write_shortstr(dst, &self.routing_key)?;
        dst.put_u8(self.nowait as u8);
        self.arguments.encode(dialect, dst)
    }

    pub(crate) fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        let _ticket = read_u16(src)?;
        Ok(Self {
            destination: read_shortstr(src)?,
            source: read_shortstr(src)?,
            routing_key: read_shortstr(src)?,
            nowait: read_u8(src)? & 0x01 != 0,
            arguments: FieldTable::decode(src)?,
        })
    }
}

/// <method name="unbind-ok" synchronous="1" index="51"/>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnbindOk {}
