//! Methods of the `connection` class (class id 10)

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{DecodeError, EncodeError};
use crate::primitives::{
    read_longstr, read_shortstr, read_u16, read_u32, read_u8, write_longstr, write_shortstr,
    FieldTable, WireDialect,
};

/// Starts connection negotiation.
/// <method name="start" synchronous="1" index="10"/>
#[derive(Debug, Clone, PartialEq)]
pub struct Start {
    /// <field name="version-major" domain="octet"/>
    pub version_major: u8,

    /// <field name="version-minor" domain="octet"/>
    pub version_minor: u8,

    /// <field name="server-properties" domain="peer-properties"/>
    pub server_properties: FieldTable,

    /// Space-separated list of SASL mechanisms
    /// <field name="mechanisms" domain="longstr"/>
    pub mechanisms: Bytes,

    /// Space-separated list of message locales
    /// <field name="locales" domain="longstr"/>
    pub locales: Bytes,
}

impl Start {
    pub(crate) fn encode(&self, dialect: WireDialect, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u8(self.version_major);
        dst.put_u8(self.version_minor);
        self.server_properties.encode(dialect, dst)?;
        write_longstr(dst, &self.mechanisms)?;
        write_longstr(dst, &self.locales)
    }

    pub(crate) fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        Ok(Self {
            version_major: read_u8(src)?,
            version_minor: read_u8(src)?,
            server_properties: FieldTable::decode(src)?,
            mechanisms: read_longstr(src)?,
            locales: read_longstr(src)?,
        })
    }
}

/// Selects a SASL mechanism and locale.
/// <method name="start-ok" synchronous="1" index="11"/>
#[derive(Debug, Clone, PartialEq)]
pub struct StartOk {
    /// <field name="client-properties" domain="peer-properties"/>
    pub client_properties: FieldTable,

    /// <field name="mechanism" domain="shortstr"/>
    pub mechanism: String,

    /// Mechanism-specific opaque response
    /// <field name="response" domain="longstr"/>
    pub response: Bytes,

    /// <field name="locale" domain="shortstr"/>
    pub locale: String,
}

impl StartOk {
    pub(crate) fn encode(&self, dialect: WireDialect, dst: &mut BytesMut) -> Result<(), EncodeError> {
        self.client_properties.encode(dialect, dst)?;
        write_shortstr(dst, &self.mechanism)?;
        write_longstr(dst, &self.response)?;
        write_shortstr(dst, &self.locale)
    }

    pub(crate) fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        Ok(Self {
            client_properties: FieldTable::decode(src)?,
            mechanism: read_shortstr(src)?,
            response: read_longstr(src)?,
            locale: read_shortstr(src)?,
        })
    }
}

/// SASL challenge from the broker.
/// <method name="secure" synchronous="1" index="20"/>
#[derive(Debug, Clone, PartialEq)]
pub struct Secure {
    /// <field name="challenge" domain="longstr"/>
    pub challenge: Bytes,
}

impl Secure {
    pub(crate) fn encode(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        write_longstr(dst, &self.challenge)
    }

    pub(crate) fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        Ok(Self {
            challenge: read_longstr(src)?,
        })
    }
}

/// SASL challenge response.
/// <method name="secure-ok" synchronous="1" index="21"/>
#[derive(Debug, Clone, PartialEq)]
pub struct SecureOk {
    /// <field name="response" domain="longstr"/>
    pub response: Bytes,
}

impl SecureOk {
    pub(crate) fn encode(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        write_longstr(dst, &self.response)
    }

    pub(crate) fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        Ok(Self {
            response: read_longstr(src)?,
        })
    }
}

/// Broker's session limit proposals. Zero means "no preference".
/// <method name="tune" synchronous="1" index="30"/>
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tune {
    /// <field name="channel-max" domain="short"/>
    pub channel_max: u16,

    /// Largest acceptable total frame length including overhead
    /// <field name="frame-max" domain="long"/>
    pub frame_max: u32,

    /// Desired heartbeat delay in seconds
    /// <field name="heartbeat" domain="short"/>
    pub heartbeat: u16,
}

impl Tune {
    pub(crate) fn encode(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u16(self.channel_max);
        dst.put_u32(self.frame_max);
        dst.put_u16(self.heartbeat);
        Ok(())
    }

    pub(crate) fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        Ok(Self {
            channel_max: read_u16(src)?,
            frame_max: read_u32(src)?,
            heartbeat: read_u16(src)?,
        })
    }
}

/// Client's negotiated session limits.
/// <method name="tune-ok" synchronous="1" index="31"/>
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TuneOk {
    /// <field name="channel-max" domain="short"/>
    pub channel_max: u16,

    /// <field name="frame-max" domain="long"/>
    pub frame_max: u32,

    /// <field name="heartbeat" domain="short"/>
    pub heartbeat: u16,
}

impl TuneOk {
    pub(crate) fn encode(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u16(self.channel_max);
        dst.put_u32(self.frame_max);
        dst.put_u16(self.heartbeat);
        Ok(())
    }

    pub(crate) fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        Ok(Self {
            channel_max: read_u16(src)?,
            frame_max: read_u32(src)?,
            heartbeat: read_u16(src)?,
        })
    }
}

/// Opens a connection to a virtual host.
/// <method name="open" synchronous="1" index="40"/>
#[derive(Debug, Clone, PartialEq)]
pub struct Open {
    /// <field name="virtual-host" domain="path"/>
    pub virtual_host: String,
}

impl Open {
    pub(crate) fn encode(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        write_shortstr(dst, &self.virtual_host)?;
        // reserved: capabilities shortstr, insist bit
        dst.put_u8(0);
        dst.put_u8(0);
        Ok(())
    }

    pub(crate) fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        let virtual_host = read_shortstr(src)?;
        let _capabilities = read_shortstr(src)?;
        let _insist = read_u8(src)?;
        Ok(Self { virtual_host })
    }
}

/// <method name="open-ok" synchronous="1" index="41"/>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenOk {}

impl OpenOk {
    pub(crate) fn encode(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        // reserved: known-hosts shortstr
        dst.put_u8(0);
        Ok(())
    }

    pub(crate) fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        let _known_hosts = read_shortstr(src)?;
        Ok(Self {})
    }
}

/// Requests an orderly connection shutdown.
/// <method name="close" synchronous="1" index="50"/>
#[derive(Debug, Clone, PartialEq)]
pub struct Close {
    /// <field name="reply-code" domain="reply-code"/>
    pub reply_code: u16,

    /// <field name="reply-text" domain="reply-text"/>
    pub reply_text: String,

    /// Class of the method that caused the close, zero if none
    /// <field name="class-id" domain="class-id"/>
    pub class_id: u16,

    /// <field name="method-id" domain="method-id"/>
    pub method_id: u16,
}

impl Close {
    pub(crate) fn encode(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u16(self.reply_code);
        write_shortstr(dst, &self.reply_text)?;
        dst.put_u16(self.class_id);
        dst.put_u16(self.method_id);
        Ok(())
    }

    pub(crate) fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        Ok(Self {
            reply_code: read_u16(src)?,
            reply_text: read_shortstr(src)?,
            class_id: read_u16(src)?,
            method_id: read_u16(src)?,
        })
    }
}

/// <method name="close-ok" synchronous="1" index="51"/>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CloseOk {}

/// Broker stopped accepting publishes (RabbitMQ `connection.blocked`).
/// <method name="blocked" index="60"/>
#[derive(Debug, Clone, PartialEq)]
pub struct Blocked {
    /// <field name="reason" domain="shortstr"/>
    pub reason: String,
}

impl Blocked {
    pub(crate) fn encode(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        write_shortstr(dst, &self.reason)
    }

    pub(crate) fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        Ok(Self {
            reason: read_shortstr(src)?,
        })
    }
}

/// Broker resumed accepting publishes.
/// <method name="unblocked" index="61"/>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Unblocked {}
