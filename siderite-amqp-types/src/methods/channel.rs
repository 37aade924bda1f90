//! Methods of the `channel` class (class id 20)

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{DecodeError, EncodeError};
use crate::primitives::{read_longstr, read_shortstr, read_u16, read_u8, write_shortstr};

/// Opens a channel for use.
/// <method name="open" synchronous="1" index="10"/>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Open {}

impl Open {
    pub(crate) fn encode(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        // reserved: out-of-band shortstr
        dst.put_u8(0);
        Ok(())
    }

    pub(crate) fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        let _out_of_band = read_shortstr(src)?;
        Ok(Self {})
    }
}

/// <method name="open-ok" synchronous="1" index="11"/>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenOk {}

impl OpenOk {
    pub(crate) fn encode(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        // reserved: channel-id longstr
        dst.put_u32(0);
        Ok(())
    }

    pub(crate) fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        let _channel_id = read_longstr(src)?;
        Ok(Self {})
    }
}

/// Asks the peer to pause (`active = false`) or resume content methods.
/// <method name="flow" synchronous="1" index="20"/>
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flow {
    /// <field name="active" domain="bit"/>
    pub active: bool,
}

impl Flow {
    pub(crate) fn encode(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u8(self.active as u8);
        Ok(())
    }

    pub(crate) fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        let bits = read_u8(src)?;
        Ok(Self {
            active: bits & 0x01 != 0,
        })
    }
}

/// <method name="flow-ok" index="21"/>
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowOk {
    /// <field name="active" domain="bit"/>
    pub active: bool,
}

impl FlowOk {
    pub(crate) fn encode(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u8(self.active as u8);
        Ok(())
    }

    pub(crate) fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        let bits = read_u8(src)?;
        Ok(Self {
            active: bits & 0x01 != 0,
        })
    }
}

/// Requests an orderly channel shutdown.
/// <method name="close" synchronous="1" index="40"/>
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

/// <method name="close-ok" synchronous="1" index="41"/>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CloseOk {}
