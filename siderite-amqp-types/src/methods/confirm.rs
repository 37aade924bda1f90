//! Methods of the `confirm` class (class id 85, RabbitMQ extension)

use bytes::{Bytes, BytesMut};

use crate::error::{DecodeError, EncodeError};
use crate::primitives::read_u8;

/// Puts the channel into publisher-confirm mode.
/// <method name="select" synchronous="1" index="10"/>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Select {
    /// <field name="nowait" domain="no-wait"/>
    pub nowait: bool,
}

impl Select {
    pub(crate) fn encode(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        use bytes::BufMut;
        dst.put_u8(self.nowait as u8);
        Ok(())
    }

    pub(crate) fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        Ok(Self {
            nowait: read_u8(src)? & 0x01 != 0,
        })
    }
}

/// <method name="select-ok" synchronous="1" index="11"/>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectOk {}
