//! The AMQP 0-9-1 frame type and its codec
//!
//! A frame is `type:1 | channel:2 | length:4 | payload:length | 0xCE`.
//! [`FrameCodec`] implements `tokio_util`'s [`Encoder`] and [`Decoder`] so
//! the transport can wrap a stream with `FramedRead`/`FramedWrite`; the
//! codec owns the emitted [`WireDialect`] and the negotiated frame-max.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use siderite_amqp_types::definitions::{
    FRAME_BODY, FRAME_END, FRAME_HEADER, FRAME_HEARTBEAT, FRAME_METHOD, FRAME_OVERHEAD,
};
use siderite_amqp_types::{ContentHeader, DecodeError, Method, WireDialect};
use tokio_util::codec::{Decoder, Encoder};

mod error;
pub use error::Error;

/// A complete wire frame
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Channel the frame belongs to; 0 is the connection itself
    pub channel: u16,

    /// The decoded payload
    pub payload: FramePayload,
}

/// Payload of a [`Frame`], discriminated by the frame type octet
#[derive(Debug, Clone, PartialEq)]
pub enum FramePayload {
    /// Type 1: a method and its arguments
    Method(Method),

    /// Type 2: a content header
    Header(ContentHeader),

    /// Type 3: a slice of content body
    Body(Bytes),

    /// Type 8: a zero-length heartbeat
    Heartbeat,

    /// A well-formed method frame whose `(class_id, method_id)` pair is
    /// absent from the registry. Kept as a value rather than an error so
    /// the connection can apply the channel-0 close policy or forward it
    /// to a channel waiter.
    UnknownMethod {
        /// Class id read off the wire
        class_id: u16,
        /// Method id read off the wire
        method_id: u16,
    },
}

impl Frame {
    /// A method frame
    pub fn method(channel: u16, method: Method) -> Self {
        Self {
            channel,
            payload: FramePayload::Method(method),
        }
    }

    /// A content header frame
    pub fn header(channel: u16, header: ContentHeader) -> Self {
        Self {
            channel,
            payload: FramePayload::Header(header),
        }
    }

    /// A content body frame
    pub fn body(channel: u16, body: Bytes) -> Self {
        Self {
            channel,
            payload: FramePayload::Body(body),
        }
    }

    /// The heartbeat frame: type 8, channel 0, empty payload
    pub fn heartbeat() -> Self {
        Self {
            channel: 0,
            payload: FramePayload::Heartbeat,
        }
    }
}

/// Encoder and decoder of AMQP 0-9-1 frames
#[derive(Debug)]
pub struct FrameCodec {
    /// Dialect used for emitted field tables
    pub(crate) dialect: WireDialect,

    /// Largest acceptable total frame length including the 8-octet
    /// overhead. Unlimited until tune negotiation completes.
    pub(crate) max_frame_size: u32,
}

impl FrameCodec {
    /// Creates a codec with no frame-size limit, for use before tune
    /// negotiation settles the real one
    pub fn new(dialect: WireDialect) -> Self {
        Self {
            dialect,
            max_frame_size: u32::MAX,
        }
    }

    pub(crate) fn set_max_frame_size(&mut self, max_frame_size: u32) {
        self.max_frame_size = if max_frame_size == 0 {
            u32::MAX
        } else {
            max_frame_size
        };
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = Error;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (frame_type, payload) = match item.payload {
            FramePayload::Method(method) => {
                let mut buf = BytesMut::new();
                method.encode(self.dialect, &mut buf)?;
                (FRAME_METHOD, buf.freeze())
            }
            FramePayload::Header(header) => {
                let mut buf = BytesMut::new();
                header.encode(self.dialect, &mut buf)?;
                (FRAME_HEADER, buf.freeze())
            }
            FramePayload::Body(body) => (FRAME_BODY, body),
            FramePayload::Heartbeat => (FRAME_HEARTBEAT, Bytes::new()),
            FramePayload::UnknownMethod { .. } => {
                return Err(Error::Malformed("unknown methods are never emitted"))
            }
        };

        dst.reserve(payload.len() + FRAME_OVERHEAD as usize);
        dst.put_u8(frame_type);
        dst.put_u16(item.channel);
        dst.put_u32(payload.len() as u32);
        dst.put_slice(&payload);
        dst.put_u8(FRAME_END);
        Ok(())
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < 7 {
            src.reserve(7 - src.len());
            return Ok(None);
        }

        // A peer that rejects our protocol version answers the preamble
        // with its own 8-octet header instead of a frame.
        if &src[..4] == b"AMQP" {
            if src.len() < 8 {
                return Ok(None);
            }
            let header = src.split_to(8);
            return Err(Error::VersionMismatch {
                major: header[5],
                minor: header[6],
                revision: header[7],
            });
        }

        let frame_type = src[0];
        let channel = u16::from_be_bytes([src[1], src[2]]);
        let length = u32::from_be_bytes([src[3], src[4], src[5], src[6]]);

        if length.saturating_add(FRAME_OVERHEAD) > self.max_frame_size {
            return Err(Error::Malformed("frame exceeds negotiated frame-max"));
        }

        let total = 7 + length as usize + 1;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(7);
        let mut payload = src.split_to(length as usize).freeze();
        let end = src.get_u8();
        if end != FRAME_END {
            return Err(Error::Malformed("missing frame-end octet"));
        }

        let payload = match frame_type {
            FRAME_METHOD => match Method::decode(&mut payload) {
                Ok(method) => {
                    if !payload.is_empty() {
                        return Err(Error::Malformed(
                            "trailing octets after method arguments",
                        ));
                    }
                    FramePayload::Method(method)
                }
                Err(DecodeError::UnknownMethod {
                    class_id,
                    method_id,
                }) => FramePayload::UnknownMethod {
                    class_id,
                    method_id,
                },
                Err(err) => return Err(err.into()),
            },
            FRAME_HEADER => FramePayload::Header(ContentHeader::decode(&mut payload)?),
            FRAME_BODY => FramePayload::Body(payload),
            FRAME_HEARTBEAT => {
                if !payload.is_empty() {
                    return Err(Error::Malformed("heartbeat frame with a payload"));
                }
                FramePayload::Heartbeat
            }
            other => return Err(Error::UnknownFrameType(other)),
        };

        Ok(Some(Frame { channel, payload }))
    }
}

#[cfg(test)]
mod tests {
    use siderite_amqp_types::methods::{basic, connection};
    use siderite_amqp_types::BasicProperties;

    use super::*;

    fn codec() -> FrameCodec {
        FrameCodec::new(WireDialect::Rabbit)
    }

    #[test]
    fn heartbeat_encodes_to_the_fixed_octets() {
        let mut dst = BytesMut::new();
        codec().encode(Frame::heartbeat(), &mut dst).unwrap();
        assert_eq!(&dst[..], &[0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xCE]);
    }

    #[test]
    fn method_frame_round_trips() {
        let frame = Frame::method(
            3,
            Method::BasicAck(basic::Ack {
                delivery_tag: 42,
                multiple: true,
            }),
        );

        let mut wire = BytesMut::new();
        codec().encode(frame.clone(), &mut wire).unwrap();
        assert_eq!(*wire.last().unwrap(), FRAME_END);

        let decoded = codec().decode(&mut wire).unwrap().unwrap();
        assert!(wire.is_empty(), "decoder consumed length + 8 octets");
        assert_eq!(decoded, frame);
    }

    #[test]
    fn header_frame_round_trips() {
        let frame = Frame::header(
            1,
            ContentHeader::basic(
                12,
                BasicProperties {
                    delivery_mode: Some(2),
                    ..Default::default()
                },
            ),
        );
        let mut wire = BytesMut::new();
        codec().encode(frame.clone(), &mut wire).unwrap();
        assert_eq!(codec().decode(&mut wire).unwrap().unwrap(), frame);
    }

    #[test]
    fn partial_frame_yields_none_until_complete() {
        let frame = Frame::method(
            0,
            Method::ConnectionTuneOk(connection::TuneOk {
                channel_max: 2047,
                frame_max: 131072,
                heartbeat: 60,
            }),
        );
        let mut wire = BytesMut::new();
        codec().encode(frame.clone(), &mut wire).unwrap();

        let mut decoder = codec();
        let mut partial = BytesMut::from(&wire[..wire.len() - 3]);
        assert!(decoder.decode(&mut partial).unwrap().is_none());

        partial.extend_from_slice(&wire[wire.len() - 3..]);
        assert_eq!(decoder.decode(&mut partial).unwrap().unwrap(), frame);
    }

    #[test]
    fn corrupt_end_octet_is_a_framing_error() {
        let mut wire = BytesMut::new();
        codec().encode(Frame::heartbeat(), &mut wire).unwrap();
        let last = wire.len() - 1;
        wire[last] = 0x00;
        assert!(matches!(
            codec().decode(&mut wire),
            Err(Error::Malformed(_))
        ));
    }

    #[test]
    fn unknown_frame_type_is_rejected() {
        let mut wire = BytesMut::from(&[0x05u8, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xCE][..]);
        assert!(matches!(
            codec().decode(&mut wire),
            Err(Error::UnknownFrameType(0x05))
        ));
    }

    #[test]
    fn unknown_method_is_surfaced_as_a_value() {
        // class 10, method 0xFF: well-formed frame, unknown pair
        let mut wire = BytesMut::new();
        wire.put_u8(FRAME_METHOD);
        wire.put_u16(0);
        wire.put_u32(4);
        wire.put_u16(10);
        wire.put_u16(0xFF);
        wire.put_u8(FRAME_END);

        let decoded = codec().decode(&mut wire).unwrap().unwrap();
        assert_eq!(
            decoded.payload,
            FramePayload::UnknownMethod {
                class_id: 10,
                method_id: 0xFF
            }
        );
    }

    #[test]
    fn broker_protocol_header_reply_reports_version_mismatch() {
        let mut wire = BytesMut::from(&b"AMQP\x00\x01\x00\x00"[..]);
        match codec().decode(&mut wire) {
            Err(Error::VersionMismatch {
                major: 1,
                minor: 0,
                revision: 0,
            }) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let mut decoder = codec();
        decoder.set_max_frame_size(4096);

        let mut wire = BytesMut::new();
        wire.put_u8(FRAME_BODY);
        wire.put_u16(1);
        wire.put_u32(4089); // 4089 + 8 > 4096
        assert!(matches!(
            decoder.decode(&mut wire),
            Err(Error::Malformed(_))
        ));
    }
}
