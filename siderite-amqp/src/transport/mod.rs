//! Low level transport framing
//!
//! [`Transport`] owns a split byte stream wrapped in `FramedRead` and
//! `FramedWrite` with the [`FrameCodec`], and layers the heartbeat-miss
//! deadline on top of the read half. The stream seam is any
//! `AsyncRead + AsyncWrite` value, so an encrypted stream, a unix socket or
//! an in-memory loopback plug in the same way as plain TCP.

use std::task::Poll;
use std::time::Duration;

use futures_util::{Future, Sink, Stream};
use pin_project_lite::pin_project;
use siderite_amqp_types::WireDialect;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio_util::codec::{FramedRead, FramedWrite};

use crate::frames::{Frame, FrameCodec};
use crate::util::IdleTimeout;

pub mod protocol_header;

mod error;
pub use error::Error;

use protocol_header::ProtocolHeader;

pin_project! {
    /// Frame transport over an owned byte stream
    #[derive(Debug)]
    pub struct Transport<Io> {
        #[pin]
        framed_write: FramedWrite<WriteHalf<Io>, FrameCodec>,

        #[pin]
        framed_read: FramedRead<ReadHalf<Io>, FrameCodec>,

        #[pin]
        heartbeat_miss: Option<IdleTimeout>,
    }
}

impl<Io> Transport<Io>
where
    Io: AsyncRead + AsyncWrite + Unpin,
{
    /// Writes the protocol preamble and binds the frame codec over the
    /// stream.
    ///
    /// A broker that rejects the offered version answers the preamble with
    /// its own 8-octet header, which the codec reports as
    /// [`frames::Error::VersionMismatch`](crate::frames::Error) on the
    /// first read.
    pub async fn connect(mut io: Io, dialect: WireDialect) -> Result<Self, Error> {
        let preamble: [u8; 8] = ProtocolHeader::amqp091().into();
        io.write_all(&preamble).await?;
        Ok(Self::bind(io, dialect))
    }

    /// Binds the frame codec over an already-negotiated stream
    pub fn bind(io: Io, dialect: WireDialect) -> Self {
        let (reader, writer) = tokio::io::split(io);
        let framed_write = FramedWrite::new(writer, FrameCodec::new(dialect));
        let framed_read = FramedRead::new(reader, FrameCodec::new(dialect));
        Self {
            framed_write,
            framed_read,
            heartbeat_miss: None,
        }
    }

    /// Applies the tuned frame-max to both codec halves. Zero means
    /// unlimited.
    pub fn set_max_frame_size(&mut self, max_frame_size: u32) -> &mut Self {
        self.framed_read
            .decoder_mut()
            .set_max_frame_size(max_frame_size);
        self.framed_write
            .encoder_mut()
            .set_max_frame_size(max_frame_size);
        self
    }

    /// Arms the heartbeat-miss deadline, reset on every inbound frame
    pub fn set_heartbeat_miss(&mut self, duration: Option<Duration>) -> &mut Self {
        self.heartbeat_miss = match duration {
            Some(duration) if !duration.is_zero() => Some(IdleTimeout::new(duration)),
            _ => None,
        };
        self
    }
}

impl<Io> Stream for Transport<Io>
where
    Io: AsyncRead + Unpin,
{
    type Item = Result<Frame, Error>;

    fn poll_next(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        match this.framed_read.as_mut().poll_next(cx) {
            Poll::Ready(next) => {
                if let Some(miss) = this.heartbeat_miss.as_mut().as_pin_mut() {
                    miss.get_mut().reset();
                }
                Poll::Ready(next.map(|item| item.map_err(Into::into)))
            }
            Poll::Pending => {
                if let Some(miss) = this.heartbeat_miss.as_pin_mut() {
                    if miss.poll(cx).is_ready() {
                        return Poll::Ready(Some(Err(Error::HeartbeatMissed)));
                    }
                }
                Poll::Pending
            }
        }
    }
}

impl<Io> Sink<Frame> for Transport<Io>
where
    Io: AsyncWrite + Unpin,
{
    type Error = Error;

    fn poll_ready(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> Poll<Result<(), Self::Error>> {
        let this = self.project();
        this.framed_write.poll_ready(cx).map_err(Into::into)
    }

    fn start_send(self: std::pin::Pin<&mut Self>, item: Frame) -> Result<(), Self::Error> {
        let this = self.project();
        this.framed_write.start_send(item).map_err(Into::into)
    }

    fn poll_flush(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> Poll<Result<(), Self::Error>> {
        let this = self.project();
        this.framed_write.poll_flush(cx).map_err(Into::into)
    }

    fn poll_close(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> Poll<Result<(), Self::Error>> {
        let this = self.project();
        this.framed_write.poll_close(cx).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use futures_util::{SinkExt, StreamExt};
    use siderite_amqp_types::methods::connection;
    use siderite_amqp_types::Method;
    use tokio_test::io::Builder;

    use super::*;

    #[tokio::test]
    async fn connect_writes_the_preamble() {
        let mock = Builder::new().write(b"AMQP\x00\x00\x09\x01").build();
        Transport::connect(mock, WireDialect::Rabbit).await.unwrap();
    }

    #[tokio::test]
    async fn frames_round_trip_through_a_loopback() {
        let frame = Frame::method(
            0,
            Method::ConnectionTuneOk(connection::TuneOk {
                channel_max: 0,
                frame_max: 131072,
                heartbeat: 60,
            }),
        );

        let mut wire = bytes::BytesMut::new();
        use tokio_util::codec::Encoder;
        FrameCodec::new(WireDialect::Rabbit)
            .encode(frame.clone(), &mut wire)
            .unwrap();

        let mock = Builder::new().write(&wire).read(&wire).build();
        let mut transport = Transport::bind(mock, WireDialect::Rabbit);

        transport.send(frame.clone()).await.unwrap();
        let read = transport.next().await.unwrap().unwrap();
        assert_eq!(read, frame);
    }

    #[tokio::test(start_paused = true)]
    async fn silence_past_the_miss_deadline_fails_the_read() {
        // keep the handle alive so reads stay pending instead of hitting EOF
        let (mock, _io) = Builder::new().build_with_handle();
        let mut transport = Transport::bind(mock, WireDialect::Rabbit);
        transport.set_heartbeat_miss(Some(Duration::from_secs(21)));

        match transport.next().await {
            Some(Err(Error::HeartbeatMissed)) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
