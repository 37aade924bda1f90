//! The connection event loop
//!
//! One engine task per connection owns the transport. Each pass through the
//! `select!` below is one wait: it ends because the socket became readable,
//! a timer fired, a handle submitted work, or a process signal arrived, and
//! the loop re-enters the wait transparently after handling the wakeup.

use std::io;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use siderite_amqp_types::definitions::{
    ACCESS_REFUSED, FRAME_ERROR, FRAME_MIN_SIZE, MAJOR, MINOR, REPLY_SUCCESS, UNEXPECTED_FRAME,
};
use siderite_amqp_types::methods::connection::{self, TuneOk};
use siderite_amqp_types::states::ConnectionState;
use siderite_amqp_types::{FieldTable, Method, WireDialect};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, trace};

use crate::channel::frame::ChannelFrame;
use crate::control::ConnectionControl;
use crate::frames::{Frame, FramePayload};
use crate::sasl_profile::SaslProfile;
use crate::transport::{self, Transport};
use crate::util::{Running, SignalListener};

use super::heartbeat::HeartBeat;
use super::{Connection, ConnectionEvent, Error, OpenError};

/// How long to wait for `connection.close-ok` after an error close
pub(crate) const ERROR_CLOSE_WAIT_SECS: u64 = 10;

/// Parameters for the start/tune/open handshake
pub(crate) struct Handshake<'a> {
    pub profile: &'a SaslProfile,
    pub locale: &'a str,
    pub channel_max: u16,
    pub frame_max: u32,
    pub heartbeat: u16,
    pub dialect: WireDialect,
}

pub(crate) struct ConnectionEngine<Io> {
    transport: Transport<Io>,
    connection: Connection,
    control: mpsc::Receiver<ConnectionControl>,
    outgoing: mpsc::Receiver<Frame>,
    heartbeat: HeartBeat,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    signals: SignalListener,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
}

fn combine(client: u16, server: u16) -> u16 {
    match (client, server) {
        (0, server) => server,
        (client, 0) => client,
        (client, server) => client.min(server),
    }
}

fn combine_frame_max(client: u32, server: u32) -> u32 {
    let chosen = match (client, server) {
        (0, server) => server,
        (client, 0) => client,
        (client, server) => client.min(server),
    };
    if chosen == 0 {
        0 // both sides propose "unlimited"
    } else {
        chosen.max(FRAME_MIN_SIZE)
    }
}

fn client_properties() -> FieldTable {
    let mut capabilities = FieldTable::new();
    capabilities.insert("publisher_confirms", true);
    capabilities.insert("consumer_cancel_notify", true);
    capabilities.insert("exchange_exchange_bindings", true);
    capabilities.insert("connection.blocked", true);
    capabilities.insert("basic.nack", true);

    let mut properties = FieldTable::new();
    properties.insert("product", "siderite-amqp");
    properties.insert("version", env!("CARGO_PKG_VERSION"));
    properties.insert("platform", "Rust");
    properties.insert("capabilities", capabilities);
    properties
}

impl<Io> ConnectionEngine<Io>
where
    Io: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    /// Runs the start/tune/open handshake and returns the engine ready for
    /// [`spawn`](Self::spawn)
    #[allow(clippy::too_many_arguments)]
    pub(crate) async fn open(
        transport: Transport<Io>,
        connection: Connection,
        control: mpsc::Receiver<ConnectionControl>,
        outgoing: mpsc::Receiver<Frame>,
        events: mpsc::UnboundedSender<ConnectionEvent>,
        signals: SignalListener,
        handshake: Handshake<'_>,
        read_timeout: Option<Duration>,
        write_timeout: Option<Duration>,
    ) -> Result<Self, OpenError> {
        let mut engine = Self {
            transport,
            connection,
            control,
            outgoing,
            heartbeat: HeartBeat::never(),
            events,
            signals,
            read_timeout,
            write_timeout,
        };
        engine.negotiate(handshake).await?;
        Ok(engine)
    }

    async fn negotiate(&mut self, handshake: Handshake<'_>) -> Result<(), OpenError> {
        self.connection.state = ConnectionState::AwaitingStart;
        let start = match self.recv_handshake_method().await? {
            Method::ConnectionStart(start) => start,
            Method::ConnectionClose(close) => return Err(self.on_handshake_close(close).await),
            other => return Err(OpenError::UnexpectedFrame(other.name())),
        };

        if start.version_major != MAJOR || start.version_minor != MINOR {
            return Err(OpenError::VersionMismatch {
                major: start.version_major,
                minor: start.version_minor,
                revision: 0,
            });
        }
        if !handshake.profile.is_offered(&start.mechanisms) {
            return Err(OpenError::MechanismNotSupported(
                handshake.profile.mechanism().to_string(),
            ));
        }

        let response = handshake
            .profile
            .response(handshake.dialect)
            .map_err(|err| transport::Error::Frame(err.into()))?;
        let start_ok = connection::StartOk {
            client_properties: client_properties(),
            mechanism: handshake.profile.mechanism().to_string(),
            response: response.clone(),
            locale: handshake.locale.to_string(),
        };
        self.send_frame(Frame::method(0, Method::ConnectionStartOk(start_ok)))
            .await?;
        self.connection.state = ConnectionState::AwaitingTune;

        let tune = loop {
            match self.recv_handshake_method().await? {
                Method::ConnectionSecure(_challenge) => {
                    // the PLAIN-family mechanisms answer every challenge
                    // with the same response
                    let secure_ok = connection::SecureOk {
                        response: response.clone(),
                    };
                    self.send_frame(Frame::method(0, Method::ConnectionSecureOk(secure_ok)))
                        .await?;
                }
                Method::ConnectionTune(tune) => break tune,
                Method::ConnectionClose(close) => {
                    return Err(self.on_handshake_close(close).await)
                }
                other => return Err(OpenError::UnexpectedFrame(other.name())),
            }
        };

        let tuned = TuneOk {
            channel_max: combine(handshake.channel_max, tune.channel_max),
            frame_max: combine_frame_max(handshake.frame_max, tune.frame_max),
            heartbeat: combine(handshake.heartbeat, tune.heartbeat),
        };
        self.send_frame(Frame::method(0, Method::ConnectionTuneOk(tuned)))
            .await?;

        self.connection.tuned = tuned;
        self.transport.set_max_frame_size(tuned.frame_max);
        if tuned.heartbeat > 0 {
            self.heartbeat =
                HeartBeat::new(Duration::from_millis(tuned.heartbeat as u64 * 500));
            self.transport
                .set_heartbeat_miss(Some(Duration::from_secs(
                    2 * tuned.heartbeat as u64 + 1,
                )));
        }

        self.connection.state = ConnectionState::AwaitingOpenOk;
        let open = connection::Open {
            virtual_host: self.connection.vhost.clone(),
        };
        self.send_frame(Frame::method(0, Method::ConnectionOpen(open)))
            .await?;

        match self.recv_handshake_method().await? {
            Method::ConnectionOpenOk(_) => {
                self.connection.state = ConnectionState::Open;
                debug!(
                    channel_max = tuned.channel_max,
                    frame_max = tuned.frame_max,
                    heartbeat = tuned.heartbeat,
                    "connection open"
                );
                Ok(())
            }
            Method::ConnectionClose(close) => Err(self.on_handshake_close(close).await),
            other => Err(OpenError::UnexpectedFrame(other.name())),
        }
    }

    /// The negotiated limits, for the handle
    pub(crate) fn tuned(&self) -> TuneOk {
        self.connection.tuned
    }

    pub(crate) fn spawn(self) -> JoinHandle<Result<(), Error>> {
        tokio::spawn(self.event_loop())
    }

    async fn on_handshake_close(&mut self, close: connection::Close) -> OpenError {
        let _ = self
            .send_frame(Frame::method(
                0,
                Method::ConnectionCloseOk(connection::CloseOk::default()),
            ))
            .await;
        self.connection.state = ConnectionState::Closed;
        if close.reply_code == ACCESS_REFUSED {
            OpenError::AuthFailure {
                reply_text: close.reply_text,
            }
        } else {
            OpenError::RemoteClosed {
                reply_code: close.reply_code,
                reply_text: close.reply_text,
            }
        }
    }

    /// Reads the next method on channel 0 during the handshake, tolerating
    /// interleaved heartbeats, with the read timeout applied per frame
    async fn recv_handshake_method(&mut self) -> Result<Method, OpenError> {
        loop {
            let next = self.transport.next();
            let frame = match self.read_timeout {
                Some(timeout) => tokio::time::timeout(timeout, next)
                    .await
                    .map_err(|_| OpenError::Timeout)?,
                None => next.await,
            };
            let frame = match frame {
                Some(frame) => frame?,
                None => {
                    return Err(OpenError::Io(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "broker closed the transport during the handshake",
                    )))
                }
            };

            trace!(channel = frame.channel, frame = ?frame.payload, "RECV");
            match frame.payload {
                FramePayload::Method(method) if frame.channel == 0 => return Ok(method),
                FramePayload::Heartbeat => continue,
                _ => return Err(OpenError::UnexpectedFrame("non-method frame")),
            }
        }
    }

    async fn send_frame(&mut self, frame: Frame) -> Result<(), transport::Error> {
        trace!(channel = frame.channel, frame = ?frame.payload, "SEND");
        let send = self.transport.send(frame);
        match self.write_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, send).await {
                Ok(result) => result?,
                Err(_) => {
                    return Err(transport::Error::Io(io::Error::new(
                        io::ErrorKind::TimedOut,
                        "frame write timed out",
                    )))
                }
            },
            None => send.await?,
        }
        self.heartbeat.reset();
        Ok(())
    }

    #[inline]
    async fn on_incoming(&mut self, frame: Frame) -> Result<Running, Error> {
        trace!(channel = frame.channel, frame = ?frame.payload, "RECV");

        if frame.channel == 0 {
            return self.on_channel0(frame.payload).await;
        }

        // Discard channel traffic while our close handshake is pending
        if self.connection.state == ConnectionState::Closing {
            return Ok(Running::Continue);
        }

        let channel = frame.channel;
        let item = match frame.payload {
            FramePayload::Method(method) => ChannelFrame::Method(method),
            FramePayload::Header(header) => ChannelFrame::Header(header),
            FramePayload::Body(body) => ChannelFrame::Body(body),
            FramePayload::UnknownMethod {
                class_id,
                method_id,
            } => ChannelFrame::UnknownMethod {
                class_id,
                method_id,
            },
            FramePayload::Heartbeat => {
                return Err(Error::ProtocolViolation {
                    reply_code: FRAME_ERROR,
                    reason: "heartbeat frame on a non-zero channel",
                })
            }
        };

        match self.connection.channel_tx(channel) {
            Some(tx) => {
                if tx.send(item).await.is_err() {
                    // the channel engine stopped on its own; its close-ok
                    // or leftover content is of no interest
                    self.connection.deallocate_channel(channel);
                }
                Ok(Running::Continue)
            }
            None => Err(Error::ProtocolViolation {
                reply_code: siderite_amqp_types::definitions::CHANNEL_ERROR,
                reason: "frame delivered to a channel that does not exist",
            }),
        }
    }

    async fn on_channel0(&mut self, payload: FramePayload) -> Result<Running, Error> {
        match payload {
            FramePayload::Heartbeat => Ok(Running::Continue),
            FramePayload::Method(Method::ConnectionClose(close)) => {
                let _ = self
                    .send_frame(Frame::method(
                        0,
                        Method::ConnectionCloseOk(connection::CloseOk::default()),
                    ))
                    .await;
                let closing = self.connection.state == ConnectionState::Closing;
                self.connection.state = ConnectionState::Closed;
                self.connection.drop_channels();
                if closing {
                    // both sides initiated a close at once; ours succeeded
                    Ok(Running::Stop)
                } else {
                    Err(Error::RemoteClosed {
                        reply_code: close.reply_code,
                        reply_text: close.reply_text,
                    })
                }
            }
            FramePayload::Method(Method::ConnectionCloseOk(_)) => {
                match self.connection.state {
                    ConnectionState::Closing => {
                        self.connection.state = ConnectionState::Closed;
                        Ok(Running::Stop)
                    }
                    _ => Err(Error::ProtocolViolation {
                        reply_code: UNEXPECTED_FRAME,
                        reason: "connection.close-ok without a pending close",
                    }),
                }
            }
            FramePayload::Method(Method::ConnectionBlocked(blocked)) => {
                let _ = self.events.send(ConnectionEvent::Blocked {
                    reason: blocked.reason,
                });
                Ok(Running::Continue)
            }
            FramePayload::Method(Method::ConnectionUnblocked(_)) => {
                let _ = self.events.send(ConnectionEvent::Unblocked);
                Ok(Running::Continue)
            }
            FramePayload::Method(_) if self.connection.state == ConnectionState::Closing => {
                // everything but close-ok is discarded once we sent close
                Ok(Running::Continue)
            }
            FramePayload::Method(method) => {
                debug!(method = method.name(), "out-of-context method on channel 0");
                Err(Error::ProtocolViolation {
                    reply_code: UNEXPECTED_FRAME,
                    reason: "out-of-context connection method",
                })
            }
            FramePayload::UnknownMethod { .. } => Err(Error::ProtocolViolation {
                reply_code: FRAME_ERROR,
                reason: "unknown method on channel 0",
            }),
            FramePayload::Header(_) | FramePayload::Body(_) => Err(Error::ProtocolViolation {
                reply_code: UNEXPECTED_FRAME,
                reason: "content frame on channel 0",
            }),
        }
    }

    #[inline]
    async fn on_control(&mut self, control: ConnectionControl) -> Result<Running, Error> {
        match control {
            ConnectionControl::Close(reason) => match self.connection.state {
                ConnectionState::Open => {
                    let (reply_code, reply_text) =
                        reason.unwrap_or((REPLY_SUCCESS, String::new()));
                    let close = connection::Close {
                        reply_code,
                        reply_text,
                        class_id: 0,
                        method_id: 0,
                    };
                    self.send_frame(Frame::method(0, Method::ConnectionClose(close)))
                        .await?;
                    self.connection.state = ConnectionState::Closing;
                    Ok(Running::Continue)
                }
                ConnectionState::Closing => Ok(Running::Continue),
                _ => Ok(Running::Stop),
            },
            ConnectionControl::AllocateChannel { tx, responder } => {
                let result = self.connection.allocate_channel(tx);
                let _ = responder.send(result);
                Ok(Running::Continue)
            }
            ConnectionControl::DeallocateChannel(id) => {
                self.connection.deallocate_channel(id);
                Ok(Running::Continue)
            }
        }
    }

    #[inline]
    async fn on_outgoing(&mut self, frame: Frame) -> Result<Running, Error> {
        match self.connection.state {
            ConnectionState::Open => {
                self.send_frame(frame).await?;
                Ok(Running::Continue)
            }
            // a channel racing the close handshake; its frames are moot
            ConnectionState::Closing | ConnectionState::Closed => Ok(Running::Continue),
            _ => Err(Error::IllegalState),
        }
    }

    #[inline]
    async fn on_heartbeat(&mut self) -> Result<Running, Error> {
        match self.connection.state {
            ConnectionState::Open => {
                self.send_frame(Frame::heartbeat()).await?;
                Ok(Running::Continue)
            }
            ConnectionState::Closed => Ok(Running::Stop),
            _ => Ok(Running::Continue),
        }
    }

    async fn on_error(&mut self, error: &Error) -> Running {
        match error {
            Error::Transport(_) => Running::Stop,
            Error::RemoteClosed { .. } => Running::Stop,
            Error::ProtocolViolation { reply_code, reason } => {
                let close = connection::Close {
                    reply_code: *reply_code,
                    reply_text: reason.to_string(),
                    class_id: 0,
                    method_id: 0,
                };
                let _ = self
                    .send_frame(Frame::method(0, Method::ConnectionClose(close)))
                    .await;
                if let Err(err) = self.recv_close_ok_with_timeout().await {
                    debug!(?err, "no close-ok after error close");
                }
                self.connection.state = ConnectionState::Closed;
                Running::Stop
            }
            Error::IllegalState | Error::JoinError(_) => Running::Stop,
        }
    }

    async fn recv_close_ok_with_timeout(&mut self) -> Result<(), tokio::time::error::Elapsed> {
        tokio::time::timeout(Duration::from_secs(ERROR_CLOSE_WAIT_SECS), async {
            loop {
                match self.transport.next().await {
                    Some(Ok(Frame {
                        payload: FramePayload::Method(Method::ConnectionCloseOk(_)),
                        ..
                    })) => break,
                    Some(_) => continue,
                    None => break,
                }
            }
        })
        .await
    }

    #[instrument(name = "Connection::event_loop", skip(self))]
    async fn event_loop(mut self) -> Result<(), Error> {
        let mut outcome = Ok(());
        loop {
            let result = tokio::select! {
                _ = self.heartbeat.tick() => self.on_heartbeat().await,
                incoming = self.transport.next() => {
                    match incoming {
                        Some(Ok(frame)) => self.on_incoming(frame).await,
                        Some(Err(err)) => Err(err.into()),
                        None => match self.connection.state {
                            ConnectionState::Closing | ConnectionState::Closed => Ok(Running::Stop),
                            _ => Err(Error::Transport(transport::Error::Io(io::Error::new(
                                io::ErrorKind::UnexpectedEof,
                                "transport closed before the connection close handshake",
                            )))),
                        },
                    }
                },
                control = self.control.recv() => {
                    match control {
                        Some(control) => self.on_control(control).await,
                        // handle dropped with the close already submitted
                        None => Ok(Running::Stop),
                    }
                },
                frame = self.outgoing.recv() => {
                    match frame {
                        Some(frame) => self.on_outgoing(frame).await,
                        None => Ok(Running::Stop),
                    }
                },
                signal = self.signals.recv() => {
                    debug!(?signal, "signal observed during wait");
                    let _ = self.events.send(ConnectionEvent::Interrupted(signal));
                    Ok(Running::Continue)
                },
            };

            let running = match result {
                Ok(running) => running,
                Err(err) => {
                    error!("{:?}", err);
                    let running = self.on_error(&err).await;
                    outcome = Err(err);
                    running
                }
            };

            match running {
                Running::Continue => {}
                Running::Stop => break,
            }
        }

        self.connection.state = ConnectionState::Closed;
        self.connection.drop_channels();
        self.control.close();
        self.outgoing.close();

        debug!("Stopped");

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tune_proposals_combine_to_the_minimum_with_zero_as_wildcard() {
        assert_eq!(combine(0, 2047), 2047);
        assert_eq!(combine(512, 0), 512);
        assert_eq!(combine(512, 2047), 512);
        assert_eq!(combine_frame_max(0, 131072), 131072);
        assert_eq!(combine_frame_max(65536, 131072), 65536);
        assert_eq!(combine_frame_max(0, 0), 0);
    }

    #[test]
    fn frame_max_respects_the_protocol_floor() {
        assert_eq!(combine_frame_max(1024, 131072), FRAME_MIN_SIZE);
    }

    #[test]
    fn client_properties_advertise_the_rabbitmq_capabilities() {
        let properties = client_properties();
        let capabilities = match properties.get("capabilities") {
            Some(siderite_amqp_types::FieldValue::Table(table)) => table,
            other => panic!("capabilities missing: {other:?}"),
        };
        for name in [
            "publisher_confirms",
            "consumer_cancel_notify",
            "exchange_exchange_bindings",
            "connection.blocked",
            "basic.nack",
        ] {
            assert_eq!(
                capabilities.get(name),
                Some(&siderite_amqp_types::FieldValue::Boolean(true)),
                "{name} not advertised"
            );
        }
    }
}
