//! The channel event loop
//!
//! One engine task per channel consumes the frames the connection routes to
//! it and the operations its handle submits. The engine is the channel's
//! single writer, which keeps a publish's method, header and body frames
//! contiguous on the wire for this channel. Exactly one synchronous method
//! is in flight at a time; later callers queue behind it in FIFO order.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use siderite_amqp_types::definitions::{FRAME_OVERHEAD, REPLY_SUCCESS, UNEXPECTED_FRAME};
use siderite_amqp_types::methods::{basic, channel as channel_methods};
use siderite_amqp_types::states::ChannelState;
use siderite_amqp_types::{ContentHeader, Method, WireDialect};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, trace, warn};

use crate::control::{ChannelControl, ConnectionControl};
use crate::frames::Frame;
use crate::util::Running;

use super::content::{Confirm, ConsumerMessage, Delivery, GetMessage, ReturnedMessage};
use super::error::{Error, OpenError};
use super::frame::ChannelFrame;

/// The synchronous call currently on the wire
enum Pending {
    /// A plain request/reply method
    Rpc {
        expects: (u16, u16),
        // set for basic.cancel so the consumer is dropped on cancel-ok
        cancel_tag: Option<String>,
        responder: oneshot::Sender<Result<Option<Method>, Error>>,
    },

    /// `basic.get`, resolved by `get-ok` plus content or by `get-empty`
    Get {
        no_ack: bool,
        responder: oneshot::Sender<Result<Option<GetMessage>, Error>>,
    },

    /// `basic.consume`, resolved by `consume-ok`
    Consume {
        no_ack: bool,
        #[allow(clippy::type_complexity)]
        responder: oneshot::Sender<
            Result<(String, mpsc::UnboundedReceiver<ConsumerMessage>), Error>,
        >,
    },
}

/// A synchronous call waiting for its turn on the wire
struct Operation {
    frames: Vec<Frame>,
    pending: Pending,
}

/// A publish held back by `channel.flow{active=false}`
struct QueuedPublish {
    frames: Vec<Frame>,
    seq: Option<u64>,
    responder: oneshot::Sender<Result<Option<u64>, Error>>,
}

/// An inbound message being assembled from method, header and body frames
struct ContentAssembly {
    method: Method,
    header: Option<ContentHeader>,
    body: BytesMut,
}

struct ConsumerEntry {
    tx: mpsc::UnboundedSender<ConsumerMessage>,
    no_ack: bool,
}

pub(crate) struct ChannelEngine {
    id: u16,
    frame_max: u32,
    dialect: WireDialect,
    state: ChannelState,

    conn_control: mpsc::Sender<ConnectionControl>,
    outgoing: mpsc::Sender<Frame>,
    control: mpsc::Receiver<ChannelControl>,
    incoming: mpsc::Receiver<ChannelFrame>,
    control_closed: bool,

    pending: Option<Pending>,
    queued: VecDeque<Operation>,
    receiving: Option<ContentAssembly>,
    close_responder: Option<oneshot::Sender<Result<(), Error>>>,

    consumers: HashMap<String, ConsumerEntry>,
    returned: mpsc::UnboundedSender<ReturnedMessage>,

    // delivery tags are strictly increasing per channel
    last_delivery_tag: u64,
    outstanding: BTreeSet<u64>,

    confirm_mode: bool,
    publish_seq: u64,
    unconfirmed: Arc<Mutex<BTreeSet<u64>>>,
    confirms: mpsc::UnboundedSender<Confirm>,

    flow_active: bool,
    fail_publish_on_flow: bool,
    flow_queue: VecDeque<QueuedPublish>,
}

impl ChannelEngine {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: u16,
        frame_max: u32,
        dialect: WireDialect,
        conn_control: mpsc::Sender<ConnectionControl>,
        outgoing: mpsc::Sender<Frame>,
        control: mpsc::Receiver<ChannelControl>,
        incoming: mpsc::Receiver<ChannelFrame>,
        returned: mpsc::UnboundedSender<ReturnedMessage>,
        confirms: mpsc::UnboundedSender<Confirm>,
        unconfirmed: Arc<Mutex<BTreeSet<u64>>>,
        fail_publish_on_flow: bool,
    ) -> Self {
        Self {
            id,
            frame_max,
            dialect,
            state: ChannelState::Opening,
            conn_control,
            outgoing,
            control,
            incoming,
            control_closed: false,
            pending: None,
            queued: VecDeque::new(),
            receiving: None,
            close_responder: None,
            consumers: HashMap::new(),
            returned,
            last_delivery_tag: 0,
            outstanding: BTreeSet::new(),
            confirm_mode: false,
            publish_seq: 0,
            unconfirmed,
            confirms,
            flow_active: true,
            fail_publish_on_flow,
            flow_queue: VecDeque::new(),
        }
    }

    /// Sends `channel.open` and waits for `channel.open-ok`
    pub(crate) async fn open(mut self) -> Result<Self, OpenError> {
        self.send_frame(Frame::method(
            self.id,
            Method::ChannelOpen(channel_methods::Open::default()),
        ))
        .await
        .map_err(|_| OpenError::ConnectionClosed)?;

        match self.incoming.recv().await {
            Some(ChannelFrame::Method(Method::ChannelOpenOk(_))) => {
                self.state = ChannelState::Open;
                debug!(channel = self.id, "channel open");
                Ok(self)
            }
            Some(ChannelFrame::Method(Method::ChannelClose(close))) => {
                let _ = self
                    .send_frame(Frame::method(
                        self.id,
                        Method::ChannelCloseOk(channel_methods::CloseOk::default()),
                    ))
                    .await;
                Err(OpenError::Refused {
                    reply_code: close.reply_code,
                    reply_text: close.reply_text,
                })
            }
            Some(_) => Err(OpenError::UnexpectedReply),
            None => Err(OpenError::ConnectionClosed),
        }
    }

    pub(crate) fn spawn(self) -> JoinHandle<Result<(), Error>> {
        tokio::spawn(self.event_loop())
    }

    async fn send_frame(&mut self, frame: Frame) -> Result<(), Error> {
        trace!(channel = frame.channel, frame = ?frame.payload, "SEND");
        self.outgoing
            .send(frame)
            .await
            .map_err(|_| Error::ConnectionClosed)
    }

    async fn send_frames(&mut self, frames: Vec<Frame>) -> Result<(), Error> {
        for frame in frames {
            self.send_frame(frame).await?;
        }
        Ok(())
    }

    /// Writes the operation now or queues it behind the pending call
    async fn submit(&mut self, op: Operation) -> Result<(), Error> {
        if self.pending.is_some() {
            self.queued.push_back(op);
            Ok(())
        } else {
            self.send_frames(op.frames).await?;
            self.pending = Some(op.pending);
            Ok(())
        }
    }

    /// Starts the next queued call once the wire is free
    async fn pump(&mut self) -> Result<(), Error> {
        if self.pending.is_none() {
            if let Some(op) = self.queued.pop_front() {
                self.send_frames(op.frames).await?;
                self.pending = Some(op.pending);
            }
        }
        Ok(())
    }

    fn fail_pending(pending: Pending, err: &Error) {
        match pending {
            Pending::Rpc { responder, .. } => {
                let _ = responder.send(Err(err.clone()));
            }
            Pending::Get { responder, .. } => {
                let _ = responder.send(Err(err.clone()));
            }
            Pending::Consume { responder, .. } => {
                let _ = responder.send(Err(err.clone()));
            }
        }
    }

    fn fail_all(&mut self, err: &Error) {
        if let Some(pending) = self.pending.take() {
            Self::fail_pending(pending, err);
        }
        for op in self.queued.drain(..) {
            Self::fail_pending(op.pending, err);
        }
        for publish in self.flow_queue.drain(..) {
            let _ = publish.responder.send(Err(err.clone()));
        }
        if let Some(responder) = self.close_responder.take() {
            let _ = responder.send(Err(err.clone()));
        }
        // ends every consumer stream
        self.consumers.clear();
    }

    /// A sequencing violation that breaks frame synchronization: ask the
    /// connection to close with reply code 505 and stop this engine
    async fn fatal(&mut self, reason: &'static str) -> Result<Running, Error> {
        let _ = self
            .conn_control
            .send(ConnectionControl::Close(Some((
                UNEXPECTED_FRAME,
                reason.to_string(),
            ))))
            .await;
        Err(Error::ProtocolViolation(reason))
    }

    /// Removes acknowledged tags, failing a plain ack of an unknown tag.
    /// `multiple` settles every outstanding tag up to the given one, or
    /// all of them for tag zero.
    fn validate_ack(&mut self, method: &Method) -> Option<Error> {
        let (tag, multiple) = match method {
            Method::BasicAck(m) => (m.delivery_tag, m.multiple),
            Method::BasicNack(m) => (m.delivery_tag, m.multiple),
            Method::BasicReject(m) => (m.delivery_tag, false),
            _ => return None,
        };

        if multiple {
            if tag == 0 {
                self.outstanding.clear();
            } else {
                self.outstanding.retain(|t| *t > tag);
            }
            None
        } else if self.outstanding.remove(&tag) {
            None
        } else {
            Some(Error::UnknownDeliveryTag(tag))
        }
    }

    fn settle_confirm(&mut self, delivery_tag: u64, multiple: bool, ack: bool) {
        {
            let mut unconfirmed = self.unconfirmed.lock();
            if multiple {
                let rest = unconfirmed.split_off(&(delivery_tag + 1));
                *unconfirmed = rest;
            } else {
                unconfirmed.remove(&delivery_tag);
            }
        }
        let _ = self.confirms.send(Confirm {
            delivery_tag,
            multiple,
            ack,
        });
    }

    fn content_frames(
        &self,
        publish: basic::Publish,
        header: ContentHeader,
        mut body: Bytes,
    ) -> Vec<Frame> {
        let mut frames = Vec::with_capacity(3);
        frames.push(Frame::method(self.id, Method::BasicPublish(publish)));
        frames.push(Frame::header(self.id, header));

        // frame-max covers the whole frame including the 8-octet overhead
        let chunk = if self.frame_max == 0 {
            usize::MAX
        } else {
            (self.frame_max - FRAME_OVERHEAD) as usize
        };
        while !body.is_empty() {
            let take = body.len().min(chunk);
            frames.push(Frame::body(self.id, body.split_to(take)));
        }
        frames
    }

    async fn on_control(&mut self, control: ChannelControl) -> Result<Running, Error> {
        match control {
            ChannelControl::Call { method, responder } => {
                if self.state != ChannelState::Open {
                    let _ = responder.send(Err(Error::NotOpen));
                    return Ok(Running::Continue);
                }
                if let Some(err) = self.validate_ack(&method) {
                    let _ = responder.send(Err(err));
                    return Ok(Running::Continue);
                }

                let expects = if nowait(&method) { None } else { method.reply() };
                match expects {
                    Some(expects) => {
                        let cancel_tag = match &method {
                            Method::BasicCancel(cancel) => {
                                Some(cancel.consumer_tag.clone())
                            }
                            _ => None,
                        };
                        let frames = vec![Frame::method(self.id, method)];
                        self.submit(Operation {
                            frames,
                            pending: Pending::Rpc {
                                expects,
                                cancel_tag,
                                responder,
                            },
                        })
                        .await?;
                    }
                    None => {
                        let enables_confirms = matches!(&method, Method::ConfirmSelect(_));
                        if let Method::BasicCancel(cancel) = &method {
                            self.consumers.remove(&cancel.consumer_tag);
                        }
                        self.send_frame(Frame::method(self.id, method)).await?;
                        if enables_confirms {
                            self.confirm_mode = true;
                        }
                        let _ = responder.send(Ok(None));
                    }
                }
                Ok(Running::Continue)
            }

            ChannelControl::Publish {
                publish,
                properties,
                body,
                responder,
            } => {
                if self.state != ChannelState::Open {
                    let _ = responder.send(Err(Error::NotOpen));
                    return Ok(Running::Continue);
                }
                if !self.flow_active && self.fail_publish_on_flow {
                    let _ = responder.send(Err(Error::FlowStopped));
                    return Ok(Running::Continue);
                }

                // catch wire-constraint violations here, where the error is
                // the caller's, rather than in the codec where it would be
                // fatal to the connection
                let header = ContentHeader::basic(body.len() as u64, properties);
                let mut scratch = BytesMut::new();
                let precheck = Method::BasicPublish(publish.clone())
                    .encode(self.dialect, &mut scratch)
                    .and_then(|_| header.encode(self.dialect, &mut scratch));
                if let Err(err) = precheck {
                    let _ = responder.send(Err(err.into()));
                    return Ok(Running::Continue);
                }

                let seq = if self.confirm_mode {
                    self.publish_seq += 1;
                    self.unconfirmed.lock().insert(self.publish_seq);
                    Some(self.publish_seq)
                } else {
                    None
                };
                let frames = self.content_frames(publish, header, body);

                if self.flow_active {
                    self.send_frames(frames).await?;
                    let _ = responder.send(Ok(seq));
                } else {
                    self.flow_queue.push_back(QueuedPublish {
                        frames,
                        seq,
                        responder,
                    });
                }
                Ok(Running::Continue)
            }

            ChannelControl::Get { get, responder } => {
                if self.state != ChannelState::Open {
                    let _ = responder.send(Err(Error::NotOpen));
                    return Ok(Running::Continue);
                }
                let no_ack = get.no_ack;
                let frames = vec![Frame::method(self.id, Method::BasicGet(get))];
                self.submit(Operation {
                    frames,
                    pending: Pending::Get { no_ack, responder },
                })
                .await?;
                Ok(Running::Continue)
            }

            ChannelControl::Consume { consume, responder } => {
                if self.state != ChannelState::Open {
                    let _ = responder.send(Err(Error::NotOpen));
                    return Ok(Running::Continue);
                }
                let no_ack = consume.no_ack;
                if consume.nowait {
                    if consume.consumer_tag.is_empty() {
                        let _ = responder.send(Err(Error::ProtocolViolation(
                            "no-wait consume requires a client-chosen consumer tag",
                        )));
                        return Ok(Running::Continue);
                    }
                    let tag = consume.consumer_tag.clone();
                    self.send_frame(Frame::method(self.id, Method::BasicConsume(consume)))
                        .await?;
                    let (tx, rx) = mpsc::unbounded_channel();
                    self.consumers.insert(tag.clone(), ConsumerEntry { tx, no_ack });
                    let _ = responder.send(Ok((tag, rx)));
                } else {
                    let frames = vec![Frame::method(self.id, Method::BasicConsume(consume))];
                    self.submit(Operation {
                        frames,
                        pending: Pending::Consume { no_ack, responder },
                    })
                    .await?;
                }
                Ok(Running::Continue)
            }

            ChannelControl::Close { responder } => match self.state {
                ChannelState::Open => {
                    let close = channel_methods::Close {
                        reply_code: REPLY_SUCCESS,
                        reply_text: String::new(),
                        class_id: 0,
                        method_id: 0,
                    };
                    self.send_frame(Frame::method(self.id, Method::ChannelClose(close)))
                        .await?;
                    self.state = ChannelState::Closing;
                    self.close_responder = Some(responder);
                    Ok(Running::Continue)
                }
                _ => {
                    let _ = responder.send(Ok(()));
                    Ok(Running::Continue)
                }
            },
        }
    }

    /// The handle was dropped without an explicit close
    async fn on_handle_dropped(&mut self) -> Result<Running, Error> {
        match self.state {
            ChannelState::Open => {
                let close = channel_methods::Close {
                    reply_code: REPLY_SUCCESS,
                    reply_text: String::new(),
                    class_id: 0,
                    method_id: 0,
                };
                self.send_frame(Frame::method(self.id, Method::ChannelClose(close)))
                    .await?;
                self.state = ChannelState::Closing;
                Ok(Running::Continue)
            }
            ChannelState::Closing => Ok(Running::Continue),
            _ => Ok(Running::Stop),
        }
    }

    async fn on_incoming(&mut self, frame: ChannelFrame) -> Result<Running, Error> {
        match frame {
            ChannelFrame::Method(method) => {
                trace!(channel = self.id, frame = ?method, "RECV");
                if self.receiving.is_some() {
                    return self.fatal("method frame while a message body was pending").await;
                }
                if method.carries_content() {
                    self.receiving = Some(ContentAssembly {
                        method,
                        header: None,
                        body: BytesMut::new(),
                    });
                    return Ok(Running::Continue);
                }
                self.on_method(method).await
            }

            ChannelFrame::Header(header) => {
                let complete = match &mut self.receiving {
                    Some(assembly) if assembly.header.is_none() => {
                        let complete = header.body_size == 0;
                        assembly.header = Some(header);
                        complete
                    }
                    _ => {
                        return self
                            .fatal("content header without a preceding content method")
                            .await
                    }
                };
                if complete {
                    return self.dispatch_content().await;
                }
                Ok(Running::Continue)
            }

            ChannelFrame::Body(chunk) => {
                let complete = match &mut self.receiving {
                    Some(assembly) => match &assembly.header {
                        Some(header) => {
                            assembly.body.extend_from_slice(&chunk);
                            if (assembly.body.len() as u64) > header.body_size {
                                return self
                                    .fatal("content body exceeds the announced body size")
                                    .await;
                            }
                            (assembly.body.len() as u64) == header.body_size
                        }
                        None => {
                            return self.fatal("content body before the content header").await
                        }
                    },
                    None => {
                        return self
                            .fatal("content body without a preceding content method")
                            .await
                    }
                };
                if complete {
                    return self.dispatch_content().await;
                }
                Ok(Running::Continue)
            }

            ChannelFrame::UnknownMethod {
                class_id,
                method_id,
            } => {
                if self.receiving.is_some() {
                    return self.fatal("method frame while a message body was pending").await;
                }
                let err = Error::UnknownMethod {
                    class_id,
                    method_id,
                };
                match self.pending.take() {
                    Some(pending) => {
                        Self::fail_pending(pending, &err);
                        self.pump().await?;
                    }
                    None => warn!(class_id, method_id, "unknown method ignored"),
                }
                Ok(Running::Continue)
            }
        }
    }

    async fn on_method(&mut self, method: Method) -> Result<Running, Error> {
        match method {
            Method::ChannelClose(close) => {
                let _ = self
                    .send_frame(Frame::method(
                        self.id,
                        Method::ChannelCloseOk(channel_methods::CloseOk::default()),
                    ))
                    .await;
                self.state = ChannelState::Closed;
                let err = Error::Closed {
                    reply_code: close.reply_code,
                    reply_text: close.reply_text,
                    class_id: close.class_id,
                    method_id: close.method_id,
                };
                debug!(channel = self.id, %err, "channel closed by broker");
                self.fail_all(&err);
                Ok(Running::Stop)
            }

            Method::ChannelCloseOk(_) => match self.state {
                ChannelState::Closing => {
                    self.state = ChannelState::Closed;
                    if let Some(responder) = self.close_responder.take() {
                        let _ = responder.send(Ok(()));
                    }
                    self.fail_all(&Error::NotOpen);
                    Ok(Running::Stop)
                }
                _ => self.fatal("channel.close-ok without a pending close").await,
            },

            Method::ChannelFlow(flow) => {
                self.flow_active = flow.active;
                self.send_frame(Frame::method(
                    self.id,
                    Method::ChannelFlowOk(channel_methods::FlowOk {
                        active: flow.active,
                    }),
                ))
                .await?;
                if self.flow_active {
                    while let Some(publish) = self.flow_queue.pop_front() {
                        self.send_frames(publish.frames).await?;
                        let _ = publish.responder.send(Ok(publish.seq));
                    }
                }
                Ok(Running::Continue)
            }

            Method::BasicAck(ack) if self.confirm_mode => {
                self.settle_confirm(ack.delivery_tag, ack.multiple, true);
                Ok(Running::Continue)
            }

            Method::BasicNack(nack) if self.confirm_mode => {
                self.settle_confirm(nack.delivery_tag, nack.multiple, false);
                Ok(Running::Continue)
            }

            Method::BasicCancel(cancel) => {
                // server-initiated consumer cancellation
                match self.consumers.remove(&cancel.consumer_tag) {
                    Some(entry) => {
                        let _ = entry.tx.send(ConsumerMessage::Cancelled);
                    }
                    None => warn!(
                        consumer_tag = %cancel.consumer_tag,
                        "cancel for an unknown consumer"
                    ),
                }
                Ok(Running::Continue)
            }

            Method::BasicConsumeOk(ok) => match self.pending.take() {
                Some(Pending::Consume { no_ack, responder }) => {
                    let (tx, rx) = mpsc::unbounded_channel();
                    self.consumers
                        .insert(ok.consumer_tag.clone(), ConsumerEntry { tx, no_ack });
                    let _ = responder.send(Ok((ok.consumer_tag, rx)));
                    self.pump().await?;
                    Ok(Running::Continue)
                }
                Some(pending) => {
                    Self::fail_pending(
                        pending,
                        &Error::ProtocolViolation("mismatched synchronous reply"),
                    );
                    self.pump().await?;
                    Ok(Running::Continue)
                }
                None => {
                    warn!("consume-ok with no pending consume");
                    Ok(Running::Continue)
                }
            },

            Method::BasicGetEmpty(_) => match self.pending.take() {
                Some(Pending::Get { responder, .. }) => {
                    let _ = responder.send(Ok(None));
                    self.pump().await?;
                    Ok(Running::Continue)
                }
                Some(pending) => {
                    Self::fail_pending(
                        pending,
                        &Error::ProtocolViolation("mismatched synchronous reply"),
                    );
                    self.pump().await?;
                    Ok(Running::Continue)
                }
                None => {
                    warn!("get-empty with no pending get");
                    Ok(Running::Continue)
                }
            },

            other => {
                let ids = other.ids();
                match self.pending.take() {
                    Some(Pending::Rpc {
                        expects,
                        cancel_tag,
                        responder,
                    }) if expects == ids => {
                        if let Some(tag) = cancel_tag {
                            self.consumers.remove(&tag);
                        }
                        if matches!(other, Method::ConfirmSelectOk(_)) {
                            self.confirm_mode = true;
                        }
                        let _ = responder.send(Ok(Some(other)));
                        self.pump().await?;
                        Ok(Running::Continue)
                    }
                    Some(pending) => {
                        Self::fail_pending(
                            pending,
                            &Error::ProtocolViolation("mismatched synchronous reply"),
                        );
                        self.pump().await?;
                        Ok(Running::Continue)
                    }
                    None => {
                        warn!(method = other.name(), "method ignored with no pending waiter");
                        Ok(Running::Continue)
                    }
                }
            }
        }
    }

    /// Hands the assembled message to its queue: the consumer stream for
    /// `deliver`, the returned-message stream for `return`, the pending
    /// get waiter for `get-ok`
    async fn dispatch_content(&mut self) -> Result<Running, Error> {
        let Some(assembly) = self.receiving.take() else {
            return Ok(Running::Continue);
        };
        let Some(header) = assembly.header else {
            return Ok(Running::Continue);
        };
        let properties = header.properties;
        let body = assembly.body.freeze();

        match assembly.method {
            Method::BasicDeliver(deliver) => {
                if deliver.delivery_tag <= self.last_delivery_tag {
                    return self.fatal("delivery tag is not strictly increasing").await;
                }
                self.last_delivery_tag = deliver.delivery_tag;

                match self.consumers.get(&deliver.consumer_tag) {
                    Some(entry) => {
                        if !entry.no_ack {
                            self.outstanding.insert(deliver.delivery_tag);
                        }
                        let _ = entry.tx.send(ConsumerMessage::Delivery(Delivery {
                            consumer_tag: deliver.consumer_tag,
                            delivery_tag: deliver.delivery_tag,
                            redelivered: deliver.redelivered,
                            exchange: deliver.exchange,
                            routing_key: deliver.routing_key,
                            properties,
                            body,
                        }));
                    }
                    None => warn!(
                        consumer_tag = %deliver.consumer_tag,
                        "delivery for an unknown consumer dropped"
                    ),
                }
                Ok(Running::Continue)
            }

            Method::BasicReturn(ret) => {
                let _ = self.returned.send(ReturnedMessage {
                    reply_code: ret.reply_code,
                    reply_text: ret.reply_text,
                    exchange: ret.exchange,
                    routing_key: ret.routing_key,
                    properties,
                    body,
                });
                Ok(Running::Continue)
            }

            Method::BasicGetOk(ok) => {
                if ok.delivery_tag <= self.last_delivery_tag {
                    return self.fatal("delivery tag is not strictly increasing").await;
                }
                self.last_delivery_tag = ok.delivery_tag;

                match self.pending.take() {
                    Some(Pending::Get { no_ack, responder }) => {
                        if !no_ack {
                            self.outstanding.insert(ok.delivery_tag);
                        }
                        let _ = responder.send(Ok(Some(GetMessage {
                            delivery_tag: ok.delivery_tag,
                            redelivered: ok.redelivered,
                            exchange: ok.exchange,
                            routing_key: ok.routing_key,
                            message_count: ok.message_count,
                            properties,
                            body,
                        })));
                        self.pump().await?;
                    }
                    Some(pending) => {
                        Self::fail_pending(
                            pending,
                            &Error::ProtocolViolation("mismatched synchronous reply"),
                        );
                        self.pump().await?;
                    }
                    None => warn!("get-ok with no pending get"),
                }
                Ok(Running::Continue)
            }

            other => {
                warn!(method = other.name(), "unexpected inbound content method");
                Ok(Running::Continue)
            }
        }
    }

    #[instrument(name = "Channel::event_loop", skip(self), fields(channel = self.id))]
    async fn event_loop(mut self) -> Result<(), Error> {
        let mut outcome = Ok(());
        loop {
            let result = tokio::select! {
                control = self.control.recv(), if !self.control_closed => {
                    match control {
                        Some(control) => self.on_control(control).await,
                        None => {
                            self.control_closed = true;
                            self.on_handle_dropped().await
                        }
                    }
                },
                incoming = self.incoming.recv() => {
                    match incoming {
                        Some(frame) => self.on_incoming(frame).await,
                        None => {
                            self.fail_all(&Error::ConnectionClosed);
                            Ok(Running::Stop)
                        }
                    }
                },
            };

            let running = match result {
                Ok(running) => running,
                Err(err) => {
                    error!("{:?}", err);
                    self.fail_all(&err);
                    outcome = Err(err);
                    Running::Stop
                }
            };

            match running {
                Running::Continue => {}
                Running::Stop => break,
            }
        }

        self.state = ChannelState::Closed;
        let _ = self
            .conn_control
            .try_send(ConnectionControl::DeallocateChannel(self.id));
        debug!("Stopped");

        outcome
    }
}

fn nowait(method: &Method) -> bool {
    match method {
        Method::ExchangeDeclare(m) => m.nowait,
        Method::ExchangeDelete(m) => m.nowait,
        Method::ExchangeBind(m) => m.nowait,
        Method::ExchangeUnbind(m) => m.nowait,
        Method::QueueDeclare(m) => m.nowait,
        Method::QueueBind(m) => m.nowait,
        Method::QueuePurge(m) => m.nowait,
        Method::QueueDelete(m) => m.nowait,
        Method::BasicConsume(m) => m.nowait,
        Method::BasicCancel(m) => m.nowait,
        Method::ConfirmSelect(m) => m.nowait,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use siderite_amqp_types::BasicProperties;

    use super::*;
    use crate::frames::FramePayload;

    fn test_engine(frame_max: u32) -> (ChannelEngine, mpsc::Receiver<ConnectionControl>) {
        let (conn_control, conn_control_rx) = mpsc::channel(1);
        let (outgoing, _outgoing_rx) = mpsc::channel(16);
        let (_control_tx, control) = mpsc::channel(1);
        let (_incoming_tx, incoming) = mpsc::channel(1);
        let (returned, _) = mpsc::unbounded_channel();
        let (confirms, _) = mpsc::unbounded_channel();
        let engine = ChannelEngine::new(
            1,
            frame_max,
            WireDialect::Rabbit,
            conn_control,
            outgoing,
            control,
            incoming,
            returned,
            confirms,
            Arc::new(Mutex::new(BTreeSet::new())),
            false,
        );
        (engine, conn_control_rx)
    }

    #[test]
    fn a_10000_octet_body_splits_into_4088_4088_1824() {
        let (engine, _conn) = test_engine(4096);
        let frames = engine.content_frames(
            basic::Publish::default(),
            ContentHeader::basic(10000, BasicProperties::default()),
            Bytes::from(vec![0u8; 10000]),
        );

        let lengths: Vec<usize> = frames
            .iter()
            .filter_map(|frame| match &frame.payload {
                FramePayload::Body(body) => Some(body.len()),
                _ => None,
            })
            .collect();
        assert_eq!(lengths, [4088, 4088, 1824]);
        assert_eq!(lengths.iter().sum::<usize>(), 10000);
    }

    #[test]
    fn empty_body_emits_no_body_frames() {
        let (engine, _conn) = test_engine(4096);
        let frames = engine.content_frames(
            basic::Publish::default(),
            ContentHeader::basic(0, BasicProperties::default()),
            Bytes::new(),
        );
        assert_eq!(frames.len(), 2);
    }

    #[test]
    fn multiple_ack_settles_every_tag_up_to_the_given_one() {
        let (mut engine, _conn) = test_engine(4096);
        engine.outstanding.extend([1, 2, 3, 5]);

        assert!(engine
            .validate_ack(&Method::BasicAck(basic::Ack {
                delivery_tag: 3,
                multiple: true,
            }))
            .is_none());
        assert_eq!(engine.outstanding.iter().copied().collect::<Vec<_>>(), [5]);
    }

    #[test]
    fn duplicate_single_ack_is_rejected() {
        let (mut engine, _conn) = test_engine(4096);
        engine.outstanding.insert(7);

        let ack = Method::BasicAck(basic::Ack {
            delivery_tag: 7,
            multiple: false,
        });
        assert!(engine.validate_ack(&ack).is_none());
        assert!(matches!(
            engine.validate_ack(&ack),
            Some(Error::UnknownDeliveryTag(7))
        ));
    }

    #[test]
    fn multiple_confirm_settles_the_unconfirmed_prefix() {
        let (mut engine, _conn) = test_engine(4096);
        engine.unconfirmed.lock().extend([1, 2, 3, 4]);

        engine.settle_confirm(3, true, true);
        assert_eq!(
            engine.unconfirmed.lock().iter().copied().collect::<Vec<_>>(),
            [4]
        );
    }

    #[tokio::test]
    async fn header_without_a_content_method_closes_the_connection() {
        let (mut engine, mut conn) = test_engine(4096);
        engine.state = ChannelState::Open;

        let header = ChannelFrame::Header(ContentHeader::basic(4, BasicProperties::default()));
        match engine.on_incoming(header).await {
            Err(Error::ProtocolViolation(_)) => {}
            other => panic!("unexpected outcome: {other:?}"),
        }

        match conn.recv().await {
            Some(ConnectionControl::Close(Some((505, _)))) => {}
            _ => panic!("expected a connection close with reply code 505"),
        }
    }

    #[tokio::test]
    async fn non_increasing_delivery_tags_are_a_protocol_violation() {
        let (mut engine, mut conn) = test_engine(4096);
        engine.state = ChannelState::Open;
        engine.last_delivery_tag = 5;
        engine.receiving = Some(ContentAssembly {
            method: Method::BasicDeliver(basic::Deliver {
                consumer_tag: "ctag-1".into(),
                delivery_tag: 3,
                redelivered: false,
                exchange: String::new(),
                routing_key: "work".into(),
            }),
            header: Some(ContentHeader::basic(0, BasicProperties::default())),
            body: BytesMut::new(),
        });

        match engine.dispatch_content().await {
            Err(Error::ProtocolViolation(_)) => {}
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(matches!(
            conn.recv().await,
            Some(ConnectionControl::Close(Some((505, _))))
        ));
    }
}
