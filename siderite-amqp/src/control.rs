//! Control messages from handles to the connection and channel engines

use bytes::Bytes;
use siderite_amqp_types::definitions::ReplyCode;
use siderite_amqp_types::methods::basic;
use siderite_amqp_types::{BasicProperties, Method};
use tokio::sync::{mpsc, oneshot};

use crate::channel::content::{ConsumerMessage, GetMessage};
use crate::channel::frame::ChannelFrame;
use crate::channel::Error as ChannelError;
use crate::connection::error::AllocChannelError;

pub(crate) enum ConnectionControl {
    /// Start the close handshake, with an optional reply code and text
    /// for an error close
    Close(Option<(ReplyCode, String)>),

    /// Reserve a channel id and register its incoming-frame sender
    AllocateChannel {
        tx: mpsc::Sender<ChannelFrame>,
        responder: oneshot::Sender<Result<u16, AllocChannelError>>,
    },

    /// Release a channel id after its engine stopped
    DeallocateChannel(u16),
}

pub(crate) enum ChannelControl {
    /// Write a method and, when the registry defines a reply and `nowait`
    /// is not set, wait for it. Replies `Ok(None)` for asynchronous
    /// methods.
    Call {
        method: Method,
        responder: oneshot::Sender<Result<Option<Method>, ChannelError>>,
    },

    /// Write `basic.publish` with its header and body frames. Replies the
    /// assigned publish sequence number in confirm mode.
    Publish {
        publish: basic::Publish,
        properties: BasicProperties,
        body: Bytes,
        responder: oneshot::Sender<Result<Option<u64>, ChannelError>>,
    },

    /// `basic.get`: replies `Ok(None)` on `basic.get-empty`
    Get {
        get: basic::Get,
        responder: oneshot::Sender<Result<Option<GetMessage>, ChannelError>>,
    },

    /// `basic.consume`: replies the consumer tag and the delivery stream
    Consume {
        consume: basic::Consume,
        #[allow(clippy::type_complexity)]
        responder: oneshot::Sender<
            Result<(String, mpsc::UnboundedReceiver<ConsumerMessage>), ChannelError>,
        >,
    },

    /// Start the channel close handshake
    Close {
        responder: oneshot::Sender<Result<(), ChannelError>>,
    },
}
