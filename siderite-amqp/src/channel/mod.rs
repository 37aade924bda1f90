//! Implementation of the AMQP 0-9-1 channel
//!
//! A channel is a logical, independently flow-controlled session
//! multiplexed over one connection. [`ChannelHandle`] submits operations to
//! the channel's [engine](engine::ChannelEngine) task and awaits their
//! replies; at most one synchronous method is in flight per channel, with
//! concurrent callers serialized in FIFO order behind it.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use siderite_amqp_types::methods::{basic, channel as channel_methods, confirm, exchange, queue, tx};
use siderite_amqp_types::{BasicProperties, Method};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::control::ChannelControl;

pub mod content;
pub(crate) mod engine;
pub(crate) mod frame;

mod error;
pub use error::{Error, OpenError};

use self::content::{Confirm, ConsumerMessage, GetMessage, ReturnedMessage};

/// A handle to a channel's event loop.
///
/// Dropping the handle starts a normal close handshake.
#[allow(dead_code)]
pub struct ChannelHandle {
    id: u16,
    control: mpsc::Sender<ChannelControl>,
    engine_handle: JoinHandle<Result<(), Error>>,
    returned: mpsc::UnboundedReceiver<ReturnedMessage>,
    confirms: mpsc::UnboundedReceiver<Confirm>,
    unconfirmed: Arc<Mutex<BTreeSet<u64>>>,
    read_timeout: Option<Duration>,
}

impl std::fmt::Debug for ChannelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelHandle").field("id", &self.id).finish()
    }
}

impl Drop for ChannelHandle {
    fn drop(&mut self) {
        let (responder, _) = oneshot::channel();
        let _ = self.control.try_send(ChannelControl::Close { responder });
    }
}

impl ChannelHandle {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: u16,
        control: mpsc::Sender<ChannelControl>,
        engine_handle: JoinHandle<Result<(), Error>>,
        returned: mpsc::UnboundedReceiver<ReturnedMessage>,
        confirms: mpsc::UnboundedReceiver<Confirm>,
        unconfirmed: Arc<Mutex<BTreeSet<u64>>>,
        read_timeout: Option<Duration>,
    ) -> Self {
        Self {
            id,
            control,
            engine_handle,
            returned,
            confirms,
            unconfirmed,
            read_timeout,
        }
    }

    /// The channel id on the wire
    pub fn id(&self) -> u16 {
        self.id
    }

    /// Checks if the underlying event loop has stopped
    pub fn is_closed(&self) -> bool {
        self.control.is_closed()
    }

    async fn await_reply<T>(
        &self,
        rx: oneshot::Receiver<Result<T, Error>>,
    ) -> Result<T, Error> {
        let wait = async { rx.await.map_err(|_| Error::NotOpen)? };
        match self.read_timeout {
            Some(timeout) => tokio::time::timeout(timeout, wait)
                .await
                .map_err(|_| Error::Timeout)?,
            None => wait.await,
        }
    }

    async fn call(&self, method: Method) -> Result<Option<Method>, Error> {
        let (responder, rx) = oneshot::channel();
        self.control
            .send(ChannelControl::Call { method, responder })
            .await
            .map_err(|_| Error::NotOpen)?;
        self.await_reply(rx).await
    }

    /// Declares an exchange
    pub async fn exchange_declare(&self, args: exchange::Declare) -> Result<(), Error> {
        self.call(Method::ExchangeDeclare(args)).await.map(|_| ())
    }

    /// Deletes an exchange
    pub async fn exchange_delete(&self, args: exchange::Delete) -> Result<(), Error> {
        self.call(Method::ExchangeDelete(args)).await.map(|_| ())
    }

    /// Binds an exchange to another exchange
    pub async fn exchange_bind(&self, args: exchange::Bind) -> Result<(), Error> {
        self.call(Method::ExchangeBind(args)).await.map(|_| ())
    }

    /// Unbinds an exchange from an exchange
    pub async fn exchange_unbind(&self, args: exchange::Unbind) -> Result<(), Error> {
        self.call(Method::ExchangeUnbind(args)).await.map(|_| ())
    }

    /// Declares a queue, returning its name and counters
    pub async fn queue_declare(&self, args: queue::Declare) -> Result<queue::DeclareOk, Error> {
        match self.call(Method::QueueDeclare(args)).await? {
            Some(Method::QueueDeclareOk(ok)) => Ok(ok),
            None => Ok(queue::DeclareOk::default()),
            Some(_) => Err(Error::ProtocolViolation("mismatched synchronous reply")),
        }
    }

    /// Binds a queue to an exchange
    pub async fn queue_bind(&self, args: queue::Bind) -> Result<(), Error> {
        self.call(Method::QueueBind(args)).await.map(|_| ())
    }

    /// Unbinds a queue from an exchange
    pub async fn queue_unbind(&self, args: queue::Unbind) -> Result<(), Error> {
        self.call(Method::QueueUnbind(args)).await.map(|_| ())
    }

    /// Purges a queue, returning the number of messages removed
    pub async fn queue_purge(&self, args: queue::Purge) -> Result<u32, Error> {
        match self.call(Method::QueuePurge(args)).await? {
            Some(Method::QueuePurgeOk(ok)) => Ok(ok.message_count),
            None => Ok(0),
            Some(_) => Err(Error::ProtocolViolation("mismatched synchronous reply")),
        }
    }

    /// Deletes a queue, returning the number of messages it held
    pub async fn queue_delete(&self, args: queue::Delete) -> Result<u32, Error> {
        match self.call(Method::QueueDelete(args)).await? {
            Some(Method::QueueDeleteOk(ok)) => Ok(ok.message_count),
            None => Ok(0),
            Some(_) => Err(Error::ProtocolViolation("mismatched synchronous reply")),
        }
    }

    /// Sets the prefetch window
    pub async fn qos(&self, args: basic::Qos) -> Result<(), Error> {
        self.call(Method::BasicQos(args)).await.map(|_| ())
    }

    /// Starts a consumer, returning its tag and delivery stream.
    ///
    /// The stream ends when the consumer is cancelled or the channel
    /// closes; a broker-initiated cancel is announced with
    /// [`ConsumerMessage::Cancelled`].
    pub async fn consume(
        &self,
        args: basic::Consume,
    ) -> Result<(String, mpsc::UnboundedReceiver<ConsumerMessage>), Error> {
        let (responder, rx) = oneshot::channel();
        self.control
            .send(ChannelControl::Consume {
                consume: args,
                responder,
            })
            .await
            .map_err(|_| Error::NotOpen)?;
        self.await_reply(rx).await
    }

    /// Cancels a consumer
    pub async fn cancel(&self, args: basic::Cancel) -> Result<(), Error> {
        self.call(Method::BasicCancel(args)).await.map(|_| ())
    }

    /// Publishes a message.
    ///
    /// The method, header and body frames are written contiguously for
    /// this channel, with body frames split at `frame_max - 8` octets.
    /// Returns the publish sequence number when the channel is in confirm
    /// mode.
    pub async fn publish(
        &self,
        args: basic::Publish,
        properties: BasicProperties,
        body: impl Into<Bytes>,
    ) -> Result<Option<u64>, Error> {
        let (responder, rx) = oneshot::channel();
        self.control
            .send(ChannelControl::Publish {
                publish: args,
                properties,
                body: body.into(),
                responder,
            })
            .await
            .map_err(|_| Error::NotOpen)?;
        self.await_reply(rx).await
    }

    /// Fetches a single message, `None` when the queue is empty
    pub async fn get(&self, args: basic::Get) -> Result<Option<GetMessage>, Error> {
        let (responder, rx) = oneshot::channel();
        self.control
            .send(ChannelControl::Get {
                get: args,
                responder,
            })
            .await
            .map_err(|_| Error::NotOpen)?;
        self.await_reply(rx).await
    }

    /// Acknowledges a delivery, or all unacknowledged deliveries up to the
    /// tag with `multiple`
    pub async fn ack(&self, args: basic::Ack) -> Result<(), Error> {
        self.call(Method::BasicAck(args)).await.map(|_| ())
    }

    /// Negatively acknowledges one or more deliveries
    pub async fn nack(&self, args: basic::Nack) -> Result<(), Error> {
        self.call(Method::BasicNack(args)).await.map(|_| ())
    }

    /// Rejects a single delivery
    pub async fn reject(&self, args: basic::Reject) -> Result<(), Error> {
        self.call(Method::BasicReject(args)).await.map(|_| ())
    }

    /// Redelivers all unacknowledged messages on this channel
    pub async fn recover(&self, requeue: bool) -> Result<(), Error> {
        self.call(Method::BasicRecover(basic::Recover { requeue }))
            .await
            .map(|_| ())
    }

    /// Deprecated fire-and-forget form of [`recover`](Self::recover)
    pub async fn recover_async(&self, requeue: bool) -> Result<(), Error> {
        self.call(Method::BasicRecoverAsync(basic::RecoverAsync { requeue }))
            .await
            .map(|_| ())
    }

    /// Asks the peer to pause or resume content methods, returning the
    /// peer's answer
    pub async fn flow(&self, active: bool) -> Result<bool, Error> {
        match self
            .call(Method::ChannelFlow(channel_methods::Flow { active }))
            .await?
        {
            Some(Method::ChannelFlowOk(ok)) => Ok(ok.active),
            _ => Err(Error::ProtocolViolation("mismatched synchronous reply")),
        }
    }

    /// Puts the channel in publisher-confirm mode. Publishes are assigned
    /// increasing sequence numbers and settle through
    /// [`next_confirm`](Self::next_confirm).
    pub async fn confirm_select(&self) -> Result<(), Error> {
        self.call(Method::ConfirmSelect(confirm::Select { nowait: false }))
            .await
            .map(|_| ())
    }

    /// Puts the channel in transacted mode
    pub async fn tx_select(&self) -> Result<(), Error> {
        self.call(Method::TxSelect(tx::Select::default()))
            .await
            .map(|_| ())
    }

    /// Commits the current transaction
    pub async fn tx_commit(&self) -> Result<(), Error> {
        self.call(Method::TxCommit(tx::Commit::default()))
            .await
            .map(|_| ())
    }

    /// Abandons the current transaction
    pub async fn tx_rollback(&self) -> Result<(), Error> {
        self.call(Method::TxRollback(tx::Rollback::default()))
            .await
            .map(|_| ())
    }

    /// The next message returned by the broker as unroutable
    pub async fn next_returned(&mut self) -> Option<ReturnedMessage> {
        self.returned.recv().await
    }

    /// The next publisher-confirm outcome
    pub async fn next_confirm(&mut self) -> Option<Confirm> {
        self.confirms.recv().await
    }

    /// Number of publishes awaiting a broker confirm
    pub fn unconfirmed_count(&self) -> usize {
        self.unconfirmed.lock().len()
    }

    /// Closes the channel and waits for `channel.close-ok`
    pub async fn close(&mut self) -> Result<(), Error> {
        let (responder, rx) = oneshot::channel();
        if self
            .control
            .send(ChannelControl::Close { responder })
            .await
            .is_err()
        {
            // engine already stopped
            return Ok(());
        }
        self.await_reply(rx).await
    }
}
