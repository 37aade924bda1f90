//! The method classes and the registry mapping `(class_id, method_id)`
//! pairs onto their argument schemas
//!
//! Argument schemas are expressed as typed structs whose `encode`/`decode`
//! impls read and write the ordered primitive sequence, packing consecutive
//! boolean arguments into shared octets LSB-first. [`Method`] is the sum of
//! every known method; [`descriptor`] exposes the registry metadata that
//! drives dispatch: the method name, whether the method carries content, and
//! the reply a synchronous request waits for.

use bytes::{BufMut, Bytes, BytesMut};

use crate::definitions::{
    CLASS_BASIC, CLASS_CHANNEL, CLASS_CONFIRM, CLASS_CONNECTION, CLASS_EXCHANGE, CLASS_QUEUE,
    CLASS_TX,
};
use crate::error::{DecodeError, EncodeError};
use crate::primitives::{read_u16, WireDialect};

pub mod basic;
pub mod channel;
pub mod confirm;
pub mod connection;
pub mod exchange;
pub mod queue;
pub mod tx;

/// Any method of any known class
#[derive(Debug, Clone, PartialEq)]
pub enum Method {
    /// `connection.start`
    ConnectionStart(connection::Start),
    /// `connection.start-ok`
    ConnectionStartOk(connection::StartOk),
    /// `connection.secure`
    ConnectionSecure(connection::Secure),
    /// `connection.secure-ok`
    ConnectionSecureOk(connection::SecureOk),
    /// `connection.tune`
    ConnectionTune(connection::Tune),
    /// `connection.tune-ok`
    ConnectionTuneOk(connection::TuneOk),
    /// `connection.open`
    ConnectionOpen(connection::Open),
    /// `connection.open-ok`
    ConnectionOpenOk(connection::OpenOk),
    /// `connection.close`
    ConnectionClose(connection::Close),
    /// `connection.close-ok`
    ConnectionCloseOk(connection::CloseOk),
    /// `connection.blocked`
    ConnectionBlocked(connection::Blocked),
    /// `connection.unblocked`
    ConnectionUnblocked(connection::Unblocked),

    /// `channel.open`
    ChannelOpen(channel::Open),
    /// `channel.open-ok`
    ChannelOpenOk(channel::OpenOk),
    /// `channel.flow`
    ChannelFlow(channel::Flow),
    /// `channel.flow-ok`
    ChannelFlowOk(channel::FlowOk),
    /// `channel.close`
    ChannelClose(channel::Close),
    /// `channel.close-ok`
    ChannelCloseOk(channel::CloseOk),

    /// `exchange.declare`
    ExchangeDeclare(exchange::Declare),
    /// `exchange.declare-ok`
    ExchangeDeclareOk(exchange::DeclareOk),
    /// `exchange.delete`
    ExchangeDelete(exchange::Delete),
    /// `exchange.delete-ok`
    ExchangeDeleteOk(exchange::DeleteOk),
    /// `exchange.bind`
    ExchangeBind(exchange::Bind),
    /// `exchange.bind-ok`
    ExchangeBindOk(exchange::BindOk),
    /// `exchange.unbind`
    ExchangeUnbind(exchange::Unbind),
    /// `exchange.unbind-ok`
    ExchangeUnbindOk(exchange::UnbindOk),

    /// `queue.declare`
    QueueDeclare(queue::Declare),
    /// `queue.declare-ok`
    QueueDeclareOk(queue::DeclareOk),
    /// `queue.bind`
    QueueBind(queue::Bind),
    /// `queue.bind-ok`
    QueueBindOk(queue::BindOk),
    /// `queue.purge`
    QueuePurge(queue::Purge),
    /// `queue.purge-ok`
    QueuePurgeOk(queue::PurgeOk),
    /// `queue.delete`
    QueueDelete(queue::Delete),
    /// `queue.delete-ok`
    QueueDeleteOk(queue::DeleteOk),
    /// `queue.unbind`
    QueueUnbind(queue::Unbind),
    /// `queue.unbind-ok`
    QueueUnbindOk(queue::UnbindOk),

    /// `basic.qos`
    BasicQos(basic::Qos),
    /// `basic.qos-ok`
    BasicQosOk(basic::QosOk),
    /// `basic.consume`
    BasicConsume(basic::Consume),
    /// `basic.consume-ok`
    BasicConsumeOk(basic::ConsumeOk),
    /// `basic.cancel`
    BasicCancel(basic::Cancel),
    /// `basic.cancel-ok`
    BasicCancelOk(basic::CancelOk),
    /// `basic.publish`
    BasicPublish(basic::Publish),
    /// `basic.return`
    BasicReturn(basic::Return),
    /// `basic.deliver`
    BasicDeliver(basic::Deliver),
    /// `basic.get`
    BasicGet(basic::Get),
    /// `basic.get-ok`
    BasicGetOk(basic::GetOk),
    /// `basic.get-empty`
    BasicGetEmpty(basic::GetEmpty),
    /// `basic.ack`
    BasicAck(basic::Ack),
    /// `basic.reject`
    BasicReject(basic::Reject),
    /// `basic.recover-async`
    BasicRecoverAsync(basic::RecoverAsync),
    /// `basic.recover`
    BasicRecover(basic::Recover),
    /// `basic.recover-ok`
    BasicRecoverOk(basic::RecoverOk),
    /// `basic.nack`
    BasicNack(basic::Nack),

    /// `confirm.select`
    ConfirmSelect(confirm::Select),
    /// `confirm.select-ok`
    ConfirmSelectOk(confirm::SelectOk),

    /// `tx.select`
    TxSelect(tx::Select),
    /// `tx.select-ok`
    TxSelectOk(tx::SelectOk),
    /// `tx.commit`
    TxCommit(tx::Commit),
    /// `tx.commit-ok`
    TxCommitOk(tx::CommitOk),
    /// `tx.rollback`
    TxRollback(tx::Rollback),
    /// `tx.rollback-ok`
    TxRollbackOk(tx::RollbackOk),
}

/// Registry metadata for one `(class_id, method_id)` pair
#[derive(Debug, Clone, Copy)]
pub struct MethodDescriptor {
    /// Class id
    pub class_id: u16,
    /// Method id within the class
    pub method_id: u16,
    /// Dotted method name, e.g. `queue.declare`
    pub name: &'static str,
    /// Whether a content header and body follow the method frame
    pub carries_content: bool,
    /// The `(class_id, method_id)` a synchronous request waits for.
    ///
    /// `basic.get` additionally accepts `basic.get-empty`.
    pub reply: Option<(u16, u16)>,
}

macro_rules! registry {
    ($(($class:expr, $method:expr, $name:literal, $content:expr, $reply:expr),)*) => {
        static REGISTRY: &[MethodDescriptor] = &[
            $(MethodDescriptor {
                class_id: $class,
                method_id: $method,
                name: $name,
                carries_content: $content,
                reply: $reply,
            },)*
        ];
    };
}

registry! {
    (CLASS_CONNECTION, 10, "connection.start", false, Some((CLASS_CONNECTION, 11))),
    (CLASS_CONNECTION, 11, "connection.start-ok", false, None),
    (CLASS_CONNECTION, 20, "connection.secure", false, Some((CLASS_CONNECTION, 21))),
    (CLASS_CONNECTION, 21, "connection.secure-ok", false, None),
    (CLASS_CONNECTION, 30, "connection.tune", false, Some((CLASS_CONNECTION, 31))),
    (CLASS_CONNECTION, 31, "connection.tune-ok", false, None),
    (CLASS_CONNECTION, 40, "connection.open", false, Some((CLASS_CONNECTION, 41))),
    (CLASS_CONNECTION, 41, "connection.open-ok", false, None),
    (CLASS_CONNECTION, 50, "connection.close", false, Some((CLASS_CONNECTION, 51))),
    (CLASS_CONNECTION, 51, "connection.close-ok", false, None),
    (CLASS_CONNECTION, 60, "connection.blocked", false, None),
    (CLASS_CONNECTION, 61, "connection.unblocked", false, None),

    (CLASS_CHANNEL, 10, "channel.open", false, Some((CLASS_CHANNEL, 11))),
    (CLASS_CHANNEL, 11, "channel.open-ok", false, None),
    (CLASS_CHANNEL, 20, "channel.flow", false, Some((CLASS_CHANNEL, 21))),
    (CLASS_CHANNEL, 21, "channel.flow-ok", false, None),
    (CLASS_CHANNEL, 40, "channel.close", false, Some((CLASS_CHANNEL, 41))),
    (CLASS_CHANNEL, 41, "channel.close-ok", false, None),

    (CLASS_EXCHANGE, 10, "exchange.declare", false, Some((CLASS_EXCHANGE, 11))),
    (CLASS_EXCHANGE, 11, "exchange.declare-ok", false, None),
    (CLASS_EXCHANGE, 20, "exchange.delete", false, Some((CLASS_EXCHANGE, 21))),
    (CLASS_EXCHANGE, 21, "exchange.delete-ok", false, None),
    (CLASS_EXCHANGE, 30, "exchange.bind", false, Some((CLASS_EXCHANGE, 31))),
    (CLASS_EXCHANGE, 31, "exchange.bind-ok", false, None),
    (CLASS_EXCHANGE, 40, "exchange.unbind", false, Some((CLASS_EXCHANGE, 51))),
    (CLASS_EXCHANGE, 51, "exchange.unbind-ok", false, None),

    (CLASS_QUEUE, 10, "queue.declare", false, Some((CLASS_QUEUE, 11))),
    (CLASS_QUEUE, 11, "queue.declare-ok", false, None),
    (CLASS_QUEUE, 20, "queue.bind", false, Some((CLASS_QUEUE, 21))),
    (CLASS_QUEUE, 21, "queue.bind-ok", false, None),
    (CLASS_QUEUE, 30, "queue.purge", false, Some((CLASS_QUEUE, 31))),
    (CLASS_QUEUE, 31, "queue.purge-ok", false, None),
    (CLASS_QUEUE, 40, "queue.delete", false, Some((CLASS_QUEUE, 41))),
    (CLASS_QUEUE, 41, "queue.delete-ok", false, None),
    (CLASS_QUEUE, 50, "queue.unbind", false, Some((CLASS_QUEUE, 51))),
    (CLASS_QUEUE, 51, "queue.unbind-ok", false, None),

    (CLASS_BASIC, 10, "basic.qos", false, Some((CLASS_BASIC, 11))),
    (CLASS_BASIC, 11, "basic.qos-ok", false, None),
    (CLASS_BASIC, 20, "basic.consume", false, Some((CLASS_BASIC, 21))),
    (CLASS_BASIC, 21, "basic.consume-ok", false, None),
    (CLASS_BASIC, 30, "basic.cancel", false, Some((CLASS_BASIC, 31))),
    (CLASS_BASIC, 31, "basic.cancel-ok", false, None),
    (CLASS_BASIC, 40, "basic.publish", true, None),
    (CLASS_BASIC, 50, "basic.return", true, None),
    (CLASS_BASIC, 60, "basic.deliver", true, None),
    (CLASS_BASIC, 70, "basic.get", false, Some((CLASS_BASIC, 71))),
    (CLASS_BASIC, 71, "basic.get-ok", true, None),
    (CLASS_BASIC, 72, "basic.get-empty", false, None),
    (CLASS_BASIC, 80, "basic.ack", false, None),
    (CLASS_BASIC, 90, "basic.reject", false, None),
    (CLASS_BASIC, 100, "basic.recover-async", false, None),
    (CLASS_BASIC, 110, "basic.recover", false, Some((CLASS_BASIC, 111))),
    (CLASS_BASIC, 111, "basic.recover-ok", false, None),
    (CLASS_BASIC, 120, "basic.nack", false, None),

    (CLASS_CONFIRM, 10, "confirm.select", false, Some((CLASS_CONFIRM, 11))),
    (CLASS_CONFIRM, 11, "confirm.select-ok", false, None),

    (CLASS_TX, 10, "tx.select", false, Some((CLASS_TX, 11))),
    (CLASS_TX, 11, "tx.select-ok", false, None),
    (CLASS_TX, 20, "tx.commit", false, Some((CLASS_TX, 21))),
    (CLASS_TX, 21, "tx.commit-ok", false, None),
    (CLASS_TX, 30, "tx.rollback", false, Some((CLASS_TX, 31))),
    (CLASS_TX, 31, "tx.rollback-ok", false, None),
}

/// Looks up registry metadata, `None` for unknown pairs
pub fn descriptor(class_id: u16, method_id: u16) -> Option<&'static MethodDescriptor> {
    REGISTRY
        .iter()
        .find(|d| d.class_id == class_id && d.method_id == method_id)
}

impl Method {
    /// The `(class_id, method_id)` pair of this method
    pub fn ids(&self) -> (u16, u16) {
        match self {
            Method::ConnectionStart(_) => (CLASS_CONNECTION, 10),
            Method::ConnectionStartOk(_) => (CLASS_CONNECTION, 11),
            Method::ConnectionSecure(_) => (CLASS_CONNECTION, 20),
            Method::ConnectionSecureOk(_) => (CLASS_CONNECTION, 21),
            Method::ConnectionTune(_) => (CLASS_CONNECTION, 30),
            Method::ConnectionTuneOk(_) => (CLASS_CONNECTION, 31),
            Method::ConnectionOpen(_) => (CLASS_CONNECTION, 40),
            Method::ConnectionOpenOk(_) => (CLASS_CONNECTION, 41),
            Method::ConnectionClose(_) => (CLASS_CONNECTION, 50),
            Method::ConnectionCloseOk(_) => (CLASS_CONNECTION, 51),
            Method::ConnectionBlocked(_) => (CLASS_CONNECTION, 60),
            Method::ConnectionUnblocked(_) => (CLASS_CONNECTION, 61),

            Method::ChannelOpen(_) => (CLASS_CHANNEL, 10),
            Method::ChannelOpenOk(_) => (CLASS_CHANNEL, 11),
            Method::ChannelFlow(_) => (CLASS_CHANNEL, 20),
            Method::ChannelFlowOk(_) => (CLASS_CHANNEL, 21),
            Method::ChannelClose(_) => (CLASS_CHANNEL, 40),
            Method::ChannelCloseOk(_) => (CLASS_CHANNEL, 41),

            Method::ExchangeDeclare(_) => (CLASS_EXCHANGE, 10),
            Method::ExchangeDeclareOk(_) => (CLASS_EXCHANGE, 11),
            Method::ExchangeDelete(_) => (CLASS_EXCHANGE, 20),
            Method::ExchangeDeleteOk(_) => (CLASS_EXCHANGE, 21),
            Method::ExchangeBind(_) => (CLASS_EXCHANGE, 30),
            Method::ExchangeBindOk(_) => (CLASS_EXCHANGE, 31),
            Method::ExchangeUnbind(_) => (CLASS_EXCHANGE, 40),
            Method::ExchangeUnbindOk(_) => (CLASS_EXCHANGE, 51),

            Method::QueueDeclare(_) => (CLASS_QUEUE, 10),
            Method::QueueDeclareOk(_) => (CLASS_QUEUE, 11),
            Method::QueueBind(_) => (CLASS_QUEUE, 20),
            Method::QueueBindOk(_) => (CLASS_QUEUE, 21),
            Method::QueuePurge(_) => (CLASS_QUEUE, 30),
            Method::QueuePurgeOk(_) => (CLASS_QUEUE, 31),
            Method::QueueDelete(_) => (CLASS_QUEUE, 40),
            Method::QueueDeleteOk(_) => (CLASS_QUEUE, 41),
            Method::QueueUnbind(_) => (CLASS_QUEUE, 50),
            Method::QueueUnbindOk(_) => (CLASS_QUEUE, 51),

            Method::BasicQos(_) => (CLASS_BASIC, 10),
            Method::BasicQosOk(_) => (CLASS_BASIC, 11),
            Method::BasicConsume(_) => (CLASS_BASIC, 20),
            Method::BasicConsumeOk(_) => (CLASS_BASIC, 21),
            Method::BasicCancel(_) => (CLASS_BASIC, 30),
            Method::BasicCancelOk(_) => (CLASS_BASIC, 31),
            Method::BasicPublish(_) => (CLASS_BASIC, 40),
            Method::BasicReturn(_) => (CLASS_BASIC, 50),
            Method::BasicDeliver(_) => (CLASS_BASIC, 60),
            Method::BasicGet(_) => (CLASS_BASIC, 70),
            Method::BasicGetOk(_) => (CLASS_BASIC, 71),
            Method::BasicGetEmpty(_) => (CLASS_BASIC, 72),
            Method::BasicAck(_) => (CLASS_BASIC, 80),
            Method::BasicReject(_) => (CLASS_BASIC, 90),
            Method::BasicRecoverAsync(_) => (CLASS_BASIC, 100),
            Method::BasicRecover(_) => (CLASS_BASIC, 110),
            Method::BasicRecoverOk(_) => (CLASS_BASIC, 111),
            Method::BasicNack(_) => (CLASS_BASIC, 120),

            Method::ConfirmSelect(_) => (CLASS_CONFIRM, 10),
            Method::ConfirmSelectOk(_) => (CLASS_CONFIRM, 11),

            Method::TxSelect(_) => (CLASS_TX, 10),
            Method::TxSelectOk(_) => (CLASS_TX, 11),
            Method::TxCommit(_) => (CLASS_TX, 20),
            Method::TxCommitOk(_) => (CLASS_TX, 21),
            Method::TxRollback(_) => (CLASS_TX, 30),
            Method::TxRollbackOk(_) => (CLASS_TX, 31),
        }
    }

    /// Dotted method name for diagnostics
    pub fn name(&self) -> &'static str {
        let (class_id, method_id) = self.ids();
        descriptor(class_id, method_id).map_or("unknown", |d| d.name)
    }

    /// Whether a content header and body frames follow this method
    pub fn carries_content(&self) -> bool {
        matches!(
            self,
            Method::BasicPublish(_)
                | Method::BasicReturn(_)
                | Method::BasicDeliver(_)
                | Method::BasicGetOk(_)
        )
    }

    /// The reply a synchronous request waits for
    pub fn reply(&self) -> Option<(u16, u16)> {
        let (class_id, method_id) = self.ids();
        descriptor(class_id, method_id).and_then(|d| d.reply)
    }

    /// Appends `class_id`, `method_id` and the argument sequence to `dst`
    pub fn encode(&self, dialect: WireDialect, dst: &mut BytesMut) -> Result<(), EncodeError> {
        let (class_id, method_id) = self.ids();
        dst.put_u16(class_id);
        dst.put_u16(method_id);

        match self {
            Method::ConnectionStart(m) => m.encode(dialect, dst),
            Method::ConnectionStartOk(m) => m.encode(dialect, dst),
            Method::ConnectionSecure(m) => m.encode(dst),
            Method::ConnectionSecureOk(m) => m.encode(dst),
            Method::ConnectionTune(m) => m.encode(dst),
            Method::ConnectionTuneOk(m) => m.encode(dst),
            Method::ConnectionOpen(m) => m.encode(dst),
            Method::ConnectionOpenOk(m) => m.encode(dst),
            Method::ConnectionClose(m) => m.encode(dst),
            Method::ConnectionCloseOk(_) => Ok(()),
            Method::ConnectionBlocked(m) => m.encode(dst),
            Method::ConnectionUnblocked(_) => Ok(()),

            Method::ChannelOpen(m) => m.encode(dst),
            Method::ChannelOpenOk(m) => m.encode(dst),
            Method::ChannelFlow(m) => m.encode(dst),
            Method::ChannelFlowOk(m) => m.encode(dst),
            Method::ChannelClose(m) => m.encode(dst),
            Method::ChannelCloseOk(_) => Ok(()),

            Method::ExchangeDeclare(m) => m.encode(dialect, dst),
            Method::ExchangeDeclareOk(_) => Ok(()),
            Method::ExchangeDelete(m) => m.encode(dst),
            Method::ExchangeDeleteOk(_) => Ok(()),
            Method::ExchangeBind(m) => m.encode(dialect, dst),
            Method::ExchangeBindOk(_) => Ok(()),
            Method::ExchangeUnbind(m) => m.encode(dialect, dst),
            Method::ExchangeUnbindOk(_) => Ok(()),

            Method::QueueDeclare(m) => m.encode(dialect, dst),
            Method::QueueDeclareOk(m) => m.encode(dst),
            Method::QueueBind(m) => m.encode(dialect, dst),
            Method::QueueBindOk(_) => Ok(()),
            Method::QueuePurge(m) => m.encode(dst),
            Method::QueuePurgeOk(m) => m.encode(dst),
            Method::QueueDelete(m) => m.encode(dst),
            Method::QueueDeleteOk(m) => m.encode(dst),
            Method::QueueUnbind(m) => m.encode(dialect, dst),
            Method::QueueUnbindOk(_) => Ok(()),

            Method::BasicQos(m) => m.encode(dst),
            Method::BasicQosOk(_) => Ok(()),
            Method::BasicConsume(m) => m.encode(dialect, dst),
            Method::BasicConsumeOk(m) => m.encode(dst),
            Method::BasicCancel(m) => m.encode(dst),
            Method::BasicCancelOk(m) => m.encode(dst),
            Method::BasicPublish(m) => m.encode(dst),
            Method::BasicReturn(m) => m.encode(dst),
            Method::BasicDeliver(m) => m.encode(dst),
            Method::BasicGet(m) => m.encode(dst),
            Method::BasicGetOk(m) => m.encode(dst),
            Method::BasicGetEmpty(m) => m.encode(dst),
            Method::BasicAck(m) => m.encode(dst),
            Method::BasicReject(m) => m.encode(dst),
            Method::BasicRecoverAsync(m) => m.encode(dst),
            Method::BasicRecover(m) => m.encode(dst),
            Method::BasicRecoverOk(_) => Ok(()),
            Method::BasicNack(m) => m.encode(dst),

            Method::ConfirmSelect(m) => m.encode(dst),
            Method::ConfirmSelectOk(_) => Ok(()),

            Method::TxSelect(_)
            | Method::TxSelectOk(_)
            | Method::TxCommit(_)
            | Method::TxCommitOk(_)
            | Method::TxRollback(_)
            | Method::TxRollbackOk(_) => Ok(()),
        }
    }

    /// Reads `class_id`, `method_id` and the argument sequence from `src`.
    ///
    /// A pair absent from the registry fails with
    /// [`DecodeError::UnknownMethod`]; the caller decides whether that is
    /// connection-fatal (channel 0) or scoped to a channel waiter.
    pub fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        let class_id = read_u16(src)?;
        let method_id = read_u16(src)?;

        let method = match (class_id, method_id) {
            (CLASS_CONNECTION, 10) => Method::ConnectionStart(connection::Start::decode(src)?),
            (CLASS_CONNECTION, 11) => Method::ConnectionStartOk(connection::StartOk::decode(src)?),
            (CLASS_CONNECTION, 20) => Method::ConnectionSecure(connection::Secure::decode(src)?),
            (CLASS_CONNECTION, 21) => {
                Method::ConnectionSecureOk(connection::SecureOk::decode(src)?)
            }
            (CLASS_CONNECTION, 30) => Method::ConnectionTune(connection::Tune::decode(src)?),
            (CLASS_CONNECTION, 31) => Method::ConnectionTuneOk(connection::TuneOk::decode(src)?),
            (CLASS_CONNECTION, 40) => Method::ConnectionOpen(connection::Open::decode(src)?),
            (CLASS_CONNECTION, 41) => Method::ConnectionOpenOk(connection::OpenOk::decode(src)?),
            (CLASS_CONNECTION, 50) => Method::ConnectionClose(connection::Close::decode(src)?),
            (CLASS_CONNECTION, 51) => Method::ConnectionCloseOk(connection::CloseOk::default()),
            (CLASS_CONNECTION, 60) => Method::ConnectionBlocked(connection::Blocked::decode(src)?),
            (CLASS_CONNECTION, 61) => {
                Method::ConnectionUnblocked(connection::Unblocked::default())
            }

            (CLASS_CHANNEL, 10) => Method::ChannelOpen(channel::Open::decode(src)?),
            (CLASS_CHANNEL, 11) => Method::ChannelOpenOk(channel::OpenOk::decode(src)?),
            (CLASS_CHANNEL, 20) => Method::ChannelFlow(channel::Flow::decode(src)?),
            (CLASS_CHANNEL, 21) => Method::ChannelFlowOk(channel::FlowOk::decode(src)?),
            (CLASS_CHANNEL, 40) => Method::ChannelClose(channel::Close::decode(src)?),
            (CLASS_CHANNEL, 41) => Method::ChannelCloseOk(channel::CloseOk::default()),

            (CLASS_EXCHANGE, 10) => Method::ExchangeDeclare(exchange::Declare::decode(src)?),
            (CLASS_EXCHANGE, 11) => Method::ExchangeDeclareOk(exchange::DeclareOk::default()),
            (CLASS_EXCHANGE, 20) => Method::ExchangeDelete(exchange::Delete::decode(src)?),
            (CLASS_EXCHANGE, 21) => Method::ExchangeDeleteOk(exchange::DeleteOk::default()),
            (CLASS_EXCHANGE, 30) => Method::ExchangeBind(exchange::Bind::decode(src)?),
            (CLASS_EXCHANGE, 31) => Method::ExchangeBindOk(exchange::BindOk::default()),
            (CLASS_EXCHANGE, 40) => Method::ExchangeUnbind(exchange::Unbind::decode(src)?),
            (CLASS_EXCHANGE, 51) => Method::ExchangeUnbindOk(exchange::UnbindOk::default()),

            (CLASS_QUEUE, 10) => Method::QueueDeclare(queue::Declare::decode(src)?),
            (CLASS_QUEUE, 11) => Method::QueueDeclareOk(queue::DeclareOk::decode(src)?),
            (CLASS_QUEUE, 20) => Method::QueueBind(queue::Bind::decode(src)?),
            (CLASS_QUEUE, 21) => Method::QueueBindOk(queue::BindOk::default()),
            (CLASS_QUEUE, 30) => Method::QueuePurge(queue::Purge::decode(src)?),
            (CLASS_QUEUE, 31) => Method::QueuePurgeOk(queue::PurgeOk::decode(src)?),
            (CLASS_QUEUE, 40) => Method::QueueDelete(queue::Delete::decode(src)?),
            (CLASS_QUEUE, 41) => Method::QueueDeleteOk(queue::DeleteOk::decode(src)?),
            (CLASS_QUEUE, 50) => Method::QueueUnbind(queue::Unbind::decode(src)?),
            (CLASS_QUEUE, 51) => Method::QueueUnbindOk(queue::UnbindOk::default()),

            (CLASS_BASIC, 10) => Method::BasicQos(basic::Qos::decode(src)?),
            (CLASS_BASIC, 11) => Method::BasicQosOk(basic::QosOk::default()),
            (CLASS_BASIC, 20) => Method::BasicConsume(basic::Consume::decode(src)?),
            (CLASS_BASIC, 21) => Method::BasicConsumeOk(basic::ConsumeOk::decode(src)?),
            (CLASS_BASIC, 30) => Method::BasicCancel(basic::Cancel::decode(src)?),
            (CLASS_BASIC, 31) => Method::BasicCancelOk(basic::CancelOk::decode(src)?),
            (CLASS_BASIC, 40) => Method::BasicPublish(basic::Publish::decode(src)?),
            (CLASS_BASIC, 50) => Method::BasicReturn(basic::Return::decode(src)?),
            (CLASS_BASIC, 60) => Method::BasicDeliver(basic::Deliver::decode(src)?),
            (CLASS_BASIC, 70) => Method::BasicGet(basic::Get::decode(src)?),
            (CLASS_BASIC, 71) => Method::BasicGetOk(basic::GetOk::decode(src)?),
            (CLASS_BASIC, 72) => Method::BasicGetEmpty(basic::GetEmpty::decode(src)?),
            (CLASS_BASIC, 80) => Method::BasicAck(basic::Ack::decode(src)?),
            (CLASS_BASIC, 90) => Method::BasicReject(basic::Reject::decode(src)?),
            (CLASS_BASIC, 100) => Method::BasicRecoverAsync(basic::RecoverAsync::decode(src)?),
            (CLASS_BASIC, 110) => Method::BasicRecover(basic::Recover::decode(src)?),
            (CLASS_BASIC, 111) => Method::BasicRecoverOk(basic::RecoverOk::default()),
            (CLASS_BASIC, 120) => Method::BasicNack(basic::Nack::decode(src)?),

            (CLASS_CONFIRM, 10) => Method::ConfirmSelect(confirm::Select::decode(src)?),
            (CLASS_CONFIRM, 11) => Method::ConfirmSelectOk(confirm::SelectOk::default()),

            (CLASS_TX, 10) => Method::TxSelect(tx::Select::default()),
            (CLASS_TX, 11) => Method::TxSelectOk(tx::SelectOk::default()),
            (CLASS_TX, 20) => Method::TxCommit(tx::Commit::default()),
            (CLASS_TX, 21) => Method::TxCommitOk(tx::CommitOk::default()),
            (CLASS_TX, 30) => Method::TxRollback(tx::Rollback::default()),
            (CLASS_TX, 31) => Method::TxRollbackOk(tx::RollbackOk::default()),

            (class_id, method_id) => {
                return Err(DecodeError::UnknownMethod {
                    class_id,
                    method_id,
                })
            }
        };
        Ok(method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::FieldTable;

    fn round_trip(method: Method) {
        let mut buf = BytesMut::new();
        method.encode(WireDialect::Rabbit, &mut buf).unwrap();
        let mut src = buf.freeze();
        let decoded = Method::decode(&mut src).unwrap();
        assert!(src.is_empty(), "decoder must consume all argument bytes");
        assert_eq!(decoded, method);
    }

    #[test]
    fn queue_declare_round_trips_with_packed_bits() {
        // durable and auto_delete set, the rest clear: bits share one octet
        round_trip(Method::QueueDeclare(queue::Declare {
            queue: "tasks".into(),
            durable: true,
            auto_delete: true,
            arguments: [("x-max-length", 1000i32)].into_iter().collect(),
            ..Default::default()
        }));
    }

    #[test]
    fn every_bit_combination_of_consume_flags_survives() {
        for bits in 0u8..16 {
            round_trip(Method::BasicConsume(basic::Consume {
                queue: "q".into(),
                consumer_tag: String::new(),
                no_local: bits & 1 != 0,
                no_ack: bits & 2 != 0,
                exclusive: bits & 4 != 0,
                nowait: bits & 8 != 0,
                arguments: FieldTable::new(),
            }));
        }
    }

    #[test]
    fn deliver_round_trips() {
        round_trip(Method::BasicDeliver(basic::Deliver {
            consumer_tag: "ctag-1".into(),
            delivery_tag: 7,
            redelivered: true,
            exchange: "logs".into(),
            routing_key: "info".into(),
        }));
    }

    #[test]
    fn argless_methods_encode_to_ids_only() {
        let mut buf = BytesMut::new();
        Method::TxCommit(tx::Commit {})
            .encode(WireDialect::Rabbit, &mut buf)
            .unwrap();
        assert_eq!(&buf[..], &[0x00, 0x5A, 0x00, 0x14]);
    }

    #[test]
    fn unknown_method_pair_is_reported() {
        let mut src = Bytes::from_static(&[0x00, 0x0A, 0x00, 0xFF]);
        assert!(matches!(
            Method::decode(&mut src),
            Err(DecodeError::UnknownMethod {
                class_id: 10,
                method_id: 255
            })
        ));
    }

    #[test]
    fn registry_knows_content_methods() {
        assert!(descriptor(60, 60).unwrap().carries_content);
        assert!(descriptor(60, 71).unwrap().carries_content);
        assert!(!descriptor(60, 70).unwrap().carries_content);
        assert_eq!(descriptor(50, 10).unwrap().reply, Some((50, 11)));
    }
}
