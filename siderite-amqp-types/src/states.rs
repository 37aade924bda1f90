//! Connection and channel lifecycle states

/// Connection states as driven by the open and close handshakes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport exists yet
    Disconnected,

    /// The transport is connected and the protocol header has been sent,
    /// but nothing has been received
    Preamble,

    /// Waiting for the broker's `connection.start`
    AwaitingStart,

    /// `connection.start-ok` has been sent; waiting for `connection.tune`,
    /// possibly via one or more `connection.secure` challenges
    AwaitingTune,

    /// `connection.tune-ok` and `connection.open` have been sent; waiting
    /// for `connection.open-ok`
    AwaitingOpenOk,

    /// The connection is fully open and channels may be used
    Open,

    /// `connection.close` has been sent; every frame except
    /// `connection.close-ok` is discarded
    Closing,

    /// The close handshake finished or the transport is gone
    Closed,
}

/// Channel states as driven by the open and close handshakes.
///
/// Synchronous-wait and content-assembly sub-states are tracked by the
/// channel engine alongside this lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// `channel.open` has been sent; waiting for `channel.open-ok`
    Opening,

    /// The channel is usable
    Open,

    /// `channel.close` has been sent; waiting for `channel.close-ok`
    Closing,

    /// The close handshake finished or the connection is gone
    Closed,
}
