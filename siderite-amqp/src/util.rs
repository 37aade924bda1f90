//! Common utilities

use std::io;
use std::pin::Pin;
use std::task::Poll;
use std::time::Duration;

use futures_util::Future;
use tokio::time::{Instant, Sleep};

#[derive(Debug)]
pub(crate) enum Running {
    Continue,
    Stop,
}

/// A resettable deadline that elapses after a fixed period of inactivity.
///
/// Used by the transport to detect a half-open peer: the delay is reset on
/// every inbound frame and elapses after `2 * heartbeat + 1` seconds of
/// silence.
#[derive(Debug)]
pub(crate) struct IdleTimeout {
    delay: Pin<Box<Sleep>>,
    duration: Duration,
}

impl IdleTimeout {
    pub fn new(duration: Duration) -> Self {
        let delay = Box::pin(tokio::time::sleep(duration));
        Self { delay, duration }
    }

    pub fn reset(&mut self) {
        let next = Instant::now() + self.duration;
        self.delay.as_mut().reset(next);
    }
}

impl Future for IdleTimeout {
    type Output = io::Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> Poll<Self::Output> {
        let delay = Pin::new(&mut self.delay);
        delay.poll(cx).map(Ok)
    }
}

/// A process signal observed during a wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// SIGINT
    Interrupt,
    /// SIGTERM
    Terminate,
    /// SIGQUIT
    Quit,
}

/// Listens for terminate/quit/interrupt process signals without displacing
/// previously installed handlers.
///
/// The connection engine selects on [`recv`](Self::recv) alongside the
/// transport so that a signal interrupts the wait; the wait is then
/// re-entered transparently after the signal is surfaced as an event.
/// Platforms without asynchronous signal facilities compile this out and
/// rely solely on socket timeouts.
#[cfg(unix)]
#[derive(Debug)]
pub(crate) struct SignalListener {
    inner: Option<Streams>,
}

#[cfg(unix)]
#[derive(Debug)]
struct Streams {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
    quit: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl SignalListener {
    pub fn install(enabled: bool) -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        let inner = if enabled {
            Some(Streams {
                interrupt: signal(SignalKind::interrupt())?,
                terminate: signal(SignalKind::terminate())?,
                quit: signal(SignalKind::quit())?,
            })
        } else {
            None
        };
        Ok(Self { inner })
    }

    /// Resolves on the next observed signal; pends forever when disabled
    pub async fn recv(&mut self) -> Signal {
        match &mut self.inner {
            Some(streams) => loop {
                tokio::select! {
                    r = streams.interrupt.recv() => match r {
                        Some(()) => return Signal::Interrupt,
                        None => std::future::pending().await,
                    },
                    r = streams.terminate.recv() => match r {
                        Some(()) => return Signal::Terminate,
                        None => std::future::pending().await,
                    },
                    r = streams.quit.recv() => match r {
                        Some(()) => return Signal::Quit,
                        None => std::future::pending().await,
                    },
                }
            },
            None => std::future::pending().await,
        }
    }
}

#[cfg(not(unix))]
#[derive(Debug)]
pub(crate) struct SignalListener;

#[cfg(not(unix))]
impl SignalListener {
    pub fn install(_enabled: bool) -> io::Result<Self> {
        Ok(Self)
    }

    pub async fn recv(&mut self) -> Signal {
        std::future::pending().await
    }
}
