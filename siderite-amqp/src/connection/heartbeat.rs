//! The heartbeat emission timer
//!
//! After tune negotiation the connection engine arms this timer with half
//! the negotiated heartbeat interval and resets it on every outbound frame,
//! so it fires only after the write side has been silent for `heartbeat / 2`
//! seconds. The receive-side deadline lives in the transport.

use std::time::Duration;

use tokio::time::{Instant, Interval};

#[derive(Debug)]
pub(crate) struct HeartBeat {
    interval: Option<Interval>,
}

impl HeartBeat {
    /// A timer that never fires, for connections with heartbeats disabled
    pub fn never() -> Self {
        Self { interval: None }
    }

    pub fn new(period: Duration) -> Self {
        // interval() yields immediately on the first tick; the first
        // heartbeat is only due one full period after the handshake
        let interval = tokio::time::interval_at(Instant::now() + period, period);
        Self {
            interval: Some(interval),
        }
    }

    /// Pushes the next tick a full period away. Called after every
    /// outbound frame so heartbeats are only emitted into write silence.
    pub fn reset(&mut self) {
        if let Some(interval) = &mut self.interval {
            interval.reset();
        }
    }

    /// Completes at the next tick; pends forever when disabled
    pub async fn tick(&mut self) {
        match &mut self.interval {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_tick_comes_after_one_full_period() {
        let mut heartbeat = HeartBeat::new(Duration::from_secs(5));
        let started = Instant::now();
        heartbeat.tick().await;
        assert_eq!(started.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn reset_defers_the_next_tick() {
        let mut heartbeat = HeartBeat::new(Duration::from_secs(4));
        tokio::time::sleep(Duration::from_secs(3)).await;
        heartbeat.reset();

        let started = Instant::now();
        heartbeat.tick().await;
        assert_eq!(started.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_timer_never_fires() {
        let mut heartbeat = HeartBeat::never();
        let result =
            tokio::time::timeout(Duration::from_secs(3600), heartbeat.tick()).await;
        assert!(result.is_err());
    }
}
