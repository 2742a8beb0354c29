//! Tick and deadline sources for the poller.
//!
//! A `Ticker` yields fixed-interval ticks until its deadline passes. The
//! first tick fires one interval after the ticker is created, never
//! immediately. Production code uses `TokioClock`; tests swap in a simulated
//! clock so a 30 minute deadline runs without waiting.

use crate::config::PollSettings;
use std::future::Future;
use std::time::Duration;
use tokio::time::{interval_at, sleep_until, Instant, Interval, MissedTickBehavior};

/// Result of waiting for the next tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Time to check the remote state again
    Fired,
    /// The deadline passed before the next tick
    DeadlineElapsed,
}

/// Fixed-interval tick stream bounded by a deadline
#[async_trait::async_trait]
pub trait Ticker: Send + Sync {
    /// Wait for the next tick or the deadline, whichever comes first.
    async fn tick(&mut self) -> Tick;

    /// Resolve once the deadline has passed.
    async fn expired(&self);

    /// Time since the ticker was created
    fn elapsed(&self) -> Duration;

    /// Total time allowed
    fn deadline(&self) -> Duration;
}

/// Run `fut` unless the ticker's deadline passes first.
///
/// Returns `None` when the deadline wins. Used for every API call an
/// operation makes, so a stalled server cannot outlive the deadline.
pub async fn within<F: Future>(ticker: &dyn Ticker, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        out = fut => Some(out),
        () = ticker.expired() => None,
    }
}

/// Creates tickers; injected into every operation
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn ticker(&self, settings: &PollSettings) -> Box<dyn Ticker>;
}

/// Wall-clock ticks backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn ticker(&self, settings: &PollSettings) -> Box<dyn Ticker> {
        Box::new(IntervalTicker::new(settings))
    }
}

/// Ticker over `tokio::time::Interval` raced against a deadline sleep
#[derive(Debug)]
pub struct IntervalTicker {
    interval: Interval,
    started: Instant,
    deadline: Duration,
}

impl IntervalTicker {
    /// Start the clock now; the first tick fires one interval from now.
    pub fn new(settings: &PollSettings) -> Self {
        let started = Instant::now();
        let mut interval = interval_at(started + settings.interval, settings.interval);
        // A slow fetch pushes the next tick back instead of bursting.
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            interval,
            started,
            deadline: settings.deadline,
        }
    }
}

#[async_trait::async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) -> Tick {
        let deadline = self.started + self.deadline;
        tokio::select! {
            biased;
            _ = sleep_until(deadline) => Tick::DeadlineElapsed,
            _ = self.interval.tick() => Tick::Fired,
        }
    }

    async fn expired(&self) {
        sleep_until(self.started + self.deadline).await;
    }

    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn deadline(&self) -> Duration {
        self.deadline
    }
}
