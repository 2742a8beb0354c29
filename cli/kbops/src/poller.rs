//! # Poller
//!
//! Turns a sequence of remote state observations into one terminal outcome.
//!
//! On every tick the poller reads the object once and classifies what it
//! saw:
//!
//! | Observation            | Result                                        |
//! |------------------------|-----------------------------------------------|
//! | read error (not 404)   | `PollError::Read`, no retry                   |
//! | not found              | success or `PollError::NotFound` per policy   |
//! | success phase          | `Ok(())`                                      |
//! | failure phase          | `PollError::Failed`                           |
//! | anything else          | keep waiting                                  |
//!
//! If the ticker's deadline passes first the result is `PollError::Timeout`,
//! including while a read is still in flight.
//! The poller never re-submits anything; submission belongs to the caller.

use crate::clock::{within, Tick, Ticker};
use cluster_client::ClientError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// One read of the polled object
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation<P> {
    /// The object no longer exists
    Absent,
    /// The object exists; `None` while its phase is still unset
    Present(Option<P>),
}

/// Per-tick classification of an observation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<P> {
    /// Not terminal yet; carries the phase seen, if any
    Pending(Option<P>),
    /// The success predicate matched, or the object is gone and that is the goal
    Succeeded,
    /// The failure predicate matched this phase
    Failed(P),
    /// The object is gone and it should not be
    NotFound,
}

/// Something whose phase can be polled
#[async_trait::async_trait]
pub trait PhaseSource: Send + Sync {
    /// Phase type reported in `status.phase`
    type Phase: fmt::Display + Send;

    /// Human-readable identity, e.g. "Cluster demo/op-test"
    fn describe(&self) -> String;

    /// Read the object once. `ClientError::NotFound` must be reported as
    /// `Observation::Absent`, not as an error.
    async fn observe(&self) -> Result<Observation<Self::Phase>, ClientError>;
}

/// What absence of the polled object means
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Absence {
    /// The object going away is the goal (deletion)
    Success,
    /// The object must keep existing (create, scale)
    Error,
}

/// Success and failure predicates for one kind of operation
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy<P> {
    /// Phase counts as done
    pub succeeded: fn(&P) -> bool,
    /// Phase counts as a terminal failure
    pub failed: fn(&P) -> bool,
    /// How to treat a not-found read
    pub on_absent: Absence,
}

impl<P> PollPolicy<P> {
    /// Classify one observation
    pub fn classify(&self, observation: Observation<P>) -> PollOutcome<P> {
        match observation {
            Observation::Absent => PollOutcome::NotFound,
            Observation::Present(Some(phase)) if (self.succeeded)(&phase) => PollOutcome::Succeeded,
            Observation::Present(Some(phase)) if (self.failed)(&phase) => PollOutcome::Failed(phase),
            Observation::Present(phase) => PollOutcome::Pending(phase),
        }
    }
}

/// Cause attached to a timeout
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("deadline of {0:?} exceeded")]
pub struct DeadlineExceeded(pub Duration);

/// Terminal poll failures
#[derive(Debug, Error)]
pub enum PollError {
    /// A read failed; never retried
    #[error("failed to read {what}: {source}")]
    Read {
        what: String,
        #[source]
        source: ClientError,
    },

    /// The object vanished under `Absence::Error`
    #[error("{0} disappeared while waiting")]
    NotFound(String),

    /// A failure phase was observed
    #[error("{what} reached failure phase {phase}")]
    Failed { what: String, phase: String },

    /// The deadline passed, between ticks or during a call
    #[error("timed out after {waited:?} waiting for {what}")]
    Timeout {
        what: String,
        waited: Duration,
        #[source]
        cause: DeadlineExceeded,
    },
}

impl PollError {
    /// Deadline reached while waiting on `what`.
    pub fn timeout(what: String, ticker: &dyn Ticker) -> Self {
        PollError::Timeout {
            what,
            waited: ticker.elapsed(),
            cause: DeadlineExceeded(ticker.deadline()),
        }
    }
}

/// Poll `source` on every tick of `ticker` until `policy` declares a
/// terminal outcome or the deadline passes.
pub async fn poll<S>(
    ticker: &mut dyn Ticker,
    source: &S,
    policy: &PollPolicy<S::Phase>,
) -> Result<(), PollError>
where
    S: PhaseSource + ?Sized,
{
    let what = source.describe();
    let mut ticks: u64 = 0;

    loop {
        if ticker.tick().await == Tick::DeadlineElapsed {
            return Err(PollError::timeout(what, ticker));
        }
        ticks += 1;

        let Some(read) = within(&*ticker, source.observe()).await else {
            return Err(PollError::timeout(what, ticker));
        };
        let observation = read.map_err(|err| PollError::Read {
            what: what.clone(),
            source: err,
        })?;

        match policy.classify(observation) {
            PollOutcome::Succeeded => {
                debug!("{} reached a success state after {} checks", what, ticks);
                return Ok(());
            }
            PollOutcome::Failed(phase) => {
                warn!("{} reached failure phase {}", what, phase);
                return Err(PollError::Failed {
                    what,
                    phase: phase.to_string(),
                });
            }
            PollOutcome::NotFound => {
                return match policy.on_absent {
                    Absence::Success => {
                        debug!("{} is gone after {} checks", what, ticks);
                        Ok(())
                    }
                    Absence::Error => Err(PollError::NotFound(what)),
                };
            }
            PollOutcome::Pending(phase) => match phase {
                Some(phase) => info!("Waiting for {}, current phase: {}", what, phase),
                None => info!("Waiting for {}, phase not reported yet", what),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, TokioClock};
    use crate::test_utils::SimulatedClock;
    use crate::config::PollSettings;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted source; the last entry repeats forever
    struct Script {
        steps: Mutex<VecDeque<Result<Observation<&'static str>, ClientError>>>,
        last: Observation<&'static str>,
        reads: Mutex<usize>,
    }

    impl Script {
        fn new(
            steps: Vec<Result<Observation<&'static str>, ClientError>>,
            last: Observation<&'static str>,
        ) -> Self {
            Self {
                steps: Mutex::new(steps.into()),
                last,
                reads: Mutex::new(0),
            }
        }

        fn reads(&self) -> usize {
            *self.reads.lock().unwrap()
        }
    }

    #[async_trait::async_trait]
    impl PhaseSource for Script {
        type Phase = &'static str;

        fn describe(&self) -> String {
            "Thing demo/t".to_string()
        }

        async fn observe(&self) -> Result<Observation<&'static str>, ClientError> {
            *self.reads.lock().unwrap() += 1;
            self.steps
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(self.last.clone()))
        }
    }

    /// Read that never completes
    struct Stalled;

    #[async_trait::async_trait]
    impl PhaseSource for Stalled {
        type Phase = &'static str;

        fn describe(&self) -> String {
            "Thing demo/stuck".to_string()
        }

        async fn observe(&self) -> Result<Observation<&'static str>, ClientError> {
            std::future::pending().await
        }
    }

    const READY: PollPolicy<&'static str> = PollPolicy {
        succeeded: |p| *p == "Ready",
        failed: |p| *p == "Broken",
        on_absent: Absence::Error,
    };

    const GONE: PollPolicy<&'static str> = PollPolicy {
        succeeded: |_| false,
        failed: |_| false,
        on_absent: Absence::Success,
    };

    fn settings(interval: u64, deadline: u64) -> PollSettings {
        PollSettings::new(Duration::from_secs(interval), Duration::from_secs(deadline))
    }

    #[test]
    fn test_classify() {
        assert_eq!(READY.classify(Observation::Absent), PollOutcome::NotFound);
        assert_eq!(READY.classify(Observation::Present(None)), PollOutcome::Pending(None));
        assert_eq!(
            READY.classify(Observation::Present(Some("Starting"))),
            PollOutcome::Pending(Some("Starting"))
        );
        assert_eq!(READY.classify(Observation::Present(Some("Ready"))), PollOutcome::Succeeded);
        assert_eq!(
            READY.classify(Observation::Present(Some("Broken"))),
            PollOutcome::Failed("Broken")
        );
    }

    #[tokio::test]
    async fn test_succeeds_once_phase_matches() {
        let clock = SimulatedClock::new();
        let source = Script::new(
            vec![Ok(Observation::Present(None)), Ok(Observation::Present(Some("Starting")))],
            Observation::Present(Some("Ready")),
        );
        let mut ticker = clock.ticker(&settings(5, 60));

        poll(ticker.as_mut(), &source, &READY).await.unwrap();
        assert_eq!(source.reads(), 3);
        assert_eq!(clock.ticks_fired(), 3);
    }

    #[tokio::test]
    async fn test_failure_phase_stops_immediately() {
        let clock = SimulatedClock::new();
        let source = Script::new(
            vec![Ok(Observation::Present(Some("Starting")))],
            Observation::Present(Some("Broken")),
        );
        let mut ticker = clock.ticker(&settings(5, 60));

        let err = poll(ticker.as_mut(), &source, &READY).await.unwrap_err();
        assert!(matches!(err, PollError::Failed { ref phase, .. } if phase == "Broken"));
        assert_eq!(source.reads(), 2);
    }

    #[tokio::test]
    async fn test_absence_is_error_or_success_by_policy() {
        let clock = SimulatedClock::new();

        let source = Script::new(vec![], Observation::Absent);
        let mut ticker = clock.ticker(&settings(5, 60));
        let err = poll(ticker.as_mut(), &source, &READY).await.unwrap_err();
        assert!(matches!(err, PollError::NotFound(_)));

        let source = Script::new(vec![], Observation::Absent);
        let mut ticker = clock.ticker(&settings(2, 60));
        poll(ticker.as_mut(), &source, &GONE).await.unwrap();
        assert_eq!(source.reads(), 1);
    }

    #[tokio::test]
    async fn test_read_error_propagates_without_retry() {
        let clock = SimulatedClock::new();
        let source = Script::new(
            vec![Err(ClientError::MissingName("Thing demo/t".to_string()))],
            Observation::Absent,
        );
        let mut ticker = clock.ticker(&settings(2, 60));

        let err = poll(ticker.as_mut(), &source, &GONE).await.unwrap_err();
        assert!(matches!(err, PollError::Read { .. }));
        assert_eq!(source.reads(), 1);
    }

    #[tokio::test]
    async fn test_timeout_bounds_number_of_reads() {
        for (interval, deadline) in [(2u64, 300u64), (5, 1800), (7, 30), (3, 3)] {
            let clock = SimulatedClock::new();
            let source = Script::new(vec![], Observation::Present(Some("Starting")));
            let mut ticker = clock.ticker(&settings(interval, deadline));

            let err = poll(ticker.as_mut(), &source, &READY).await.unwrap_err();
            match err {
                PollError::Timeout { cause, .. } => {
                    assert_eq!(cause, DeadlineExceeded(Duration::from_secs(deadline)));
                }
                other => panic!("expected timeout, got {}", other),
            }
            let bound = deadline.div_ceil(interval) as usize + 1;
            assert!(
                source.reads() <= bound,
                "{} reads for interval {}s deadline {}s (bound {})",
                source.reads(),
                interval,
                deadline,
                bound
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_read_times_out_at_deadline() {
        let start = tokio::time::Instant::now();
        let mut ticker = TokioClock.ticker(&settings(2, 300));

        let err = poll(ticker.as_mut(), &Stalled, &GONE).await.unwrap_err();

        match err {
            PollError::Timeout { what, waited, .. } => {
                assert_eq!(what, "Thing demo/stuck");
                assert_eq!(waited, Duration::from_secs(300));
            }
            other => panic!("expected timeout, got {}", other),
        }
        assert_eq!(start.elapsed(), Duration::from_secs(300));
    }
}
