//! Test utilities for unit testing operations
//!
//! A simulated clock that advances virtual time instead of sleeping, and
//! helpers for building test clusters and operation contexts.

#[cfg(test)]
use crate::clock::{Clock, Tick, Ticker};
#[cfg(test)]
use crate::config::{OpsConfig, PollSettings};
#[cfg(test)]
use crate::operations::OperationContext;
#[cfg(test)]
use cluster_client::MockClusterClient;
#[cfg(test)]
use crds::{Cluster, ClusterComponentSpec, ClusterSpec, TerminationPolicy};
#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};
#[cfg(test)]
use std::sync::Arc;
#[cfg(test)]
use std::time::Duration;

/// Clock whose tickers advance virtual time by one interval per tick
///
/// Matches `IntervalTicker`: the first tick lands one interval in, and a
/// tick that would land on or past the deadline reports the deadline instead.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct SimulatedClock {
    fired: Arc<AtomicUsize>,
}

#[cfg(test)]
impl SimulatedClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ticks fired across every ticker this clock created
    pub fn ticks_fired(&self) -> usize {
        self.fired.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
impl Clock for SimulatedClock {
    fn ticker(&self, settings: &PollSettings) -> Box<dyn Ticker> {
        Box::new(SimulatedTicker {
            settings: *settings,
            now: Duration::ZERO,
            fired: self.fired.clone(),
        })
    }
}

#[cfg(test)]
#[derive(Debug)]
struct SimulatedTicker {
    settings: PollSettings,
    now: Duration,
    fired: Arc<AtomicUsize>,
}

#[cfg(test)]
#[async_trait::async_trait]
impl Ticker for SimulatedTicker {
    async fn tick(&mut self) -> Tick {
        let next = self.now + self.settings.interval;
        if next >= self.settings.deadline {
            self.now = self.settings.deadline;
            return Tick::DeadlineElapsed;
        }
        self.now = next;
        self.fired.fetch_add(1, Ordering::SeqCst);
        Tick::Fired
    }

    async fn expired(&self) {
        // Virtual time only moves on tick(), so a call in flight never
        // crosses the deadline unless it was already reached.
        if self.now < self.settings.deadline {
            std::future::pending::<()>().await;
        }
    }

    fn elapsed(&self) -> Duration {
        self.now
    }

    fn deadline(&self) -> Duration {
        self.settings.deadline
    }
}

/// Helper to create a test Cluster with one component
#[cfg(test)]
pub fn create_test_cluster(name: &str, component: &str, replicas: i32) -> Cluster {
    let mut cluster = Cluster::new(
        name,
        ClusterSpec {
            termination_policy: TerminationPolicy::WipeOut,
            cluster_def: "postgresql".to_string(),
            topology: "replication".to_string(),
            component_specs: vec![ClusterComponentSpec {
                name: component.to_string(),
                replicas,
                ..Default::default()
            }],
        },
    );
    cluster.metadata.namespace = Some("demo".to_string());
    cluster
}

/// Helper to wire a mock client and simulated clock into an operation context
#[cfg(test)]
pub fn create_test_context() -> (OperationContext, MockClusterClient, SimulatedClock) {
    let client = MockClusterClient::new("demo");
    let clock = SimulatedClock::new();
    let ctx = OperationContext::new(
        Arc::new(client.clone()),
        Arc::new(clock.clone()),
        OpsConfig::default(),
    );
    (ctx, client, clock)
}
