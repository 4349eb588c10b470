//! Translates leader election transitions into the component lifecycle.

use crate::cascade::Cascade;
use crate::collaborators::Collaborators;
use crate::error::Error;
use crate::mode::RunMode;
use crate::signal::{ShutdownHandle, ShutdownReason};

use std::sync::Arc;

use async_trait::async_trait;
use ovnkube_leader_election::{LeaderCallbacks, SwitchMetric};
use ovnkube_metrics::{LeaderRole, MetricsSink};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info};

/// Where an instance is in its leadership lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeaderPhase {
    /// Waiting for the lease.
    Standby,

    /// Holding the lease and running the cascade.
    Leading,

    /// Done; nothing may be started any more.
    Stopped,
}

/// State shared by the election callbacks and the coordinator.
#[derive(Debug)]
pub struct LeaderState {
    phase: LeaderPhase,
    failure: Option<Error>,
}

impl Default for LeaderState {
    fn default() -> Self {
        Self {
            phase: LeaderPhase::Standby,
            failure: None,
        }
    }
}

/// `LeaderCallbacks` implementation that gates the cascade on the lease.
pub struct LeadershipAdapter<C: Collaborators> {
    identity: String,
    state: Mutex<LeaderState>,
    in_flight: TaskTracker,
    cascade: Cascade<C>,
    shutdown: ShutdownHandle,
}

impl<C: Collaborators> LeadershipAdapter<C> {
    /// Creates an adapter in standby.
    pub fn new(identity: String, cascade: Cascade<C>, shutdown: ShutdownHandle) -> Self {
        Self {
            identity,
            state: Mutex::new(LeaderState::default()),
            in_flight: TaskTracker::new(),
            cascade,
            shutdown,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> LeaderPhase {
        self.state.lock().phase
    }

    /// Marks the adapter stopped. Idempotent.
    pub fn stop(&self) {
        self.state.lock().phase = LeaderPhase::Stopped;
    }

    /// Marks the adapter stopped, waits for a running cascade to unwind and
    /// returns its fatal error, if any.
    pub async fn finish(&self) -> Option<Error> {
        self.stop();

        self.in_flight.close();
        self.in_flight.wait().await;

        self.state.lock().failure.take()
    }
}

#[async_trait]
impl<C: Collaborators> LeaderCallbacks for LeadershipAdapter<C> {
    async fn on_started_leading(&self, token: CancellationToken) {
        let _in_flight = {
            let mut state = self.state.lock();
            if state.phase == LeaderPhase::Stopped {
                info!("leadership acquired after shutdown began; not starting components");
                return;
            }

            state.phase = LeaderPhase::Leading;
            self.in_flight.token()
        };

        info!(identity = %self.identity, "won leader election; in active mode");

        if let Err(e) = self.cascade.run(token).await {
            error!("failed to run ovnkube: {e}");

            let reason = ShutdownReason::Fatal(e.to_string());
            self.state.lock().failure.get_or_insert(e);
            self.shutdown.trigger(reason);
        }
    }

    fn on_stopped_leading(&self) {
        self.stop();

        info!(identity = %self.identity, "no longer leader; exiting");
        self.shutdown.trigger(ShutdownReason::LeadershipLost);
    }

    fn on_new_leader(&self, identity: &str) {
        if identity != self.identity {
            info!("lost the election to {identity}; in standby mode");
        }
    }
}

/// Drives the leader gauges of every cluster-wide role in the run mode.
pub struct LeaderMetrics {
    roles: Vec<LeaderRole>,
    sink: Arc<dyn MetricsSink>,
}

impl LeaderMetrics {
    /// Creates a switch for the cluster-wide roles active in `mode`.
    pub fn new(mode: &RunMode, sink: Arc<dyn MetricsSink>) -> Self {
        let mut roles = Vec::new();

        if mode.ovnkube_controller() {
            roles.push(LeaderRole::Controller);
        }

        if mode.cluster_manager() {
            roles.push(LeaderRole::ClusterManager);
        }

        Self { roles, sink }
    }

    fn set(&self, leading: bool) {
        for role in &self.roles {
            self.sink.set_leader(*role, leading);
        }
    }
}

impl SwitchMetric for LeaderMetrics {
    fn on(&self, _name: &str) {
        self.set(true);
    }

    fn off(&self, _name: &str) {
        self.set(false);
    }
}
