//! Lease based leader election over any `LeaseLock`.
//!
//! A `LeaderElector` repeatedly tries to acquire its lease. Once acquired it
//! renews the lease every retry period; if renewal does not succeed within the
//! renew deadline, leadership is considered lost. Transitions are reported via
//! `LeaderCallbacks` and a `SwitchMetric`.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod elector;
mod error;

pub use elector::LeaderElector;
pub use error::Error;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ovnkube_locks::LeaseLock;
use tokio_util::sync::CancellationToken;

/// Maximum extra fraction of the retry period added as jitter while acquiring.
pub const JITTER_FACTOR: f64 = 1.2;

/// Callbacks invoked on leadership transitions.
#[async_trait]
pub trait LeaderCallbacks: Send + Sync + 'static {
    /// Called on its own task once the lease is acquired. The token is
    /// cancelled when leadership ends.
    async fn on_started_leading(&self, token: CancellationToken);

    /// Called when the elector stops, whether or not it was ever leading.
    fn on_stopped_leading(&self);

    /// Called whenever a different holder of the lease is observed.
    fn on_new_leader(&self, identity: &str);
}

/// Binary metric switched on while leading.
pub trait SwitchMetric: Send + Sync + 'static {
    /// Leadership of `name` was acquired.
    fn on(&self, name: &str);

    /// Leadership of `name` was given up.
    fn off(&self, name: &str);
}

/// A `SwitchMetric` that records nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSwitchMetric;

impl SwitchMetric for NoopSwitchMetric {
    fn on(&self, _name: &str) {}

    fn off(&self, _name: &str) {}
}

/// Configuration for a `LeaderElector`.
pub struct LeaderElectionConfig<L: LeaseLock> {
    /// The lease lock to contend for.
    pub lock: L,

    /// Name used for metrics and logs.
    pub name: String,

    /// How long non-leaders wait after the last observed renewal before taking over.
    pub lease_duration: Duration,

    /// How long the leader keeps retrying a renewal before giving up.
    pub renew_deadline: Duration,

    /// Interval between acquire and renew attempts.
    pub retry_period: Duration,

    /// Release the lease when the run token is cancelled.
    pub release_on_cancel: bool,

    /// Transition callbacks.
    pub callbacks: Arc<dyn LeaderCallbacks>,

    /// Leadership metric.
    pub metric: Arc<dyn SwitchMetric>,
}
