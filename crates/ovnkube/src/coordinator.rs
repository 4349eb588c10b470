use crate::cascade::Cascade;
use crate::collaborators::Collaborators;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::guard::contain_panics;
use crate::leadership::{LeaderMetrics, LeadershipAdapter};
use crate::mode::{ExecutionPath, RunMode};
use crate::signal::{ShutdownHandle, ShutdownReason};

use std::sync::Arc;

use ovnkube_leader_election::{LeaderElectionConfig, LeaderElector};
use ovnkube_locks::LockManager;
use ovnkube_metrics::MetricsSink;
use tracing::{error, info};

/// Decides how a run mode is executed and owns its lifecycle.
pub struct Coordinator<C, L>
where
    C: Collaborators,
    L: LockManager,
{
    mode: RunMode,
    config: Config,
    collaborators: Arc<C>,
    locks: L,
    metrics: Arc<dyn MetricsSink>,
}

impl<C, L> Coordinator<C, L>
where
    C: Collaborators,
    L: LockManager,
{
    /// Creates a new coordinator.
    pub fn new(
        mode: RunMode,
        config: Config,
        collaborators: Arc<C>,
        locks: L,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            mode,
            config,
            collaborators,
            locks,
            metrics,
        }
    }

    /// Runs until the shutdown token is cancelled, leadership is lost or a
    /// fatal error occurs. Leadership loss and cancellation return `Ok`.
    ///
    /// # Errors
    ///
    /// Returns an error if leader election cannot be set up, if cleanup fails
    /// or if a component cannot be started.
    pub async fn run(&self, shutdown: ShutdownHandle) -> Result<()> {
        match self.mode.execution_path() {
            ExecutionPath::Cleanup => self.cleanup().await,
            ExecutionPath::Direct => self.run_direct(&shutdown).await,
            ExecutionPath::LeaderElected => self.run_leader_elected(&shutdown).await,
        }
    }

    fn cascade(&self) -> Cascade<C> {
        Cascade::new(
            self.mode.clone(),
            self.collaborators.clone(),
            self.metrics.clone(),
        )
    }

    async fn cleanup(&self) -> Result<()> {
        let identity = self.mode.identity();
        info!(%identity, "cleaning up node");

        contain_panics(async {
            self.collaborators
                .cleanup_node(identity)
                .await
                .map_err(|source| Error::Cleanup {
                    identity: identity.to_string(),
                    source,
                })
        })
        .await
    }

    async fn run_direct(&self, shutdown: &ShutdownHandle) -> Result<()> {
        info!(identity = %self.mode.identity(), "starting components without leader election");

        let result = self.cascade().run(shutdown.token().clone()).await;

        if let Err(e) = &result {
            error!("failed to run ovnkube: {e}");
            shutdown.trigger(ShutdownReason::Fatal(e.to_string()));
        }

        result
    }

    async fn run_leader_elected(&self, shutdown: &ShutdownHandle) -> Result<()> {
        let identity = self.mode.identity().to_string();
        let resource = self.config.lock_resource(&self.mode);
        let ha = self.config.ha_config(&self.mode);

        let lock = self
            .locks
            .resource_lock(resource.clone(), identity.clone())
            .map_err(|e| Error::Acquisition(e.to_string()))?;

        let adapter = Arc::new(LeadershipAdapter::new(
            identity.clone(),
            self.cascade(),
            shutdown.clone(),
        ));

        let elector = LeaderElector::new(LeaderElectionConfig {
            lock,
            name: resource.name.clone(),
            lease_duration: ha.lease_duration,
            renew_deadline: ha.renew_deadline,
            retry_period: ha.retry_period,
            release_on_cancel: self.config.release_on_cancel,
            callbacks: adapter.clone(),
            metric: Arc::new(LeaderMetrics::new(&self.mode, self.metrics.clone())),
        })
        .map_err(|e| Error::Acquisition(e.to_string()))?;

        info!(lock = %resource, %identity, "starting leader election");

        elector.run(shutdown.token().clone()).await;

        // a release without an explicit loss still has to block late starts
        match adapter.finish().await {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
