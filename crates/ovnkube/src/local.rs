//! Stand-in collaborators for running the lifecycle without a cluster.

use crate::collaborators::{Collaborators, SourceScope};

use std::sync::Arc;

use async_trait::async_trait;
use ovnkube_component::{BoxError, Component, ReadModel};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Component that is ready immediately and does nothing until stopped.
#[derive(Debug)]
pub struct IdleComponent {
    name: String,
}

impl IdleComponent {
    /// Creates a new idle component.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Component for IdleComponent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self, _token: CancellationToken) -> Result<(), BoxError> {
        info!("{} ready", self.name);

        Ok(())
    }

    async fn stop(&self) {
        info!("{} stopped", self.name);
    }
}

/// Read-model source without any backing data.
#[derive(Debug)]
pub struct IdleReadModel {
    name: String,
}

impl IdleReadModel {
    /// Creates a new idle source.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl ReadModel for IdleReadModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn shutdown(&self) {
        info!("{} read model shut down", self.name);
    }
}

/// Collaborators producing idle components.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalCollaborators;

#[async_trait]
impl Collaborators for LocalCollaborators {
    async fn read_model(&self, scope: &SourceScope) -> Result<Arc<dyn ReadModel>, BoxError> {
        Ok(Arc::new(IdleReadModel::new(scope.to_string())))
    }

    async fn cluster_manager(
        &self,
        _source: Arc<dyn ReadModel>,
        identity: &str,
    ) -> Result<Arc<dyn Component>, BoxError> {
        Ok(Arc::new(IdleComponent::new(format!("cluster-manager/{identity}"))))
    }

    async fn controller_manager(
        &self,
        _source: Arc<dyn ReadModel>,
    ) -> Result<Arc<dyn Component>, BoxError> {
        Ok(Arc::new(IdleComponent::new("ovnkube-controller")))
    }

    async fn node_manager(
        &self,
        _source: Arc<dyn ReadModel>,
        identity: &str,
    ) -> Result<Arc<dyn Component>, BoxError> {
        Ok(Arc::new(IdleComponent::new(format!("node/{identity}"))))
    }

    async fn cleanup_node(&self, identity: &str) -> Result<(), BoxError> {
        info!(%identity, "nothing to clean up");

        Ok(())
    }
}
