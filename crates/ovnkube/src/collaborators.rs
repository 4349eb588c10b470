use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use ovnkube_component::{BoxError, Component, ReadModel};

/// Which roles a read-model source serves.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SourceScope {
    /// Shared by a combined cluster manager and controller.
    Master,

    /// Serves a controller, and a node bundled with it.
    Controller,

    /// Serves a standalone cluster manager.
    ClusterManager,

    /// Serves a node running without a controller.
    Node {
        /// The node's identity.
        identity: String,
    },
}

impl fmt::Display for SourceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Master => f.write_str("master"),
            Self::Controller => f.write_str("ovnkube-controller"),
            Self::ClusterManager => f.write_str("cluster-manager"),
            Self::Node { identity } => write!(f, "node {identity}"),
        }
    }
}

/// Factories for everything the coordinator starts but does not implement.
#[async_trait]
pub trait Collaborators: Send + Sync + 'static {
    /// Creates a read-model source for `scope`.
    async fn read_model(&self, scope: &SourceScope) -> Result<Arc<dyn ReadModel>, BoxError>;

    /// Creates the cluster manager.
    async fn cluster_manager(
        &self,
        source: Arc<dyn ReadModel>,
        identity: &str,
    ) -> Result<Arc<dyn Component>, BoxError>;

    /// Creates the ovnkube controller.
    async fn controller_manager(
        &self,
        source: Arc<dyn ReadModel>,
    ) -> Result<Arc<dyn Component>, BoxError>;

    /// Creates the node network controller manager.
    async fn node_manager(
        &self,
        source: Arc<dyn ReadModel>,
        identity: &str,
    ) -> Result<Arc<dyn Component>, BoxError>;

    /// Removes the local node configuration left behind by a previous run.
    async fn cleanup_node(&self, identity: &str) -> Result<(), BoxError>;
}
