//! Role selection: turns the per-role identity inputs into a validated run mode.

use std::collections::BTreeSet;

use thiserror::Error;
use tracing::info;

/// Environment variable overriding the identity of a standalone cluster manager.
pub const POD_NAME_ENV: &str = "POD_NAME";

/// Invalid role combinations.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ModeError {
    /// Cleanup was requested together with another role.
    #[error("cannot run cleanup-node mode along with any other mode")]
    CleanupNotExclusive,

    /// No role was requested.
    #[error("need to specify a mode for ovnkube")]
    NoMode,

    /// Cluster manager was bundled with a node without the controller.
    #[error("cannot run in both cluster manager and node mode")]
    ClusterManagerWithNode,

    /// Zero or several distinct identities were supplied.
    #[error("provided no identity or different identities for different modes")]
    AmbiguousIdentity,
}

/// Raw per-role identity inputs. An empty string leaves the role disabled.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoleInputs {
    /// Enables both the cluster manager and the ovnkube controller.
    pub master: String,

    /// Enables the cluster manager.
    pub cluster_manager: String,

    /// Enables the ovnkube controller.
    pub ovnkube_controller: String,

    /// Enables the node manager.
    pub node: String,

    /// Requests a one-shot node cleanup.
    pub cleanup_node: String,
}

/// How a run mode is executed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionPath {
    /// One-shot cleanup; no components are started.
    Cleanup,

    /// Components are started immediately.
    Direct,

    /// Components are started once the distributed lock is held.
    LeaderElected,
}

/// The validated set of active roles plus the identity of this instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunMode {
    cluster_manager: bool,
    ovnkube_controller: bool,
    node: bool,
    cleanup_node: bool,
    identity: String,
}

impl RunMode {
    /// Determines the run mode, applying the `POD_NAME` identity override.
    ///
    /// # Errors
    ///
    /// Returns an error if the role combination is invalid or the identity is ambiguous.
    pub fn determine(inputs: &RoleInputs) -> Result<Self, ModeError> {
        Self::determine_with_override(inputs, std::env::var(POD_NAME_ENV).ok())
    }

    /// Determines the run mode with an explicit identity override for a
    /// standalone cluster manager.
    ///
    /// # Errors
    ///
    /// Returns an error if the role combination is invalid or the identity is ambiguous.
    pub fn determine_with_override(
        inputs: &RoleInputs,
        pod_name: Option<String>,
    ) -> Result<Self, ModeError> {
        let master = !inputs.master.is_empty();

        let cluster_manager = master || !inputs.cluster_manager.is_empty();
        let ovnkube_controller = master || !inputs.ovnkube_controller.is_empty();
        let node = !inputs.node.is_empty();
        let cleanup_node = !inputs.cleanup_node.is_empty();

        if cleanup_node && (cluster_manager || ovnkube_controller || node) {
            return Err(ModeError::CleanupNotExclusive);
        }

        if !cluster_manager && !ovnkube_controller && !node && !cleanup_node {
            return Err(ModeError::NoMode);
        }

        if !ovnkube_controller && cluster_manager && node {
            return Err(ModeError::ClusterManagerWithNode);
        }

        let identities: BTreeSet<&str> = [
            inputs.master.as_str(),
            inputs.cluster_manager.as_str(),
            inputs.ovnkube_controller.as_str(),
            inputs.node.as_str(),
            inputs.cleanup_node.as_str(),
        ]
        .into_iter()
        .filter(|identity| !identity.is_empty())
        .collect();

        let mut identities = identities.into_iter();
        let (Some(identity), None) = (identities.next(), identities.next()) else {
            return Err(ModeError::AmbiguousIdentity);
        };

        let mut identity = identity.to_string();

        // a standalone cluster manager uses the pod name so that two managers
        // keyed by the same node name do not both lead during a zone migration
        if cluster_manager && !ovnkube_controller {
            if let Some(pod_name) = pod_name.filter(|name| !name.is_empty()) {
                info!(%pod_name, "using pod name as cluster manager identity");
                identity = pod_name;
            }
        }

        Ok(Self {
            cluster_manager,
            ovnkube_controller,
            node,
            cleanup_node,
            identity,
        })
    }

    /// Whether the cluster manager role is active.
    #[must_use]
    pub const fn cluster_manager(&self) -> bool {
        self.cluster_manager
    }

    /// Whether the ovnkube controller role is active.
    #[must_use]
    pub const fn ovnkube_controller(&self) -> bool {
        self.ovnkube_controller
    }

    /// Whether the node role is active.
    #[must_use]
    pub const fn node(&self) -> bool {
        self.node
    }

    /// Whether this is a cleanup run.
    #[must_use]
    pub const fn cleanup_node(&self) -> bool {
        self.cleanup_node
    }

    /// The identity of this instance.
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Decides whether the distributed lock gates component startup.
    #[must_use]
    pub const fn execution_path(&self) -> ExecutionPath {
        if self.cleanup_node {
            return ExecutionPath::Cleanup;
        }

        if !self.cluster_manager && !self.ovnkube_controller {
            return ExecutionPath::Direct;
        }

        // a node-bundled controller runs per node and needs no lock
        if self.ovnkube_controller && self.node && !self.cluster_manager {
            return ExecutionPath::Direct;
        }

        ExecutionPath::LeaderElected
    }
}
