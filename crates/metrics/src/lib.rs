//! Leadership and readiness metrics for ovnkube.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::fmt;
use std::time::Duration;

use prometheus::{Encoder, Gauge, Registry, TextEncoder, register_gauge_with_registry};
use thiserror::Error;

/// Metrics errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Registering or encoding a metric failed.
    #[error(transparent)]
    Prometheus(#[from] prometheus::Error),

    /// Encoded metrics were not valid UTF-8.
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Cluster-wide roles that report leadership.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LeaderRole {
    /// The ovnkube controller.
    Controller,

    /// The cluster manager.
    ClusterManager,
}

impl fmt::Display for LeaderRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Controller => f.write_str("ovnkube-controller"),
            Self::ClusterManager => f.write_str("cluster-manager"),
        }
    }
}

/// Components whose time-to-ready is recorded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReadyComponent {
    /// The cluster manager.
    ClusterManager,

    /// The ovnkube controller.
    Controller,

    /// The node manager.
    Node,
}

impl fmt::Display for ReadyComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClusterManager => f.write_str("cluster-manager"),
            Self::Controller => f.write_str("ovnkube-controller"),
            Self::Node => f.write_str("node"),
        }
    }
}

/// Sink for the metrics produced by the lifecycle coordinator.
pub trait MetricsSink: Send + Sync + 'static {
    /// Sets the leader gauge for `role`.
    fn set_leader(&self, role: LeaderRole, leading: bool);

    /// Records how long `component` took to become ready.
    fn observe_ready(&self, component: ReadyComponent, elapsed: Duration);
}

/// A `MetricsSink` that discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn set_leader(&self, _role: LeaderRole, _leading: bool) {}

    fn observe_ready(&self, _component: ReadyComponent, _elapsed: Duration) {}
}

/// Prometheus backed metrics.
#[derive(Clone, Debug)]
pub struct PrometheusMetrics {
    registry: Registry,

    controller_leader: Gauge,
    cluster_manager_leader: Gauge,

    controller_ready: Gauge,
    cluster_manager_ready: Gauge,
    node_ready: Gauge,
}

impl PrometheusMetrics {
    /// Creates the metrics in a fresh registry.
    ///
    /// # Errors
    ///
    /// Returns an error if a metric cannot be registered.
    pub fn new() -> Result<Self, Error> {
        Self::with_registry(Registry::new())
    }

    /// Creates the metrics in `registry`.
    ///
    /// # Errors
    ///
    /// Returns an error if a metric cannot be registered, e.g. because it
    /// already exists in `registry`.
    pub fn with_registry(registry: Registry) -> Result<Self, Error> {
        let controller_leader = register_gauge_with_registry!(
            "ovnkube_controller_leader",
            "Identifies whether this instance is the leader ovnkube controller (1) or not (0)",
            registry
        )?;

        let cluster_manager_leader = register_gauge_with_registry!(
            "ovnkube_clustermanager_leader",
            "Identifies whether this instance is the leader cluster manager (1) or not (0)",
            registry
        )?;

        let controller_ready = register_gauge_with_registry!(
            "ovnkube_controller_ready_duration_seconds",
            "Time taken for the ovnkube controller to become ready",
            registry
        )?;

        let cluster_manager_ready = register_gauge_with_registry!(
            "ovnkube_clustermanager_ready_duration_seconds",
            "Time taken for the cluster manager to become ready",
            registry
        )?;

        let node_ready = register_gauge_with_registry!(
            "ovnkube_node_ready_duration_seconds",
            "Time taken for the node manager to become ready",
            registry
        )?;

        Ok(Self {
            registry,
            controller_leader,
            cluster_manager_leader,
            controller_ready,
            cluster_manager_ready,
            node_ready,
        })
    }

    /// The registry the metrics live in.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Current value of the leader gauge for `role`.
    #[must_use]
    pub fn leader(&self, role: LeaderRole) -> f64 {
        match role {
            LeaderRole::Controller => self.controller_leader.get(),
            LeaderRole::ClusterManager => self.cluster_manager_leader.get(),
        }
    }

    /// Renders the registry in the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn encode(&self) -> Result<String, Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;

        Ok(String::from_utf8(buffer)?)
    }
}

impl MetricsSink for PrometheusMetrics {
    fn set_leader(&self, role: LeaderRole, leading: bool) {
        let value = if leading { 1.0 } else { 0.0 };

        match role {
            LeaderRole::Controller => self.controller_leader.set(value),
            LeaderRole::ClusterManager => self.cluster_manager_leader.set(value),
        }
    }

    fn observe_ready(&self, component: ReadyComponent, elapsed: Duration) {
        let gauge = match component {
            ReadyComponent::ClusterManager => &self.cluster_manager_ready,
            ReadyComponent::Controller => &self.controller_ready,
            ReadyComponent::Node => &self.node_ready,
        };

        gauge.set(elapsed.as_secs_f64());
    }
}
