use crate::mode::ModeError;

use ovnkube_component::BoxError;
use thiserror::Error;

/// Result alias for ovnkube operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the lifecycle coordinator.
#[derive(Debug, Error)]
pub enum Error {
    /// Leader election could not be set up.
    #[error("failed to set up leader election: {0}")]
    Acquisition(String),

    /// Node cleanup failed.
    #[error("failed to clean up node {identity}: {source}")]
    Cleanup {
        /// Identity of the node being cleaned up.
        identity: String,

        /// The underlying error.
        source: BoxError,
    },

    /// A component could not be constructed.
    #[error("failed to create {component}: {source}")]
    ComponentCreate {
        /// The component that could not be created.
        component: &'static str,

        /// The underlying error.
        source: BoxError,
    },

    /// A component failed to start.
    #[error("failed to start {component}: {source}")]
    ComponentStart {
        /// The component that failed.
        component: &'static str,

        /// The underlying error.
        source: BoxError,
    },

    /// Invalid or ambiguous role combination.
    #[error(transparent)]
    Configuration(#[from] ModeError),

    /// Metrics setup error.
    #[error(transparent)]
    Metrics(#[from] ovnkube_metrics::Error),

    /// A panic was caught and converted.
    #[error("recovering from a panic in ovnkube: {0}")]
    Panic(String),

    /// A read-model source could not be created.
    #[error("failed to create {scope} read model: {source}")]
    ReadModel {
        /// Scope of the source.
        scope: String,

        /// The underlying error.
        source: BoxError,
    },

    /// Could not install termination signal handlers.
    #[error("failed to install signal handler: {0}")]
    Signal(#[from] std::io::Error),
}
