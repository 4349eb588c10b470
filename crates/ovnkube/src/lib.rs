//! Role selection and lifecycle coordination for ovnkube.
//!
//! A single `ovnkube` process can run any valid combination of the cluster
//! manager, the ovnkube controller and the node manager. `RunMode` validates
//! the requested combination, and `Coordinator` either starts the components
//! directly or gates them on a leader election lease. Every exit path stops
//! what was started in reverse order.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod cascade;
mod collaborators;
mod config;
mod coordinator;
mod error;
mod guard;
mod handles;
mod leadership;
mod local;
mod mode;
mod signal;

pub use cascade::Cascade;
pub use collaborators::{Collaborators, SourceScope};
pub use config::{Config, DEFAULT_NAMESPACE, DEFAULT_ZONE, HaConfig, LOCK_NAME};
pub use coordinator::Coordinator;
pub use error::{Error, Result};
pub use handles::{ComponentHandle, HandleStack};
pub use leadership::{LeaderMetrics, LeaderPhase, LeaderState, LeadershipAdapter};
pub use local::{IdleComponent, IdleReadModel, LocalCollaborators};
pub use mode::{ExecutionPath, ModeError, POD_NAME_ENV, RoleInputs, RunMode};
pub use signal::{ShutdownHandle, ShutdownReason, ShutdownSignalBridge};
