//! Abstract interface for lease-based distributed locks used for leader election.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::error::Error;
use std::fmt::{self, Debug, Display};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;

/// Marker trait for `LockManager` and `LeaseLock` errors
pub trait LockManagerError: Debug + Error + Send + Sync + 'static {}

/// Identifies a lock resource within a namespace.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LockResource {
    /// Namespace the lock lives in.
    pub namespace: String,

    /// Name of the lock within the namespace.
    pub name: String,
}

impl LockResource {
    /// Creates a new lock resource identifier.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl Display for LockResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// The record stored in a lease lock.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeaseRecord {
    /// Identity of the current holder. Empty when the lease has been released.
    pub holder_identity: String,

    /// How long the holder's claim is valid after each renewal.
    pub lease_duration: Duration,

    /// When the current holder first acquired the lease.
    pub acquire_time: SystemTime,

    /// When the current holder last renewed the lease.
    pub renew_time: SystemTime,

    /// Number of times the lease changed hands.
    pub leader_transitions: u32,
}

/// A lease record together with the revision it was read at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeaseSnapshot {
    /// The record.
    pub record: LeaseRecord,

    /// Opaque revision used for optimistic concurrency on update.
    pub revision: u64,
}

/// A single lease lock object, bound to one resource and one identity.
#[async_trait]
pub trait LeaseLock: Send + Sync + 'static {
    /// The error type for lease operations.
    type Error: LockManagerError;

    /// Identity this lock acts on behalf of.
    fn identity(&self) -> &str;

    /// Human readable description of the locked resource.
    fn describe(&self) -> String;

    /// Reads the current record, if any.
    async fn get(&self) -> Result<Option<LeaseSnapshot>, Self::Error>;

    /// Creates the record. Fails if a record already exists.
    async fn create(&self, record: LeaseRecord) -> Result<(), Self::Error>;

    /// Replaces the record, provided it is still at `revision`.
    async fn update(&self, record: LeaseRecord, revision: u64) -> Result<(), Self::Error>;
}

/// A trait representing a distributed lock backend capable of constructing lease locks.
pub trait LockManager: Send + Sync + 'static {
    /// The error type for the lock manager.
    type Error: LockManagerError;

    /// The lease lock type produced by this manager.
    type Lock: LeaseLock<Error = Self::Error>;

    /// Constructs a lease lock for `resource`, acting as `identity`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot construct the lock object.
    fn resource_lock(
        &self,
        resource: LockResource,
        identity: String,
    ) -> Result<Self::Lock, Self::Error>;
}
