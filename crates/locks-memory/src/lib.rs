//! In-memory (single process) implementation of lease locks for local development.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

pub use error::Error;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ovnkube_locks::{LeaseLock, LeaseRecord, LeaseSnapshot, LockManager, LockResource};
use tokio::sync::Mutex;
use tracing::debug;

type Store = Arc<Mutex<HashMap<LockResource, LeaseSnapshot>>>;

/// In-memory lock manager.
///
/// Clones share the same backing store, so several managers (one per
/// simulated instance) contend for the same leases.
#[derive(Clone, Debug, Default)]
pub struct MemoryLockManager {
    store: Store,
    refusal: Option<String>,
}

impl MemoryLockManager {
    /// Creates a new instance of `MemoryLockManager`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: Arc::new(Mutex::new(HashMap::new())),
            refusal: None,
        }
    }

    /// Creates a lock manager whose `resource_lock` always fails with `reason`.
    #[must_use]
    pub fn refusing(reason: impl Into<String>) -> Self {
        Self {
            store: Arc::new(Mutex::new(HashMap::new())),
            refusal: Some(reason.into()),
        }
    }

    /// Returns the current record for `resource`, if any.
    pub async fn record(&self, resource: &LockResource) -> Option<LeaseRecord> {
        self.store
            .lock()
            .await
            .get(resource)
            .map(|snapshot| snapshot.record.clone())
    }

    /// Replaces the record for `resource` regardless of revision.
    pub async fn force(&self, resource: LockResource, record: LeaseRecord) {
        let mut store = self.store.lock().await;
        let revision = store.get(&resource).map_or(1, |s| s.revision + 1);
        store.insert(resource, LeaseSnapshot { record, revision });
    }
}

impl LockManager for MemoryLockManager {
    type Error = Error;
    type Lock = MemoryLeaseLock;

    fn resource_lock(
        &self,
        resource: LockResource,
        identity: String,
    ) -> Result<Self::Lock, Self::Error> {
        if let Some(reason) = &self.refusal {
            return Err(Error::Construction(reason.clone()));
        }

        Ok(MemoryLeaseLock {
            store: self.store.clone(),
            resource,
            identity,
        })
    }
}

/// Lease lock backed by a `MemoryLockManager` store.
#[derive(Clone, Debug)]
pub struct MemoryLeaseLock {
    store: Store,
    resource: LockResource,
    identity: String,
}

#[async_trait]
impl LeaseLock for MemoryLeaseLock {
    type Error = Error;

    fn identity(&self) -> &str {
        &self.identity
    }

    fn describe(&self) -> String {
        self.resource.to_string()
    }

    async fn get(&self) -> Result<Option<LeaseSnapshot>, Self::Error> {
        Ok(self.store.lock().await.get(&self.resource).cloned())
    }

    async fn create(&self, record: LeaseRecord) -> Result<(), Self::Error> {
        let mut store = self.store.lock().await;

        if store.contains_key(&self.resource) {
            return Err(Error::AlreadyExists(self.describe()));
        }

        debug!(lock = %self.resource, holder = %record.holder_identity, "lease created");
        store.insert(
            self.resource.clone(),
            LeaseSnapshot {
                record,
                revision: 1,
            },
        );

        Ok(())
    }

    async fn update(&self, record: LeaseRecord, revision: u64) -> Result<(), Self::Error> {
        let mut store = self.store.lock().await;

        let current = store
            .get_mut(&self.resource)
            .ok_or_else(|| Error::NotFound(self.resource.to_string()))?;

        if current.revision != revision {
            return Err(Error::RevisionConflict {
                resource: self.resource.to_string(),
                expected: revision,
                found: current.revision,
            });
        }

        current.record = record;
        current.revision += 1;

        Ok(())
    }
}
