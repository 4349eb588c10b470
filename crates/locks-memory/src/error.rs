use ovnkube_locks::LockManagerError;
use thiserror::Error;

/// Errors from the in-memory lock backend.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// A record already exists for the resource.
    #[error("lease {0} already exists")]
    AlreadyExists(String),

    /// The lock manager was configured to refuse constructing locks.
    #[error("lock construction refused: {0}")]
    Construction(String),

    /// No record exists for the resource.
    #[error("lease {0} not found")]
    NotFound(String),

    /// The record changed since it was read.
    #[error("lease {resource} was modified (expected revision {expected}, found {found})")]
    RevisionConflict {
        /// Resource being updated.
        resource: String,
        /// Revision the caller read.
        expected: u64,
        /// Revision currently stored.
        found: u64,
    },
}

impl LockManagerError for Error {}
