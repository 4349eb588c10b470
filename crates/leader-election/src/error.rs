use std::time::Duration;

use thiserror::Error;

/// Errors raised while constructing a `LeaderElector`.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// The lock has no identity to elect.
    #[error("lock identity is empty")]
    EmptyIdentity,

    /// Lease duration does not exceed the renew deadline.
    #[error("lease duration ({lease:?}) must be greater than renew deadline ({renew:?})")]
    LeaseNotLongerThanRenew {
        /// Configured lease duration.
        lease: Duration,
        /// Configured renew deadline.
        renew: Duration,
    },

    /// Renew deadline does not leave room for a jittered retry.
    #[error(
        "renew deadline ({renew:?}) must be greater than jittered retry period ({threshold:?})"
    )]
    RenewDeadlineTooShort {
        /// Configured renew deadline.
        renew: Duration,
        /// Retry period scaled by the jitter factor.
        threshold: Duration,
    },

    /// A timing parameter is too large to be scheduled.
    #[error("{name} ({value:?}) is too large")]
    TooLarge {
        /// The offending parameter.
        name: &'static str,
        /// Its configured value.
        value: Duration,
    },

    /// A timing parameter is zero.
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}
