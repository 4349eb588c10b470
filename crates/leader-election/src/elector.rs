use crate::error::Error;
use crate::{JITTER_FACTOR, LeaderElectionConfig};

use std::time::{Duration, SystemTime};

use ovnkube_locks::{LeaseLock, LeaseRecord};
use tokio::time::{Instant, sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Drives acquisition and renewal of a single lease.
pub struct LeaderElector<L: LeaseLock> {
    config: LeaderElectionConfig<L>,

    // last record seen and the local time it was first seen at
    observed_record: Option<LeaseRecord>,
    observed_time: Instant,

    reported_leader: String,
}

impl<L: LeaseLock> std::fmt::Debug for LeaderElector<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeaderElector")
            .field("name", &self.config.name)
            .field("observed_record", &self.observed_record)
            .field("observed_time", &self.observed_time)
            .field("reported_leader", &self.reported_leader)
            .finish_non_exhaustive()
    }
}

impl<L: LeaseLock> LeaderElector<L> {
    /// Creates a new elector after validating the timing configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the identity is empty, or if the lease duration,
    /// renew deadline and retry period are inconsistent or too large to
    /// schedule.
    pub fn new(config: LeaderElectionConfig<L>) -> Result<Self, Error> {
        if config.lease_duration.is_zero() {
            return Err(Error::Zero("lease duration"));
        }

        if config.renew_deadline.is_zero() {
            return Err(Error::Zero("renew deadline"));
        }

        if config.retry_period.is_zero() {
            return Err(Error::Zero("retry period"));
        }

        let now = Instant::now();
        for (name, value) in [
            ("lease duration", config.lease_duration),
            ("renew deadline", config.renew_deadline),
        ] {
            if now.checked_add(value).is_none() {
                return Err(Error::TooLarge { name, value });
            }
        }

        // the longest jittered retry must still be representable
        let longest_retry = scale(config.retry_period, 1.0 + JITTER_FACTOR)
            .filter(|retry| now.checked_add(*retry).is_some())
            .ok_or(Error::TooLarge {
                name: "retry period",
                value: config.retry_period,
            })?;

        if config.lease_duration <= config.renew_deadline {
            return Err(Error::LeaseNotLongerThanRenew {
                lease: config.lease_duration,
                renew: config.renew_deadline,
            });
        }

        let threshold = scale(config.retry_period, JITTER_FACTOR).unwrap_or(longest_retry);
        if config.renew_deadline <= threshold {
            return Err(Error::RenewDeadlineTooShort {
                renew: config.renew_deadline,
                threshold,
            });
        }

        if config.lock.identity().is_empty() {
            return Err(Error::EmptyIdentity);
        }

        Ok(Self {
            config,
            observed_record: None,
            observed_time: Instant::now(),
            reported_leader: String::new(),
        })
    }

    /// Runs the election until `token` is cancelled or leadership is lost.
    ///
    /// `on_stopped_leading` is always invoked before returning.
    pub async fn run(mut self, token: CancellationToken) {
        if self.acquire(&token).await {
            let leading_token = token.child_token();

            self.config.metric.on(&self.config.name);

            let callbacks = self.config.callbacks.clone();
            let started_token = leading_token.clone();
            tokio::spawn(async move {
                callbacks.on_started_leading(started_token).await;
            });

            self.renew(&token).await;

            leading_token.cancel();
            self.config.metric.off(&self.config.name);

            if self.config.release_on_cancel && token.is_cancelled() {
                self.release().await;
            }
        }

        self.config.callbacks.on_stopped_leading();
    }

    async fn acquire(&mut self, token: &CancellationToken) -> bool {
        let description = self.config.lock.describe();
        info!(lock = %description, "attempting to acquire leader lease");

        loop {
            if token.is_cancelled() {
                return false;
            }

            let acquired = self.try_acquire_or_renew().await;
            self.maybe_report_transition();

            if acquired {
                info!(lock = %description, "successfully acquired lease");
                return true;
            }

            let delay = scale(
                self.config.retry_period,
                fastrand::f64().mul_add(JITTER_FACTOR, 1.0),
            )
            .unwrap_or(self.config.retry_period);

            tokio::select! {
                () = token.cancelled() => return false,
                () = sleep(delay) => {}
            }
        }
    }

    async fn renew(&mut self, token: &CancellationToken) {
        let description = self.config.lock.describe();
        let renew_deadline = self.config.renew_deadline;

        loop {
            tokio::select! {
                () = token.cancelled() => return,
                () = sleep(self.config.retry_period) => {}
            }

            let renewed = tokio::select! {
                () = token.cancelled() => return,
                result = timeout(renew_deadline, self.renew_until_success()) => result.is_ok(),
            };

            self.maybe_report_transition();

            if !renewed {
                warn!(lock = %description, "failed to renew lease: timed out");
                return;
            }

            debug!(lock = %description, "successfully renewed lease");
        }
    }

    async fn renew_until_success(&mut self) {
        loop {
            if self.try_acquire_or_renew().await {
                return;
            }

            sleep(self.config.retry_period).await;
        }
    }

    async fn try_acquire_or_renew(&mut self) -> bool {
        let wall_now = SystemTime::now();
        let now = Instant::now();
        let identity = self.config.lock.identity().to_string();

        let mut record = LeaseRecord {
            holder_identity: identity.clone(),
            lease_duration: self.config.lease_duration,
            acquire_time: wall_now,
            renew_time: wall_now,
            leader_transitions: 0,
        };

        let snapshot = match self.config.lock.get().await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                if let Err(e) = self.config.lock.create(record.clone()).await {
                    error!(
                        lock = %self.config.lock.describe(),
                        "error initially creating lease: {e}"
                    );
                    return false;
                }

                self.observe(record, now);
                return true;
            }
            Err(e) => {
                error!(lock = %self.config.lock.describe(), "error retrieving lease: {e}");
                return false;
            }
        };

        if self.observed_record.as_ref() != Some(&snapshot.record) {
            self.observe(snapshot.record.clone(), now);
        }

        let current = &snapshot.record;
        let is_leader = current.holder_identity == identity;

        // a lease too long to expire within this process never expires
        let unexpired = self
            .observed_time
            .checked_add(current.lease_duration)
            .is_none_or(|expiry| expiry > now);

        if !current.holder_identity.is_empty() && unexpired && !is_leader {
            debug!(
                lock = %self.config.lock.describe(),
                holder = %current.holder_identity,
                "lease is held and has not yet expired"
            );
            return false;
        }

        if is_leader {
            record.acquire_time = current.acquire_time;
            record.leader_transitions = current.leader_transitions;
        } else {
            record.leader_transitions = current.leader_transitions + 1;
        }

        if let Err(e) = self
            .config
            .lock
            .update(record.clone(), snapshot.revision)
            .await
        {
            error!(lock = %self.config.lock.describe(), "failed to update lease: {e}");
            return false;
        }

        self.observe(record, now);
        true
    }

    async fn release(&mut self) {
        let description = self.config.lock.describe();

        let snapshot = match self.config.lock.get().await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return,
            Err(e) => {
                error!(lock = %description, "failed to read lease before release: {e}");
                return;
            }
        };

        if snapshot.record.holder_identity != self.config.lock.identity() {
            return;
        }

        let now = SystemTime::now();
        let record = LeaseRecord {
            holder_identity: String::new(),
            lease_duration: Duration::from_secs(1),
            acquire_time: now,
            renew_time: now,
            leader_transitions: snapshot.record.leader_transitions,
        };

        match self.config.lock.update(record.clone(), snapshot.revision).await {
            Ok(()) => {
                info!(lock = %description, "released lease");
                self.observe(record, Instant::now());
            }
            Err(e) => error!(lock = %description, "failed to release lease: {e}"),
        }
    }

    fn observe(&mut self, record: LeaseRecord, at: Instant) {
        self.observed_record = Some(record);
        self.observed_time = at;
    }

    fn maybe_report_transition(&mut self) {
        let Some(observed) = &self.observed_record else {
            return;
        };

        if observed.holder_identity.is_empty() || observed.holder_identity == self.reported_leader
        {
            return;
        }

        self.reported_leader.clone_from(&observed.holder_identity);
        self.config.callbacks.on_new_leader(&self.reported_leader);
    }
}

fn scale(duration: Duration, factor: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(duration.as_secs_f64() * factor).ok()
}
