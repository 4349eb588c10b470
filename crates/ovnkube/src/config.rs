use crate::mode::RunMode;

use std::time::Duration;

use ovnkube_locks::LockResource;

/// The default (unpartitioned) zone.
pub const DEFAULT_ZONE: &str = "global";

/// Namespace holding the leader election leases.
pub const DEFAULT_NAMESPACE: &str = "ovn-kubernetes";

/// Base name of the leader election lease.
pub const LOCK_NAME: &str = "ovn-kubernetes-master";

/// Leader election timing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HaConfig {
    /// How long a lease stays valid after the last renewal.
    pub lease_duration: Duration,

    /// How long the leader keeps retrying a renewal.
    pub renew_deadline: Duration,

    /// Interval between acquire and renew attempts.
    pub retry_period: Duration,
}

impl HaConfig {
    /// Creates a timing triple from whole seconds.
    #[must_use]
    pub const fn from_secs(lease_duration: u64, renew_deadline: u64, retry_period: u64) -> Self {
        Self {
            lease_duration: Duration::from_secs(lease_duration),
            renew_deadline: Duration::from_secs(renew_deadline),
            retry_period: Duration::from_secs(retry_period),
        }
    }
}

impl Default for HaConfig {
    fn default() -> Self {
        Self::from_secs(137, 107, 26)
    }
}

/// Process-wide configuration consumed by the coordinator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Zone this instance belongs to.
    pub zone: String,

    /// Namespace of the leader election lease.
    pub namespace: String,

    /// Timing used whenever the ovnkube controller is active.
    pub master_ha: HaConfig,

    /// Timing used by a standalone cluster manager.
    pub cluster_manager_ha: HaConfig,

    /// Release the lease on graceful shutdown.
    pub release_on_cancel: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            zone: DEFAULT_ZONE.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            master_ha: HaConfig::default(),
            cluster_manager_ha: HaConfig::default(),
            release_on_cancel: true,
        }
    }
}

impl Config {
    /// Picks the timing for `mode`. Any mode including the controller uses the
    /// master timing; a standalone cluster manager uses its own.
    #[must_use]
    pub const fn ha_config(&self, mode: &RunMode) -> HaConfig {
        if mode.ovnkube_controller() {
            self.master_ha
        } else {
            self.cluster_manager_ha
        }
    }

    /// Name of the lease `mode` contends for.
    ///
    /// Controllers owning a specific zone get a zone-suffixed lease so that
    /// zones do not contend with each other. The cluster manager is cluster
    /// wide and always uses the base name.
    #[must_use]
    pub fn lock_name(&self, mode: &RunMode) -> String {
        if mode.ovnkube_controller() && self.zone != DEFAULT_ZONE {
            format!("{LOCK_NAME}-{}", self.zone)
        } else {
            LOCK_NAME.to_string()
        }
    }

    /// The lease resource `mode` contends for.
    #[must_use]
    pub fn lock_resource(&self, mode: &RunMode) -> LockResource {
        LockResource::new(self.namespace.clone(), self.lock_name(mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::RoleInputs;

    fn mode(master: &str, cluster_manager: &str, ovnkube_controller: &str) -> RunMode {
        RunMode::determine_with_override(
            &RoleInputs {
                master: master.to_string(),
                cluster_manager: cluster_manager.to_string(),
                ovnkube_controller: ovnkube_controller.to_string(),
                ..RoleInputs::default()
            },
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_lock_name_in_default_zone() {
        let config = Config::default();

        assert_eq!(config.lock_name(&mode("a", "", "")), "ovn-kubernetes-master");
        assert_eq!(config.lock_name(&mode("", "", "a")), "ovn-kubernetes-master");
        assert_eq!(config.lock_name(&mode("", "a", "")), "ovn-kubernetes-master");
    }

    #[test]
    fn test_lock_name_is_zone_scoped_for_controllers() {
        let config = Config {
            zone: "az-1".to_string(),
            ..Config::default()
        };

        assert_eq!(config.lock_name(&mode("", "", "a")), "ovn-kubernetes-master-az-1");
        assert_eq!(config.lock_name(&mode("a", "", "")), "ovn-kubernetes-master-az-1");
        assert_eq!(config.lock_name(&mode("", "a", "")), "ovn-kubernetes-master");

        let resource = config.lock_resource(&mode("", "", "a"));
        assert_eq!(resource.to_string(), "ovn-kubernetes/ovn-kubernetes-master-az-1");
    }

    #[test]
    fn test_ha_config_priority() {
        let config = Config {
            master_ha: HaConfig::from_secs(60, 30, 20),
            cluster_manager_ha: HaConfig::from_secs(90, 60, 10),
            ..Config::default()
        };

        assert_eq!(config.ha_config(&mode("a", "", "")), config.master_ha);
        assert_eq!(config.ha_config(&mode("", "", "a")), config.master_ha);
        assert_eq!(config.ha_config(&mode("", "a", "")), config.cluster_manager_ha);
    }
}
