//! The ovnkube binary.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::sync::Arc;

use clap::Parser;
use ovnkube::{
    Config, Coordinator, DEFAULT_NAMESPACE, DEFAULT_ZONE, Error, HaConfig, LocalCollaborators,
    RoleInputs, RunMode, ShutdownSignalBridge,
};
use ovnkube_locks_memory::MemoryLockManager;
use ovnkube_metrics::PrometheusMetrics;
use thiserror::Error as ThisError;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_panic::panic_hook;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

#[derive(Debug, ThisError)]
enum MainError {
    #[error(transparent)]
    Ovnkube(#[from] Error),

    #[error("could not set global default subscriber: {0}")]
    SetTracing(#[from] TryInitError),
}

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Run the cluster manager and the ovnkube controller with this identity
    #[arg(long, default_value = "", env = "OVNKUBE_INIT_MASTER")]
    init_master: String,

    /// Run the cluster manager with this identity
    #[arg(long, default_value = "", env = "OVNKUBE_INIT_CLUSTER_MANAGER")]
    init_cluster_manager: String,

    /// Run the ovnkube controller with this identity
    #[arg(long, default_value = "", env = "OVNKUBE_INIT_OVNKUBE_CONTROLLER")]
    init_ovnkube_controller: String,

    /// Run the node manager for this node
    #[arg(long, default_value = "", env = "OVNKUBE_INIT_NODE")]
    init_node: String,

    /// Clean up the configuration of this node and exit
    #[arg(long, default_value = "", env = "OVNKUBE_CLEANUP_NODE")]
    cleanup_node: String,

    /// Zone this instance belongs to
    #[arg(long, default_value = DEFAULT_ZONE, env = "OVNKUBE_ZONE")]
    zone: String,

    /// Namespace of the leader election lease
    #[arg(long, default_value = DEFAULT_NAMESPACE, env = "OVNKUBE_NAMESPACE")]
    namespace: String,

    /// Leader election lease duration in seconds
    #[arg(long, default_value_t = 137, env = "OVNKUBE_HA_ELECTION_LEASE_DURATION")]
    ha_election_lease_duration: u64,

    /// Leader election renew deadline in seconds
    #[arg(long, default_value_t = 107, env = "OVNKUBE_HA_ELECTION_RENEW_DEADLINE")]
    ha_election_renew_deadline: u64,

    /// Leader election retry period in seconds
    #[arg(long, default_value_t = 26, env = "OVNKUBE_HA_ELECTION_RETRY_PERIOD")]
    ha_election_retry_period: u64,

    /// Standalone cluster manager lease duration in seconds
    #[arg(
        long,
        default_value_t = 137,
        env = "OVNKUBE_CLUSTER_MANAGER_HA_ELECTION_LEASE_DURATION"
    )]
    cluster_manager_ha_election_lease_duration: u64,

    /// Standalone cluster manager renew deadline in seconds
    #[arg(
        long,
        default_value_t = 107,
        env = "OVNKUBE_CLUSTER_MANAGER_HA_ELECTION_RENEW_DEADLINE"
    )]
    cluster_manager_ha_election_renew_deadline: u64,

    /// Standalone cluster manager retry period in seconds
    #[arg(
        long,
        default_value_t = 26,
        env = "OVNKUBE_CLUSTER_MANAGER_HA_ELECTION_RETRY_PERIOD"
    )]
    cluster_manager_ha_election_retry_period: u64,

    /// Keep the lease on shutdown instead of releasing it
    #[arg(long, env = "OVNKUBE_KEEP_LEASE_ON_SHUTDOWN")]
    keep_lease_on_shutdown: bool,
}

impl Args {
    fn role_inputs(&self) -> RoleInputs {
        RoleInputs {
            master: self.init_master.clone(),
            cluster_manager: self.init_cluster_manager.clone(),
            ovnkube_controller: self.init_ovnkube_controller.clone(),
            node: self.init_node.clone(),
            cleanup_node: self.cleanup_node.clone(),
        }
    }

    fn config(&self) -> Config {
        Config {
            zone: self.zone.clone(),
            namespace: self.namespace.clone(),
            master_ha: HaConfig::from_secs(
                self.ha_election_lease_duration,
                self.ha_election_renew_deadline,
                self.ha_election_retry_period,
            ),
            cluster_manager_ha: HaConfig::from_secs(
                self.cluster_manager_ha_election_lease_duration,
                self.cluster_manager_ha_election_renew_deadline,
                self.cluster_manager_ha_election_retry_period,
            ),
            release_on_cancel: !self.keep_lease_on_shutdown,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), MainError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init()?;

    std::panic::set_hook(Box::new(panic_hook));

    Ok(run(Args::parse()).await?)
}

async fn run(args: Args) -> Result<(), Error> {
    let mode = RunMode::determine(&args.role_inputs())?;
    info!(
        identity = %mode.identity(),
        cluster_manager = mode.cluster_manager(),
        ovnkube_controller = mode.ovnkube_controller(),
        node = mode.node(),
        cleanup_node = mode.cleanup_node(),
        "starting ovnkube"
    );

    let metrics = Arc::new(PrometheusMetrics::new()?);

    let shutdown_token = CancellationToken::new();
    let bridge = ShutdownSignalBridge::install(shutdown_token.clone())?;

    let coordinator = Coordinator::new(
        mode,
        args.config(),
        Arc::new(LocalCollaborators),
        MemoryLockManager::new(),
        metrics,
    );

    let result = coordinator.run(bridge.handle()).await;

    shutdown_token.cancel();
    bridge.wait().await;

    match &result {
        Ok(()) => info!("ovnkube exited"),
        Err(e) => error!("ovnkube exited with error: {e}"),
    }

    result
}
