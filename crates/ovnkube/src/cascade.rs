//! The ordered, partially concurrent start of the managed components.

use crate::collaborators::{Collaborators, SourceScope};
use crate::error::{Error, Result};
use crate::guard::{contain_panics, panic_message};
use crate::handles::{ComponentHandle, HandleStack};
use crate::mode::RunMode;

use std::sync::Arc;

use ovnkube_component::{Component, ReadModel};
use ovnkube_metrics::{MetricsSink, ReadyComponent};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::info;

const CLUSTER_MANAGER: &str = "cluster manager";
const CONTROLLER: &str = "ovnkube controller";
const NODE: &str = "node network controller manager";

/// Read-model sources for the active roles. Roles may share one source.
#[derive(Default)]
struct Sources {
    cluster_manager: Option<Arc<dyn ReadModel>>,
    controller: Option<Arc<dyn ReadModel>>,
    node: Option<Arc<dyn ReadModel>>,
}

/// Starts the components of one run mode and stops them again on exit.
pub struct Cascade<C: Collaborators> {
    mode: RunMode,
    collaborators: Arc<C>,
    metrics: Arc<dyn MetricsSink>,
}

impl<C: Collaborators> Cascade<C> {
    /// Creates a cascade for `mode`.
    pub fn new(mode: RunMode, collaborators: Arc<C>, metrics: Arc<dyn MetricsSink>) -> Self {
        Self {
            mode,
            collaborators,
            metrics,
        }
    }

    /// Starts every active component, waits for `token` to be cancelled and
    /// then stops whatever was started, most recent first.
    ///
    /// Returns early with the first fatal error; components started before
    /// the failure are still stopped. Components are handed a child of
    /// `token` that is cancelled as soon as the cascade fails, so a component
    /// still starting gives up instead of blocking the return. Panics are
    /// converted into errors.
    ///
    /// # Errors
    ///
    /// Returns an error if a source or component cannot be created or started.
    pub async fn run(&self, token: CancellationToken) -> Result<()> {
        let mut handles = HandleStack::new();
        let components = token.child_token();

        let result = contain_panics(self.start_and_wait(&mut handles, &components)).await;

        components.cancel();
        handles.stop_all().await;

        result
    }

    async fn start_and_wait(
        &self,
        handles: &mut HandleStack,
        token: &CancellationToken,
    ) -> Result<()> {
        let started = Instant::now();
        let identity = self.mode.identity();

        let sources = self.create_sources(handles).await?;

        if let Some(source) = sources.cluster_manager {
            let cluster_manager = self
                .collaborators
                .cluster_manager(source, identity)
                .await
                .map_err(|source| Error::ComponentCreate {
                    component: CLUSTER_MANAGER,
                    source,
                })?;

            start_component(CLUSTER_MANAGER, &cluster_manager, token).await?;
            handles.push(ComponentHandle::component(cluster_manager));

            self.metrics
                .observe_ready(ReadyComponent::ClusterManager, started.elapsed());
        }

        // the controller may wait for the node to publish its zone, so it
        // must not hold up the node start
        let controller = match sources.controller {
            Some(source) => Some(self.spawn_controller(source, token, started).await?),
            None => None,
        };

        let node_result = match sources.node {
            Some(source) => contain_panics(self.start_node(source, token, started))
                .await
                .map(Some),
            None => Ok(None),
        };

        match &node_result {
            Ok(Some(node)) => handles.push(ComponentHandle::component(node.clone())),
            Ok(None) => {}
            // the controller may be waiting on the node; release it before joining
            Err(_) => token.cancel(),
        }

        let controller_result = match controller {
            Some((controller, task)) => {
                let result = join_controller(task).await;
                if result.is_ok() {
                    handles.push(ComponentHandle::component(controller));
                }
                result
            }
            None => Ok(()),
        };

        node_result?;
        controller_result?;

        info!("all components started");

        token.cancelled().await;

        Ok(())
    }

    async fn create_sources(&self, handles: &mut HandleStack) -> Result<Sources> {
        let mode = &self.mode;

        let sources = match (mode.cluster_manager(), mode.ovnkube_controller()) {
            (true, true) => {
                let source = self.read_model(SourceScope::Master, handles).await?;
                Sources {
                    cluster_manager: Some(source.clone()),
                    controller: Some(source.clone()),
                    node: mode.node().then_some(source),
                }
            }
            (false, true) => {
                let source = self.read_model(SourceScope::Controller, handles).await?;
                Sources {
                    controller: Some(source.clone()),
                    node: mode.node().then_some(source),
                    ..Sources::default()
                }
            }
            (true, false) => Sources {
                cluster_manager: Some(self.read_model(SourceScope::ClusterManager, handles).await?),
                ..Sources::default()
            },
            (false, false) if mode.node() => {
                let scope = SourceScope::Node {
                    identity: mode.identity().to_string(),
                };
                Sources {
                    node: Some(self.read_model(scope, handles).await?),
                    ..Sources::default()
                }
            }
            (false, false) => Sources::default(),
        };

        Ok(sources)
    }

    async fn read_model(
        &self,
        scope: SourceScope,
        handles: &mut HandleStack,
    ) -> Result<Arc<dyn ReadModel>> {
        let source = self
            .collaborators
            .read_model(&scope)
            .await
            .map_err(|source| Error::ReadModel {
                scope: scope.to_string(),
                source,
            })?;

        info!(%scope, "created read model");
        handles.push(ComponentHandle::read_model(source.clone()));

        Ok(source)
    }

    async fn spawn_controller(
        &self,
        source: Arc<dyn ReadModel>,
        token: &CancellationToken,
        started: Instant,
    ) -> Result<(Arc<dyn Component>, JoinHandle<Result<()>>)> {
        let controller = self
            .collaborators
            .controller_manager(source)
            .await
            .map_err(|source| Error::ComponentCreate {
                component: CONTROLLER,
                source,
            })?;

        let task = tokio::spawn({
            let controller = controller.clone();
            let metrics = self.metrics.clone();
            let token = token.clone();

            async move {
                start_component(CONTROLLER, &controller, &token).await?;
                metrics.observe_ready(ReadyComponent::Controller, started.elapsed());

                Ok(())
            }
        });

        Ok((controller, task))
    }

    async fn start_node(
        &self,
        source: Arc<dyn ReadModel>,
        token: &CancellationToken,
        started: Instant,
    ) -> Result<Arc<dyn Component>> {
        let node = self
            .collaborators
            .node_manager(source, self.mode.identity())
            .await
            .map_err(|source| Error::ComponentCreate {
                component: NODE,
                source,
            })?;

        start_component(NODE, &node, token).await?;
        self.metrics.observe_ready(ReadyComponent::Node, started.elapsed());

        Ok(node)
    }
}

async fn start_component(
    label: &'static str,
    component: &Arc<dyn Component>,
    token: &CancellationToken,
) -> Result<()> {
    info!("starting {label} ({})", component.name());

    component
        .start(token.clone())
        .await
        .map_err(|source| Error::ComponentStart {
            component: label,
            source,
        })?;

    info!("started {label}");

    Ok(())
}

async fn join_controller(task: JoinHandle<Result<()>>) -> Result<()> {
    match task.await {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(Error::Panic(panic_message(e.into_panic().as_ref()))),
        Err(e) => Err(Error::ComponentStart {
            component: CONTROLLER,
            source: Box::new(e),
        }),
    }
}
