//! Recording fakes shared by the ovnkube integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use ovnkube::{Collaborators, RoleInputs, RunMode, SourceScope};
use ovnkube_component::{BoxError, Component, ReadModel};
use ovnkube_locks::{LockManager, LockResource};
use ovnkube_locks_memory::MemoryLockManager;
use ovnkube_metrics::{LeaderRole, MetricsSink, ReadyComponent};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

pub const CLUSTER_MANAGER: &str = "cluster-manager";
pub const CONTROLLER: &str = "controller";
pub const NODE: &str = "node";

/// Builds a run mode from the five role inputs, without the pod name override.
pub fn mode(
    master: &str,
    cluster_manager: &str,
    ovnkube_controller: &str,
    node: &str,
    cleanup_node: &str,
) -> RunMode {
    RunMode::determine_with_override(
        &RoleInputs {
            master: master.to_string(),
            cluster_manager: cluster_manager.to_string(),
            ovnkube_controller: ovnkube_controller.to_string(),
            node: node.to_string(),
            cleanup_node: cleanup_node.to_string(),
        },
        None,
    )
    .unwrap()
}

/// Shared, ordered log of everything the fakes observed.
#[derive(Clone, Debug, Default)]
pub struct Events(Arc<Mutex<Vec<String>>>);

impl Events {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().push(event.into());
    }

    pub fn all(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn contains(&self, event: &str) -> bool {
        self.0.lock().iter().any(|e| e == event)
    }

    pub fn count(&self, event: &str) -> usize {
        self.0.lock().iter().filter(|e| *e == event).count()
    }

    pub fn position(&self, event: &str) -> Option<usize> {
        self.0.lock().iter().position(|e| e == event)
    }

    /// Events whose name starts with `prefix`, in order.
    pub fn with_prefix(&self, prefix: &str) -> Vec<String> {
        self.0
            .lock()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Waits until `event` has been recorded.
    pub async fn wait_for(&self, event: &str) {
        tokio::time::timeout(Duration::from_secs(30), async {
            while !self.contains(event) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {event}; saw {:?}", self.all()));
    }
}

/// How a fake component's `start` ends.
#[derive(Clone, Copy, Debug, Default)]
pub enum Outcome {
    #[default]
    Ready,
    Fail,
    Panic,
}

/// Start behaviour of a fake component.
#[derive(Clone, Debug, Default)]
pub struct Behavior {
    /// Wait for this notification, or for cancellation, before finishing start.
    pub wait_for: Option<Arc<Notify>>,

    /// Fire this notification once start begins.
    pub release: Option<Arc<Notify>>,

    pub outcome: Outcome,
}

impl Behavior {
    pub fn failing() -> Self {
        Self {
            outcome: Outcome::Fail,
            ..Self::default()
        }
    }

    pub fn panicking() -> Self {
        Self {
            outcome: Outcome::Panic,
            ..Self::default()
        }
    }
}

pub struct RecordingComponent {
    name: &'static str,
    behavior: Behavior,
    events: Events,
    stops: AtomicUsize,
}

impl RecordingComponent {
    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Component for RecordingComponent {
    fn name(&self) -> &str {
        self.name
    }

    async fn start(&self, token: CancellationToken) -> Result<(), BoxError> {
        self.events.push(format!("start:{}", self.name));

        if let Some(release) = &self.behavior.release {
            release.notify_one();
        }

        if let Some(wait_for) = &self.behavior.wait_for {
            tokio::select! {
                () = wait_for.notified() => {}
                () = token.cancelled() => {
                    self.events.push(format!("abandoned:{}", self.name));
                    return Err(format!("{} cancelled while starting", self.name).into());
                }
            }
        }

        match self.behavior.outcome {
            Outcome::Ready => {
                self.events.push(format!("started:{}", self.name));
                Ok(())
            }
            Outcome::Fail => Err(format!("{} refused to start", self.name).into()),
            Outcome::Panic => panic!("{} exploded", self.name),
        }
    }

    async fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.events.push(format!("stop:{}", self.name));
    }
}

pub struct RecordingReadModel {
    scope: String,
    events: Events,
}

#[async_trait]
impl ReadModel for RecordingReadModel {
    fn name(&self) -> &str {
        &self.scope
    }

    async fn shutdown(&self) {
        self.events.push(format!("shutdown:{}", self.scope));
    }
}

/// Collaborators that hand out recording fakes.
#[derive(Default)]
pub struct RecordingCollaborators {
    pub events: Events,
    behaviors: HashMap<&'static str, Behavior>,
    components: Mutex<HashMap<&'static str, Arc<RecordingComponent>>>,
    read_model_failure: bool,
    cleanup: Outcome,
}

impl RecordingCollaborators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_behavior(mut self, component: &'static str, behavior: Behavior) -> Self {
        self.behaviors.insert(component, behavior);
        self
    }

    pub fn with_failing_read_model(mut self) -> Self {
        self.read_model_failure = true;
        self
    }

    pub fn with_cleanup(mut self, outcome: Outcome) -> Self {
        self.cleanup = outcome;
        self
    }

    /// Number of times `component` was stopped; zero if it was never created.
    pub fn stops(&self, component: &str) -> usize {
        self.components
            .lock()
            .get(component)
            .map_or(0, |component| component.stops())
    }

    fn create(&self, name: &'static str) -> Arc<dyn Component> {
        self.events.push(format!("create:{name}"));

        let component = Arc::new(RecordingComponent {
            name,
            behavior: self.behaviors.get(name).cloned().unwrap_or_default(),
            events: self.events.clone(),
            stops: AtomicUsize::new(0),
        });

        self.components.lock().insert(name, component.clone());

        component
    }
}

#[async_trait]
impl Collaborators for RecordingCollaborators {
    async fn read_model(&self, scope: &SourceScope) -> Result<Arc<dyn ReadModel>, BoxError> {
        if self.read_model_failure {
            return Err("watch factory unavailable".into());
        }

        self.events.push(format!("source:{scope}"));

        Ok(Arc::new(RecordingReadModel {
            scope: scope.to_string(),
            events: self.events.clone(),
        }))
    }

    async fn cluster_manager(
        &self,
        _source: Arc<dyn ReadModel>,
        _identity: &str,
    ) -> Result<Arc<dyn Component>, BoxError> {
        Ok(self.create(CLUSTER_MANAGER))
    }

    async fn controller_manager(
        &self,
        _source: Arc<dyn ReadModel>,
    ) -> Result<Arc<dyn Component>, BoxError> {
        Ok(self.create(CONTROLLER))
    }

    async fn node_manager(
        &self,
        _source: Arc<dyn ReadModel>,
        _identity: &str,
    ) -> Result<Arc<dyn Component>, BoxError> {
        Ok(self.create(NODE))
    }

    async fn cleanup_node(&self, identity: &str) -> Result<(), BoxError> {
        self.events.push(format!("cleanup:{identity}"));

        match self.cleanup {
            Outcome::Ready => Ok(()),
            Outcome::Fail => Err("leftover flows could not be removed".into()),
            Outcome::Panic => panic!("cleanup of {identity} exploded"),
        }
    }
}

/// Metrics sink that records every call.
#[derive(Debug, Default)]
pub struct RecordingMetrics {
    leader: Mutex<Vec<(LeaderRole, bool)>>,
    ready: Mutex<Vec<ReadyComponent>>,
}

impl RecordingMetrics {
    pub fn leader(&self) -> Vec<(LeaderRole, bool)> {
        self.leader.lock().clone()
    }

    pub fn ready(&self) -> Vec<ReadyComponent> {
        self.ready.lock().clone()
    }
}

impl MetricsSink for RecordingMetrics {
    fn set_leader(&self, role: LeaderRole, leading: bool) {
        self.leader.lock().push((role, leading));
    }

    fn observe_ready(&self, component: ReadyComponent, _elapsed: Duration) {
        self.ready.lock().push(component);
    }
}

/// Memory lock manager that counts constructed lock objects.
#[derive(Clone, Debug, Default)]
pub struct CountingLockManager {
    pub inner: MemoryLockManager,
    constructed: Arc<AtomicUsize>,
}

impl CountingLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constructed(&self) -> usize {
        self.constructed.load(Ordering::SeqCst)
    }
}

impl LockManager for CountingLockManager {
    type Error = <MemoryLockManager as LockManager>::Error;
    type Lock = <MemoryLockManager as LockManager>::Lock;

    fn resource_lock(
        &self,
        resource: LockResource,
        identity: String,
    ) -> Result<Self::Lock, Self::Error> {
        self.constructed.fetch_add(1, Ordering::SeqCst);
        self.inner.resource_lock(resource, identity)
    }
}
