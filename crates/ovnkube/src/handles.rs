//! Release handles for started components and the stack that unwinds them.

use crate::guard::panic_message;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use ovnkube_component::{Component, ReadModel};
use tracing::{error, info};

type StopFn = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// Owns the stop callback of one successfully started component or created
/// read-model source.
pub struct ComponentHandle {
    name: String,
    stop: StopFn,
}

impl ComponentHandle {
    /// Creates a handle from an arbitrary stop callback.
    pub fn new<F>(name: impl Into<String>, stop: F) -> Self
    where
        F: FnOnce() -> BoxFuture<'static, ()> + Send + 'static,
    {
        Self {
            name: name.into(),
            stop: Box::new(stop),
        }
    }

    /// Handle that calls `Component::stop`.
    #[must_use]
    pub fn component(component: Arc<dyn Component>) -> Self {
        let name = component.name().to_string();

        Self::new(name, move || async move { component.stop().await }.boxed())
    }

    /// Handle that calls `ReadModel::shutdown`.
    #[must_use]
    pub fn read_model(source: Arc<dyn ReadModel>) -> Self {
        let name = format!("{} read model", source.name());

        Self::new(name, move || async move { source.shutdown().await }.boxed())
    }

    /// Consumes the handle and runs its stop callback.
    pub async fn release(self) {
        (self.stop)().await;
    }
}

impl std::fmt::Debug for ComponentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentHandle")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Ordered list of handles, released in reverse registration order.
#[derive(Debug, Default)]
pub struct HandleStack {
    handles: Vec<ComponentHandle>,
}

impl HandleStack {
    /// Creates an empty stack.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            handles: Vec::new(),
        }
    }

    /// Registers a handle.
    pub fn push(&mut self, handle: ComponentHandle) {
        self.handles.push(handle);
    }

    /// Releases every handle, most recent first. Each handle is released at
    /// most once; a panicking stop callback does not prevent the rest.
    pub async fn stop_all(&mut self) {
        while let Some(handle) = self.handles.pop() {
            let name = handle.name.clone();
            info!("stopping {name}");

            if let Err(payload) = AssertUnwindSafe(handle.release()).catch_unwind().await {
                error!("panic while stopping {name}: {}", panic_message(payload.as_ref()));
            }
        }
    }
}
