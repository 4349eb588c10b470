//! Abstract interface for the long-running subsystems managed by ovnkube.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Error type returned by components and read-model sources.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Trait for managed components (cluster manager, controller manager, node manager).
///
/// `stop` is only ever called after `start` returned `Ok`, and at most once.
#[async_trait]
pub trait Component
where
    Self: Send + Sync + 'static,
{
    /// Get the name of the component.
    fn name(&self) -> &str;

    /// Start the component.
    ///
    /// The token is cancelled when the component should wind down. Start may
    /// block until the component is ready but must not block past cancellation.
    async fn start(&self, token: CancellationToken) -> Result<(), BoxError>;

    /// Stop the component.
    async fn stop(&self);
}

/// Trait for read-model (watch) sources consumed by components.
#[async_trait]
pub trait ReadModel
where
    Self: Send + Sync + 'static,
{
    /// Get the name of the source.
    fn name(&self) -> &str;

    /// Shut the source down. Called once by whichever owner created it.
    async fn shutdown(&self);
}
