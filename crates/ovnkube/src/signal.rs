//! Maps termination signals and fatal internal errors onto one cancellation.

use crate::error::Result;

use std::fmt;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Why shutdown was requested.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShutdownReason {
    /// A fatal error in a managed component.
    Fatal(String),

    /// Leadership of the distributed lock was lost.
    LeadershipLost,

    /// A termination signal was received.
    Signal(&'static str),
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fatal(error) => write!(f, "fatal error: {error}"),
            Self::LeadershipLost => f.write_str("leadership lost"),
            Self::Signal(signal) => write!(f, "received signal {signal}"),
        }
    }
}

/// Cloneable handle used to request shutdown.
#[derive(Clone, Debug)]
pub struct ShutdownHandle {
    sender: mpsc::Sender<ShutdownReason>,
    token: CancellationToken,
}

impl ShutdownHandle {
    /// Requests shutdown. Never blocks; only the first request has an effect.
    pub fn trigger(&self, reason: ShutdownReason) {
        if self.token.is_cancelled() {
            return;
        }

        match self.sender.try_send(reason) {
            // another request is already pending
            Ok(()) | Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Closed(reason)) => {
                debug!(%reason, "shutdown listener gone; cancelling directly");
                self.token.cancel();
            }
        }
    }

    /// The shared cancellation token.
    #[must_use]
    pub const fn token(&self) -> &CancellationToken {
        &self.token
    }
}

/// Listens for termination requests and cancels the shared token on the first one.
#[derive(Debug)]
pub struct ShutdownSignalBridge {
    handle: ShutdownHandle,
    listener: JoinHandle<()>,
}

impl ShutdownSignalBridge {
    /// Installs handlers for SIGHUP, SIGINT, SIGTERM and SIGQUIT.
    ///
    /// # Errors
    ///
    /// Returns an error if a signal handler cannot be registered.
    pub fn install(token: CancellationToken) -> Result<Self> {
        let signals = TerminationSignals::new()?;

        Ok(Self::spawn(token, Some(signals)))
    }

    /// Creates a bridge that only reacts to explicit requests and to the
    /// token itself.
    #[must_use]
    pub fn without_signals(token: CancellationToken) -> Self {
        Self::spawn(token, None)
    }

    fn spawn(token: CancellationToken, signals: Option<TerminationSignals>) -> Self {
        let (sender, mut receiver) = mpsc::channel(1);

        let listener_token = token.clone();
        let listener = tokio::spawn(async move {
            let reason = tokio::select! {
                signal = wait_for_signal(signals) => ShutdownReason::Signal(signal),
                Some(reason) = receiver.recv() => reason,
                () = listener_token.cancelled() => return,
            };

            info!("{reason}; shutting down");
            listener_token.cancel();
        });

        Self {
            handle: ShutdownHandle { sender, token },
            listener,
        }
    }

    /// A handle for requesting shutdown.
    #[must_use]
    pub fn handle(&self) -> ShutdownHandle {
        self.handle.clone()
    }

    /// Waits for the listener to finish. It finishes once the token is cancelled.
    pub async fn wait(self) {
        let _ = self.listener.await;
    }
}

async fn wait_for_signal(signals: Option<TerminationSignals>) -> &'static str {
    match signals {
        Some(mut signals) => signals.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(unix)]
struct TerminationSignals {
    hangup: tokio::signal::unix::Signal,
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
    quit: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl TerminationSignals {
    fn new() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            hangup: signal(SignalKind::hangup())?,
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
            quit: signal(SignalKind::quit())?,
        })
    }

    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.hangup.recv() => "SIGHUP",
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
            _ = self.quit.recv() => "SIGQUIT",
        }
    }
}

#[cfg(not(unix))]
struct TerminationSignals;

#[cfg(not(unix))]
impl TerminationSignals {
    #[allow(clippy::unnecessary_wraps)]
    const fn new() -> std::io::Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) -> &'static str {
        let _ = tokio::signal::ctrl_c().await;
        "interrupt"
    }
}
