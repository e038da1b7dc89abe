//! Start/stop control for a background server loop.
//!
//! [`ServerLifecycle`] owns at most one running loop at a time. Every
//! transition (start, stop, or the loop ending on its own) is published as
//! a [`StateChanged`] event to subscribers.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::mcp::registry::ToolDescriptor;
use crate::mcp::server::McpServer;

/// How long [`ServerLifecycle::stop`] waits for the loop before aborting it.
pub const STOP_TIMEOUT: Duration = Duration::from_secs(5);

const EVENT_CAPACITY: usize = 16;

/// Published whenever the server starts or stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChanged {
    /// Whether the loop is running after the transition.
    pub running: bool,
}

struct Running {
    cancel: CancellationToken,
    finished: CancellationToken,
    task: JoinHandle<()>,
}

/// Runs an [`McpServer`] loop in the background on demand.
pub struct ServerLifecycle {
    server: Arc<McpServer>,
    running: Mutex<Option<Running>>,
    events: broadcast::Sender<StateChanged>,
}

impl ServerLifecycle {
    /// Creates a stopped lifecycle for `server`.
    #[must_use]
    pub fn new(server: Arc<McpServer>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            server,
            running: Mutex::new(None),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Running>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, running: bool) {
        // no subscribers is fine
        let _ = self.events.send(StateChanged { running });
    }

    /// Whether a loop is currently running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|r| !r.finished.is_cancelled())
    }

    /// Snapshot of the tools the server exposes.
    #[must_use]
    pub fn registered_tools(&self) -> Vec<ToolDescriptor> {
        self.server.registry().all()
    }

    /// Subscribes to state-changed events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StateChanged> {
        self.events.subscribe()
    }

    /// Starts the loop in the background.
    ///
    /// Returns `false` (and logs a warning) if it is already running.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start(&self) -> bool {
        let mut slot = self.lock();
        if slot.as_ref().is_some_and(|r| !r.finished.is_cancelled()) {
            tracing::warn!("MCP server is already running");
            return false;
        }

        // started must reach subscribers before the loop can report stopped
        tracing::info!("MCP server started");
        self.notify(true);

        let cancel = CancellationToken::new();
        let finished = CancellationToken::new();
        let server = Arc::clone(&self.server);
        let events = self.events.clone();
        let loop_cancel = cancel.clone();
        let loop_finished = finished.clone();

        let task = tokio::spawn(async move {
            // marks the loop finished even if the task is aborted
            let _guard = loop_finished.clone().drop_guard();
            match server.run(loop_cancel).await {
                Ok(()) => tracing::info!("MCP server stopped"),
                Err(e) => tracing::error!(error = %e, "MCP server error"),
            }
            loop_finished.cancel();
            let _ = events.send(StateChanged { running: false });
        });

        *slot = Some(Running {
            cancel,
            finished,
            task,
        });
        drop(slot);
        true
    }

    /// Stops the loop, waiting up to [`STOP_TIMEOUT`] for it to finish.
    ///
    /// A loop that does not finish in time is aborted.
    pub async fn stop(&self) {
        let running = {
            let mut slot = self.lock();
            match slot.as_ref() {
                Some(r) if !r.finished.is_cancelled() => slot.take(),
                _ => {
                    slot.take();
                    None
                }
            }
        };
        let Some(running) = running else {
            tracing::warn!("MCP server is not running");
            return;
        };

        tracing::info!("Stopping MCP server...");
        running.cancel.cancel();

        let mut task = running.task;
        if tokio::time::timeout(STOP_TIMEOUT, &mut task).await.is_err() {
            tracing::warn!("MCP server did not stop gracefully within timeout");
            task.abort();
        }

        self.notify(false);
    }

    /// Starts the loop if stopped, stops it if running.
    pub async fn toggle(&self) {
        if self.is_running() {
            self.stop().await;
        } else {
            self.start();
        }
    }

    /// Waits until the current loop has finished, whatever ended it.
    ///
    /// Returns immediately if nothing is running.
    pub async fn finished(&self) {
        let finished = self.lock().as_ref().map(|r| r.finished.clone());
        if let Some(finished) = finished {
            finished.cancelled().await;
        }
    }
}

impl Drop for ServerLifecycle {
    fn drop(&mut self) {
        if let Some(running) = self.lock().take() {
            running.cancel.cancel();
        }
    }
}
