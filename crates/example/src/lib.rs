//! Simulated TLS server whose connections report their lifecycle to a
//! lineage tracker.
//!
//! Nothing here touches the network. Each connection waits a fixed latency
//! for its peer, then runs a handshake callback inside its execution window.
//!
//! # Lifecycle
//!
//! ```text
//! accept()          handshake()                      close()
//! ───────▶ init ──▶ before ── callback ── after ···▶ destroy
//!                     │
//!                     └──▶ init TIMER (session timeout)
//!                            └──▶ before ── after ──▶ destroy
//! ```
//!
//! The session timer is created while the connection executes, so the
//! connection is its trigger.

use std::rc::Rc;
use std::time::Duration;

use lineage_core::error::TrackerError;
use lineage_core::id::AsyncId;
use lineage_core::resource::InvocationCounts;
use lineage_tracker::AsyncTracker;

/// Resource type reported for server connections.
pub const CONNECTION: &str = "CONNECTION";

/// Resource type reported for session timers.
pub const TIMER: &str = "TIMER";

/// Accepts simulated connections.
#[derive(Debug)]
pub struct Server {
    tracker: Rc<AsyncTracker>,
    latency: Duration,
}

impl Server {
    /// Creates a server reporting to `tracker`, with a 5ms peer latency.
    #[must_use]
    pub fn new(tracker: Rc<AsyncTracker>) -> Self {
        Self {
            tracker,
            latency: Duration::from_millis(5),
        }
    }

    /// Sets how long each peer takes to answer.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Returns the configured peer latency.
    #[must_use]
    pub fn latency(&self) -> Duration {
        self.latency
    }

    /// Accepts a connection, reporting its `init`.
    ///
    /// # Errors
    ///
    /// Whatever the tracker rejects.
    pub fn accept(&self) -> Result<Connection, TrackerError> {
        let uid = self.tracker.report_init(CONNECTION, None, None)?.into_value();
        tracing::info!(uid = uid.get(), "connection accepted");
        Ok(Connection {
            uid,
            tracker: Rc::clone(&self.tracker),
            latency: self.latency,
        })
    }
}

/// One accepted connection.
#[derive(Debug)]
pub struct Connection {
    uid: AsyncId,
    tracker: Rc<AsyncTracker>,
    latency: Duration,
}

impl Connection {
    /// Returns the connection's resource id.
    #[must_use]
    pub fn uid(&self) -> AsyncId {
        self.uid
    }

    /// Waits for the peer's hello, then runs `callback` as the handshake
    /// callback of this connection and arms a session timer.
    ///
    /// Must be awaited inside a [`tokio::task::LocalSet`]; the timer fires on
    /// a local task.
    ///
    /// # Errors
    ///
    /// Whatever the tracker rejects while reporting the window or the timer.
    pub async fn handshake<R>(
        &self,
        callback: impl FnOnce(&AsyncTracker) -> R,
    ) -> Result<R, TrackerError> {
        tokio::time::sleep(self.latency).await;

        let (timer, output) = self
            .tracker
            .within(self.uid, || -> Result<_, TrackerError> {
                let timer = self.tracker.report_init(TIMER, None, None)?.into_value();
                Ok((timer, callback(&self.tracker)))
            })??;
        tracing::info!(uid = self.uid.get(), timer = timer.get(), "handshake complete");

        tokio::task::spawn_local(session_timeout(
            Rc::clone(&self.tracker),
            timer,
            self.latency,
        ));
        Ok(output)
    }

    /// Closes the connection, reporting its `destroy`.
    ///
    /// # Errors
    ///
    /// Whatever the tracker rejects.
    pub fn close(self) -> Result<(), TrackerError> {
        self.tracker.report_destroy(self.uid)?;
        tracing::info!(uid = self.uid.get(), "connection closed");
        Ok(())
    }
}

async fn session_timeout(tracker: Rc<AsyncTracker>, timer: AsyncId, delay: Duration) {
    tokio::time::sleep(delay).await;
    let fired = tracker
        .within(timer, || {
            tracing::debug!(timer = timer.get(), "session timer fired");
        })
        .and_then(|()| tracker.report_destroy(timer).map(|_| ()));
    if let Err(err) = fired {
        tracing::warn!(%err, timer = timer.get(), "session timer report rejected");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Expected invocation counts
// ─────────────────────────────────────────────────────────────────────────────

/// Created, never run.
#[must_use]
pub fn created() -> InvocationCounts {
    InvocationCounts {
        init: 1,
        ..Default::default()
    }
}

/// Inside its first callback.
#[must_use]
pub fn running() -> InvocationCounts {
    InvocationCounts {
        before: 1,
        ..created()
    }
}

/// First callback finished.
#[must_use]
pub fn completed() -> InvocationCounts {
    InvocationCounts {
        after: 1,
        ..running()
    }
}
