//! Two server connections handshaking one after the other.
//!
//! Both connections are accepted at top level. The first handshake runs to
//! completion before the second starts, and every callback checks the
//! counters of both connections. At exit the sanity check must find nothing
//! outstanding.
//!
//! # Usage
//!
//! ```bash
//! connections
//! RUST_LOG=info,lineage::lifecycle=debug connections
//! ```

use std::error::Error;
use std::process::ExitCode;
use std::rc::Rc;

use example::{CONNECTION, Server, completed, created, running};
use lineage_core::error::TrackerError;
use lineage_core_plugins::{SanityCheckPlugin, TracingFormat, TracingPlugin};
use lineage_tracker::AsyncTracker;
use tokio::task::LocalSet;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match LocalSet::new().run_until(run()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "connections failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    let mut tracing_plugin = TracingPlugin::default().with_format(TracingFormat::Compact);
    if let Ok(filter) = std::env::var("RUST_LOG") {
        tracing_plugin = tracing_plugin.with_env_filter(filter);
    }
    let sanity = SanityCheckPlugin::for_type(CONNECTION);
    let sanity_report = sanity.handle();

    let tracker = Rc::new(AsyncTracker::default());
    tracker.add_plugin(tracing_plugin)?.add_plugin(sanity)?;

    let server = Server::new(Rc::clone(&tracker));

    let sc1 = server.accept()?;
    tracker.check_invocations(sc1.uid(), created(), "first connection, when first created")?;

    let sc2 = server.accept()?;
    tracker.check_invocations(sc1.uid(), created(), "first connection, when second created")?;
    tracker.check_invocations(sc2.uid(), created(), "second connection, when second created")?;

    let (first, second) = (sc1.uid(), sc2.uid());
    sc1.handshake(|tracker| -> Result<(), TrackerError> {
        tracker.check_invocations(first, running(), "first connection, when first handshake")?;
        tracker.check_invocations(second, created(), "second connection, when first handshake")
    })
    .await??;
    sc2.handshake(|tracker| -> Result<(), TrackerError> {
        tracker.check_invocations(first, completed(), "first connection, when second handshake")?;
        tracker.check_invocations(second, running(), "second connection, when second handshake")
    })
    .await??;

    // Let the session timers fire.
    tokio::time::sleep(server.latency() * 4).await;

    tracker.teardown();
    tracker.check_invocations(first, completed(), "first connection, when process exits")?;
    tracker.check_invocations(second, completed(), "second connection, when process exits")?;

    if tracing::enabled!(tracing::Level::DEBUG) {
        tracing::debug!(
            snapshot = %serde_json::to_string_pretty(&tracker.snapshot())?,
            "final tracker state"
        );
    }

    sanity_report.result()?;
    tracing::info!(
        resources = tracker.resource_count(),
        "all connections accounted for"
    );
    Ok(())
}
