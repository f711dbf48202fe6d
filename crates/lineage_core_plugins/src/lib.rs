//! Infrastructure plugins for the lineage tracker.
//!
//! - [`TracingPlugin`] - Installs a `tracing` subscriber and logs every
//!   dispatched lifecycle event
//! - [`SanityCheckPlugin`] - Runs the sanity check at teardown and keeps the
//!   report
//!
//! # Example
//!
//! ```
//! use lineage_core_plugins::{SanityCheckPlugin, TracingPlugin};
//! use lineage_tracker::AsyncTracker;
//! use tracing::Level;
//!
//! let sanity = SanityCheckPlugin::all_types();
//! let handle = sanity.handle();
//!
//! let tracker = AsyncTracker::default();
//! tracker
//!     .add_plugin(TracingPlugin::default().with_level(Level::DEBUG))
//!     .unwrap()
//!     .add_plugin(sanity)
//!     .unwrap();
//!
//! let timer = tracker.report_init("TIMER", None, None).unwrap().value();
//! tracker.within(timer, || ()).unwrap();
//! tracker.report_destroy(timer).unwrap();
//! tracker.teardown();
//!
//! handle.result().unwrap();
//! ```
//!
//! # Architecture
//!
//! This crate is part of Layer 3:
//!
//! - **Layer 1** (`lineage_core`): Ids, resources, errors, schedule markers
//! - **Layer 2** (`lineage_tracker`): Registry, trigger graph, stack, hooks
//! - **Layer 3** (`lineage_core_plugins`): Plugins built on the public API

mod sanity_check;
mod tracing_plugin;

pub use sanity_check::{SanityCheckHandle, SanityCheckPlugin};
pub use tracing_plugin::{
    LIFECYCLE_TARGET, TRACING_HOOK, TracingConfig, TracingFormat, TracingPlugin,
};
