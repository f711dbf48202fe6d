//! Lifecycle tracking for async resources (Layer 2).
//!
//! `lineage_tracker` observes the creation, execution, and teardown of async
//! resources inside a single-timeline, event-driven runtime and fans every
//! transition out to registered hooks.
//!
//! # Core Concepts
//!
//! - [`AsyncTracker`] - The owned tracker instance and the single entry point
//!   through which a runtime reports lifecycle events
//! - [`ResourceRegistry`](registry::ResourceRegistry) - Authoritative table of tracked resources
//! - [`TriggerGraph`](trigger::TriggerGraph) - Causal parent of every resource
//! - [`ExecutionStack`](context::ExecutionStack) - Which resource is executing right now
//! - [`HooksAPI`](hooks::HooksAPI) - Ordered observers with per-event handler slots
//!
//! # Data Flow
//!
//! ```text
//! runtime report ─► AsyncTracker ─► registry / trigger graph / execution stack
//!                                └─► HooksAPI::emit ─► hooks (registration order)
//! ```
//!
//! State is always updated before hooks run, so a hook that inspects the
//! tracker sees the transition it is being told about.
//!
//! # Example
//!
//! ```
//! use lineage_tracker::AsyncTracker;
//! use lineage_tracker::hooks::{Hook, HookResult};
//!
//! let tracker = AsyncTracker::default();
//! tracker
//!     .hooks()
//!     .add(Hook::new("printer").on_init(|_ctx, event| -> HookResult {
//!         assert_eq!(event.schedule_name(), "OnInit");
//!         Ok(())
//!     }))
//!     .unwrap();
//!
//! let conn = tracker.report_init("CONNECTION", None, None).unwrap().value();
//! tracker.within(conn, || {
//!     // Resources created here are caused by `conn`.
//!     let child = tracker.report_init("TIMER", None, None).unwrap().value();
//!     assert_eq!(tracker.trigger_of(child).unwrap(), conn);
//! }).unwrap();
//!
//! assert!(tracker.sanity_check(Some("CONNECTION")).is_clean());
//! ```

/// Tracker configuration.
pub mod config;

/// Execution context stack.
pub mod context;

/// Lifecycle hooks and their dispatcher.
pub mod hooks;

/// Inspection API and sanity checks.
pub mod inspect;

/// Bounded journal of accepted events.
pub mod journal;

/// Plugin seam for packaged hooks.
pub mod plugin;

/// Authoritative resource table.
pub mod registry;

/// The tracker instance and runtime reporting surface.
pub mod tracker;

/// Causal parentage between resources.
pub mod trigger;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::config::TrackerConfig;
    pub use crate::context::ExecutionStack;
    pub use crate::hooks::schedule::{OnAfter, OnBefore, OnDestroy, OnInit, OnPromiseResolve};
    pub use crate::hooks::{
        AsyncEvent, FailedHook, Hook, HookContext, HookError, HookFailure, HookId,
        HookRegistrationError, HookResult, HooksAPI,
    };
    pub use crate::inspect::{SanityReport, TrackerSnapshot, Violation};
    pub use crate::journal::{Journal, JournalEntry};
    pub use crate::plugin::{PluginError, TrackerPlugin};
    pub use crate::registry::ResourceRegistry;
    pub use crate::tracker::{AsyncTracker, LifecycleReport, Reported};
    pub use crate::trigger::TriggerGraph;
}

// Re-export key types at crate root for convenience
pub use config::TrackerConfig;
pub use hooks::{AsyncEvent, Hook, HookContext, HookError, HookFailure, HookId, HooksAPI};
pub use inspect::{SanityReport, Violation};
pub use tracker::{AsyncTracker, LifecycleReport, Reported};
