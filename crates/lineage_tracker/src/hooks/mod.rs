//! Lifecycle hooks for async resources.
//!
//! This module lets callers observe every lifecycle transition the tracker
//! accepts. Hooks are the only outbound interface of the tracker.
//!
//! # Design Principles
//!
//! - Hooks execute in registration order
//! - A hook subscribes to a subset of events by filling handler slots
//! - A failing or panicking hook never stops the others
//! - Hooks run after the tracker state is updated
//!
//! # Architecture
//!
//! The hook system consists of three parts:
//!
//! - **Schedule markers** ([`schedule`]): Empty types that identify hook points
//! - **Events** ([`events`]): `AsyncEvent` enum carrying context to hooks
//! - **API** ([`api`]): Registration and dispatch
//!
//! # Example
//!
//! ```
//! use lineage_tracker::AsyncTracker;
//! use lineage_tracker::hooks::schedule::{OnInit, OnDestroy};
//! use lineage_tracker::hooks::{AsyncEvent, Hook, HookResult};
//!
//! let tracker = AsyncTracker::default();
//!
//! // Observer: just logs events
//! tracker
//!     .hooks()
//!     .register_observer::<(OnInit, OnDestroy), _>("logger", |event: &AsyncEvent| {
//!         tracing::info!(uid = %event.uid(), "{}", event.schedule_name());
//!     })
//!     .unwrap();
//!
//! // Full hook: can inspect the tracker from inside the handler
//! tracker
//!     .hooks()
//!     .add(Hook::new("inspector").on_init(|ctx, event| -> HookResult {
//!         let resource = ctx.tracker().resource(event.uid())?;
//!         assert_eq!(resource.counts().init, 1);
//!         Ok(())
//!     }))
//!     .unwrap();
//!
//! let uid = tracker.report_init("TIMER", None, None).unwrap().value();
//! assert!(tracker.report_destroy(uid).unwrap().is_clean());
//! ```

pub mod api;
pub mod events;
pub mod schedule;

pub use api::{
    FailedHook, Hook, HookContext, HookError, HookFailure, HookId, HookRegistrationError,
    HookResult, HooksAPI,
};
pub use events::AsyncEvent;
