//! Unified event enum for lifecycle hooks.
//!
//! All hooks receive `&AsyncEvent` and can match on variants for typed access.
//!
//! # Example
//!
//! ```
//! use lineage_tracker::hooks::events::AsyncEvent;
//!
//! fn describe(event: &AsyncEvent) -> String {
//!     match event {
//!         AsyncEvent::Init { uid, kind, trigger, .. } => {
//!             format!("{kind} {uid} created by {trigger}")
//!         }
//!         other => other.to_string(),
//!     }
//! }
//! ```

use core::fmt;

use lineage_core::id::AsyncId;
use lineage_core::resource::{AsyncResource, LifecycleEvent, ResourceType};

/// Unified event enum for all lifecycle hooks.
///
/// One variant per [`LifecycleEvent`]. Only `Init` carries more than the
/// resource id: its type, its trigger, and a snapshot of the resource as it
/// was registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsyncEvent {
    /// A resource was created.
    Init {
        /// The new resource.
        uid: AsyncId,
        /// Its type tag.
        kind: ResourceType,
        /// The resource executing when it was created, or the root.
        trigger: AsyncId,
        /// The resource as registered.
        resource: AsyncResource,
    },

    /// One of the resource's callbacks is about to run.
    Before {
        /// The resource.
        uid: AsyncId,
    },

    /// One of the resource's callbacks finished.
    After {
        /// The resource.
        uid: AsyncId,
    },

    /// The resource was torn down.
    Destroy {
        /// The resource.
        uid: AsyncId,
    },

    /// A promise-like resource was resolved.
    PromiseResolve {
        /// The resource.
        uid: AsyncId,
    },
}

impl AsyncEvent {
    /// Returns the lifecycle event this variant represents.
    #[must_use]
    pub fn lifecycle_event(&self) -> LifecycleEvent {
        match self {
            AsyncEvent::Init { .. } => LifecycleEvent::Init,
            AsyncEvent::Before { .. } => LifecycleEvent::Before,
            AsyncEvent::After { .. } => LifecycleEvent::After,
            AsyncEvent::Destroy { .. } => LifecycleEvent::Destroy,
            AsyncEvent::PromiseResolve { .. } => LifecycleEvent::PromiseResolve,
        }
    }

    /// Returns the resource the event concerns.
    #[must_use]
    pub fn uid(&self) -> AsyncId {
        match self {
            AsyncEvent::Init { uid, .. }
            | AsyncEvent::Before { uid }
            | AsyncEvent::After { uid }
            | AsyncEvent::Destroy { uid }
            | AsyncEvent::PromiseResolve { uid } => *uid,
        }
    }

    /// Returns the schedule marker name for this event.
    #[must_use]
    pub fn schedule_name(&self) -> &'static str {
        match self {
            AsyncEvent::Init { .. } => "OnInit",
            AsyncEvent::Before { .. } => "OnBefore",
            AsyncEvent::After { .. } => "OnAfter",
            AsyncEvent::Destroy { .. } => "OnDestroy",
            AsyncEvent::PromiseResolve { .. } => "OnPromiseResolve",
        }
    }
}

impl fmt::Display for AsyncEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsyncEvent::Init {
                uid, kind, trigger, ..
            } => write!(f, "Init({kind} {uid}, trigger: {trigger})"),
            AsyncEvent::Before { uid } => write!(f, "Before({uid})"),
            AsyncEvent::After { uid } => write!(f, "After({uid})"),
            AsyncEvent::Destroy { uid } => write!(f, "Destroy({uid})"),
            AsyncEvent::PromiseResolve { uid } => write!(f, "PromiseResolve({uid})"),
        }
    }
}
