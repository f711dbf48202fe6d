//! Schedule markers for the five lifecycle hook points.
//!
//! These marker types name when a hook runs. Use them with
//! [`HooksAPI::register_observer`](super::HooksAPI::register_observer) or
//! [`Hook::on`](super::Hook::on), alone or as a tuple:
//!
//! ```
//! use lineage_core::schedule::IntoScheduleIds;
//! use lineage_core::resource::LifecycleEvent;
//! use lineage_tracker::hooks::schedule::{OnAfter, OnBefore};
//!
//! assert_eq!(
//!     <(OnBefore, OnAfter)>::events(),
//!     vec![LifecycleEvent::Before, LifecycleEvent::After]
//! );
//! ```
//!
//! Event data is carried by the unified [`AsyncEvent`](super::events::AsyncEvent)
//! enum, which all hooks receive.

use lineage_core::resource::LifecycleEvent;
use lineage_core::schedule::Schedule;

/// Marker type for hooks called when a resource is created.
///
/// Event data: [`AsyncEvent::Init`](super::events::AsyncEvent::Init)
pub struct OnInit;
impl Schedule for OnInit {
    const EVENT: LifecycleEvent = LifecycleEvent::Init;
}

/// Marker type for hooks called just before one of a resource's callbacks runs.
///
/// Event data: [`AsyncEvent::Before`](super::events::AsyncEvent::Before)
pub struct OnBefore;
impl Schedule for OnBefore {
    const EVENT: LifecycleEvent = LifecycleEvent::Before;
}

/// Marker type for hooks called just after one of a resource's callbacks finished.
///
/// Event data: [`AsyncEvent::After`](super::events::AsyncEvent::After)
pub struct OnAfter;
impl Schedule for OnAfter {
    const EVENT: LifecycleEvent = LifecycleEvent::After;
}

/// Marker type for hooks called when a resource is torn down.
///
/// Not called again for a repeated destroy report.
///
/// Event data: [`AsyncEvent::Destroy`](super::events::AsyncEvent::Destroy)
pub struct OnDestroy;
impl Schedule for OnDestroy {
    const EVENT: LifecycleEvent = LifecycleEvent::Destroy;
}

/// Marker type for hooks called when a promise-like resource resolves.
///
/// Event data: [`AsyncEvent::PromiseResolve`](super::events::AsyncEvent::PromiseResolve)
pub struct OnPromiseResolve;
impl Schedule for OnPromiseResolve {
    const EVENT: LifecycleEvent = LifecycleEvent::PromiseResolve;
}
