//! Schedule identifiers for lifecycle hook points.
//!
//! A schedule is a marker type naming one point in a resource's lifecycle
//! (`init`, `before`, ...). Layer 2 defines the markers; hooks subscribe to
//! one or several of them by type, and [`IntoScheduleIds`] turns a marker or
//! a tuple of markers into the list of [`ScheduleId`]s to subscribe to.
//!
//! # Example
//!
//! ```
//! use lineage_core::resource::LifecycleEvent;
//! use lineage_core::schedule::{IntoScheduleIds, Schedule, ScheduleId};
//!
//! pub struct AfterCallback;
//! impl Schedule for AfterCallback {
//!     const EVENT: LifecycleEvent = LifecycleEvent::After;
//! }
//!
//! let id = ScheduleId::of::<AfterCallback>();
//! assert_eq!(id.event(), LifecycleEvent::After);
//! assert_eq!(AfterCallback::schedule_ids(), vec![id]);
//! ```

use core::any::TypeId;
use variadics_please::all_tuples;

use crate::resource::LifecycleEvent;

/// Identifier for a lifecycle schedule, derived from a marker type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScheduleId {
    type_id: TypeId,
    type_name: &'static str,
    event: LifecycleEvent,
}

impl ScheduleId {
    /// Creates a `ScheduleId` for the given schedule marker type.
    #[must_use]
    pub fn of<S: Schedule>() -> Self {
        Self {
            type_id: TypeId::of::<S>(),
            type_name: core::any::type_name::<S>(),
            event: S::EVENT,
        }
    }

    /// Returns the underlying `TypeId`.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the type name for debugging.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the lifecycle event this schedule fires on.
    #[must_use]
    pub fn event(&self) -> LifecycleEvent {
        self.event
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Schedule Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Marker trait for schedule types.
///
/// Each marker is bound to exactly one [`LifecycleEvent`].
pub trait Schedule: 'static {
    /// The lifecycle event this schedule fires on.
    const EVENT: LifecycleEvent;
}

// ─────────────────────────────────────────────────────────────────────────────
// IntoScheduleIds Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for types that can be converted into a list of schedule IDs.
///
/// Implemented for single schedules and tuples of schedules, so one handler
/// can be registered on several lifecycle points at once.
pub trait IntoScheduleIds {
    /// Returns the schedule IDs for this type.
    fn schedule_ids() -> Vec<ScheduleId>;

    /// Returns the lifecycle events covered by this type, in declaration order.
    fn events() -> Vec<LifecycleEvent> {
        Self::schedule_ids().iter().map(ScheduleId::event).collect()
    }
}

impl<S: Schedule> IntoScheduleIds for S {
    fn schedule_ids() -> Vec<ScheduleId> {
        vec![ScheduleId::of::<S>()]
    }
}

macro_rules! impl_into_schedule_ids_for_tuple {
    ($($S:ident),*) => {
        impl<$($S: Schedule),*> IntoScheduleIds for ($($S,)*) {
            fn schedule_ids() -> Vec<ScheduleId> {
                vec![$(ScheduleId::of::<$S>()),*]
            }
        }
    };
}

// There are only five lifecycle events, so tuples of 2 to 5 cover every subset.
all_tuples!(impl_into_schedule_ids_for_tuple, 2, 5, S);

#[cfg(test)]
mod tests {
    use super::*;

    struct ScheduleA;
    impl Schedule for ScheduleA {
        const EVENT: LifecycleEvent = LifecycleEvent::Init;
    }

    struct ScheduleB;
    impl Schedule for ScheduleB {
        const EVENT: LifecycleEvent = LifecycleEvent::Before;
    }

    struct ScheduleC;
    impl Schedule for ScheduleC {
        const EVENT: LifecycleEvent = LifecycleEvent::Destroy;
    }

    #[test]
    fn schedule_id_equality() {
        let id1 = ScheduleId::of::<ScheduleA>();
        let id2 = ScheduleId::of::<ScheduleA>();
        let id3 = ScheduleId::of::<ScheduleB>();

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
    }

    #[test]
    fn schedule_id_carries_event() {
        let id = ScheduleId::of::<ScheduleC>();
        assert_eq!(id.event(), LifecycleEvent::Destroy);
        assert!(id.type_name().contains("ScheduleC"));
        assert_eq!(id.type_id(), TypeId::of::<ScheduleC>());
    }

    #[test]
    fn into_schedule_ids_tuple_keeps_order() {
        let ids = <(ScheduleA, ScheduleB, ScheduleC)>::schedule_ids();
        assert_eq!(ids.len(), 3);
        assert_eq!(ids[0], ScheduleId::of::<ScheduleA>());
        assert_eq!(ids[2], ScheduleId::of::<ScheduleC>());
        assert_eq!(
            <(ScheduleB, ScheduleA)>::events(),
            vec![LifecycleEvent::Before, LifecycleEvent::Init]
        );
    }
}
