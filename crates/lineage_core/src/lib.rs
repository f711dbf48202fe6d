//! The data model for async-resource lifecycle tracking (Layer 1).
//!
//! `lineage_core` holds the vocabulary shared by every other lineage crate:
//!
//! - [`id`] - Resource identifiers and logical timestamps
//! - [`resource`] - Tracked resources, their state machine, and invocation counters
//! - [`schedule`] - Marker-type identifiers for lifecycle hook points
//! - [`error`] - The tracker error taxonomy
//!
//! # Architecture
//!
//! - **Layer 1** (`lineage_core`): Data model (this crate)
//! - **Layer 2** (`lineage_tracker`): Registry, trigger graph, execution stack, hook dispatch
//! - **Layer 3** (`lineage_core_plugins`): Logging and sanity-check plugins
//!
//! # Example
//!
//! ```
//! use lineage_core::id::{AsyncId, Stamp};
//! use lineage_core::resource::{AsyncResource, ResourceState};
//!
//! let mut conn = AsyncResource::new(AsyncId::new(2), "CONNECTION", AsyncId::ROOT, Stamp::new(1));
//! assert_eq!(conn.state(), ResourceState::Initialized);
//!
//! conn.begin_execution().unwrap();
//! assert_eq!(conn.state(), ResourceState::Active);
//!
//! conn.end_execution().unwrap();
//! assert_eq!(conn.counts().after, 1);
//! ```

/// Tracker error taxonomy.
pub mod error;

/// Resource identifiers and logical timestamps.
pub mod id;

/// Tracked resources and their lifecycle state machine.
pub mod resource;

/// Schedule identifiers for lifecycle hook points.
pub mod schedule;

pub use error::TrackerError;
pub use id::{AsyncId, Stamp};
pub use resource::{
    AsyncResource, DestroyOutcome, InvocationCounts, LifecycleEvent, ResourceState, ResourceType,
};
pub use schedule::{IntoScheduleIds, Schedule, ScheduleId};

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::error::*;
    pub use crate::id::*;
    pub use crate::resource::*;
    pub use crate::schedule::*;
}
