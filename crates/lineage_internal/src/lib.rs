//! # Lineage Internal Library
//!
//! Re-exports the core lineage crates for convenience.

/// Layer 1: Ids, resources, errors, and schedule markers.
pub use lineage_core;

/// Layer 2: The tracker and its hook dispatcher.
pub use lineage_tracker;

/// Layer 3: Tracing and sanity-check plugins.
pub use lineage_core_plugins;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use lineage_core::prelude::*;
    pub use lineage_core_plugins::{
        SanityCheckHandle, SanityCheckPlugin, TracingFormat, TracingPlugin,
    };
    pub use lineage_tracker::prelude::*;
}
