//! Lifecycle tracking for async resources.
//!
//! Runtimes report when resources are created, run, and torn down; the
//! tracker keeps the authoritative picture and fans each transition out to
//! registered hooks.

pub use lineage_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use lineage_internal::prelude::*;
}
