//! Error types for lifecycle tracking.
//!
//! State-machine violations are bugs in the integration that reports events;
//! they are surfaced immediately and never silently corrected.

use crate::id::AsyncId;
use crate::resource::{InvocationCounts, LifecycleEvent, ResourceState, ResourceType};

/// Errors raised by the registry, trigger graph, execution stack, and inspection API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackerError {
    /// An event arrived for a resource whose state forbids it.
    #[error("invalid transition: {event} reported for {uid} in state {state}")]
    InvalidTransition {
        /// The resource.
        uid: AsyncId,
        /// Its state when the event arrived.
        state: ResourceState,
        /// The rejected event.
        event: LifecycleEvent,
    },

    /// `after` arrived without a matching open `before`.
    #[error("unmatched after: {uid} has no open before")]
    UnmatchedAfter {
        /// The resource.
        uid: AsyncId,
    },

    /// The execution stack top does not match the resource leaving it.
    #[error("execution stack mismatch: expected {expected} on top, found {found}")]
    StackMismatch {
        /// The resource reported by `after`.
        expected: AsyncId,
        /// The resource actually on top of the stack.
        found: AsyncId,
    },

    /// The id was never registered.
    #[error("unknown resource: {uid}")]
    UnknownResource {
        /// The unknown id.
        uid: AsyncId,
    },

    /// The id is already registered.
    #[error("duplicate registration: {uid} is already tracked")]
    DuplicateRegistration {
        /// The duplicated id.
        uid: AsyncId,
    },

    /// A second `destroy` arrived while strict destroy checking is enabled.
    #[error("duplicate destroy: {uid} was already destroyed")]
    DuplicateDestroy {
        /// The resource.
        uid: AsyncId,
    },

    /// The event is not valid for the resource's type.
    #[error("{event} is not valid for {uid} of type {kind}")]
    InvalidEventForType {
        /// The resource.
        uid: AsyncId,
        /// Its type.
        kind: ResourceType,
        /// The rejected event.
        event: LifecycleEvent,
    },

    /// A caller tried to register a reserved id.
    #[error("{uid} is reserved and cannot be registered")]
    ReservedId {
        /// The reserved id.
        uid: AsyncId,
    },

    /// No id after `uid` can be allocated.
    #[error("id space exhausted after {uid}")]
    IdSpaceExhausted {
        /// The last id that could be handed out.
        uid: AsyncId,
    },

    /// Hooks reported events recursively beyond the configured depth.
    #[error("hook dispatch nested {depth} levels deep")]
    ReentrancyLimit {
        /// The depth that was refused.
        depth: usize,
    },

    /// Observed invocation counts differ from the expected ones.
    #[error("{uid} at {stage}: expected {expected}, got {actual}")]
    InvocationMismatch {
        /// The resource.
        uid: AsyncId,
        /// Caller-provided label for the checkpoint.
        stage: String,
        /// Expected counters.
        expected: InvocationCounts,
        /// Observed counters.
        actual: InvocationCounts,
    },

    /// A sanity check found violations.
    #[error("sanity check failed with {count} violation(s): {summary}")]
    SanityCheckFailed {
        /// Number of violations.
        count: usize,
        /// One line per violation.
        summary: String,
    },
}

impl TrackerError {
    /// Returns `true` for errors caused by a misbehaving event reporter
    /// (state-machine and nesting violations).
    #[must_use]
    pub fn is_integration_bug(&self) -> bool {
        matches!(
            self,
            TrackerError::InvalidTransition { .. }
                | TrackerError::UnmatchedAfter { .. }
                | TrackerError::StackMismatch { .. }
                | TrackerError::DuplicateRegistration { .. }
                | TrackerError::DuplicateDestroy { .. }
                | TrackerError::InvalidEventForType { .. }
                | TrackerError::ReservedId { .. }
        )
    }
}
