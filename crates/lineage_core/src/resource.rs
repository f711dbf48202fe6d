//! Tracked async resources and their lifecycle state machine.
//!
//! Every resource moves through a strict state machine:
//!
//! ```text
//! Initialized -(before)-> Active -(after)-> Initialized -(before)-> ... -(destroy)-> Destroyed
//! ```
//!
//! `before` may nest: a resource that re-enters its own callback stays
//! [`ResourceState::Active`] until every open `before` has a matching `after`.
//! [`ResourceState::Destroyed`] is terminal.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TrackerError;
use crate::id::{AsyncId, Stamp};

// ─────────────────────────────────────────────────────────────────────────────
// ResourceType
// ─────────────────────────────────────────────────────────────────────────────

/// Opaque tag naming the kind of a resource (e.g. `"CONNECTION"`, `"TIMER"`).
///
/// The tracker never interprets the tag beyond equality, except for the
/// configured set of promise-like types.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceType(String);

impl ResourceType {
    /// Creates a resource type tag.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Returns the tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceType {
    fn from(tag: &str) -> Self {
        Self(tag.to_owned())
    }
}

impl From<String> for ResourceType {
    fn from(tag: String) -> Self {
        Self(tag)
    }
}

impl PartialEq<str> for ResourceType {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ResourceType {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl core::borrow::Borrow<str> for ResourceType {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ResourceState / LifecycleEvent
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle state of a tracked resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceState {
    /// Registered and not currently executing.
    Initialized,
    /// Inside at least one `before`/`after` window.
    Active,
    /// Torn down. Terminal.
    Destroyed,
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceState::Initialized => "initialized",
            ResourceState::Active => "active",
            ResourceState::Destroyed => "destroyed",
        };
        f.write_str(name)
    }
}

/// The five canonical lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LifecycleEvent {
    /// The resource was created.
    Init,
    /// One of the resource's callbacks is about to run.
    Before,
    /// One of the resource's callbacks finished.
    After,
    /// The resource was torn down.
    Destroy,
    /// A promise-like resource was resolved.
    PromiseResolve,
}

impl LifecycleEvent {
    /// All events, in canonical order.
    pub const ALL: [LifecycleEvent; 5] = [
        LifecycleEvent::Init,
        LifecycleEvent::Before,
        LifecycleEvent::After,
        LifecycleEvent::Destroy,
        LifecycleEvent::PromiseResolve,
    ];

    /// Returns the event's callback name (`init`, `before`, ...).
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            LifecycleEvent::Init => "init",
            LifecycleEvent::Before => "before",
            LifecycleEvent::After => "after",
            LifecycleEvent::Destroy => "destroy",
            LifecycleEvent::PromiseResolve => "promiseResolve",
        }
    }

    /// Returns the position of this event in [`LifecycleEvent::ALL`].
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            LifecycleEvent::Init => 0,
            LifecycleEvent::Before => 1,
            LifecycleEvent::After => 2,
            LifecycleEvent::Destroy => 3,
            LifecycleEvent::PromiseResolve => 4,
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// InvocationCounts
// ─────────────────────────────────────────────────────────────────────────────

/// How many times each lifecycle callback has fired for a resource.
///
/// Counters only ever grow. They exist for auditing and tests, never for
/// control flow. Build expectations with struct update syntax:
///
/// ```
/// use lineage_core::resource::InvocationCounts;
///
/// let expected = InvocationCounts { init: 1, before: 1, ..Default::default() };
/// assert_eq!(expected.to_string(), "{ init: 1, before: 1 }");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationCounts {
    /// `init` invocations.
    pub init: u32,
    /// `before` invocations.
    pub before: u32,
    /// `after` invocations.
    pub after: u32,
    /// `destroy` invocations.
    pub destroy: u32,
    /// `promiseResolve` invocations.
    pub promise_resolve: u32,
}

impl InvocationCounts {
    /// Returns the counter for `event`.
    #[must_use]
    pub fn get(&self, event: LifecycleEvent) -> u32 {
        match event {
            LifecycleEvent::Init => self.init,
            LifecycleEvent::Before => self.before,
            LifecycleEvent::After => self.after,
            LifecycleEvent::Destroy => self.destroy,
            LifecycleEvent::PromiseResolve => self.promise_resolve,
        }
    }

    /// Increments the counter for `event`.
    pub fn record(&mut self, event: LifecycleEvent) {
        let slot = match event {
            LifecycleEvent::Init => &mut self.init,
            LifecycleEvent::Before => &mut self.before,
            LifecycleEvent::After => &mut self.after,
            LifecycleEvent::Destroy => &mut self.destroy,
            LifecycleEvent::PromiseResolve => &mut self.promise_resolve,
        };
        *slot = slot.saturating_add(1);
    }

    /// Returns the number of `before` invocations still waiting for an `after`.
    #[must_use]
    pub fn outstanding(&self) -> u32 {
        self.before.saturating_sub(self.after)
    }
}

impl fmt::Display for InvocationCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<String> = LifecycleEvent::ALL
            .iter()
            .filter(|event| self.get(**event) > 0)
            .map(|event| format!("{}: {}", event.name(), self.get(*event)))
            .collect();
        if fields.is_empty() {
            f.write_str("{}")
        } else {
            write!(f, "{{ {} }}", fields.join(", "))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AsyncResource
// ─────────────────────────────────────────────────────────────────────────────

/// Outcome of tearing a resource down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyOutcome {
    /// The resource moved to [`ResourceState::Destroyed`].
    Destroyed,
    /// The resource had already been destroyed at `first`.
    AlreadyDestroyed {
        /// When the first `destroy` was accepted.
        first: Stamp,
    },
}

/// A tracked async resource: its identity, causal parent, and lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsyncResource {
    uid: AsyncId,
    #[serde(rename = "type")]
    kind: ResourceType,
    trigger: AsyncId,
    state: ResourceState,
    counts: InvocationCounts,
    created_at: Stamp,
    destroyed_at: Option<Stamp>,
    open_executions: u32,
}

impl AsyncResource {
    /// Creates a resource in [`ResourceState::Initialized`] with `init` counted once.
    #[must_use]
    pub fn new(
        uid: AsyncId,
        kind: impl Into<ResourceType>,
        trigger: AsyncId,
        created_at: Stamp,
    ) -> Self {
        let mut counts = InvocationCounts::default();
        counts.record(LifecycleEvent::Init);
        Self {
            uid,
            kind: kind.into(),
            trigger,
            state: ResourceState::Initialized,
            counts,
            created_at,
            destroyed_at: None,
            open_executions: 0,
        }
    }

    /// Returns the resource id.
    #[must_use]
    pub fn uid(&self) -> AsyncId {
        self.uid
    }

    /// Returns the resource type tag.
    #[must_use]
    pub fn kind(&self) -> &ResourceType {
        &self.kind
    }

    /// Returns the id of the resource that was executing when this one was created.
    #[must_use]
    pub fn trigger(&self) -> AsyncId {
        self.trigger
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ResourceState {
        self.state
    }

    /// Returns the invocation counters.
    #[must_use]
    pub fn counts(&self) -> InvocationCounts {
        self.counts
    }

    /// Returns when `init` was accepted.
    #[must_use]
    pub fn created_at(&self) -> Stamp {
        self.created_at
    }

    /// Returns when `destroy` was accepted, if it was.
    #[must_use]
    pub fn destroyed_at(&self) -> Option<Stamp> {
        self.destroyed_at
    }

    /// Returns how many `before` windows are currently open.
    #[must_use]
    pub fn open_executions(&self) -> u32 {
        self.open_executions
    }

    /// Returns `true` once the resource is destroyed.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.state == ResourceState::Destroyed
    }

    /// Applies `before`.
    ///
    /// Valid from `Initialized` or `Active` (re-entrant); a destroyed resource
    /// never runs again.
    pub fn begin_execution(&mut self) -> Result<(), TrackerError> {
        if self.state == ResourceState::Destroyed {
            return Err(TrackerError::InvalidTransition {
                uid: self.uid,
                state: self.state,
                event: LifecycleEvent::Before,
            });
        }
        self.open_executions += 1;
        self.state = ResourceState::Active;
        self.counts.record(LifecycleEvent::Before);
        Ok(())
    }

    /// Applies `after`, closing the innermost open `before`.
    ///
    /// A resource destroyed while executing still accepts the `after`s that
    /// close its open windows, but stays destroyed.
    pub fn end_execution(&mut self) -> Result<(), TrackerError> {
        if self.open_executions == 0 {
            return Err(TrackerError::UnmatchedAfter { uid: self.uid });
        }
        self.open_executions -= 1;
        self.counts.record(LifecycleEvent::After);
        if self.open_executions == 0 && self.state == ResourceState::Active {
            self.state = ResourceState::Initialized;
        }
        Ok(())
    }

    /// Applies `destroy`. A repeated destroy changes nothing and reports when
    /// the first one happened.
    pub fn destroy(&mut self, at: Stamp) -> DestroyOutcome {
        if let Some(first) = self.destroyed_at {
            return DestroyOutcome::AlreadyDestroyed { first };
        }
        self.state = ResourceState::Destroyed;
        self.destroyed_at = Some(at);
        self.counts.record(LifecycleEvent::Destroy);
        DestroyOutcome::Destroyed
    }

    /// Applies `promiseResolve`. The caller decides whether the type allows it.
    pub fn resolve_promise(&mut self) {
        self.counts.record(LifecycleEvent::PromiseResolve);
    }
}
