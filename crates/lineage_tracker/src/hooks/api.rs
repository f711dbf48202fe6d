//! Hook registration and dispatch.
//!
//! The [`HooksAPI`] holds an ordered list of [`Hook`]s. Each hook is a named
//! record with one optional handler slot per lifecycle event; dispatch calls,
//! in registration order, every enabled hook whose slot for the event is
//! filled.
//!
//! # Failure isolation
//!
//! A handler that returns an error or panics does not stop dispatch. Every
//! failure is collected into a [`HookFailure`] returned after all hooks ran.
//!
//! # Reentrancy
//!
//! Handlers receive a [`HookContext`] with access to the tracker and may
//! report new lifecycle events from inside a dispatch. No lock is held while
//! handlers run: each dispatch works on its own snapshot of the hook list.
//!
//! # Example
//!
//! ```
//! use lineage_tracker::AsyncTracker;
//! use lineage_tracker::hooks::schedule::{OnBefore, OnAfter};
//! use lineage_tracker::hooks::{AsyncEvent, Hook, HookError};
//!
//! let tracker = AsyncTracker::default();
//! let hooks = tracker.hooks();
//!
//! hooks
//!     .add(Hook::new("strict").on_before(|_ctx, _event| Err(HookError::failed("refused"))))
//!     .unwrap();
//! hooks
//!     .register_observer::<(OnBefore, OnAfter), _>("logger", |event: &AsyncEvent| {
//!         tracing::info!(%event, "lifecycle");
//!     })
//!     .unwrap();
//!
//! let conn = tracker.report_init("CONNECTION", None, None).unwrap().value();
//! let reported = tracker.report_before(conn).unwrap();
//! let failure = reported.hook_failure().unwrap();
//! assert_eq!(failure.failures().len(), 1);
//! assert_eq!(failure.failures()[0].name(), "strict");
//! ```

use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use lineage_core::error::TrackerError;
use lineage_core::id::AsyncId;
use lineage_core::resource::LifecycleEvent;
use lineage_core::schedule::IntoScheduleIds;
use parking_lot::RwLock;

use super::events::AsyncEvent;
use crate::tracker::AsyncTracker;

/// Result returned by hook handlers.
pub type HookResult = Result<(), HookError>;

/// Type-erased handler stored in a hook slot.
type Handler = Arc<dyn Fn(&HookContext<'_>, &AsyncEvent) -> HookResult + Send + Sync>;

// ─────────────────────────────────────────────────────────────────────────────
// HookError / HookFailure
// ─────────────────────────────────────────────────────────────────────────────

/// Error raised by a single hook handler.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HookError {
    /// The handler reported a failure.
    #[error("{0}")]
    Failed(String),

    /// The handler panicked.
    #[error("panicked: {0}")]
    Panicked(String),

    /// A nested report made by the handler was rejected.
    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

impl HookError {
    /// Creates a [`HookError::Failed`] from any message.
    pub fn failed(message: impl Into<String>) -> Self {
        HookError::Failed(message.into())
    }

    fn from_panic(payload: &(dyn core::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_owned());
        HookError::Panicked(message)
    }
}

/// One hook that failed during a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedHook {
    id: HookId,
    name: String,
    error: HookError,
}

impl FailedHook {
    /// Returns the failing hook's id.
    #[must_use]
    pub fn id(&self) -> HookId {
        self.id
    }

    /// Returns the failing hook's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns what went wrong.
    #[must_use]
    pub fn error(&self) -> &HookError {
        &self.error
    }
}

/// Aggregate of every hook failure for one dispatched event.
///
/// Only produced after all hooks were attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookFailure {
    event: LifecycleEvent,
    uid: AsyncId,
    failures: Vec<FailedHook>,
}

impl HookFailure {
    /// Returns the event being dispatched.
    #[must_use]
    pub fn event(&self) -> LifecycleEvent {
        self.event
    }

    /// Returns the resource the event concerned.
    #[must_use]
    pub fn uid(&self) -> AsyncId {
        self.uid
    }

    /// Returns the failing hooks, in dispatch order.
    #[must_use]
    pub fn failures(&self) -> &[FailedHook] {
        &self.failures
    }

    /// Returns `true` if the hook named `name` failed.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.failures.iter().any(|failed| failed.name == name)
    }
}

impl fmt::Display for HookFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} hook(s) failed on {} for {}",
            self.failures.len(),
            self.event,
            self.uid
        )?;
        for failed in &self.failures {
            write!(f, "; '{}' ({}): {}", failed.name, failed.id, failed.error)?;
        }
        Ok(())
    }
}

impl core::error::Error for HookFailure {}

// ─────────────────────────────────────────────────────────────────────────────
// HookRegistrationError
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur during hook registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookRegistrationError {
    /// A hook with this name is already registered.
    DuplicateName {
        /// The duplicate hook name.
        name: String,
    },
}

impl fmt::Display for HookRegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookRegistrationError::DuplicateName { name } => {
                write!(f, "hook '{name}' already registered")
            }
        }
    }
}

impl core::error::Error for HookRegistrationError {}

// ─────────────────────────────────────────────────────────────────────────────
// HookContext
// ─────────────────────────────────────────────────────────────────────────────

/// What a handler can see while it runs.
#[derive(Clone, Copy)]
pub struct HookContext<'a> {
    tracker: &'a AsyncTracker,
    depth: usize,
}

impl<'a> HookContext<'a> {
    /// Creates a context for a dispatch at nesting level `depth` (1 for a
    /// top-level report).
    #[must_use]
    pub fn new(tracker: &'a AsyncTracker, depth: usize) -> Self {
        Self { tracker, depth }
    }

    /// Returns the tracker dispatching the event. Handlers may inspect it or
    /// report further events through it.
    #[must_use]
    pub fn tracker(&self) -> &'a AsyncTracker {
        self.tracker
    }

    /// Returns the dispatch nesting level.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl fmt::Debug for HookContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookContext")
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Hook
// ─────────────────────────────────────────────────────────────────────────────

/// Registration handle returned by [`HooksAPI::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HookId(u64);

impl HookId {
    /// Returns the raw handle.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hook#{}", self.0)
    }
}

/// A named observer with an optional handler per lifecycle event.
///
/// ```
/// use lineage_tracker::hooks::{Hook, HookResult};
/// use lineage_core::resource::LifecycleEvent;
///
/// let hook = Hook::new("counter")
///     .on_before(|_ctx, _event| -> HookResult { Ok(()) })
///     .on_after(|_ctx, _event| -> HookResult { Ok(()) });
///
/// assert!(hook.handles(LifecycleEvent::Before));
/// assert!(!hook.handles(LifecycleEvent::Init));
/// ```
#[derive(Clone)]
pub struct Hook {
    name: String,
    handlers: [Option<Handler>; 5],
}

impl Hook {
    /// Creates a hook with no handlers.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handlers: Default::default(),
        }
    }

    /// Fills the slot for every schedule in `S` with the same handler.
    #[must_use]
    pub fn on<S, F>(mut self, handler: F) -> Self
    where
        S: IntoScheduleIds,
        F: Fn(&HookContext<'_>, &AsyncEvent) -> HookResult + Send + Sync + 'static,
    {
        let handler: Handler = Arc::new(handler);
        for event in S::events() {
            self.handlers[event.index()] = Some(Arc::clone(&handler));
        }
        self
    }

    /// Sets the `init` handler.
    #[must_use]
    pub fn on_init<F>(self, handler: F) -> Self
    where
        F: Fn(&HookContext<'_>, &AsyncEvent) -> HookResult + Send + Sync + 'static,
    {
        self.with_slot(LifecycleEvent::Init, handler)
    }

    /// Sets the `before` handler.
    #[must_use]
    pub fn on_before<F>(self, handler: F) -> Self
    where
        F: Fn(&HookContext<'_>, &AsyncEvent) -> HookResult + Send + Sync + 'static,
    {
        self.with_slot(LifecycleEvent::Before, handler)
    }

    /// Sets the `after` handler.
    #[must_use]
    pub fn on_after<F>(self, handler: F) -> Self
    where
        F: Fn(&HookContext<'_>, &AsyncEvent) -> HookResult + Send + Sync + 'static,
    {
        self.with_slot(LifecycleEvent::After, handler)
    }

    /// Sets the `destroy` handler.
    #[must_use]
    pub fn on_destroy<F>(self, handler: F) -> Self
    where
        F: Fn(&HookContext<'_>, &AsyncEvent) -> HookResult + Send + Sync + 'static,
    {
        self.with_slot(LifecycleEvent::Destroy, handler)
    }

    /// Sets the `promiseResolve` handler.
    #[must_use]
    pub fn on_promise_resolve<F>(self, handler: F) -> Self
    where
        F: Fn(&HookContext<'_>, &AsyncEvent) -> HookResult + Send + Sync + 'static,
    {
        self.with_slot(LifecycleEvent::PromiseResolve, handler)
    }

    fn with_slot<F>(mut self, event: LifecycleEvent, handler: F) -> Self
    where
        F: Fn(&HookContext<'_>, &AsyncEvent) -> HookResult + Send + Sync + 'static,
    {
        self.handlers[event.index()] = Some(Arc::new(handler));
        self
    }

    /// Returns the hook's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` if the hook has a handler for `event`.
    #[must_use]
    pub fn handles(&self, event: LifecycleEvent) -> bool {
        self.handlers[event.index()].is_some()
    }

    /// Returns the events this hook has handlers for.
    #[must_use]
    pub fn events(&self) -> Vec<LifecycleEvent> {
        LifecycleEvent::ALL
            .into_iter()
            .filter(|event| self.handles(*event))
            .collect()
    }

    fn handler(&self, event: LifecycleEvent) -> Option<&Handler> {
        self.handlers[event.index()].as_ref()
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("name", &self.name)
            .field("events", &self.events())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HookEntry
// ─────────────────────────────────────────────────────────────────────────────

/// Entry in the hook registry.
struct HookEntry {
    id: HookId,
    enabled: AtomicBool,
    hook: Hook,
}

impl HookEntry {
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HooksAPI
// ─────────────────────────────────────────────────────────────────────────────

/// Registry and dispatcher for lifecycle hooks.
///
/// # Thread Safety
///
/// The `HooksAPI` uses interior mutability via [`RwLock`] so hooks can be
/// added, removed, enabled, and disabled through a shared reference, including
/// from inside a running handler.
#[derive(Default)]
pub struct HooksAPI {
    /// Entries in registration order.
    hooks: RwLock<Vec<Arc<HookEntry>>>,
    next_id: AtomicU64,
}

impl HooksAPI {
    /// Creates a new empty hooks registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `hook`, enabled, after every existing hook.
    ///
    /// # Errors
    ///
    /// [`HookRegistrationError::DuplicateName`] if a hook with the same name
    /// is already registered.
    pub fn add(&self, hook: Hook) -> Result<HookId, HookRegistrationError> {
        let mut hooks = self.hooks.write();
        if hooks.iter().any(|entry| entry.hook.name == hook.name) {
            return Err(HookRegistrationError::DuplicateName { name: hook.name });
        }

        let id = HookId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        hooks.push(Arc::new(HookEntry {
            id,
            enabled: AtomicBool::new(true),
            hook,
        }));
        Ok(id)
    }

    /// Registers an observer for one or more schedules.
    ///
    /// Observers only see the event. Use [`add`](Self::add) with a [`Hook`]
    /// to reach the tracker or report failures.
    ///
    /// # Type Parameters
    ///
    /// * `S` - Schedule marker type(s). Can be a single schedule or a tuple.
    /// * `F` - The observer function type (inferred)
    ///
    /// # Errors
    ///
    /// [`HookRegistrationError::DuplicateName`] if `name` is taken.
    pub fn register_observer<S, F>(
        &self,
        name: impl Into<String>,
        observer: F,
    ) -> Result<HookId, HookRegistrationError>
    where
        S: IntoScheduleIds,
        F: Fn(&AsyncEvent) + Send + Sync + 'static,
    {
        self.add(Hook::new(name).on::<S, _>(move |_ctx, event| {
            observer(event);
            Ok(())
        }))
    }

    /// Unregisters a hook. Returns `false` if `id` is unknown.
    ///
    /// A dispatch already in progress still completes with its snapshot.
    pub fn remove(&self, id: HookId) -> bool {
        let mut hooks = self.hooks.write();
        let before = hooks.len();
        hooks.retain(|entry| entry.id != id);
        hooks.len() != before
    }

    /// Enables a hook. Returns `false` if `id` is unknown.
    pub fn enable(&self, id: HookId) -> bool {
        self.set_enabled(id, true)
    }

    /// Disables a hook. Returns `false` if `id` is unknown.
    pub fn disable(&self, id: HookId) -> bool {
        self.set_enabled(id, false)
    }

    fn set_enabled(&self, id: HookId, enabled: bool) -> bool {
        let hooks = self.hooks.read();
        match hooks.iter().find(|entry| entry.id == id) {
            Some(entry) => {
                entry.set_enabled(enabled);
                true
            }
            None => false,
        }
    }

    /// Enables every registered hook.
    pub fn enable_all(&self) {
        for entry in self.hooks.read().iter() {
            entry.set_enabled(true);
        }
    }

    /// Disables every registered hook.
    pub fn disable_all(&self) {
        for entry in self.hooks.read().iter() {
            entry.set_enabled(false);
        }
    }

    /// Dispatches `event` to every enabled hook with a handler for it, in
    /// registration order.
    ///
    /// The set of hooks is fixed when the call starts; hooks added, removed,
    /// or toggled by a handler take effect from the next dispatch on.
    ///
    /// # Errors
    ///
    /// [`HookFailure`] listing every handler that returned an error or
    /// panicked, once all handlers have run.
    pub fn emit(&self, ctx: &HookContext<'_>, event: &AsyncEvent) -> Result<(), HookFailure> {
        let lifecycle_event = event.lifecycle_event();
        let snapshot: Vec<Arc<HookEntry>> = self
            .hooks
            .read()
            .iter()
            .filter(|entry| entry.is_enabled() && entry.hook.handles(lifecycle_event))
            .cloned()
            .collect();

        let mut failures = Vec::new();
        for entry in &snapshot {
            let Some(handler) = entry.hook.handler(lifecycle_event) else {
                continue;
            };
            let outcome = catch_unwind(AssertUnwindSafe(|| handler(ctx, event)))
                .unwrap_or_else(|payload| Err(HookError::from_panic(payload.as_ref())));
            if let Err(error) = outcome {
                failures.push(FailedHook {
                    id: entry.id,
                    name: entry.hook.name.clone(),
                    error,
                });
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(HookFailure {
                event: lifecycle_event,
                uid: event.uid(),
                failures,
            })
        }
    }

    /// Returns the number of registered hooks.
    #[must_use]
    pub fn hook_count(&self) -> usize {
        self.hooks.read().len()
    }

    /// Returns the number of enabled hooks.
    #[must_use]
    pub fn enabled_count(&self) -> usize {
        self.hooks
            .read()
            .iter()
            .filter(|entry| entry.is_enabled())
            .count()
    }

    /// Returns `true` if a hook named `name` is registered.
    #[must_use]
    pub fn contains_hook(&self, name: &str) -> bool {
        self.hook_id(name).is_some()
    }

    /// Returns the id of the hook named `name`.
    #[must_use]
    pub fn hook_id(&self, name: &str) -> Option<HookId> {
        self.hooks
            .read()
            .iter()
            .find(|entry| entry.hook.name == name)
            .map(|entry| entry.id)
    }

    /// Returns whether the hook is enabled, or `None` if `id` is unknown.
    #[must_use]
    pub fn is_enabled(&self, id: HookId) -> Option<bool> {
        self.hooks
            .read()
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.is_enabled())
    }
}

impl fmt::Debug for HooksAPI {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hooks = self.hooks.read();
        f.debug_list()
            .entries(hooks.iter().map(|entry| (entry.id, &entry.hook.name, entry.is_enabled())))
            .finish()
    }
}
