//! The tracker instance and the runtime reporting surface.
//!
//! [`AsyncTracker`] is the single call path through which a runtime reports
//! lifecycle events. Each report is validated and applied to the registry,
//! the trigger graph, and the execution stack under one lock. The lock is
//! then released and the event is dispatched to hooks. A rejected report
//! changes nothing and dispatches nothing.
//!
//! # Example
//!
//! ```
//! use lineage_tracker::{AsyncTracker, TrackerConfig};
//! use lineage_core::AsyncId;
//!
//! let tracker = AsyncTracker::new(TrackerConfig::default());
//!
//! let a = tracker.report_init("CONNECTION", None, None).unwrap().value();
//! assert_eq!(tracker.trigger_of(a).unwrap(), AsyncId::ROOT);
//!
//! tracker.report_before(a).unwrap();
//! let b = tracker.report_init("CONNECTION", None, None).unwrap().value();
//! tracker.report_after(a).unwrap();
//!
//! assert_eq!(tracker.trigger_of(b).unwrap(), a);
//! assert!(tracker.report_after(a).is_err());
//! ```

use core::any::TypeId;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use lineage_core::error::TrackerError;
use lineage_core::id::{AsyncId, Stamp};
use lineage_core::resource::{DestroyOutcome, LifecycleEvent, ResourceType};
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, trace, warn};

use crate::config::TrackerConfig;
use crate::context::ExecutionStack;
use crate::hooks::{AsyncEvent, HookContext, HookFailure, HooksAPI};
use crate::journal::Journal;
use crate::plugin::{PluginError, TrackerPlugin};
use crate::registry::ResourceRegistry;
use crate::trigger::TriggerGraph;

// ─────────────────────────────────────────────────────────────────────────────
// Reported
// ─────────────────────────────────────────────────────────────────────────────

/// Outcome of an accepted report: the value plus any hook failures.
///
/// Hook failures never undo the state change, so they travel next to the
/// value instead of replacing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reported<T> {
    value: T,
    hook_failure: Option<HookFailure>,
}

impl<T> Reported<T> {
    fn new(value: T, hook_failure: Option<HookFailure>) -> Self {
        Self {
            value,
            hook_failure,
        }
    }

    fn replace<U>(self, value: U) -> Reported<U> {
        Reported {
            value,
            hook_failure: self.hook_failure,
        }
    }

    /// Consumes the outcome and returns the value, ignoring hook failures.
    pub fn into_value(self) -> T {
        self.value
    }

    /// Returns the hook failures of the dispatch, if any.
    #[must_use]
    pub fn hook_failure(&self) -> Option<&HookFailure> {
        self.hook_failure.as_ref()
    }

    /// Returns `true` if every hook succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.hook_failure.is_none()
    }

    /// Turns hook failures into an error.
    ///
    /// # Errors
    ///
    /// The [`HookFailure`] if any hook failed.
    pub fn into_result(self) -> Result<T, HookFailure> {
        match self.hook_failure {
            Some(failure) => Err(failure),
            None => Ok(self.value),
        }
    }
}

impl<T: Copy> Reported<T> {
    /// Returns the value, ignoring hook failures.
    #[must_use]
    pub fn value(&self) -> T {
        self.value
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// LifecycleReport
// ─────────────────────────────────────────────────────────────────────────────

/// A raw runtime report, normalized to one of the five lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleReport {
    /// A resource was created.
    Init {
        /// Its type tag.
        kind: ResourceType,
        /// A caller-supplied id, or `None` to allocate one.
        uid: Option<AsyncId>,
        /// An explicit trigger, or `None` to use the executing resource.
        trigger: Option<AsyncId>,
    },
    /// A callback of the resource is about to run.
    Before(AsyncId),
    /// A callback of the resource finished.
    After(AsyncId),
    /// The resource was torn down.
    Destroy(AsyncId),
    /// A promise-like resource resolved.
    PromiseResolve(AsyncId),
}

impl LifecycleReport {
    /// Returns the lifecycle event of this report.
    #[must_use]
    pub fn event(&self) -> LifecycleEvent {
        match self {
            LifecycleReport::Init { .. } => LifecycleEvent::Init,
            LifecycleReport::Before(_) => LifecycleEvent::Before,
            LifecycleReport::After(_) => LifecycleEvent::After,
            LifecycleReport::Destroy(_) => LifecycleEvent::Destroy,
            LifecycleReport::PromiseResolve(_) => LifecycleEvent::PromiseResolve,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AsyncTracker
// ─────────────────────────────────────────────────────────────────────────────

/// Everything the tracker mutates, guarded by one lock.
#[derive(Debug)]
pub(crate) struct TrackerState {
    pub(crate) registry: ResourceRegistry,
    pub(crate) triggers: TriggerGraph,
    pub(crate) stack: ExecutionStack,
    pub(crate) journal: Journal,
    clock: Stamp,
}

impl TrackerState {
    fn new(config: &TrackerConfig) -> Self {
        Self {
            registry: ResourceRegistry::with_promise_types(config.promise_types().iter().cloned()),
            triggers: TriggerGraph::new(),
            stack: ExecutionStack::new(),
            journal: Journal::with_capacity(config.journal_capacity()),
            clock: Stamp::default(),
        }
    }

    /// Commits an accepted event to the clock and the journal.
    fn accept(&mut self, at: Stamp, event: LifecycleEvent, uid: AsyncId) {
        self.clock = at;
        self.journal.record(at, event, uid);
    }
}

/// An owned async-resource tracker.
///
/// Construct one per observation window, report events through it, and call
/// [`teardown`](Self::teardown) when done. Nothing is global: two trackers
/// never see each other's resources.
pub struct AsyncTracker {
    config: TrackerConfig,
    state: Mutex<TrackerState>,
    hooks: HooksAPI,
    plugins: Mutex<PluginTable>,
    dispatch_depth: AtomicUsize,
    torn_down: AtomicBool,
}

impl Default for AsyncTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

impl AsyncTracker {
    /// Creates a tracker with the given configuration.
    #[must_use]
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            state: Mutex::new(TrackerState::new(&config)),
            config,
            hooks: HooksAPI::new(),
            plugins: Mutex::new(PluginTable::default()),
            dispatch_depth: AtomicUsize::new(0),
            torn_down: AtomicBool::new(false),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Returns the hook registry.
    #[must_use]
    pub fn hooks(&self) -> &HooksAPI {
        &self.hooks
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reporting
    // ─────────────────────────────────────────────────────────────────────────

    /// Applies a normalized report and returns the uid it concerned.
    ///
    /// # Errors
    ///
    /// Whatever the matching `report_*` method returns.
    pub fn report(&self, report: LifecycleReport) -> Result<Reported<AsyncId>, TrackerError> {
        match report {
            LifecycleReport::Init { kind, uid, trigger } => self.report_init(kind, uid, trigger),
            LifecycleReport::Before(uid) => Ok(self.report_before(uid)?.replace(uid)),
            LifecycleReport::After(uid) => Ok(self.report_after(uid)?.replace(uid)),
            LifecycleReport::Destroy(uid) => Ok(self.report_destroy(uid)?.replace(uid)),
            LifecycleReport::PromiseResolve(uid) => {
                Ok(self.report_promise_resolve(uid)?.replace(uid))
            }
        }
    }

    /// Reports the creation of a resource and returns its id.
    ///
    /// The trigger is `trigger` if given, otherwise the resource currently
    /// executing, otherwise [`AsyncId::ROOT`].
    ///
    /// # Errors
    ///
    /// - [`TrackerError::DuplicateRegistration`] if `uid` is already tracked
    /// - [`TrackerError::ReservedId`] if `uid` is the root
    /// - [`TrackerError::UnknownResource`] if `trigger` was never registered
    /// - [`TrackerError::IdSpaceExhausted`] if `uid` is `u64::MAX` or no id is left
    /// - [`TrackerError::ReentrancyLimit`] if hooks nest too deeply
    pub fn report_init(
        &self,
        kind: impl Into<ResourceType>,
        uid: Option<AsyncId>,
        trigger: Option<AsyncId>,
    ) -> Result<Reported<AsyncId>, TrackerError> {
        self.check_dispatch_depth()?;
        let event = {
            let mut state = self.lock_state();
            let trigger = trigger.unwrap_or_else(|| state.stack.current());
            let at = state.clock.next();
            let uid = state.registry.register(kind, uid, trigger, at)?;
            state.triggers.record_trigger(uid, trigger)?;
            state.accept(at, LifecycleEvent::Init, uid);
            let resource = state.registry.resource(uid)?.clone();
            AsyncEvent::Init {
                uid,
                kind: resource.kind().clone(),
                trigger,
                resource,
            }
        };

        let uid = event.uid();
        if let AsyncEvent::Init { kind, trigger, .. } = &event {
            debug!(uid = %uid, kind = %kind, trigger = %trigger, "init");
        }
        Ok(Reported::new(uid, self.dispatch(&event)))
    }

    /// Reports that a callback of `uid` is about to run.
    ///
    /// # Errors
    ///
    /// - [`TrackerError::UnknownResource`] if `uid` was never registered
    /// - [`TrackerError::InvalidTransition`] if it was destroyed
    /// - [`TrackerError::ReentrancyLimit`] if hooks nest too deeply
    pub fn report_before(&self, uid: AsyncId) -> Result<Reported<()>, TrackerError> {
        self.check_dispatch_depth()?;
        let depth = {
            let mut state = self.lock_state();
            let at = state.clock.next();
            state.registry.mark_before(uid)?;
            state.stack.enter(uid);
            state.accept(at, LifecycleEvent::Before, uid);
            state.stack.depth()
        };

        debug!(uid = %uid, depth, "before");
        Ok(Reported::new((), self.dispatch(&AsyncEvent::Before { uid })))
    }

    /// Reports that a callback of `uid` finished.
    ///
    /// # Errors
    ///
    /// - [`TrackerError::UnknownResource`] if `uid` was never registered
    /// - [`TrackerError::UnmatchedAfter`] if `uid` has no open `before`
    /// - [`TrackerError::StackMismatch`] if another resource is executing on top
    /// - [`TrackerError::ReentrancyLimit`] if hooks nest too deeply
    pub fn report_after(&self, uid: AsyncId) -> Result<Reported<()>, TrackerError> {
        self.check_dispatch_depth()?;
        let depth = {
            let mut state = self.lock_state();
            let at = state.clock.next();
            state.registry.ensure_open(uid)?;
            state.stack.ensure_top(uid)?;
            state.registry.mark_after(uid)?;
            state.stack.exit(uid)?;
            state.accept(at, LifecycleEvent::After, uid);
            state.stack.depth()
        };

        debug!(uid = %uid, depth, "after");
        Ok(Reported::new((), self.dispatch(&AsyncEvent::After { uid })))
    }

    /// Reports that `uid` was torn down.
    ///
    /// A repeated destroy is logged as a warning, returns
    /// [`DestroyOutcome::AlreadyDestroyed`], and is not dispatched, unless
    /// strict destroy checking is configured.
    ///
    /// # Errors
    ///
    /// - [`TrackerError::UnknownResource`] if `uid` was never registered
    /// - [`TrackerError::DuplicateDestroy`] for a repeated destroy in strict mode
    /// - [`TrackerError::ReentrancyLimit`] if hooks nest too deeply
    pub fn report_destroy(&self, uid: AsyncId) -> Result<Reported<DestroyOutcome>, TrackerError> {
        self.check_dispatch_depth()?;
        let outcome = {
            let mut state = self.lock_state();
            if let Some(first) = state.registry.resource(uid)?.destroyed_at() {
                if self.config.strict_destroy() {
                    return Err(TrackerError::DuplicateDestroy { uid });
                }
                warn!(uid = %uid, first = %first, "duplicate destroy ignored");
                return Ok(Reported::new(
                    DestroyOutcome::AlreadyDestroyed { first },
                    None,
                ));
            }
            let at = state.clock.next();
            let outcome = state.registry.mark_destroy(uid, at)?;
            state.accept(at, LifecycleEvent::Destroy, uid);
            outcome
        };

        debug!(uid = %uid, "destroy");
        Ok(Reported::new(
            outcome,
            self.dispatch(&AsyncEvent::Destroy { uid }),
        ))
    }

    /// Reports that a promise-like resource resolved.
    ///
    /// # Errors
    ///
    /// - [`TrackerError::UnknownResource`] if `uid` was never registered
    /// - [`TrackerError::InvalidEventForType`] if its type is not promise-like
    /// - [`TrackerError::ReentrancyLimit`] if hooks nest too deeply
    pub fn report_promise_resolve(&self, uid: AsyncId) -> Result<Reported<()>, TrackerError> {
        self.check_dispatch_depth()?;
        {
            let mut state = self.lock_state();
            let at = state.clock.next();
            state.registry.mark_promise_resolve(uid)?;
            state.accept(at, LifecycleEvent::PromiseResolve, uid);
        }

        debug!(uid = %uid, "promiseResolve");
        Ok(Reported::new(
            (),
            self.dispatch(&AsyncEvent::PromiseResolve { uid }),
        ))
    }

    /// Runs `f` as a callback of `uid`, reporting `before` and `after` around it.
    ///
    /// Hook failures of the two reports are logged, not returned.
    ///
    /// # Errors
    ///
    /// Any error of [`report_before`](Self::report_before) (then `f` does not
    /// run) or [`report_after`](Self::report_after).
    pub fn within<R>(&self, uid: AsyncId, f: impl FnOnce() -> R) -> Result<R, TrackerError> {
        let _before = self.report_before(uid)?;
        let output = f();
        let _after = self.report_after(uid)?;
        Ok(output)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Execution context
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns the resource currently executing, or [`AsyncId::ROOT`].
    #[must_use]
    pub fn current_execution(&self) -> AsyncId {
        self.lock_state().stack.current()
    }

    /// Returns the trigger of the resource currently executing, or
    /// [`AsyncId::ROOT`] at top level.
    #[must_use]
    pub fn current_trigger(&self) -> AsyncId {
        let state = self.lock_state();
        let current = state.stack.current();
        state.triggers.trigger_of(current).unwrap_or(AsyncId::ROOT)
    }

    /// Returns how many callbacks are open on the execution stack.
    #[must_use]
    pub fn execution_depth(&self) -> usize {
        self.lock_state().stack.depth()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Dispatch
    // ─────────────────────────────────────────────────────────────────────────

    fn check_dispatch_depth(&self) -> Result<(), TrackerError> {
        let depth = self.dispatch_depth.load(Ordering::Acquire);
        if depth >= self.config.max_dispatch_depth() {
            return Err(TrackerError::ReentrancyLimit { depth: depth + 1 });
        }
        Ok(())
    }

    fn dispatch(&self, event: &AsyncEvent) -> Option<HookFailure> {
        if self.is_torn_down() {
            return None;
        }

        let guard = DispatchGuard::enter(&self.dispatch_depth);
        trace!(depth = guard.depth, %event, "dispatching");
        let ctx = HookContext::new(self, guard.depth);
        match self.hooks.emit(&ctx, event) {
            Ok(()) => None,
            Err(failure) => {
                warn!(%failure, "lifecycle hook failed");
                Some(failure)
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Plugins and teardown
    // ─────────────────────────────────────────────────────────────────────────

    /// Installs a plugin and runs its build phase.
    ///
    /// # Errors
    ///
    /// - [`PluginError::AlreadyInstalled`] if a plugin of the same type is installed
    /// - [`PluginError::Hook`] if the plugin's hooks could not be registered
    pub fn add_plugin<P: TrackerPlugin>(&self, plugin: P) -> Result<&Self, PluginError> {
        let type_id = TypeId::of::<P>();
        {
            let mut plugins = self.plugins.lock();
            if plugins.contains(type_id) {
                return Err(PluginError::AlreadyInstalled(plugin.name()));
            }
            plugins.building.push(type_id);
        }

        // Built outside the lock so the plugin may inspect the tracker.
        let built = plugin.build(self);
        let mut plugins = self.plugins.lock();
        plugins.building.retain(|id| *id != type_id);
        built?;

        debug!(plugin = plugin.name(), "plugin installed");
        let plugin: Arc<dyn TrackerPlugin> = Arc::new(plugin);
        plugins.installed.push((type_id, plugin));
        Ok(self)
    }

    /// Returns `true` if a plugin of type `P` is installed.
    #[must_use]
    pub fn contains_plugin<P: TrackerPlugin>(&self) -> bool {
        let type_id = TypeId::of::<P>();
        self.plugins
            .lock()
            .installed
            .iter()
            .any(|(id, _)| *id == type_id)
    }

    /// Ends the observation window.
    ///
    /// Disables every hook, then runs plugin cleanup in reverse installation
    /// order. Later reports still update the tracker state but dispatch
    /// nothing. Calling it twice does nothing the second time.
    pub fn teardown(&self) {
        if self.torn_down.swap(true, Ordering::AcqRel) {
            return;
        }
        self.hooks.disable_all();

        let plugins: Vec<Arc<dyn TrackerPlugin>> = self
            .plugins
            .lock()
            .installed
            .iter()
            .rev()
            .map(|(_, plugin)| Arc::clone(plugin))
            .collect();
        for plugin in plugins {
            debug!(plugin = plugin.name(), "plugin cleanup");
            plugin.cleanup(self);
        }
        debug!(resources = self.resource_count(), "tracker torn down");
    }

    /// Returns `true` once [`teardown`](Self::teardown) has run.
    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::Acquire)
    }
}

impl core::fmt::Debug for AsyncTracker {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AsyncTracker")
            .field("config", &self.config)
            .field("hooks", &self.hooks)
            .field("torn_down", &self.is_torn_down())
            .finish_non_exhaustive()
    }
}

/// Installed plugins, plus the types whose build phase is running.
#[derive(Default)]
struct PluginTable {
    installed: Vec<(TypeId, Arc<dyn TrackerPlugin>)>,
    building: Vec<TypeId>,
}

impl PluginTable {
    fn contains(&self, type_id: TypeId) -> bool {
        self.building.contains(&type_id) || self.installed.iter().any(|(id, _)| *id == type_id)
    }
}

/// Tracks dispatch nesting and restores it even if a hook unwinds.
struct DispatchGuard<'a> {
    counter: &'a AtomicUsize,
    depth: usize,
}

impl<'a> DispatchGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        let depth = counter.fetch_add(1, Ordering::AcqRel) + 1;
        Self { counter, depth }
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::AcqRel);
    }
}
