//! Tracker configuration.
//!
//! [`TrackerConfig`] is a plain builder: every option has a default and a
//! `with_*` setter.
//!
//! ```
//! use lineage_tracker::TrackerConfig;
//!
//! let config = TrackerConfig::default()
//!     .with_promise_type("PROMISE_WRAP")
//!     .with_strict_destroy(true)
//!     .with_require_destroy(true)
//!     .with_destroy_exempt_type("CONNECTION")
//!     .with_journal_capacity(0);
//!
//! assert!(config.is_promise_type("PROMISE"));
//! assert!(config.is_promise_type("PROMISE_WRAP"));
//! assert!(config.is_destroy_exempt("CONNECTION"));
//! ```

use lineage_core::resource::ResourceType;

/// Default number of journal entries kept.
pub const DEFAULT_JOURNAL_CAPACITY: usize = 1024;

/// Default limit on hooks reporting events from inside hooks.
pub const DEFAULT_MAX_DISPATCH_DEPTH: usize = 64;

/// Resource type treated as promise-like unless configured otherwise.
pub const DEFAULT_PROMISE_TYPE: &str = "PROMISE";

/// Configuration for an [`AsyncTracker`](crate::AsyncTracker).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Types that accept `promiseResolve`.
    promise_types: Vec<ResourceType>,
    /// Whether a repeated `destroy` is an error instead of a warning.
    strict_destroy: bool,
    /// Whether the sanity check requires every resource to be destroyed.
    require_destroy: bool,
    /// Types exempt from `require_destroy`.
    destroy_exempt_types: Vec<ResourceType>,
    /// Journal ring size; zero disables the journal.
    journal_capacity: usize,
    /// Maximum hook dispatch nesting.
    max_dispatch_depth: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            promise_types: vec![ResourceType::from(DEFAULT_PROMISE_TYPE)],
            strict_destroy: false,
            require_destroy: false,
            destroy_exempt_types: Vec::new(),
            journal_capacity: DEFAULT_JOURNAL_CAPACITY,
            max_dispatch_depth: DEFAULT_MAX_DISPATCH_DEPTH,
        }
    }
}

impl TrackerConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a promise-like resource type.
    #[must_use]
    pub fn with_promise_type(mut self, kind: impl Into<ResourceType>) -> Self {
        let kind = kind.into();
        if !self.promise_types.contains(&kind) {
            self.promise_types.push(kind);
        }
        self
    }

    /// Replaces the set of promise-like resource types.
    #[must_use]
    pub fn with_promise_types<I, T>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ResourceType>,
    {
        self.promise_types = kinds.into_iter().map(Into::into).collect();
        self
    }

    /// Makes a repeated `destroy` fail with
    /// [`TrackerError::DuplicateDestroy`](lineage_core::TrackerError::DuplicateDestroy).
    #[must_use]
    pub fn with_strict_destroy(mut self, strict: bool) -> Self {
        self.strict_destroy = strict;
        self
    }

    /// Requires every non-exempt resource to be destroyed for the sanity check to pass.
    #[must_use]
    pub fn with_require_destroy(mut self, required: bool) -> Self {
        self.require_destroy = required;
        self
    }

    /// Exempts a resource type from the destroy requirement.
    #[must_use]
    pub fn with_destroy_exempt_type(mut self, kind: impl Into<ResourceType>) -> Self {
        let kind = kind.into();
        if !self.destroy_exempt_types.contains(&kind) {
            self.destroy_exempt_types.push(kind);
        }
        self
    }

    /// Sets how many journal entries are kept. Zero disables the journal.
    #[must_use]
    pub fn with_journal_capacity(mut self, capacity: usize) -> Self {
        self.journal_capacity = capacity;
        self
    }

    /// Sets how deeply hooks may report events from inside other hooks.
    #[must_use]
    pub fn with_max_dispatch_depth(mut self, depth: usize) -> Self {
        self.max_dispatch_depth = depth.max(1);
        self
    }

    /// Returns the promise-like resource types.
    #[must_use]
    pub fn promise_types(&self) -> &[ResourceType] {
        &self.promise_types
    }

    /// Returns `true` if `kind` accepts `promiseResolve`.
    #[must_use]
    pub fn is_promise_type(&self, kind: &str) -> bool {
        self.promise_types.iter().any(|t| t == kind)
    }

    /// Returns whether a repeated `destroy` is an error.
    #[must_use]
    pub fn strict_destroy(&self) -> bool {
        self.strict_destroy
    }

    /// Returns whether the sanity check requires destruction.
    #[must_use]
    pub fn require_destroy(&self) -> bool {
        self.require_destroy
    }

    /// Returns `true` if `kind` is exempt from the destroy requirement.
    #[must_use]
    pub fn is_destroy_exempt(&self, kind: &str) -> bool {
        self.destroy_exempt_types.iter().any(|t| t == kind)
    }

    /// Returns the journal capacity.
    #[must_use]
    pub fn journal_capacity(&self) -> usize {
        self.journal_capacity
    }

    /// Returns the maximum dispatch nesting depth.
    #[must_use]
    pub fn max_dispatch_depth(&self) -> usize {
        self.max_dispatch_depth
    }
}
