//! End-of-run sanity checking.
//!
//! [`SanityCheckPlugin`] runs [`AsyncTracker::sanity_check`] when the tracker
//! is torn down, logs what it finds, and keeps the report for the caller.
//!
//! # Example
//!
//! ```
//! use lineage_core_plugins::SanityCheckPlugin;
//! use lineage_tracker::AsyncTracker;
//!
//! let plugin = SanityCheckPlugin::for_type("CONNECTION");
//! let handle = plugin.handle();
//!
//! let tracker = AsyncTracker::default();
//! tracker.add_plugin(plugin).unwrap();
//!
//! let conn = tracker.report_init("CONNECTION", None, None).unwrap().value();
//! tracker.within(conn, || ()).unwrap();
//! tracker.teardown();
//!
//! assert!(handle.result().is_ok());
//! assert_eq!(handle.report().unwrap().checked(), 1);
//! ```

use std::sync::Arc;

use lineage_core::error::TrackerError;
use lineage_core::resource::ResourceType;
use lineage_tracker::hooks::HookRegistrationError;
use lineage_tracker::plugin::TrackerPlugin;
use lineage_tracker::{AsyncTracker, SanityReport};
use parking_lot::Mutex;

/// Shared slot the plugin writes its report into.
#[derive(Debug, Clone, Default)]
pub struct SanityCheckHandle {
    report: Arc<Mutex<Option<SanityReport>>>,
    fail_on_violation: bool,
}

impl SanityCheckHandle {
    /// Returns the report produced at teardown, or `None` if the tracker has
    /// not been torn down yet.
    #[must_use]
    pub fn report(&self) -> Option<SanityReport> {
        self.report.lock().clone()
    }

    /// Returns `true` once a report is available.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.report.lock().is_some()
    }

    /// Returns the outcome of the check.
    ///
    /// Violations are only an error when the plugin was configured with
    /// [`fail_on_violation`](SanityCheckPlugin::fail_on_violation). A missing
    /// report counts as success.
    ///
    /// # Errors
    ///
    /// [`TrackerError::SanityCheckFailed`] if violations were found and the
    /// plugin fails on them.
    pub fn result(&self) -> Result<(), TrackerError> {
        match self.report() {
            Some(report) if self.fail_on_violation => report.into_result(),
            _ => Ok(()),
        }
    }
}

/// Runs the sanity check at teardown.
///
/// Violations are logged as warnings, or as errors when the plugin fails on
/// them. With `DEBUG` enabled the whole tracker state is dumped as JSON
/// alongside.
#[derive(Debug, Clone)]
pub struct SanityCheckPlugin {
    kind: Option<ResourceType>,
    handle: SanityCheckHandle,
}

impl Default for SanityCheckPlugin {
    fn default() -> Self {
        Self::all_types()
    }
}

impl SanityCheckPlugin {
    /// Checks every resource, whatever its type.
    #[must_use]
    pub fn all_types() -> Self {
        Self {
            kind: None,
            handle: SanityCheckHandle {
                fail_on_violation: true,
                ..SanityCheckHandle::default()
            },
        }
    }

    /// Checks only resources of type `kind`.
    #[must_use]
    pub fn for_type(kind: impl Into<ResourceType>) -> Self {
        Self {
            kind: Some(kind.into()),
            ..Self::all_types()
        }
    }

    /// Sets whether violations make [`SanityCheckHandle::result`] fail.
    /// Defaults to `true`.
    #[must_use]
    pub fn fail_on_violation(mut self, fail: bool) -> Self {
        self.handle.fail_on_violation = fail;
        self
    }

    /// Returns a handle to read the report after teardown.
    #[must_use]
    pub fn handle(&self) -> SanityCheckHandle {
        self.handle.clone()
    }

    fn log(&self, tracker: &AsyncTracker, report: &SanityReport) {
        if report.is_clean() {
            tracing::info!(checked = report.checked(), "{report}");
            return;
        }

        for violation in report.violations() {
            if self.handle.fail_on_violation {
                tracing::error!(uid = violation.uid().get(), "{violation}");
            } else {
                tracing::warn!(uid = violation.uid().get(), "{violation}");
            }
            tracing::debug!(
                uid = violation.uid().get(),
                history = ?tracker.journal_for(violation.uid()),
                "journal of violating resource"
            );
        }
        tracing::warn!(
            checked = report.checked(),
            violations = report.violations().len(),
            "{report}"
        );

        if tracing::enabled!(tracing::Level::DEBUG) {
            match serde_json::to_string(&tracker.snapshot()) {
                Ok(dump) => tracing::debug!(snapshot = %dump, "tracker state at teardown"),
                Err(err) => tracing::debug!(%err, "tracker state could not be serialized"),
            }
        }
    }
}

impl TrackerPlugin for SanityCheckPlugin {
    fn name(&self) -> &'static str {
        "lineage::sanity_check"
    }

    fn build(&self, _tracker: &AsyncTracker) -> Result<(), HookRegistrationError> {
        tracing::debug!(
            kind = self.kind.as_ref().map_or("all types", ResourceType::as_str),
            fail_on_violation = self.handle.fail_on_violation,
            "SanityCheckPlugin armed"
        );
        Ok(())
    }

    fn cleanup(&self, tracker: &AsyncTracker) {
        let report = tracker.sanity_check(self.kind.as_ref().map(ResourceType::as_str));
        self.log(tracker, &report);
        *self.handle.report.lock() = Some(report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_is_empty_until_teardown() {
        let plugin = SanityCheckPlugin::default();
        let handle = plugin.handle();
        let tracker = AsyncTracker::default();
        tracker.add_plugin(plugin).unwrap();

        tracker.report_init("TIMER", None, None).unwrap();
        assert!(!handle.is_ready());
        assert!(handle.result().is_ok());

        tracker.teardown();
        let report = handle.report().unwrap();
        assert_eq!(report.checked(), 1);
        assert!(report.kind().is_none());
    }

    #[test]
    fn for_type_sets_scope() {
        let plugin = SanityCheckPlugin::for_type("CONNECTION").fail_on_violation(false);
        assert_eq!(plugin.kind.as_ref().map(ResourceType::as_str), Some("CONNECTION"));
        assert!(!plugin.handle.fail_on_violation);
    }
}
