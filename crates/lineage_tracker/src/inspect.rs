//! Inspection API and sanity checks.
//!
//! Everything here reads a snapshot of the tracker state taken at call time.
//! Results are owned values, so holding one never blocks reporting.

use core::fmt;

use lineage_core::error::TrackerError;
use lineage_core::id::AsyncId;
use lineage_core::resource::{AsyncResource, InvocationCounts, ResourceType};
use serde::Serialize;

use crate::journal::JournalEntry;
use crate::tracker::AsyncTracker;

// ─────────────────────────────────────────────────────────────────────────────
// Violation / SanityReport
// ─────────────────────────────────────────────────────────────────────────────

/// One inconsistency found by [`AsyncTracker::sanity_check`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "violation", rename_all = "snake_case")]
pub enum Violation {
    /// `init` was not counted exactly once.
    InitCount {
        /// The resource.
        uid: AsyncId,
        /// Observed `init` count.
        count: u32,
    },
    /// More `after`s than `before`s.
    AfterExceedsBefore {
        /// The resource.
        uid: AsyncId,
        /// Observed counters.
        counts: InvocationCounts,
    },
    /// A `before` is still waiting for its `after`.
    OutstandingBefore {
        /// The resource.
        uid: AsyncId,
        /// How many `before`s are unmatched.
        outstanding: u32,
    },
    /// `destroy` was counted more than once.
    DestroyCount {
        /// The resource.
        uid: AsyncId,
        /// Observed `destroy` count.
        count: u32,
    },
    /// The resource was never destroyed although destruction is required.
    NotDestroyed {
        /// The resource.
        uid: AsyncId,
        /// Its type.
        kind: ResourceType,
    },
}

impl Violation {
    /// Returns the resource the violation concerns.
    #[must_use]
    pub fn uid(&self) -> AsyncId {
        match self {
            Violation::InitCount { uid, .. }
            | Violation::AfterExceedsBefore { uid, .. }
            | Violation::OutstandingBefore { uid, .. }
            | Violation::DestroyCount { uid, .. }
            | Violation::NotDestroyed { uid, .. } => *uid,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::InitCount { uid, count } => {
                write!(f, "{uid}: init called {count} time(s), expected 1")
            }
            Violation::AfterExceedsBefore { uid, counts } => {
                write!(f, "{uid}: more after than before {counts}")
            }
            Violation::OutstandingBefore { uid, outstanding } => {
                write!(f, "{uid}: {outstanding} before(s) without after")
            }
            Violation::DestroyCount { uid, count } => {
                write!(f, "{uid}: destroy called {count} time(s)")
            }
            Violation::NotDestroyed { uid, kind } => {
                write!(f, "{uid}: {kind} was never destroyed")
            }
        }
    }
}

/// Result of [`AsyncTracker::sanity_check`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SanityReport {
    kind: Option<ResourceType>,
    checked: usize,
    violations: Vec<Violation>,
}

impl SanityReport {
    /// Returns the type that was checked, or `None` for all types.
    #[must_use]
    pub fn kind(&self) -> Option<&ResourceType> {
        self.kind.as_ref()
    }

    /// Returns how many resources were checked.
    #[must_use]
    pub fn checked(&self) -> usize {
        self.checked
    }

    /// Returns the violations found.
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Returns `true` if nothing was found.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// Turns violations into an error.
    ///
    /// # Errors
    ///
    /// [`TrackerError::SanityCheckFailed`] if any violation was found.
    pub fn into_result(self) -> Result<(), TrackerError> {
        if self.is_clean() {
            return Ok(());
        }
        let summary = self
            .violations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Err(TrackerError::SanityCheckFailed {
            count: self.violations.len(),
            summary,
        })
    }
}

impl fmt::Display for SanityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scope = self.kind.as_ref().map_or("all types", ResourceType::as_str);
        write!(
            f,
            "sanity check of {scope}: {} resource(s), {} violation(s)",
            self.checked,
            self.violations.len()
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TrackerSnapshot
// ─────────────────────────────────────────────────────────────────────────────

/// Serializable view of the whole tracker, for debugging dumps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackerSnapshot {
    /// Every resource, in creation order.
    pub resources: Vec<AsyncResource>,
    /// Open execution frames, outermost first.
    pub stack: Vec<AsyncId>,
    /// Retained journal entries, oldest first.
    pub journal: Vec<JournalEntry>,
    /// Journal entries evicted so far.
    pub journal_dropped: u64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Inspection API
// ─────────────────────────────────────────────────────────────────────────────

impl AsyncTracker {
    /// Snapshot of every resource of type `kind`, in creation order,
    /// regardless of state.
    #[must_use]
    pub fn activities_of_type(&self, kind: &str) -> Vec<AsyncResource> {
        self.lock_state().registry.activities_of_type(kind)
    }

    /// Snapshot of every resource whose type is one of `kinds`, in creation order.
    #[must_use]
    pub fn activities_of_types(&self, kinds: &[&str]) -> Vec<AsyncResource> {
        self.lock_state().registry.activities_of_types(kinds)
    }

    /// Returns a copy of the resource `uid`.
    ///
    /// # Errors
    ///
    /// [`TrackerError::UnknownResource`].
    pub fn resource(&self, uid: AsyncId) -> Result<AsyncResource, TrackerError> {
        self.lock_state().registry.resource(uid).cloned()
    }

    /// Returns the number of resources ever registered.
    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.lock_state().registry.len()
    }

    /// Returns the invocation counters of `uid`.
    ///
    /// # Errors
    ///
    /// [`TrackerError::UnknownResource`].
    pub fn invocation_counts_of(&self, uid: AsyncId) -> Result<InvocationCounts, TrackerError> {
        Ok(self.lock_state().registry.resource(uid)?.counts())
    }

    /// Compares the counters of `uid` with `expected`. `stage` labels the
    /// checkpoint in the error message.
    ///
    /// # Errors
    ///
    /// - [`TrackerError::UnknownResource`] if `uid` was never registered
    /// - [`TrackerError::InvocationMismatch`] if any counter differs
    pub fn check_invocations(
        &self,
        uid: AsyncId,
        expected: InvocationCounts,
        stage: &str,
    ) -> Result<(), TrackerError> {
        let actual = self.invocation_counts_of(uid)?;
        if actual == expected {
            Ok(())
        } else {
            Err(TrackerError::InvocationMismatch {
                uid,
                stage: stage.to_owned(),
                expected,
                actual,
            })
        }
    }

    /// Returns the trigger of `uid`.
    ///
    /// # Errors
    ///
    /// [`TrackerError::UnknownResource`].
    pub fn trigger_of(&self, uid: AsyncId) -> Result<AsyncId, TrackerError> {
        self.lock_state().triggers.trigger_of(uid)
    }

    /// Returns `[uid, trigger, trigger's trigger, ..., ROOT]`.
    ///
    /// # Errors
    ///
    /// [`TrackerError::UnknownResource`].
    pub fn chain_to(&self, uid: AsyncId) -> Result<Vec<AsyncId>, TrackerError> {
        self.lock_state().triggers.chain_to(uid)
    }

    /// Returns the resources created while `uid` was executing, or with `uid`
    /// as explicit trigger, in creation order.
    #[must_use]
    pub fn children_of(&self, uid: AsyncId) -> Vec<AsyncId> {
        self.lock_state().triggers.children_of(uid).to_vec()
    }

    /// Checks every resource of type `kind` (or of every type) for a coherent
    /// invocation pattern.
    ///
    /// Per resource: `init` exactly once, no more `after`s than `before`s, no
    /// `before` still open, `destroy` at most once, and, when destruction is
    /// required, destroyed unless its type is exempt.
    #[must_use]
    pub fn sanity_check(&self, kind: Option<&str>) -> SanityReport {
        let state = self.lock_state();
        let mut checked = 0;
        let mut violations = Vec::new();

        for resource in state
            .registry
            .iter()
            .filter(|resource| kind.is_none_or(|kind| resource.kind() == kind))
        {
            checked += 1;
            let uid = resource.uid();
            let counts = resource.counts();

            if counts.init != 1 {
                violations.push(Violation::InitCount {
                    uid,
                    count: counts.init,
                });
            }
            if counts.after > counts.before {
                violations.push(Violation::AfterExceedsBefore { uid, counts });
            } else if counts.outstanding() > 0 {
                violations.push(Violation::OutstandingBefore {
                    uid,
                    outstanding: counts.outstanding(),
                });
            }
            if counts.destroy > 1 {
                violations.push(Violation::DestroyCount {
                    uid,
                    count: counts.destroy,
                });
            }
            if self.config().require_destroy()
                && !resource.is_destroyed()
                && !self.config().is_destroy_exempt(resource.kind().as_str())
            {
                violations.push(Violation::NotDestroyed {
                    uid,
                    kind: resource.kind().clone(),
                });
            }
        }

        SanityReport {
            kind: kind.map(ResourceType::from),
            checked,
            violations,
        }
    }

    /// Returns the retained journal entries, oldest first.
    #[must_use]
    pub fn journal(&self) -> Vec<JournalEntry> {
        self.lock_state().journal.iter().copied().collect()
    }

    /// Returns the retained journal entries concerning `uid`, oldest first.
    #[must_use]
    pub fn journal_for(&self, uid: AsyncId) -> Vec<JournalEntry> {
        self.lock_state().journal.entries_for(uid)
    }

    /// Returns how many journal entries were evicted to stay within capacity.
    #[must_use]
    pub fn journal_dropped(&self) -> u64 {
        self.lock_state().journal.dropped()
    }

    /// Returns a serializable view of the whole tracker.
    #[must_use]
    pub fn snapshot(&self) -> TrackerSnapshot {
        let state = self.lock_state();
        TrackerSnapshot {
            resources: state.registry.iter().cloned().collect(),
            stack: state.stack.frames().to_vec(),
            journal: state.journal.iter().copied().collect(),
            journal_dropped: state.journal.dropped(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackerConfig;
    use lineage_core::resource::LifecycleEvent;

    #[test]
    fn clean_lifecycle_passes() {
        let tracker = AsyncTracker::default();
        let a = tracker.report_init("CONNECTION", None, None).unwrap().value();
        tracker.within(a, || ()).unwrap();
        tracker.report_destroy(a).unwrap();

        let report = tracker.sanity_check(Some("CONNECTION"));
        assert!(report.is_clean(), "{report}");
        assert_eq!(report.checked(), 1);
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn outstanding_before_is_reported() {
        let tracker = AsyncTracker::default();
        let a = tracker.report_init("CONNECTION", None, None).unwrap().value();
        tracker.report_before(a).unwrap();

        let report = tracker.sanity_check(None);
        assert_eq!(
            report.violations(),
            &[Violation::OutstandingBefore {
                uid: a,
                outstanding: 1
            }]
        );
        let err = report.into_result().unwrap_err();
        assert!(matches!(err, TrackerError::SanityCheckFailed { count: 1, .. }));
    }

    #[test]
    fn require_destroy_honours_exemptions() {
        let tracker = AsyncTracker::new(
            TrackerConfig::default()
                .with_require_destroy(true)
                .with_destroy_exempt_type("TIMER"),
        );
        let conn = tracker.report_init("CONNECTION", None, None).unwrap().value();
        tracker.report_init("TIMER", None, None).unwrap();

        let report = tracker.sanity_check(None);
        assert_eq!(report.checked(), 2);
        assert_eq!(report.violations().len(), 1);
        assert_eq!(report.violations()[0].uid(), conn);
        assert_eq!(
            report.violations()[0].to_string(),
            format!("{conn}: CONNECTION was never destroyed")
        );
    }

    #[test]
    fn check_invocations_names_the_stage() {
        let tracker = AsyncTracker::default();
        let a = tracker.report_init("CONNECTION", None, None).unwrap().value();
        let expected = InvocationCounts {
            init: 1,
            before: 1,
            ..Default::default()
        };

        let err = tracker
            .check_invocations(a, expected, "handshake start")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("{a} at handshake start: expected {{ init: 1, before: 1 }}, got {{ init: 1 }}")
        );

        tracker.report_before(a).unwrap();
        tracker
            .check_invocations(a, expected, "handshake start")
            .unwrap();
    }

    #[test]
    fn snapshot_serializes_resources_and_stack() {
        let tracker = AsyncTracker::default();
        let a = tracker.report_init("CONNECTION", None, None).unwrap().value();
        tracker.report_before(a).unwrap();

        let value = serde_json::to_value(tracker.snapshot()).unwrap();
        assert_eq!(value["resources"][0]["type"], "CONNECTION");
        assert_eq!(value["stack"][0], a.get());
        assert_eq!(value["journal"][1]["event"], "before");
    }

    #[test]
    fn journal_history_per_resource_and_evictions() {
        let tracker = AsyncTracker::new(TrackerConfig::default().with_journal_capacity(4));
        let a = tracker.report_init("CONNECTION", None, None).unwrap().value();
        let b = tracker.report_init("CONNECTION", None, None).unwrap().value();
        tracker.within(a, || ()).unwrap();
        tracker.report_destroy(b).unwrap();

        let events = |uid| {
            tracker
                .journal_for(uid)
                .into_iter()
                .map(|entry| entry.event)
                .collect::<Vec<_>>()
        };
        // The init of `a` was evicted.
        assert_eq!(events(a), vec![LifecycleEvent::Before, LifecycleEvent::After]);
        assert_eq!(events(b), vec![LifecycleEvent::Init, LifecycleEvent::Destroy]);
        assert_eq!(tracker.journal_dropped(), 1);

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.journal.len(), 4);
        assert_eq!(snapshot.journal_dropped, 1);
    }

    #[test]
    fn children_follow_execution() {
        let tracker = AsyncTracker::default();
        let parent = tracker.report_init("CONNECTION", None, None).unwrap().value();
        let child = tracker
            .within(parent, || {
                tracker.report_init("TIMER", None, None).unwrap().value()
            })
            .unwrap();

        assert_eq!(tracker.children_of(parent), vec![child]);
        assert_eq!(
            tracker.chain_to(child).unwrap(),
            vec![child, parent, AsyncId::ROOT]
        );
    }
}
