//! Shared test utilities for `lineage_tracker` integration tests.
//!
//! Import via `mod test_utils;` in test files.

#![allow(
    dead_code,
    missing_docs,
    reason = "shared test utilities, not all items used in every test binary"
)]

use std::sync::{Arc, Mutex};

use lineage_core::id::AsyncId;
use lineage_core::resource::InvocationCounts;
use lineage_tracker::AsyncTracker;
use lineage_tracker::hooks::AsyncEvent;
use lineage_tracker::hooks::schedule::{OnAfter, OnBefore, OnDestroy, OnInit, OnPromiseResolve};

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT LOG
// ═══════════════════════════════════════════════════════════════════════════════

/// Records every dispatched event as `(schedule name, uid)`.
#[derive(Clone, Default)]
pub struct EventLog {
    entries: Arc<Mutex<Vec<(&'static str, AsyncId)>>>,
}

impl EventLog {
    /// Registers an observer named `name` on all five schedules.
    pub fn install(tracker: &AsyncTracker, name: &str) -> Self {
        let log = Self::default();
        let entries = Arc::clone(&log.entries);
        tracker
            .hooks()
            .register_observer::<(OnInit, OnBefore, OnAfter, OnDestroy, OnPromiseResolve), _>(
                name,
                move |event: &AsyncEvent| {
                    entries
                        .lock()
                        .unwrap()
                        .push((event.schedule_name(), event.uid()));
                },
            )
            .expect("registration should succeed");
        log
    }

    pub fn entries(&self) -> Vec<(&'static str, AsyncId)> {
        self.entries.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries().into_iter().map(|(name, _)| name).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXPECTED COUNTS
// ═══════════════════════════════════════════════════════════════════════════════

/// `{ init: 1 }`
pub fn created() -> InvocationCounts {
    InvocationCounts {
        init: 1,
        ..Default::default()
    }
}

/// `{ init: 1, before: 1 }`
pub fn running() -> InvocationCounts {
    InvocationCounts {
        init: 1,
        before: 1,
        ..Default::default()
    }
}

/// `{ init: 1, before: 1, after: 1 }`
pub fn completed() -> InvocationCounts {
    InvocationCounts {
        init: 1,
        before: 1,
        after: 1,
        ..Default::default()
    }
}
