//! Sharing one tracker across threads.
//!
//! The execution stack models a single timeline, so these tests only report
//! events that never open an execution window from more than one thread.

use core::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use lineage_core::id::AsyncId;
use lineage_tracker::AsyncTracker;
use lineage_tracker::hooks::AsyncEvent;
use lineage_tracker::hooks::schedule::{OnDestroy, OnInit};

/// Ids handed out to concurrent inits are unique and dense.
#[test]
fn concurrent_inits_get_unique_ids() {
    let tracker = Arc::new(AsyncTracker::default());
    let barrier = Arc::new(Barrier::new(4));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let tracker = Arc::clone(&tracker);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                (0..50)
                    .map(|_| tracker.report_init("TIMER", None, None).unwrap().value())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut ids: Vec<AsyncId> = handles
        .into_iter()
        .flat_map(|handle| handle.join().expect("Thread panicked"))
        .collect();
    ids.sort();
    ids.dedup();

    assert_eq!(ids.len(), 200);
    assert_eq!(ids.first().copied(), Some(AsyncId::FIRST));
    assert_eq!(tracker.resource_count(), 200);
    assert!(
        tracker
            .activities_of_type("TIMER")
            .iter()
            .all(|timer| timer.trigger().is_root())
    );
}

/// Hooks registered while other threads report see only later events, and
/// every event reaches every hook that was present when it was dispatched.
#[test]
fn hooks_can_be_registered_while_reporting() {
    let tracker = Arc::new(AsyncTracker::default());
    let seen = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&seen);
    tracker
        .hooks()
        .register_observer::<(OnInit, OnDestroy), _>("counter", move |_: &AsyncEvent| {
            counted.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    let reporters: Vec<_> = (0..3)
        .map(|_| {
            let tracker = Arc::clone(&tracker);
            thread::spawn(move || {
                for _ in 0..20 {
                    let uid = tracker.report_init("TIMER", None, None).unwrap().value();
                    tracker.report_destroy(uid).unwrap();
                }
            })
        })
        .collect();

    let registrar = {
        let tracker = Arc::clone(&tracker);
        thread::spawn(move || {
            for n in 0..10 {
                tracker
                    .hooks()
                    .register_observer::<OnInit, _>(format!("late_{n}"), |_: &AsyncEvent| {})
                    .unwrap();
            }
        })
    };

    for handle in reporters {
        handle.join().expect("Thread panicked");
    }
    registrar.join().expect("Thread panicked");

    assert_eq!(seen.load(Ordering::SeqCst), 120);
    assert_eq!(tracker.hooks().hook_count(), 11);
    assert!(tracker.sanity_check(Some("TIMER")).is_clean());
}
