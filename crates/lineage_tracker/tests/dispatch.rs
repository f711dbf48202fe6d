//! Hook dispatch through a live tracker: ordering, failure isolation,
//! reentrancy, and toggling hooks from inside handlers.

mod test_utils;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

use lineage_core::error::TrackerError;
use lineage_core::id::AsyncId;
use lineage_tracker::hooks::schedule::{OnAfter, OnBefore, OnInit};
use lineage_tracker::hooks::{AsyncEvent, Hook, HookError, HookRegistrationError, HookResult};
use lineage_tracker::plugin::{PluginError, TrackerPlugin};
use lineage_tracker::{AsyncTracker, TrackerConfig};
use test_utils::EventLog;

#[test]
fn throwing_before_does_not_block_other_hooks() {
    let tracker = AsyncTracker::default();
    let after_calls = Arc::new(AtomicUsize::new(0));

    tracker
        .hooks()
        .add(Hook::new("a").on_before(|_, _| panic!("before handler exploded")))
        .unwrap();
    let counted = Arc::clone(&after_calls);
    tracker
        .hooks()
        .add(Hook::new("b").on_after(move |_, _| -> HookResult {
            counted.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }))
        .unwrap();
    let log = EventLog::install(&tracker, "log");

    let uid = tracker.report_init("TIMER", None, None).unwrap().value();
    let before = tracker.report_before(uid).unwrap();
    let failure = before.hook_failure().expect("hook a should fail");
    assert!(failure.contains("a"));
    assert!(matches!(failure.failures()[0].error(), HookError::Panicked(_)));

    assert!(tracker.report_after(uid).unwrap().is_clean());
    assert_eq!(after_calls.load(Ordering::SeqCst), 1);
    assert_eq!(log.names(), vec!["OnInit", "OnBefore", "OnAfter"]);
    assert_eq!(tracker.execution_depth(), 0);
}

#[test]
fn hook_failure_never_corrupts_state() {
    let tracker = AsyncTracker::default();
    tracker
        .hooks()
        .add(Hook::new("refuse").on::<(OnInit, OnAfter), _>(|_, event| {
            Err(HookError::failed(format!("refused {event}")))
        }))
        .unwrap();

    let reported = tracker.report_init("CONNECTION", None, None).unwrap();
    let uid = reported.value();
    let failure = reported.into_result().unwrap_err();
    assert_eq!(failure.uid(), uid);
    assert_eq!(tracker.resource_count(), 1);

    tracker.report_before(uid).unwrap();
    assert!(tracker.report_after(uid).unwrap().hook_failure().is_some());
    assert_eq!(tracker.invocation_counts_of(uid).unwrap().after, 1);
}

#[test]
fn init_from_inside_a_hook_keeps_outer_order() {
    let tracker = AsyncTracker::default();
    let order = Arc::new(Mutex::new(Vec::new()));
    let spawned = Arc::new(Mutex::new(None));

    let recorded = Arc::clone(&order);
    let child_slot = Arc::clone(&spawned);
    tracker
        .hooks()
        .add(Hook::new("spawner").on_before(move |ctx, event| -> HookResult {
            recorded.lock().unwrap().push(format!("spawner {}", event.uid()));
            let child = ctx.tracker().report_init("TIMER", None, None)?.value();
            *child_slot.lock().unwrap() = Some(child);
            Ok(())
        }))
        .unwrap();

    let recorded = Arc::clone(&order);
    tracker
        .hooks()
        .register_observer::<(OnInit, OnBefore), _>(
            "observer",
            move |event: &AsyncEvent| {
                recorded.lock().unwrap().push(event.to_string());
            },
        )
        .unwrap();

    let parent = tracker.report_init("CONNECTION", None, None).unwrap().value();
    order.lock().unwrap().clear();

    assert!(tracker.report_before(parent).unwrap().is_clean());
    let child = spawned.lock().unwrap().take().expect("spawner ran");

    // The nested init is dispatched in full before the outer dispatch resumes.
    assert_eq!(
        *order.lock().unwrap(),
        vec![
            format!("spawner {parent}"),
            format!("Init(TIMER {child}, trigger: {parent})"),
            format!("Before({parent})"),
        ]
    );
    assert_eq!(tracker.trigger_of(child).unwrap(), parent);
}

#[test]
fn runaway_reentrancy_is_bounded() {
    let tracker = AsyncTracker::new(TrackerConfig::default().with_max_dispatch_depth(3));
    let depths = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&depths);
    tracker
        .hooks()
        .add(Hook::new("fork_bomb").on_init(move |ctx, _| -> HookResult {
            seen.lock().unwrap().push(ctx.depth());
            ctx.tracker().report_init("TIMER", None, None)?;
            Ok(())
        }))
        .unwrap();

    let reported = tracker.report_init("TIMER", None, None).unwrap();
    assert!(reported.is_clean());
    assert_eq!(*depths.lock().unwrap(), vec![1, 2, 3]);
    // The innermost hook saw its nested report refused.
    assert_eq!(tracker.resource_count(), 3);

    let refused = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&refused);
    let probe = AsyncTracker::new(TrackerConfig::default().with_max_dispatch_depth(1));
    probe
        .hooks()
        .add(Hook::new("probe").on_init(move |ctx, _| -> HookResult {
            *slot.lock().unwrap() = ctx.tracker().report_init("TIMER", None, None).err();
            Ok(())
        }))
        .unwrap();
    probe.report_init("TIMER", None, None).unwrap();
    assert_eq!(
        *refused.lock().unwrap(),
        Some(TrackerError::ReentrancyLimit { depth: 2 })
    );
}

#[test]
fn hooks_toggled_during_dispatch_apply_next_time() {
    let tracker = AsyncTracker::default();
    let log = EventLog::install(&tracker, "log");
    let log_id = tracker.hooks().hook_id("log").unwrap();

    tracker
        .hooks()
        .add(Hook::new("silencer").on_before(move |ctx, _| -> HookResult {
            ctx.tracker().hooks().disable(log_id);
            Ok(())
        }))
        .unwrap();

    let uid = tracker.report_init("TIMER", None, None).unwrap().value();
    tracker.report_before(uid).unwrap();
    tracker.report_after(uid).unwrap();

    // `log` ran before `silencer` for the before event, then stayed quiet.
    assert_eq!(log.names(), vec!["OnInit", "OnBefore"]);
    assert_eq!(tracker.hooks().is_enabled(log_id), Some(false));
}

#[test]
fn misnested_after_is_surfaced_and_not_dispatched() {
    let tracker = AsyncTracker::default();
    let log = EventLog::install(&tracker, "log");
    let a = tracker.report_init("CONNECTION", None, None).unwrap().value();
    let b = tracker.report_init("CONNECTION", None, None).unwrap().value();

    tracker.report_before(a).unwrap();
    tracker.report_before(b).unwrap();
    let err = tracker.report_after(a).unwrap_err();
    assert!(err.is_integration_bug());
    assert_eq!(log.len(), 4);

    assert_eq!(
        tracker.report_before(AsyncId::new(99)).unwrap_err(),
        TrackerError::UnknownResource {
            uid: AsyncId::new(99)
        }
    );
}

#[test]
fn promise_resolve_after_destroy_is_accepted_for_promises_only() {
    let tracker = AsyncTracker::default();
    let log = EventLog::install(&tracker, "log");
    let promise = tracker.report_init("PROMISE", None, None).unwrap().value();
    let timer = tracker.report_init("TIMER", None, None).unwrap().value();

    tracker.report_destroy(promise).unwrap();
    tracker.report_promise_resolve(promise).unwrap();
    assert!(matches!(
        tracker.report_promise_resolve(timer).unwrap_err(),
        TrackerError::InvalidEventForType { .. }
    ));
    assert_eq!(
        log.names(),
        vec!["OnInit", "OnInit", "OnDestroy", "OnPromiseResolve"]
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Plugins
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct CountingPlugin {
    cleanups: Arc<AtomicUsize>,
}

impl TrackerPlugin for CountingPlugin {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn build(&self, tracker: &AsyncTracker) -> Result<(), HookRegistrationError> {
        tracker
            .hooks()
            .register_observer::<OnInit, _>("counting", |_: &AsyncEvent| {})?;
        Ok(())
    }

    fn cleanup(&self, tracker: &AsyncTracker) {
        assert!(tracker.is_torn_down());
        self.cleanups.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn plugins_install_once_and_clean_up_once() {
    let tracker = AsyncTracker::default();
    let cleanups = Arc::new(AtomicUsize::new(0));
    tracker
        .add_plugin(CountingPlugin {
            cleanups: Arc::clone(&cleanups),
        })
        .unwrap();
    assert!(tracker.contains_plugin::<CountingPlugin>());
    assert!(tracker.hooks().contains_hook("counting"));

    let err = tracker.add_plugin(CountingPlugin::default()).unwrap_err();
    assert_eq!(err, PluginError::AlreadyInstalled("counting"));

    tracker.teardown();
    tracker.teardown();
    assert_eq!(cleanups.load(Ordering::SeqCst), 1);
}

/// Blocks in its build phase until released.
struct GatedPlugin {
    started: Arc<Barrier>,
    release: Arc<Barrier>,
    builds: Arc<AtomicUsize>,
}

impl TrackerPlugin for GatedPlugin {
    fn name(&self) -> &'static str {
        "gated"
    }

    fn build(&self, _tracker: &AsyncTracker) -> Result<(), HookRegistrationError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        self.started.wait();
        self.release.wait();
        Ok(())
    }
}

#[test]
fn plugin_type_is_claimed_while_it_builds() {
    let tracker = Arc::new(AsyncTracker::default());
    let started = Arc::new(Barrier::new(2));
    let release = Arc::new(Barrier::new(2));
    let builds = Arc::new(AtomicUsize::new(0));
    let gated = || GatedPlugin {
        started: Arc::clone(&started),
        release: Arc::clone(&release),
        builds: Arc::clone(&builds),
    };

    let first = {
        let tracker = Arc::clone(&tracker);
        let plugin = gated();
        thread::spawn(move || tracker.add_plugin(plugin).map(|_| ()))
    };

    started.wait();
    let err = tracker.add_plugin(gated()).unwrap_err();
    assert_eq!(err, PluginError::AlreadyInstalled("gated"));
    assert!(!tracker.contains_plugin::<GatedPlugin>());
    release.wait();

    first.join().expect("Thread panicked").unwrap();
    assert!(tracker.contains_plugin::<GatedPlugin>());
    assert_eq!(builds.load(Ordering::SeqCst), 1);
}

#[test]
fn failed_build_releases_the_plugin_type() {
    let tracker = AsyncTracker::default();
    let blocker = tracker
        .hooks()
        .register_observer::<OnInit, _>("counting", |_: &AsyncEvent| {})
        .unwrap();

    let err = tracker.add_plugin(CountingPlugin::default()).unwrap_err();
    assert!(matches!(err, PluginError::Hook(_)));
    assert!(!tracker.contains_plugin::<CountingPlugin>());

    assert!(tracker.hooks().remove(blocker));
    tracker.add_plugin(CountingPlugin::default()).unwrap();
    assert!(tracker.contains_plugin::<CountingPlugin>());
}
