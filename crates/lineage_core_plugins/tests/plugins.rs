//! Plugins installed on a live tracker.

use lineage_core::error::TrackerError;
use lineage_core_plugins::{SanityCheckPlugin, TRACING_HOOK, TracingPlugin};
use lineage_tracker::hooks::{Hook, HookResult};
use lineage_tracker::plugin::PluginError;
use lineage_tracker::{AsyncTracker, TrackerConfig, Violation};

fn hook_only_tracing() -> TracingPlugin {
    TracingPlugin::default().with_subscriber(false)
}

#[test]
fn tracing_plugin_installs_once() {
    let tracker = AsyncTracker::default();
    tracker.add_plugin(hook_only_tracing()).unwrap();

    let err = tracker.add_plugin(hook_only_tracing()).unwrap_err();
    assert_eq!(err, PluginError::AlreadyInstalled("lineage::tracing"));
    assert_eq!(tracker.hooks().hook_count(), 1);
}

#[test]
fn tracing_plugin_conflicts_with_a_hook_of_the_same_name() {
    let tracker = AsyncTracker::default();
    tracker
        .hooks()
        .add(Hook::new(TRACING_HOOK).on_init(|_, _| -> HookResult { Ok(()) }))
        .unwrap();

    let err = tracker.add_plugin(hook_only_tracing()).unwrap_err();
    assert!(matches!(err, PluginError::Hook(_)));
    assert!(!tracker.contains_plugin::<TracingPlugin>());
}

#[test]
fn tracing_hook_stays_out_of_the_way() {
    let tracker = AsyncTracker::default();
    tracker.add_plugin(hook_only_tracing()).unwrap();

    let promise = tracker.report_init("PROMISE", None, None).unwrap().value();
    let then = tracker
        .report_init("PROMISE", None, Some(promise))
        .unwrap()
        .value();
    for reported in [
        tracker.report_before(then).unwrap(),
        tracker.report_promise_resolve(promise).unwrap(),
        tracker.report_after(then).unwrap(),
    ] {
        assert!(reported.is_clean());
    }
    assert!(tracker.report_destroy(then).unwrap().is_clean());
    assert_eq!(tracker.trigger_of(then).unwrap(), promise);
}

#[test]
fn sanity_check_collects_open_windows_at_teardown() {
    let plugin = SanityCheckPlugin::for_type("CONNECTION");
    let handle = plugin.handle();
    let tracker = AsyncTracker::default();
    tracker.add_plugin(plugin).unwrap();

    let conn = tracker.report_init("CONNECTION", None, None).unwrap().value();
    tracker.report_init("TIMER", None, None).unwrap();
    tracker.report_before(conn).unwrap();
    tracker.teardown();

    let report = handle.report().unwrap();
    assert_eq!(report.checked(), 1);
    assert_eq!(
        report.violations(),
        &[Violation::OutstandingBefore {
            uid: conn,
            outstanding: 1
        }]
    );
    assert!(matches!(
        handle.result(),
        Err(TrackerError::SanityCheckFailed { count: 1, .. })
    ));
}

#[test]
fn sanity_check_can_report_without_failing() {
    let plugin = SanityCheckPlugin::all_types().fail_on_violation(false);
    let handle = plugin.handle();
    let tracker = AsyncTracker::new(TrackerConfig::default().with_require_destroy(true));
    tracker.add_plugin(plugin).unwrap();

    let timer = tracker.report_init("TIMER", None, None).unwrap().value();
    tracker.teardown();

    let report = handle.report().unwrap();
    assert_eq!(report.violations().len(), 1);
    assert_eq!(report.violations()[0].uid(), timer);
    assert!(handle.result().is_ok());
}

#[test]
fn plugins_clean_up_in_reverse_order() {
    let sanity = SanityCheckPlugin::all_types();
    let handle = sanity.handle();
    let tracker = AsyncTracker::default();
    tracker
        .add_plugin(hook_only_tracing())
        .unwrap()
        .add_plugin(sanity)
        .unwrap();

    let timer = tracker.report_init("TIMER", None, None).unwrap().value();
    tracker.within(timer, || ()).unwrap();
    tracker.report_destroy(timer).unwrap();

    tracker.teardown();
    tracker.teardown();
    assert!(handle.is_ready());
    handle.result().unwrap();
}
