//! Tracing and observability plugin.
//!
//! Provides [`TracingPlugin`], which installs a `tracing` subscriber and
//! registers a hook that logs every lifecycle event the tracker dispatches.
//!
//! # Lifecycle
//!
//! - **`build()`** installs the subscriber (unless disabled) and registers
//!   the `lineage::tracing` hook on all five schedules.
//! - **`cleanup()`** logs a summary of the observation window.
//!
//! # Example
//!
//! ```
//! use lineage_core_plugins::{TracingFormat, TracingPlugin};
//! use lineage_tracker::AsyncTracker;
//! use tracing::Level;
//!
//! let tracker = AsyncTracker::default();
//! tracker
//!     .add_plugin(
//!         TracingPlugin::default()
//!             .with_level(Level::DEBUG)
//!             .with_format(TracingFormat::Compact),
//!     )
//!     .unwrap();
//!
//! let conn = tracker.report_init("CONNECTION", None, None).unwrap().value();
//! tracker.within(conn, || tracing::info!("handshake")).unwrap();
//! tracker.teardown();
//! ```

use lineage_tracker::AsyncTracker;
use lineage_tracker::hooks::schedule::{OnAfter, OnBefore, OnDestroy, OnInit, OnPromiseResolve};
use lineage_tracker::hooks::{AsyncEvent, Hook, HookRegistrationError, HookResult};
use lineage_tracker::plugin::TrackerPlugin;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Name of the hook registered by [`TracingPlugin`].
pub const TRACING_HOOK: &str = "lineage::tracing";

/// Target used for lifecycle log lines.
pub const LIFECYCLE_TARGET: &str = "lineage::lifecycle";

// ─────────────────────────────────────────────────────────────────────────────
// TracingFormat
// ─────────────────────────────────────────────────────────────────────────────

/// Tracing output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable colored output (default).
    #[default]
    Pretty,
    /// Compact single-line output.
    Compact,
    /// JSON structured output for log aggregation.
    Json,
}

/// The settings a [`TracingPlugin`] was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TracingConfig {
    /// The configured log level.
    pub level: Level,
    /// The configured output format.
    pub format: TracingFormat,
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingPlugin
// ─────────────────────────────────────────────────────────────────────────────

/// Tracing and lifecycle logging plugin.
///
/// Uses the [`tracing`] and [`tracing_subscriber`] crates under the hood.
/// Lifecycle events are logged at `DEBUG` under the
/// [`LIFECYCLE_TARGET`] target, so `with_env_filter("lineage::lifecycle=debug")`
/// shows them without raising the level of everything else.
///
/// # Configuration Options
///
/// ```
/// use lineage_core_plugins::{TracingPlugin, TracingFormat};
/// use tracing::Level;
///
/// // Development: pretty output, lifecycle visible
/// let dev_plugin = TracingPlugin::default()
///     .with_level(Level::DEBUG)
///     .with_format(TracingFormat::Pretty);
///
/// // Production: JSON output, only warnings from the tracker
/// let prod_plugin = TracingPlugin::default()
///     .with_format(TracingFormat::Json)
///     .with_env_filter("info,lineage_tracker=warn");
///
/// // Embedded: the application owns the subscriber
/// let hook_only = TracingPlugin::default().with_subscriber(false);
/// ```
#[derive(Debug, Clone)]
pub struct TracingPlugin {
    /// Maximum log level.
    level: Level,
    /// Output format.
    format: TracingFormat,
    /// Environment filter (e.g., "`lineage_tracker=debug`").
    env_filter: Option<String>,
    /// Whether to include span events (enter/exit).
    span_events: bool,
    /// Whether `build()` installs a global subscriber.
    install_subscriber: bool,
}

impl Default for TracingPlugin {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: TracingFormat::Pretty,
            env_filter: None,
            span_events: false,
            install_subscriber: true,
        }
    }
}

impl TracingPlugin {
    /// Creates a new `TracingPlugin` with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum log level.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets a custom environment filter string.
    ///
    /// Format: `target=level,target=level,...`. An invalid filter falls back
    /// to the configured level.
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Enables span enter/exit events in output.
    #[must_use]
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    /// Controls whether a global subscriber is installed. When disabled, only
    /// the logging hook is registered.
    #[must_use]
    pub fn with_subscriber(mut self, install: bool) -> Self {
        self.install_subscriber = install;
        self
    }

    /// Returns the level and format this plugin is configured with.
    #[must_use]
    pub fn config(&self) -> TracingConfig {
        TracingConfig {
            level: self.level,
            format: self.format,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        match &self.env_filter {
            Some(filter) => {
                EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(self.level.as_str()))
            }
            None => EnvFilter::new(self.level.as_str()),
        }
    }

    fn install(&self) {
        let env_filter = self.env_filter();
        let span_events = if self.span_events {
            FmtSpan::ENTER | FmtSpan::EXIT
        } else {
            FmtSpan::NONE
        };

        // try_init().ok() ignores errors if already initialized
        match self.format {
            TracingFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .pretty()
                            .with_span_events(span_events),
                    )
                    .try_init()
                    .ok();
            }
            TracingFormat::Compact => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .compact()
                            .with_span_events(span_events),
                    )
                    .try_init()
                    .ok();
            }
            TracingFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_span_events(span_events),
                    )
                    .try_init()
                    .ok();
            }
        }
    }
}

/// Logs one dispatched event.
fn log_event(event: &AsyncEvent, depth: usize) {
    match event {
        AsyncEvent::Init {
            uid, kind, trigger, ..
        } => {
            tracing::debug!(
                target: LIFECYCLE_TARGET,
                uid = uid.get(),
                kind = %kind,
                trigger = trigger.get(),
                depth,
                "init"
            );
        }
        other => {
            tracing::debug!(
                target: LIFECYCLE_TARGET,
                uid = other.uid().get(),
                depth,
                "{}",
                other.lifecycle_event()
            );
        }
    }
}

impl TrackerPlugin for TracingPlugin {
    fn name(&self) -> &'static str {
        "lineage::tracing"
    }

    fn build(&self, tracker: &AsyncTracker) -> Result<(), HookRegistrationError> {
        if self.install_subscriber {
            self.install();
        }

        tracker.hooks().add(
            Hook::new(TRACING_HOOK)
                .on::<(OnInit, OnBefore, OnAfter, OnDestroy, OnPromiseResolve), _>(
                    |ctx, event| -> HookResult {
                        log_event(event, ctx.depth());
                        Ok(())
                    },
                ),
        )?;

        tracing::info!(
            level = %self.level,
            format = ?self.format,
            "TracingPlugin initialized"
        );
        Ok(())
    }

    fn cleanup(&self, tracker: &AsyncTracker) {
        tracing::info!(
            resources = tracker.resource_count(),
            "TracingPlugin shutting down"
        );
    }
}
