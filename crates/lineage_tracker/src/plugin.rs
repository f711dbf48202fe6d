//! Plugin seam for packaged hooks.
//!
//! A [`TrackerPlugin`] bundles hooks (and whatever state they share) behind a
//! type, so an application installs logging or auditing in one call:
//!
//! ```
//! use lineage_tracker::AsyncTracker;
//! use lineage_tracker::hooks::{AsyncEvent, HookRegistrationError};
//! use lineage_tracker::hooks::schedule::OnInit;
//! use lineage_tracker::plugin::TrackerPlugin;
//!
//! struct CreationLog;
//!
//! impl TrackerPlugin for CreationLog {
//!     fn build(&self, tracker: &AsyncTracker) -> Result<(), HookRegistrationError> {
//!         tracker
//!             .hooks()
//!             .register_observer::<OnInit, _>("creation_log", |event: &AsyncEvent| {
//!                 tracing::debug!(%event, "created");
//!             })?;
//!         Ok(())
//!     }
//! }
//!
//! let tracker = AsyncTracker::default();
//! tracker.add_plugin(CreationLog).unwrap();
//! assert!(tracker.add_plugin(CreationLog).is_err());
//! ```
//!
//! Plugins follow a two-phase lifecycle:
//!
//! 1. **Build Phase** - `build()` is called once, when the plugin is added
//! 2. **Cleanup Phase** - `cleanup()` is called at [`AsyncTracker::teardown`],
//!    in reverse installation order

use crate::hooks::HookRegistrationError;
use crate::tracker::AsyncTracker;

/// A packaged set of hooks installed on a tracker.
pub trait TrackerPlugin: Send + Sync + 'static {
    /// Human-readable name, used in logs and errors.
    fn name(&self) -> &'static str {
        core::any::type_name::<Self>()
    }

    /// Registers the plugin's hooks. Called once when the plugin is added.
    ///
    /// # Errors
    ///
    /// A registration error aborts installation.
    fn build(&self, tracker: &AsyncTracker) -> Result<(), HookRegistrationError>;

    /// Called once at teardown, after every hook has been disabled.
    ///
    /// The tracker state is still readable, which makes this the place for
    /// final reports.
    fn cleanup(&self, _tracker: &AsyncTracker) {}
}

/// Errors raised while installing a plugin.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PluginError {
    /// A plugin of the same type is already installed.
    #[error("plugin '{0}' is already installed")]
    AlreadyInstalled(&'static str),

    /// The plugin failed to register its hooks.
    #[error("plugin hook registration failed: {0}")]
    Hook(#[from] HookRegistrationError),
}
