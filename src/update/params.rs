// ABOUTME: Per-pass configuration handed to the update pipeline.
// ABOUTME: Built from refit.yml defaults and CLI or trigger overrides.

use std::time::Duration;

use crate::runtime::ContainerFilters;

/// Options for one update pass.
#[derive(Debug, Clone)]
pub struct UpdateParams {
    /// Passed through to the runtime client's list operation.
    pub filter: ContainerFilters,
    /// Classify only, no stop/start side effects.
    pub no_restart: bool,
    /// Treat the whole population as observation-only.
    pub monitor_only: bool,
    /// Interleave stop and start per container instead of the two-phase
    /// stop-all-then-start-all order.
    pub rolling_restart: bool,
    /// Remove replaced image IDs after the restart phase.
    pub cleanup: bool,
    /// Graceful-stop bound before the runtime escalates to kill.
    pub timeout: Duration,
    /// Gate pre-check / pre-update / post-update / post-check hooks.
    pub lifecycle_hooks: bool,
}

impl Default for UpdateParams {
    fn default() -> Self {
        Self {
            filter: ContainerFilters::default(),
            no_restart: false,
            monitor_only: false,
            rolling_restart: false,
            cleanup: false,
            timeout: Duration::from_secs(10),
            lifecycle_hooks: false,
        }
    }
}
