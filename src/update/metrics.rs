// ABOUTME: Pass result metric and the counter bookkeeping behind it.
// ABOUTME: Keeps classification failures distinct from restart failures.

use serde::Serialize;

/// Result of one update pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Metric {
    /// Containers in the snapshot after sorting.
    pub scanned: usize,
    /// Containers restarted onto a fresh image, including dependents that
    /// restarted because a link target did.
    pub updated: usize,
    /// Classification failures plus restart failures.
    pub failed: usize,
}

/// Counters accumulated while a pass runs.
///
/// `failed` counts both classification and restart failures;
/// `stale_check_failed` is the classification share of it, so the close-out
/// can tell "could not determine status" from "restart failed".
#[derive(Debug, Default)]
pub struct PassCounters {
    /// Containers marked for restart: stale ones plus link-propagated ones.
    marked: usize,
    stale_check_failed: usize,
    failed: usize,
}

impl PassCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// A container's staleness probe or configuration verification failed.
    /// It is counted failed and excluded from the marked count.
    pub fn record_classification_failure(&mut self) {
        self.stale_check_failed += 1;
        self.failed += 1;
    }

    /// A container's backing image is stale.
    pub fn record_stale(&mut self) {
        self.marked += 1;
    }

    /// Containers restarting because a link target is restarting.
    pub fn record_linked_restarts(&mut self, count: usize) {
        self.marked += count;
    }

    pub fn add_restart_failures(&mut self, count: usize) {
        self.failed += count;
    }

    /// Close out the pass: `updated = marked - (failed - stale_check_failed)`.
    ///
    /// The identity cannot go negative with a correct classifier; if it
    /// does, clamp to zero and warn rather than return garbage.
    pub fn into_metric(self, scanned: usize) -> Metric {
        let restart_failed = self.failed - self.stale_check_failed;
        let updated = match self.marked.checked_sub(restart_failed) {
            Some(updated) => updated,
            None => {
                tracing::warn!(
                    marked = self.marked,
                    failed = self.failed,
                    stale_check_failed = self.stale_check_failed,
                    "more restart failures than marked containers, clamping updated count to zero"
                );
                0
            }
        };

        Metric {
            scanned,
            updated,
            failed: self.failed,
        }
    }
}
