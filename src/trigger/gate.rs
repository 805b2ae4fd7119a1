// ABOUTME: Single-slot admission control for externally-triggered update passes.
// ABOUTME: Non-blocking acquire; overlapping triggers are dropped, not queued.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Serialises update passes across concurrent triggers.
///
/// One token, initially present. `try_enter` takes it without blocking or
/// reports busy; the returned guard puts it back when dropped, so the slot
/// frees even if the pass errors or panics.
#[derive(Debug, Clone)]
pub struct TriggerGate {
    slot: Arc<Semaphore>,
}

impl TriggerGate {
    /// A gate with its own fresh slot.
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Semaphore::new(1)),
        }
    }

    /// A gate over a supplied slot, so several handlers can share one gate.
    /// The semaphore must carry exactly one permit.
    pub fn with_slot(slot: Arc<Semaphore>) -> Self {
        Self { slot }
    }

    /// Take the slot if it is free. Returns `None` immediately when another
    /// pass is running; the caller is expected to drop the request.
    pub fn try_enter(&self) -> Option<PassGuard> {
        self.slot
            .clone()
            .try_acquire_owned()
            .ok()
            .map(|permit| PassGuard { _permit: permit })
    }
}

impl Default for TriggerGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Held for the duration of one pass; releases the slot on drop.
#[derive(Debug)]
pub struct PassGuard {
    _permit: OwnedSemaphorePermit,
}
