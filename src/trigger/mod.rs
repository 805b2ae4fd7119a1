// ABOUTME: Externally-triggered update passes.
// ABOUTME: Single-slot gate plus the HTTP route sitting in front of it.

mod gate;
mod http;

pub use gate::{PassGuard, TriggerGate};
pub use http::{router, serve, ApiState, TagOverrides, UpdateFn};
