// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes.

use serde::Serialize;

use crate::update::Metric;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
}

#[derive(Serialize)]
struct MetricEvent {
    event: &'static str,
    scanned: usize,
    updated: usize,
    failed: usize,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self { mode }
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Print the pass result.
    pub fn metric(&self, metric: &Metric) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                println!(
                    "scanned {} containers, updated {}, failed {}",
                    metric.scanned, metric.updated, metric.failed
                );
            }
            OutputMode::Json => {
                let event = MetricEvent {
                    event: "pass_complete",
                    scanned: metric.scanned,
                    updated: metric.updated,
                    failed: metric.failed,
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    println!("{json}");
                }
            }
        }
    }

    /// Print a success message.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => println!("{message}"),
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "success",
                    message,
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    println!("{json}");
                }
            }
        }
    }
}
