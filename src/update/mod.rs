// ABOUTME: The update pass pipeline and its building blocks.
// ABOUTME: Exports the container record, params, metric, sorter, and pass entry point.

mod container;
mod dependencies;
mod error;
mod metrics;
mod params;
mod pass;
mod sorter;

pub use container::{
    Container, RestartSpec, DEPENDS_ON_LABEL, MONITOR_ONLY_LABEL, SELF_LABEL,
};
pub use dependencies::mark_linked_restarts;
pub use error::UpdateError;
pub use metrics::{Metric, PassCounters};
pub use params::UpdateParams;
pub use pass::update;
pub use sorter::{sort_by_dependencies, SortError};
