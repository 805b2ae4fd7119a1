// ABOUTME: Snapshot record of one running container as seen by an update pass.
// ABOUTME: Carries identity, dependency links, policy flags, and per-pass state.

use std::collections::HashMap;

use crate::types::{ContainerId, ContainerName, ImageId};

/// Label marking the orchestrator's own container. It is never stopped,
/// only renamed out of the way during self-replacement.
pub const SELF_LABEL: &str = "dev.refit.self";

/// Label marking a container that is observed but never mutated.
pub const MONITOR_ONLY_LABEL: &str = "dev.refit.monitor-only";

/// Label listing the container names this container depends on at start
/// time, comma separated.
pub const DEPENDS_ON_LABEL: &str = "dev.refit.depends-on";

/// Everything the runtime client needs to recreate a container under its
/// original name after the old one is gone.
///
/// Captured at list time so the restart step never has to inspect a
/// container that has already been removed.
#[derive(Debug, Clone, Default)]
pub struct RestartSpec {
    /// Image reference (repository and tag) the container was created from.
    pub image: String,
    pub env: Vec<String>,
    pub command: Option<Vec<String>>,
    pub entrypoint: Option<Vec<String>>,
    pub labels: HashMap<String, String>,
    pub network_mode: Option<String>,
}

/// One container in the pass snapshot.
///
/// The record is immutable apart from the two per-pass flags: `stale` is
/// written exactly once by classification, `linked_to_restarting` by
/// dependency propagation.
#[derive(Debug, Clone)]
pub struct Container {
    pub id: ContainerId,
    pub name: ContainerName,
    /// Content identifier of the image currently backing the container.
    pub image_id: ImageId,
    /// Names of peer containers this one depends on at start time.
    pub links: Vec<ContainerName>,
    /// Observe-only policy flag from container metadata.
    pub monitor_only: bool,
    /// True iff this container hosts the orchestrator process itself.
    pub is_self: bool,
    /// Recreation configuration consumed by the restart step.
    pub spec: RestartSpec,

    /// Set by classification: the backing image differs from the freshly
    /// pulled one.
    pub stale: bool,
    /// Set by dependency propagation: a link target is restarting.
    pub linked_to_restarting: bool,
}

impl Container {
    pub fn new(id: ContainerId, name: ContainerName, image_id: ImageId, spec: RestartSpec) -> Self {
        Self {
            id,
            name,
            image_id,
            links: Vec::new(),
            monitor_only: false,
            is_self: false,
            spec,
            stale: false,
            linked_to_restarting: false,
        }
    }

    /// The predicate the restart driver acts on.
    pub fn to_restart(&self) -> bool {
        self.stale || self.linked_to_restarting
    }
}
