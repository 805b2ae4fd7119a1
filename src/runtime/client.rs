// ABOUTME: Runtime-client contract the update pass is written against.
// ABOUTME: Listing, staleness probing, and container lifecycle operations.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{ContainerId, ImageId};
use crate::update::Container;

/// Filters for the list operation. Opaque to the update pass; the client
/// decides how to interpret them.
#[derive(Debug, Clone, Default)]
pub struct ContainerFilters {
    /// Filter by label (key=value).
    pub labels: HashMap<String, String>,
    /// Filter by name (supports partial match).
    pub name: Option<String>,
}

/// Errors from runtime-client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("container not found: {0}")]
    NotFound(String),

    #[error("container name already taken: {0}")]
    AlreadyExists(String),

    #[error("image not found: {0}")]
    ImageNotFound(String),

    #[error("image pull failed: {0}")]
    PullFailed(String),

    #[error("incomplete recreation configuration: {0}")]
    InvalidConfig(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Operations the update pass needs from a container runtime.
///
/// The pass calls these sequentially; implementations do not need to be
/// safe against overlapping passes (the trigger gate serialises those).
#[async_trait]
pub trait Client: Send + Sync {
    /// Snapshot the running containers matching the filters.
    async fn list_containers(
        &self,
        filters: &ContainerFilters,
    ) -> Result<Vec<Container>, ClientError>;

    /// Probe whether the container's backing image is stale. Implementations
    /// pull the container's image reference first, so a `true` answer means
    /// a fresher image is already present on the host.
    async fn is_container_stale(&self, container: &Container) -> Result<bool, ClientError>;

    /// Check the container's recreation configuration is sufficient to
    /// restart it.
    async fn verify_configuration(&self, container: &Container) -> Result<(), ClientError>;

    /// Stop the container, waiting up to `timeout` for a graceful exit, and
    /// free its name for the replacement.
    async fn stop_container(
        &self,
        container: &Container,
        timeout: Duration,
    ) -> Result<(), ClientError>;

    /// Start a fresh container from the recorded recreation configuration
    /// under the original name.
    async fn start_container(&self, container: &Container) -> Result<ContainerId, ClientError>;

    /// Rename a running container. Used only for self-replacement.
    async fn rename_container(
        &self,
        container: &Container,
        new_name: &str,
    ) -> Result<(), ClientError>;

    /// Remove an image by its content identifier.
    async fn remove_image(&self, image: &ImageId) -> Result<(), ClientError>;
}
