// ABOUTME: Docker-backed implementation of the runtime client contract.
// ABOUTME: Staleness probe pulls the (possibly tag-overridden) reference and compares image IDs.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use bollard::models::{ContainerCreateBody, HostConfig};
use bollard::query_parameters::{
    CreateContainerOptions, CreateImageOptions, InspectContainerOptions, ListContainersOptions,
    RemoveContainerOptions, RemoveImageOptions, RenameContainerOptions, StartContainerOptions,
    StopContainerOptions,
};
use bollard::Docker;
use futures::StreamExt;

use super::client::{Client, ClientError, ContainerFilters};
use crate::types::{ContainerId, ContainerName, ImageId};
use crate::update::{
    Container, RestartSpec, DEPENDS_ON_LABEL, MONITOR_ONLY_LABEL, SELF_LABEL,
};

pub const DEFAULT_SOCKET: &str = "/var/run/docker.sock";

// =============================================================================
// Error Mapping Helpers
// =============================================================================

fn map_container_error(e: bollard::errors::Error) -> ClientError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ClientError::NotFound(message.clone()),
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 409 => ClientError::AlreadyExists(message.clone()),
        _ => ClientError::Runtime(e.to_string()),
    }
}

fn map_image_error(e: bollard::errors::Error, image_name: &str) -> ClientError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ClientError::ImageNotFound(message.clone()),
        _ => ClientError::Runtime(format!("{}: {}", image_name, e)),
    }
}

/// Replace the tag of an image reference, leaving registry ports alone.
fn apply_tag(reference: &str, tag: &str) -> String {
    let split_at = reference
        .rfind(':')
        .filter(|&i| i > reference.rfind('/').unwrap_or(0));
    let repository = match split_at {
        Some(i) => &reference[..i],
        None => reference,
    };
    format!("{repository}:{tag}")
}

// =============================================================================
// DockerClient
// =============================================================================

/// Runtime client talking to a Docker-compatible daemon over the local
/// Unix socket.
pub struct DockerClient {
    client: Docker,
    /// Per-container tag overrides supplied by the trigger endpoint,
    /// applied when resolving the comparison reference during the
    /// staleness probe.
    tag_overrides: RwLock<HashMap<String, String>>,
}

impl DockerClient {
    pub fn new(client: Docker) -> Self {
        Self {
            client,
            tag_overrides: RwLock::new(HashMap::new()),
        }
    }

    /// Connect to the daemon socket.
    pub fn connect(socket_path: &str) -> Result<Self, ClientError> {
        let client = Docker::connect_with_unix(socket_path, 120, bollard::API_DEFAULT_VERSION)
            .map_err(|e| ClientError::Runtime(format!("failed to connect to daemon: {e}")))?;
        Ok(Self::new(client))
    }

    /// Replace the tag overrides for the next pass.
    pub fn set_tag_overrides(&self, overrides: HashMap<String, String>) {
        *self
            .tag_overrides
            .write()
            .expect("tag override lock never poisoned") = overrides;
    }

    /// The reference the staleness probe compares against: the container's
    /// own image reference, retagged if the trigger supplied an override
    /// for this container.
    fn comparison_reference(&self, container: &Container) -> String {
        let overrides = self
            .tag_overrides
            .read()
            .expect("tag override lock never poisoned");
        match overrides.get(container.name.as_str()) {
            Some(tag) if !tag.is_empty() => apply_tag(&container.spec.image, tag),
            _ => container.spec.image.clone(),
        }
    }

    async fn pull_image(&self, reference: &str) -> Result<(), ClientError> {
        let opts = CreateImageOptions {
            from_image: Some(reference.to_string()),
            ..Default::default()
        };

        // Pull returns a stream of progress updates - consume it.
        let mut stream = self.client.create_image(Some(opts), None, None);
        while let Some(result) = stream.next().await {
            result.map_err(|e| ClientError::PullFailed(format!("{}: {}", reference, e)))?;
        }

        Ok(())
    }

    async fn snapshot_container(&self, id: &str) -> Result<Container, ClientError> {
        let details = self
            .client
            .inspect_container(id, None::<InspectContainerOptions>)
            .await
            .map_err(map_container_error)?;

        let name_raw = details.name.unwrap_or_default();
        let name = ContainerName::new(name_raw.trim_start_matches('/'))
            .map_err(|e| ClientError::Runtime(format!("unusable container name: {e}")))?;

        let image_id = ImageId::new(details.image.unwrap_or_default());

        let config = details.config.unwrap_or_default();
        let labels = config.labels.unwrap_or_default();

        let spec = RestartSpec {
            image: config.image.unwrap_or_default(),
            env: config.env.unwrap_or_default(),
            command: config.cmd,
            entrypoint: config.entrypoint,
            labels: labels.clone(),
            network_mode: details.host_config.and_then(|hc| hc.network_mode),
        };

        let mut container = Container::new(ContainerId::new(id.to_string()), name, image_id, spec);

        container.monitor_only = label_is_true(&labels, MONITOR_ONLY_LABEL);
        container.is_self = label_is_true(&labels, SELF_LABEL);
        container.links = parse_links(&labels, &container.name);

        Ok(container)
    }
}

fn label_is_true(labels: &HashMap<String, String>, key: &str) -> bool {
    labels.get(key).map(|v| v == "true").unwrap_or(false)
}

fn parse_links(labels: &HashMap<String, String>, owner: &ContainerName) -> Vec<ContainerName> {
    let Some(raw) = labels.get(DEPENDS_ON_LABEL) else {
        return Vec::new();
    };

    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match ContainerName::new(s) {
            Ok(name) => Some(name),
            Err(e) => {
                tracing::warn!(
                    container = %owner,
                    link = s,
                    error = %e,
                    "ignoring malformed dependency link"
                );
                None
            }
        })
        .collect()
}

#[async_trait]
impl Client for DockerClient {
    async fn list_containers(
        &self,
        filters: &ContainerFilters,
    ) -> Result<Vec<Container>, ClientError> {
        let mut filter_map: HashMap<String, Vec<String>> = HashMap::new();

        if let Some(ref name) = filters.name {
            filter_map.insert("name".to_string(), vec![name.clone()]);
        }

        for (key, value) in &filters.labels {
            filter_map
                .entry("label".to_string())
                .or_default()
                .push(format!("{}={}", key, value));
        }

        let opts = ListContainersOptions {
            all: false,
            filters: Some(filter_map),
            ..Default::default()
        };

        let summaries = self
            .client
            .list_containers(Some(opts))
            .await
            .map_err(map_container_error)?;

        let mut containers = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let id = summary.id.unwrap_or_default();
            if id.is_empty() {
                continue;
            }
            containers.push(self.snapshot_container(&id).await?);
        }

        Ok(containers)
    }

    async fn is_container_stale(&self, container: &Container) -> Result<bool, ClientError> {
        let reference = self.comparison_reference(container);
        if reference.is_empty() {
            return Err(ClientError::InvalidConfig(format!(
                "container {} has no image reference",
                container.name
            )));
        }

        self.pull_image(&reference).await?;

        let latest = self
            .client
            .inspect_image(&reference)
            .await
            .map_err(|e| map_image_error(e, &reference))?;

        let latest_id = latest
            .id
            .ok_or_else(|| ClientError::Runtime(format!("image {} has no id", reference)))?;

        let stale = latest_id != container.image_id.as_str();
        if stale {
            tracing::info!(
                container = %container.name,
                image = %reference,
                current = %container.image_id.short(),
                latest = %ImageId::new(latest_id).short(),
                "found new image for container"
            );
        }
        Ok(stale)
    }

    async fn verify_configuration(&self, container: &Container) -> Result<(), ClientError> {
        if container.spec.image.is_empty() {
            return Err(ClientError::InvalidConfig(format!(
                "container {} has no image reference to recreate from",
                container.name
            )));
        }
        if container.image_id.as_str().is_empty() {
            return Err(ClientError::InvalidConfig(format!(
                "container {} has no image id",
                container.name
            )));
        }
        Ok(())
    }

    async fn stop_container(
        &self,
        container: &Container,
        timeout: Duration,
    ) -> Result<(), ClientError> {
        let opts = StopContainerOptions {
            t: Some(timeout.as_secs() as i32),
            signal: None,
        };

        match self
            .client
            .stop_container(container.id.as_str(), Some(opts))
            .await
        {
            Ok(()) => {}
            // 304: already stopped, which is fine - we still want it gone.
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 304, ..
            }) => {}
            Err(e) => return Err(map_container_error(e)),
        }

        // Remove the stopped container so the replacement can adopt its name.
        let opts = RemoveContainerOptions {
            force: false,
            ..Default::default()
        };

        self.client
            .remove_container(container.id.as_str(), Some(opts))
            .await
            .map_err(map_container_error)
    }

    async fn start_container(&self, container: &Container) -> Result<ContainerId, ClientError> {
        let reference = self.comparison_reference(container);
        let spec = &container.spec;

        let host_config = HostConfig {
            network_mode: spec.network_mode.clone(),
            ..Default::default()
        };

        let body = ContainerCreateBody {
            image: Some(reference),
            env: if spec.env.is_empty() {
                None
            } else {
                Some(spec.env.clone())
            },
            cmd: spec.command.clone(),
            entrypoint: spec.entrypoint.clone(),
            labels: if spec.labels.is_empty() {
                None
            } else {
                Some(spec.labels.clone())
            },
            host_config: Some(host_config),
            ..Default::default()
        };

        let opts = CreateContainerOptions {
            name: Some(container.name.to_string()),
            ..Default::default()
        };

        let response = self
            .client
            .create_container(Some(opts), body)
            .await
            .map_err(map_container_error)?;

        self.client
            .start_container(&response.id, None::<StartContainerOptions>)
            .await
            .map_err(map_container_error)?;

        Ok(ContainerId::new(response.id))
    }

    async fn rename_container(
        &self,
        container: &Container,
        new_name: &str,
    ) -> Result<(), ClientError> {
        self.client
            .rename_container(
                container.id.as_str(),
                RenameContainerOptions {
                    name: new_name.to_string(),
                },
            )
            .await
            .map_err(map_container_error)
    }

    async fn remove_image(&self, image: &ImageId) -> Result<(), ClientError> {
        let opts = RemoveImageOptions {
            force: false,
            ..Default::default()
        };

        self.client
            .remove_image(image.as_str(), Some(opts), None)
            .await
            .map_err(|e| map_image_error(e, image.as_str()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_tag_replaces_existing_tag() {
        assert_eq!(apply_tag("registry.local/app:v1", "v2"), "registry.local/app:v2");
    }

    #[test]
    fn apply_tag_appends_when_untagged() {
        assert_eq!(apply_tag("registry.local/app", "v2"), "registry.local/app:v2");
    }

    #[test]
    fn apply_tag_keeps_registry_port() {
        assert_eq!(
            apply_tag("registry.local:5000/app", "v2"),
            "registry.local:5000/app:v2"
        );
        assert_eq!(
            apply_tag("registry.local:5000/app:v1", "v2"),
            "registry.local:5000/app:v2"
        );
    }

    #[test]
    fn parse_links_splits_and_trims() {
        let owner = ContainerName::new("web").unwrap();
        let mut labels = HashMap::new();
        labels.insert(DEPENDS_ON_LABEL.to_string(), "db, cache ,".to_string());

        let links = parse_links(&labels, &owner);
        let links: Vec<&str> = links.iter().map(ContainerName::as_str).collect();
        assert_eq!(links, vec!["db", "cache"]);
    }

    #[test]
    fn parse_links_skips_malformed_names() {
        let owner = ContainerName::new("web").unwrap();
        let mut labels = HashMap::new();
        labels.insert(DEPENDS_ON_LABEL.to_string(), "db,-bad,cache".to_string());

        let links = parse_links(&labels, &owner);
        assert_eq!(links.len(), 2);
    }

    #[test]
    fn label_flags_require_exact_true() {
        let mut labels = HashMap::new();
        labels.insert(MONITOR_ONLY_LABEL.to_string(), "yes".to_string());
        assert!(!label_is_true(&labels, MONITOR_ONLY_LABEL));

        labels.insert(MONITOR_ONLY_LABEL.to_string(), "true".to_string());
        assert!(label_is_true(&labels, MONITOR_ONLY_LABEL));
    }
}
