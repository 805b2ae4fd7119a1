// ABOUTME: Test support utilities.
// ABOUTME: Recording mock runtime client and lifecycle hooks for pass tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use refit::hooks::{HookError, Lifecycle};
use refit::runtime::{Client, ClientError, ContainerFilters};
use refit::types::{ContainerId, ContainerName, ImageId};
use refit::update::{Container, RestartSpec};

/// Build a snapshot container with deterministic IDs derived from the name.
#[allow(dead_code)]
pub fn container(name: &str) -> Container {
    Container::new(
        ContainerId::new(format!("{name}-id")),
        ContainerName::new(name).unwrap(),
        ImageId::new(format!("sha256:{name}-image")),
        RestartSpec {
            image: format!("registry.local/{name}:latest"),
            ..Default::default()
        },
    )
}

#[allow(dead_code)]
pub fn with_links(mut container: Container, links: &[&str]) -> Container {
    container.links = links
        .iter()
        .map(|l| ContainerName::new(l).unwrap())
        .collect();
    container
}

/// Every call the mock client receives, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCall {
    List,
    IsStale(String),
    VerifyConfiguration(String),
    Stop(String),
    Start(String),
    Rename(String, String),
    RemoveImage(String),
}

/// A canned runtime client that records the calls the pass makes.
#[derive(Default)]
pub struct MockClient {
    containers: Vec<Container>,
    stale: HashSet<String>,
    stale_errors: HashSet<String>,
    verify_errors: HashSet<String>,
    stop_errors: HashSet<String>,
    start_errors: HashSet<String>,
    rename_errors: HashSet<String>,
    remove_image_errors: HashSet<String>,
    list_error: bool,
    calls: Arc<Mutex<Vec<ClientCall>>>,
}

#[allow(dead_code)]
impl MockClient {
    pub fn new(containers: Vec<Container>) -> Self {
        Self {
            containers,
            ..Default::default()
        }
    }

    pub fn mark_stale(mut self, name: &str) -> Self {
        self.stale.insert(name.to_string());
        self
    }

    pub fn fail_stale_check(mut self, name: &str) -> Self {
        self.stale_errors.insert(name.to_string());
        self
    }

    pub fn fail_verify(mut self, name: &str) -> Self {
        self.verify_errors.insert(name.to_string());
        self
    }

    pub fn fail_stop(mut self, name: &str) -> Self {
        self.stop_errors.insert(name.to_string());
        self
    }

    pub fn fail_start(mut self, name: &str) -> Self {
        self.start_errors.insert(name.to_string());
        self
    }

    pub fn fail_rename(mut self, name: &str) -> Self {
        self.rename_errors.insert(name.to_string());
        self
    }

    pub fn fail_remove_image(mut self, image_id: &str) -> Self {
        self.remove_image_errors.insert(image_id.to_string());
        self
    }

    pub fn fail_list(mut self) -> Self {
        self.list_error = true;
        self
    }

    pub fn calls(&self) -> Vec<ClientCall> {
        self.calls.lock().unwrap().clone()
    }

    /// The stop/start/rename/remove calls in order, ignoring probes.
    pub fn mutations(&self) -> Vec<ClientCall> {
        self.calls()
            .into_iter()
            .filter(|c| {
                matches!(
                    c,
                    ClientCall::Stop(_)
                        | ClientCall::Start(_)
                        | ClientCall::Rename(_, _)
                        | ClientCall::RemoveImage(_)
                )
            })
            .collect()
    }

    pub fn removed_images(&self) -> HashSet<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ClientCall::RemoveImage(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: ClientCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Client for MockClient {
    async fn list_containers(
        &self,
        _filters: &ContainerFilters,
    ) -> Result<Vec<Container>, ClientError> {
        self.record(ClientCall::List);
        if self.list_error {
            return Err(ClientError::Runtime("daemon unreachable".to_string()));
        }
        Ok(self.containers.clone())
    }

    async fn is_container_stale(&self, container: &Container) -> Result<bool, ClientError> {
        let name = container.name.to_string();
        self.record(ClientCall::IsStale(name.clone()));
        if self.stale_errors.contains(&name) {
            return Err(ClientError::Runtime("staleness probe failed".to_string()));
        }
        Ok(self.stale.contains(&name))
    }

    async fn verify_configuration(&self, container: &Container) -> Result<(), ClientError> {
        let name = container.name.to_string();
        self.record(ClientCall::VerifyConfiguration(name.clone()));
        if self.verify_errors.contains(&name) {
            return Err(ClientError::InvalidConfig(
                "missing recreation config".to_string(),
            ));
        }
        Ok(())
    }

    async fn stop_container(
        &self,
        container: &Container,
        _timeout: Duration,
    ) -> Result<(), ClientError> {
        let name = container.name.to_string();
        self.record(ClientCall::Stop(name.clone()));
        if self.stop_errors.contains(&name) {
            return Err(ClientError::Runtime("stop failed".to_string()));
        }
        Ok(())
    }

    async fn start_container(&self, container: &Container) -> Result<ContainerId, ClientError> {
        let name = container.name.to_string();
        self.record(ClientCall::Start(name.clone()));
        if self.start_errors.contains(&name) {
            return Err(ClientError::Runtime("start failed".to_string()));
        }
        Ok(ContainerId::new(format!("{name}-replacement-id")))
    }

    async fn rename_container(
        &self,
        container: &Container,
        new_name: &str,
    ) -> Result<(), ClientError> {
        let name = container.name.to_string();
        self.record(ClientCall::Rename(name.clone(), new_name.to_string()));
        if self.rename_errors.contains(&name) {
            return Err(ClientError::AlreadyExists(new_name.to_string()));
        }
        Ok(())
    }

    async fn remove_image(&self, image: &ImageId) -> Result<(), ClientError> {
        let id = image.to_string();
        self.record(ClientCall::RemoveImage(id.clone()));
        if self.remove_image_errors.contains(&id) {
            return Err(ClientError::ImageNotFound(id));
        }
        Ok(())
    }
}

/// Every hook invocation the mock lifecycle receives, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookCall {
    PreChecks,
    PreUpdate(String),
    PostUpdate(String),
    PostChecks,
}

/// A canned lifecycle that records hook invocations.
#[derive(Default)]
pub struct MockLifecycle {
    pre_update_failures: HashSet<String>,
    calls: Arc<Mutex<Vec<HookCall>>>,
}

#[allow(dead_code)]
impl MockLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_pre_update(mut self, name: &str) -> Self {
        self.pre_update_failures.insert(name.to_string());
        self
    }

    pub fn calls(&self) -> Vec<HookCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Lifecycle for MockLifecycle {
    async fn pre_checks(&self) {
        self.calls.lock().unwrap().push(HookCall::PreChecks);
    }

    async fn pre_update(&self, container: &Container) -> Result<(), HookError> {
        let name = container.name.to_string();
        self.calls
            .lock()
            .unwrap()
            .push(HookCall::PreUpdate(name.clone()));
        if self.pre_update_failures.contains(&name) {
            return Err(HookError::Failed {
                point: "pre-update",
                code: Some(1),
                stderr: "refused".to_string(),
            });
        }
        Ok(())
    }

    async fn post_update(&self, new_container: &ContainerId) {
        self.calls
            .lock()
            .unwrap()
            .push(HookCall::PostUpdate(new_container.to_string()));
    }

    async fn post_checks(&self) {
        self.calls.lock().unwrap().push(HookCall::PostChecks);
    }
}
