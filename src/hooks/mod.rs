// ABOUTME: Lifecycle hooks around the update pass and around each restart.
// ABOUTME: Discovers and executes shell scripts with container context in the environment.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

use crate::types::ContainerId;
use crate::update::Container;

/// Hook execution points in the update lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPoint {
    /// Before the pass examines any container. Failure logs a warning.
    PreCheck,
    /// Before a container is stopped. Failure skips that container.
    PreUpdate,
    /// After a replacement container started. Failure logs a warning.
    PostUpdate,
    /// After the pass completes. Failure logs a warning.
    PostCheck,
}

impl HookPoint {
    /// Get the hook filename for this point.
    pub fn filename(&self) -> &'static str {
        match self {
            HookPoint::PreCheck => "pre-check",
            HookPoint::PreUpdate => "pre-update",
            HookPoint::PostUpdate => "post-update",
            HookPoint::PostCheck => "post-check",
        }
    }
}

/// Context passed to hooks via environment variables.
#[derive(Debug, Clone, Default)]
pub struct HookContext {
    pub container: Option<String>,
    pub image: Option<String>,
    pub new_container_id: Option<String>,
}

impl HookContext {
    pub fn for_container(container: &Container) -> Self {
        Self {
            container: Some(container.name.to_string()),
            image: Some(container.spec.image.clone()),
            new_container_id: None,
        }
    }

    pub fn for_new_container(id: &ContainerId) -> Self {
        Self {
            container: None,
            image: None,
            new_container_id: Some(id.to_string()),
        }
    }

    /// Convert context to environment variables.
    pub fn to_env(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();
        if let Some(ref container) = self.container {
            env.insert("REFIT_CONTAINER".to_string(), container.clone());
        }
        if let Some(ref image) = self.image {
            env.insert("REFIT_IMAGE".to_string(), image.clone());
        }
        if let Some(ref id) = self.new_container_id {
            env.insert("REFIT_NEW_CONTAINER_ID".to_string(), id.clone());
        }
        env
    }
}

/// Captured streams of a hook script that exited successfully.
#[derive(Debug)]
pub struct HookOutput {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Error)]
pub enum HookError {
    #[error("{point} hook exited with code {code:?}: {stderr}")]
    Failed {
        point: &'static str,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{point} hook could not be executed: {source}")]
    Spawn {
        point: &'static str,
        source: std::io::Error,
    },
}

/// Lifecycle contract the restart driver calls into.
///
/// Only `pre_update` reports failure to the caller; the other points log
/// and swallow their own errors, matching how the driver treats them.
#[async_trait]
pub trait Lifecycle: Send + Sync {
    async fn pre_checks(&self);
    async fn pre_update(&self, container: &Container) -> Result<(), HookError>;
    async fn post_update(&self, new_container: &ContainerId);
    async fn post_checks(&self);
}

/// Discovers and runs hook scripts from a project directory.
pub struct HookRunner {
    hooks_dir: PathBuf,
}

impl HookRunner {
    /// Create a new hook runner looking for hooks in the given project directory.
    pub fn new(project_dir: &Path) -> Self {
        Self {
            hooks_dir: project_dir.join(".refit").join("hooks"),
        }
    }

    /// Check if a hook script exists for the given point.
    pub fn hook_exists(&self, point: HookPoint) -> bool {
        self.hooks_dir.join(point.filename()).is_file()
    }

    /// Run the hook for `point` if a script exists.
    ///
    /// A missing script is a successful no-op (`Ok(None)`). A script that
    /// cannot be spawned or exits non-zero is a `HookError`; the caller
    /// decides whether that is fatal for its hook point.
    pub async fn run(
        &self,
        point: HookPoint,
        context: &HookContext,
    ) -> Result<Option<HookOutput>, HookError> {
        let script = self.hooks_dir.join(point.filename());
        if !script.is_file() {
            tracing::debug!(hook = point.filename(), "no hook script, skipping");
            return Ok(None);
        }

        tracing::info!(hook = point.filename(), script = %script.display(), "running hook");

        let output = Command::new(&script)
            .envs(context.to_env())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| HookError::Spawn {
                point: point.filename(),
                source,
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(HookError::Failed {
                point: point.filename(),
                code: output.status.code(),
                stderr,
            });
        }

        tracing::debug!(hook = point.filename(), "hook completed");
        Ok(Some(HookOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr,
        }))
    }

    /// Run a hook whose failure must not alter pass control flow.
    async fn run_swallowing(&self, point: HookPoint, context: &HookContext) {
        if let Err(e) = self.run(point, context).await {
            tracing::warn!(hook = point.filename(), error = %e, "hook failed, continuing");
        }
    }
}

#[async_trait]
impl Lifecycle for HookRunner {
    async fn pre_checks(&self) {
        self.run_swallowing(HookPoint::PreCheck, &HookContext::default())
            .await;
    }

    async fn pre_update(&self, container: &Container) -> Result<(), HookError> {
        let context = HookContext::for_container(container);
        self.run(HookPoint::PreUpdate, &context).await.map(|_| ())
    }

    async fn post_update(&self, new_container: &ContainerId) {
        let context = HookContext::for_new_container(new_container);
        self.run_swallowing(HookPoint::PostUpdate, &context).await;
    }

    async fn post_checks(&self) {
        self.run_swallowing(HookPoint::PostCheck, &HookContext::default())
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hook_point_filenames() {
        assert_eq!(HookPoint::PreCheck.filename(), "pre-check");
        assert_eq!(HookPoint::PreUpdate.filename(), "pre-update");
        assert_eq!(HookPoint::PostUpdate.filename(), "post-update");
        assert_eq!(HookPoint::PostCheck.filename(), "post-check");
    }

    #[test]
    fn hook_context_to_env() {
        let context = HookContext {
            container: Some("web".to_string()),
            image: Some("registry.local/web:v2".to_string()),
            new_container_id: None,
        };

        let env = context.to_env();
        assert_eq!(env.get("REFIT_CONTAINER"), Some(&"web".to_string()));
        assert_eq!(
            env.get("REFIT_IMAGE"),
            Some(&"registry.local/web:v2".to_string())
        );
        assert!(!env.contains_key("REFIT_NEW_CONTAINER_ID"));
    }

    #[test]
    fn empty_context_exports_nothing() {
        assert!(HookContext::default().to_env().is_empty());
    }

    #[test]
    fn hook_runner_checks_hooks_dir() {
        let runner = HookRunner::new(Path::new("/nonexistent"));
        assert!(!runner.hook_exists(HookPoint::PreUpdate));
    }
}
