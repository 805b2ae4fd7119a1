// ABOUTME: Template generation for `refit init`.
// ABOUTME: Writes a commented refit.yml into the target directory.

use std::path::Path;

use crate::error::{Error, Result};

use super::CONFIG_FILENAME;

const TEMPLATE: &str = "\
# refit configuration
# The values shown are the defaults.

# Daemon socket the runtime client connects to.
socket: /var/run/docker.sock

# How long a container gets to stop gracefully before it is killed.
timeout: 10s

# Remove replaced images after a pass.
cleanup: false

# Stop and restart each container in turn instead of stopping everything
# first and then restarting in dependency order.
rolling_restart: false

# Observe only: report stale containers without restarting them.
monitor_only: false

# Classify only: skip all stop/start side effects.
no_restart: false

# Run hook scripts from .refit/hooks/ around the pass and around each
# restart (pre-check, pre-update, post-update, post-check).
lifecycle_hooks: false

# Address `refit serve` binds the trigger endpoint to.
listen: 127.0.0.1:8080

# Restrict passes to matching containers:
#filter:
#  name: web
#  labels:
#    dev.refit.scope: prod
";

/// Write a template refit.yml into `dir`.
///
/// Refuses to overwrite an existing file unless `force` is set.
pub fn init_config(dir: &Path, force: bool) -> Result<()> {
    let path = dir.join(CONFIG_FILENAME);

    if path.exists() && !force {
        return Err(Error::AlreadyExists(path));
    }

    std::fs::write(&path, TEMPLATE)?;
    tracing::info!(path = %path.display(), "wrote configuration template");
    Ok(())
}
