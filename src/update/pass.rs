// ABOUTME: The update pass: classify, sort, propagate, restart, close out the metric.
// ABOUTME: Two-phase and rolling strategies with self-replacement and image cleanup.

use std::collections::HashSet;

use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{debug, error, info};

use super::container::Container;
use super::dependencies::mark_linked_restarts;
use super::error::UpdateError;
use super::metrics::{Metric, PassCounters};
use super::params::UpdateParams;
use super::sorter::sort_by_dependencies;
use crate::hooks::Lifecycle;
use crate::runtime::Client;
use crate::types::{ContainerName, ImageId};

/// Which step of a container's restart went wrong. The detail is logged at
/// the failure site; callers only count.
enum StepError {
    PreUpdateHook,
    Stop,
    Start,
}

/// Whether the restart step got as far as asking the runtime for a start.
/// Image cleanup collects only containers whose start was attempted.
enum StartAttempt {
    Attempted,
    Skipped,
}

/// Run one update pass: find containers backed by stale images and restart
/// them against the freshly pulled image in dependency-safe order.
///
/// Only listing and sorting failures abort the pass; everything else is
/// recovered into the metric's `failed` counter.
pub async fn update<C, H>(
    client: &C,
    hooks: &H,
    params: &UpdateParams,
) -> Result<Metric, UpdateError>
where
    C: Client + ?Sized,
    H: Lifecycle + ?Sized,
{
    debug!("checking containers for updated images");
    let mut counters = PassCounters::new();

    if params.lifecycle_hooks {
        hooks.pre_checks().await;
    }

    let mut containers = client
        .list_containers(&params.filter)
        .await
        .map_err(UpdateError::List)?;

    for container in &mut containers {
        let outcome = match client.is_container_stale(container).await {
            Ok(stale) => {
                let should_update = stale
                    && !params.no_restart
                    && !params.monitor_only
                    && !container.monitor_only;
                if should_update {
                    // Make sure we have everything needed to recreate it
                    // before we tear the old one down.
                    client.verify_configuration(container).await.map(|()| stale)
                } else {
                    Ok(stale)
                }
            }
            Err(e) => Err(e),
        };

        let stale = match outcome {
            Ok(stale) => stale,
            Err(e) => {
                info!(
                    container = %container.name,
                    error = %e,
                    "unable to update container, proceeding to next"
                );
                counters.record_classification_failure();
                false
            }
        };

        container.stale = stale;
        if stale {
            counters.record_stale();
        }
    }

    let mut containers = sort_by_dependencies(containers)?;
    let scanned = containers.len();

    mark_linked_restarts(&mut containers);
    let linked = containers.iter().filter(|c| c.linked_to_restarting).count();
    counters.record_linked_restarts(linked);

    let to_update: Vec<Container> = if params.monitor_only {
        Vec::new()
    } else {
        containers.into_iter().filter(|c| !c.monitor_only).collect()
    };

    let restart_failures = if params.rolling_restart {
        rolling_restart(&to_update, client, hooks, params).await
    } else {
        two_phase_restart(&to_update, client, hooks, params).await
    };
    counters.add_restart_failures(restart_failures);

    let metric = counters.into_metric(scanned);

    if params.lifecycle_hooks {
        hooks.post_checks().await;
    }

    Ok(metric)
}

/// Stop and immediately restart each restart-eligible container, walking the
/// sorted snapshot in reverse so dependents cycle before their dependencies.
async fn rolling_restart<C, H>(
    containers: &[Container],
    client: &C,
    hooks: &H,
    params: &UpdateParams,
) -> usize
where
    C: Client + ?Sized,
    H: Lifecycle + ?Sized,
{
    let mut cleanup_ids: HashSet<ImageId> = HashSet::new();
    let mut failed = 0;

    for container in containers.iter().rev() {
        if !container.to_restart() {
            continue;
        }
        if stop_for_update(container, client, hooks, params)
            .await
            .is_err()
        {
            // A failed stop ends this container's pass; do not try to
            // start a replacement next to the old one.
            failed += 1;
            continue;
        }
        match restart_for_update(container, client, hooks, params).await {
            Ok(StartAttempt::Attempted) => {
                cleanup_ids.insert(container.image_id.clone());
            }
            Ok(StartAttempt::Skipped) => {}
            Err(_) => {
                failed += 1;
                cleanup_ids.insert(container.image_id.clone());
            }
        }
    }

    if params.cleanup {
        cleanup_images(client, &cleanup_ids).await;
    }
    failed
}

/// Stop everything first (reverse sorted order), then restart (forward
/// sorted order), so dependents stop before their dependencies and start
/// after them.
async fn two_phase_restart<C, H>(
    containers: &[Container],
    client: &C,
    hooks: &H,
    params: &UpdateParams,
) -> usize
where
    C: Client + ?Sized,
    H: Lifecycle + ?Sized,
{
    let mut failed = 0;
    let mut stop_failed: HashSet<ContainerName> = HashSet::new();

    for container in containers.iter().rev() {
        if stop_for_update(container, client, hooks, params)
            .await
            .is_err()
        {
            failed += 1;
            stop_failed.insert(container.name.clone());
        }
    }

    let mut image_ids: HashSet<ImageId> = HashSet::new();
    for container in containers {
        if !container.to_restart() || stop_failed.contains(&container.name) {
            continue;
        }
        match restart_for_update(container, client, hooks, params).await {
            Ok(StartAttempt::Attempted) => {
                image_ids.insert(container.image_id.clone());
            }
            Ok(StartAttempt::Skipped) => {}
            Err(_) => {
                failed += 1;
                image_ids.insert(container.image_id.clone());
            }
        }
    }

    if params.cleanup {
        cleanup_images(client, &image_ids).await;
    }
    failed
}

async fn stop_for_update<C, H>(
    container: &Container,
    client: &C,
    hooks: &H,
    params: &UpdateParams,
) -> Result<(), StepError>
where
    C: Client + ?Sized,
    H: Lifecycle + ?Sized,
{
    if container.is_self {
        debug!(container = %container.name, "not stopping own container");
        return Ok(());
    }

    if !container.to_restart() || params.no_restart {
        return Ok(());
    }

    if params.lifecycle_hooks {
        if let Err(e) = hooks.pre_update(container).await {
            error!(container = %container.name, error = %e, "pre-update hook failed");
            info!(container = %container.name, "skipping container, pre-update hook failed");
            return Err(StepError::PreUpdateHook);
        }
    }

    info!(container = %container.name, "stopping container");
    if let Err(e) = client.stop_container(container, params.timeout).await {
        error!(container = %container.name, error = %e, "failed to stop container");
        return Err(StepError::Stop);
    }
    Ok(())
}

async fn restart_for_update<C, H>(
    container: &Container,
    client: &C,
    hooks: &H,
    params: &UpdateParams,
) -> Result<StartAttempt, StepError>
where
    C: Client + ?Sized,
    H: Lifecycle + ?Sized,
{
    // The orchestrator cannot stop itself mid-pass, so the replacement is
    // started while the old instance keeps running. Rename the old one
    // first so the replacement can adopt its name.
    if container.is_self {
        let parking_name = random_name();
        if let Err(e) = client.rename_container(container, &parking_name).await {
            error!(
                container = %container.name,
                error = %e,
                "failed to rename own container, abandoning self-replacement"
            );
            return Ok(StartAttempt::Skipped);
        }
        debug!(
            container = %container.name,
            new_name = %parking_name,
            "renamed own container out of the way"
        );
    }

    if params.no_restart {
        return Ok(StartAttempt::Skipped);
    }

    match client.start_container(container).await {
        Ok(new_id) => {
            info!(
                container = %container.name,
                id = %new_id.short(),
                "started replacement container"
            );
            if container.to_restart() && params.lifecycle_hooks {
                hooks.post_update(&new_id).await;
            }
            Ok(StartAttempt::Attempted)
        }
        Err(e) => {
            error!(
                container = %container.name,
                error = %e,
                "failed to start replacement container"
            );
            Err(StepError::Start)
        }
    }
}

async fn cleanup_images<C>(client: &C, image_ids: &HashSet<ImageId>)
where
    C: Client + ?Sized,
{
    for image_id in image_ids {
        info!(image = %image_id.short(), "removing replaced image");
        if let Err(e) = client.remove_image(image_id).await {
            error!(image = %image_id.short(), error = %e, "failed to remove image");
        }
    }
}

/// A random name the renamed self-container parks under while the
/// replacement adopts the original one.
fn random_name() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect();
    format!("refit-old-{suffix}")
}
