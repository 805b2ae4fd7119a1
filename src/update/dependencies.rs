// ABOUTME: Restart-intent propagation across dependency links.
// ABOUTME: Runs over the sorted snapshot so one explicit hop becomes transitive.

use std::collections::HashMap;

use super::container::Container;

/// Mark containers that must restart because a link target is restarting.
///
/// The slice must already be dependency-sorted: link targets precede their
/// dependents, so by the time a dependent is examined its targets carry
/// their final restart intent and one lookup per link suffices.
pub fn mark_linked_restarts(containers: &mut [Container]) {
    let mut restarting: HashMap<String, bool> = containers
        .iter()
        .map(|c| (c.name.as_str().to_string(), c.to_restart()))
        .collect();

    for container in containers.iter_mut() {
        if container.stale {
            continue;
        }

        for link in &container.links {
            if restarting.get(link.as_str()).copied().unwrap_or(false) {
                container.linked_to_restarting = true;
                restarting.insert(container.name.as_str().to_string(), true);
                tracing::debug!(
                    container = %container.name,
                    link = %link,
                    "restarting because a linked container is restarting"
                );
                break;
            }
        }
    }
}
