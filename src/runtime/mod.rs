// ABOUTME: Runtime-client seam between the update pass and the container daemon.
// ABOUTME: Trait contract plus the bollard-backed Docker implementation.

mod bollard;
mod client;

pub use bollard::{DockerClient, DEFAULT_SOCKET};
pub use client::{Client, ClientError, ContainerFilters};
