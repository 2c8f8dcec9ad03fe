//! Environment-wide container lifecycle operations.

use crate::docker::{ContainerApi, ContainerQuery};
use crate::error::{Error, Result};
use tracing::info;

/// Stops every container belonging to the environment, in the backend's
/// listing order. Returns the number of containers stopped.
///
/// An environment with no containers is not an error; there is nothing to
/// stop. A failure to stop one container aborts the remainder and carries
/// that container's name.
pub async fn stop_environment(api: &dyn ContainerApi, environment: &str) -> Result<usize> {
    let query = ContainerQuery::environment(environment);
    let containers = api.list_containers(&query).await?;

    if containers.is_empty() {
        info!(environment, "no containers running");
        return Ok(0);
    }

    info!(environment, count = containers.len(), "stopping environment");
    for container in &containers {
        info!(name = %container.name, "stopping container");
        api.stop_container(&container.id).await.map_err(|e| {
            Error::Transport(format!("unable to stop container '{}': {e}", container.name))
        })?;
    }

    Ok(containers.len())
}
