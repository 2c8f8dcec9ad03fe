//! # Container Backend
//!
//! The [`ContainerApi`] trait narrows the container runtime down to the
//! primitives the engine consumes: list containers by a typed label query,
//! drive an exec session (create, start-with-attach, inspect), stop a
//! container, and copy a file out of a container's filesystem. Nothing else
//! of the runtime's lifecycle API leaks past this seam, which keeps the
//! reconciliation and backup logic testable against an in-memory fake.
//!
//! [`BollardClient`] is the production implementation over the Docker Engine
//! API via `bollard`.

use crate::constants::{LABEL_DATABASE_COMPAT, LABEL_ENVIRONMENT, LABEL_ROLE};
use crate::error::{Error, Result};
use async_trait::async_trait;
use bollard::container::{
    DownloadFromContainerOptions, ListContainersOptions, StopContainerOptions,
};
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::Docker;
use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use std::collections::HashMap;
use std::pin::Pin;

// =============================================================================
// Typed Container Query
// =============================================================================

/// Role a container plays within an environment, mirrored in its role label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerRole {
    /// A database engine container.
    Database,
    /// A web/PHP-FPM container serving sites.
    Web,
    /// The reverse proxy fronting the sites.
    Proxy,
}

impl ContainerRole {
    /// The label value written for this role.
    #[must_use]
    pub fn as_label_value(self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::Web => "web",
            Self::Proxy => "proxy",
        }
    }
}

impl std::fmt::Display for ContainerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_label_value())
    }
}

/// A typed query over the environment's containers.
///
/// Replaces string-keyed label filters so a misspelled key is a compile
/// error, not an empty result.
#[derive(Debug, Clone)]
pub struct ContainerQuery {
    environment: String,
    role: Option<ContainerRole>,
}

impl ContainerQuery {
    /// Queries every container belonging to the environment.
    #[must_use]
    pub fn environment(name: impl Into<String>) -> Self {
        Self {
            environment: name.into(),
            role: None,
        }
    }

    /// Narrows the query to containers with the given role.
    #[must_use]
    pub fn with_role(mut self, role: ContainerRole) -> Self {
        self.role = Some(role);
        self
    }

    /// The environment name being queried.
    #[must_use]
    pub fn environment_name(&self) -> &str {
        &self.environment
    }

    /// The role filter, if any.
    #[must_use]
    pub fn role(&self) -> Option<ContainerRole> {
        self.role
    }

    /// Renders the query as Docker label filters.
    fn to_filters(&self) -> HashMap<String, Vec<String>> {
        let mut filters = HashMap::new();
        let mut labels = vec![format!("{LABEL_ENVIRONMENT}={}", self.environment)];
        if let Some(role) = self.role {
            labels.push(format!("{LABEL_ROLE}={role}"));
        }
        filters.insert("label".to_string(), labels);
        filters
    }

    /// An error describing an empty result for this query.
    pub(crate) fn no_match_error(&self) -> Error {
        Error::NoMatchingContainer {
            environment: self.environment.clone(),
            role: self
                .role
                .map_or_else(|| "any".to_string(), |r| r.to_string()),
        }
    }
}

// =============================================================================
// Backend Types
// =============================================================================

/// A container matched by a query.
#[derive(Debug, Clone)]
pub struct ContainerHandle {
    /// Runtime container ID.
    pub id: String,
    /// Container name, without the leading slash Docker reports.
    pub name: String,
    /// The container's labels.
    pub labels: HashMap<String, String>,
}

impl ContainerHandle {
    /// The database-compat label value, when present.
    #[must_use]
    pub fn database_compat(&self) -> Option<&str> {
        self.labels.get(LABEL_DATABASE_COMPAT).map(String::as_str)
    }
}

/// Snapshot of an exec session's completion state.
#[derive(Debug, Clone, Copy)]
pub struct ExecStatus {
    /// Whether the remote command is still running.
    pub running: bool,
    /// Exit code, once the command has finished.
    pub exit_code: Option<i64>,
}

/// The attached output stream of a started exec session.
///
/// Holding the attachment keeps the session's I/O open; dropping it releases
/// the attachment. Rust's drop semantics make the release deterministic on
/// every exit path, including errors and cancelled futures.
pub struct ExecAttachment {
    output: Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>,
}

impl ExecAttachment {
    /// Wraps a raw output stream.
    #[must_use]
    pub fn new(output: Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>) -> Self {
        Self { output }
    }

    /// Consumes the attachment, reading output to EOF.
    ///
    /// Reaching EOF on the attached stream is also a completion signal for
    /// the remote command; [`crate::runner::ContainerRunner`] relies on this
    /// before inspecting the exit code.
    pub async fn drain(mut self) -> Result<Vec<u8>> {
        let mut collected = Vec::new();
        while let Some(chunk) = self.output.next().await {
            collected.extend_from_slice(&chunk?);
        }
        Ok(collected)
    }
}

impl std::fmt::Debug for ExecAttachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecAttachment").finish_non_exhaustive()
    }
}

// =============================================================================
// ContainerApi Trait
// =============================================================================

/// The primitive container-runtime operations the engine consumes.
#[async_trait]
pub trait ContainerApi: Send + Sync {
    /// Lists containers matching the query, in the backend's order.
    async fn list_containers(&self, query: &ContainerQuery) -> Result<Vec<ContainerHandle>>;

    /// Creates an exec session in the container with stdout/stderr attachment
    /// requested, returning the session ID.
    async fn create_exec(&self, container_id: &str, cmd: Vec<String>) -> Result<String>;

    /// Starts the exec session, attaching to its output.
    async fn start_exec(&self, exec_id: &str) -> Result<ExecAttachment>;

    /// Inspects the exec session's completion state.
    async fn inspect_exec(&self, exec_id: &str) -> Result<ExecStatus>;

    /// Stops a running container.
    async fn stop_container(&self, container_id: &str) -> Result<()>;

    /// Copies a file out of the container as an archive byte stream, buffered
    /// fully in memory.
    async fn copy_from_container(&self, container_id: &str, path: &str) -> Result<Vec<u8>>;
}

// =============================================================================
// Bollard Implementation
// =============================================================================

/// Production [`ContainerApi`] over the Docker Engine API.
pub struct BollardClient {
    docker: Docker,
}

impl BollardClient {
    /// Connects using the standard Docker environment (socket or
    /// `DOCKER_HOST`).
    pub fn connect() -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| Error::Transport(e.to_string()))?;
        Ok(Self { docker })
    }

    /// Wraps an existing client.
    #[must_use]
    pub fn from_docker(docker: Docker) -> Self {
        Self { docker }
    }
}

#[async_trait]
impl ContainerApi for BollardClient {
    async fn list_containers(&self, query: &ContainerQuery) -> Result<Vec<ContainerHandle>> {
        let options = ListContainersOptions::<String> {
            all: true,
            filters: query.to_filters(),
            ..Default::default()
        };

        let summaries = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        Ok(summaries
            .into_iter()
            .map(|summary| ContainerHandle {
                id: summary.id.unwrap_or_default(),
                name: summary
                    .names
                    .unwrap_or_default()
                    .first()
                    .map(|n| n.trim_start_matches('/').to_string())
                    .unwrap_or_default(),
                labels: summary.labels.unwrap_or_default(),
            })
            .collect())
    }

    async fn create_exec(&self, container_id: &str, cmd: Vec<String>) -> Result<String> {
        let options = CreateExecOptions {
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            tty: Some(false),
            cmd: Some(cmd),
            ..Default::default()
        };

        let created = self
            .docker
            .create_exec(container_id, options)
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        Ok(created.id)
    }

    async fn start_exec(&self, exec_id: &str) -> Result<ExecAttachment> {
        let started = self
            .docker
            .start_exec(exec_id, None)
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        match started {
            StartExecResults::Attached { output, .. } => {
                let output = output
                    .map(|item| {
                        item.map(bollard::container::LogOutput::into_bytes)
                            .map_err(|e| Error::Transport(e.to_string()))
                    })
                    .boxed();
                Ok(ExecAttachment::new(output))
            }
            StartExecResults::Detached => Err(Error::Transport(
                "exec session started detached, expected an attached stream".into(),
            )),
        }
    }

    async fn inspect_exec(&self, exec_id: &str) -> Result<ExecStatus> {
        let inspected = self
            .docker
            .inspect_exec(exec_id)
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        Ok(ExecStatus {
            running: inspected.running.unwrap_or(false),
            exit_code: inspected.exit_code,
        })
    }

    async fn stop_container(&self, container_id: &str) -> Result<()> {
        self.docker
            .stop_container(container_id, None::<StopContainerOptions>)
            .await
            .map_err(|e| Error::Transport(e.to_string()))
    }

    async fn copy_from_container(&self, container_id: &str, path: &str) -> Result<Vec<u8>> {
        let stream = self.docker.download_from_container(
            container_id,
            Some(DownloadFromContainerOptions {
                path: path.to_string(),
            }),
        );
        futures::pin_mut!(stream);

        let mut buffer = Vec::new();
        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| Error::Transport(e.to_string()))?;
            buffer.extend_from_slice(&bytes);
        }
        Ok(buffer)
    }
}
