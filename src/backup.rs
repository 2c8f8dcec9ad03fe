//! # Database Backup Protocol
//!
//! Runs a long-lived dump command inside a database container, waits for it
//! to complete, and retrieves the resulting file. This is the one place a
//! remote command produces an artifact that must come back to the host, so
//! it uses the exec/poll/copy protocol directly instead of the generic
//! [`crate::runner`].
//!
//! ## Protocol
//!
//! ```text
//! Created -> Attached+Started -> Running (bounded poll) -> Completed
//!         -> Copied -> Saved
//! ```
//!
//! The attached output stream is held for the duration of execution and
//! released on every exit path by drop. The completion wait polls at a fixed
//! interval and gives up with [`Error::Timeout`] after a maximum wait;
//! callers cancel by dropping the future, which also releases the
//! attachment. The artifact is buffered fully in memory and written via a
//! temp-file rename, so the destination file either does not exist or is
//! complete.

use crate::constants::{
    BACKUPS_DIR_NAME, DEFAULT_MAX_WAIT, DEFAULT_POLL_INTERVAL, HOME_DIR_NAME, REMOTE_SCRATCH_DIR,
};
use crate::docker::{ContainerApi, ContainerHandle, ContainerQuery, ContainerRole};
use crate::error::{Error, Result};
use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

// =============================================================================
// Dialects
// =============================================================================

/// The engine-specific command family used to produce a dump.
///
/// Selected from the database-compat label. An engine without a mapped
/// dialect is an explicit [`Error::UnsupportedEngine`]; a backup never
/// silently runs an empty command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupDialect {
    /// `pg_dump`-compatible engines.
    Postgres,
    /// `mysqldump`-compatible engines (MySQL, MariaDB).
    Mysql,
}

impl BackupDialect {
    /// Maps a database-compat label value to a dialect.
    #[must_use]
    pub fn from_compat_label(label: &str) -> Option<Self> {
        match label {
            "postgres" => Some(Self::Postgres),
            "mysql" => Some(Self::Mysql),
            _ => None,
        }
    }

    /// The dump command writing the artifact to `remote_path`.
    #[must_use]
    pub fn dump_command(self, remote_path: &str) -> Vec<String> {
        match self {
            Self::Postgres => vec![
                "pg_dump".into(),
                "-Ulokal".into(),
                "-f".into(),
                remote_path.into(),
            ],
            Self::Mysql => vec![
                "mysqldump".into(),
                "-ulokal".into(),
                "--all-databases".into(),
                format!("--result-file={remote_path}"),
            ],
        }
    }
}

// =============================================================================
// Options & Outcome
// =============================================================================

/// Tunables for the completion wait and artifact destination.
#[derive(Debug, Clone)]
pub struct BackupOptions {
    /// Interval between exec status polls.
    pub poll_interval: Duration,
    /// Maximum time to wait for the dump command before timing out.
    pub max_wait: Duration,
    /// Overrides the artifact base directory (defaults to
    /// `~/.lokal/backups`).
    pub base_dir: Option<PathBuf>,
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_wait: DEFAULT_MAX_WAIT,
            base_dir: None,
        }
    }
}

impl BackupOptions {
    fn resolve_base_dir(&self) -> Result<PathBuf> {
        if let Some(base) = &self.base_dir {
            return Ok(base.clone());
        }
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Validation("cannot determine the home directory".into()))?;
        Ok(home.join(HOME_DIR_NAME).join(BACKUPS_DIR_NAME))
    }
}

/// Where a retrieved backup landed.
#[derive(Debug, Clone)]
pub struct BackupOutcome {
    /// Name of the container the dump came from.
    pub container: String,
    /// Local path of the saved artifact.
    pub local_path: PathBuf,
}

// =============================================================================
// Protocol
// =============================================================================

/// Backs up every database container in the environment.
///
/// Containers are discovered by the typed environment/database query; an
/// empty result is [`Error::NoMatchingContainer`]. Each container's dialect
/// comes from its database-compat label.
pub async fn backup_databases(
    api: &dyn ContainerApi,
    environment: &str,
    options: &BackupOptions,
) -> Result<Vec<BackupOutcome>> {
    let query = ContainerQuery::environment(environment).with_role(ContainerRole::Database);
    let containers = api.list_containers(&query).await?;
    if containers.is_empty() {
        return Err(query.no_match_error());
    }

    let mut outcomes = Vec::with_capacity(containers.len());
    for container in &containers {
        outcomes.push(backup_container(api, environment, container, options).await?);
    }
    Ok(outcomes)
}

/// Runs the dump protocol against one database container.
pub async fn backup_container(
    api: &dyn ContainerApi,
    environment: &str,
    container: &ContainerHandle,
    options: &BackupOptions,
) -> Result<BackupOutcome> {
    let compat = container.database_compat().unwrap_or("unknown");
    let dialect = BackupDialect::from_compat_label(compat)
        .ok_or_else(|| Error::UnsupportedEngine(compat.to_string()))?;

    let artifact = format!("lokal-backup-{}.sql", chrono::Utc::now().timestamp());
    let remote_path = format!("{REMOTE_SCRATCH_DIR}/{artifact}");

    info!(container = %container.name, %artifact, "creating backup");

    // Created, then Attached+Started. The attachment stays alive for the
    // whole wait; any early return below releases it.
    let exec_id = api
        .create_exec(&container.id, dialect.dump_command(&remote_path))
        .await?;
    let attachment = api.start_exec(&exec_id).await?;

    let status = wait_for_completion(api, &exec_id, options).await?;
    drop(attachment);

    if let Some(code) = status.exit_code {
        if code != 0 {
            return Err(Error::Transport(format!(
                "dump command in '{}' exited with {code}",
                container.name
            )));
        }
    }

    // Completed -> Copied. The archive is buffered fully before any local
    // write, so a transport failure here leaves nothing on disk.
    let archive = api.copy_from_container(&container.id, &remote_path).await?;
    let content = extract_regular_file(&archive, &remote_path)?;

    // Saved.
    let backup_dir = options
        .resolve_base_dir()?
        .join(environment)
        .join(&container.name);
    fs::create_dir_all(&backup_dir)?;

    let local_path = backup_dir.join(&artifact);
    let temp_path = local_path.with_extension(format!("tmp.{}", uuid::Uuid::new_v4()));
    fs::write(&temp_path, &content)?;
    fs::rename(&temp_path, &local_path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        Error::Io(e)
    })?;

    info!(path = %local_path.display(), "backup saved");
    Ok(BackupOutcome {
        container: container.name.clone(),
        local_path,
    })
}

/// Polls the exec session until it stops running, at a fixed interval and
/// within a maximum wait.
async fn wait_for_completion(
    api: &dyn ContainerApi,
    exec_id: &str,
    options: &BackupOptions,
) -> Result<crate::docker::ExecStatus> {
    let started = Instant::now();
    loop {
        let status = api.inspect_exec(exec_id).await?;
        if !status.running {
            return Ok(status);
        }
        if started.elapsed() >= options.max_wait {
            return Err(Error::Timeout {
                operation: "waiting for dump command to complete".into(),
                duration: options.max_wait,
            });
        }
        debug!(exec_id, "dump still running");
        tokio::time::sleep(options.poll_interval).await;
    }
}

/// Pulls the single regular-file entry out of the copied archive.
///
/// The container runtime hands files back as a tar stream. Anything other
/// than a regular file first (a directory copy, an empty archive) is an
/// [`Error::InvalidArtifact`] and nothing is written locally.
fn extract_regular_file(archive: &[u8], remote_path: &str) -> Result<Vec<u8>> {
    let mut tar = tar::Archive::new(archive);
    let mut entries = tar.entries()?;

    let Some(entry) = entries.next() else {
        return Err(Error::InvalidArtifact {
            path: remote_path.to_string(),
        });
    };
    let mut entry = entry?;

    if !entry.header().entry_type().is_file() {
        return Err(Error::InvalidArtifact {
            path: remote_path.to_string(),
        });
    }

    let mut content = Vec::new();
    entry.read_to_end(&mut content)?;
    Ok(content)
}
