//! # Action Runners
//!
//! Executes an ordered list of [`Action`]s against a backend. Execution is
//! strictly sequential: each action blocks until it completes, the first
//! failure aborts the remainder, and nothing is rolled back. Provisioning
//! commands are convergent text substitutions, so the recovery mechanism is
//! simply re-running the full sequence.
//!
//! Two strategies share the [`Runner`] contract:
//!
//! - [`HypervisorRunner`] spawns a local hypervisor control CLI per action
//!   and treats a non-zero exit as failure.
//! - [`ContainerRunner`] drives a container exec session per action over
//!   [`ContainerApi`] and treats a non-zero exit or transport error as
//!   failure.

use crate::action::{Action, ActionKind};
use crate::docker::ContainerApi;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Executes a single action against a backend.
#[async_trait]
pub trait Runner: Send + Sync {
    /// Runs one action to completion.
    async fn run(&self, action: &Action) -> Result<()>;
}

/// Runs each action in order, stopping at the first failure.
///
/// The failing step's error is wrapped as [`Error::ActionFailed`] carrying
/// the zero-based index and the command for context. Actions after the
/// failure are never executed.
pub async fn run_all(runner: &dyn Runner, actions: &[Action]) -> Result<()> {
    for (index, action) in actions.iter().enumerate() {
        debug!(index, target = action.target(), "running action");
        if let Err(err) = runner.run(action).await {
            return Err(Error::ActionFailed {
                index,
                command: action.args().join(" "),
                reason: err.to_string(),
            });
        }
    }
    Ok(())
}

// =============================================================================
// Hypervisor Strategy
// =============================================================================

/// Runs actions through a local hypervisor control CLI (multipass-style).
///
/// The tool's exit code is the only observed contract: zero is success,
/// anything else is a transport failure carrying the captured stderr.
pub struct HypervisorRunner {
    binary: String,
}

impl HypervisorRunner {
    /// Creates a runner invoking the given control binary.
    #[must_use]
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Builds the full argument vector handed to the control binary.
    fn argv(action: &Action) -> Vec<String> {
        match action.kind() {
            ActionKind::Exec => {
                let mut argv = vec![
                    "exec".to_string(),
                    action.target().to_string(),
                    "--".to_string(),
                ];
                argv.extend_from_slice(action.args());
                argv
            }
            ActionKind::Restart => vec!["restart".to_string(), action.target().to_string()],
        }
    }
}

#[async_trait]
impl Runner for HypervisorRunner {
    async fn run(&self, action: &Action) -> Result<()> {
        let argv = Self::argv(action);
        let output = tokio::process::Command::new(&self.binary)
            .args(&argv)
            .output()
            .await
            .map_err(|e| Error::Transport(format!("failed to spawn '{}': {e}", self.binary)))?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(Error::Transport(format!(
            "'{} {}' exited with {}: {}",
            self.binary,
            argv.join(" "),
            output.status,
            stderr.trim()
        )))
    }
}

// =============================================================================
// Container Strategy
// =============================================================================

/// Runs actions inside a container via exec sessions.
///
/// Each action becomes one exec session: create, start with stdout/stderr
/// attached, drain the output to EOF, then inspect the exit code. Restart
/// actions are a machine-level concern and are rejected on this strategy.
pub struct ContainerRunner {
    api: Arc<dyn ContainerApi>,
}

impl ContainerRunner {
    /// Creates a runner executing against the given backend.
    #[must_use]
    pub fn new(api: Arc<dyn ContainerApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Runner for ContainerRunner {
    async fn run(&self, action: &Action) -> Result<()> {
        if action.kind() != ActionKind::Exec {
            return Err(Error::Transport(format!(
                "{:?} actions are not supported on the container strategy",
                action.kind()
            )));
        }

        let exec_id = self
            .api
            .create_exec(action.target(), action.args().to_vec())
            .await?;
        let attachment = self.api.start_exec(&exec_id).await?;

        // EOF on the attached stream means the command has finished.
        let output = attachment.drain().await?;
        let status = self.api.inspect_exec(&exec_id).await?;

        match status.exit_code {
            Some(0) | None if !status.running => {
                info!(target = action.target(), "action completed");
                Ok(())
            }
            Some(code) if !status.running => Err(Error::Transport(format!(
                "remote command exited with {code}: {}",
                String::from_utf8_lossy(&output).trim()
            ))),
            _ => Err(Error::Transport(
                "exec session still running after its output closed".into(),
            )),
        }
    }
}
