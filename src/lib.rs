//! # lokal
//!
//! **Declarative local PHP development environments.**
//!
//! This crate is the engine behind a local dev tool: it holds the declarative
//! description of an environment (sites, bind mounts, databases, machine
//! sizing), compiles desired changes into ordered remote commands, and
//! executes them against a live backend, either a hypervisor-managed VM or
//! running containers.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           lokal                                 │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌───────────────┐   mutate/query    ┌────────────────────┐     │
//! │  │  config::     │ ◄──────────────── │   caller (CLI,     │     │
//! │  │  Config       │                   │   reconciler)      │     │
//! │  └───────────────┘                   └─────────┬──────────┘     │
//! │                                                │ changed params │
//! │  ┌───────────────┐   builds          ┌─────────▼──────────┐     │
//! │  │  validate     │ ◄──────────────── │  action builders   │     │
//! │  └───────────────┘                   └─────────┬──────────┘     │
//! │                                                │ [Action]       │
//! │              ┌─────────────────────────────────┤                │
//! │              ▼                                 ▼                │
//! │  ┌───────────────────┐             ┌────────────────────┐       │
//! │  │ HypervisorRunner  │             │  ContainerRunner   │       │
//! │  │ (control CLI)     │             │  (docker exec)     │       │
//! │  └───────────────────┘             └─────────┬──────────┘       │
//! │                                              │ ContainerApi     │
//! │  ┌───────────────────────────────────────────▼──────────┐       │
//! │  │  backup: exec -> poll -> copy -> save (artifacts)    │       │
//! │  └──────────────────────────────────────────────────────┘       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Execution Model
//!
//! Actions run strictly in order, each blocking until it completes. The
//! first failure aborts the rest; nothing rolls back. Every provisioning
//! command is a convergent text substitution, so re-running the full
//! sequence is the recovery path. The config model is single-writer: one
//! process loads the YAML description, mutates it in memory, and rewrites
//! the whole file atomically.
//!
//! # Failure Policy
//!
//! - Validation failures never reach the backend.
//! - Removal and rename of config entries are strict (typed error on a
//!   missing target); lookups are lenient (`None`/`false`).
//! - The backup protocol releases its attached exec stream on every exit
//!   path and never leaves a partially written artifact.
//!
//! # Example
//!
//! ```rust,ignore
//! use lokal::{action, runner, Config, HypervisorRunner};
//!
//! #[tokio::main]
//! async fn main() -> lokal::Result<()> {
//!     let path = Config::default_path("dev")?;
//!     let mut config = Config::load(&path)?;
//!     config.set_php("7.4");
//!
//!     let actions = vec![
//!         action::php_memory_limit("lokal", "7.4", "256M")?,
//!         action::php_max_execution_time("lokal", "7.4", "120")?,
//!     ];
//!     runner::run_all(&HypervisorRunner::new("multipass"), &actions).await?;
//!
//!     config.save(&path)?;
//!     Ok(())
//! }
//! ```

pub mod action;
pub mod backup;
pub mod config;
pub mod constants;
pub mod docker;
pub mod environment;
pub mod error;
pub mod runner;
pub mod validate;

// Re-exports
pub use action::{Action, ActionKind};
pub use backup::{backup_container, backup_databases, BackupDialect, BackupOptions, BackupOutcome};
pub use config::{Config, Database, Mount, Site};
pub use docker::{
    BollardClient, ContainerApi, ContainerHandle, ContainerQuery, ContainerRole, ExecAttachment,
    ExecStatus,
};
pub use environment::stop_environment;
pub use error::{Error, Result};
pub use runner::{run_all, ContainerRunner, HypervisorRunner, Runner};
