//! # Environment Engine Constants
//!
//! Label vocabulary, filesystem layout, and protocol bounds shared across the
//! crate. These are the single source of truth; modules reference them rather
//! than repeating literals.
//!
//! ## Cross-References
//!
//! - [`crate::docker`]: Uses the label keys for container queries
//! - [`crate::backup`]: Uses the backup layout and poll bounds
//! - [`crate::validate`]: Uses the PHP version allow-list and limit caps
//! - [`crate::config`]: Uses the sites root when deriving mount destinations

use std::time::Duration;

// =============================================================================
// Label Contract
// =============================================================================
//
// Containers belonging to an environment are tagged with these labels at
// creation time. Queries are scoped with them rather than by name, so renamed
// containers stay discoverable.
// =============================================================================

/// Label key holding the environment name a container belongs to.
pub const LABEL_ENVIRONMENT: &str = "com.lokal.environment";

/// Label key holding the container's role within the environment.
pub const LABEL_ROLE: &str = "com.lokal.role";

/// Label key holding the dump-command compatibility family of a database
/// container (e.g. "postgres"). Selects the backup dialect.
pub const LABEL_DATABASE_COMPAT: &str = "com.lokal.database-compat";

// =============================================================================
// Filesystem Layout
// =============================================================================

/// Hidden directory under the user's home that holds all local state.
pub const HOME_DIR_NAME: &str = ".lokal";

/// Subdirectory of [`HOME_DIR_NAME`] where retrieved database dumps land,
/// namespaced by environment and source container name.
pub const BACKUPS_DIR_NAME: &str = "backups";

/// Root directory inside the backend under which site sources are mounted.
pub const SITES_ROOT: &str = "/home/ubuntu/sites";

/// Directory inside a database container where dump files are produced
/// before being copied out.
pub const REMOTE_SCRATCH_DIR: &str = "/tmp";

// =============================================================================
// Remote Command Protocol Bounds
// =============================================================================

/// Interval between exec-session status polls.
///
/// The completion wait is a poll loop; this bounds how hot it runs. A quarter
/// second keeps dump latency low without spinning a core.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Maximum time to wait for a remote command to complete before giving up
/// with a timeout error. Database dumps on large schemas can be slow, so the
/// default is generous.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(15 * 60);

// =============================================================================
// Validation Bounds
// =============================================================================

/// PHP versions the provisioning templates know how to configure.
pub const SUPPORTED_PHP_VERSIONS: &[&str] = &["8.0", "7.4", "7.3", "7.2", "7.1", "7.0"];

/// Upper bound (exclusive) for `max_input_vars`.
pub const MAX_INPUT_VARS_LIMIT: i64 = 10_000;

/// Upper bound (exclusive) for `max_file_uploads`.
pub const MAX_FILE_UPLOADS_LIMIT: i64 = 500;
