//! # Action Compiler
//!
//! Pure builders that turn a desired configuration change into [`Action`]
//! values, one builder per provisioning concern. Building an action never
//! touches a backend; execution belongs to [`crate::runner`]. That split is
//! what lets reconciliation be tested without a live machine.
//!
//! Every builder validates its inputs first and fails with
//! [`crate::error::Error::Validation`] before an action is constructed, so a
//! rejected input produces no partial action list.
//!
//! The generated commands are in-place text substitutions (`sed -i`) scoped
//! to the php.ini derived from the version selector. Substitutions are
//! convergent: running the same action twice leaves the same file contents.

use crate::error::Result;
use crate::validate;

/// The kind of remote invocation an action represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Run a command inside the target machine or container.
    Exec,
    /// Restart the target machine.
    Restart,
}

/// One fully specified remote command invocation, transport-agnostic until a
/// [`crate::runner::Runner`] executes it. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    kind: ActionKind,
    use_syscall: bool,
    target: String,
    args: Vec<String>,
}

impl Action {
    fn exec(target: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            kind: ActionKind::Exec,
            use_syscall: false,
            target: target.into(),
            args,
        }
    }

    /// The invocation kind.
    #[must_use]
    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    /// Transport hint: true when the caller should hand the argument vector
    /// to the control binary via a raw process replacement rather than a
    /// spawned child. Carried through untouched; runners that spawn ignore it.
    #[must_use]
    pub fn use_syscall(&self) -> bool {
        self.use_syscall
    }

    /// The machine or container the action runs against.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The remote command argument vector, without any transport prefix.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// Path of the FPM php.ini for a given PHP version.
fn php_ini_path(php: &str) -> String {
    format!("/etc/php/{php}/fpm/php.ini")
}

/// Path of the xdebug mods-available ini for a given PHP version.
fn xdebug_ini_path(php: &str) -> String {
    format!("/etc/php/{php}/mods-available/xdebug.ini")
}

/// Builds the argument vector for an in-place ini substitution.
fn ini_substitution(key: &str, default: &str, value: &str, file: String) -> Vec<String> {
    let expr = format!("s|{key} = {default}|{key} = {value}|g");
    vec![
        "sudo".into(),
        "sed".into(),
        "-i".into(),
        expr,
        file,
    ]
}

// =============================================================================
// PHP ini Builders
// =============================================================================

/// Sets the PHP `memory_limit` (e.g. `256M`) for the given machine and PHP
/// version.
pub fn php_memory_limit(machine: &str, php: &str, limit: &str) -> Result<Action> {
    validate::machine_name(machine)?;
    validate::php_version(php)?;
    validate::megabytes(limit)?;

    Ok(Action::exec(
        machine,
        ini_substitution("memory_limit", "128M", limit, php_ini_path(php)),
    ))
}

/// Sets the PHP `max_execution_time` in seconds.
pub fn php_max_execution_time(machine: &str, php: &str, seconds: &str) -> Result<Action> {
    validate::machine_name(machine)?;
    validate::php_version(php)?;
    validate::max_execution_time(seconds)?;

    Ok(Action::exec(
        machine,
        ini_substitution("max_execution_time", "30", seconds, php_ini_path(php)),
    ))
}

/// Sets the PHP `max_input_vars` limit.
pub fn php_max_input_vars(machine: &str, php: &str, vars: &str) -> Result<Action> {
    validate::machine_name(machine)?;
    validate::php_version(php)?;
    validate::max_input_vars(vars)?;

    Ok(Action::exec(
        machine,
        ini_substitution("max_input_vars", "1000", vars, php_ini_path(php)),
    ))
}

/// Sets the PHP `upload_max_filesize` (e.g. `32M`).
pub fn php_upload_max_filesize(machine: &str, php: &str, size: &str) -> Result<Action> {
    validate::machine_name(machine)?;
    validate::php_version(php)?;
    validate::megabytes(size)?;

    Ok(Action::exec(
        machine,
        ini_substitution("upload_max_filesize", "2M", size, php_ini_path(php)),
    ))
}

/// Sets the PHP `max_file_uploads` limit.
pub fn php_max_file_uploads(machine: &str, php: &str, uploads: &str) -> Result<Action> {
    validate::machine_name(machine)?;
    validate::php_version(php)?;
    validate::max_file_uploads(uploads)?;

    Ok(Action::exec(
        machine,
        ini_substitution("max_file_uploads", "20", uploads, php_ini_path(php)),
    ))
}

// =============================================================================
// Xdebug Builders
// =============================================================================

/// Appends the xdebug remote-debugging settings to the version's
/// mods-available ini. The write goes through `tee -a` so it works under
/// sudo.
pub fn enable_xdebug(machine: &str, php: &str) -> Result<Action> {
    validate::machine_name(machine)?;
    validate::php_version(php)?;

    let settings = concat!(
        "xdebug.remote_enable=1\n",
        "xdebug.remote_connect_back=0\n",
        "xdebug.remote_host=localhost\n",
        "xdebug.remote_port=9000\n",
        "xdebug.remote_log=/var/log/nginx/xdebug.log\n",
    );

    Ok(Action::exec(
        machine,
        vec![
            "printf".into(),
            settings.into(),
            "|".into(),
            "sudo".into(),
            "tee".into(),
            "-a".into(),
            xdebug_ini_path(php),
        ],
    ))
}

/// Disables the xdebug extension for the version via `phpdismod`.
pub fn disable_xdebug(machine: &str, php: &str) -> Result<Action> {
    validate::machine_name(machine)?;
    validate::php_version(php)?;

    Ok(Action::exec(
        machine,
        vec![
            "sudo".into(),
            "phpdismod".into(),
            "-v".into(),
            php.into(),
            "xdebug".into(),
        ],
    ))
}

// =============================================================================
// Machine Builders
// =============================================================================

/// Restarts the target machine.
pub fn restart_machine(machine: &str) -> Result<Action> {
    validate::machine_name(machine)?;

    Ok(Action {
        kind: ActionKind::Restart,
        use_syscall: false,
        target: machine.to_string(),
        args: Vec::new(),
    })
}
