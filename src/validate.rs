//! Input validation for identities, versions, and provisioning values.
//!
//! Every check runs before an [`crate::action::Action`] is constructed, so a
//! malformed input never reaches the backend. All functions return
//! [`Error::Validation`] with a message naming the rejected input.

use crate::constants::{MAX_FILE_UPLOADS_LIMIT, MAX_INPUT_VARS_LIMIT, SUPPORTED_PHP_VERSIONS};
use crate::error::{Error, Result};
use std::path::Path;

/// Validates a machine or container name.
///
/// Names must be non-empty and contain no whitespace; they are spliced into
/// argument vectors, so a space would silently change the command shape.
pub fn machine_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::Validation("machine name cannot be empty".into()));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(Error::Validation(
            "machine name cannot contain spaces".into(),
        ));
    }
    Ok(())
}

/// Validates a PHP version selector against the supported allow-list.
pub fn php_version(version: &str) -> Result<()> {
    if SUPPORTED_PHP_VERSIONS.contains(&version) {
        return Ok(());
    }
    Err(Error::Validation(format!(
        "the PHP version '{version}' is not supported (supported: {})",
        SUPPORTED_PHP_VERSIONS.join(", ")
    )))
}

/// Validates a site hostname: lowercase, no spaces, no shell-special
/// characters, at least three characters.
pub fn hostname(host: &str) -> Result<()> {
    if host.len() < 3 {
        return Err(Error::Validation(
            "hostname must be at least 3 characters".into(),
        ));
    }
    if host.chars().any(char::is_whitespace) {
        return Err(Error::Validation("hostname must not include spaces".into()));
    }
    if host.contains(|c| "!@#$%^&*()".contains(c)) {
        return Err(Error::Validation(
            "hostname must not include special characters".into(),
        ));
    }
    if host.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(Error::Validation("hostname must be lowercase".into()));
    }
    Ok(())
}

/// Validates that a path exists and is a directory.
pub fn directory(path: &Path) -> Result<()> {
    let meta = std::fs::metadata(path).map_err(|e| {
        Error::Validation(format!("cannot stat '{}': {e}", path.display()))
    })?;
    if meta.is_dir() {
        return Ok(());
    }
    Err(Error::Validation(format!(
        "'{}' is not a directory",
        path.display()
    )))
}

/// Validates a megabyte-suffixed size value such as `256M`.
pub fn megabytes(value: &str) -> Result<()> {
    if value.len() < 2 {
        return Err(Error::Validation(
            "size must be larger than 1 character (e.g. 256M)".into(),
        ));
    }
    if !value.ends_with('M') {
        return Err(Error::Validation("size must end with an M".into()));
    }
    value[..value.len() - 1]
        .parse::<u64>()
        .map_err(|_| Error::Validation(format!("'{value}' is not a valid megabyte size")))?;
    Ok(())
}

/// Validates a gigabyte-suffixed size value such as `4G`, used for machine
/// memory and disk sizing.
pub fn gigabytes(value: &str) -> Result<()> {
    if !value.ends_with('G') {
        return Err(Error::Validation("size must end with a G".into()));
    }
    value[..value.len() - 1]
        .parse::<u64>()
        .map_err(|_| Error::Validation(format!("'{value}' is not a valid gigabyte size")))?;
    Ok(())
}

/// Validates a `max_execution_time` value: any non-negative integer.
pub fn max_execution_time(value: &str) -> Result<()> {
    parse_limit(value, "max_execution_time")?;
    Ok(())
}

/// Validates a `max_input_vars` value: an integer below the configured cap.
pub fn max_input_vars(value: &str) -> Result<()> {
    let num = parse_limit(value, "max_input_vars")?;
    if num >= MAX_INPUT_VARS_LIMIT {
        return Err(Error::Validation(format!(
            "max_input_vars must be less than {MAX_INPUT_VARS_LIMIT}"
        )));
    }
    Ok(())
}

/// Validates a `max_file_uploads` value: an integer below the configured cap.
pub fn max_file_uploads(value: &str) -> Result<()> {
    let num = parse_limit(value, "max_file_uploads")?;
    if num >= MAX_FILE_UPLOADS_LIMIT {
        return Err(Error::Validation(format!(
            "max_file_uploads must be less than {MAX_FILE_UPLOADS_LIMIT}"
        )));
    }
    Ok(())
}

fn parse_limit(value: &str, what: &str) -> Result<i64> {
    value
        .parse::<i64>()
        .map_err(|_| Error::Validation(format!("{what} must be a valid integer, got '{value}'")))
}
