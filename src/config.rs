//! # Environment Config Model
//!
//! In-memory representation of an environment: sites, bind mounts, and
//! database engines, plus the scalar machine sizing fields. All mutation goes
//! through methods on [`Config`]; the sequences themselves are private so the
//! uniqueness and overlap invariants cannot be bypassed.
//!
//! ## Failure Policy
//!
//! Removal and rename are strict: a missing target is an error
//! ([`Error::SiteNotFound`]). Lookups are lenient: a missing match is `None`
//! or `false`, never an error. Mount removal by webroot follows the lookup
//! side of this split and is a no-op when nothing covers the webroot.
//!
//! ## Persistence
//!
//! The config round-trips through YAML. [`Config::save`] is an atomic
//! whole-file rewrite (temp file + rename), so a concurrent reader observes
//! either the previous complete file or the new complete file, never a
//! partial write.

use crate::constants::{HOME_DIR_NAME, SITES_ROOT};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

// =============================================================================
// Value Types
// =============================================================================

/// A PHP site served by the environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    /// Hostname the site is reachable at. Unique across the config.
    pub hostname: String,
    /// Path to the site's webroot inside the backend.
    pub webroot: String,
}

/// A bind mount from the host filesystem into the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mount {
    /// Host path. Normalized to an absolute path on insertion.
    pub source: String,
    /// Absolute path inside the backend.
    pub dest: String,
}

/// A database engine instance.
///
/// The identity key is the full triple; two databases differing in any field
/// are distinct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Database {
    /// Engine name, e.g. "mysql" or "postgres".
    pub engine: String,
    /// Engine version, e.g. "5.7".
    pub version: String,
    /// Host port the engine listens on, kept as a string for config fidelity.
    pub port: String,
}

impl Database {
    /// Renders the database as its container-name form,
    /// `"{engine}_{version}_{port}"`.
    #[must_use]
    pub fn name(&self) -> String {
        format!("{}_{}_{}", self.engine, self.version, self.port)
    }
}

// =============================================================================
// Config Aggregate
// =============================================================================

/// The environment description: the aggregate root owning sites, mounts, and
/// databases along with machine sizing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Environment name.
    #[serde(default)]
    name: String,
    /// PHP version the machine runs.
    #[serde(default)]
    php: String,
    /// CPU count, as passed to the hypervisor.
    #[serde(default)]
    cpus: String,
    /// Disk size with a G suffix.
    #[serde(default)]
    disk: String,
    /// Memory size with a G suffix.
    #[serde(default)]
    memory: String,
    #[serde(default)]
    mounts: Vec<Mount>,
    #[serde(default)]
    databases: Vec<Database>,
    #[serde(default)]
    sites: Vec<Site>,
}

impl Config {
    /// Creates an empty config for the named environment.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Environment name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// PHP version.
    #[must_use]
    pub fn php(&self) -> &str {
        &self.php
    }

    /// Sets the PHP version.
    pub fn set_php(&mut self, php: impl Into<String>) {
        self.php = php.into();
    }

    /// CPU count.
    #[must_use]
    pub fn cpus(&self) -> &str {
        &self.cpus
    }

    /// Sets the CPU count.
    pub fn set_cpus(&mut self, cpus: impl Into<String>) {
        self.cpus = cpus.into();
    }

    /// Disk size.
    #[must_use]
    pub fn disk(&self) -> &str {
        &self.disk
    }

    /// Sets the disk size.
    pub fn set_disk(&mut self, disk: impl Into<String>) {
        self.disk = disk.into();
    }

    /// Memory size.
    #[must_use]
    pub fn memory(&self) -> &str {
        &self.memory
    }

    /// Sets the memory size.
    pub fn set_memory(&mut self, memory: impl Into<String>) {
        self.memory = memory.into();
    }

    /// The sites, in insertion order.
    #[must_use]
    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    /// The mounts, in insertion order.
    #[must_use]
    pub fn mounts(&self) -> &[Mount] {
        &self.mounts
    }

    /// The databases, in insertion order.
    #[must_use]
    pub fn databases(&self) -> &[Database] {
        &self.databases
    }

    // =========================================================================
    // Site Operations
    // =========================================================================

    /// Appends a site. Duplicate checking is the caller's concern; use
    /// [`Config::site_exists`] first when uniqueness matters.
    pub fn add_site(&mut self, site: Site) {
        self.sites.push(site);
    }

    /// Removes the first site with the given hostname, preserving the order
    /// of the remaining sites.
    ///
    /// # Errors
    ///
    /// [`Error::SiteNotFound`] if no site matches.
    pub fn remove_site(&mut self, hostname: &str) -> Result<Site> {
        match self.sites.iter().position(|s| s.hostname == hostname) {
            Some(idx) => Ok(self.sites.remove(idx)),
            None => Err(Error::SiteNotFound(hostname.to_string())),
        }
    }

    /// Renames a site in place. The webroot is rewritten by substituting the
    /// first occurrence of the old hostname segment with the new one.
    ///
    /// # Errors
    ///
    /// [`Error::SiteNotFound`] if no site matches `site` exactly.
    pub fn rename_site(&mut self, site: &Site, new_hostname: &str) -> Result<()> {
        let found = self
            .sites
            .iter_mut()
            .find(|s| *s == site)
            .ok_or_else(|| Error::SiteNotFound(site.hostname.clone()))?;

        found.webroot = found.webroot.replacen(&site.hostname, new_hostname, 1);
        found.hostname = new_hostname.to_string();
        Ok(())
    }

    /// Returns true if a site matching `site` exactly (both fields) exists.
    #[must_use]
    pub fn site_exists(&self, site: &Site) -> bool {
        self.sites.iter().any(|s| s == site)
    }

    // =========================================================================
    // Mount Operations
    // =========================================================================

    /// Adds a mount, normalizing its source to an absolute path. `~` and
    /// relative segments resolve against the user's home directory. An empty
    /// dest defaults to a path under the sites root named after the source's
    /// final segment.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] when the home directory is unavailable or the
    /// source path cannot be resolved.
    pub fn add_mount(&mut self, mount: Mount) -> Result<()> {
        let base = dirs::home_dir()
            .ok_or_else(|| Error::Validation("cannot determine the home directory".into()))?;
        self.add_mount_with_base(mount, &base)
    }

    /// Like [`Config::add_mount`] but with an explicit base directory for
    /// resolving `~` and relative sources.
    pub fn add_mount_with_base(&mut self, mut mount: Mount, base: &Path) -> Result<()> {
        mount.source = normalize_source(&mount.source, base)?;

        if mount.dest.is_empty() {
            let segment = Path::new(&mount.source)
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| {
                    Error::Validation(format!(
                        "cannot derive a mount destination from '{}'",
                        mount.source
                    ))
                })?;
            mount.dest = format!("{SITES_ROOT}/{segment}");
        }

        self.mounts.push(mount);
        Ok(())
    }

    /// Returns true when `dest` is already covered by a mount: either an
    /// exact dest match or a mount at a path-prefix ancestor of `dest`.
    #[must_use]
    pub fn mount_exists(&self, dest: &str) -> bool {
        self.mounts
            .iter()
            .any(|m| Path::new(dest).starts_with(&m.dest))
    }

    /// Returns the mount that already satisfies `mount`, if any: a mount with
    /// the same dest whose source is the same path or a parent of the new
    /// source. Parent-mount coverage suppresses redundant child mounts.
    #[must_use]
    pub fn already_mounted(&self, mount: &Mount) -> Option<&Mount> {
        self.mounts.iter().find(|m| {
            m.dest == mount.dest && Path::new(&mount.source).starts_with(&m.source)
        })
    }

    /// Returns the mount covering a site's webroot: the mount whose dest is
    /// the longest path-prefix of `webroot`.
    #[must_use]
    pub fn find_mount_by_site_webroot(&self, webroot: &str) -> Option<&Mount> {
        self.mounts
            .iter()
            .filter(|m| Path::new(webroot).starts_with(&m.dest))
            .max_by_key(|m| m.dest.len())
    }

    /// Removes the mount covering a site's webroot, chosen by longest
    /// matching dest prefix. A webroot no mount covers is a no-op, not an
    /// error; the removed mount is returned when one matched.
    pub fn remove_mount_by_site_webroot(&mut self, webroot: &str) -> Option<Mount> {
        let idx = self
            .mounts
            .iter()
            .enumerate()
            .filter(|(_, m)| Path::new(webroot).starts_with(&m.dest))
            .max_by_key(|(_, m)| m.dest.len())
            .map(|(i, _)| i)?;
        Some(self.mounts.remove(idx))
    }

    // =========================================================================
    // Database Operations
    // =========================================================================

    /// Appends a database.
    pub fn add_database(&mut self, database: Database) {
        self.databases.push(database);
    }

    /// Returns true if a database matching the full engine/version/port
    /// triple exists.
    #[must_use]
    pub fn database_exists(&self, database: &Database) -> bool {
        self.databases.iter().any(|d| d == database)
    }

    /// Renders each database as `"{engine}_{version}_{port}"`, optionally
    /// filtered to one engine, preserving insertion order.
    #[must_use]
    pub fn database_engines_as_list(&self, engine: Option<&str>) -> Vec<String> {
        self.databases
            .iter()
            .filter(|d| engine.map_or(true, |e| d.engine == e))
            .map(Database::name)
            .collect()
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Returns the default config file path for an environment,
    /// `~/.lokal/{environment}.yaml`.
    pub fn default_path(environment: &str) -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Validation("cannot determine the home directory".into()))?;
        Ok(home
            .join(HOME_DIR_NAME)
            .join(format!("{environment}.yaml")))
    }

    /// Loads a config from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&raw)?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Writes the config as YAML via an atomic whole-file rewrite.
    ///
    /// The file is written to a uniquely named temp file in the destination
    /// directory and renamed into place, so readers never observe a partial
    /// write. Missing parent directories are created.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let raw = serde_yaml::to_string(self)?;
        let temp_path = path.with_extension(format!("tmp.{}", uuid::Uuid::new_v4()));
        fs::write(&temp_path, raw)?;
        fs::rename(&temp_path, path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            Error::Io(e)
        })?;

        debug!(path = %path.display(), "saved config");
        Ok(())
    }
}

// =============================================================================
// Path Normalization
// =============================================================================

/// Resolves a mount source to an absolute, lexically cleaned path.
///
/// `~` expands to `base`; relative paths are joined onto `base`; `.` and `..`
/// segments are resolved without touching the filesystem. A path that climbs
/// above the root is unresolvable.
fn normalize_source(source: &str, base: &Path) -> Result<String> {
    if source.is_empty() {
        return Err(Error::Validation("mount source cannot be empty".into()));
    }

    let joined = if source == "~" {
        base.to_path_buf()
    } else if let Some(rest) = source.strip_prefix("~/") {
        base.join(rest)
    } else {
        let path = Path::new(source);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base.join(path)
        }
    };

    let mut cleaned = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !cleaned.pop() || cleaned.as_os_str().is_empty() {
                    return Err(Error::Validation(format!(
                        "cannot resolve mount source '{source}'"
                    )));
                }
            }
            other => cleaned.push(other),
        }
    }

    cleaned
        .to_str()
        .map(String::from)
        .ok_or_else(|| Error::Validation(format!("mount source '{source}' is not valid UTF-8")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_expands_tilde() {
        let base = Path::new("/home/dev");
        assert_eq!(
            normalize_source("~/sites/blog", base).unwrap(),
            "/home/dev/sites/blog"
        );
        assert_eq!(normalize_source("~", base).unwrap(), "/home/dev");
    }

    #[test]
    fn normalize_joins_relative_onto_base() {
        let base = Path::new("/home/dev");
        assert_eq!(
            normalize_source("sites/blog", base).unwrap(),
            "/home/dev/sites/blog"
        );
        assert_eq!(
            normalize_source("./sites/./blog", base).unwrap(),
            "/home/dev/sites/blog"
        );
    }

    #[test]
    fn normalize_resolves_parent_segments() {
        let base = Path::new("/home/dev");
        assert_eq!(
            normalize_source("sites/../blog", base).unwrap(),
            "/home/dev/blog"
        );
    }

    #[test]
    fn normalize_rejects_escaping_root() {
        let base = Path::new("/home");
        assert!(normalize_source("/../../etc", base).is_err());
        assert!(normalize_source("", base).is_err());
    }

    #[test]
    fn absolute_sources_pass_through() {
        let base = Path::new("/home/dev");
        assert_eq!(
            normalize_source("/srv/code", base).unwrap(),
            "/srv/code"
        );
    }
}
