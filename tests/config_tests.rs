//! Tests for the environment config model: site, mount, and database
//! operations plus YAML persistence.

use lokal::{Config, Database, Error, Mount, Site};
use std::path::Path;

fn site(hostname: &str, webroot: &str) -> Site {
    Site {
        hostname: hostname.to_string(),
        webroot: webroot.to_string(),
    }
}

fn mount(source: &str, dest: &str) -> Mount {
    Mount {
        source: source.to_string(),
        dest: dest.to_string(),
    }
}

fn database(engine: &str, version: &str, port: &str) -> Database {
    Database {
        engine: engine.to_string(),
        version: version.to_string(),
        port: port.to_string(),
    }
}

// =============================================================================
// Site Tests
// =============================================================================

#[test]
fn remove_site_keeps_remaining_order() {
    let mut config = Config::new("dev");
    config.add_site(site("example.test", "web"));
    config.add_site(site("anotherexample.test", "web"));
    config.add_site(site("finalexample.test", "web"));

    let removed = config.remove_site("anotherexample.test").unwrap();
    assert_eq!(removed.hostname, "anotherexample.test");

    let hostnames: Vec<_> = config.sites().iter().map(|s| s.hostname.as_str()).collect();
    assert_eq!(hostnames, ["example.test", "finalexample.test"]);
}

#[test]
fn remove_site_is_strict() {
    let mut config = Config::new("dev");
    config.add_site(site("example.test", "web"));

    let err = config.remove_site("doesnotexist.test").unwrap_err();
    assert!(matches!(err, Error::SiteNotFound(_)));
    assert_eq!(config.sites().len(), 1);
}

#[test]
fn remove_site_twice_fails_the_second_time() {
    let mut config = Config::new("dev");
    config.add_site(site("example.test", "web"));

    assert!(config.remove_site("example.test").is_ok());
    assert!(matches!(
        config.remove_site("example.test"),
        Err(Error::SiteNotFound(_))
    ));
}

#[test]
fn rename_site_rewrites_hostname_and_webroot() {
    let mut config = Config::new("dev");
    config.add_site(site("old.test", "/home/ubuntu/sites/old.test"));
    config.add_site(site("keep.test", "/home/ubuntu/sites/keep.test"));

    config
        .rename_site(&site("old.test", "/home/ubuntu/sites/old.test"), "new.test")
        .unwrap();

    assert_eq!(
        config.sites()[0],
        site("new.test", "/home/ubuntu/sites/new.test")
    );
    assert_eq!(
        config.sites()[1],
        site("keep.test", "/home/ubuntu/sites/keep.test")
    );
}

#[test]
fn rename_site_requires_a_full_value_match() {
    let mut config = Config::new("dev");
    config.add_site(site("old.test", "/home/ubuntu/sites/old.test"));

    let err = config
        .rename_site(&site("old.test", "/other/webroot"), "new.test")
        .unwrap_err();
    assert!(matches!(err, Error::SiteNotFound(_)));
}

#[test]
fn site_exists_is_exact_structural_equality() {
    let mut config = Config::new("dev");
    config.add_site(site("iexist.test", "/home/ubuntu/sites/iexist.test"));

    assert!(config.site_exists(&site("iexist.test", "/home/ubuntu/sites/iexist.test")));
    assert!(!config.site_exists(&site("idontexist.test", "/home/ubuntu/sites/idontexist.test")));
    assert!(!config.site_exists(&site("iexist.test", "/different/webroot")));
}

// =============================================================================
// Mount Tests
// =============================================================================

#[test]
fn add_mount_normalizes_relative_and_tilde_sources() {
    let base = Path::new("/home/dev");

    let mut config = Config::new("dev");
    config
        .add_mount_with_base(mount("sites/blog", "/home/ubuntu/sites/blog"), base)
        .unwrap();
    config
        .add_mount_with_base(mount("~/sites/shop", "/home/ubuntu/sites/shop"), base)
        .unwrap();

    assert_eq!(config.mounts()[0].source, "/home/dev/sites/blog");
    assert_eq!(config.mounts()[1].source, "/home/dev/sites/shop");
}

#[test]
fn add_mount_derives_a_default_dest() {
    let base = Path::new("/home/dev");

    let mut config = Config::new("dev");
    config
        .add_mount_with_base(mount("./code/blog", ""), base)
        .unwrap();

    assert_eq!(config.mounts()[0].dest, "/home/ubuntu/sites/blog");
}

#[test]
fn add_mount_rejects_unresolvable_sources() {
    let base = Path::new("/home/dev");
    let mut config = Config::new("dev");

    let err = config
        .add_mount_with_base(mount("", "/home/ubuntu/sites/x"), base)
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert!(config.mounts().is_empty());
}

#[test]
fn mount_exists_matches_exact_and_parent_dests() {
    let mut config = Config::new("dev");
    config
        .add_mount_with_base(
            mount("/home/dev/code", "/home/ubuntu/sites"),
            Path::new("/home/dev"),
        )
        .unwrap();

    assert!(config.mount_exists("/home/ubuntu/sites"));
    assert!(config.mount_exists("/home/ubuntu/sites/anything"));
    assert!(!config.mount_exists("/home/ubuntu/elsewhere"));
    // Component-wise prefixing, not string prefixing.
    assert!(!config.mount_exists("/home/ubuntu/sitesfoo"));
}

#[test]
fn already_mounted_on_empty_config_is_none() {
    let config = Config::new("dev");
    assert!(config
        .already_mounted(&mount("/home/dev/code", "/home/ubuntu/sites/example"))
        .is_none());
}

#[test]
fn already_mounted_exact_match() {
    let mut config = Config::new("dev");
    config
        .add_mount_with_base(
            mount("/home/dev/code", "/home/ubuntu/sites/example"),
            Path::new("/home/dev"),
        )
        .unwrap();

    let matched = config
        .already_mounted(&mount("/home/dev/code", "/home/ubuntu/sites/example"))
        .unwrap();
    assert_eq!(matched.source, "/home/dev/code");
}

#[test]
fn already_mounted_parent_source_covers_child() {
    let mut config = Config::new("dev");
    config
        .add_mount_with_base(
            mount("/home/dev/code", "/home/ubuntu/sites/example"),
            Path::new("/home/dev"),
        )
        .unwrap();

    let matched = config
        .already_mounted(&mount(
            "/home/dev/code/new-mount",
            "/home/ubuntu/sites/example",
        ))
        .unwrap();
    assert_eq!(
        matched,
        &mount("/home/dev/code", "/home/ubuntu/sites/example")
    );
}

#[test]
fn find_mount_by_site_webroot_returns_the_covering_mount() {
    let mut config = Config::new("dev");
    config
        .add_mount_with_base(
            mount("/home/dev/blog", "/home/ubuntu/sites/blog"),
            Path::new("/home/dev"),
        )
        .unwrap();

    let found = config
        .find_mount_by_site_webroot("/home/ubuntu/sites/blog/www")
        .unwrap();
    assert_eq!(found.dest, "/home/ubuntu/sites/blog");

    assert!(config
        .find_mount_by_site_webroot("/home/ubuntu/sites/other/www")
        .is_none());
}

#[test]
fn remove_mount_by_site_webroot_picks_the_longest_prefix() {
    let base = Path::new("/home/dev");
    let mut config = Config::new("dev");
    config
        .add_mount_with_base(mount("/home/dev/code", "/home/ubuntu/sites"), base)
        .unwrap();
    config
        .add_mount_with_base(
            mount("/home/dev/code/remove", "/home/ubuntu/sites/remove"),
            base,
        )
        .unwrap();

    let removed = config
        .remove_mount_by_site_webroot("/home/ubuntu/sites/remove/web")
        .unwrap();
    assert_eq!(removed.dest, "/home/ubuntu/sites/remove");

    // The broader parent mount survives.
    assert_eq!(config.mounts().len(), 1);
    assert_eq!(config.mounts()[0].dest, "/home/ubuntu/sites");
}

#[test]
fn remove_mount_by_site_webroot_is_lenient() {
    let mut config = Config::new("dev");
    assert!(config
        .remove_mount_by_site_webroot("/home/ubuntu/sites/none/web")
        .is_none());
}

// =============================================================================
// Database Tests
// =============================================================================

#[test]
fn database_exists_uses_full_triple_equality() {
    let mut config = Config::new("dev");
    config.add_database(database("mysql", "5.7", "3306"));

    assert!(config.database_exists(&database("mysql", "5.7", "3306")));
    assert!(!config.database_exists(&database("mysql", "5.8", "3306")));
    assert!(!config.database_exists(&database("mysql", "5.7", "3307")));
    assert!(!config.database_exists(&database("postgres", "5.7", "3306")));
}

#[test]
fn database_engines_as_list_filters_and_preserves_order() {
    let mut config = Config::new("dev");
    config.add_database(database("mysql", "5.7", "3306"));
    config.add_database(database("mysql", "5.6", "33061"));
    config.add_database(database("postgres", "12", "5432"));

    assert_eq!(
        config.database_engines_as_list(Some("mysql")),
        ["mysql_5.7_3306", "mysql_5.6_33061"]
    );
    assert_eq!(
        config.database_engines_as_list(Some("postgres")),
        ["postgres_12_5432"]
    );
    assert_eq!(
        config.database_engines_as_list(None),
        ["mysql_5.7_3306", "mysql_5.6_33061", "postgres_12_5432"]
    );
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn config_round_trips_through_yaml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dev.yaml");

    let mut config = Config::new("dev");
    config.set_php("7.4");
    config.set_cpus("2");
    config.set_disk("20G");
    config.set_memory("4G");
    config.add_site(site("example.test", "/home/ubuntu/sites/example.test"));
    config.add_database(database("postgres", "12", "5432"));
    config
        .add_mount_with_base(
            mount("/home/dev/example", "/home/ubuntu/sites/example.test"),
            Path::new("/home/dev"),
        )
        .unwrap();

    config.save(&path).unwrap();
    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn save_creates_missing_directories_and_leaves_no_temp_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("dev.yaml");

    let config = Config::new("dev");
    config.save(&path).unwrap();
    assert!(path.is_file());

    let entries: Vec<_> = std::fs::read_dir(path.parent().unwrap())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(entries, ["dev.yaml"]);
}

#[test]
fn load_missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load(&dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}
