//! CLI integration tests for Composer Manager.
//!
//! These tests lay out a small site on disk and drive the binary against it.

use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

/// Get the composer-manager binary command, isolated from the user's config.
fn composer_manager(site: &Path) -> Command {
    let mut cmd = Command::cargo_bin("composer-manager").unwrap();
    cmd.env("HOME", site)
        .env_remove("COMPOSER_MANAGER_ROOT")
        .arg("--no-color")
        .arg("--root")
        .arg(site);
    cmd
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn add_module(root: &Path, name: &str, composer_json: Option<&str>) {
    write(
        root,
        &format!("modules/{name}/{name}.info.yml"),
        &format!("name: {name}\ntype: module\ncore: 8.x\n"),
    );
    if let Some(json) = composer_json {
        write(root, &format!("modules/{name}/composer.json"), json);
    }
}

/// A site with two modules, one bundled core package and one installed package.
fn site() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();

    add_module(
        root,
        "mailer",
        Some(r#"{"require": {"swiftmailer/swiftmailer": "~5.4"}}"#),
    );
    add_module(
        root,
        "search",
        Some(r#"{"require": {"solarium/solarium": "3.6.*"}, "minimum-stability": "beta"}"#),
    );
    add_module(root, "plain", None);

    write(
        root,
        "core/vendor/composer/installed.json",
        r#"[{"name": "symfony/yaml", "version": "v2.7.0"}]"#,
    );
    write(
        root,
        "vendor/composer/installed.json",
        r#"[{"name": "swiftmailer/swiftmailer", "version": "v5.4.1", "description": "Swiftmailer, free feature-rich PHP mailer"}]"#,
    );

    tmp
}

fn composer_json(root: &Path) -> Value {
    let path = root.join("sites/default/files/composer/composer.json");
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

// ============================================================================
// composer-manager rebuild
// ============================================================================

#[test]
fn test_rebuild_writes_consolidated_manifest() {
    let tmp = site();

    composer_manager(tmp.path())
        .arg("rebuild")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "sites/default/files/composer/composer.json",
        ));

    let json = composer_json(tmp.path());
    assert_eq!(json["require"]["swiftmailer/swiftmailer"], "~5.4");
    assert_eq!(json["require"]["solarium/solarium"], "3.6.*");
    assert_eq!(json["replace"]["symfony/yaml"], "v2.7.0");
    assert_eq!(json["minimum-stability"], "beta");
}

#[test]
fn test_rebuild_uses_four_space_indent() {
    let tmp = site();

    composer_manager(tmp.path()).arg("rebuild").assert().success();

    let text =
        fs::read_to_string(tmp.path().join("sites/default/files/composer/composer.json")).unwrap();
    assert!(text.starts_with("{\n    \"require\": {\n        \""));
    assert!(text.contains("swiftmailer/swiftmailer"));
}

#[test]
fn test_rebuild_respects_autobuild() {
    let tmp = site();
    write(
        tmp.path(),
        ".composer-manager/config.toml",
        "[build]\nautobuild = false\n",
    );

    composer_manager(tmp.path())
        .arg("rebuild")
        .assert()
        .success()
        .stderr(predicate::str::contains("--force"));
    assert!(!tmp
        .path()
        .join("sites/default/files/composer/composer.json")
        .exists());

    composer_manager(tmp.path())
        .args(["rebuild", "--force"])
        .assert()
        .success();
    assert!(tmp
        .path()
        .join("sites/default/files/composer/composer.json")
        .exists());
}

#[test]
fn test_rebuild_reports_malformed_module_manifest() {
    let tmp = site();
    add_module(tmp.path(), "broken", Some("{\"require\": "));

    composer_manager(tmp.path())
        .arg("rebuild")
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not decode JSON"))
        .stderr(predicate::str::contains("modules/broken/composer.json"));
}

#[test]
fn test_rebuild_with_custom_composer_dir() {
    let tmp = site();
    write(
        tmp.path(),
        ".composer-manager/config.toml",
        "[paths]\ncomposer_dir = \"private/composer\"\n",
    );

    composer_manager(tmp.path()).arg("rebuild").assert().success();
    assert!(tmp.path().join("private/composer/composer.json").exists());
}

// ============================================================================
// composer-manager status
// ============================================================================

#[test]
fn test_status_lists_missing_packages() {
    let tmp = site();

    composer_manager(tmp.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("solarium/solarium"))
        .stdout(predicate::str::contains("missing"))
        .stderr(predicate::str::contains("1 required package(s) not installed"))
        .stderr(predicate::str::contains("composer.json is out of date"));
}

#[test]
fn test_status_warns_about_missing_autoloader() {
    let tmp = site();

    composer_manager(tmp.path())
        .arg("status")
        .assert()
        .success()
        .stderr(predicate::str::contains("Composer autoloader not found"))
        .stderr(predicate::str::contains("vendor/autoload.php"));

    write(tmp.path(), "vendor/autoload.php", "<?php\n");

    composer_manager(tmp.path())
        .arg("status")
        .assert()
        .success()
        .stderr(predicate::str::contains("autoloader").not());
}

#[test]
fn test_status_json() {
    let tmp = site();

    composer_manager(tmp.path()).arg("rebuild").assert().success();

    let output = composer_manager(tmp.path())
        .args(["status", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["stale"], false);

    let packages = report["packages"].as_array().unwrap();
    let state = |name: &str| {
        packages
            .iter()
            .find(|p| p["name"] == name)
            .map(|p| p["state"].clone())
            .unwrap()
    };
    assert_eq!(state("swiftmailer/swiftmailer"), "installed");
    assert_eq!(state("solarium/solarium"), "missing");
    assert_eq!(state("symfony/yaml"), "installed");
}

// ============================================================================
// composer-manager required / installed
// ============================================================================

#[test]
fn test_required_lists_requesters() {
    let tmp = site();

    composer_manager(tmp.path())
        .arg("required")
        .assert()
        .success()
        .stdout(predicate::str::contains("swiftmailer/swiftmailer ~5.4 (mailer)"))
        .stdout(predicate::str::contains("symfony/yaml v2.7.0 (drupal)"));
}

#[test]
fn test_required_missing_only() {
    let tmp = site();

    composer_manager(tmp.path())
        .args(["required", "--missing"])
        .assert()
        .success()
        .stdout("solarium/solarium\n");
}

#[test]
fn test_installed_lists_core_and_vendor_packages() {
    let tmp = site();

    composer_manager(tmp.path())
        .arg("installed")
        .assert()
        .success()
        .stdout(predicate::str::contains("swiftmailer/swiftmailer"))
        .stdout(predicate::str::contains("v5.4.1"))
        .stdout(predicate::str::contains("symfony/yaml"));
}

#[test]
fn test_installed_json() {
    let tmp = site();

    let output = composer_manager(tmp.path())
        .args(["installed", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let installed: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(installed["swiftmailer/swiftmailer"]["version"], "v5.4.1");
    assert_eq!(installed["symfony/yaml"]["description"], "");
}

#[test]
fn test_installed_empty_site() {
    let tmp = TempDir::new().unwrap();

    composer_manager(tmp.path())
        .arg("installed")
        .assert()
        .success()
        .stdout(predicate::str::contains("No packages installed"));
}

// ============================================================================
// composer-manager completions
// ============================================================================

#[test]
fn test_completions_bash() {
    let tmp = TempDir::new().unwrap();

    composer_manager(tmp.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("composer-manager"));
}

#[test]
fn test_invalid_config_is_reported() {
    let tmp = site();
    write(
        tmp.path(),
        ".composer-manager/config.toml",
        "[lock]\ntimeout_secs = \"soon\"\n",
    );

    composer_manager(tmp.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}
