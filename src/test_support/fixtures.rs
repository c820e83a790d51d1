//! Test fixtures for site layouts.
//!
//! A [`SiteFixture`] lays out a site tree on disk: modules and profiles
//! with their `.info.yml` files, per-module `composer.json` fragments, and
//! the installed.json files of the vendor and core vendor directories.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tempfile::TempDir;

use crate::util::config::Config;
use crate::util::context::GlobalContext;

/// A temporary site root.
pub struct SiteFixture {
    dir: TempDir,
}

impl SiteFixture {
    /// Create an empty site.
    pub fn new() -> Self {
        SiteFixture {
            dir: TempDir::new().unwrap(),
        }
    }

    /// The site root.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// A context for this site with default configuration.
    pub fn context(&self) -> GlobalContext {
        GlobalContext::with_config(self.root(), Config::default())
    }

    /// A context for this site with `config`.
    pub fn context_with(&self, config: Config) -> GlobalContext {
        GlobalContext::with_config(self.root(), config)
    }

    /// Add a module under `modules/<name>` without a composer.json.
    pub fn module(&self, name: &str) -> PathBuf {
        self.extension(&format!("modules/{}", name), name, "module")
    }

    /// Add a module under `modules/<name>` with the given composer.json.
    pub fn module_with_manifest(&self, name: &str, manifest: Value) -> PathBuf {
        let dir = self.module(name);
        self.write_json(&dir.join("composer.json"), &manifest);
        dir
    }

    /// Add a module inside a profile: `profiles/<profile>/modules/<name>`.
    pub fn profile_module(&self, profile: &str, name: &str, manifest: Value) -> PathBuf {
        let dir = self.extension(
            &format!("profiles/{}/modules/{}", profile, name),
            name,
            "module",
        );
        self.write_json(&dir.join("composer.json"), &manifest);
        dir
    }

    /// Add an install profile under `profiles/<name>`.
    pub fn profile(&self, name: &str) -> PathBuf {
        self.extension(&format!("profiles/{}", name), name, "profile")
    }

    /// Add a core install profile under `core/profiles/<name>`.
    pub fn core_profile(&self, name: &str) -> PathBuf {
        self.extension(&format!("core/profiles/{}", name), name, "profile")
    }

    /// Write `vendor/composer/installed.json` from `(name, version, require)` triples.
    pub fn installed(&self, packages: &[(&str, &str, Value)]) {
        let path = self.root().join("vendor/composer/installed.json");
        self.write_json(&path, &package_list(packages));
    }

    /// Write `core/vendor/composer/installed.json` from `(name, version)` pairs.
    pub fn core_installed(&self, packages: &[(&str, &str)]) {
        let records: Vec<(&str, &str, Value)> = packages
            .iter()
            .map(|(name, version)| (*name, *version, Value::Null))
            .collect();
        let path = self.root().join("core/vendor/composer/installed.json");
        self.write_json(&path, &package_list(&records));
    }

    /// Write raw text to a path relative to the root.
    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    fn extension(&self, rel: &str, name: &str, kind: &str) -> PathBuf {
        self.write(
            &format!("{}/{}.info.yml", rel, name),
            &format!("name: {}\ntype: {}\ncore: 8.x\n", name, kind),
        );
        self.root().join(rel)
    }

    fn write_json(&self, path: &Path, value: &Value) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
    }
}

impl Default for SiteFixture {
    fn default() -> Self {
        Self::new()
    }
}

fn package_list(packages: &[(&str, &str, Value)]) -> Value {
    Value::Array(
        packages
            .iter()
            .map(|(name, version, require)| {
                let mut record = json!({ "name": name, "version": version });
                if !require.is_null() {
                    record["require"] = require.clone();
                }
                record
            })
            .collect(),
    )
}
