//! Configuration file support.
//!
//! Two locations are read:
//! - Global: `~/.composer-manager/config.toml` - User-wide defaults
//! - Project: `<site root>/.composer-manager/config.toml` - Site overrides
//!
//! Project config takes precedence over global config, key by key.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::discovery::DEFAULT_SCAN_PATHS;

/// Name of the per-site and per-user configuration directory.
pub const CONFIG_DIR_NAME: &str = ".composer-manager";

/// Composer Manager configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Filesystem layout
    pub paths: PathsConfig,

    /// Consolidated manifest generation
    pub build: BuildConfig,

    /// Write lock settings
    pub lock: LockConfig,

    /// Module discovery settings
    pub discovery: DiscoveryConfig,
}

/// Where the consolidated files and vendor directories live.
///
/// Relative paths are resolved against the site root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding the consolidated composer.json and composer.lock
    pub composer_dir: PathBuf,

    /// Vendor directory packages are installed into
    pub vendor_dir: PathBuf,

    /// Vendor directory bundled with core
    pub core_vendor_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        PathsConfig {
            composer_dir: PathBuf::from("sites/default/files/composer"),
            vendor_dir: PathBuf::from("vendor"),
            core_vendor_dir: PathBuf::from("core/vendor"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Rebuild the consolidated composer.json when modules change
    pub autobuild: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig { autobuild: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Seconds to wait for the write lock
    pub timeout_secs: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        LockConfig { timeout_secs: 10 }
    }
}

impl LockConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Glob patterns, relative to the site root, of directories to scan
    pub scan_paths: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        DiscoveryConfig {
            scan_paths: DEFAULT_SCAN_PATHS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Config {
    /// Load configuration from a single file.
    pub fn load(path: &Path) -> Result<Self> {
        let table = load_table(path)?;
        toml::Value::Table(table)
            .try_into()
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("failed to parse config")
    }

    /// Load the global config, then overlay the project config.
    ///
    /// Missing files are skipped; a file that exists but does not parse is
    /// an error.
    pub fn load_layered(global_path: Option<&Path>, project_path: &Path) -> Result<Self> {
        let mut merged = toml::Table::new();

        for path in global_path.into_iter().chain([project_path]) {
            if path.is_file() {
                tracing::debug!("loading config from {}", path.display());
                merge_tables(&mut merged, load_table(path)?);
            }
        }

        toml::Value::Table(merged)
            .try_into()
            .context("failed to parse merged config")
    }
}

fn load_table(path: &Path) -> Result<toml::Table> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;

    toml::from_str(&contents)
        .with_context(|| format!("failed to parse config: {}", path.display()))
}

/// Deep-merge `overlay` into `base`; overlay wins on scalar conflicts.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match value {
            toml::Value::Table(incoming) => {
                if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                    merge_tables(existing, incoming);
                    continue;
                }
                base.insert(key, toml::Value::Table(incoming));
            }
            value => {
                base.insert(key, value);
            }
        }
    }
}

/// Get the global config directory (~/.composer-manager).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(CONFIG_DIR_NAME))
}

/// Get the global config path (~/.composer-manager/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (<root>/.composer-manager/config.toml).
pub fn project_config_path(site_root: &Path) -> PathBuf {
    site_root.join(CONFIG_DIR_NAME).join("config.toml")
}
