//! Global context for Composer Manager operations.
//!
//! Holds the site root and the loaded configuration, and derives every
//! path the rest of the crate touches. It is passed explicitly to the
//! registry; nothing reads the site layout from ambient state.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::util::config::{self, Config, CONFIG_DIR_NAME};
use crate::util::fs::normalize_path;

/// File name of the consolidated manifest.
pub const COMPOSER_JSON: &str = "composer.json";

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Site root directory
    root: PathBuf,

    /// Loaded configuration
    config: Config,
}

impl GlobalContext {
    /// Create a context for the site at `root`, loading layered config.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let global = config::global_config_path();
        let config = Config::load_layered(global.as_deref(), &config::project_config_path(&root))?;

        Ok(GlobalContext {
            root,
            config,
        })
    }

    /// Create a context for the current working directory.
    pub fn from_cwd() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Self::new(cwd)
    }

    /// Create a context with an explicit configuration.
    pub fn with_config(root: impl Into<PathBuf>, config: Config) -> Self {
        GlobalContext {
            root: root.into(),
            config,
        }
    }

    /// Get the site root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Directory holding the consolidated composer.json and composer.lock.
    pub fn composer_dir(&self) -> PathBuf {
        self.resolve(&self.config.paths.composer_dir)
    }

    /// Path of the consolidated composer.json.
    pub fn composer_json_path(&self) -> PathBuf {
        self.composer_dir().join(COMPOSER_JSON)
    }

    /// Vendor directory packages are installed into.
    pub fn vendor_dir(&self) -> PathBuf {
        self.resolve(&self.config.paths.vendor_dir)
    }

    /// Vendor directory bundled with core.
    pub fn core_vendor_dir(&self) -> PathBuf {
        self.resolve(&self.config.paths.core_vendor_dir)
    }

    /// Whether packages are installed into core's own vendor directory.
    pub fn uses_core_vendor_dir(&self) -> bool {
        normalize_path(&self.vendor_dir()) == normalize_path(&self.core_vendor_dir())
    }

    /// Path of the Composer autoloader.
    pub fn autoload_path(&self) -> PathBuf {
        self.vendor_dir().join("autoload.php")
    }

    /// Installed-package records of the vendor directory.
    pub fn installed_json_path(&self) -> PathBuf {
        self.vendor_dir().join("composer").join("installed.json")
    }

    /// Installed-package records of the packages bundled with core.
    pub fn core_installed_json_path(&self) -> PathBuf {
        self.core_vendor_dir().join("composer").join("installed.json")
    }

    /// Directory for cross-process lock files.
    pub fn lock_dir(&self) -> PathBuf {
        self.root.join(CONFIG_DIR_NAME).join("locks")
    }

    /// How long to wait for the write lock.
    pub fn lock_timeout(&self) -> Duration {
        self.config.lock.timeout()
    }

    /// Whether the consolidated manifest should be rebuilt automatically.
    pub fn autobuild(&self) -> bool {
        self.config.build.autobuild
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_context_paths() {
        let tmp = TempDir::new().unwrap();
        let ctx = GlobalContext::with_config(tmp.path(), Config::default());

        assert_eq!(
            ctx.composer_json_path(),
            tmp.path().join("sites/default/files/composer/composer.json")
        );
        assert_eq!(
            ctx.installed_json_path(),
            tmp.path().join("vendor/composer/installed.json")
        );
        assert_eq!(
            ctx.core_installed_json_path(),
            tmp.path().join("core/vendor/composer/installed.json")
        );
        assert_eq!(ctx.autoload_path(), tmp.path().join("vendor/autoload.php"));
        assert!(!ctx.uses_core_vendor_dir());
    }

    #[test]
    fn test_absolute_paths_are_kept() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.paths.vendor_dir = tmp.path().join("elsewhere");

        let ctx = GlobalContext::with_config("/srv/site", config);
        assert_eq!(ctx.vendor_dir(), tmp.path().join("elsewhere"));
    }

    #[test]
    fn test_core_vendor_dir_detection() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.paths.vendor_dir = PathBuf::from("core/vendor");

        let ctx = GlobalContext::with_config(tmp.path(), config);
        assert!(ctx.uses_core_vendor_dir());
    }

    #[test]
    fn test_new_reads_project_config() {
        let tmp = TempDir::new().unwrap();
        let config_path = config::project_config_path(tmp.path());
        std::fs::create_dir_all(config_path.parent().unwrap()).unwrap();
        std::fs::write(&config_path, "[build]\nautobuild = false\n").unwrap();

        let ctx = GlobalContext::new(tmp.path()).unwrap();
        assert!(!ctx.autobuild());
        assert_eq!(ctx.root(), tmp.path());
    }
}
