//! Package registry: the orchestration layer of Composer Manager.
//!
//! The registry ties together module discovery, manifest merging, the
//! write lock and the installed-package lock files. It answers the
//! reconciliation questions (what is required, what is installed, what is
//! missing) and regenerates the consolidated `composer.json`.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use miette::Diagnostic as MietteDiagnostic;
use serde_json::Value;
use thiserror::Error;

use crate::core::discovery::{FsModuleDiscovery, ModuleDiscovery, CORE_PROFILES};
use crate::core::manifest::{to_pretty_json, Manifest, ManifestError, ManifestFile};
use crate::core::package::{load_installed, package_table, InstalledPackage, PackageTable};
use crate::ops::hooks::{HookReport, InstallHooks};
use crate::ops::merge::ManifestMerger;
use crate::util::context::{GlobalContext, COMPOSER_JSON};
use crate::util::diagnostic::{suggestions, Diagnostic};
use crate::util::hash::sha256_bytes;
use crate::util::lock::{FileLockBackend, LockBackend, LockError, LockGuard};

/// Requester recorded for packages bundled with core.
pub const CORE_REQUESTER: &str = "drupal";

/// Name of the lock serializing writes of the consolidated manifest.
pub const WRITE_LOCK_NAME: &str = "write_composer_json_file";

/// Package name to version constraint to the modules requiring it.
pub type RequiredIndex = BTreeMap<String, BTreeMap<String, Vec<String>>>;

/// Package name to installed package info.
pub type InstalledIndex = PackageTable;

/// Package name to the installed packages that require it.
pub type DependentsIndex = BTreeMap<String, Vec<String>>;

/// Module name to that module's composer.json.
pub type ComposerFiles = BTreeMap<String, ManifestFile>;

/// Errors raised by registry operations.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum RegistryError {
    #[error("timed out after {timeout:?} waiting for lock `{name}`")]
    #[diagnostic(
        code(composer_manager::lock::timeout),
        help("Another process is rebuilding composer.json; try again once it finishes")
    )]
    LockTimeout { name: String, timeout: Duration },

    #[error(transparent)]
    #[diagnostic(code(composer_manager::lock::io))]
    Lock(LockError),

    #[error(transparent)]
    #[diagnostic(code(composer_manager::manifest))]
    Manifest(#[from] ManifestError),

    #[error("module discovery failed: {0:#}")]
    #[diagnostic(
        code(composer_manager::discovery),
        help("Check `discovery.scan_paths` in .composer-manager/config.toml")
    )]
    Discovery(anyhow::Error),
}

impl From<LockError> for RegistryError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::Timeout { name, timeout } => RegistryError::LockTimeout { name, timeout },
            err => RegistryError::Lock(err),
        }
    }
}

impl RegistryError {
    /// Whether the write lock could not be taken in time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, RegistryError::LockTimeout { .. })
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            RegistryError::LockTimeout { name, timeout } => Diagnostic::error(format!(
                "timed out after {}s waiting for lock `{}`",
                timeout.as_secs(),
                name
            ))
            .with_suggestion(suggestions::LOCK_TIMEOUT),

            RegistryError::Lock(err) => {
                let mut diag = Diagnostic::error(err.to_string());
                if let Some(source) = std::error::Error::source(err) {
                    diag = diag.with_context(source.to_string());
                }
                diag
            }

            RegistryError::Manifest(err) => {
                let diag = Diagnostic::error(err.to_string()).with_location(err.path());
                match err {
                    ManifestError::Parse { .. } => {
                        diag.with_suggestion(suggestions::INVALID_JSON)
                    }
                    ManifestError::NotWritable { .. } | ManifestError::Write { .. } => {
                        let diag = match std::error::Error::source(err) {
                            Some(source) => diag.with_context(source.to_string()),
                            None => diag,
                        };
                        diag.with_suggestion(suggestions::NOT_WRITABLE)
                    }
                    ManifestError::Read { source, .. } => diag.with_context(source.to_string()),
                    _ => diag,
                }
            }

            RegistryError::Discovery(err) => {
                let mut diag = Diagnostic::error("module discovery failed");
                for cause in err.chain() {
                    diag = diag.with_context(cause.to_string());
                }
                diag
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;

/// Reconciles module requirements with installed packages.
pub struct PackageRegistry {
    ctx: GlobalContext,
    discovery: Box<dyn ModuleDiscovery>,
    lock: Box<dyn LockBackend>,
    hooks: InstallHooks,
}

impl PackageRegistry {
    /// Create a registry from explicit collaborators.
    pub fn new(
        ctx: GlobalContext,
        discovery: Box<dyn ModuleDiscovery>,
        lock: Box<dyn LockBackend>,
    ) -> Self {
        PackageRegistry {
            ctx,
            discovery,
            lock,
            hooks: InstallHooks::new(),
        }
    }

    /// Create a registry that scans the site on disk and locks with files.
    pub fn for_site(ctx: GlobalContext) -> Self {
        let discovery = FsModuleDiscovery::new(ctx.root())
            .with_scan_paths(ctx.config().discovery.scan_paths.clone());
        let lock = FileLockBackend::new(ctx.lock_dir());
        Self::new(ctx, Box::new(discovery), Box::new(lock))
    }

    /// Replace the install hooks.
    pub fn with_hooks(mut self, hooks: InstallHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn hooks_mut(&mut self) -> &mut InstallHooks {
        &mut self.hooks
    }

    pub fn context(&self) -> &GlobalContext {
        &self.ctx
    }

    pub fn lock_backend(&self) -> &dyn LockBackend {
        self.lock.as_ref()
    }

    /// Packages bundled with core, read from the core vendor directory.
    pub fn core_packages(&self) -> Result<PackageTable> {
        let packages = load_installed(&self.ctx.core_installed_json_path())?;
        Ok(package_table(&packages))
    }

    /// Package records of the vendor directory's lock file.
    pub fn installed_packages(&self) -> Result<Vec<InstalledPackage>> {
        Ok(load_installed(&self.ctx.installed_json_path())?)
    }

    /// Core packages overlaid with the lock file's packages.
    pub fn get_installed(&self) -> Result<InstalledIndex> {
        let mut installed = self.core_packages()?;
        for package in self.installed_packages()? {
            installed.insert(package.name.clone(), package.info());
        }
        Ok(installed)
    }

    /// Which modules require which packages, at which constraints.
    ///
    /// Core packages are attributed to [`CORE_REQUESTER`].
    pub fn get_required(&self) -> Result<RequiredIndex> {
        let mut required = RequiredIndex::new();

        for (name, package) in self.core_packages()? {
            add_requirement(&mut required, &name, &package.version, CORE_REQUESTER);
        }

        for (module, mut file) in self.composer_json_files()? {
            let manifest = file.read()?;
            let Some(requires) = manifest.get("require").and_then(Value::as_object) else {
                continue;
            };
            for (name, constraint) in requires {
                if name.trim().is_empty() {
                    tracing::warn!("skipping empty package name required by `{}`", module);
                    continue;
                }
                add_requirement(&mut required, name, &constraint_str(constraint), &module);
            }
        }

        Ok(required)
    }

    /// For each package, the installed packages that require it.
    pub fn get_dependencies(&self) -> Result<DependentsIndex> {
        let mut dependents = DependentsIndex::new();

        for package in self.installed_packages()? {
            for dependency in package.requires() {
                dependents
                    .entry(dependency.to_string())
                    .or_default()
                    .push(package.name.clone());
            }
        }

        Ok(dependents)
    }

    /// Required packages that are not installed, in requirement order.
    pub fn get_install_required(&self) -> Result<Vec<String>> {
        let installed = self.get_installed()?;
        Ok(self
            .get_required()?
            .into_keys()
            .filter(|name| !installed.contains_key(name))
            .collect())
    }

    /// The composer.json of every enabled module that ships one.
    ///
    /// Modules inside core install profiles are left out.
    pub fn composer_json_files(&self) -> Result<ComposerFiles> {
        let profiles = self.discovery.profiles().map_err(RegistryError::Discovery)?;
        let profile_dirs: Vec<PathBuf> = profiles
            .into_iter()
            .filter(|(name, _)| !CORE_PROFILES.contains(&name.as_str()))
            .map(|(_, dir)| dir)
            .collect();

        let modules = self
            .discovery
            .modules(&profile_dirs)
            .map_err(RegistryError::Discovery)?;

        let mut files = ComposerFiles::new();
        for (name, dir) in modules {
            let file = ManifestFile::new(dir.join(COMPOSER_JSON));
            if file.exists() {
                tracing::debug!("found {}", file.path().display());
                files.insert(name, file);
            }
        }
        Ok(files)
    }

    /// Merge module manifests into the consolidated manifest.
    ///
    /// Fragments are merged in module-name order. When packages are not
    /// installed into core's vendor directory, core packages are added to
    /// `replace`.
    pub fn merge_composer_json_files(&self, files: &mut ComposerFiles) -> Result<Manifest> {
        let mut merger = ManifestMerger::new();

        for (module, file) in files.iter_mut() {
            merger.merge_fragment(module, file.read()?);
        }

        if !self.ctx.uses_core_vendor_dir() {
            merger.replace_core_packages(&self.core_packages()?);
        }

        Ok(merger.into_manifest())
    }

    /// Discover and merge, without writing anything.
    pub fn render_composer_json(&self) -> Result<Manifest> {
        let mut files = self.composer_json_files()?;
        self.merge_composer_json_files(&mut files)
    }

    /// Regenerate the consolidated composer.json under the write lock.
    ///
    /// Returns the number of bytes written.
    pub fn write_composer_json_file(&self) -> Result<usize> {
        let _guard = LockGuard::acquire(
            self.lock.as_ref(),
            WRITE_LOCK_NAME,
            self.ctx.lock_timeout(),
        )?;

        let manifest = self.render_composer_json()?;

        let dir = self.ctx.composer_dir();
        fs::create_dir_all(&dir).map_err(|source| ManifestError::Write {
            path: dir.clone(),
            source,
        })?;

        let file = ManifestFile::new(dir.join(COMPOSER_JSON));
        let bytes = file.write(&manifest)?;
        tracing::info!("wrote {} ({} bytes)", file.path().display(), bytes);

        Ok(bytes)
    }

    /// Whether any of `modules` ships a composer.json.
    pub fn have_changes(&self, modules: &[&str]) -> Result<bool> {
        for module in modules {
            let Some(dir) = self
                .discovery
                .module_path(module)
                .map_err(RegistryError::Discovery)?
            else {
                tracing::debug!("unknown module `{}`", module);
                continue;
            };
            if dir.join(COMPOSER_JSON).is_file() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Whether the consolidated composer.json is missing or out of date.
    pub fn is_composer_json_stale(&self) -> Result<bool> {
        let path = self.ctx.composer_json_path();
        if !path.is_file() {
            return Ok(true);
        }

        let manifest = self.render_composer_json()?;
        let fresh = to_pretty_json(&manifest).map_err(|source| ManifestError::Encode {
            path: path.clone(),
            source,
        })?;
        let on_disk = fs::read(&path).map_err(|source| ManifestError::Read {
            path: path.clone(),
            source,
        })?;

        Ok(sha256_bytes(&fresh) != sha256_bytes(&on_disk))
    }

    /// Fire every install hook and report the ones that failed.
    pub fn dependencies_installed(&self) -> HookReport {
        tracing::info!("running {} install hook(s)", self.hooks.len());
        self.hooks.run()
    }
}

fn add_requirement(index: &mut RequiredIndex, name: &str, constraint: &str, requester: &str) {
    index
        .entry(name.to_string())
        .or_default()
        .entry(constraint.to_string())
        .or_default()
        .push(requester.to_string());
}

fn constraint_str(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
