//! Module and install-profile discovery.
//!
//! The host application is made of extensions, each a directory holding a
//! `<name>.info.yml` file whose `type:` key says whether it is a module or an
//! install profile. [`ModuleDiscovery`] is the seam the registry scans
//! through; [`FsModuleDiscovery`] walks the site tree.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::glob;
use serde::Deserialize;
use walkdir::{DirEntry, WalkDir};

/// Extension name to extension directory, sorted by name.
pub type ModuleMap = BTreeMap<String, PathBuf>;

/// Profiles shipped with core. Core already bundles their requirements.
pub const CORE_PROFILES: &[&str] = &["minimal", "standard", "testing", "testing_multilingual"];

/// Default directories scanned for extensions, relative to the site root.
pub const DEFAULT_SCAN_PATHS: &[&str] = &[
    "core/modules",
    "core/profiles",
    "modules",
    "profiles",
    "sites/*/modules",
];

const INFO_SUFFIX: &str = ".info.yml";

/// Kind of extension declared by an info file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionKind {
    Module,
    Profile,
}

impl ExtensionKind {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "module" => Some(ExtensionKind::Module),
            "profile" => Some(ExtensionKind::Profile),
            _ => None,
        }
    }
}

/// Enumerates the extensions of a site.
pub trait ModuleDiscovery {
    /// All install profiles.
    fn profiles(&self) -> Result<ModuleMap>;

    /// All modules. Modules living inside a profile directory are only
    /// returned when that directory is listed in `profile_dirs`.
    fn modules(&self, profile_dirs: &[PathBuf]) -> Result<ModuleMap>;

    /// Directory of a single module, looking inside every profile.
    fn module_path(&self, name: &str) -> Result<Option<PathBuf>> {
        let profile_dirs: Vec<PathBuf> = self.profiles()?.into_values().collect();
        Ok(self.modules(&profile_dirs)?.remove(name))
    }
}

/// Discovers extensions by walking directories under the site root.
#[derive(Debug, Clone)]
pub struct FsModuleDiscovery {
    root: PathBuf,
    scan_paths: Vec<String>,
}

impl FsModuleDiscovery {
    /// Scan the default directories under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsModuleDiscovery {
            root: root.into(),
            scan_paths: DEFAULT_SCAN_PATHS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Replace the scanned directories (glob patterns relative to the root).
    pub fn with_scan_paths(mut self, scan_paths: Vec<String>) -> Self {
        self.scan_paths = scan_paths;
        self
    }

    /// The site root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Expand the scan patterns into existing directories.
    fn scan_roots(&self) -> Result<Vec<PathBuf>> {
        let mut roots = Vec::new();

        for pattern in &self.scan_paths {
            let full_pattern = self.root.join(pattern);
            let pattern_str = full_pattern.to_string_lossy();

            for entry in
                glob(&pattern_str).with_context(|| format!("invalid scan path: {}", pattern))?
            {
                match entry {
                    Ok(path) if path.is_dir() => roots.push(path),
                    Ok(_) => {}
                    Err(e) => tracing::warn!("glob error: {}", e),
                }
            }
        }

        // Nested roots (e.g. `core/profiles` inside `core`) would be walked twice.
        roots.sort();
        roots.dedup();
        let nested: Vec<PathBuf> = roots
            .iter()
            .filter(|r| roots.iter().any(|o| o != *r && r.starts_with(o)))
            .cloned()
            .collect();
        roots.retain(|r| !nested.contains(r));

        Ok(roots)
    }

    /// Find every extension of `kind`; the first occurrence of a name wins.
    fn scan(&self, kind: ExtensionKind) -> Result<ModuleMap> {
        let mut found = ModuleMap::new();

        for root in self.scan_roots()? {
            let walker = WalkDir::new(&root)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| e.depth() == 0 || !is_skipped(e));

            for entry in walker {
                let entry = entry
                    .with_context(|| format!("failed to walk directory: {}", root.display()))?;
                if !entry.file_type().is_file() {
                    continue;
                }

                let Some(name) = extension_name(entry.path()) else {
                    continue;
                };
                if read_kind(entry.path())? != Some(kind) {
                    continue;
                }

                let dir = entry
                    .path()
                    .parent()
                    .unwrap_or(&self.root)
                    .to_path_buf();

                if let Some(existing) = found.get(&name) {
                    tracing::debug!(
                        "ignoring duplicate extension `{}` at {} (already found at {})",
                        name,
                        dir.display(),
                        existing.display()
                    );
                    continue;
                }
                found.insert(name, dir);
            }
        }

        Ok(found)
    }
}

impl ModuleDiscovery for FsModuleDiscovery {
    fn profiles(&self) -> Result<ModuleMap> {
        self.scan(ExtensionKind::Profile)
    }

    fn modules(&self, profile_dirs: &[PathBuf]) -> Result<ModuleMap> {
        let all_profiles = self.profiles()?;
        let mut modules = self.scan(ExtensionKind::Module)?;

        modules.retain(|name, path| {
            let owner = all_profiles.values().find(|dir| path.starts_with(dir));
            match owner {
                Some(dir) if !profile_dirs.iter().any(|p| p == dir) => {
                    tracing::debug!("skipping module `{}` of unselected profile", name);
                    false
                }
                _ => true,
            }
        });

        Ok(modules)
    }
}

fn is_skipped(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || name == "vendor" || name == "node_modules"
}

/// `foo.info.yml` -> `foo`.
fn extension_name(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    let name = file_name.strip_suffix(INFO_SUFFIX)?;
    (!name.is_empty()).then(|| name.to_string())
}

/// The part of an `.info.yml` file discovery cares about.
#[derive(Debug, Deserialize)]
struct InfoFile {
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// Read the top-level `type:` key of an info file.
///
/// A file that is not valid YAML is skipped with a warning.
fn read_kind(path: &Path) -> Result<Option<ExtensionKind>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read info file: {}", path.display()))?;

    match serde_yaml::from_str::<InfoFile>(&content) {
        Ok(info) => Ok(info.kind.as_deref().and_then(ExtensionKind::parse)),
        Err(e) => {
            tracing::warn!("skipping unparseable info file {}: {}", path.display(), e);
            Ok(None)
        }
    }
}
