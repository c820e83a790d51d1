//! Installed packages as recorded in `vendor/composer/installed.json`.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::manifest::{ManifestError, ManifestFile};

/// Name, version and display metadata of one package.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PackageInfo {
    pub version: String,
    pub description: String,
    pub homepage: String,
}

/// Package name to package info, sorted by name.
pub type PackageTable = BTreeMap<String, PackageInfo>;

/// One record of an installed-package lock file.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct InstalledPackage {
    pub name: String,

    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,

    /// The package's own requirements; anything but an object is ignored.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub require: Value,
}

impl InstalledPackage {
    /// Create a record with no metadata and no requirements.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        InstalledPackage {
            name: name.into(),
            version: version.into(),
            description: None,
            homepage: None,
            require: Value::Null,
        }
    }

    /// Names of the packages this package requires.
    pub fn requires(&self) -> impl Iterator<Item = &str> {
        self.require
            .as_object()
            .into_iter()
            .flat_map(|deps| deps.keys().map(String::as_str))
    }

    /// Display info, with absent description and homepage as empty strings.
    pub fn info(&self) -> PackageInfo {
        PackageInfo {
            version: self.version.clone(),
            description: self.description.clone().unwrap_or_default(),
            homepage: self.homepage.clone().unwrap_or_default(),
        }
    }
}

/// The two shapes Composer has used for installed.json.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InstalledDocument {
    List(Vec<InstalledPackage>),
    Wrapped {
        #[serde(default)]
        packages: Vec<InstalledPackage>,
    },
}

/// Read the package records from an installed.json file.
///
/// Accepts both a bare list of records and an object with a `packages`
/// list. Records with an empty name are dropped.
pub fn read_installed(file: &mut ManifestFile) -> Result<Vec<InstalledPackage>, ManifestError> {
    let path = file.path().to_path_buf();
    let value = file.read_value()?;

    let document =
        InstalledDocument::deserialize(value).map_err(|source| ManifestError::Parse {
            path: path.clone(),
            source,
        })?;

    let packages = match document {
        InstalledDocument::List(packages) => packages,
        InstalledDocument::Wrapped { packages } => packages,
    };

    Ok(packages
        .into_iter()
        .filter(|pkg| {
            if pkg.name.trim().is_empty() {
                tracing::warn!("skipping package without a name in {}", path.display());
                false
            } else {
                true
            }
        })
        .collect())
}

/// Load installed package records, treating a missing file as empty.
pub fn load_installed(path: &Path) -> Result<Vec<InstalledPackage>, ManifestError> {
    let mut file = ManifestFile::new(path);
    if !file.exists() {
        tracing::debug!("no installed packages file at {}", path.display());
        return Ok(Vec::new());
    }
    read_installed(&mut file)
}

/// Build a name-keyed table; later records win on duplicate names.
pub fn package_table(packages: &[InstalledPackage]) -> PackageTable {
    packages
        .iter()
        .map(|pkg| (pkg.name.clone(), pkg.info()))
        .collect()
}
