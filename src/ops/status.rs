//! Package status report.
//!
//! Joins the requirement, installed and dependents indices into one row
//! per package, for display by the CLI or serialization as JSON.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::ops::registry::{PackageRegistry, Result, CORE_REQUESTER};

/// Where a package stands relative to the module requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageState {
    /// Installed, and either required, bundled with core or depended on.
    Installed,
    /// Required by a module but not installed.
    Missing,
    /// Installed from the lock file but nothing needs it.
    Extraneous,
}

impl fmt::Display for PackageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageState::Installed => write!(f, "installed"),
            PackageState::Missing => write!(f, "missing"),
            PackageState::Extraneous => write!(f, "extraneous"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageStatus {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub installed_version: Option<String>,

    /// Version constraint to the modules requiring it.
    pub required: BTreeMap<String, Vec<String>>,

    /// Installed packages that require this one.
    pub dependents: Vec<String>,

    pub state: PackageState,
}

impl PackageStatus {
    /// Every module requesting this package, without duplicates.
    pub fn requesters(&self) -> BTreeSet<&str> {
        self.required
            .values()
            .flatten()
            .map(String::as_str)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub packages: Vec<PackageStatus>,

    /// The consolidated composer.json is missing or out of date.
    pub stale: bool,
}

impl StatusReport {
    pub fn missing(&self) -> impl Iterator<Item = &PackageStatus> {
        self.with_state(PackageState::Missing)
    }

    pub fn extraneous(&self) -> impl Iterator<Item = &PackageStatus> {
        self.with_state(PackageState::Extraneous)
    }

    /// Nothing missing and the consolidated manifest is current.
    pub fn is_clean(&self) -> bool {
        !self.stale && self.missing().next().is_none()
    }

    fn with_state(&self, state: PackageState) -> impl Iterator<Item = &PackageStatus> {
        self.packages.iter().filter(move |p| p.state == state)
    }
}

/// Build the status report for the site behind `registry`.
pub fn status(registry: &PackageRegistry) -> Result<StatusReport> {
    let mut required = registry.get_required()?;
    let installed = registry.get_installed()?;
    let mut dependents = registry.get_dependencies()?;
    let core = registry.core_packages()?;

    let names: BTreeSet<String> = required
        .keys()
        .chain(installed.keys())
        .cloned()
        .collect();

    let packages = names
        .into_iter()
        .map(|name| {
            let required = required.remove(&name).unwrap_or_default();
            let dependents = dependents.remove(&name).unwrap_or_default();
            let installed_version = installed.get(&name).map(|info| info.version.clone());

            let required_by_module = required
                .values()
                .flatten()
                .any(|requester| requester != CORE_REQUESTER);

            let state = match installed_version {
                None => PackageState::Missing,
                Some(_) if core.contains_key(&name) => PackageState::Installed,
                Some(_) if !required_by_module && dependents.is_empty() => {
                    PackageState::Extraneous
                }
                Some(_) => PackageState::Installed,
            };

            PackageStatus {
                name,
                installed_version,
                required,
                dependents,
                state,
            }
        })
        .collect();

    let stale = registry.is_composer_json_stale()?;
    tracing::debug!("composer.json stale: {}", stale);

    Ok(StatusReport { packages, stale })
}
