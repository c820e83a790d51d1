//! Merging per-module `composer.json` fragments.
//!
//! Every module may ship a manifest fragment. The merger folds their
//! dependency-bearing properties into one consolidated manifest:
//!
//! - mapping properties (`require`, `conflict`, ...) are unioned, and when two
//!   modules name the same package the module merged last wins;
//! - `repositories` are appended, skipping ones already present;
//! - `minimum-stability` keeps the most permissive level seen.
//!
//! Fragments are merged in the order given; the registry sorts modules by
//! name so the output is reproducible.

use serde_json::Value;

use crate::core::manifest::Manifest;
use crate::core::package::PackageTable;
use crate::core::stability::Stability;

/// Mapping-valued properties, in the order they are written out.
pub const MAPPING_PROPERTIES: &[&str] = &[
    "require",
    "require-dev",
    "conflict",
    "replace",
    "provide",
    "suggest",
];

pub const REPOSITORIES: &str = "repositories";
pub const MINIMUM_STABILITY: &str = "minimum-stability";

/// Core packages that must never be replaced.
///
/// Core ships only the `TranslatorInterface` of symfony/translation, so the
/// full package still has to be installed when a module requires it.
pub const PARTIAL_CORE_PACKAGES: &[&str] = &["symfony/translation"];

/// Replacement constraints for core packages bundled at `dev-master`.
pub const DEV_MASTER_PINS: &[(&str, &str)] = &[
    ("doctrine/annotations", ">=1.1.2"),
    ("doctrine/common", ">=2.4.1"),
    ("phpunit/phpunit-mock-objects", ">=2.1.5"),
    ("symfony/yaml", ">=2.4.1"),
];

const DEV_MASTER_PREFIX: &str = "dev-master";

/// Accumulates manifest fragments into one consolidated manifest.
#[derive(Debug, Clone)]
pub struct ManifestMerger {
    mappings: Vec<(String, Manifest)>,
    repositories: Vec<Value>,
    minimum_stability: Option<Stability>,
    current_module: Option<String>,
}

impl Default for ManifestMerger {
    fn default() -> Self {
        ManifestMerger {
            mappings: MAPPING_PROPERTIES
                .iter()
                .map(|name| (name.to_string(), Manifest::new()))
                .collect(),
            repositories: Vec::new(),
            minimum_stability: None,
            current_module: None,
        }
    }
}

impl ManifestMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge every supported property of one module's manifest.
    pub fn merge_fragment(&mut self, module: &str, manifest: &Manifest) -> &mut Self {
        self.current_module = Some(module.to_string());

        for property in MAPPING_PROPERTIES {
            self.merge_property(manifest, property);
        }
        self.merge_property(manifest, REPOSITORIES)
            .merge_minimum_stability(manifest);

        self.current_module = None;
        self
    }

    /// Merge one property of `manifest` into the accumulator.
    ///
    /// `repositories` is appended with de-duplication, `minimum-stability`
    /// is delegated to [`merge_minimum_stability`](Self::merge_minimum_stability),
    /// anything else is treated as a package mapping.
    pub fn merge_property(&mut self, manifest: &Manifest, property: &str) -> &mut Self {
        let Some(value) = manifest.get(property) else {
            return self;
        };

        match property {
            REPOSITORIES => self.merge_repositories(value),
            MINIMUM_STABILITY => {
                self.merge_minimum_stability(manifest);
            }
            _ => self.merge_mapping(property, value),
        }
        self
    }

    /// Keep the most permissive `minimum-stability` seen so far.
    pub fn merge_minimum_stability(&mut self, manifest: &Manifest) -> &mut Self {
        let Some(value) = manifest.get(MINIMUM_STABILITY) else {
            return self;
        };

        match value.as_str().map(str::parse::<Stability>) {
            Some(Ok(stability)) => {
                self.minimum_stability = Some(match self.minimum_stability {
                    Some(current) => current.most_permissive(stability),
                    None => stability,
                });
            }
            Some(Err(e)) => {
                tracing::warn!("{}: ignoring {}", self.origin(), e);
            }
            None => {
                tracing::warn!(
                    "{}: ignoring non-string `{}`",
                    self.origin(),
                    MINIMUM_STABILITY
                );
            }
        }
        self
    }

    /// Replace every core package, so Composer does not install a second copy.
    ///
    /// Used when packages are installed somewhere other than core's own
    /// vendor directory. Partial core packages are left out, and core
    /// packages bundled at `dev-master` get a real minimum version instead.
    pub fn replace_core_packages(&mut self, core: &PackageTable) -> &mut Self {
        let replace = self.property_mut("replace");

        for (name, package) in core {
            replace.insert(name.clone(), Value::String(package.version.clone()));
        }

        for name in PARTIAL_CORE_PACKAGES {
            replace.shift_remove(*name);
        }

        for (name, constraint) in DEV_MASTER_PINS {
            if let Some(Value::String(version)) = replace.get_mut(*name) {
                if version.starts_with(DEV_MASTER_PREFIX) {
                    tracing::debug!("pinning replaced `{}` {} to {}", name, version, constraint);
                    *version = constraint.to_string();
                }
            }
        }

        self
    }

    /// The accumulated value of a mapping property.
    pub fn property(&self, name: &str) -> Option<&Manifest> {
        self.mappings
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, map)| map)
    }

    /// Mutable access to a mapping property, creating it when missing.
    pub fn property_mut(&mut self, name: &str) -> &mut Manifest {
        let index = match self.mappings.iter().position(|(n, _)| n == name) {
            Some(index) => index,
            None => {
                self.mappings.push((name.to_string(), Manifest::new()));
                self.mappings.len() - 1
            }
        };
        &mut self.mappings[index].1
    }

    /// Accumulated repositories, in first-seen order.
    pub fn repositories(&self) -> &[Value] {
        &self.repositories
    }

    /// The most permissive stability seen, if any manifest declared one.
    pub fn minimum_stability(&self) -> Option<Stability> {
        self.minimum_stability
    }

    /// Render the consolidated manifest.
    ///
    /// `require` is always present; other properties only when non-empty.
    pub fn to_manifest(&self) -> Manifest {
        let mut out = Manifest::new();

        for (name, map) in &self.mappings {
            if name == "require" || !map.is_empty() {
                out.insert(name.clone(), Value::Object(map.clone()));
            }
        }

        if !self.repositories.is_empty() {
            out.insert(
                REPOSITORIES.to_string(),
                Value::Array(self.repositories.clone()),
            );
        }

        if let Some(stability) = self.minimum_stability {
            out.insert(
                MINIMUM_STABILITY.to_string(),
                Value::String(stability.as_str().to_string()),
            );
        }

        out
    }

    /// Consume the merger and render the consolidated manifest.
    pub fn into_manifest(self) -> Manifest {
        self.to_manifest()
    }

    fn merge_mapping(&mut self, property: &str, value: &Value) {
        let Some(entries) = value.as_object() else {
            tracing::warn!(
                "{}: ignoring `{}`, expected an object",
                self.origin(),
                property
            );
            return;
        };

        let origin = self.origin();
        let target = self.property_mut(property);
        for (package, constraint) in entries {
            if let Some(previous) = target.insert(package.clone(), constraint.clone()) {
                if &previous != constraint {
                    tracing::debug!(
                        "{}: `{}` {} overrides {}",
                        origin,
                        property,
                        package,
                        previous
                    );
                }
            }
        }
    }

    fn merge_repositories(&mut self, value: &Value) {
        match value {
            Value::Array(repos) => {
                for repo in repos {
                    self.add_repository(repo.clone());
                }
            }
            Value::Object(named) => {
                for (name, repo) in named {
                    let repo = if repo.is_object() {
                        repo.clone()
                    } else {
                        let mut single = Manifest::new();
                        single.insert(name.clone(), repo.clone());
                        Value::Object(single)
                    };
                    self.add_repository(repo);
                }
            }
            _ => {
                tracing::warn!(
                    "{}: ignoring `{}`, expected a list",
                    self.origin(),
                    REPOSITORIES
                );
            }
        }
    }

    fn add_repository(&mut self, repo: Value) {
        let duplicate = match repository_key(&repo) {
            Some(key) => self
                .repositories
                .iter()
                .any(|r| repository_key(r).as_ref() == Some(&key)),
            None => self.repositories.contains(&repo),
        };

        if !duplicate {
            self.repositories.push(repo);
        }
    }

    fn origin(&self) -> String {
        match self.current_module {
            Some(ref module) => format!("module `{}`", module),
            None => "manifest".to_string(),
        }
    }
}

/// `(type, url)` identity of a repository descriptor, when it has both.
fn repository_key(repo: &Value) -> Option<(&str, &str)> {
    let repo = repo.as_object()?;
    Some((repo.get("type")?.as_str()?, repo.get("url")?.as_str()?))
}
