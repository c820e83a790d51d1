//! Composer Manager - consolidated Composer dependencies for a modular site
//!
//! Every enabled module may ship a `composer.json` fragment. This crate
//! discovers them, merges them into one consolidated manifest, and
//! reconciles the result against the packages actually installed.

pub mod core;
pub mod ops;
pub mod util;

/// Test utilities for Composer Manager unit tests.
///
/// Only available when compiling tests. Provides on-disk site fixtures and
/// an instrumented lock backend.
#[cfg(test)]
pub mod test_support;

pub use crate::core::{
    manifest::{Manifest, ManifestError, ManifestFile},
    package::{InstalledPackage, PackageInfo},
    stability::Stability,
};

pub use ops::registry::{PackageRegistry, RegistryError};
pub use util::context::GlobalContext;
