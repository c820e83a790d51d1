//! Core data structures for Composer Manager.
//!
//! This module contains the foundational types:
//! - Manifest files and their cached reads
//! - Installed-package records
//! - Stability levels
//! - Module discovery

pub mod discovery;
pub mod manifest;
pub mod package;
pub mod stability;

pub use discovery::{FsModuleDiscovery, ModuleDiscovery, ModuleMap};
pub use manifest::{Manifest, ManifestError, ManifestFile};
pub use package::{InstalledPackage, PackageInfo, PackageTable};
pub use stability::Stability;
