//! High-level operations.
//!
//! This module contains the implementation of Composer Manager commands.

pub mod hooks;
pub mod merge;
pub mod registry;
pub mod status;

pub use hooks::{HookReport, InstallHooks};
pub use merge::ManifestMerger;
pub use registry::{
    ComposerFiles, DependentsIndex, InstalledIndex, PackageRegistry, RegistryError,
    RequiredIndex, CORE_REQUESTER, WRITE_LOCK_NAME,
};
pub use status::{status, PackageState, PackageStatus, StatusReport};
