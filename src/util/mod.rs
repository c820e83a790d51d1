//! Shared utilities

pub mod config;
pub mod context;
pub mod diagnostic;
pub mod fs;
pub mod hash;
pub mod lock;

pub use config::Config;
pub use context::GlobalContext;
pub use diagnostic::Diagnostic;
pub use lock::{FileLockBackend, LockBackend, LockGuard, MemoryLockBackend};
