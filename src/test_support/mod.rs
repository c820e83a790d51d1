//! Test utilities for Composer Manager unit tests.
//!
//! Provides on-disk site fixtures and a lock backend that records how it
//! was used.
//!
//! # Example
//!
//! ```rust,ignore
//! use composer_manager::test_support::SiteFixture;
//!
//! let site = SiteFixture::new();
//! site.module_with_manifest("foo", json!({"require": {"a/b": "1.0"}}));
//! let registry = PackageRegistry::for_site(site.context());
//! ```

pub mod fixtures;

use std::io;
use std::sync::Mutex;
use std::time::Duration;

pub use fixtures::*;

use crate::util::lock::{LockBackend, MemoryLockBackend};

/// An in-memory lock backend that counts acquisitions and releases.
#[derive(Debug, Default)]
pub struct CountingLockBackend {
    inner: MemoryLockBackend,
    events: Mutex<Vec<String>>,
}

impl CountingLockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call seen so far, as `acquire:<name>` or `release:<name>`.
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    /// Number of releases of `name`.
    pub fn releases(&self, name: &str) -> usize {
        let wanted = format!("release:{}", name);
        self.events().iter().filter(|e| **e == wanted).count()
    }

    /// Whether `name` is currently held.
    pub fn is_locked(&self, name: &str) -> bool {
        self.inner.is_locked(name)
    }
}

impl LockBackend for CountingLockBackend {
    fn acquire(&self, name: &str, timeout: Duration) -> io::Result<bool> {
        self.events.lock().unwrap().push(format!("acquire:{}", name));
        self.inner.acquire(name, timeout)
    }

    fn release(&self, name: &str) {
        self.events.lock().unwrap().push(format!("release:{}", name));
        self.inner.release(name)
    }
}
