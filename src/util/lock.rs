//! Named mutual-exclusion locks with a bounded wait.
//!
//! Regenerating the consolidated manifest is a read-merge-write sequence
//! that concurrent processes may race on. Callers take a [`LockGuard`]
//! around it; the guard releases the lock exactly once when dropped, on
//! both the success and the error path.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use fs4::fs_std::FileExt;
use thiserror::Error;
use tokio_retry::strategy::ExponentialBackoff;

/// First delay between lock attempts, in milliseconds.
pub const STARTING_BACKOFF_DELAY_MS: u64 = 10;

/// Upper bound on the delay between lock attempts, in milliseconds.
pub const MAX_BACKOFF_DELAY_MS: u64 = 500;

/// Growth factor of the delay between lock attempts.
const BACKOFF_BASE: u64 = 2;

/// Delays between lock attempts: 10ms, 20ms, 40ms... capped at 500ms.
pub fn backoff_schedule() -> ExponentialBackoff {
    ExponentialBackoff::from_millis(BACKOFF_BASE)
        .factor(STARTING_BACKOFF_DELAY_MS / BACKOFF_BASE)
        .max_delay(Duration::from_millis(MAX_BACKOFF_DELAY_MS))
}

/// A provider of named locks.
///
/// Locks are not reentrant: acquiring a name already held by the caller
/// waits like any other contender.
pub trait LockBackend {
    /// Try to take the lock `name`, waiting at most `timeout`.
    ///
    /// Returns `Ok(false)` when the wait ran out.
    fn acquire(&self, name: &str, timeout: Duration) -> io::Result<bool>;

    /// Release the lock `name`. Releasing a lock that is not held is a no-op.
    fn release(&self, name: &str);
}

impl<T: LockBackend + ?Sized> LockBackend for Arc<T> {
    fn acquire(&self, name: &str, timeout: Duration) -> io::Result<bool> {
        (**self).acquire(name, timeout)
    }

    fn release(&self, name: &str) {
        (**self).release(name)
    }
}

/// Errors raised while taking a lock.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("timeout waiting for lock `{name}` after {timeout:?}")]
    Timeout { name: String, timeout: Duration },

    #[error("failed to acquire lock `{name}`")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },
}

/// A held lock, released on drop.
pub struct LockGuard<'a> {
    backend: &'a dyn LockBackend,
    name: String,
}

impl<'a> LockGuard<'a> {
    /// Acquire `name` from `backend` or fail with [`LockError::Timeout`].
    pub fn acquire(
        backend: &'a dyn LockBackend,
        name: &str,
        timeout: Duration,
    ) -> Result<Self, LockError> {
        tracing::debug!("waiting for lock `{}`", name);

        match backend.acquire(name, timeout) {
            Ok(true) => {
                tracing::debug!("lock `{}` acquired", name);
                Ok(LockGuard {
                    backend,
                    name: name.to_string(),
                })
            }
            Ok(false) => Err(LockError::Timeout {
                name: name.to_string(),
                timeout,
            }),
            Err(source) => Err(LockError::Io {
                name: name.to_string(),
                source,
            }),
        }
    }

    /// Name of the held lock.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.backend.release(&self.name);
        tracing::debug!("lock `{}` released", self.name);
    }
}

/// Cross-process locks backed by OS advisory file locks.
///
/// Each name maps to `<dir>/<name>.lock`. Attempts are non-blocking and
/// retried with exponential backoff until the timeout.
#[derive(Debug)]
pub struct FileLockBackend {
    dir: PathBuf,
    held: Mutex<HashMap<String, File>>,
}

impl FileLockBackend {
    /// Keep lock files in `dir`, created on first use.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileLockBackend {
            dir: dir.into(),
            held: Mutex::new(HashMap::new()),
        }
    }

    /// Path of the lock file for `name`.
    pub fn lock_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.lock", name))
    }

    /// Directory holding the lock files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl LockBackend for FileLockBackend {
    fn acquire(&self, name: &str, timeout: Duration) -> io::Result<bool> {
        fs::create_dir_all(&self.dir)?;

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path(name))?;

        let start = Instant::now();
        let mut backoff = backoff_schedule();

        loop {
            // Contention is `Ok(false)`; anything else is a real failure.
            if file.try_lock_exclusive()? {
                self.held
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(name.to_string(), file);
                return Ok(true);
            }

            let remaining = timeout.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                return Ok(false);
            }
            let delay = backoff
                .next()
                .unwrap_or(Duration::from_millis(MAX_BACKOFF_DELAY_MS));
            thread::sleep(delay.min(remaining));
        }
    }

    fn release(&self, name: &str) {
        let file = self
            .held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);

        if let Some(file) = file {
            if let Err(e) = FileExt::unlock(&file) {
                tracing::warn!("failed to unlock {}: {}", self.lock_path(name).display(), e);
            }
        }
    }
}

/// In-process locks, for embedding hosts and tests.
#[derive(Debug, Default)]
pub struct MemoryLockBackend {
    held: Mutex<HashSet<String>>,
    released: Condvar,
}

impl MemoryLockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `name` is currently held.
    pub fn is_locked(&self, name: &str) -> bool {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(name)
    }
}

impl LockBackend for MemoryLockBackend {
    fn acquire(&self, name: &str, timeout: Duration) -> io::Result<bool> {
        let deadline = Instant::now() + timeout;
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);

        while held.contains(name) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(false);
            }
            held = self
                .released
                .wait_timeout(held, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }

        held.insert(name.to_string());
        Ok(true)
    }

    fn release(&self, name: &str) {
        let removed = self
            .held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
        if removed {
            self.released.notify_all();
        }
    }
}
