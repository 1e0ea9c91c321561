//! Per-library lock registry
//!
//! All mutations within one library (chunk create/update/delete, index
//! build) serialize on that library's lock; operations on different
//! libraries proceed in parallel. Locks are reentrant so the build path can
//! call into storage helpers that take the same lock. The registry mutex
//! guards only lookup/creation, never the held lock itself.
//!
//! Locks are never removed automatically; `remove` is an explicit admin
//! operation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, ReentrantMutex};

#[derive(Default)]
pub struct LockManager {
    locks: Mutex<HashMap<String, Arc<ReentrantMutex<()>>>>,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock for `library_id`, lazily created.
    pub fn get(&self, library_id: &str) -> Arc<ReentrantMutex<()>> {
        let mut locks = self.locks.lock();
        locks
            .entry(library_id.to_string())
            .or_insert_with(|| {
                tracing::debug!(library = library_id, "Creating library lock");
                Arc::new(ReentrantMutex::new(()))
            })
            .clone()
    }

    /// Run `f` while holding the library's lock. Blocks until acquired;
    /// the guard is released on every exit path, panics included.
    pub fn with_lock<T>(&self, library_id: &str, f: impl FnOnce() -> T) -> T {
        let lock = self.get(library_id);
        let _guard = lock.lock();
        tracing::debug!(library = library_id, "Library lock acquired");
        f()
    }

    /// Like [`with_lock`](Self::with_lock) but gives up after `timeout`,
    /// returning `None` without running `f`.
    pub fn try_with_lock<T>(
        &self,
        library_id: &str,
        timeout: Duration,
        f: impl FnOnce() -> T,
    ) -> Option<T> {
        let lock = self.get(library_id);
        let result = match lock.try_lock_for(timeout) {
            Some(_guard) => Some(f()),
            None => {
                tracing::warn!(
                    library = library_id,
                    ?timeout,
                    "Failed to acquire library lock"
                );
                None
            }
        };
        result
    }

    /// Drop a library's lock from the registry. Holders keep their Arc;
    /// the next `get` creates a fresh lock.
    pub fn remove(&self, library_id: &str) {
        if self.locks.lock().remove(library_id).is_some() {
            tracing::debug!(library = library_id, "Library lock removed");
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().len()
    }
}
