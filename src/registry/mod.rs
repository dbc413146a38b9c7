//! Driver cache.
//!
//! Drivers are cheap to share but may hold live connections. The cache keeps
//! the most recently used instances and calls [`Driver::destroy`] on every
//! instance it drops, whether evicted, removed or cleared.

use crate::driver::Driver;
use crate::Result;
use lru::LruCache;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

pub struct DriverCache<D: Driver + ?Sized> {
    entries: Mutex<LruCache<String, Arc<D>>>,
}

impl<D: Driver + ?Sized> DriverCache<D> {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    // The lock is never held across an await, so a poisoned map is still consistent.
    fn lock(&self) -> MutexGuard<'_, LruCache<String, Arc<D>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &str) -> Option<Arc<D>> {
        self.lock().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Insert `driver`, destroying whatever it displaced.
    ///
    /// Re-inserting the instance already cached under `key` only refreshes it.
    pub async fn insert(&self, key: impl Into<String>, driver: Arc<D>) {
        let key = key.into();
        let displaced = self.lock().push(key, Arc::clone(&driver));
        if let Some((key, old)) = displaced {
            if Arc::ptr_eq(&old, &driver) {
                return;
            }
            debug!(key = %key, "evicting driver");
            old.destroy().await;
        }
    }

    /// Cached driver for `key`, or a new one from `create`.
    ///
    /// When two callers race on the same key, the first insert wins and the
    /// loser's driver is destroyed.
    pub async fn get_or_try_insert<F, Fut>(&self, key: &str, create: F) -> Result<Arc<D>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<D>>>,
    {
        if let Some(driver) = self.get(key) {
            return Ok(driver);
        }

        let created = create().await?;
        let (winner, displaced) = {
            let mut entries = self.lock();
            match entries.get(key) {
                Some(existing) if Arc::ptr_eq(existing, &created) => (created, None),
                Some(existing) => (Arc::clone(existing), Some((key.to_string(), created))),
                None => {
                    let evicted = entries.push(key.to_string(), Arc::clone(&created));
                    (created, evicted)
                }
            }
        };

        if let Some((key, driver)) = displaced {
            debug!(key = %key, "destroying displaced driver");
            driver.destroy().await;
        }
        Ok(winner)
    }

    pub async fn remove(&self, key: &str) -> bool {
        let removed = self.lock().pop(key);
        match removed {
            Some(driver) => {
                driver.destroy().await;
                true
            }
            None => false,
        }
    }

    pub async fn clear(&self) {
        let drained: Vec<Arc<D>> = {
            let mut entries = self.lock();
            let mut drained = Vec::with_capacity(entries.len());
            while let Some((_, driver)) = entries.pop_lru() {
                drained.push(driver);
            }
            drained
        };
        for driver in drained {
            driver.destroy().await;
        }
    }
}

impl<D: Driver + ?Sized> std::fmt::Debug for DriverCache<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.lock();
        f.debug_struct("DriverCache")
            .field("len", &entries.len())
            .field("capacity", &entries.cap())
            .finish()
    }
}
