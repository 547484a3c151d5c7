use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Per-key async mutexes for read-modify-write sequences that must not
/// interleave within this process (pick changes, alternate-key renames).
#[derive(Clone, Default)]
pub struct KeyLocks {
    inner: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `key`. The lock is held until the
    /// returned guard is dropped.
    pub async fn lock(&self, key: impl Into<String>) -> OwnedMutexGuard<()> {
        let key = key.into();
        let mutex = {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            // Drop entries nobody holds or waits on
            map.retain(|k, m| *k == key || Arc::strong_count(m) > 1);
            map.entry(key).or_default().clone()
        };
        mutex.lock_owned().await
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
