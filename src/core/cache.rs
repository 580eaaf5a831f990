use crate::utils::Result;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Generic memoization for asynchronous computations, keyed by value.
///
/// `get_or_compute` runs the computation at most once per key; concurrent
/// callers for the same key share the in-flight computation. A failed
/// computation is not stored, so the next caller retries. `forget` evicts a
/// stored value or an in-flight cell so the next access recomputes. There is
/// no eviction policy beyond `forget`.
pub struct KeyedCache<K, V> {
    entries: Mutex<HashMap<K, Arc<OnceCell<V>>>>,
}

impl<K, V> KeyedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get_or_compute<F, Fut>(&self, key: K, init: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        let cell = {
            let mut entries = self.entries.lock();
            entries.entry(key).or_default().clone()
        };
        let value = cell.get_or_try_init(init).await?;
        Ok(value.clone())
    }

    /// Drop any stored value or in-flight computation for `key`. Callers
    /// already waiting on the old cell still complete against it; the next
    /// `get_or_compute` starts fresh.
    pub fn forget(&self, key: &K) {
        self.entries.lock().remove(key);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

impl<K, V> Default for KeyedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
