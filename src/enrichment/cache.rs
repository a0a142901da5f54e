//! Single-flight keyed cache
//!
//! Each key owns a `OnceCell`. The map lock is held only long enough to find
//! or insert the cell; the fetch runs outside it, so different keys fetch in
//! parallel while callers racing on the same key all await the one
//! in-flight fetch instead of starting their own.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

pub struct KeyedCache<K, V> {
    entries: Mutex<HashMap<K, Arc<OnceCell<V>>>>,
}

impl<K, V> Default for KeyedCache<K, V> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> KeyedCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `key`, running `fetch` to populate it if
    /// no value exists yet. At most one `fetch` runs per key; concurrent
    /// callers for the same key wait for its result.
    ///
    /// `fetch` must not fail: callers encode failure in `V` (e.g. a
    /// "not found" marker) so it is cached like any other value.
    pub async fn get_or_fetch<F, Fut>(&self, key: K, fetch: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let cell = {
            let mut entries = self.entries.lock().await;
            entries
                .entry(key)
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        cell.get_or_init(fetch).await.clone()
    }

    /// Number of populated entries
    pub async fn len(&self) -> usize {
        let entries = self.entries.lock().await;
        entries.values().filter(|cell| cell.initialized()).count()
    }
}
