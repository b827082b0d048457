//! Per-key resource cache with in-flight request de-duplication.
//!
//! Each key moves through `Empty → Loading → Ready | Error`. While a key is
//! loading its shared in-flight handle is stored in the entry, and every
//! non-append request for that key awaits that same handle, so one network
//! call serves all of them.
//!
//! Registering a handle takes a fresh generation number from the cache. A
//! handle only writes its result back if the entry still carries its
//! generation; results of handles superseded by `invalidate`, `clear` or an
//! append are returned to their own awaiters and otherwise dropped.
//!
//! Every new handle is also given to the cache's [`Spawner`], so a response
//! still settles into its entry after every caller dropped its future.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::{self, Future};
use std::hash::Hash;
use std::rc::Rc;

use futures::FutureExt;
use futures::future::{LocalBoxFuture, Shared};
use serde_json::Value;
use tracing::{debug, warn};

use crate::core::error::ApiError;
use crate::core::task::Spawner;
use crate::models::{Loaded, Pagination, Record};

/// Shared handle to a running fetch.
pub type InFlight<T> = Shared<LocalBoxFuture<'static, Result<T, ApiError>>>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CacheStatus {
    #[default]
    Empty,
    Loading,
    Ready,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchMode {
    /// Serve cached data when the entry is ready.
    Cached,
    /// Always go to the network (still joins a running fetch).
    Refresh,
    /// Load a continuation page and append it to the cached data.
    Append,
}

/// Data that can live in a cache entry.
pub trait CachePayload: Clone + 'static {
    /// Merge a continuation page into existing data.
    fn append(&mut self, more: Self);
}

impl<T: Clone + 'static> CachePayload for Vec<T> {
    fn append(&mut self, more: Self) {
        self.extend(more);
    }
}

impl CachePayload for Record {
    fn append(&mut self, more: Self) {
        *self = more;
    }
}

impl<T: Clone + 'static> CachePayload for Option<T> {
    fn append(&mut self, more: Self) {
        *self = more;
    }
}

impl CachePayload for Value {
    fn append(&mut self, more: Self) {
        *self = more;
    }
}

struct CacheEntry<T> {
    status: CacheStatus,
    data: Option<T>,
    pagination: Option<Pagination>,
    in_flight: Option<InFlight<T>>,
    appending: bool,
    generation: u64,
}

impl<T> Default for CacheEntry<T> {
    fn default() -> Self {
        Self {
            status: CacheStatus::Empty,
            data: None,
            pagination: None,
            in_flight: None,
            appending: false,
            generation: 0,
        }
    }
}

type Entries<K, T> = Rc<RefCell<HashMap<K, CacheEntry<T>>>>;

pub struct ResourceCache<K, T> {
    name: &'static str,
    entries: Entries<K, T>,
    generations: Cell<u64>,
    spawner: Rc<dyn Spawner>,
}

impl<K, T> ResourceCache<K, T>
where
    K: Eq + Hash + Clone + Debug + 'static,
    T: CachePayload,
{
    /// `name` only labels log events.
    pub fn new(name: &'static str, spawner: Rc<dyn Spawner>) -> Self {
        Self {
            name,
            entries: Rc::new(RefCell::new(HashMap::new())),
            generations: Cell::new(0),
            spawner,
        }
    }

    /// Fetch `key`, joining or short-circuiting as described in the module docs.
    ///
    /// `load` is only invoked when a new network call is needed. The returned
    /// future resolves with the data this request produced: the cached data on
    /// a hit, the whole list on a replace, the new page on an append.
    pub fn fetch<F, Fut>(
        &self,
        key: K,
        mode: FetchMode,
        load: F,
    ) -> LocalBoxFuture<'static, Result<T, ApiError>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Loaded<T>, ApiError>> + 'static,
    {
        let mut entries = self.entries.borrow_mut();
        let entry = entries.entry(key.clone()).or_default();

        if mode != FetchMode::Append {
            if let Some(handle) = &entry.in_flight {
                debug!(cache = self.name, key = ?key, "joining in-flight request");
                if !entry.appending {
                    return handle.clone().boxed_local();
                }
                // An append resolves with the new page only; joiners want the whole data.
                let handle = handle.clone();
                let shared_entries = Rc::clone(&self.entries);
                return async move {
                    if let Err(err) = handle.await {
                        return Err(err);
                    }
                    shared_entries
                        .borrow()
                        .get(&key)
                        .and_then(|entry| entry.data.clone())
                        .ok_or_else(|| ApiError::Decode("cache entry dropped during load".to_string()))
                }
                .boxed_local();
            }
            if mode == FetchMode::Cached
                && entry.status == CacheStatus::Ready
                && let Some(data) = &entry.data
            {
                debug!(cache = self.name, key = ?key, "cache hit");
                return future::ready(Ok(data.clone())).boxed_local();
            }
        }

        let generation = self.generations.get() + 1;
        self.generations.set(generation);
        entry.status = CacheStatus::Loading;
        entry.generation = generation;
        entry.appending = mode == FetchMode::Append;
        debug!(cache = self.name, key = ?key, generation, ?mode, "fetching");

        let request = load();
        let entries_ref = Rc::clone(&self.entries);
        let name = self.name;
        let append = mode == FetchMode::Append;
        let handle: InFlight<T> = async move {
            let result = request.await;
            settle(&entries_ref, name, &key, generation, append, result)
        }
        .boxed_local()
        .shared();

        entry.in_flight = Some(handle.clone());
        drop(entries);

        self.spawner.spawn(handle.clone().map(|_| ()).boxed_local());
        handle.boxed_local()
    }

    pub fn status(&self, key: &K) -> CacheStatus {
        self.entries
            .borrow()
            .get(key)
            .map(|entry| entry.status)
            .unwrap_or_default()
    }

    pub fn is_loading(&self, key: &K) -> bool {
        self.status(key) == CacheStatus::Loading
    }

    /// Snapshot of the cached data.
    pub fn data(&self, key: &K) -> Option<T> {
        self.entries.borrow().get(key).and_then(|entry| entry.data.clone())
    }

    pub fn pagination(&self, key: &K) -> Option<Pagination> {
        self.entries.borrow().get(key).and_then(|entry| entry.pagination)
    }

    /// Mutate cached data in place. Returns `false` if the key has no data.
    pub fn update(&self, key: &K, f: impl FnOnce(&mut T)) -> bool {
        match self
            .entries
            .borrow_mut()
            .get_mut(key)
            .and_then(|entry| entry.data.as_mut())
        {
            Some(data) => {
                f(data);
                true
            }
            None => false,
        }
    }

    /// Mutate the data of every key that has some.
    pub fn update_all(&self, mut f: impl FnMut(&mut T)) {
        for entry in self.entries.borrow_mut().values_mut() {
            if let Some(data) = entry.data.as_mut() {
                f(data);
            }
        }
    }

    /// Store data for `key` directly and mark it ready.
    ///
    /// Supersedes any running fetch for the key.
    pub fn insert(&self, key: K, data: T) {
        let generation = self.generations.get() + 1;
        self.generations.set(generation);
        let mut entries = self.entries.borrow_mut();
        let entry = entries.entry(key).or_default();
        entry.status = CacheStatus::Ready;
        entry.data = Some(data);
        entry.in_flight = None;
        entry.appending = false;
        entry.generation = generation;
    }

    /// Forget `key`; the next fetch goes to the network.
    pub fn invalidate(&self, key: &K) {
        self.entries.borrow_mut().remove(key);
    }

    /// Forget everything.
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    pub fn keys(&self) -> Vec<K> {
        self.entries.borrow().keys().cloned().collect()
    }
}

fn settle<K, T>(
    entries: &RefCell<HashMap<K, CacheEntry<T>>>,
    name: &'static str,
    key: &K,
    generation: u64,
    append: bool,
    result: Result<Loaded<T>, ApiError>,
) -> Result<T, ApiError>
where
    K: Eq + Hash + Debug,
    T: CachePayload,
{
    let mut entries = entries.borrow_mut();
    let Some(entry) = entries
        .get_mut(key)
        .filter(|entry| entry.generation == generation)
    else {
        debug!(cache = name, key = ?key, generation, "discarding superseded response");
        return result.map(|loaded| loaded.data);
    };

    entry.in_flight = None;
    entry.appending = false;
    match result {
        Ok(Loaded { data, pagination }) => {
            if append {
                if pagination.is_some() {
                    entry.pagination = pagination;
                }
                match entry.data.as_mut() {
                    Some(existing) => existing.append(data.clone()),
                    None => entry.data = Some(data.clone()),
                }
            } else {
                entry.pagination = pagination;
                entry.data = Some(data.clone());
            }
            entry.status = CacheStatus::Ready;
            Ok(data)
        }
        Err(err) => {
            warn!(cache = name, key = ?key, error = %err, "fetch failed");
            entry.status = CacheStatus::Error;
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::task::mock::PoolSpawner;
    use futures::channel::oneshot;
    use futures::future::join_all;

    type Calls = Rc<Cell<usize>>;

    fn new_cache<K, T>() -> ResourceCache<K, T>
    where
        K: Eq + Hash + Clone + Debug + 'static,
        T: CachePayload,
    {
        ResourceCache::new("test", Rc::new(PoolSpawner::new()))
    }

    /// A load that counts calls and completes once `gate` fires.
    fn gated_load(
        calls: &Calls,
        gate: oneshot::Receiver<Result<Vec<u32>, ApiError>>,
    ) -> impl FnOnce() -> LocalBoxFuture<'static, Result<Loaded<Vec<u32>>, ApiError>> {
        let calls = calls.clone();
        move || {
            calls.set(calls.get() + 1);
            async move {
                gate.await
                    .unwrap_or_else(|_| Err(ApiError::Transport("dropped".to_string())))
                    .map(Loaded::unpaged)
            }
            .boxed_local()
        }
    }

    fn ready_load(
        calls: &Calls,
        data: Vec<u32>,
        pagination: Option<Pagination>,
    ) -> impl FnOnce() -> LocalBoxFuture<'static, Result<Loaded<Vec<u32>>, ApiError>> {
        let calls = calls.clone();
        move || {
            calls.set(calls.get() + 1);
            future::ready(Ok(Loaded { data, pagination })).boxed_local()
        }
    }

    #[tokio::test]
    async fn test_concurrent_fetches_share_one_call() {
        let cache: ResourceCache<&str, Vec<u32>> = new_cache();
        let calls = Calls::default();
        let (tx, rx) = oneshot::channel();

        let mut pending = vec![cache.fetch("oak-park", FetchMode::Cached, gated_load(&calls, rx))];
        for _ in 0..4 {
            let (_unused_tx, rx) = oneshot::channel();
            pending.push(cache.fetch("oak-park", FetchMode::Cached, gated_load(&calls, rx)));
        }
        assert_eq!(calls.get(), 1);
        assert_eq!(cache.status(&"oak-park"), CacheStatus::Loading);

        tx.send(Ok(vec![1, 2, 3])).unwrap();
        let results = join_all(pending).await;
        assert!(results.iter().all(|r| r == &Ok(vec![1, 2, 3])));
        assert_eq!(calls.get(), 1);
        assert_eq!(cache.status(&"oak-park"), CacheStatus::Ready);
    }

    #[tokio::test]
    async fn test_concurrent_fetches_share_one_error() {
        let cache: ResourceCache<&str, Vec<u32>> = new_cache();
        let calls = Calls::default();
        let (tx, rx) = oneshot::channel();

        let first = cache.fetch("k", FetchMode::Cached, gated_load(&calls, rx));
        let (_unused_tx, rx2) = oneshot::channel();
        let second = cache.fetch("k", FetchMode::Refresh, gated_load(&calls, rx2));

        let err = ApiError::Http {
            status: 500,
            message: "boom".to_string(),
            details: None,
        };
        tx.send(Err(err.clone())).unwrap();
        assert_eq!(first.await, Err(err.clone()));
        assert_eq!(second.await, Err(err));
        assert_eq!(calls.get(), 1);
        assert_eq!(cache.status(&"k"), CacheStatus::Error);
        assert_eq!(cache.data(&"k"), None);
    }

    #[tokio::test]
    async fn test_distinct_keys_are_independent() {
        let cache: ResourceCache<&str, Vec<u32>> = new_cache();
        let calls = Calls::default();
        let (_held, rx) = oneshot::channel();

        let _slow = cache.fetch("a", FetchMode::Cached, gated_load(&calls, rx));
        let fast = cache
            .fetch("b", FetchMode::Cached, ready_load(&calls, vec![9], None))
            .await;

        assert_eq!(fast, Ok(vec![9]));
        assert_eq!(calls.get(), 2);
        assert_eq!(cache.status(&"a"), CacheStatus::Loading);
        assert_eq!(cache.status(&"b"), CacheStatus::Ready);
    }

    #[tokio::test]
    async fn test_ready_entry_short_circuits() {
        let cache: ResourceCache<&str, Vec<u32>> = new_cache();
        let calls = Calls::default();

        cache
            .fetch("k", FetchMode::Cached, ready_load(&calls, vec![1], None))
            .await
            .unwrap();
        let again = cache
            .fetch("k", FetchMode::Cached, ready_load(&calls, vec![2], None))
            .await;
        assert_eq!(again, Ok(vec![1]));
        assert_eq!(calls.get(), 1);

        let refreshed = cache
            .fetch("k", FetchMode::Refresh, ready_load(&calls, vec![2], None))
            .await;
        assert_eq!(refreshed, Ok(vec![2]));
        assert_eq!(calls.get(), 2);
    }

    #[tokio::test]
    async fn test_error_entry_retries() {
        let cache: ResourceCache<&str, Vec<u32>> = new_cache();
        let calls = Calls::default();
        let (tx, rx) = oneshot::channel();
        let failing = cache.fetch("k", FetchMode::Cached, gated_load(&calls, rx));
        tx.send(Err(ApiError::Transport("offline".to_string()))).unwrap();
        assert!(failing.await.is_err());

        let retried = cache
            .fetch("k", FetchMode::Cached, ready_load(&calls, vec![4], None))
            .await;
        assert_eq!(retried, Ok(vec![4]));
        assert_eq!(cache.status(&"k"), CacheStatus::Ready);
    }

    #[tokio::test]
    async fn test_append_merges_in_order_and_updates_pagination() {
        let cache: ResourceCache<&str, Vec<u32>> = new_cache();
        let calls = Calls::default();
        let page = |page| Pagination {
            page,
            page_size: 2,
            page_count: 2,
            total: 4,
        };

        cache
            .fetch("k", FetchMode::Cached, ready_load(&calls, vec![1, 2], Some(page(1))))
            .await
            .unwrap();
        let more = cache
            .fetch("k", FetchMode::Append, ready_load(&calls, vec![3, 4], Some(page(2))))
            .await;

        assert_eq!(more, Ok(vec![3, 4]));
        assert_eq!(cache.data(&"k"), Some(vec![1, 2, 3, 4]));
        assert_eq!(cache.pagination(&"k").map(|p| p.page), Some(2));
    }

    #[tokio::test]
    async fn test_joining_an_append_yields_the_whole_list() {
        let cache: ResourceCache<&str, Vec<u32>> = new_cache();
        let calls = Calls::default();
        cache
            .fetch("k", FetchMode::Cached, ready_load(&calls, vec![1], None))
            .await
            .unwrap();

        let (tx, rx) = oneshot::channel();
        let append = cache.fetch("k", FetchMode::Append, gated_load(&calls, rx));
        let joined = cache.fetch("k", FetchMode::Refresh, ready_load(&calls, vec![9], None));
        tx.send(Ok(vec![2])).unwrap();

        assert_eq!(append.await, Ok(vec![2]));
        assert_eq!(joined.await, Ok(vec![1, 2]));
        assert_eq!(calls.get(), 2);
    }

    #[tokio::test]
    async fn test_superseded_response_is_discarded() {
        let cache: ResourceCache<&str, Vec<u32>> = new_cache();
        let calls = Calls::default();
        let (stale_tx, stale_rx) = oneshot::channel();

        let stale = cache.fetch("k", FetchMode::Cached, gated_load(&calls, stale_rx));
        cache.clear();
        let fresh = cache
            .fetch("k", FetchMode::Cached, ready_load(&calls, vec![2], None))
            .await;
        assert_eq!(fresh, Ok(vec![2]));

        stale_tx.send(Ok(vec![1])).unwrap();
        assert_eq!(stale.await, Ok(vec![1]));
        assert_eq!(cache.data(&"k"), Some(vec![2]));
        assert_eq!(cache.status(&"k"), CacheStatus::Ready);
    }

    #[tokio::test]
    async fn test_abandoned_fetch_still_settles() {
        let pool = Rc::new(PoolSpawner::new());
        let cache: ResourceCache<&str, Vec<u32>> = ResourceCache::new("test", pool.clone());
        let calls = Calls::default();
        let (tx, rx) = oneshot::channel();

        drop(cache.fetch("k", FetchMode::Cached, gated_load(&calls, rx)));
        assert_eq!(cache.status(&"k"), CacheStatus::Loading);

        tx.send(Ok(vec![7])).unwrap();
        pool.run_until_stalled();

        assert_eq!(cache.status(&"k"), CacheStatus::Ready);
        assert_eq!(cache.data(&"k"), Some(vec![7]));
        let again = cache
            .fetch("k", FetchMode::Cached, ready_load(&calls, vec![8], None))
            .await;
        assert_eq!(again, Ok(vec![7]));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_update_and_insert() {
        let cache: ResourceCache<u64, Vec<u32>> = new_cache();
        assert!(!cache.update(&1, |list| list.push(1)));

        cache.insert(1, vec![1]);
        cache.insert(2, vec![5]);
        assert!(cache.update(&1, |list| list.insert(0, 0)));
        assert_eq!(cache.data(&1), Some(vec![0, 1]));

        cache.update_all(|list| list.retain(|n| *n != 5));
        assert_eq!(cache.data(&2), Some(Vec::new()));

        cache.invalidate(&1);
        assert_eq!(cache.status(&1), CacheStatus::Empty);
        let mut keys = cache.keys();
        keys.sort();
        assert_eq!(keys, vec![2]);
    }
}
