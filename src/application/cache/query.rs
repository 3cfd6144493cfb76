//! In-memory query cache with stale-while-revalidate timestamps and request
//! de-duplication.
//!
//! Entries carry three instants: when they were written, when they turn stale
//! and when they expire. A stale entry is still served; an expired one is
//! evicted on the next read. Loads started through [`QueryCache::dedupe`] or
//! [`QueryCache::fetch`] are spawned on the runtime and shared, so concurrent
//! callers for one key cause a single loader call. Each pending load counts
//! its waiters, so one caller can give up on it without cancelling it for
//! the others.

use std::any::Any;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use super::key::CacheKey;
use crate::error::{Error, Result};

type AnyData = Arc<dyn Any + Send + Sync>;
type SharedLoad = Shared<BoxFuture<'static, std::result::Result<AnyData, Arc<Error>>>>;

/// Default time before an entry turns stale.
pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(30);

/// Default time before an entry expires.
pub const DEFAULT_CACHE_TIME: Duration = Duration::from_secs(600);

/// Lifetimes applied by [`QueryCache::set`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOptions {
    /// How long a fresh entry is served without refetching.
    pub stale_time: Duration,
    /// How long an entry is kept at all.
    pub cache_time: Duration,
}

impl CacheOptions {
    #[must_use]
    pub const fn new(stale_time: Duration, cache_time: Duration) -> Self {
        Self {
            stale_time,
            cache_time,
        }
    }

    #[must_use]
    pub const fn from_millis(stale_time_ms: u64, cache_time_ms: u64) -> Self {
        Self::new(
            Duration::from_millis(stale_time_ms),
            Duration::from_millis(cache_time_ms),
        )
    }

    /// Cache time raised to the stale time when the two are inverted.
    fn effective_cache_time(&self) -> Duration {
        self.cache_time.max(self.stale_time)
    }
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self::new(DEFAULT_STALE_TIME, DEFAULT_CACHE_TIME)
    }
}

/// A cached value and its lifetimes.
///
/// Invariant: `updated_at <= stale_at <= expires_at`.
#[derive(Debug)]
pub struct CacheEntry<T> {
    pub data: Arc<T>,
    pub updated_at: Instant,
    pub stale_at: Instant,
    pub expires_at: Instant,
}

impl<T> CacheEntry<T> {
    /// True while the entry has not reached its stale instant.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.stale_at > Instant::now()
    }

    /// True once the entry has reached its expiry instant.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Instant::now()
    }
}

impl<T> Clone for CacheEntry<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            updated_at: self.updated_at,
            stale_at: self.stale_at,
            expires_at: self.expires_at,
        }
    }
}

struct StoredEntry {
    data: AnyData,
    updated_at: Instant,
    stale_at: Instant,
    expires_at: Instant,
}

struct InFlight {
    id: u64,
    load: SharedLoad,
    abort: AbortHandle,
    /// Callers currently awaiting `load`.
    waiters: Arc<AtomicUsize>,
    /// Set when the key is invalidated while the load runs.
    outdated: Arc<AtomicBool>,
}

/// One caller's interest in a pending load; released on drop.
struct Waiter(Arc<AtomicUsize>);

impl Drop for Waiter {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct Inner {
    entries: DashMap<CacheKey, StoredEntry>,
    in_flight: DashMap<CacheKey, InFlight>,
    next_load_id: AtomicU64,
}

/// Removes an in-flight registration when its load task ends, whether it
/// completed, failed, panicked or was aborted.
struct InFlightGuard {
    inner: Weak<Inner>,
    key: CacheKey,
    id: u64,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            let id = self.id;
            inner.in_flight.remove_if(&self.key, |_, flight| flight.id == id);
        }
    }
}

/// Keyed store of fetched results shared by every list view.
///
/// Cheap to clone; clones share the same storage.
#[derive(Clone, Default)]
pub struct QueryCache {
    inner: Arc<Inner>,
}

impl QueryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the entry for `key` unless it has expired.
    ///
    /// An expired entry is evicted. An entry stored with a different type is
    /// treated as absent.
    #[must_use]
    pub fn get<T>(&self, key: &CacheKey) -> Option<CacheEntry<T>>
    where
        T: Send + Sync + 'static,
    {
        let now = Instant::now();
        let stored = self.inner.entries.get(key)?;

        if stored.expires_at <= now {
            drop(stored);
            self.inner
                .entries
                .remove_if(key, |_, entry| entry.expires_at <= now);
            debug!(key = %key, "Evicted expired cache entry");
            return None;
        }

        let entry = match Arc::clone(&stored.data).downcast::<T>() {
            Ok(data) => CacheEntry {
                data,
                updated_at: stored.updated_at,
                stale_at: stored.stale_at,
                expires_at: stored.expires_at,
            },
            Err(_) => {
                warn!(key = %key, "Cache entry holds a different type, ignoring");
                return None;
            }
        };
        Some(entry)
    }

    /// Store `data` under `key`, replacing any previous entry.
    pub fn set<T>(&self, key: &CacheKey, data: T, options: CacheOptions) -> CacheEntry<T>
    where
        T: Send + Sync + 'static,
    {
        self.set_shared(key, Arc::new(data), options)
    }

    /// Store already shared `data` under `key`, replacing any previous entry.
    ///
    /// A `cache_time` shorter than `stale_time` is raised to `stale_time`.
    pub fn set_shared<T>(&self, key: &CacheKey, data: Arc<T>, options: CacheOptions) -> CacheEntry<T>
    where
        T: Send + Sync + 'static,
    {
        if options.cache_time < options.stale_time {
            warn!(
                key = %key,
                stale_ms = options.stale_time.as_millis() as u64,
                cache_ms = options.cache_time.as_millis() as u64,
                "cache_time shorter than stale_time, clamping"
            );
        }

        let now = Instant::now();
        let stale_at = now + options.stale_time;
        let expires_at = now + options.effective_cache_time();

        self.inner.entries.insert(
            key.clone(),
            StoredEntry {
                data: Arc::clone(&data) as AnyData,
                updated_at: now,
                stale_at,
                expires_at,
            },
        );
        trace!(key = %key, "Cache entry stored");

        CacheEntry {
            data,
            updated_at: now,
            stale_at,
            expires_at,
        }
    }

    /// Run `loader` for `key` unless a load for `key` is already pending, in
    /// which case its result is awaited instead.
    ///
    /// The loader runs as its own task: it keeps going if this caller is
    /// dropped, and stops only through [`abort`](Self::abort),
    /// [`abandon`](Self::abandon) or [`clear`](Self::clear). Its
    /// registration is removed however it ends.
    ///
    /// # Errors
    ///
    /// Returns the loader's error (wrapped in [`Error::Shared`] when several
    /// callers observe it), [`Error::Aborted`] when the load was cancelled,
    /// or [`Error::Cache`] when a pending load for the key yields another type.
    pub async fn dedupe<T, F, Fut>(&self, key: &CacheKey, loader: F) -> Result<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.join(key, |_outdated| loader()).await
    }

    /// Like [`dedupe`](Self::dedupe), and store the loaded value under `key`
    /// with `options`.
    ///
    /// The value is not stored when `key` was invalidated while the load was
    /// running; waiters still receive it.
    ///
    /// # Errors
    ///
    /// See [`dedupe`](Self::dedupe).
    pub async fn fetch<T, F, Fut>(
        &self,
        key: &CacheKey,
        options: CacheOptions,
        loader: F,
    ) -> Result<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let cache = self.clone();
        let stored_key = key.clone();
        let data = self
            .join(key, move |outdated| {
                let load = loader();
                async move {
                    let data = Arc::new(load.await?);
                    cache.store_unless_outdated(&stored_key, &data, &outdated, options);
                    Ok(data)
                }
            })
            .await?;
        Ok(Arc::clone(&*data))
    }

    async fn join<T, F, Fut>(&self, key: &CacheKey, loader: F) -> Result<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce(Arc<AtomicBool>) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let existing = self.inner.in_flight.get(key).map(|flight| {
            flight.waiters.fetch_add(1, Ordering::SeqCst);
            (flight.load.clone(), Arc::clone(&flight.waiters))
        });
        let (load, waiters) = match existing {
            Some(joined) => {
                debug!(key = %key, "Joining in-flight load");
                joined
            }
            None => {
                // Build the future outside the map lock; the loader may read the cache.
                let outdated = Arc::new(AtomicBool::new(false));
                let future = loader(Arc::clone(&outdated));
                self.register(key, future, outdated)
            }
        };
        let _waiter = Waiter(waiters);

        let data = load.await.map_err(unshare)?;
        data.downcast::<T>()
            .map_err(|_| Error::Cache(format!("in-flight load for '{key}' has another type")))
    }

    /// Register `future` as the load for `key` and count the caller as its
    /// first waiter, or join the load another caller registered first.
    fn register<T, Fut>(
        &self,
        key: &CacheKey,
        future: Fut,
        outdated: Arc<AtomicBool>,
    ) -> (SharedLoad, Arc<AtomicUsize>)
    where
        T: Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        match self.inner.in_flight.entry(key.clone()) {
            Entry::Occupied(existing) => {
                // Lost the race to another caller; our future is dropped unpolled.
                let flight = existing.get();
                flight.waiters.fetch_add(1, Ordering::SeqCst);
                (flight.load.clone(), Arc::clone(&flight.waiters))
            }
            Entry::Vacant(slot) => {
                let id = self.inner.next_load_id.fetch_add(1, Ordering::Relaxed);
                let guard = InFlightGuard {
                    inner: Arc::downgrade(&self.inner),
                    key: key.clone(),
                    id,
                };

                let handle = tokio::spawn(async move {
                    let _guard = guard;
                    future.await.map(|data| Arc::new(data) as AnyData)
                });
                let abort = handle.abort_handle();

                let load = async move {
                    match handle.await {
                        Ok(result) => result.map_err(Arc::new),
                        Err(join) if join.is_cancelled() => Err(Arc::new(Error::Aborted)),
                        Err(join) => Err(Arc::new(Error::Cache(format!("loader panicked: {join}")))),
                    }
                }
                .boxed()
                .shared();

                let waiters = Arc::new(AtomicUsize::new(1));
                debug!(key = %key, load_id = id, "Started load");
                slot.insert(InFlight {
                    id,
                    load: load.clone(),
                    abort,
                    waiters: Arc::clone(&waiters),
                    outdated,
                });
                (load, waiters)
            }
        }
    }

    fn store_unless_outdated<T>(
        &self,
        key: &CacheKey,
        data: &Arc<T>,
        outdated: &AtomicBool,
        options: CacheOptions,
    ) where
        T: Send + Sync + 'static,
    {
        // Holding the registration orders this check against `invalidate_prefix`.
        let _registration = self.inner.in_flight.get(key);
        if outdated.load(Ordering::SeqCst) {
            debug!(key = %key, "Key invalidated during load, result not cached");
            return;
        }
        self.set_shared(key, Arc::clone(data), options);
    }

    /// Cancel the pending load for `key`; its waiters get [`Error::Aborted`].
    ///
    /// Returns whether a load was pending.
    pub fn abort(&self, key: &CacheKey) -> bool {
        match self.inner.in_flight.remove(key) {
            Some((_, flight)) => {
                flight.abort.abort();
                debug!(key = %key, load_id = flight.id, "Aborted in-flight load");
                true
            }
            None => false,
        }
    }

    /// Cancel the pending load for `key` if no caller awaits it any more.
    ///
    /// Returns whether a load was cancelled.
    pub fn abandon(&self, key: &CacheKey) -> bool {
        let removed = self
            .inner
            .in_flight
            .remove_if(key, |_, flight| flight.waiters.load(Ordering::SeqCst) == 0);
        match removed {
            Some((_, flight)) => {
                flight.abort.abort();
                debug!(key = %key, load_id = flight.id, "Abandoned unwatched load");
                true
            }
            None => false,
        }
    }

    /// Number of callers awaiting the pending load for `key`.
    #[must_use]
    pub fn waiters(&self, key: &CacheKey) -> usize {
        self.inner
            .in_flight
            .get(key)
            .map_or(0, |flight| flight.waiters.load(Ordering::SeqCst))
    }

    /// Whether a load for `key` is pending.
    #[must_use]
    pub fn is_loading(&self, key: &CacheKey) -> bool {
        self.inner.in_flight.contains_key(key)
    }

    /// Remove every entry whose key starts with `prefix`.
    ///
    /// Pending loads for matching keys keep running for their waiters but
    /// no longer write their result to the cache. Returns the number of
    /// entries removed.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut outdated = 0;
        for flight in self.inner.in_flight.iter_mut() {
            if flight.key().has_prefix(prefix) {
                flight.outdated.store(true, Ordering::SeqCst);
                outdated += 1;
            }
        }

        let mut removed = 0;
        self.inner.entries.retain(|key, _| {
            let matches = key.has_prefix(prefix);
            if matches {
                removed += 1;
            }
            !matches
        });
        debug!(prefix, removed, outdated, "Invalidated cache prefix");
        removed
    }

    /// Empty the cache and cancel every pending load.
    pub fn clear(&self) {
        self.inner.entries.clear();
        let pending: Vec<CacheKey> = self
            .inner
            .in_flight
            .iter()
            .map(|flight| flight.key().clone())
            .collect();
        for key in &pending {
            self.abort(key);
        }
        debug!(aborted = pending.len(), "Query cache cleared");
    }

    /// Number of stored entries, expired ones included until read.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Number of pending loads.
    #[must_use]
    pub fn in_flight_len(&self) -> usize {
        self.inner.in_flight.len()
    }
}

fn unshare(err: Arc<Error>) -> Error {
    if err.is_aborted() {
        return Error::Aborted;
    }
    match Arc::try_unwrap(err) {
        Ok(err) => err,
        Err(shared) => Error::Shared(shared),
    }
}
