//! Cached, observable list views.
//!
//! A [`ListStore`] shows cached pages immediately, refetches when they are
//! stale, and never lets an older load overwrite the result of a newer one.
//! A store that moves on to other filters stops waiting for its previous
//! page; that load is cancelled only when no other store still awaits it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::application::cache::{build_key, CacheKey, CacheOptions, QueryCache};
use crate::domain::ListFilters;
use crate::port::ListFetcher;

/// One fetched page as stored in the cache.
#[derive(Debug)]
pub struct ListPage<T> {
    pub items: Arc<Vec<T>>,
    pub fetched_at: DateTime<Utc>,
}

/// What a list view renders.
#[derive(Debug, Clone)]
pub struct ListState<T> {
    pub items: Arc<Vec<T>>,
    /// True while a load without cached data to show is pending.
    pub loading: bool,
    pub error: Option<String>,
    /// When the items on display were fetched.
    pub last_sync_at: Option<DateTime<Utc>>,
}

impl<T> Default for ListState<T> {
    fn default() -> Self {
        Self {
            items: Arc::new(Vec::new()),
            loading: false,
            error: None,
            last_sync_at: None,
        }
    }
}

/// List view over one cache scope.
pub struct ListStore<F: ListFetcher> {
    scope: &'static str,
    fetcher: Arc<F>,
    cache: QueryCache,
    options: CacheOptions,
    state: watch::Sender<ListState<F::Item>>,
    generation: AtomicU64,
    /// Key and filters of the latest load.
    current: watch::Sender<Option<(CacheKey, ListFilters)>>,
}

impl<F: ListFetcher> ListStore<F> {
    pub fn new(scope: &'static str, fetcher: Arc<F>, cache: QueryCache, options: CacheOptions) -> Self {
        let (state, _) = watch::channel(ListState::default());
        let (current, _) = watch::channel(None);
        Self {
            scope,
            fetcher,
            cache,
            options,
            state,
            generation: AtomicU64::new(0),
            current,
        }
    }

    #[must_use]
    pub fn scope(&self) -> &'static str {
        self.scope
    }

    /// Current state snapshot.
    #[must_use]
    pub fn state(&self) -> ListState<F::Item> {
        self.state.borrow().clone()
    }

    /// Receiver notified on every published change.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<ListState<F::Item>> {
        self.state.subscribe()
    }

    /// Filters of the latest load, if any.
    #[must_use]
    pub fn filters(&self) -> Option<ListFilters> {
        self.current.borrow().as_ref().map(|(_, filters)| filters.clone())
    }

    /// Show the page for `filters`, fetching it unless a fresh copy is cached.
    pub async fn load(&self, filters: ListFilters) {
        self.run(filters, false).await;
    }

    /// Fetch the page for the latest filters again, even if it is fresh.
    pub async fn refresh(&self) {
        let filters = self.filters().unwrap_or_default();
        self.run(filters, true).await;
    }

    /// Drop every cached page of this scope.
    pub fn invalidate(&self) -> usize {
        let removed = self.cache.invalidate_prefix(&format!("{}:", self.scope));
        debug!(scope = self.scope, removed, "List cache invalidated");
        removed
    }

    async fn run(&self, filters: ListFilters, force: bool) {
        let key = build_key(self.scope, &filters);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let mut current = self.current.subscribe();
        self.current.send_replace(Some((key.clone(), filters.clone())));

        let cached = self.cache.get::<ListPage<F::Item>>(&key);
        match &cached {
            Some(entry) => {
                let page = Arc::clone(&entry.data);
                self.publish(generation, move |state| {
                    state.items = Arc::clone(&page.items);
                    state.last_sync_at = Some(page.fetched_at);
                    state.loading = false;
                    state.error = None;
                });
            }
            None => self.publish(generation, |state| {
                state.loading = true;
                state.error = None;
            }),
        }

        if !force && cached.as_ref().is_some_and(|entry| entry.is_fresh()) {
            debug!(scope = self.scope, key = %key, "Serving fresh cached page");
            return;
        }

        let fetcher = Arc::clone(&self.fetcher);
        let fetch = self.cache.fetch(&key, self.options, move || async move {
            let items = fetcher.fetch(&filters).await?;
            Ok(ListPage {
                items: Arc::new(items),
                fetched_at: Utc::now(),
            })
        });
        let superseded =
            current.wait_for(|latest| latest.as_ref().map(|(latest_key, _)| latest_key) != Some(&key));

        let result = tokio::select! {
            result = fetch => Some(result),
            _ = superseded => None,
        };
        let Some(result) = result else {
            let cancelled = self.cache.abandon(&key);
            debug!(scope = self.scope, key = %key, cancelled, "Stopped waiting for superseded load");
            return;
        };

        match result {
            Ok(page) => {
                info!(
                    scope = self.scope,
                    resource = self.fetcher.resource(),
                    count = page.items.len(),
                    "List loaded"
                );
                self.publish(generation, move |state| {
                    state.items = Arc::clone(&page.items);
                    state.last_sync_at = Some(page.fetched_at);
                    state.loading = false;
                    state.error = None;
                });
            }
            Err(err) if err.is_aborted() => {
                debug!(scope = self.scope, key = %key, "Load aborted");
                self.publish(generation, |state| state.loading = false);
            }
            Err(err) => {
                warn!(scope = self.scope, key = %key, error = %err, "List load failed");
                let message = err.to_string();
                self.publish(generation, move |state| {
                    state.loading = false;
                    state.error = Some(message);
                });
            }
        }
    }

    /// Apply `update` unless a newer load has started since `generation`.
    fn publish(&self, generation: u64, update: impl FnOnce(&mut ListState<F::Item>)) {
        let applied = self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            update(state);
            true
        });
        if !applied {
            debug!(scope = self.scope, generation, "Dropped result of superseded load");
        }
    }
}
