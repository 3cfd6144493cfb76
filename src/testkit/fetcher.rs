//! Mock [`ListFetcher`] implementations for testing.
//!
//! - [`StaticFetcher`]: answers immediately with fixed items, or fails on demand.
//! - [`GatedFetcher`]: every fetch waits until the test releases it, so load
//!   ordering can be controlled precisely.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::domain::ListFilters;
use crate::error::{Error, Result};
use crate::port::ListFetcher;

// ---------------------------------------------------------------------------
// StaticFetcher
// ---------------------------------------------------------------------------

pub struct StaticFetcher<T> {
    items: Vec<T>,
    calls: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
}

impl<T> StaticFetcher<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            calls: Arc::new(AtomicUsize::new(0)),
            failing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared counter of `fetch` calls.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }

    /// While set, every fetch fails with a 500.
    pub fn failure_switch(&self) -> Arc<AtomicBool> {
        self.failing.clone()
    }
}

#[async_trait]
impl<T> ListFetcher for StaticFetcher<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Item = T;

    async fn fetch(&self, _filters: &ListFilters) -> Result<Vec<T>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Api {
                status: 500,
                details: "scripted failure".into(),
            });
        }
        Ok(self.items.clone())
    }

    fn resource(&self) -> &'static str {
        "static"
    }
}

// ---------------------------------------------------------------------------
// GatedFetcher
// ---------------------------------------------------------------------------

type Gate<T> = (String, oneshot::Sender<Result<Vec<T>>>);

struct Gates<T> {
    pending: Mutex<VecDeque<Gate<T>>>,
    calls: AtomicUsize,
}

/// A fetcher whose calls block until released through a [`GateHandle`].
///
/// Pending calls are identified by the filters' search term (empty when
/// absent).
pub struct GatedFetcher<T> {
    gates: Arc<Gates<T>>,
}

/// Test-side control of a [`GatedFetcher`].
pub struct GateHandle<T> {
    gates: Arc<Gates<T>>,
}

impl<T> GatedFetcher<T> {
    pub fn new() -> Self {
        Self {
            gates: Arc::new(Gates {
                pending: Mutex::new(VecDeque::new()),
                calls: AtomicUsize::new(0),
            }),
        }
    }

    pub fn handle(&self) -> GateHandle<T> {
        GateHandle {
            gates: self.gates.clone(),
        }
    }
}

impl<T> Default for GatedFetcher<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> ListFetcher for GatedFetcher<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Item = T;

    async fn fetch(&self, filters: &ListFilters) -> Result<Vec<T>> {
        let (tx, rx) = oneshot::channel();
        let label = filters.search.clone().unwrap_or_default();
        self.gates.pending.lock().push_back((label, tx));
        self.gates.calls.fetch_add(1, Ordering::SeqCst);
        rx.await.unwrap_or(Err(Error::Aborted))
    }

    fn resource(&self) -> &'static str {
        "gated"
    }
}

impl<T> GateHandle<T> {
    /// Number of `fetch` calls so far, released or not.
    pub fn calls(&self) -> usize {
        self.gates.calls.load(Ordering::SeqCst)
    }

    /// Yield until at least `n` fetches have started.
    pub async fn wait_for_calls(&self, n: usize) {
        while self.calls() < n {
            tokio::task::yield_now().await;
        }
    }

    /// Complete the oldest pending fetch whose search term is `search`.
    ///
    /// Returns false when no such fetch is pending, for example because the
    /// load was aborted.
    pub fn release(&self, search: &str, result: Result<Vec<T>>) -> bool {
        let mut pending = self.gates.pending.lock();
        match pending.iter().position(|(label, _)| label == search) {
            Some(index) => {
                pending
                    .remove(index)
                    .is_some_and(|(_, tx)| tx.send(result).is_ok())
            }
            None => false,
        }
    }

    /// Complete the oldest pending fetch.
    pub fn release_any(&self, result: Result<Vec<T>>) -> bool {
        match self.gates.pending.lock().pop_front() {
            Some((_, tx)) => tx.send(result).is_ok(),
            None => false,
        }
    }
}
