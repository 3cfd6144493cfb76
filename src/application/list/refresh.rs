//! Periodic refresh of a list view.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use super::store::ListStore;
use crate::port::ListFetcher;

/// Default period between refreshes.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Refreshes a [`ListStore`] on a fixed period until dropped.
///
/// Holds only a weak reference, so the task also ends once the store is gone.
pub struct AutoRefresh {
    handle: JoinHandle<()>,
}

impl AutoRefresh {
    pub fn spawn<F: ListFetcher>(store: &Arc<ListStore<F>>, period: Duration) -> Self {
        let store: Weak<ListStore<F>> = Arc::downgrade(store);
        info!(period_secs = period.as_secs(), "Auto-refresh started");

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    debug!("List store dropped, auto-refresh ending");
                    break;
                };
                store.refresh().await;
            }
        });

        Self { handle }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stop refreshing. Dropping the handle does the same.
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for AutoRefresh {
    fn drop(&mut self) {
        self.handle.abort();
        debug!("Auto-refresh stopped");
    }
}
