//! Shared driver of the list commands.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::command::RangeArgs;
use super::output;
use crate::application::list::{AutoRefresh, ListState, ListStore};
use crate::domain::ListFilters;
use crate::error::{Error, Result};
use crate::port::ListFetcher;

/// Load `filters` into `store` and render the result; with `--watch`, keep
/// refreshing and re-render every completed sync until cancelled.
pub(crate) async fn run<F>(
    store: &Arc<ListStore<F>>,
    filters: ListFilters,
    range: &RangeArgs,
    default_interval: Duration,
    render: fn(&[F::Item]),
) -> Result<()>
where
    F: ListFetcher,
{
    store.load(filters).await;
    let state = store.state();
    if let Some(message) = state.error.clone() {
        return Err(Error::ListLoad {
            scope: store.scope(),
            message,
        });
    }
    show(&state, render);

    if !range.watch {
        return Ok(());
    }

    let period = range
        .interval
        .map_or(default_interval, Duration::from_secs);
    let _refresh = AutoRefresh::spawn(store, period);
    output::note(&format!(
        "refreshing every {}s, press Ctrl-C to stop",
        period.as_secs()
    ));

    let mut updates = store.watch();
    let mut last_sync = state.last_sync_at;
    let mut last_error = None;
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                output::note("stopped");
                break;
            }
        }
        let state = updates.borrow_and_update().clone();
        if state.loading {
            continue;
        }
        if state.error.is_some() && state.error != last_error {
            output::warning(&format!(
                "refresh failed: {}",
                state.error.as_deref().unwrap_or_default()
            ));
        }
        last_error = state.error.clone();
        if state.last_sync_at != last_sync {
            last_sync = state.last_sync_at;
            show(&state, render);
        }
    }
    Ok(())
}

fn show<T>(state: &ListState<T>, render: fn(&[T])) {
    render(&state.items);
    if !output::is_json() && output::verbosity() > 0 {
        output::field("Synced", sync_label(state.last_sync_at));
    }
}

fn sync_label(at: Option<DateTime<Utc>>) -> String {
    at.map_or_else(
        || "never".to_string(),
        |at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

/// Format an optional timestamp for a table cell.
pub(crate) fn date_cell(at: Option<DateTime<Utc>>) -> String {
    at.map_or_else(|| "-".to_string(), |at| at.format("%Y-%m-%d %H:%M").to_string())
}
