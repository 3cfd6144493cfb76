//! Reconnecting wrapper for [`HubConnection`].
//!
//! Adds automatic reconnection with exponential backoff and jitter to any hub
//! connection. The wrapper reports its progress in the event stream as
//! [`HubEvent::Reconnecting`], [`HubEvent::Reconnected`] and finally
//! [`HubEvent::Closed`] when it gives up. Group membership is the caller's
//! business: the server forgets it on every new connection.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde_json::Value;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::infrastructure::config::hub::ReconnectionConfig;
use crate::port::outbound::hub::{HubConnection, HubEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkState {
    /// Never started, or the first start failed.
    Idle,
    Up,
    /// Waiting to make reconnection attempt `attempt` at `retry_at`.
    Down { attempt: u32, retry_at: Instant },
    Closed,
}

/// Wrapper that adds automatic reconnection to any [`HubConnection`].
///
/// A failed initial [`start`](HubConnection::start) is returned to the caller
/// and not retried. Once connected, a lost transport is retried until a start
/// succeeds or `max_attempts` consecutive attempts have failed.
///
/// `next_event` stays cancel-safe: the retry deadline is stored before
/// waiting, so a cancelled wait resumes at the same deadline.
pub struct ReconnectingHub<C: HubConnection> {
    inner: C,
    config: ReconnectionConfig,
    /// Backoff delay for the next attempt in milliseconds.
    current_delay_ms: u64,
    state: LinkState,
}

impl<C: HubConnection> ReconnectingHub<C> {
    pub fn new(inner: C, config: ReconnectionConfig) -> Self {
        let initial_delay = config.initial_delay_ms;
        Self {
            inner,
            config,
            current_delay_ms: initial_delay,
            state: LinkState::Idle,
        }
    }

    /// True while the underlying transport is believed to be open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == LinkState::Up
    }

    fn reset_backoff(&mut self) {
        self.current_delay_ms = self.config.initial_delay_ms;
    }

    /// Return the current delay plus jitter, capped at `max_delay_ms`, and
    /// advance the delay for the next call.
    fn next_delay(&mut self) -> Duration {
        let base_ms = self.current_delay_ms;
        let delay_ms = (base_ms + jitter_ms(base_ms)).min(self.config.max_delay_ms);

        let next = (self.current_delay_ms as f64 * self.config.backoff_multiplier) as u64;
        self.current_delay_ms = next.min(self.config.max_delay_ms);

        Duration::from_millis(delay_ms)
    }

    /// Enter the backoff wait for `attempt`.
    fn schedule(&mut self, attempt: u32) -> Duration {
        let delay = self.next_delay();
        self.state = LinkState::Down {
            attempt,
            retry_at: Instant::now() + delay,
        };
        delay
    }

    fn lost(&mut self, reason: String) -> HubEvent {
        let delay = self.schedule(1);
        warn!(
            endpoint = self.inner.endpoint(),
            reason = %reason,
            delay_ms = delay.as_millis() as u64,
            "Hub connection lost, will reconnect"
        );
        HubEvent::Reconnecting { attempt: 1, reason }
    }

    async fn attempt(&mut self, attempt: u32) -> HubEvent {
        match self.inner.start().await {
            Ok(()) => {
                info!(endpoint = self.inner.endpoint(), attempt, "Reconnected to hub");
                self.reset_backoff();
                self.state = LinkState::Up;
                HubEvent::Reconnected
            }
            Err(e) => {
                if self
                    .config
                    .max_attempts
                    .is_some_and(|max| attempt >= max)
                {
                    error!(
                        endpoint = self.inner.endpoint(),
                        attempts = attempt,
                        error = %e,
                        "Giving up on hub reconnection"
                    );
                    self.state = LinkState::Closed;
                    return HubEvent::Closed {
                        reason: Some(format!("gave up after {attempt} attempts: {e}")),
                    };
                }
                let next = attempt + 1;
                let delay = self.schedule(next);
                warn!(
                    error = %e,
                    attempt = next,
                    delay_ms = delay.as_millis() as u64,
                    "Hub reconnection attempt failed"
                );
                HubEvent::Reconnecting {
                    attempt: next,
                    reason: e.to_string(),
                }
            }
        }
    }
}

/// Up to 20% of `base_ms`, to spread simultaneous reconnects.
fn jitter_ms(base_ms: u64) -> u64 {
    let range = base_ms / 5;
    if range == 0 {
        return 0;
    }
    rand::thread_rng().gen_range(0..=range)
}

#[async_trait]
impl<C: HubConnection> HubConnection for ReconnectingHub<C> {
    async fn start(&mut self) -> Result<()> {
        self.inner.start().await?;
        self.reset_backoff();
        self.state = LinkState::Up;
        Ok(())
    }

    async fn invoke(&mut self, method: &str, arguments: Vec<Value>) -> Result<Value> {
        if self.state != LinkState::Up {
            return Err(Error::NotConnected);
        }
        self.inner.invoke(method, arguments).await
    }

    async fn next_event(&mut self) -> Option<HubEvent> {
        match self.state {
            LinkState::Idle | LinkState::Closed => None,
            LinkState::Up => match self.inner.next_event().await {
                Some(HubEvent::Disconnected { reason }) => Some(self.lost(reason)),
                None => Some(self.lost("connection ended".to_string())),
                Some(HubEvent::Closed { reason }) => {
                    debug!(reason = ?reason, "Hub closed by server");
                    self.state = LinkState::Closed;
                    Some(HubEvent::Closed { reason })
                }
                Some(event) => Some(event),
            },
            LinkState::Down { attempt, retry_at } => {
                sleep_until(retry_at).await;
                Some(self.attempt(attempt).await)
            }
        }
    }

    async fn stop(&mut self) -> Result<()> {
        self.state = LinkState::Closed;
        self.inner.stop().await
    }

    fn endpoint(&self) -> &str {
        self.inner.endpoint()
    }
}
