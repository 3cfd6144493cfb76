//! Tracking hub port.
//!
//! A [`HubConnection`] is a bidirectional RPC channel: the client invokes
//! named server methods and receives named server-to-client invocations as
//! [`HubEvent`]s. Lifecycle changes are reported in the same event stream.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Server method joining a delivery group.
pub const JOIN_DELIVERY_GROUP: &str = "JoinDeliveryGroup";
/// Server method leaving a delivery group.
pub const LEAVE_DELIVERY_GROUP: &str = "LeaveDeliveryGroup";
/// Server method publishing a driver position.
pub const UPDATE_LOCATION: &str = "UpdateLocation";

/// Client method carrying a position update.
pub const LOCATION_UPDATED: &str = "LocationUpdated";
/// Client method carrying a status change pushed by the tracking page backend.
pub const STATUS_UPDATED: &str = "StatusUpdated";
/// Client method carrying a status change pushed by the hub itself.
pub const DELIVERY_STATUS_CHANGED: &str = "DeliveryStatusChanged";

/// Something that happened on a hub connection.
#[derive(Debug, Clone, PartialEq)]
pub enum HubEvent {
    /// The server invoked a client method.
    Invocation { target: String, arguments: Vec<Value> },
    /// The transport was lost.
    Disconnected { reason: String },
    /// The transport was lost and a reconnect attempt is pending.
    Reconnecting { attempt: u32, reason: String },
    /// A reconnect succeeded. Server-side group membership is gone.
    Reconnected,
    /// The connection is closed for good.
    Closed { reason: Option<String> },
}

impl HubEvent {
    /// True for events after which the connection yields nothing more.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Disconnected { .. } | Self::Closed { .. })
    }
}

/// RPC connection to the tracking hub.
///
/// `next_event` must be cancel-safe: callers poll it inside `select!`.
#[async_trait]
pub trait HubConnection: Send {
    /// Open the transport and complete the protocol handshake.
    async fn start(&mut self) -> Result<()>;

    /// Invoke a server method and wait for its completion.
    async fn invoke(&mut self, method: &str, arguments: Vec<Value>) -> Result<Value>;

    /// Next event, or `None` once the connection is closed.
    async fn next_event(&mut self) -> Option<HubEvent>;

    /// Close the transport.
    async fn stop(&mut self) -> Result<()>;

    /// Hub URL, for logging.
    fn endpoint(&self) -> &str;
}

#[async_trait]
impl HubConnection for Box<dyn HubConnection> {
    async fn start(&mut self) -> Result<()> {
        (**self).start().await
    }

    async fn invoke(&mut self, method: &str, arguments: Vec<Value>) -> Result<Value> {
        (**self).invoke(method, arguments).await
    }

    async fn next_event(&mut self) -> Option<HubEvent> {
        (**self).next_event().await
    }

    async fn stop(&mut self) -> Result<()> {
        (**self).stop().await
    }

    fn endpoint(&self) -> &str {
        (**self).endpoint()
    }
}

/// Builds a fresh, unstarted hub connection.
pub type HubConnector = Arc<dyn Fn() -> Box<dyn HubConnection> + Send + Sync>;
