//! Subscription state and the events published to observers.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{DeliveryId, DeliveryStatus, Position};

/// Connection lifecycle of a tracking subscription.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Error,
}

impl ConnectionStatus {
    /// True while a session exists, healthy or recovering.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Connecting | Self::Connected | Self::Reconnecting)
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pushed delivery status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryStatusUpdate {
    pub delivery_id: DeliveryId,
    pub status: DeliveryStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub received_at: DateTime<Utc>,
}

/// Everything a tracking view renders.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionState {
    pub status: ConnectionStatus,
    pub last_known_position: Option<Position>,
    pub current_group: Option<DeliveryId>,
    pub last_status: Option<DeliveryStatusUpdate>,
    pub last_error: Option<String>,
}

impl SubscriptionState {
    /// Record `position` unless it is older than the one already held.
    pub(crate) fn accept_position(&mut self, position: Position) -> bool {
        if let Some(current) = &self.last_known_position {
            if position.updated_at < current.updated_at {
                return false;
            }
        }
        self.last_known_position = Some(position);
        true
    }
}

/// Pushed to event subscribers as it happens.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TrackingEvent {
    Location {
        delivery_id: DeliveryId,
        position: Position,
    },
    Status(DeliveryStatusUpdate),
    Connection {
        status: ConnectionStatus,
    },
}
