//! Order types as exchanged with the backend.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::delivery::DeliveryStatus;
use super::id::{DeliveryId, DriverId, OrderId};

/// Lifecycle of an order, derived by the backend from its deliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Planned,
    InTransit,
    Delivered,
    Cancelled,
    /// A status this client does not know yet.
    #[serde(other)]
    Unknown,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Planned => "planned",
            Self::InTransit => "in transit",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// One row of the orders list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub customer_name: String,
    pub address: String,
    #[serde(default)]
    pub order_date: Option<DateTime<Utc>>,
    pub status: OrderStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Delivery summary embedded in an order detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDelivery {
    pub id: DeliveryId,
    pub driver_id: DriverId,
    #[serde(default)]
    pub driver_name: Option<String>,
    pub status: DeliveryStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Full order returned by `GET /api/orders/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    pub id: OrderId,
    pub customer_name: String,
    pub address: String,
    #[serde(default)]
    pub order_date: Option<DateTime<Utc>>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub deliveries: Vec<OrderDelivery>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub customer_name: String,
    pub address: String,
    pub order_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOrdersResponse {
    pub created: u32,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub orders: Vec<Order>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOrdersBatchRequest {
    pub ids: Vec<OrderId>,
    /// Also delete deliveries attached to the orders instead of skipping them.
    pub force_delete_deliveries: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOrdersBatchResponse {
    pub deleted: u32,
    #[serde(default)]
    pub deleted_deliveries: u32,
    #[serde(default)]
    pub skipped: u32,
    #[serde(default)]
    pub message: String,
}
