//! Backend-facing domain types: identifiers, orders, deliveries, positions
//! and list filters.

pub mod delivery;
pub mod filter;
pub mod id;
pub mod order;
pub mod position;

pub use delivery::{
    CreateDeliveriesBatchRequest, CreateDeliveriesBatchResponse, DeleteDeliveriesBatchRequest,
    DeleteDeliveriesBatchResponse, Delivery, DeliveryStatus, DeliveryTracking,
};
pub use filter::{DateFilter, ListFilters};
pub use id::{DeliveryId, DriverId, OrderId, RouteId, TenantId};
pub use order::{
    CreateOrderRequest, DeleteOrdersBatchRequest, DeleteOrdersBatchResponse, ImportOrdersResponse,
    Order, OrderDelivery, OrderDetail, OrderStatus,
};
pub use position::{ArrivalEstimate, Coordinates, Position, DEFAULT_COURIER_SPEED_KMH};
