//! Backend REST API adapter.

pub mod client;
pub mod deliveries;
pub mod orders;

pub use client::ApiClient;
pub use deliveries::HttpDeliveries;
pub use orders::HttpOrders;
