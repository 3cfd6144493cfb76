//! List views backed by the query cache, and the write services that keep
//! them consistent.

pub mod refresh;
pub mod service;
pub mod store;

pub use refresh::{AutoRefresh, DEFAULT_REFRESH_INTERVAL};
pub use service::{
    deliveries_store, orders_store, DeliveriesService, DeliveriesStore, OrdersService,
    OrdersStore, DELIVERIES_SCOPE, ORDERS_SCOPE,
};
pub use store::{ListPage, ListState, ListStore};
