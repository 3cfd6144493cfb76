//! Backend API ports.
//!
//! List views only need [`ListFetcher`]; the mutation services also need the
//! gateways so they can invalidate the cache after a successful write.

use async_trait::async_trait;

use crate::domain::{
    CreateDeliveriesBatchRequest, CreateDeliveriesBatchResponse, CreateOrderRequest,
    DeleteDeliveriesBatchRequest, DeleteDeliveriesBatchResponse, DeleteOrdersBatchRequest,
    DeleteOrdersBatchResponse, Delivery, DeliveryId, DeliveryTracking, ImportOrdersResponse,
    ListFilters, Order, OrderDetail, OrderId,
};
use crate::error::Result;

/// Source of one list page for a set of filters.
#[async_trait]
pub trait ListFetcher: Send + Sync + 'static {
    type Item: Clone + Send + Sync + 'static;

    async fn fetch(&self, filters: &ListFilters) -> Result<Vec<Self::Item>>;

    /// Resource name for logging.
    fn resource(&self) -> &'static str;
}

/// Order endpoints.
#[async_trait]
pub trait OrderGateway: ListFetcher<Item = Order> {
    async fn get(&self, id: OrderId) -> Result<OrderDetail>;

    async fn create(&self, request: &CreateOrderRequest) -> Result<Order>;

    async fn import(&self, orders: &[CreateOrderRequest]) -> Result<ImportOrdersResponse>;

    async fn delete_batch(&self, request: &DeleteOrdersBatchRequest)
        -> Result<DeleteOrdersBatchResponse>;
}

/// Delivery endpoints.
#[async_trait]
pub trait DeliveryGateway: ListFetcher<Item = Delivery> {
    async fn get(&self, id: DeliveryId) -> Result<Delivery>;

    async fn create_batch(
        &self,
        request: &CreateDeliveriesBatchRequest,
    ) -> Result<CreateDeliveriesBatchResponse>;

    async fn delete_batch(
        &self,
        request: &DeleteDeliveriesBatchRequest,
    ) -> Result<DeleteDeliveriesBatchResponse>;

    /// Unauthenticated tracking view shared with customers.
    async fn public_tracking(&self, id: DeliveryId) -> Result<DeliveryTracking>;
}
