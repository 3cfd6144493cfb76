//! Order and delivery use cases.
//!
//! Every successful write invalidates the list pages it may have changed.

use std::sync::Arc;

use tracing::info;

use super::store::ListStore;
use crate::application::cache::{CacheOptions, QueryCache};
use crate::domain::{
    CreateDeliveriesBatchRequest, CreateDeliveriesBatchResponse, CreateOrderRequest,
    DeleteDeliveriesBatchRequest, DeleteDeliveriesBatchResponse, DeleteOrdersBatchRequest,
    DeleteOrdersBatchResponse, Delivery, DeliveryId, DeliveryTracking, ImportOrdersResponse, Order,
    OrderDetail, OrderId,
};
use crate::error::Result;
use crate::port::{DeliveryGateway, ListFetcher, OrderGateway};

/// Cache scope of the orders list.
pub const ORDERS_SCOPE: &str = "orders:list";
/// Cache scope of the deliveries list.
pub const DELIVERIES_SCOPE: &str = "deliveries:list";

/// Orders list view.
pub type OrdersStore<F> = ListStore<F>;
/// Deliveries list view.
pub type DeliveriesStore<F> = ListStore<F>;

pub fn orders_store<F>(fetcher: Arc<F>, cache: QueryCache, options: CacheOptions) -> OrdersStore<F>
where
    F: ListFetcher<Item = Order>,
{
    ListStore::new(ORDERS_SCOPE, fetcher, cache, options)
}

pub fn deliveries_store<F>(
    fetcher: Arc<F>,
    cache: QueryCache,
    options: CacheOptions,
) -> DeliveriesStore<F>
where
    F: ListFetcher<Item = Delivery>,
{
    ListStore::new(DELIVERIES_SCOPE, fetcher, cache, options)
}

fn scope_prefix(scope: &str) -> String {
    format!("{scope}:")
}

pub struct OrdersService<G: OrderGateway> {
    gateway: Arc<G>,
    cache: QueryCache,
}

impl<G: OrderGateway> OrdersService<G> {
    pub fn new(gateway: Arc<G>, cache: QueryCache) -> Self {
        Self { gateway, cache }
    }

    pub async fn get(&self, id: OrderId) -> Result<OrderDetail> {
        self.gateway.get(id).await
    }

    pub async fn create(&self, request: &CreateOrderRequest) -> Result<Order> {
        let order = self.gateway.create(request).await?;
        self.invalidate_lists();
        info!(order_id = %order.id, "Order created");
        Ok(order)
    }

    pub async fn import(&self, orders: &[CreateOrderRequest]) -> Result<ImportOrdersResponse> {
        let response = self.gateway.import(orders).await?;
        self.invalidate_lists();
        info!(
            created = response.created,
            rejected = response.errors.len(),
            "Orders imported"
        );
        Ok(response)
    }

    pub async fn delete_batch(
        &self,
        request: &DeleteOrdersBatchRequest,
    ) -> Result<DeleteOrdersBatchResponse> {
        let response = self.gateway.delete_batch(request).await?;
        self.invalidate_lists();
        info!(
            deleted = response.deleted,
            skipped = response.skipped,
            "Orders deleted"
        );
        Ok(response)
    }

    fn invalidate_lists(&self) {
        self.cache.invalidate_prefix(&scope_prefix(ORDERS_SCOPE));
    }
}

pub struct DeliveriesService<G: DeliveryGateway> {
    gateway: Arc<G>,
    cache: QueryCache,
}

impl<G: DeliveryGateway> DeliveriesService<G> {
    pub fn new(gateway: Arc<G>, cache: QueryCache) -> Self {
        Self { gateway, cache }
    }

    pub async fn get(&self, id: DeliveryId) -> Result<Delivery> {
        self.gateway.get(id).await
    }

    pub async fn public_tracking(&self, id: DeliveryId) -> Result<DeliveryTracking> {
        self.gateway.public_tracking(id).await
    }

    pub async fn create_batch(
        &self,
        request: &CreateDeliveriesBatchRequest,
    ) -> Result<CreateDeliveriesBatchResponse> {
        let response = self.gateway.create_batch(request).await?;
        self.invalidate_lists();
        info!(created = response.created, driver_id = %request.driver_id, "Deliveries created");
        Ok(response)
    }

    pub async fn delete_batch(
        &self,
        request: &DeleteDeliveriesBatchRequest,
    ) -> Result<DeleteDeliveriesBatchResponse> {
        let response = self.gateway.delete_batch(request).await?;
        self.invalidate_lists();
        info!(deleted = response.deleted, "Deliveries deleted");
        Ok(response)
    }

    // Order status follows its deliveries, so both lists go.
    fn invalidate_lists(&self) {
        self.cache.invalidate_prefix(&scope_prefix(DELIVERIES_SCOPE));
        self.cache.invalidate_prefix(&scope_prefix(ORDERS_SCOPE));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::cache::build_key;
    use crate::domain::ListFilters;
    use crate::testkit::gateway::{MemoryDeliveries, MemoryOrders};

    fn seeded_cache() -> QueryCache {
        let cache = QueryCache::new();
        let options = CacheOptions::default();
        cache.set(&build_key(ORDERS_SCOPE, &ListFilters::default()), 1, options);
        cache.set(
            &build_key(ORDERS_SCOPE, &ListFilters::default().with_search("x")),
            2,
            options,
        );
        cache.set(&build_key(DELIVERIES_SCOPE, &ListFilters::default()), 3, options);
        cache
    }

    #[tokio::test]
    async fn order_batch_delete_invalidates_order_pages_only() {
        let cache = seeded_cache();
        let service = OrdersService::new(Arc::new(MemoryOrders::default()), cache.clone());

        service
            .delete_batch(&DeleteOrdersBatchRequest {
                ids: vec![OrderId::random()],
                force_delete_deliveries: false,
            })
            .await
            .unwrap();

        assert_eq!(cache.len(), 1);
        assert!(cache
            .get::<i32>(&build_key(DELIVERIES_SCOPE, &ListFilters::default()))
            .is_some());
    }

    #[tokio::test]
    async fn failed_write_keeps_cache() {
        let cache = seeded_cache();
        let gateway = MemoryOrders::default();
        gateway.fail_writes();
        let service = OrdersService::new(Arc::new(gateway), cache.clone());

        let result = service
            .create(&CreateOrderRequest {
                customer_name: "Alice".into(),
                address: "1 rue de la Loge".into(),
                order_date: None,
            })
            .await;

        assert!(result.is_err());
        assert_eq!(cache.len(), 3);
    }

    #[tokio::test]
    async fn delivery_writes_invalidate_both_scopes() {
        let cache = seeded_cache();
        let service = DeliveriesService::new(Arc::new(MemoryDeliveries::default()), cache.clone());

        service
            .delete_batch(&DeleteDeliveriesBatchRequest {
                ids: vec![DeliveryId::random()],
            })
            .await
            .unwrap();

        assert!(cache.is_empty());
    }
}
