//! Order endpoints.

use async_trait::async_trait;
use serde::Serialize;

use super::client::ApiClient;
use crate::domain::{
    CreateOrderRequest, DeleteOrdersBatchRequest, DeleteOrdersBatchResponse,
    ImportOrdersResponse, ListFilters, Order, OrderDetail, OrderId,
};
use crate::error::Result;
use crate::port::{ListFetcher, OrderGateway};

const ORDERS: &str = "/api/orders";

#[derive(Serialize)]
struct ImportOrdersBody<'a> {
    orders: &'a [CreateOrderRequest],
}

/// [`OrderGateway`] backed by the REST API.
#[derive(Debug, Clone)]
pub struct HttpOrders {
    client: ApiClient,
}

impl HttpOrders {
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ListFetcher for HttpOrders {
    type Item = Order;

    async fn fetch(&self, filters: &ListFilters) -> Result<Vec<Order>> {
        self.client.get(ORDERS, &filters.query_pairs()).await
    }

    fn resource(&self) -> &'static str {
        "orders"
    }
}

#[async_trait]
impl OrderGateway for HttpOrders {
    async fn get(&self, id: OrderId) -> Result<OrderDetail> {
        self.client.get(&format!("{ORDERS}/{id}"), &[]).await
    }

    async fn create(&self, request: &CreateOrderRequest) -> Result<Order> {
        self.client.post(ORDERS, request).await
    }

    async fn import(&self, orders: &[CreateOrderRequest]) -> Result<ImportOrdersResponse> {
        self.client
            .post(&format!("{ORDERS}/import"), &ImportOrdersBody { orders })
            .await
    }

    async fn delete_batch(
        &self,
        request: &DeleteOrdersBatchRequest,
    ) -> Result<DeleteOrdersBatchResponse> {
        self.client
            .post(&format!("{ORDERS}/batch/delete"), request)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn import_body_wraps_orders() {
        let orders = vec![CreateOrderRequest {
            customer_name: "Ada".into(),
            address: "1 Main St".into(),
            order_date: None,
        }];
        let body = serde_json::to_value(ImportOrdersBody { orders: &orders }).unwrap();
        assert_eq!(
            body,
            json!({"orders": [{"customerName": "Ada", "address": "1 Main St", "orderDate": null}]})
        );
    }

    #[test]
    fn resource_name() {
        assert_eq!(HttpOrders::new(ApiClient::new("http://localhost")).resource(), "orders");
    }
}
