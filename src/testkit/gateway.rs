//! In-memory order and delivery gateways.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use super::domain;
use crate::domain::{
    CreateDeliveriesBatchRequest, CreateDeliveriesBatchResponse, CreateOrderRequest,
    DeleteDeliveriesBatchRequest, DeleteDeliveriesBatchResponse, DeleteOrdersBatchRequest,
    DeleteOrdersBatchResponse, Delivery, DeliveryId, DeliveryStatus, DeliveryTracking,
    ImportOrdersResponse, ListFilters, Order, OrderDetail, OrderId,
};
use crate::error::{Error, Result};
use crate::port::{DeliveryGateway, ListFetcher, OrderGateway};

fn write_failure() -> Error {
    Error::Api {
        status: 500,
        details: "scripted write failure".into(),
    }
}

fn not_found() -> Error {
    Error::Api {
        status: 404,
        details: "not found".into(),
    }
}

/// Orders kept in a vector; writes can be made to fail.
#[derive(Default)]
pub struct MemoryOrders {
    orders: Mutex<Vec<Order>>,
    failing: AtomicBool,
}

impl MemoryOrders {
    pub fn with_orders(orders: Vec<Order>) -> Self {
        Self {
            orders: Mutex::new(orders),
            failing: AtomicBool::new(false),
        }
    }

    pub fn fail_writes(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    fn check_writes(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(write_failure());
        }
        Ok(())
    }
}

#[async_trait]
impl ListFetcher for MemoryOrders {
    type Item = Order;

    async fn fetch(&self, filters: &ListFilters) -> Result<Vec<Order>> {
        let orders = self.orders.lock();
        let matches = |order: &&Order| match &filters.search {
            Some(term) => order.customer_name.contains(term.as_str()),
            None => true,
        };
        Ok(orders.iter().filter(matches).cloned().collect())
    }

    fn resource(&self) -> &'static str {
        "orders"
    }
}

#[async_trait]
impl OrderGateway for MemoryOrders {
    async fn get(&self, id: OrderId) -> Result<OrderDetail> {
        let orders = self.orders.lock();
        let order = orders.iter().find(|o| o.id == id).ok_or_else(not_found)?;
        Ok(OrderDetail {
            id: order.id,
            customer_name: order.customer_name.clone(),
            address: order.address.clone(),
            order_date: order.order_date,
            status: order.status,
            created_at: order.created_at.unwrap_or_else(Utc::now),
            deliveries: Vec::new(),
        })
    }

    async fn create(&self, request: &CreateOrderRequest) -> Result<Order> {
        self.check_writes()?;
        let mut order = domain::order(&request.customer_name);
        order.address = request.address.clone();
        order.order_date = request.order_date;
        self.orders.lock().push(order.clone());
        Ok(order)
    }

    async fn import(&self, orders: &[CreateOrderRequest]) -> Result<ImportOrdersResponse> {
        let mut created = Vec::with_capacity(orders.len());
        for request in orders {
            created.push(self.create(request).await?);
        }
        Ok(ImportOrdersResponse {
            created: created.len() as u32,
            errors: Vec::new(),
            orders: created,
        })
    }

    async fn delete_batch(
        &self,
        request: &DeleteOrdersBatchRequest,
    ) -> Result<DeleteOrdersBatchResponse> {
        self.check_writes()?;
        let mut orders = self.orders.lock();
        let before = orders.len();
        orders.retain(|o| !request.ids.contains(&o.id));
        let deleted = (before - orders.len()) as u32;
        Ok(DeleteOrdersBatchResponse {
            deleted,
            deleted_deliveries: 0,
            skipped: request.ids.len() as u32 - deleted,
            message: format!("{deleted} order(s) deleted"),
        })
    }
}

/// Deliveries kept in a vector.
#[derive(Default)]
pub struct MemoryDeliveries {
    deliveries: Mutex<Vec<Delivery>>,
}

impl MemoryDeliveries {
    pub fn with_deliveries(deliveries: Vec<Delivery>) -> Self {
        Self {
            deliveries: Mutex::new(deliveries),
        }
    }
}

#[async_trait]
impl ListFetcher for MemoryDeliveries {
    type Item = Delivery;

    async fn fetch(&self, filters: &ListFilters) -> Result<Vec<Delivery>> {
        let deliveries = self.deliveries.lock();
        Ok(deliveries
            .iter()
            .filter(|d| filters.driver_id.map_or(true, |driver| d.driver_id == Some(driver)))
            .cloned()
            .collect())
    }

    fn resource(&self) -> &'static str {
        "deliveries"
    }
}

#[async_trait]
impl DeliveryGateway for MemoryDeliveries {
    async fn get(&self, id: DeliveryId) -> Result<Delivery> {
        self.deliveries
            .lock()
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or_else(not_found)
    }

    async fn create_batch(
        &self,
        request: &CreateDeliveriesBatchRequest,
    ) -> Result<CreateDeliveriesBatchResponse> {
        let created: Vec<Delivery> = request
            .order_ids
            .iter()
            .map(|order_id| {
                let mut delivery = domain::delivery(DeliveryStatus::Pending);
                delivery.order_id = *order_id;
                delivery.driver_id = Some(request.driver_id);
                delivery
            })
            .collect();
        self.deliveries.lock().extend(created.iter().cloned());
        Ok(CreateDeliveriesBatchResponse {
            created: created.len() as u32,
            deliveries: created,
        })
    }

    async fn delete_batch(
        &self,
        request: &DeleteDeliveriesBatchRequest,
    ) -> Result<DeleteDeliveriesBatchResponse> {
        let mut deliveries = self.deliveries.lock();
        let before = deliveries.len();
        deliveries.retain(|d| !request.ids.contains(&d.id));
        let deleted = (before - deliveries.len()) as u32;
        Ok(DeleteDeliveriesBatchResponse {
            deleted,
            message: format!("{deleted} delivery(ies) deleted"),
        })
    }

    async fn public_tracking(&self, id: DeliveryId) -> Result<DeliveryTracking> {
        let delivery = self.get(id).await?;
        Ok(DeliveryTracking {
            delivery_id: delivery.id,
            status: delivery.status,
            completed_at: delivery.completed_at,
            customer_name: None,
            address: None,
            driver_name: None,
        })
    }
}
