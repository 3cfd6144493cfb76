//! Delivery endpoints.

use async_trait::async_trait;

use super::client::ApiClient;
use crate::domain::{
    CreateDeliveriesBatchRequest, CreateDeliveriesBatchResponse, DeleteDeliveriesBatchRequest,
    DeleteDeliveriesBatchResponse, Delivery, DeliveryId, DeliveryTracking, ListFilters,
};
use crate::error::Result;
use crate::port::{DeliveryGateway, ListFetcher};

const DELIVERIES: &str = "/api/deliveries";

/// [`DeliveryGateway`] backed by the REST API.
#[derive(Debug, Clone)]
pub struct HttpDeliveries {
    client: ApiClient,
}

impl HttpDeliveries {
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

fn tracking_path(id: DeliveryId) -> String {
    format!("/api/public/deliveries/{id}/tracking")
}

#[async_trait]
impl ListFetcher for HttpDeliveries {
    type Item = Delivery;

    async fn fetch(&self, filters: &ListFilters) -> Result<Vec<Delivery>> {
        self.client.get(DELIVERIES, &filters.query_pairs()).await
    }

    fn resource(&self) -> &'static str {
        "deliveries"
    }
}

#[async_trait]
impl DeliveryGateway for HttpDeliveries {
    async fn get(&self, id: DeliveryId) -> Result<Delivery> {
        self.client.get(&format!("{DELIVERIES}/{id}"), &[]).await
    }

    async fn create_batch(
        &self,
        request: &CreateDeliveriesBatchRequest,
    ) -> Result<CreateDeliveriesBatchResponse> {
        self.client
            .post(&format!("{DELIVERIES}/batch"), request)
            .await
    }

    async fn delete_batch(
        &self,
        request: &DeleteDeliveriesBatchRequest,
    ) -> Result<DeleteDeliveriesBatchResponse> {
        self.client
            .post(&format!("{DELIVERIES}/batch/delete"), request)
            .await
    }

    async fn public_tracking(&self, id: DeliveryId) -> Result<DeliveryTracking> {
        self.client.get(&tracking_path(id), &[]).await
    }
}
