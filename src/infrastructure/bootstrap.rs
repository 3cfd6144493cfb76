//! Composition root: builds the client's services from configuration.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::adapter::outbound::http::{ApiClient, HttpDeliveries, HttpOrders};
use crate::adapter::outbound::signalr::SignalRConnection;
use crate::application::cache::{CacheOptions, QueryCache};
use crate::application::list::{
    deliveries_store, orders_store, DeliveriesService, DeliveriesStore, OrdersService, OrdersStore,
};
use crate::application::tracking::LocationSubscriber;
use crate::domain::TenantId;
use crate::error::Result;
use crate::infrastructure::config::hub::HubConfig;
use crate::infrastructure::config::settings::Config;
use crate::infrastructure::hub::ReconnectingHub;
use crate::port::outbound::hub::{HubConnection, HubConnector};

/// Connector producing reconnecting SignalR connections to the tracking hub.
#[must_use]
pub fn hub_connector(config: &HubConfig, tenant_id: Option<TenantId>) -> HubConnector {
    let config = config.clone();
    Arc::new(move || {
        let connection = SignalRConnection::from_config(&config, tenant_id);
        Box::new(ReconnectingHub::new(connection, config.reconnection.clone()))
            as Box<dyn HubConnection>
    })
}

/// Everything a front end needs, sharing one query cache.
pub struct Trackly {
    pub cache: QueryCache,
    pub cache_options: CacheOptions,
    pub orders: Arc<OrdersStore<HttpOrders>>,
    pub deliveries: Arc<DeliveriesStore<HttpDeliveries>>,
    pub order_service: OrdersService<HttpOrders>,
    pub delivery_service: DeliveriesService<HttpDeliveries>,
    /// Period of list auto-refresh.
    pub refresh_interval: Duration,
    hub: HubConnector,
}

impl Trackly {
    /// Wire the API adapters, list stores and hub connector.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built from `[api]`.
    pub fn build(config: &Config) -> Result<Self> {
        let client = ApiClient::from_config(&config.api)?;
        let cache = QueryCache::new();
        let cache_options = config.cache.options();

        let orders_gateway = Arc::new(HttpOrders::new(client.clone()));
        let deliveries_gateway = Arc::new(HttpDeliveries::new(client));

        let orders = Arc::new(orders_store(
            orders_gateway.clone(),
            cache.clone(),
            cache_options,
        ));
        let deliveries = Arc::new(deliveries_store(
            deliveries_gateway.clone(),
            cache.clone(),
            cache_options,
        ));

        info!(
            api = %config.api.base_url,
            hub = %config.hub.url,
            tenant = ?config.api.tenant_id,
            "Client configured"
        );

        Ok(Self {
            order_service: OrdersService::new(orders_gateway, cache.clone()),
            delivery_service: DeliveriesService::new(deliveries_gateway, cache.clone()),
            cache,
            cache_options,
            orders,
            deliveries,
            refresh_interval: config.refresh.interval(),
            hub: hub_connector(&config.hub, config.api.tenant_id),
        })
    }

    /// A new, disconnected location subscriber.
    #[must_use]
    pub fn subscriber(&self) -> LocationSubscriber {
        LocationSubscriber::new(self.hub.clone())
    }
}
