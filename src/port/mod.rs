//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! ```text
//!                 ┌──────────────────────────┐
//!                 │       Application        │
//!     ┌───────────┤  cache, list, tracking   ├───────────┐
//!     │           └──────────────────────────┘           │
//!     ▼                                                  ▼
//! ┌──────────────┐                              ┌────────────────┐
//! │ HTTP adapter │  ListFetcher, *Gateway       │ SignalR adapter│  HubConnection
//! └──────────────┘                              └────────────────┘
//! ```

pub mod outbound;

pub use outbound::api::{DeliveryGateway, ListFetcher, OrderGateway};
pub use outbound::hub::{HubConnection, HubConnector, HubEvent};
