//! Trackly - client core of a delivery-management platform.
//!
//! Cached, filterable order and delivery lists on top of the platform's REST
//! API, and real-time courier tracking over its SignalR hub.
//!
//! # Architecture
//!
//! The crate follows a hexagonal layout:
//!
//! - [`domain`] - Identifiers, orders, deliveries, positions and list filters
//! - [`port`] - Traits the application needs from the outside world
//! - [`application`] - Query cache, list stores, location subscriber
//! - [`adapter`] - HTTP and SignalR implementations of the ports, and the CLI
//! - [`infrastructure`] - Configuration, reconnection and wiring
//! - [`error`] - Error types for the crate
//!
//! # Example
//!
//! ```no_run
//! use trackly::infrastructure::bootstrap::Trackly;
//! use trackly::infrastructure::config::Config;
//!
//! # async fn demo() -> trackly::error::Result<()> {
//! let config = Config::load_or_default("trackly.toml")?;
//! let trackly = Trackly::build(&config)?;
//! trackly.orders.load(Default::default()).await;
//! println!("{} orders", trackly.orders.state().items.len());
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
