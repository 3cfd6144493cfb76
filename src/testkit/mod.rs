//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`hub`]: mock [`HubConnection`](crate::port::HubConnection)
//!   implementations, `ScriptedHub` and `ChannelHub`.
//! - [`fetcher`]: mock list fetchers, `StaticFetcher` and `GatedFetcher`.
//! - [`gateway`]: in-memory order and delivery gateways.
//! - [`domain`]: builders for ids, orders, deliveries and positions.
//! - [`config`]: canonical test configurations.

pub mod config;
pub mod domain;
pub mod fetcher;
pub mod gateway;
pub mod hub;
