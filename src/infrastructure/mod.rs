//! Infrastructure layer.
//!
//! Technical concerns that support the application without containing
//! business logic.
//!
//! # Submodules
//!
//! - [`bootstrap`] - Composition root for runtime wiring
//! - [`config`] - Configuration loading and validation
//! - [`hub`] - Automatic reconnection of hub connections

pub mod bootstrap;
pub mod config;
pub mod hub;
