//! Outbound ports (driven side): the backend REST API and the tracking hub.

pub mod api;
pub mod hub;
