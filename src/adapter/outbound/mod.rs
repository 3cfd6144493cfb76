//! Outbound adapters (driven side): the REST API over HTTP and the tracking
//! hub over SignalR.

pub mod http;
pub mod signalr;
