//! SignalR tracking hub adapter.

pub mod connection;
pub mod protocol;

pub use connection::{websocket_url, SignalRConnection};
