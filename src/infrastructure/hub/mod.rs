//! Hub connection management.

pub mod reconnecting;

pub use reconnecting::ReconnectingHub;
