//! Live delivery tracking over the hub.

mod message;
pub mod state;
pub mod subscriber;

pub use state::{ConnectionStatus, DeliveryStatusUpdate, SubscriptionState, TrackingEvent};
pub use subscriber::LocationSubscriber;
