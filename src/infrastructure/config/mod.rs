//! Infrastructure configuration modules.

pub mod api;
pub mod cache;
pub mod hub;
pub mod logging;
pub mod settings;

pub use api::ApiConfig;
pub use cache::{CacheConfig, RefreshConfig};
pub use hub::{HubConfig, ReconnectionConfig};
pub use logging::LoggingConfig;
pub use settings::Config;
