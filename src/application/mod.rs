//! Application services (use cases).
//!
//! These services coordinate domain types and outbound ports:
//!
//! - [`cache`]: the shared query cache
//! - [`list`]: cached list views and the write services that invalidate them
//! - [`tracking`]: the real-time location subscriber

pub mod cache;
pub mod list;
pub mod tracking;
