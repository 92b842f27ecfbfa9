pub mod client;
pub mod error;
pub mod snapshot;
mod types;

pub use client::AnalyticsClient;
pub use error::AnalyticsError;
pub use snapshot::write_snapshot;
