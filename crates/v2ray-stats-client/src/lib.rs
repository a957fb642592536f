pub mod client;
pub mod error;
pub mod proto;

pub use client::{StatsClient, StatsClientConfig, DEFAULT_SERVICE_NAME, KNOWN_SERVICE_NAMES};
pub use error::{classify_status, StatsClientError};
pub use proto::{Stat, SysStatsResponse};
