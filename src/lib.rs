//! Estimate tool front ends: process configuration, logging setup and the
//! optional HTTP API. The domain lives in `estimate-core` and `estimate-cost`.

pub mod config;
pub mod logging;

#[cfg(feature = "http_api")]
pub mod http_api;

pub use config::{AppConfig, ConfigError, StoreBackend};
pub use estimate_core;
pub use estimate_cost;
