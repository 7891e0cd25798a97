pub mod api_server_axum;
pub mod cache;
pub mod config;
pub mod error;
pub mod expiry;
pub mod logging;
pub mod models;
pub mod nse_client;
pub mod resolver;

// Re-exports for convenience
pub use cache::ChainCache;
pub use config::AppConfig;
pub use error::{ApiError, CacheError, UpstreamError};
pub use expiry::format_expiry;
pub use models::{ChainRow, OptionChainSnapshot, OptionType};
pub use nse_client::{ChainSource, NSEClient};
pub use resolver::resolve_premium;
