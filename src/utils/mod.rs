//! Utility modules shared by the ingestion pipeline

pub mod http_client;
pub mod time;
pub mod url;

// Re-export commonly used types for convenience
pub use http_client::{ByteStream, HttpFetcher, StandardHttpClient};
pub use url::UrlUtils;
