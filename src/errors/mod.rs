//! Centralized error handling for the live channel pipeline
//!
//! # Error Categories
//!
//! - **Source Errors**: upstream playlist / guide connectivity and parsing
//! - **Configuration Errors**: unreadable or invalid configuration and source store
//! - **External Service Errors**: transport failures reported by the HTTP client
//!
//! Configuration misses (an unknown source key) are not errors; the channel
//! cache reports them as `None`.
//!
//! # Usage
//!
//! ```rust
//! use live_epg::errors::{AppError, AppResult};
//!
//! fn example_function() -> AppResult<String> {
//!     Ok("success".to_string())
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;
