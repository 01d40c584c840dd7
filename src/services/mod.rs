//! Application services

pub mod channel_cache;

pub use channel_cache::{CacheSettings, ChannelCache};
