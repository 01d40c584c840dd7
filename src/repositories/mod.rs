//! Access to channel source definitions
//!
//! The channel cache never reads configuration directly. It goes through
//! [`SourceConfigProvider`], which lists the known sources and records the
//! channel count observed on each successful refresh.

pub mod source_store;

pub use source_store::{InMemorySourceStore, TomlSourceStore};

use async_trait::async_trait;

use crate::errors::AppResult;
use crate::models::ChannelSource;

/// Source of channel source definitions
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SourceConfigProvider: Send + Sync {
    /// All configured sources, disabled ones included
    async fn list_sources(&self) -> AppResult<Vec<ChannelSource>>;

    /// Store an updated definition, matched by key
    async fn persist(&self, source: &ChannelSource) -> AppResult<()>;

    /// Look up one source by key
    async fn find_source(&self, key: &str) -> AppResult<Option<ChannelSource>> {
        Ok(self.list_sources().await?.into_iter().find(|s| s.key == key))
    }
}
