//! Source definition stores backed by memory or the TOML configuration file

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use super::SourceConfigProvider;
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::models::ChannelSource;

/// Replace the entry with the same key, or append
fn upsert(sources: &mut Vec<ChannelSource>, source: &ChannelSource) {
    match sources.iter_mut().find(|s| s.key == source.key) {
        Some(existing) => *existing = source.clone(),
        None => sources.push(source.clone()),
    }
}

/// Process-local store, used for ad-hoc sources and in tests
#[derive(Debug, Default)]
pub struct InMemorySourceStore {
    sources: RwLock<Vec<ChannelSource>>,
}

impl InMemorySourceStore {
    pub fn new(sources: Vec<ChannelSource>) -> Self {
        Self {
            sources: RwLock::new(sources),
        }
    }
}

#[async_trait]
impl SourceConfigProvider for InMemorySourceStore {
    async fn list_sources(&self) -> AppResult<Vec<ChannelSource>> {
        Ok(self.sources.read().await.clone())
    }

    async fn persist(&self, source: &ChannelSource) -> AppResult<()> {
        upsert(&mut *self.sources.write().await, source);
        Ok(())
    }
}

/// Store reading and rewriting the `[[sources]]` tables of a config file
///
/// Other sections of the file are preserved through a full load and save.
#[derive(Debug)]
pub struct TomlSourceStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl TomlSourceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    async fn read_config(&self) -> AppResult<Config> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(Config::default());
        }
        let contents = tokio::fs::read_to_string(&self.path).await?;
        toml::from_str(&contents).map_err(|e| {
            AppError::configuration(format!("Invalid config file {}: {e}", self.path.display()))
        })
    }
}

#[async_trait]
impl SourceConfigProvider for TomlSourceStore {
    async fn list_sources(&self) -> AppResult<Vec<ChannelSource>> {
        Ok(self.read_config().await?.sources)
    }

    async fn persist(&self, source: &ChannelSource) -> AppResult<()> {
        let _guard = self.write_lock.lock().await;

        let mut config = self.read_config().await?;
        upsert(&mut config.sources, source);

        let contents = toml::to_string_pretty(&config)
            .map_err(|e| AppError::internal(format!("Failed to serialize config: {e}")))?;
        tokio::fs::write(&self.path, contents).await?;

        debug!("Persisted source '{}' to {}", source.key, self.path.display());
        Ok(())
    }
}
