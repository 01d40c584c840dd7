//! Process-wide cache of parsed channel bundles
//!
//! Entries are keyed by source key and live until they are invalidated or
//! replaced by a forced refresh; there is no TTL. A bundle is assembled
//! completely before the single write that publishes it, so readers see
//! either the previous state or the full new bundle.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::HttpConfig;
use crate::errors::{AppResult, SourceError};
use crate::ingestor::{TvgIdMatcher, fetch_epg, parse_m3u};
use crate::models::{ChannelBundle, ChannelSource, IdentifierSpace};
use crate::repositories::SourceConfigProvider;
use crate::utils::{HttpFetcher, UrlUtils};

/// Settings applied to every refresh
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub default_user_agent: String,
    pub epg_timeout: Duration,
}

impl From<&HttpConfig> for CacheSettings {
    fn from(config: &HttpConfig) -> Self {
        Self {
            default_user_agent: config.user_agent.clone(),
            epg_timeout: config.epg_timeout,
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self::from(&HttpConfig::default())
    }
}

pub struct ChannelCache {
    provider: Arc<dyn SourceConfigProvider>,
    http: Arc<dyn HttpFetcher>,
    settings: CacheSettings,
    entries: RwLock<HashMap<String, Arc<ChannelBundle>>>,
}

impl ChannelCache {
    pub fn new(
        provider: Arc<dyn SourceConfigProvider>,
        http: Arc<dyn HttpFetcher>,
        settings: CacheSettings,
    ) -> Self {
        Self {
            provider,
            http,
            settings,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Bundle for `key`, refreshing it on a miss
    ///
    /// Unknown keys and refreshes that produce no channels yield `Ok(None)`.
    /// Errors come only from the source provider.
    pub async fn get(&self, key: &str) -> AppResult<Option<Arc<ChannelBundle>>> {
        if let Some(bundle) = self.peek(key).await {
            return Ok(Some(bundle));
        }

        let Some(mut source) = self.provider.find_source(key).await? else {
            debug!("No channel source configured for key '{}'", key);
            return Ok(None);
        };

        let Some(bundle) = self.build_bundle(&source).await else {
            return Ok(None);
        };
        let bundle = self.store(&source.key, bundle).await;

        source.cached_channel_count = Some(bundle.channel_count);
        if let Err(e) = self.provider.persist(&source).await {
            warn!("Failed to persist channel count for source '{}': {}", source.key, e);
        }

        Ok(Some(bundle))
    }

    /// Drop the entry for `key`, if any
    pub async fn invalidate(&self, key: &str) {
        if self.entries.write().await.remove(key).is_some() {
            debug!("Invalidated cached channels for '{}'", key);
        }
    }

    /// Rebuild the entry for `source`, discarding the current one first
    ///
    /// Returns the new channel count, or 0 when the refresh failed and
    /// nothing was stored.
    pub async fn refresh(&self, source: &ChannelSource) -> usize {
        self.invalidate(&source.key).await;

        match self.build_bundle(source).await {
            Some(bundle) => self.store(&source.key, bundle).await.channel_count,
            None => 0,
        }
    }

    /// Refresh every enabled source in configuration order
    pub async fn refresh_all(&self) -> AppResult<Vec<(String, usize)>> {
        let sources = self.provider.list_sources().await?;
        let mut counts = Vec::with_capacity(sources.len());

        for source in sources.iter().filter(|s| !s.disabled) {
            let count = self.refresh(source).await;
            counts.push((source.key.clone(), count));
        }

        info!(
            "Refreshed {} sources, {} channels in total",
            counts.len(),
            counts.iter().map(|(_, n)| n).sum::<usize>()
        );
        Ok(counts)
    }

    /// Cached bundle for `key` without triggering a refresh
    pub async fn peek(&self, key: &str) -> Option<Arc<ChannelBundle>> {
        self.entries.read().await.get(key).cloned()
    }

    /// Keys with a cached bundle, sorted
    pub async fn cached_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    async fn store(&self, key: &str, bundle: ChannelBundle) -> Arc<ChannelBundle> {
        let bundle = Arc::new(bundle);
        self.entries
            .write()
            .await
            .insert(key.to_string(), Arc::clone(&bundle));
        bundle
    }

    /// Playlist, identifier space, guide; `None` when no channel survives
    async fn build_bundle(&self, source: &ChannelSource) -> Option<ChannelBundle> {
        if !UrlUtils::is_valid(&source.url) {
            let err = SourceError::invalid_config("url", format!("'{}' is not a valid URL", source.url));
            warn!("Skipping refresh of '{}': {}", source.key, err);
            return None;
        }

        let user_agent = source.user_agent_or(&self.settings.default_user_agent);
        let safe_url = UrlUtils::obfuscate_credentials(&source.url);

        let content = match self.http.fetch_text(&source.url, user_agent).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to fetch playlist for '{}' from {}: {}", source.key, safe_url, e);
                return None;
            }
        };

        let playlist = parse_m3u(&source.key, &content);
        if playlist.channels.is_empty() {
            warn!("Playlist for '{}' at {} contains no channels", source.key, safe_url);
            return None;
        }

        let identifier_space = IdentifierSpace::choose(&playlist.channels);
        let matcher = TvgIdMatcher::new(identifier_space.identifiers(&playlist.channels));

        let epg_source_url = source
            .explicit_epg_url()
            .map(str::to_string)
            .unwrap_or(playlist.epg_url_hint);
        let epg_by_channel = fetch_epg(
            self.http.as_ref(),
            &epg_source_url,
            user_agent,
            &matcher,
            self.settings.epg_timeout,
        )
        .await
        .into_programs();

        info!(
            "Refreshed '{}': {} channels, guide data for {} of {} identifiers",
            source.key,
            playlist.channels.len(),
            epg_by_channel.len(),
            matcher.len()
        );

        Some(ChannelBundle {
            channel_count: playlist.channels.len(),
            channels: playlist.channels,
            epg_source_url,
            identifier_space,
            epg_by_channel,
        })
    }
}
