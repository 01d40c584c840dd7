//! Domain models for live channel sources, parsed channels and guide data

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::utils::time::parse_xmltv_timestamp;

/// Where a source definition came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceOrigin {
    /// Shipped with the configuration file
    #[default]
    Config,
    /// Added by a user at runtime
    Custom,
}

/// A configured live playlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSource {
    pub key: String,
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Explicit guide URL; overrides the playlist's `x-tvg-url` hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epg_url: Option<String>,
    #[serde(default)]
    pub origin: SourceOrigin,
    /// Channel count seen on the last successful refresh
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_channel_count: Option<usize>,
    #[serde(default)]
    pub disabled: bool,
}

impl ChannelSource {
    pub fn new(key: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            url: url.into(),
            user_agent: None,
            epg_url: None,
            origin: SourceOrigin::Config,
            cached_channel_count: None,
            disabled: false,
        }
    }

    /// User agent for this source, falling back to `default`
    pub fn user_agent_or<'a>(&'a self, default: &'a str) -> &'a str {
        match self.user_agent.as_deref() {
            Some(ua) if !ua.trim().is_empty() => ua,
            _ => default,
        }
    }

    /// The configured guide URL when it is non-blank
    pub fn explicit_epg_url(&self) -> Option<&str> {
        self.epg_url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }
}

/// One playable entry of a playlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// `{source_key}-{index}`, unique within a source
    pub id: String,
    /// May be empty
    pub tvg_id: String,
    pub name: String,
    pub logo_url: String,
    pub group_title: String,
    pub stream_url: String,
}

/// One guide entry; times are kept in their XMLTV text form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramEntry {
    pub start_time: String,
    pub end_time: String,
    pub title: String,
}

impl ProgramEntry {
    pub fn start_at(&self) -> Option<DateTime<FixedOffset>> {
        parse_xmltv_timestamp(&self.start_time)
    }

    pub fn end_at(&self) -> Option<DateTime<FixedOffset>> {
        parse_xmltv_timestamp(&self.end_time)
    }

    /// Whether `now` falls in `[start, end)`; unparseable times never air
    pub fn is_airing_at(&self, now: DateTime<FixedOffset>) -> bool {
        match (self.start_at(), self.end_at()) {
            (Some(start), Some(end)) => start <= now && now < end,
            _ => false,
        }
    }
}

/// Guide data keyed by playlist identifier (tvg-id or channel name)
pub type EpgByChannel = HashMap<String, Vec<ProgramEntry>>;

/// Which channel field was used to key guide data for a source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierSpace {
    #[default]
    TvgId,
    Name,
}

impl IdentifierSpace {
    /// Collect the identifiers of `channels` in this space, in playlist order
    pub fn identifiers(self, channels: &[Channel]) -> Vec<String> {
        channels
            .iter()
            .map(|c| match self {
                Self::TvgId => c.tvg_id.as_str(),
                Self::Name => c.name.as_str(),
            })
            .filter(|id| !id.trim().is_empty())
            .map(str::to_string)
            .collect()
    }

    /// tvg-ids when any channel carries one, otherwise names for the whole source
    pub fn choose(channels: &[Channel]) -> Self {
        if channels.iter().any(|c| !c.tvg_id.trim().is_empty()) {
            Self::TvgId
        } else {
            Self::Name
        }
    }

    fn key_of(self, channel: &Channel) -> &str {
        match self {
            Self::TvgId => &channel.tvg_id,
            Self::Name => &channel.name,
        }
    }
}

/// Output of one playlist parse
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPlaylist {
    /// `x-tvg-url` / `url-tvg` from the `#EXTM3U` header, empty when absent
    pub epg_url_hint: String,
    pub channels: Vec<Channel>,
}

/// Cached result of a full refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelBundle {
    pub channel_count: usize,
    pub channels: Vec<Channel>,
    pub epg_source_url: String,
    pub identifier_space: IdentifierSpace,
    pub epg_by_channel: EpgByChannel,
}

impl ChannelBundle {
    /// Guide entries for a channel of this bundle
    pub fn programs_for(&self, channel: &Channel) -> &[ProgramEntry] {
        self.epg_by_channel
            .get(self.identifier_space.key_of(channel))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of programmes across all channels
    pub fn program_count(&self) -> usize {
        self.epg_by_channel.values().map(Vec::len).sum()
    }
}

/// Index of the programme airing at `now`
pub fn now_playing_index(programs: &[ProgramEntry], now: DateTime<FixedOffset>) -> Option<usize> {
    programs.iter().position(|p| p.is_airing_at(now))
}
