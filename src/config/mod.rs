use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod defaults;
pub mod duration_serde;

use crate::models::ChannelSource;
use defaults::*;

/// Top-level configuration file
///
/// ```toml
/// [http]
/// user_agent = "AptvPlayer/1.4.10"
/// epg_timeout = "30s"
///
/// [[sources]]
/// key = "cn"
/// name = "China"
/// url = "http://live.example/cn.m3u"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub sources: Vec<ChannelSource>,
}

/// Outbound HTTP settings shared by playlist and guide fetches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User agent sent when a source does not define its own
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Connect timeout for every request; playlist downloads have no total bound
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,
    /// Total bound on an XMLTV download
    #[serde(default = "default_epg_timeout", with = "duration_serde")]
    pub epg_timeout: Duration,
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS)
}

fn default_epg_timeout() -> Duration {
    Duration::from_secs(DEFAULT_EPG_TIMEOUT_SECS)
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            connect_timeout: default_connect_timeout(),
            epg_timeout: default_epg_timeout(),
        }
    }
}

impl Config {
    pub fn load_from_file(config_file: &str) -> Result<Self> {
        if Path::new(config_file).exists() {
            let contents = std::fs::read_to_string(config_file)?;
            Ok(toml::from_str(&contents)?)
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(config_file, contents)?;
            info!("Created default config file: {}", config_file);
            Ok(default_config)
        }
    }

    /// Look up a configured source by key
    pub fn source(&self, key: &str) -> Option<&ChannelSource> {
        self.sources.iter().find(|s| s.key == key)
    }
}
