/// Configuration default values
///
/// Central location for the defaults used by `[http]` and the pipeline.

// HTTP defaults
pub const DEFAULT_USER_AGENT: &str = "AptvPlayer/1.4.10";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
/// Hard upper bound on an XMLTV download, body included
pub const DEFAULT_EPG_TIMEOUT_SECS: u64 = 30;

// Playlist defaults
pub const DEFAULT_GROUP_TITLE: &str = "无分组";

// Config file defaults
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";
