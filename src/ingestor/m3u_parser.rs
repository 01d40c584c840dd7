//! M3U playlist parsing
//!
//! Supports extended playlists with `#EXTINF` metadata:
//!
//! ```text
//! #EXTM3U x-tvg-url="http://epg.example/e.xml"
//! #EXTINF:-1 tvg-id="CCTV1" tvg-logo="http://logo.example/1.png" group-title="央视",CCTV-1
//! http://live.example/1.m3u8
//! ```
//!
//! Parsing never fails: lines that do not form a complete entry are skipped.

use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

use super::extract_quoted_attribute;
use crate::config::defaults::DEFAULT_GROUP_TITLE;
use crate::models::{Channel, ParsedPlaylist};

const EXTM3U_PREFIX: &str = "#EXTM3U";
const EXTINF_PREFIX: &str = "#EXTINF:";

/// Metadata of an `#EXTINF` header line
#[derive(Debug, Clone, PartialEq, Eq)]
struct ExtinfHeader {
    tvg_id: String,
    tvg_name: String,
    tvg_logo: String,
    group_title: String,
    title: String,
}

impl ExtinfHeader {
    /// Title after the last comma, else `tvg-name`
    fn resolved_name(&self) -> &str {
        if self.title.is_empty() {
            &self.tvg_name
        } else {
            &self.title
        }
    }
}

/// Parse playlist text into channels and the guide URL hint
///
/// Channel ids are `{source_key}-{n}` where `n` counts emitted channels only.
pub fn parse_m3u(source_key: &str, content: &str) -> ParsedPlaylist {
    let lines: Vec<&str> = content
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let mut playlist = ParsedPlaylist::default();
    let mut skipped = 0usize;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        if line.starts_with(EXTM3U_PREFIX) {
            playlist.epg_url_hint = parse_guide_hint(line);
        } else if line.starts_with(EXTINF_PREFIX) {
            let header = parse_extinf_line(line);

            if let Some(next) = lines.get(i + 1).filter(|next| !next.starts_with('#')) {
                let name = header.resolved_name();
                if name.is_empty() {
                    skipped += 1;
                } else {
                    let index = playlist.channels.len();
                    playlist.channels.push(Channel {
                        id: format!("{source_key}-{index}"),
                        tvg_id: header.tvg_id.clone(),
                        name: name.to_string(),
                        logo_url: header.tvg_logo.clone(),
                        group_title: header.group_title.clone(),
                        stream_url: (*next).to_string(),
                    });
                }
                // The URL line belongs to this header either way
                i += 1;
            } else {
                skipped += 1;
            }
        }

        i += 1;
    }

    debug!(
        "Parsed {} channels from playlist '{}' ({} incomplete entries skipped, guide hint: {:?})",
        playlist.channels.len(),
        source_key,
        skipped,
        playlist.epg_url_hint
    );

    playlist
}

/// First URL of `x-tvg-url` / `url-tvg` on an `#EXTM3U` line
fn parse_guide_hint(line: &str) -> String {
    static GUIDE_URL: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(re) = GUIDE_URL
        .get_or_init(|| Regex::new(r#"(?:x-tvg-url|url-tvg)="([^"]*)""#).ok())
        .as_ref()
    else {
        return String::new();
    };

    re.captures(line)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().split(',').next())
        .map(|url| url.trim().to_string())
        .unwrap_or_default()
}

fn parse_extinf_line(line: &str) -> ExtinfHeader {
    let attr = |name: &str| extract_quoted_attribute(line, name).unwrap_or_default().to_string();

    let title = line
        .rfind(',')
        .map(|idx| line[idx + 1..].trim().to_string())
        .unwrap_or_default();

    ExtinfHeader {
        tvg_id: attr("tvg-id"),
        tvg_name: attr("tvg-name"),
        tvg_logo: attr("tvg-logo"),
        group_title: extract_quoted_attribute(line, "group-title")
            .unwrap_or(DEFAULT_GROUP_TITLE)
            .to_string(),
        title,
    }
}
