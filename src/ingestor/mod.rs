//! Ingestion of live playlists and their programme guides
//!
//! - [`m3u_parser`] turns playlist text into channels and a guide URL hint
//! - [`tvg_matcher`] resolves guide channel ids to playlist identifiers
//! - [`xmltv_stream`] streams a guide and keeps programmes for matched channels

pub mod m3u_parser;
pub mod tvg_matcher;
pub mod xmltv_stream;

pub use m3u_parser::parse_m3u;
pub use tvg_matcher::TvgIdMatcher;
pub use xmltv_stream::{EpgOutcome, fetch_epg};

/// Value of the first `name="..."` attribute on a line
///
/// Returns `None` when the attribute is absent or its closing quote is missing.
pub(crate) fn extract_quoted_attribute<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let needle = format!("{name}=\"");
    let start = line.find(&needle)? + needle.len();
    let len = line[start..].find('"')?;
    Some(&line[start..start + len])
}
