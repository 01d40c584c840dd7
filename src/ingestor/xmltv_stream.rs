//! Streaming XMLTV guide ingestion
//!
//! Guide documents can be hundreds of megabytes, so the body is never held in
//! memory. Chunks are split into lines as they arrive; only the incomplete
//! trailing line is carried over to the next chunk. Each line goes through a
//! small state machine that recognises the subset of XMLTV we use:
//!
//! ```text
//! <channel id="cctv-1">
//! <programme channel="cctv-1" start="20250101120000 +0800" stop="20250101130000 +0800">
//!   <title lang="zh">新闻联播</title>
//! </programme>
//! ```
//!
//! Gzip-compressed guides are detected from their first bytes and inflated
//! incrementally.

use futures::StreamExt;
use regex::Regex;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::extract_quoted_attribute;
use super::tvg_matcher::TvgIdMatcher;
use crate::errors::{AppError, AppResult, SourceError};
use crate::models::{EpgByChannel, ProgramEntry};
use crate::utils::HttpFetcher;
use crate::utils::url::UrlUtils;

/// Result of one guide download
#[derive(Debug)]
pub enum EpgOutcome {
    /// No guide URL was configured or advertised
    NoGuide,
    /// The document was read to the end
    Parsed {
        programs: EpgByChannel,
        mapped_channels: usize,
    },
    /// Fetch, decode or timeout failure; partial results are discarded
    Failed(AppError),
}

impl EpgOutcome {
    /// Guide data, with failures collapsed to an empty mapping
    pub fn into_programs(self) -> EpgByChannel {
        match self {
            Self::Parsed { programs, .. } => programs,
            Self::NoGuide | Self::Failed(_) => EpgByChannel::new(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Download and parse a guide for the identifiers known to `matcher`
///
/// The whole download, body included, is bounded by `timeout`.
pub async fn fetch_epg(
    http: &dyn HttpFetcher,
    epg_url: &str,
    user_agent: &str,
    matcher: &TvgIdMatcher,
    timeout: Duration,
) -> EpgOutcome {
    if epg_url.trim().is_empty() {
        return EpgOutcome::NoGuide;
    }
    let safe_url = UrlUtils::obfuscate_credentials(epg_url);

    let download = async {
        let mut stream = http.open_stream(epg_url, user_agent).await?;
        let mut parser = XmltvLineParser::new(matcher);
        let mut body = BodyDecoder::default();
        let mut lines = LineBuffer::default();
        let mut received = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            received += chunk.len() as u64;
            let decoded = body.decode(&chunk)?;
            lines.push(&decoded, |line| parser.process_line(line));
        }
        let tail = body.finish()?;
        lines.push(&tail, |line| parser.process_line(line));
        lines.finish(|line| parser.process_line(line));

        debug!("Read {} bytes of guide data from {}", received, safe_url);
        Ok::<_, AppError>(parser)
    };

    match tokio::time::timeout(timeout, download).await {
        Ok(Ok(parser)) => {
            let mapped_channels = parser.mapped_channel_count();
            let programs = parser.into_programs();
            info!(
                "Parsed guide {}: {} channels matched, {} programmes",
                safe_url,
                mapped_channels,
                programs.values().map(Vec::len).sum::<usize>()
            );
            EpgOutcome::Parsed {
                programs,
                mapped_channels,
            }
        }
        Ok(Err(e)) => {
            warn!("Guide {} could not be read: {}", safe_url, e);
            EpgOutcome::Failed(e)
        }
        Err(_) => {
            warn!("Guide {} did not complete within {:?}", safe_url, timeout);
            EpgOutcome::Failed(SourceError::timeout(safe_url).into())
        }
    }
}

/// Line-level XMLTV state machine
pub struct XmltvLineParser<'m> {
    matcher: &'m TvgIdMatcher,
    /// Guide channel id -> playlist identifier, accumulated over the document
    channel_mapping: HashMap<String, String>,
    current_epg_channel_id: String,
    current_mapped_id: String,
    current_program: Option<ProgramEntry>,
    skip_current_program: bool,
    programs: EpgByChannel,
}

impl<'m> XmltvLineParser<'m> {
    pub fn new(matcher: &'m TvgIdMatcher) -> Self {
        Self {
            matcher,
            channel_mapping: HashMap::new(),
            current_epg_channel_id: String::new(),
            current_mapped_id: String::new(),
            current_program: None,
            skip_current_program: false,
            programs: EpgByChannel::new(),
        }
    }

    pub fn process_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        if line.starts_with("<channel id=\"") {
            self.on_channel(line);
        } else if line.starts_with("<programme") {
            self.on_programme_open(line);
        } else if line.starts_with("<title") {
            self.on_title(line);
        } else if line == "</programme>" {
            self.reset_programme();
        }
    }

    fn on_channel(&mut self, line: &str) {
        let Some(epg_channel_id) = extract_quoted_attribute(line, "id") else {
            return;
        };
        if let Some(identifier) = self.matcher.find_match(epg_channel_id) {
            self.channel_mapping
                .insert(epg_channel_id.to_string(), identifier.to_string());
        }
    }

    fn on_programme_open(&mut self, line: &str) {
        self.current_epg_channel_id = extract_quoted_attribute(line, "channel")
            .unwrap_or_default()
            .to_string();
        self.current_mapped_id = self
            .channel_mapping
            .get(&self.current_epg_channel_id)
            .cloned()
            .unwrap_or_default();

        let start = extract_quoted_attribute(line, "start").unwrap_or_default();
        let stop = extract_quoted_attribute(line, "stop").unwrap_or_default();

        if !self.current_mapped_id.is_empty() && !start.is_empty() && !stop.is_empty() {
            self.current_program = Some(ProgramEntry {
                start_time: start.to_string(),
                end_time: stop.to_string(),
                title: String::new(),
            });
            self.skip_current_program = false;
        } else {
            self.current_program = None;
            self.skip_current_program = true;
        }
    }

    fn on_title(&mut self, line: &str) {
        if self.skip_current_program || self.current_mapped_id.is_empty() {
            return;
        }
        let Some(mut program) = self.current_program.take() else {
            return;
        };

        match title_text(line) {
            Some(title) => {
                program.title = title.to_string();
                self.programs
                    .entry(self.current_mapped_id.clone())
                    .or_default()
                    .push(program);
            }
            // Not a complete single-line title; keep waiting
            None => self.current_program = Some(program),
        }
    }

    fn reset_programme(&mut self) {
        self.current_program = None;
        self.current_epg_channel_id.clear();
        self.current_mapped_id.clear();
        self.skip_current_program = false;
    }

    /// Number of guide channels resolved to a playlist identifier
    pub fn mapped_channel_count(&self) -> usize {
        self.channel_mapping.len()
    }

    pub fn into_programs(self) -> EpgByChannel {
        self.programs
    }
}

/// Inner text of `<title ...>text</title>`
fn title_text(line: &str) -> Option<&str> {
    static TITLE: OnceLock<Option<Regex>> = OnceLock::new();
    TITLE
        .get_or_init(|| Regex::new(r"<title(?:\s+[^>]*)?>(.*?)</title>").ok())
        .as_ref()?
        .captures(line)?
        .get(1)
        .map(|m| m.as_str())
}

/// Longest line kept while waiting for its newline
///
/// Minified guides put the whole document on one line; such a line can never
/// be recognised and is dropped instead of being buffered.
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// Carries the incomplete trailing line between chunks
#[derive(Debug)]
pub struct LineBuffer {
    pending: Vec<u8>,
    /// Inside an overlong line; skip bytes up to the next newline
    discarding: bool,
    max_line_len: usize,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::with_max_line_len(MAX_LINE_LEN)
    }
}

impl LineBuffer {
    pub fn with_max_line_len(max_line_len: usize) -> Self {
        Self {
            pending: Vec::new(),
            discarding: false,
            max_line_len,
        }
    }

    /// Append `chunk` and emit every line it completes
    pub fn push(&mut self, chunk: &[u8], mut on_line: impl FnMut(&str)) {
        let mut rest = chunk;
        while let Some(newline) = rest.iter().position(|b| *b == b'\n') {
            let line = &rest[..newline];
            rest = &rest[newline + 1..];

            if self.discarding {
                self.discarding = false;
            } else if self.pending.is_empty() {
                on_line(&String::from_utf8_lossy(line));
            } else {
                self.pending.extend_from_slice(line);
                on_line(&String::from_utf8_lossy(&self.pending));
                self.pending.clear();
            }
        }

        if self.discarding {
            return;
        }
        self.pending.extend_from_slice(rest);
        if self.pending.len() > self.max_line_len {
            debug!(
                "Dropping guide line longer than {} bytes without a newline",
                self.max_line_len
            );
            self.pending = Vec::new();
            self.discarding = true;
        }
    }

    /// Emit whatever is left once the stream has ended
    pub fn finish(self, mut on_line: impl FnMut(&str)) {
        if !self.discarding && !self.pending.is_empty() {
            on_line(&String::from_utf8_lossy(&self.pending));
        }
    }

    #[cfg(test)]
    fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Bytes needed to recognise a gzip header
const SNIFF_LEN: usize = 3;

/// Turns raw body chunks into document bytes
#[derive(Default)]
enum BodyDecoder {
    /// Not enough bytes seen to tell whether the body is compressed
    #[default]
    Sniffing,
    Buffered(Vec<u8>),
    Plain,
    #[cfg(feature = "compression-gzip")]
    Gzip(flate2::write::MultiGzDecoder<Vec<u8>>),
}

impl BodyDecoder {
    fn decode<'a>(&mut self, chunk: &'a [u8]) -> AppResult<Cow<'a, [u8]>> {
        match self {
            Self::Plain => Ok(Cow::Borrowed(chunk)),
            #[cfg(feature = "compression-gzip")]
            Self::Gzip(decoder) => inflate(decoder, chunk).map(Cow::Owned),
            Self::Sniffing | Self::Buffered(_) => {
                let mut head = match std::mem::take(self) {
                    Self::Buffered(head) => head,
                    _ => Vec::new(),
                };
                head.extend_from_slice(chunk);
                if head.len() < SNIFF_LEN {
                    *self = Self::Buffered(head);
                    return Ok(Cow::Owned(Vec::new()));
                }
                self.select(&head)?;
                self.decode(&head).map(|bytes| Cow::Owned(bytes.into_owned()))
            }
        }
    }

    fn select(&mut self, head: &[u8]) -> AppResult<()> {
        if !infer::archive::is_gz(head) {
            *self = Self::Plain;
            return Ok(());
        }

        #[cfg(feature = "compression-gzip")]
        {
            debug!("Guide body is gzip-compressed, inflating while streaming");
            *self = Self::Gzip(flate2::write::MultiGzDecoder::new(Vec::new()));
            Ok(())
        }
        #[cfg(not(feature = "compression-gzip"))]
        {
            Err(SourceError::parse("xmltv", "gzip-compressed guide but gzip support is disabled").into())
        }
    }

    /// Flush buffered or compressed state at end of stream
    fn finish(self) -> AppResult<Vec<u8>> {
        match self {
            Self::Sniffing | Self::Plain => Ok(Vec::new()),
            Self::Buffered(head) => Ok(head),
            #[cfg(feature = "compression-gzip")]
            Self::Gzip(decoder) => decoder
                .finish()
                .map_err(|e| SourceError::parse("xmltv", format!("Truncated gzip guide: {e}")).into()),
        }
    }
}

#[cfg(feature = "compression-gzip")]
fn inflate(decoder: &mut flate2::write::MultiGzDecoder<Vec<u8>>, chunk: &[u8]) -> AppResult<Vec<u8>> {
    use std::io::Write;

    decoder
        .write_all(chunk)
        .map_err(|e| SourceError::parse("xmltv", format!("Failed to inflate guide: {e}")))?;
    Ok(std::mem::take(decoder.get_mut()))
}
