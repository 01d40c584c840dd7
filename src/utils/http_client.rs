use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::{Client, Response, header::USER_AGENT};
use std::time::Duration;
use tracing::debug;

use crate::errors::{AppError, AppResult, SourceError};
use crate::utils::url::UrlUtils;

/// Body of a streamed response, chunk by chunk
pub type ByteStream = BoxStream<'static, AppResult<Bytes>>;

/// Outbound HTTP used by the channel pipeline
///
/// Every request carries the caller's user agent. Implementations must treat
/// non-success statuses as errors.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    /// Fetch URL and return the full text body
    async fn fetch_text(&self, url: &str, user_agent: &str) -> AppResult<String>;

    /// Open URL and return its body as a stream of chunks
    async fn open_stream(&self, url: &str, user_agent: &str) -> AppResult<ByteStream>;
}

/// Default implementation of HttpFetcher using reqwest
pub struct StandardHttpClient {
    client: Client,
}

impl StandardHttpClient {
    /// Create new HTTP client with only connection timeout (no total request timeout)
    ///
    /// Total bounds are applied by callers that need them; playlist downloads
    /// are deliberately left unbounded.
    pub fn with_connection_timeout(connect_timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }

    async fn send(&self, url: &str, user_agent: &str) -> AppResult<Response> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, user_agent)
            .send()
            .await
            .map_err(|e| {
                AppError::external_service("http_client", UrlUtils::obfuscate_credentials(&e.to_string()))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Http {
                status: status.as_u16(),
                message: format!(
                    "{} - URL: {}",
                    status.canonical_reason().unwrap_or("Unknown"),
                    UrlUtils::obfuscate_credentials(url)
                ),
            }
            .into());
        }

        Ok(response)
    }
}

#[async_trait]
impl HttpFetcher for StandardHttpClient {
    async fn fetch_text(&self, url: &str, user_agent: &str) -> AppResult<String> {
        debug!("Fetching text content from: {}", UrlUtils::obfuscate_credentials(url));

        let content = self.send(url, user_agent).await?.text().await?;

        debug!("Successfully fetched {} characters of text content", content.len());
        Ok(content)
    }

    async fn open_stream(&self, url: &str, user_agent: &str) -> AppResult<ByteStream> {
        debug!("Opening streamed download from: {}", UrlUtils::obfuscate_credentials(url));

        let response = self.send(url, user_agent).await?;
        if let Some(length) = response.content_length() {
            debug!("Streamed download announces {} bytes", length);
        }

        Ok(response.bytes_stream().map(|chunk| chunk.map_err(AppError::from)).boxed())
    }
}
