use async_trait::async_trait;
use reqwest::{header, Client};
use std::time::Duration;
use url::Url;

use crate::error::{Error, FetchError, Result};

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> std::result::Result<String, FetchError>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(FETCH_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            header::HeaderValue::from_static("en-US,en;q=0.5"),
        );

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<String, FetchError> {
        tracing::info!("Fetching page: {}", url);

        let response = self.client.get(url).send().await.map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Page fetch for {} returned {}", url, status);
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let body = response.text().await.map_err(classify)?;
        tracing::debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(body)
    }
}

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::NetworkFailure(err.to_string())
    }
}

/// Adds `https://` to scheme-less input and checks the result is an http(s) URL.
pub fn normalize_url(input: &str) -> Result<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidUrl("URL is empty".to_string()));
    }

    let lower = trimmed.to_ascii_lowercase();
    let candidate = if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else if trimmed.contains("://") {
        return Err(Error::InvalidUrl(format!(
            "unsupported scheme in '{}'",
            trimmed
        )));
    } else {
        format!("https://{}", trimmed)
    };

    let parsed = Url::parse(&candidate)
        .map_err(|e| Error::InvalidUrl(format!("'{}': {}", trimmed, e)))?;
    if parsed.host_str().map(str::is_empty).unwrap_or(true) {
        return Err(Error::InvalidUrl(format!("'{}' has no host", trimmed)));
    }

    Ok(candidate)
}
