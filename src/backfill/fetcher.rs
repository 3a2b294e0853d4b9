//! HTTP fetcher for record images
//!
//! This module handles all HTTP requests made by the pipeline:
//! - Building the HTTP client with a browser user agent and timeout
//! - A single GET per image, no retries
//! - Error classification into transport failures and bad statuses
//! - Deriving the asset filename from the URL path

use crate::config::FetcherConfig;
use reqwest::{Client, StatusCode};
use std::error::Error as _;
use std::fmt;
use url::Url;

/// Name used when a URL has no usable trailing path segment
pub const FALLBACK_FILENAME: &str = "image";

/// Raw bytes downloaded for a record
#[derive(Debug, Clone)]
pub struct FetchedAsset {
    /// The URL the image was requested from
    pub url: String,

    /// Trailing path segment of the URL
    pub filename: String,

    /// Response body
    pub bytes: Vec<u8>,
}

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Server answered 200 with a body
    Success(FetchedAsset),

    /// Server answered with anything other than 200
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// The request never produced a usable response (bad URL, DNS,
    /// connection, timeout, body read)
    NetworkError {
        /// Error description
        error: String,
    },
}

impl FetchResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

impl fmt::Display for FetchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success(asset) => write!(f, "Fetched {} bytes", asset.bytes.len()),
            Self::HttpError { status_code } => {
                write!(f, "Server responded with code: {}", status_code)
            }
            Self::NetworkError { error } => write!(f, "Reason: {}", error),
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The fetcher configuration (user agent and timeout)
///
/// # Example
///
/// ```no_run
/// use featured_backfill::config::FetcherConfig;
/// use featured_backfill::backfill::build_http_client;
///
/// let client = build_http_client(&FetcherConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(config.timeout())
        .gzip(true)
        .brotli(true)
        .build()
}

/// Downloads an image
///
/// # Result Mapping
///
/// | Condition | Result |
/// |-----------|--------|
/// | URL does not parse | NetworkError |
/// | Connection, DNS, TLS, timeout | NetworkError |
/// | Status other than 200 | HttpError |
/// | Body read fails | NetworkError |
/// | 200 with body | Success |
pub async fn fetch_image(client: &Client, url: &str) -> FetchResult {
    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(e) => {
            return FetchResult::NetworkError {
                error: format!("A valid URL was not provided ({}: {})", url, e),
            }
        }
    };

    let response = match client.get(parsed.clone()).send().await {
        Ok(response) => response,
        Err(e) => {
            return FetchResult::NetworkError {
                error: describe_error(&e),
            }
        }
    };

    let status = response.status();
    if status != StatusCode::OK {
        return FetchResult::HttpError {
            status_code: status.as_u16(),
        };
    }

    match response.bytes().await {
        Ok(body) => FetchResult::Success(FetchedAsset {
            url: url.to_string(),
            filename: filename_from_url(&parsed),
            bytes: body.to_vec(),
        }),
        Err(e) => FetchResult::NetworkError {
            error: describe_error(&e),
        },
    }
}

/// Returns the trailing path segment of a URL
///
/// Query strings and fragments are never part of the name. URLs ending in
/// `/` or without a path fall back to [`FALLBACK_FILENAME`].
pub fn filename_from_url(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.last())
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.to_string())
        .unwrap_or_else(|| FALLBACK_FILENAME.to_string())
}

/// Flattens a reqwest error and its sources into one line
fn describe_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        return "Request timed out".to_string();
    }

    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
