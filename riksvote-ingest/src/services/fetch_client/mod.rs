//! Paginated fetch client
//!
//! Issues rate-limited JSON requests against the upstream API and hands back
//! uniform lists of JSON objects.
//!
//! # Response classes
//! - 2xx: body decoded as JSON (an empty body counts as no data)
//! - 404: "no data for this key", returned as `Ok(None)` / empty list
//! - 429, 5xx, transport failure: retried with exponential backoff, then
//!   [`FetchError::FetchFailed`] / [`FetchError::Transport`]
//! - any other status: [`FetchError::FetchFailed`] immediately
//!
//! # Pagination
//! [`FetchClient::paginate`] yields non-empty pages starting at a chosen page
//! number and stops at the first empty page. [`FetchClient::fetch_linked`]
//! follows an explicit next-page marker instead, for endpoints that ignore
//! page numbers.

mod normalize;
mod rate_limiter;
mod transport;

pub use normalize::{
    decode_items, lenient_i64, lenient_string, normalize_list, one_or_many, text_at, value_at,
};
pub use rate_limiter::RateLimiter;
pub use transport::{HttpTransport, RawResponse, Transport, TransportError};

use async_stream::try_stream;
use futures::Stream;
use reqwest::Url;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Fetch client errors
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Fetch failed for {url}: HTTP {status}")]
    FetchFailed { url: String, status: u16 },

    #[error("Network error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Invalid JSON from {url}: {message}")]
    Decode { url: String, message: String },
}

impl FetchError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::FetchFailed { status, .. } => *status == 429 || *status >= 500,
            Self::Transport { .. } => true,
            Self::Decode { .. } => false,
        }
    }
}

/// Timing and retry policy for upstream requests
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    /// Minimum interval between the starts of consecutive requests
    pub request_delay: Duration,
    /// Retries after the first attempt for retryable failures
    pub max_retries: u32,
    /// First backoff; doubles per retry, capped at 30s
    pub retry_backoff: Duration,
    /// Upper bound on pages fetched by one pagination run
    pub max_pages: u32,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            request_delay: Duration::from_millis(500),
            max_retries: 3,
            retry_backoff: Duration::from_secs(1),
            max_pages: 500,
        }
    }
}

/// Where a collection lives inside a response body
#[derive(Debug, Clone, Copy)]
pub struct Collection {
    /// Path to the (single-or-array) collection field
    pub items: &'static [&'static str],
    /// Path to the optional next-page marker
    pub next_page: Option<&'static [&'static str]>,
}

/// A page-numbered list request
#[derive(Debug, Clone)]
pub struct PagedRequest {
    /// Request URL without the page parameter
    pub url: Url,
    pub page_param: &'static str,
    pub collection: Collection,
    /// First page to fetch (1-based); restart from a later page by raising it
    pub start_page: u32,
}

impl PagedRequest {
    pub fn page_url(&self, page: u32) -> Url {
        let mut url = self.url.clone();
        url.query_pairs_mut().append_pair(self.page_param, &page.to_string());
        url
    }
}

/// One non-empty page of results
#[derive(Debug, Clone)]
pub struct Page {
    pub number: u32,
    pub items: Vec<Value>,
    /// Upstream's next-page marker, when present
    pub next_page: Option<String>,
}

/// Rate-limited, retrying JSON client
pub struct FetchClient {
    transport: Arc<dyn Transport>,
    rate_limiter: RateLimiter,
    policy: FetchPolicy,
}

impl FetchClient {
    pub fn new(transport: Arc<dyn Transport>, policy: FetchPolicy) -> Self {
        Self {
            transport,
            rate_limiter: RateLimiter::new(policy.request_delay),
            policy,
        }
    }

    /// Fetch one URL as JSON
    ///
    /// `Ok(None)` means the upstream has no data for this key (404 or an
    /// empty body).
    pub async fn fetch_json(&self, url: &Url) -> Result<Option<Value>, FetchError> {
        let mut attempt = 0u32;
        let mut backoff = self.policy.retry_backoff;

        loop {
            attempt += 1;
            self.rate_limiter.wait().await;

            tracing::debug!(url = %url, attempt, "GET");

            let err = match self.transport.get(url).await {
                Ok(response) => match classify(url, response) {
                    Ok(body) => return Ok(body),
                    Err(e) => e,
                },
                Err(e) => FetchError::Transport {
                    url: url.to_string(),
                    message: e.0,
                },
            };

            if !err.is_retryable() || attempt > self.policy.max_retries {
                return Err(err);
            }

            tracing::warn!(
                url = %url,
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                error = %err,
                "Upstream request failed, retrying"
            );
            tokio::time::sleep(backoff).await;
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }
    }

    /// Fetch one URL and normalize the collection inside it
    pub async fn fetch_list(&self, url: &Url, collection: &Collection) -> Result<Vec<Value>, FetchError> {
        Ok(self
            .fetch_json(url)
            .await?
            .map(|body| normalize_list(value_at(&body, collection.items)))
            .unwrap_or_default())
    }

    /// Fetch a list, following next-page markers until none is given
    ///
    /// Stops early on an empty page, a marker that repeats the current URL,
    /// or after `max_pages` requests.
    pub async fn fetch_linked(&self, url: &Url, collection: &Collection) -> Result<Vec<Value>, FetchError> {
        let mut items = Vec::new();
        let mut current = url.clone();

        for _ in 0..self.policy.max_pages.max(1) {
            let Some(body) = self.fetch_json(&current).await? else {
                break;
            };

            let page = normalize_list(value_at(&body, collection.items));
            if page.is_empty() {
                break;
            }
            items.extend(page);

            let next = collection
                .next_page
                .and_then(|path| text_at(&body, path))
                .and_then(|marker| current.join(&marker).ok());

            match next {
                Some(next_url) if next_url != current => current = next_url,
                _ => return Ok(items),
            }
        }

        Ok(items)
    }

    /// Lazily page through a list endpoint
    ///
    /// Yields each non-empty page; the stream ends at the first empty page
    /// (404 included) and errors end it with the failing URL.
    pub fn paginate(&self, request: PagedRequest) -> impl Stream<Item = Result<Page, FetchError>> + '_ {
        try_stream! {
            let mut number = request.start_page.max(1);
            let mut fetched = 0u32;

            loop {
                if fetched >= self.policy.max_pages {
                    tracing::warn!(
                        url = %request.url,
                        max_pages = self.policy.max_pages,
                        "Pagination stopped at page limit"
                    );
                    break;
                }

                let url = request.page_url(number);
                let body = self.fetch_json(&url).await?;
                fetched += 1;

                let items = body
                    .as_ref()
                    .map(|b| normalize_list(value_at(b, request.collection.items)))
                    .unwrap_or_default();

                if items.is_empty() {
                    tracing::debug!(url = %url, page = number, "Empty page, pagination complete");
                    break;
                }

                let next_page = match (body.as_ref(), request.collection.next_page) {
                    (Some(b), Some(path)) => text_at(b, path),
                    _ => None,
                };

                yield Page { number, items, next_page };
                number += 1;
            }
        }
    }
}

fn classify(url: &Url, response: RawResponse) -> Result<Option<Value>, FetchError> {
    match response.status {
        200..=299 => {
            if response.body.trim().is_empty() {
                return Ok(None);
            }
            serde_json::from_str(&response.body)
                .map(Some)
                .map_err(|e| FetchError::Decode {
                    url: url.to_string(),
                    message: e.to_string(),
                })
        }
        404 => {
            tracing::debug!(url = %url, "Not found, treating as empty");
            Ok(None)
        }
        status => Err(FetchError::FetchFailed {
            url: url.to_string(),
            status,
        }),
    }
}
