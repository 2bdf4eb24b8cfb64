//! Google Custom Search JSON API provider.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use super::SearchProvider;
use crate::error::{ResearchError, Result};
use crate::http::build_client;
use crate::types::SearchHit;

pub const GOOGLE_CSE_URL: &str = "https://www.googleapis.com/customsearch/v1";

/// Attempts per query before giving up.
pub const MAX_SEARCH_RETRIES: u32 = 3;

#[derive(Debug, Deserialize)]
struct CseResponse {
    #[serde(default)]
    items: Vec<CseItem>,
}

#[derive(Debug, Deserialize)]
struct CseItem {
    link: Option<String>,
    title: Option<String>,
    snippet: Option<String>,
}

impl CseItem {
    fn into_hit(self) -> Option<SearchHit> {
        let url = self.link.filter(|l| !l.is_empty())?;
        Some(SearchHit {
            url,
            title: self.title.unwrap_or_else(|| "No title".to_string()),
            snippet: self.snippet.unwrap_or_else(|| "No snippet".to_string()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct CseErrorResponse {
    error: CseError,
}

#[derive(Debug, Deserialize)]
struct CseError {
    message: String,
}

/// Searches through a Google Programmable Search Engine.
pub struct GoogleSearchProvider {
    client: Client,
    api_key: String,
    cse_id: String,
    base_url: String,
    delay: Duration,
    max_retries: u32,
}

impl GoogleSearchProvider {
    /// Create a provider. `delay` is slept after every successful request and
    /// scales the exponential backoff between retries.
    pub fn new(api_key: impl Into<String>, cse_id: impl Into<String>, delay: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(Duration::from_secs(30))?,
            api_key: api_key.into(),
            cse_id: cse_id.into(),
            base_url: GOOGLE_CSE_URL.to_string(),
            delay,
            max_retries: MAX_SEARCH_RETRIES,
        })
    }

    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Backoff before retry `attempt` (1-based): `delay * 2^attempt`.
    fn backoff(&self, attempt: u32) -> Duration {
        self.delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    async fn fetch(&self, full_query: &str) -> Result<Vec<SearchHit>> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.cse_id.as_str()),
                ("q", full_query),
                ("start", "1"),
            ])
            .send()
            .await
            .map_err(|e| ResearchError::Search(format!("request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ResearchError::Search(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<CseErrorResponse>(&body)
                .map_or(body, |parsed| parsed.error.message);
            let prefix = if status == StatusCode::TOO_MANY_REQUESTS {
                "rate limit"
            } else {
                "API error"
            };
            return Err(ResearchError::Search(format!(
                "{prefix} ({status}): {message}"
            )));
        }

        let parsed: CseResponse = serde_json::from_str(&body)?;
        Ok(parsed.items.into_iter().filter_map(CseItem::into_hit).collect())
    }
}

/// Quota and rate-limit failures are worth retrying; nothing else is.
fn is_retryable(err: &ResearchError) -> bool {
    let message = err.to_string().to_lowercase();
    message.contains("quota") || message.contains("rate limit") || message.contains("ratelimit")
}

#[async_trait]
impl SearchProvider for GoogleSearchProvider {
    async fn search(&self, query: &str, site_restriction: Option<&str>) -> Vec<SearchHit> {
        let full_query = match site_restriction {
            Some(site) => format!("{query} {site}"),
            None => query.to_string(),
        };

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                let wait = self.backoff(attempt);
                tracing::info!(
                    attempt = attempt + 1,
                    max = self.max_retries,
                    wait_secs = wait.as_secs_f64(),
                    "Retrying search"
                );
                tokio::time::sleep(wait).await;
            }

            match self.fetch(&full_query).await {
                Ok(hits) => {
                    tokio::time::sleep(self.delay).await;
                    return hits;
                }
                Err(e) if is_retryable(&e) && attempt + 1 < self.max_retries => {
                    tracing::warn!(query = %full_query, error = %e, "Search throttled");
                }
                Err(e) => {
                    tracing::warn!(query = %full_query, error = %e, "Search failed");
                    return Vec::new();
                }
            }
        }

        Vec::new()
    }
}
