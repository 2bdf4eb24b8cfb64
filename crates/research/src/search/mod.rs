//! Web search capability.
//!
//! The pipeline only needs an ordered list of hits per query. Providers
//! absorb their own failures (retrying where it makes sense) and hand back an
//! empty list when nothing could be fetched.

mod google;

use async_trait::async_trait;

use crate::types::SearchHit;

pub use google::{GoogleSearchProvider, GOOGLE_CSE_URL, MAX_SEARCH_RETRIES};

/// A web search backend.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run a query, optionally scoped with a site restriction such as
    /// `site:example.com`. Never fails; errors yield an empty list.
    async fn search(&self, query: &str, site_restriction: Option<&str>) -> Vec<SearchHit>;
}
