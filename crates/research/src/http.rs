//! Shared HTTP client construction.

use std::time::Duration;

use crate::error::{ResearchError, Result};

/// Browser User-Agent; many sites refuse obvious bots.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Build a client with a browser User-Agent and the given timeout.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(BROWSER_USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| ResearchError::config(format!("failed to build HTTP client: {e}")))
}
