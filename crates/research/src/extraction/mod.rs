//! Fetching a URL and turning it into plain text.
//!
//! Extraction never fails outright: problems come back as an
//! [`ExtractedContent`] carrying a bracketed diagnostic, which the pipeline
//! recognises and skips.

mod html;
mod pdf;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;

use crate::error::{ResearchError, Result};
use crate::http::build_client;
use crate::types::ExtractedContent;

/// Timeout for a single page fetch.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Turns a URL into text.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> ExtractedContent;
}

/// Fetches pages over HTTP, dispatching on the response `Content-Type`.
pub struct HttpContentExtractor {
    client: Client,
}

impl HttpContentExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: build_client(FETCH_TIMEOUT)?,
        })
    }

    async fn fetch(&self, url: &str) -> std::result::Result<ExtractedContent, String> {
        let response = self.client.get(url).send().await.map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {status}"));
        }

        let is_pdf = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.to_lowercase().contains("application/pdf"));

        if is_pdf {
            let bytes = response.bytes().await.map_err(|e| e.to_string())?;
            return Ok(match pdf::extract_text(url, bytes.to_vec()).await {
                Ok(text) => ExtractedContent::pdf(text),
                Err(ResearchError::Extraction { reason, .. }) => {
                    tracing::warn!(url, error = %reason, "PDF extraction failed");
                    ExtractedContent::error("PDF", reason)
                }
                Err(e) => ExtractedContent::error("PDF", e),
            });
        }

        let body = response.text().await.map_err(|e| e.to_string())?;
        let text = html::extract_text(&body);
        if text.is_empty() {
            return Err("no extractable text".to_string());
        }
        Ok(ExtractedContent::html(text))
    }
}

#[async_trait]
impl ContentExtractor for HttpContentExtractor {
    async fn extract(&self, url: &str) -> ExtractedContent {
        match self.fetch(url).await {
            Ok(content) => {
                tracing::debug!(url, kind = %content.content_type, chars = content.text.len(), "Extracted content");
                content
            }
            Err(reason) => {
                tracing::warn!(url, error = %reason, "Content extraction failed");
                ExtractedContent::error("CONTENT", reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ContentType;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_extracts_html() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/article"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html; charset=utf-8")
                    .set_body_string("<html><body><script>x()</script><p>Borrow checking</p></body></html>"),
            )
            .mount(&server)
            .await;

        let extractor = HttpContentExtractor::new().unwrap();
        let content = extractor.extract(&format!("{}/article", server.uri())).await;

        assert_eq!(content.content_type, ContentType::Html);
        assert_eq!(content.text, "Borrow checking");
        assert!(!content.is_error());
    }

    #[tokio::test]
    async fn test_broken_pdf_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/pdf")
                    .set_body_bytes(b"%PDF-garbage".to_vec()),
            )
            .mount(&server)
            .await;

        let extractor = HttpContentExtractor::new().unwrap();
        let content = extractor.extract(&format!("{}/paper.pdf", server.uri())).await;

        assert!(content.is_error());
        assert!(content.text.starts_with("[PDF EXTRACTION ERROR:"));
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let extractor = HttpContentExtractor::new().unwrap();
        let content = extractor.extract(&format!("{}/missing", server.uri())).await;

        assert_eq!(content.content_type, ContentType::Error);
        assert!(content.text.contains("404"));
    }

    #[tokio::test]
    async fn test_unreachable_host() {
        let extractor = HttpContentExtractor::new().unwrap();
        let content = extractor.extract("http://127.0.0.1:9/nothing").await;
        assert!(content.is_error());
        assert!(content.text.starts_with("[CONTENT EXTRACTION ERROR:"));
    }
}
