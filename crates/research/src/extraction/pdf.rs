//! Text from PDF documents.

use crate::error::{ResearchError, Result};

/// Extract the text of every page, in order.
///
/// Parsing runs on the blocking pool; a panic inside the PDF parser is
/// reported as an error rather than taking the run down.
pub async fn extract_text(url: &str, bytes: Vec<u8>) -> Result<String> {
    let joined = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| ResearchError::Extraction {
            url: url.to_string(),
            reason: format!("PDF parser aborted: {e}"),
        })?;

    joined.map_err(|e| ResearchError::Extraction {
        url: url.to_string(),
        reason: e.to_string(),
    })
}
