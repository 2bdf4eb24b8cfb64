//! Accepted sources for one run, unique by URL.

use std::collections::HashSet;

use crate::error::{ResearchError, Result};
use crate::types::Source;

/// Sources accepted so far, in discovery order.
#[derive(Debug, Default)]
pub struct SourceRegistry {
    sources: Vec<Source>,
    urls: HashSet<String>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    /// Add a source. Callers must check [`contains`](Self::contains) first;
    /// inserting a duplicate URL is an error and leaves the registry untouched.
    pub fn insert(&mut self, source: Source) -> Result<()> {
        if !self.urls.insert(source.url.clone()) {
            return Err(ResearchError::DuplicateSource { url: source.url });
        }
        self.sources.push(source);
        Ok(())
    }

    /// Sources in discovery order.
    pub fn all(&self) -> &[Source] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Consume the registry, returning at most `limit` sources ordered by
    /// relevance (highest first, ties in discovery order).
    pub fn rank_and_truncate(self, limit: usize) -> Vec<Source> {
        let mut ranked = self.sources;
        ranked.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        ranked.truncate(limit);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ContentType;

    fn source(url: &str, score: f32) -> Source {
        Source {
            url: url.to_string(),
            title: format!("Title for {url}"),
            snippet: String::new(),
            content: "body".to_string(),
            content_type: ContentType::Html,
            relevance_score: score,
            short_summary: String::new(),
            research_topics: String::new(),
        }
    }

    #[test]
    fn test_insert_and_contains() {
        let mut registry = SourceRegistry::new();
        registry.insert(source("https://a.dev", 0.7)).unwrap();
        assert!(registry.contains("https://a.dev"));
        assert!(!registry.contains("https://b.dev"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_insert_fails() {
        let mut registry = SourceRegistry::new();
        registry.insert(source("https://a.dev", 0.7)).unwrap();
        let err = registry.insert(source("https://a.dev", 0.9)).unwrap_err();
        assert!(matches!(err, ResearchError::DuplicateSource { .. }));
        assert_eq!(registry.len(), 1);
        assert!((registry.all()[0].relevance_score - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn test_rank_is_stable_for_ties() {
        let mut registry = SourceRegistry::new();
        for (url, score) in [
            ("https://1.dev", 0.6),
            ("https://2.dev", 0.9),
            ("https://3.dev", 0.6),
            ("https://4.dev", 0.9),
            ("https://5.dev", 0.5),
        ] {
            registry.insert(source(url, score)).unwrap();
        }

        let ranked = registry.rank_and_truncate(10);
        let urls: Vec<_> = ranked.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://2.dev",
                "https://4.dev",
                "https://1.dev",
                "https://3.dev",
                "https://5.dev"
            ]
        );
    }

    #[test]
    fn test_truncate_takes_prefix() {
        let mut registry = SourceRegistry::new();
        for i in 0..5u8 {
            registry
                .insert(source(&format!("https://{i}.dev"), f32::from(i) / 10.0 + 0.5))
                .unwrap();
        }
        let ranked = registry.rank_and_truncate(2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].url, "https://4.dev");
        assert_eq!(ranked[1].url, "https://3.dev");
    }
}
