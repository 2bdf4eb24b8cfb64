//! Machine-readable catalogue of a run's sources.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::types::{ContentType, Source};

/// File name of the index inside a run directory.
pub const INDEX_FILE: &str = "index.json";

/// Summary entry for one saved source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// 1-based position in the final ranking.
    pub rank: usize,
    pub url: String,
    pub title: String,
    pub score: f32,
    pub content_type: ContentType,
    /// Path of the source file, relative to the run directory.
    pub file: String,
}

/// Index of one research run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ResearchIndex {
    pub topic: String,
    pub entries: Vec<IndexEntry>,
    pub generated_at: Option<DateTime<Utc>>,
}

impl ResearchIndex {
    /// Build the index for ranked `sources` saved at `file_paths`.
    pub fn from_sources(topic: &str, sources: &[Source], file_paths: &[PathBuf]) -> Self {
        let entries = sources
            .iter()
            .zip(file_paths)
            .enumerate()
            .map(|(i, (source, path))| IndexEntry {
                rank: i + 1,
                url: source.url.clone(),
                title: source.title.clone(),
                score: source.relevance_score,
                content_type: source.content_type,
                file: path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            })
            .collect();

        Self {
            topic: topic.to_string(),
            entries,
            generated_at: Some(Utc::now()),
        }
    }

    /// Load index from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let index: Self = serde_json::from_str(&content)?;
            Ok(index)
        } else {
            Ok(Self::default())
        }
    }

    /// Save index to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Highest-scoring entries first.
    pub fn top(&self, limit: usize) -> Vec<&IndexEntry> {
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort_by(|a, b| b.score.total_cmp(&a.score));
        entries.into_iter().take(limit).collect()
    }
}
