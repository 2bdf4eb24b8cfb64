//! Research output on disk.
//!
//! A run writes one directory holding a text file per source, the markdown
//! report (`research_summary.md`) and an `index.json` catalogue.

mod index;
mod report;
mod source_file;

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::task::ResearchTask;
use crate::types::Source;

pub use index::{IndexEntry, ResearchIndex, INDEX_FILE};
pub use report::{format_report, run_directory, REPORT_FILE};
pub use source_file::{
    load_source_file, parse_source_file, render_source_file, source_file_name, write_source_files,
    StoredSource,
};

/// Everything written for one run.
#[derive(Debug, Clone)]
pub struct SavedRun {
    pub report: String,
    pub file_paths: Vec<PathBuf>,
    pub report_path: PathBuf,
    pub index_path: PathBuf,
}

/// Writes a finished run into its output directory.
pub struct OutputWriter {
    output_dir: PathBuf,
}

impl OutputWriter {
    #[must_use]
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Persist sources, the report and the index.
    pub fn write(
        &self,
        task: &ResearchTask,
        sources: &[Source],
        summary: &str,
        generated_at: DateTime<Local>,
    ) -> Result<SavedRun> {
        let file_paths = write_source_files(sources, &self.output_dir)?;

        let report = format_report(task, sources, summary, &self.output_dir, generated_at);
        let report_path = self.output_dir.join(REPORT_FILE);
        std::fs::write(&report_path, &report)?;

        let index_path = self.output_dir.join(INDEX_FILE);
        ResearchIndex::from_sources(&task.topic, sources, &file_paths).save(&index_path)?;

        tracing::info!(
            dir = %self.output_dir.display(),
            files = file_paths.len(),
            "Wrote research output"
        );

        Ok(SavedRun {
            report,
            file_paths,
            report_path,
            index_path,
        })
    }
}
