//! The final markdown report.

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

use crate::task::ResearchTask;
use crate::types::Source;

/// File name of the report inside a run directory.
pub const REPORT_FILE: &str = "research_summary.md";

/// `{base}_{YYYYmmdd_HHMMSS}`, a fresh directory per run.
pub fn run_directory(base: &Path, started_at: DateTime<Local>) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(format!("_{}", started_at.format("%Y%m%d_%H%M%S")));
    PathBuf::from(name)
}

/// Wrap the summary with a title, timestamp and notes on where the source
/// files live.
pub fn format_report(
    task: &ResearchTask,
    sources: &[Source],
    summary: &str,
    output_dir: &Path,
    generated_at: DateTime<Local>,
) -> String {
    let lines = [
        format!("# Research Results: {}", task.topic),
        format!("*Generated on {}*\n", generated_at.format("%Y-%m-%d %H:%M:%S")),
        summary.to_string(),
        format!("\n{}\n", "=".repeat(80)),
        "\n## Source Files".to_string(),
        format!(
            "{} source file(s) saved to: {}\n",
            sources.len(),
            output_dir.display()
        ),
        "\n## Using These Results".to_string(),
        "Share this summary together with the source files to continue the research in an AI assistant or hand it to a colleague.".to_string(),
    ];
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    #[test]
    fn test_run_directory_suffix() {
        let dir = run_directory(Path::new("out/research_output"), at());
        assert_eq!(dir, PathBuf::from("out/research_output_20240309_140507"));
    }

    #[test]
    fn test_report_sections() {
        let report = format_report(
            &ResearchTask::new("Vector databases"),
            &[],
            "## Executive Summary\nText",
            Path::new("research_output_20240309_140507"),
            at(),
        );

        assert!(report.starts_with("# Research Results: Vector databases\n*Generated on 2024-03-09 14:05:07*\n"));
        assert!(report.contains("## Executive Summary\nText\n"));
        assert!(report.contains(&"=".repeat(80)));
        assert!(report.contains("## Source Files\n0 source file(s) saved to: research_output_20240309_140507"));
        assert!(report.contains("## Using These Results\n"));
    }
}
