//! One plain-text file per accepted source.
//!
//! Layout:
//!
//! ```text
//! SOURCE: <title>
//! URL: <url>
//! RELEVANCE: <score>
//!
//! KEY POINTS:            (optional)
//! <short summary>
//!
//! SUGGESTED RESEARCH TOPICS:   (optional)
//! <topics>
//!
//! ================ ... (80)
//!
//! <content, verbatim>
//! ```

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use url::Url;

use crate::error::{ResearchError, Result};
use crate::types::{ContentType, Source};

const TITLE_PREFIX: &str = "SOURCE: ";
const URL_PREFIX: &str = "URL: ";
const RELEVANCE_PREFIX: &str = "RELEVANCE: ";
const KEY_POINTS_HEADER: &str = "\nKEY POINTS:\n";
const TOPICS_HEADER: &str = "\nSUGGESTED RESEARCH TOPICS:\n";

/// Longest path fragment kept in a file name, in chars.
const MAX_PATH_FRAGMENT: usize = 50;

fn separator() -> String {
    format!("\n{}\n\n", "=".repeat(80))
}

/// A source file read back from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSource {
    pub title: String,
    pub url: String,
    pub relevance_score: f32,
    pub short_summary: String,
    pub research_topics: String,
    pub content: String,
}

/// File name for the `index`-th (0-based) source:
/// `NN_<domain>_<path><.pdf|.txt>`.
pub fn source_file_name(index: usize, source: &Source) -> String {
    let (domain, path) = match Url::parse(&source.url) {
        Ok(url) => {
            let mut domain = url.host_str().unwrap_or("unknown").to_string();
            if let Some(port) = url.port() {
                let _ = write!(domain, ":{port}");
            }
            (domain, url.path().to_string())
        }
        Err(_) => ("unknown".to_string(), String::new()),
    };

    let domain = domain.replace('.', "_");
    let path = if path.is_empty() || path == "/" {
        "_index".to_string()
    } else {
        path.replace('/', "_")
    };
    let path: String = path.chars().take(MAX_PATH_FRAGMENT).collect();

    let ext = match source.content_type {
        ContentType::Pdf => ".pdf",
        ContentType::Html | ContentType::Error => ".txt",
    };

    format!("{:02}_{domain}{path}{ext}", index + 1)
}

/// Render a source in the on-disk layout.
pub fn render_source_file(source: &Source) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{TITLE_PREFIX}{}", escape_title(&source.title));
    let _ = writeln!(out, "{URL_PREFIX}{}", source.url);
    let _ = writeln!(out, "{RELEVANCE_PREFIX}{}", source.relevance_score);

    if !source.short_summary.is_empty() {
        let _ = writeln!(out, "{KEY_POINTS_HEADER}{}", source.short_summary);
    }
    if !source.research_topics.is_empty() {
        let _ = writeln!(out, "{TOPICS_HEADER}{}", source.research_topics);
    }

    out.push_str(&separator());
    out.push_str(&source.content);
    out
}

/// Write every source into `dir`, in order, returning the paths written.
pub fn write_source_files(sources: &[Source], dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;

    let mut paths = Vec::with_capacity(sources.len());
    for (i, source) in sources.iter().enumerate() {
        let path = dir.join(source_file_name(i, source));
        std::fs::write(&path, render_source_file(source))?;
        tracing::debug!(path = %path.display(), url = %source.url, "Wrote source file");
        paths.push(path);
    }
    Ok(paths)
}

/// Parse the on-disk layout.
pub fn parse_source_file(text: &str) -> Result<StoredSource> {
    let separator = separator();
    let (header, content) = text
        .split_once(separator.as_str())
        .ok_or_else(|| ResearchError::parse("source file has no content separator"))?;

    let mut lines = header.splitn(4, '\n');
    let title = unescape_title(&header_field(lines.next(), TITLE_PREFIX)?);
    let url = header_field(lines.next(), URL_PREFIX)?;
    let relevance_score = header_field(lines.next(), RELEVANCE_PREFIX)?
        .trim()
        .parse::<f32>()
        .map_err(|e| ResearchError::parse(format!("invalid RELEVANCE value: {e}")))?;

    // Remaining blocks, each written as "\n<HEADER>\n<body>\n".
    let rest = lines.next().map(|r| format!("\n{r}")).unwrap_or_default();
    let (before_topics, topics) = match rest.split_once(TOPICS_HEADER) {
        Some((before, topics)) => (before.to_string(), strip_block_end(topics)),
        None => (rest.clone(), String::new()),
    };
    let short_summary = before_topics
        .split_once(KEY_POINTS_HEADER)
        .map(|(_, summary)| strip_block_end(summary))
        .unwrap_or_default();

    Ok(StoredSource {
        title,
        url,
        relevance_score,
        short_summary,
        research_topics: topics,
        content: content.to_string(),
    })
}

/// Read a source file written by [`write_source_files`].
pub fn load_source_file(path: &Path) -> Result<StoredSource> {
    let text = std::fs::read_to_string(path)?;
    parse_source_file(&text)
}

fn header_field(line: Option<&str>, prefix: &str) -> Result<String> {
    line.and_then(|l| l.strip_prefix(prefix))
        .map(str::to_string)
        .ok_or_else(|| ResearchError::parse(format!("missing `{}` header line", prefix.trim())))
}

/// Keep the title on its header line: backslash, CR and LF are escaped.
fn escape_title(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    for c in title.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

fn unescape_title(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn strip_block_end(block: &str) -> String {
    block.strip_suffix('\n').unwrap_or(block).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn source(url: &str, content_type: ContentType) -> Source {
        Source {
            url: url.to_string(),
            title: "Ownership in Rust".to_string(),
            snippet: "snip".to_string(),
            content: "Line one.\n\nLine two with ==== and SOURCE: noise.\n".to_string(),
            content_type,
            relevance_score: 0.85,
            short_summary: "• moves\n• borrows".to_string(),
            research_topics: "• lifetimes".to_string(),
        }
    }

    #[test]
    fn test_file_names() {
        let s = source("https://doc.rust-lang.org/book/ch04-01.html", ContentType::Html);
        assert_eq!(source_file_name(0, &s), "01_doc_rust-lang_org_book_ch04-01.html.txt");

        let s = source("https://arxiv.org/pdf/2401.00001", ContentType::Pdf);
        assert_eq!(source_file_name(11, &s), "12_arxiv_org_pdf_2401.00001.pdf");

        let s = source("https://example.com", ContentType::Html);
        assert_eq!(source_file_name(2, &s), "03_example_com_index.txt");
    }

    #[test]
    fn test_long_paths_are_cut() {
        let long = format!("https://a.dev/{}", "x".repeat(120));
        let name = source_file_name(0, &source(&long, ContentType::Html));
        assert_eq!(name.len(), "01_a_dev".len() + 50 + ".txt".len());
    }

    #[test]
    fn test_render_layout() {
        let text = render_source_file(&source("https://a.dev/x", ContentType::Html));
        assert!(text.starts_with(
            "SOURCE: Ownership in Rust\nURL: https://a.dev/x\nRELEVANCE: 0.85\n\nKEY POINTS:\n• moves\n• borrows\n\nSUGGESTED RESEARCH TOPICS:\n• lifetimes\n\n===="
        ));
        assert!(text.ends_with(&format!("{}\n\nLine one.\n\nLine two with ==== and SOURCE: noise.\n", "=".repeat(80))));
    }

    #[test]
    fn test_persist_and_reload() {
        let dir = TempDir::new().unwrap();
        let sources = vec![
            source("https://a.dev/x", ContentType::Html),
            Source {
                short_summary: String::new(),
                research_topics: String::new(),
                content: "  leading whitespace and trailing\n\n".to_string(),
                ..source("https://b.dev/paper", ContentType::Pdf)
            },
        ];

        let paths = write_source_files(&sources, dir.path()).unwrap();
        assert_eq!(paths.len(), 2);

        for (path, original) in paths.iter().zip(&sources) {
            let stored = load_source_file(path).unwrap();
            assert_eq!(stored.title, original.title);
            assert_eq!(stored.url, original.url);
            assert!((stored.relevance_score - original.relevance_score).abs() < f32::EPSILON);
            assert_eq!(stored.short_summary, original.short_summary);
            assert_eq!(stored.research_topics, original.research_topics);
            assert_eq!(stored.content, original.content);
        }
    }

    #[test]
    fn test_multiline_titles_survive_reload() {
        let original = Source {
            title: "Part one\r\nPart two \\n stays literal\\".to_string(),
            ..source("https://a.dev/x", ContentType::Html)
        };

        let text = render_source_file(&original);
        assert!(text.starts_with("SOURCE: Part one\\r\\nPart two \\\\n stays literal\\\\\nURL: "));

        let stored = parse_source_file(&text).unwrap();
        assert_eq!(stored.title, original.title);
        assert_eq!(stored.url, original.url);
        assert_eq!(stored.content, original.content);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_source_file("no separator here").is_err());
        let text = format!("TITLE: x\nURL: y\nRELEVANCE: 1{}body", separator());
        assert!(parse_source_file(&text).is_err());
    }
}
