//! Readable text from HTML documents.

use scraper::{Html, Node};

/// Elements whose text never counts as page content.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Extract the visible text of an HTML document as a single line of
/// space-separated words.
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let mut pieces: Vec<&str> = Vec::new();
    for node in document.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| SKIPPED_ELEMENTS.contains(&el.name()))
        });
        if hidden {
            continue;
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            pieces.push(trimmed);
        }
    }

    collapse_whitespace(&pieces.join(" "))
}

/// Replace every whitespace run with a single space.
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_scripts_and_styles() {
        let html = r"<html><head><title>Page</title>
            <style>body { color: red; }</style>
            <script>var tracking = 1;</script></head>
            <body><h1>Heading</h1><p>First   paragraph.</p>
            <noscript>enable js</noscript>
            <p>Second
            paragraph.</p></body></html>";

        let text = extract_text(html);
        assert_eq!(text, "Page Heading First paragraph. Second paragraph.");
        assert!(!text.contains("tracking"));
        assert!(!text.contains("color"));
    }

    #[test]
    fn test_inline_elements_are_separated() {
        let text = extract_text("<p>alpha<b>beta</b></p><div>gamma</div>");
        assert_eq!(text, "alpha beta gamma");
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(extract_text("<html><body>  </body></html>"), "");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \n\n b\t c  "), "a b c");
    }
}
