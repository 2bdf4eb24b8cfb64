//! Prompt template management.

use handlebars::Handlebars;
use serde::Serialize;

use crate::error::Result;

/// Template names registered by [`PromptManager::new`].
pub const RELEVANCE: &str = "relevance";
pub const INITIAL_QUERIES: &str = "initial_queries";
pub const FOLLOWUP_QUERIES: &str = "followup_queries";
pub const SOURCE_SUMMARY: &str = "source_summary";
pub const CHUNK_SUMMARY: &str = "chunk_summary";
pub const UNIFY_SUMMARY: &str = "unify_summary";
pub const RESEARCH_SUMMARY: &str = "research_summary";

/// Manages Handlebars prompt templates.
pub struct PromptManager {
    handlebars: Handlebars<'static>,
}

impl PromptManager {
    /// Create a prompt manager with the embedded templates.
    pub fn new() -> Result<Self> {
        let mut handlebars = Handlebars::new();
        // Prompts are plain text; HTML escaping would mangle page content.
        handlebars.register_escape_fn(handlebars::no_escape);

        for (name, template) in [
            (RELEVANCE, RELEVANCE_TEMPLATE),
            (INITIAL_QUERIES, INITIAL_QUERIES_TEMPLATE),
            (FOLLOWUP_QUERIES, FOLLOWUP_QUERIES_TEMPLATE),
            (SOURCE_SUMMARY, SOURCE_SUMMARY_TEMPLATE),
            (CHUNK_SUMMARY, CHUNK_SUMMARY_TEMPLATE),
            (UNIFY_SUMMARY, UNIFY_SUMMARY_TEMPLATE),
            (RESEARCH_SUMMARY, RESEARCH_SUMMARY_TEMPLATE),
        ] {
            handlebars.register_template_string(name, template)?;
        }

        Ok(Self { handlebars })
    }

    /// Render a template with the given data.
    pub fn render<T: Serialize>(&self, template: &str, data: &T) -> Result<String> {
        Ok(self.handlebars.render(template, data)?)
    }
}

const RELEVANCE_TEMPLATE: &str = r#"You are evaluating the relevance of a source for a research task.

RESEARCH TASK:
{{task}}

SOURCE DETAILS:
Title: {{title}}
URL: {{url}}
Snippet: {{snippet}}
{{#if chunk_info}}
This is {{chunk_info}} from the full document.
{{/if}}

DOCUMENT CONTENT:
{{content}}

Evaluate how relevant this source is to the research task on a scale from 0.0 to 1.0:
- 0.0: Completely irrelevant
- 0.3: Tangentially related but not useful
- 0.5: Somewhat relevant
- 0.7: Relevant with good information
- 0.9-1.0: Highly relevant, exactly what we need

Respond with JSON only:
{
  "score": <number between 0.0 and 1.0>,
  "short_summary": "<3-5 bullet points (one per line, starting with •) of the key information relevant to the task>",
  "research_topics": "<2-4 bullet points (one per line, starting with •) of topics worth researching next>"
}
"#;

const INITIAL_QUERIES_TEMPLATE: &str = r#"You are a research assistant helping to generate effective search queries.

RESEARCH TASK:
{{task}}

Based on this research task, generate 3-5 specific search queries that would be most effective for finding relevant information.
For each query, assign an importance score from 1-5 (5 being highest priority).
You may optionally specify site restrictions for any query (like site:example.com).

FORMAT YOUR RESPONSE AS A YAML LIST:

```yaml
- query: "first search query"
  importance: 5
  site_restrict: "optional_site_restriction"
- query: "second search query"
  importance: 3
```

ONLY INCLUDE THE YAML IN YOUR RESPONSE, NO OTHER TEXT.
"#;

const FOLLOWUP_QUERIES_TEMPLATE: &str = r#"You are a research assistant helping to generate effective follow-up search queries.

RESEARCH TASK:
{{task}}

PREVIOUS QUERIES:
{{previous_queries}}

SOURCES FOUND SO FAR:
{{sources}}

Based on the research task and sources found so far, generate 2-3 new search queries that would help find additional relevant information.
Focus on:
1. Filling knowledge gaps in the current sources
2. Exploring aspects of the topic not yet covered
3. Finding more specific or authoritative sources

For each query, assign an importance score from 1-5 (5 being highest priority).
You may optionally specify site restrictions for any query (like site:example.com).

FORMAT YOUR RESPONSE AS A YAML LIST:

```yaml
- query: "first search query"
  importance: 5
  site_restrict: "optional_site_restriction"
- query: "second search query"
  importance: 3
```

ONLY INCLUDE THE YAML IN YOUR RESPONSE, NO OTHER TEXT.
"#;

const SOURCE_SUMMARY_TEMPLATE: &str = r"You are summarizing a document for research purposes.

RESEARCH TASK:
{{task}}

SOURCE:
Title: {{title}}
URL: {{url}}

DOCUMENT CONTENT:
{{content}}

Provide a comprehensive and detailed summary of the key information in this document
that is relevant to the research task. Be thorough in capturing facts, data, statistics,
methodology, findings and conclusions. Include specific details where possible.
";

const CHUNK_SUMMARY_TEMPLATE: &str = r"You are summarizing a portion of a document for research purposes.

RESEARCH TASK:
{{task}}

SOURCE:
Title: {{title}}
URL: {{url}}

This is chunk {{chunk_number}} of {{chunk_count}} from the document.

DOCUMENT CHUNK CONTENT:
{{content}}

Provide a detailed summary of the key information in this document chunk that is relevant
to the research task. Capture facts, data, methodology and conclusions.
";

const UNIFY_SUMMARY_TEMPLATE: &str = r"You are creating a unified summary of a document based on summaries of different chunks.

RESEARCH TASK:
{{task}}

SOURCE:
Title: {{title}}
URL: {{url}}

CHUNK SUMMARIES:
{{chunk_summaries}}

Create a detailed unified summary of this document that captures the key information from
the different chunks relevant to the research task. Include specific facts, figures and
conclusions. Remove redundancy and organize the information logically.
";

const RESEARCH_SUMMARY_TEMPLATE: &str = r#"You are a research assistant summarizing findings from web research.

RESEARCH TASK:
{{task}}

SOURCES FOUND:
{{sources}}

Please provide a comprehensive research summary that:
1. Provides an overview of the topic and key findings
2. Highlights the most important information from the sources
3. Notes any gaps or areas for further research

FORMAT:
- Start with an "Executive Summary" (2-3 paragraphs)
- Include a "Key Findings" section with the most important information
- Whenever you reference information from a specific source, include the source number in brackets, e.g. [1], [3]
- Include a brief "Sources" section that lists ONLY the numbered references and their URLs
- End with "Suggested Next Steps" for further research

Do NOT include detailed per-source summaries; they are appended separately.
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_templates_render() {
        let prompts = PromptManager::new().unwrap();
        let data = serde_json::json!({
            "task": "{\"topic\": \"rust\"}",
            "title": "T",
            "url": "https://a.dev",
            "snippet": "s",
            "content": "c",
            "chunk_info": null,
            "chunk_number": 1,
            "chunk_count": 2,
            "chunk_summaries": "x",
            "previous_queries": "[]",
            "sources": "[]",
        });
        for name in [
            RELEVANCE,
            INITIAL_QUERIES,
            FOLLOWUP_QUERIES,
            SOURCE_SUMMARY,
            CHUNK_SUMMARY,
            UNIFY_SUMMARY,
            RESEARCH_SUMMARY,
        ] {
            let rendered = prompts.render(name, &data).unwrap();
            assert!(rendered.contains("rust"), "{name} should embed the task");
        }
    }

    #[test]
    fn test_content_is_not_html_escaped() {
        let prompts = PromptManager::new().unwrap();
        let data = serde_json::json!({
            "task": "{}",
            "title": "Tom & Jerry <3",
            "url": "https://a.dev/?a=1&b=2",
            "snippet": "",
            "content": "x < y && y > z",
        });
        let rendered = prompts.render(RELEVANCE, &data).unwrap();
        assert!(rendered.contains("Tom & Jerry <3"));
        assert!(rendered.contains("x < y && y > z"));
        assert!(!rendered.contains("This is"));
    }

    #[test]
    fn test_chunk_context_rendered() {
        let prompts = PromptManager::new().unwrap();
        let data = serde_json::json!({
            "task": "{}",
            "title": "T",
            "url": "u",
            "snippet": "",
            "content": "body",
            "chunk_info": "Chunk 2 of 3",
        });
        let rendered = prompts.render(RELEVANCE, &data).unwrap();
        assert!(rendered.contains("This is Chunk 2 of 3 from the full document."));
    }
}
