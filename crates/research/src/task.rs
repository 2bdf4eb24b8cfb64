//! The research request, parsed once from YAML at the start of a run.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::error::{ResearchError, Result};

/// An immutable research request.
///
/// Recognised fields are typed; anything else in the request is kept in
/// `extra` and still shown to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchTask {
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "string_or_list", skip_serializing_if = "Vec::is_empty")]
    pub questions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<String>,
    /// Preferred kinds of sources, e.g. "academic papers".
    #[serde(default, deserialize_with = "string_or_list", skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_period: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Requests may give a single string where a list is expected.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn string_or_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(value)) => vec![value],
        Some(OneOrMany::Many(values)) => values,
        None => Vec::new(),
    })
}

impl ResearchTask {
    /// A task with only a topic.
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            description: None,
            questions: Vec::new(),
            depth: None,
            sources: Vec::new(),
            time_period: None,
            extra: BTreeMap::new(),
        }
    }

    /// Parse a YAML research request.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Err(ResearchError::Task {
                reason: "research request is empty".to_string(),
            });
        }
        let task: Self = serde_yaml::from_str(yaml).map_err(|e| ResearchError::Task {
            reason: format!("error parsing YAML request: {e}"),
        })?;
        if task.topic.trim().is_empty() {
            return Err(ResearchError::Task {
                reason: "`topic` must not be empty".to_string(),
            });
        }
        Ok(task)
    }

    /// Pretty JSON rendering embedded in prompts.
    pub fn to_prompt_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| format!("{{\"topic\": {:?}}}", self.topic))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_request() {
        let yaml = r#"
topic: "Memory safety in systems languages"
description: "Compare approaches"
questions:
  - "How does Rust's borrow checker work?"
  - "What does C++ offer?"
depth: detailed
time_period: "2020-2025"
audience: engineers
max_words: 2000
"#;
        let task = ResearchTask::from_yaml(yaml).unwrap();
        assert_eq!(task.topic, "Memory safety in systems languages");
        assert_eq!(task.questions.len(), 2);
        assert_eq!(task.depth.as_deref(), Some("detailed"));
        assert_eq!(task.extra.get("audience"), Some(&serde_json::json!("engineers")));
        assert_eq!(task.extra.get("max_words"), Some(&serde_json::json!(2000)));
    }

    #[test]
    fn test_single_string_questions_and_sources() {
        let task = ResearchTask::from_yaml("topic: Rust\nquestions: What is Tokio?\n").unwrap();
        assert_eq!(task.questions, vec!["What is Tokio?"]);

        let task = ResearchTask::from_yaml("topic: Rust\nsources: academic papers\nquestions:\n").unwrap();
        assert_eq!(task.sources, vec!["academic papers"]);
        assert!(task.questions.is_empty());
        assert!(task.extra.is_empty());
    }

    #[test]
    fn test_missing_topic_is_rejected() {
        let err = ResearchTask::from_yaml("description: nothing here").unwrap_err();
        assert!(matches!(err, ResearchError::Task { .. }));

        let err = ResearchTask::from_yaml("topic: \"   \"").unwrap_err();
        assert!(err.to_string().contains("topic"));
    }

    #[test]
    fn test_empty_and_malformed_requests() {
        assert!(ResearchTask::from_yaml("").is_err());
        assert!(ResearchTask::from_yaml("topic: [unclosed").is_err());
    }

    #[test]
    fn test_prompt_json_includes_extras() {
        let yaml = "topic: Rust\nregion: EU\n";
        let json = ResearchTask::from_yaml(yaml).unwrap().to_prompt_json();
        assert!(json.contains("\"topic\": \"Rust\""));
        assert!(json.contains("\"region\": \"EU\""));
        assert!(!json.contains("questions"));
    }
}
