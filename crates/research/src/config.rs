//! Run options and API credentials.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ResearchError, Result};

/// Default number of sources kept in the final report.
pub const DEFAULT_MAX_SOURCES: usize = 10;

/// Default number of search iterations.
pub const DEFAULT_MAX_SEARCHES: usize = 5;

/// Default delay between search API requests, in seconds.
pub const DEFAULT_REQUEST_DELAY: f64 = 1.0;

/// Default base name for run output directories.
pub const DEFAULT_OUTPUT_DIR: &str = "research_output";

/// Environment variable names, also used as keys in the JSON config file.
pub const GOOGLE_API_KEY_ENV: &str = "GOOGLE_API_KEY";
pub const GOOGLE_CSE_ID_ENV: &str = "GOOGLE_CSE_ID";
pub const ANTHROPIC_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Options for a single research run.
#[derive(Debug, Clone)]
pub struct ResearchConfig {
    /// Maximum number of sources in the final report.
    pub max_sources: usize,
    /// Maximum number of search iterations.
    pub max_searches: usize,
    /// Delay between search requests, in seconds.
    pub request_delay: f64,
    /// Log progress detail (suggested topics, chunk scores).
    pub verbose: bool,
    /// Generate LLM summaries per source instead of the basic bullet report.
    pub generate_detailed_summaries: bool,
    /// Model used for every LLM call.
    pub model: String,
    /// Base output directory; a timestamp suffix is added per run.
    pub output_dir: PathBuf,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_sources: DEFAULT_MAX_SOURCES,
            max_searches: DEFAULT_MAX_SEARCHES,
            request_delay: DEFAULT_REQUEST_DELAY,
            verbose: false,
            generate_detailed_summaries: true,
            model: llm::anthropic::DEFAULT_MODEL.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

impl ResearchConfig {
    /// Reject options that would make a run meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.max_sources == 0 {
            return Err(ResearchError::config("max_sources must be > 0"));
        }
        if self.max_searches == 0 {
            return Err(ResearchError::config("max_searches must be > 0"));
        }
        if Duration::try_from_secs_f64(self.request_delay).is_err() {
            return Err(ResearchError::config(
                "request_delay must be a non-negative number of seconds",
            ));
        }
        if self.model.trim().is_empty() {
            return Err(ResearchError::config("model must not be empty"));
        }
        Ok(())
    }

    /// The search delay; zero when the configured value is not a valid duration.
    pub fn request_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.request_delay).unwrap_or(Duration::ZERO)
    }
}

/// API credentials for search and the LLM.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub google_api_key: Option<String>,
    pub google_cse_id: Option<String>,
    pub anthropic_api_key: Option<String>,
}

impl Credentials {
    /// Load credentials: JSON config file first, then environment overrides.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut creds = match config_file {
            Some(path) if path.exists() => {
                let creds = Self::from_file(path)?;
                tracing::info!(path = %path.display(), "Loaded API keys from config file");
                creds
            }
            Some(path) => {
                tracing::warn!(path = %path.display(), "Config file not found, using environment");
                Self::default()
            }
            None => Self::default(),
        };
        creds.merge(Self::from_lookup(|key| std::env::var(key).ok()));
        Ok(creds)
    }

    /// Read the JSON config file written by `configure --save`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let map: BTreeMap<String, String> = serde_json::from_str(&content)?;
        Ok(Self::from_lookup(|key| map.get(key).cloned()))
    }

    /// Build credentials from any key lookup (env, map, ...).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            google_api_key: get(GOOGLE_API_KEY_ENV),
            google_cse_id: get(GOOGLE_CSE_ID_ENV),
            anthropic_api_key: get(ANTHROPIC_API_KEY_ENV),
        }
    }

    /// Overlay every key present in `other`.
    pub fn merge(&mut self, other: Self) {
        if other.google_api_key.is_some() {
            self.google_api_key = other.google_api_key;
        }
        if other.google_cse_id.is_some() {
            self.google_cse_id = other.google_cse_id;
        }
        if other.anthropic_api_key.is_some() {
            self.anthropic_api_key = other.anthropic_api_key;
        }
    }

    /// Names of required keys that are absent.
    pub fn missing_keys(&self) -> Vec<&'static str> {
        [
            (GOOGLE_API_KEY_ENV, &self.google_api_key),
            (GOOGLE_CSE_ID_ENV, &self.google_cse_id),
            (ANTHROPIC_API_KEY_ENV, &self.anthropic_api_key),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_none())
        .map(|(key, _)| key)
        .collect()
    }

    /// Fail with a configuration error naming every missing key.
    pub fn validate(&self) -> Result<ValidatedCredentials> {
        match (&self.google_api_key, &self.google_cse_id, &self.anthropic_api_key) {
            (Some(google_api_key), Some(google_cse_id), Some(anthropic_api_key)) => {
                Ok(ValidatedCredentials {
                    google_api_key: google_api_key.clone(),
                    google_cse_id: google_cse_id.clone(),
                    anthropic_api_key: anthropic_api_key.clone(),
                })
            }
            _ => Err(ResearchError::config(format!(
                "missing required configuration keys: {}",
                self.missing_keys().join(", ")
            ))),
        }
    }

    /// Write the keys that are set to a JSON config file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut map = BTreeMap::new();
        for (key, value) in [
            (GOOGLE_API_KEY_ENV, &self.google_api_key),
            (GOOGLE_CSE_ID_ENV, &self.google_cse_id),
            (ANTHROPIC_API_KEY_ENV, &self.anthropic_api_key),
        ] {
            if let Some(value) = value {
                map.insert(key, value.clone());
            }
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(&map)?)?;
        Ok(())
    }
}

/// Credentials with every required key present.
#[derive(Clone)]
pub struct ValidatedCredentials {
    pub google_api_key: String,
    pub google_cse_id: String,
    pub anthropic_api_key: String,
}

impl std::fmt::Debug for ValidatedCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatedCredentials")
            .field("google_api_key", &mask_secret(&self.google_api_key))
            .field("google_cse_id", &mask_secret(&self.google_cse_id))
            .field("anthropic_api_key", &mask_secret(&self.anthropic_api_key))
            .finish()
    }
}

/// Show only the first and last five characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 10 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..5].iter().collect();
    let tail: String = chars[chars.len() - 5..].iter().collect();
    format!("{head}...{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_run_options() {
        let config = ResearchConfig::default();
        assert_eq!(config.max_sources, 10);
        assert_eq!(config.max_searches, 5);
        assert!((config.request_delay - 1.0).abs() < f64::EPSILON);
        assert!(config.generate_detailed_summaries);
        assert!(!config.verbose);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_run_options() {
        let config = ResearchConfig {
            max_sources: 0,
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().to_string().contains("max_sources"));

        let config = ResearchConfig {
            max_searches: 0,
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().to_string().contains("max_searches"));

        let config = ResearchConfig {
            request_delay: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unrepresentable_delays_are_rejected_without_panicking() {
        for delay in [f64::INFINITY, f64::NAN, 1e30] {
            let config = ResearchConfig {
                request_delay: delay,
                ..Default::default()
            };
            assert!(config.validate().unwrap_err().to_string().contains("request_delay"));
            assert_eq!(config.request_delay(), Duration::ZERO);
        }

        let config = ResearchConfig {
            request_delay: 0.25,
            ..Default::default()
        };
        assert_eq!(config.request_delay(), Duration::from_millis(250));
    }

    #[test]
    fn test_missing_keys_are_all_reported() {
        let creds = Credentials::from_lookup(lookup_from(&[(GOOGLE_CSE_ID_ENV, "cx")]));
        let err = creds.validate().unwrap_err();
        let message = err.to_string();
        assert!(message.contains(GOOGLE_API_KEY_ENV));
        assert!(message.contains(ANTHROPIC_API_KEY_ENV));
        assert!(!message.contains(GOOGLE_CSE_ID_ENV));
    }

    #[test]
    fn test_blank_values_count_as_missing() {
        let creds = Credentials::from_lookup(lookup_from(&[(GOOGLE_API_KEY_ENV, "  ")]));
        assert!(creds.google_api_key.is_none());
    }

    #[test]
    fn test_merge_prefers_overrides() {
        let mut base = Credentials::from_lookup(lookup_from(&[
            (GOOGLE_API_KEY_ENV, "file-key"),
            (GOOGLE_CSE_ID_ENV, "file-cx"),
        ]));
        base.merge(Credentials::from_lookup(lookup_from(&[(
            GOOGLE_API_KEY_ENV,
            "env-key",
        )])));
        assert_eq!(base.google_api_key.as_deref(), Some("env-key"));
        assert_eq!(base.google_cse_id.as_deref(), Some("file-cx"));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let creds = Credentials {
            google_api_key: Some("g-key".into()),
            google_cse_id: Some("cx-id".into()),
            anthropic_api_key: Some("sk-ant".into()),
        };
        creds.save(&path).unwrap();

        let loaded = Credentials::from_file(&path).unwrap();
        assert_eq!(loaded, creds);
        let validated = loaded.validate().unwrap();
        assert_eq!(validated.google_cse_id, "cx-id");
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("sk-ant-0123456789abcdef"), "sk-an...bcdef");
        assert_eq!(mask_secret("short"), "*****");
    }
}
