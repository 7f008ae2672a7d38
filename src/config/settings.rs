//! Configuration settings for Svar.
//!
//! All thresholds, limits, and timeouts consumed by the workflow live here.
//! Settings are read-only after startup and shared by all concurrent
//! workflow executions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub index: IndexSettings,
    pub evaluator: EvaluatorSettings,
    pub search: SearchSettings,
    pub synthesis: SynthesisSettings,
    pub speech: SpeechSettings,
    pub prompts: PromptSettings,
}


/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Default answer language (BCP 47 tag, e.g. "en", "tr"). None = follow the query.
    pub language: Option<String>,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            language: None,
        }
    }
}

/// Vector index retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    /// HTTP endpoint of the vector index query service.
    pub endpoint: String,
    /// Number of passages to retrieve per query.
    pub top_k: usize,
    /// Per-query timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8080/query".to_string(),
            top_k: 5,
            timeout_seconds: 10,
        }
    }
}

/// Sufficiency evaluator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorSettings {
    /// Model used for the semantic sufficiency verdict.
    pub model: String,
    /// Minimum top relevance score for evidence to be considered at all.
    pub threshold: f32,
    /// Per-call timeout in seconds for the verdict call.
    pub timeout_seconds: u64,
}

impl Default for EvaluatorSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            threshold: 0.55,
            timeout_seconds: 20,
        }
    }
}

/// Web search fallback settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// HTTP endpoint of the search provider.
    pub endpoint: String,
    /// Optional bearer API key for the search provider.
    pub api_key: Option<String>,
    /// Maximum number of web results to fold into evidence.
    pub max_results: usize,
    /// Per-call timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8081/search".to_string(),
            api_key: None,
            max_results: 3,
            timeout_seconds: 10,
        }
    }
}

/// Answer synthesis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisSettings {
    /// LLM model for answer generation.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum number of recent conversation turns included in the prompt.
    pub history_window: usize,
    /// Per-attempt timeout in seconds for the generation call.
    pub timeout_seconds: u64,
    /// Base backoff before the single retry, in milliseconds.
    pub retry_backoff_ms: u64,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            temperature: 0.2,
            history_window: 10,
            timeout_seconds: 60,
            retry_backoff_ms: 500,
        }
    }
}

/// Speech rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    /// Speech synthesis model.
    pub model: String,
    /// Voice name.
    pub voice: String,
    /// Per-call timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            model: "tts-1".to_string(),
            voice: "alloy".to_string(),
            timeout_seconds: 30,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}


impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::SvarError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("svar")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.index.top_k, 5);
        assert_eq!(settings.search.max_results, 3);
        assert!(settings.evaluator.threshold > 0.0 && settings.evaluator.threshold < 1.0);
        assert_eq!(settings.synthesis.history_window, 10);
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let toml = r#"
            [evaluator]
            threshold = 0.7
        "#;
        let settings: Settings = toml::from_str(toml).unwrap();
        assert!((settings.evaluator.threshold - 0.7).abs() < f32::EPSILON);
        assert_eq!(settings.evaluator.model, "gpt-4o-mini");
        assert_eq!(settings.index.top_k, 5);
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let dir = std::env::temp_dir().join(format!("svar-test-{}", uuid::Uuid::new_v4()));
        let path = dir.join("config.toml");

        let mut settings = Settings::default();
        settings.evaluator.threshold = 0.8;
        settings.general.language = Some("tr".to_string());
        settings.save_to(&path).unwrap();

        let reloaded = Settings::load_from(Some(&path)).unwrap();
        assert!((reloaded.evaluator.threshold - 0.8).abs() < f32::EPSILON);
        assert_eq!(reloaded.general.language.as_deref(), Some("tr"));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_expand_path_passes_plain_paths_through() {
        let path = Settings::expand_path("/var/lib/svar");
        assert_eq!(path, PathBuf::from("/var/lib/svar"));
    }
}
