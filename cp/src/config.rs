//! Content planner configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::curator::CuratorConfig;
use crate::strategy::DEFAULT_REPEAT_THRESHOLD;

const APP_NAME: &str = "contentplanner";

/// Longest accepted autosave interval (one day)
pub const MAX_AUTOSAVE_INTERVAL_SECS: u64 = 86_400;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// LLM used for questions and ideas
    pub llm: LlmConfig,

    /// LLM used to answer questions in AI-to-AI rounds (defaults to `llm`)
    #[serde(rename = "answerer-llm")]
    pub answerer_llm: Option<LlmConfig>,

    /// Session behavior
    pub session: SessionConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// A missing API key is not an error here: generation fails soft later.
    pub fn validate(&self) -> Result<()> {
        let session = &self.session;
        if !(0.0..=1.0).contains(&session.similarity_threshold) {
            return Err(eyre::eyre!(
                "similarity-threshold must be within [0, 1], got {}",
                session.similarity_threshold
            ));
        }
        if !(0.0..=1.0).contains(&session.question_repeat_threshold) {
            return Err(eyre::eyre!(
                "question-repeat-threshold must be within [0, 1], got {}",
                session.question_repeat_threshold
            ));
        }
        if session.summary_min_chars > session.summary_max_chars {
            return Err(eyre::eyre!(
                "summary-min-chars ({}) exceeds summary-max-chars ({})",
                session.summary_min_chars,
                session.summary_max_chars
            ));
        }
        if session.questions_per_round == 0 {
            return Err(eyre::eyre!("questions-per-round must be at least 1"));
        }
        if session.ideas_per_round == 0 {
            return Err(eyre::eyre!("ideas-per-round must be at least 1"));
        }
        if session.autosave_interval_secs == 0 || session.autosave_interval_secs > MAX_AUTOSAVE_INTERVAL_SECS {
            return Err(eyre::eyre!(
                "autosave-interval-secs must be between 1 and {}, got {}",
                MAX_AUTOSAVE_INTERVAL_SECS,
                session.autosave_interval_secs
            ));
        }
        if session.call_timeout_ms == 0 {
            return Err(eyre::eyre!("call-timeout-ms must be at least 1"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, it must load
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        for candidate in Self::default_locations() {
            if candidate.exists() {
                match Self::load_from_file(&candidate) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", candidate.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is initialized
    ///
    /// Any failure yields `None`; the full load reports it properly later.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        #[derive(Deserialize)]
        struct LogLevelOnly {
            #[serde(rename = "log-level")]
            log_level: Option<String>,
        }

        let path = match config_path {
            Some(path) => path.clone(),
            None => Self::default_locations().into_iter().find(|p| p.exists())?,
        };
        let content = fs::read_to_string(path).ok()?;
        serde_yaml::from_str::<LogLevelOnly>(&content).ok()?.log_level
    }

    /// LLM settings for the AI-to-AI answerer
    pub fn answerer(&self) -> &LlmConfig {
        self.answerer_llm.as_ref().unwrap_or(&self.llm)
    }

    /// Project-local file, then the user config directory
    fn default_locations() -> Vec<PathBuf> {
        let mut locations = vec![PathBuf::from(format!(".{}.yml", APP_NAME))];
        if let Some(config_dir) = dirs::config_dir() {
            locations.push(config_dir.join(APP_NAME).join(format!("{}.yml", APP_NAME)));
        }
        locations
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name: ollama, openai or anthropic
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// HTTP request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl LlmConfig {
    /// Read the API key from the configured environment variable
    pub fn get_api_key(&self) -> Result<String> {
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(eyre::eyre!(
                "LLM API key not found. Set the {} environment variable.",
                self.api_key_env
            )),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "deepseek-v3.1:671b-cloud".to_string(),
            api_key_env: "OLLAMA_API_KEY".to_string(),
            base_url: "https://ollama.com".to_string(),
            max_tokens: 4096,
            timeout_ms: 300_000,
        }
    }
}

/// Session behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Persisted session snapshot
    #[serde(rename = "output-file")]
    pub output_file: PathBuf,

    /// Seed text describing the subject
    #[serde(rename = "context-file")]
    pub context_file: PathBuf,

    #[serde(rename = "autosave-interval-secs")]
    pub autosave_interval_secs: u64,

    #[serde(rename = "questions-per-round")]
    pub questions_per_round: usize,

    #[serde(rename = "ideas-per-round")]
    pub ideas_per_round: usize,

    /// Title similarity at or above which ideas are duplicates
    #[serde(rename = "similarity-threshold")]
    pub similarity_threshold: f64,

    /// Question similarity at or above which a generated question is a repeat
    #[serde(rename = "question-repeat-threshold")]
    pub question_repeat_threshold: f64,

    #[serde(rename = "summary-min-chars")]
    pub summary_min_chars: usize,

    #[serde(rename = "summary-max-chars")]
    pub summary_max_chars: usize,

    /// Upper bound on each generation call
    #[serde(rename = "call-timeout-ms")]
    pub call_timeout_ms: u64,

    /// Pass the context file to the question generator
    #[serde(rename = "seed-questions-with-context")]
    pub seed_questions_with_context: bool,
}

impl SessionConfig {
    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_interval_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn curator(&self) -> CuratorConfig {
        CuratorConfig {
            threshold: self.similarity_threshold,
            summary_min_chars: self.summary_min_chars,
            summary_max_chars: self.summary_max_chars,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            output_file: PathBuf::from("out/content_ideas.json"),
            context_file: PathBuf::from("out/context.md"),
            autosave_interval_secs: 300,
            questions_per_round: 5,
            ideas_per_round: 10,
            similarity_threshold: 0.70,
            question_repeat_threshold: DEFAULT_REPEAT_THRESHOLD,
            summary_min_chars: 100,
            summary_max_chars: 150,
            call_timeout_ms: 120_000,
            seed_questions_with_context: false,
        }
    }
}
