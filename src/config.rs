use std::path::PathBuf;
use std::time::Duration;

use crate::error::ScholarError;
use crate::llm::DispatchConfig;

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_CHUNK_SIZE: usize = 4000;
pub const DEFAULT_REFERENCES_DIR: &str = "subFolder";
pub const DEFAULT_MAIN_PAPER_DIR: &str = "mainPaper";

/// Runtime configuration for the whole pipeline
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub request_timeout: Duration,
    pub dispatch: DispatchConfig,
    /// Character budget for a single summarization prompt's document text
    pub chunk_size: usize,
    pub references_dir: PathBuf,
    pub main_paper_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Config {
    /// Build a configuration with defaults for everything but the credentials
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: 2048,
            request_timeout: Duration::from_secs(120),
            dispatch: DispatchConfig::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            references_dir: PathBuf::from(DEFAULT_REFERENCES_DIR),
            main_paper_dir: PathBuf::from(DEFAULT_MAIN_PAPER_DIR),
            output_dir: PathBuf::from("."),
        }
    }

    /// Read credentials and endpoint overrides from the environment.
    ///
    /// `GROQ_API_KEY` is required. `GROQ_MODEL`, `GROQ_BASE_URL` and
    /// `API_TIMEOUT_SECS` are optional.
    pub fn from_env() -> Result<Self, ScholarError> {
        let api_key = std::env::var("GROQ_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ScholarError::MissingApiKey)?;

        let mut config = Self::new(api_key);

        if let Ok(model) = std::env::var("GROQ_MODEL") {
            if !model.trim().is_empty() {
                config.model = model;
            }
        }
        // Support configurable base URL for testing
        if let Ok(base_url) = std::env::var("GROQ_BASE_URL") {
            if !base_url.trim().is_empty() {
                config.base_url = base_url.trim_end_matches('/').to_string();
            }
        }
        if let Some(secs) = std::env::var("API_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<(), ScholarError> {
        if self.dispatch.concurrency == 0 {
            return Err(ScholarError::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.dispatch.max_retries == 0 {
            return Err(ScholarError::InvalidConfig(
                "max retries must be at least 1".to_string(),
            ));
        }
        if self.chunk_size == 0 {
            return Err(ScholarError::InvalidConfig(
                "chunk size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
