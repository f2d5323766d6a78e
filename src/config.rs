use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{MentorError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MentorConfig {
   /// OpenAI-compatible API base (the `/chat/completions` path is appended)
   pub api_base_url: String,

   /// Optional API key for authentication (overridden by
   /// `COMMIT_MENTOR_API_KEY` env var)
   pub api_key: Option<String>,

   /// Model used for commit message feedback
   pub model: String,

   pub temperature: f32,
   pub max_tokens:  u32,

   /// HTTP request timeout in seconds
   pub request_timeout_secs: u64,

   /// HTTP connection timeout in seconds
   pub connect_timeout_secs: u64,

   pub max_retries:        u32,
   pub initial_backoff_ms: u64,

   /// Template used when no selection has been persisted
   pub default_template: String,

   /// Prompt variant for the feedback request (e.g., "default")
   #[serde(default = "default_prompt_variant")]
   pub prompt_variant: String,
}

fn default_prompt_variant() -> String {
   "default".to_string()
}

impl Default for MentorConfig {
   fn default() -> Self {
      Self {
         api_base_url:         "https://api.openai.com/v1".to_string(),
         api_key:              None,
         model:                "gpt-4o-mini".to_string(),
         temperature:          0.3,
         max_tokens:           500,
         request_timeout_secs: 60,
         connect_timeout_secs: 15,
         max_retries:          3,
         initial_backoff_ms:   1000,
         default_template:     "Conventional Commits".to_string(),
         prompt_variant:       default_prompt_variant(),
      }
   }
}

impl MentorConfig {
   /// Load config from default location (~/.config/commit-mentor/config.toml)
   /// Falls back to Default if file doesn't exist or can't determine home
   /// directory. Environment variables override config file values:
   /// - `COMMIT_MENTOR_API_URL` overrides `api_base_url`
   /// - `COMMIT_MENTOR_API_KEY` overrides `api_key`
   /// - `COMMIT_MENTOR_MODEL` overrides `model`
   pub fn load() -> Result<Self> {
      let config_path = if let Ok(custom_path) = std::env::var("COMMIT_MENTOR_CONFIG") {
         PathBuf::from(custom_path)
      } else {
         Self::default_config_path().unwrap_or_else(|_| PathBuf::new())
      };

      let mut config = if config_path.exists() {
         Self::parse_file(&config_path)?
      } else {
         Self::default()
      };

      Self::apply_env_overrides(&mut config);
      Ok(config)
   }

   /// Load config from specific file
   pub fn from_file(path: &Path) -> Result<Self> {
      let mut config = Self::parse_file(path)?;
      Self::apply_env_overrides(&mut config);
      Ok(config)
   }

   fn parse_file(path: &Path) -> Result<Self> {
      let contents = std::fs::read_to_string(path)
         .map_err(|e| MentorError::ConfigError(format!("Failed to read config: {e}")))?;
      toml::from_str(&contents)
         .map_err(|e| MentorError::ConfigError(format!("Failed to parse config: {e}")))
   }

   /// Apply environment variable overrides to config
   fn apply_env_overrides(config: &mut Self) {
      if let Ok(api_url) = std::env::var("COMMIT_MENTOR_API_URL") {
         config.api_base_url = api_url;
      }

      if let Ok(api_key) = std::env::var("COMMIT_MENTOR_API_KEY") {
         config.api_key = Some(api_key);
      }

      if let Ok(model) = std::env::var("COMMIT_MENTOR_MODEL") {
         config.model = model;
      }
   }

   /// Get default config path (platform-safe)
   /// Tries HOME (Unix/Linux/macOS) then USERPROFILE (Windows)
   pub fn default_config_path() -> Result<PathBuf> {
      if let Ok(home) = std::env::var("HOME") {
         return Ok(PathBuf::from(home).join(".config/commit-mentor/config.toml"));
      }

      if let Ok(home) = std::env::var("USERPROFILE") {
         return Ok(PathBuf::from(home).join(".config/commit-mentor/config.toml"));
      }

      Err(MentorError::ConfigError(
         "No home directory found (tried HOME and USERPROFILE)".to_string(),
      ))
   }
}
