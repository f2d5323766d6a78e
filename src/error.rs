use thiserror::Error;

#[derive(Debug, Error)]
pub enum MentorError {
   #[error("API request failed (HTTP {status}): {body}")]
   ApiError { status: u16, body: String },

   #[error("API call failed after {retries} retries: {source}")]
   ApiRetryExhausted {
      retries: u32,
      #[source]
      source:  Box<Self>,
   },

   #[error("Unknown template '{name}' (available: {available})")]
   UnknownTemplate { name: String, available: String },

   #[error("Commit message check failed: {0}")]
   CheckFailed(String),

   #[error("Failed to render prompt template: {0}")]
   TemplateError(String),

   #[error("Config error: {0}")]
   ConfigError(String),

   #[error("JSON error: {0}")]
   JsonError(#[from] serde_json::Error),

   #[error("TOML parse error: {0}")]
   TomlDeError(#[from] toml::de::Error),

   #[error("TOML serialize error: {0}")]
   TomlSerError(#[from] toml::ser::Error),

   #[error("HTTP error: {0}")]
   HttpError(#[from] reqwest::Error),

   #[error("Clipboard error: {0}")]
   ClipboardError(#[from] arboard::Error),

   #[error("{0}")]
   Other(String),
}

pub type Result<T> = std::result::Result<T, MentorError>;
