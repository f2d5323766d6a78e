use std::{thread, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
   config::MentorConfig,
   error::{MentorError, Result},
   preferences::Preferences,
   style,
   templates::{self, FeedbackPromptInput},
   types::Template,
};

/// Shown in place of feedback when the remote call fails
pub const FEEDBACK_FALLBACK: &str = "Error analyzing commit message. Please try again.";

/// Everything the feedback request is built from
#[derive(Debug, Clone, Copy)]
pub struct FeedbackRequest<'a> {
   pub message:     &'a str,
   pub template:    &'a Template,
   pub preferences: &'a Preferences,
   /// Local findings rendered as one line each
   pub findings:    &'a [String],
}

/// Build HTTP client with timeouts from config
fn build_client(config: &MentorConfig) -> Result<reqwest::blocking::Client> {
   reqwest::blocking::Client::builder()
      .timeout(Duration::from_secs(config.request_timeout_secs))
      .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
      .build()
      .map_err(MentorError::HttpError)
}

#[derive(Debug, Serialize)]
struct Message {
   role:    String,
   content: String,
}

#[derive(Debug, Serialize)]
struct ApiRequest {
   model:       String,
   max_tokens:  u32,
   temperature: f32,
   messages:    Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct Choice {
   message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
   #[serde(default)]
   content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
   choices: Vec<Choice>,
}

/// Retry an API call with exponential backoff.
///
/// The closure returns `Ok((true, _))` to request a retry (e.g. on a 5xx),
/// `Ok((false, Some(value)))` on success.
pub fn retry_api_call<F, T>(config: &MentorConfig, mut f: F) -> Result<T>
where
   F: FnMut() -> Result<(bool, Option<T>)>,
{
   let mut attempt = 0;

   loop {
      attempt += 1;

      match f() {
         Ok((false, Some(result))) => return Ok(result),
         Ok((false, None)) => {
            return Err(MentorError::Other("API call failed without result".to_string()));
         },
         Ok((true, _)) if attempt < config.max_retries => {
            let backoff_ms = config.initial_backoff_ms * (1 << (attempt - 1));
            style::warn(&format!("Retry {}/{} after {}ms...", attempt, config.max_retries, backoff_ms));
            thread::sleep(Duration::from_millis(backoff_ms));
         },
         Ok((true, _)) => {
            return Err(MentorError::ApiRetryExhausted {
               retries: config.max_retries,
               source:  Box::new(MentorError::Other("Max retries exceeded".to_string())),
            });
         },
         Err(e) => {
            if attempt < config.max_retries {
               let backoff_ms = config.initial_backoff_ms * (1 << (attempt - 1));
               style::warn(&format!(
                  "Error: {} - Retry {}/{} after {}ms...",
                  e, attempt, config.max_retries, backoff_ms
               ));
               thread::sleep(Duration::from_millis(backoff_ms));
               continue;
            }
            return Err(e);
         },
      }
   }
}

/// Render the feedback prompt for a request
pub fn build_prompt(request: &FeedbackRequest<'_>, config: &MentorConfig) -> Result<String> {
   templates::render_feedback_prompt(&config.prompt_variant, &FeedbackPromptInput {
      message:              request.message,
      template_name:        &request.template.name,
      template_description: &request.template.description,
      preferences:          &request.preferences.raw,
      findings:             request.findings,
   })
}

/// Ask the model for qualitative feedback on a commit message
pub fn request_feedback(request: &FeedbackRequest<'_>, config: &MentorConfig) -> Result<String> {
   let prompt = build_prompt(request, config)?;

   if std::env::var("COMMIT_MENTOR_VERBOSE").is_ok() {
      eprintln!("{}", style::framed("Prompt", &prompt, style::term_width()));
   }

   let client = build_client(config)?;

   retry_api_call(config, || {
      let api_request = ApiRequest {
         model:       config.model.clone(),
         max_tokens:  config.max_tokens,
         temperature: config.temperature,
         messages:    vec![Message { role: "user".to_string(), content: prompt.clone() }],
      };

      let mut request_builder = client
         .post(format!("{}/chat/completions", config.api_base_url.trim_end_matches('/')))
         .header("content-type", "application/json");

      if let Some(ref api_key) = config.api_key {
         request_builder = request_builder.header("Authorization", format!("Bearer {api_key}"));
      }

      let response = request_builder
         .json(&api_request)
         .send()
         .map_err(MentorError::HttpError)?;

      let status = response.status();

      // Retry on 5xx errors
      if status.is_server_error() {
         let error_text = response
            .text()
            .unwrap_or_else(|_| "Unknown error".to_string());
         style::warn(&format!("Server error {status}: {error_text}"));
         return Ok((true, None));
      }

      if !status.is_success() {
         let error_text = response
            .text()
            .unwrap_or_else(|_| "Unknown error".to_string());
         return Err(MentorError::ApiError { status: status.as_u16(), body: error_text });
      }

      let api_response: ApiResponse = response.json().map_err(MentorError::HttpError)?;

      let content = api_response
         .choices
         .into_iter()
         .next()
         .and_then(|choice| choice.message.content)
         .map(|content| content.trim().to_string())
         .filter(|content| !content.is_empty())
         .ok_or_else(|| MentorError::Other("API returned empty feedback".to_string()))?;

      Ok((false, Some(content)))
   })
}

/// Feedback text for display. Failures are reported as a warning and replaced
/// with [`FEEDBACK_FALLBACK`]; they never reach the caller as errors.
pub fn analyze_commit_message(request: &FeedbackRequest<'_>, config: &MentorConfig) -> String {
   match style::with_spinner_result("Requesting feedback...", || request_feedback(request, config)) {
      Ok(feedback) => feedback,
      Err(e) => {
         style::warn(&format!("Error analyzing commit message: {e}"));
         FEEDBACK_FALLBACK.to_string()
      },
   }
}

#[cfg(test)]
mod tests {
   use std::cell::Cell;

   use super::*;
   use crate::registry::TemplateRegistry;

   fn fast_config() -> MentorConfig {
      MentorConfig { max_retries: 3, initial_backoff_ms: 1, ..Default::default() }
   }

   #[test]
   fn test_retry_succeeds_after_retryable() {
      let config = fast_config();
      let calls = Cell::new(0);
      let result = retry_api_call(&config, || {
         calls.set(calls.get() + 1);
         if calls.get() < 2 { Ok((true, None)) } else { Ok((false, Some(42))) }
      });
      assert_eq!(result.unwrap(), 42);
      assert_eq!(calls.get(), 2);
   }

   #[test]
   fn test_retry_exhausted() {
      let config = fast_config();
      let calls = Cell::new(0);
      let result: Result<u8> = retry_api_call(&config, || {
         calls.set(calls.get() + 1);
         Ok((true, None))
      });
      assert!(matches!(result, Err(MentorError::ApiRetryExhausted { retries: 3, .. })));
      assert_eq!(calls.get(), 3);
   }

   #[test]
   fn test_retry_returns_last_error() {
      let config = fast_config();
      let result: Result<u8> =
         retry_api_call(&config, || Err(MentorError::ApiError { status: 401, body: "no".into() }));
      assert!(matches!(result, Err(MentorError::ApiError { status: 401, .. })));
   }

   #[test]
   fn test_build_prompt_includes_template_and_preferences() {
      let registry = TemplateRegistry::new();
      let preferences = Preferences::new("avoid jargon, short descriptions");
      let request = FeedbackRequest {
         message:     "updated stuff",
         template:    registry.active(),
         preferences: &preferences,
         findings:    &[],
      };
      let prompt = build_prompt(&request, &MentorConfig::default()).unwrap();
      assert!(prompt.contains("Conventional Commits template (type(scope): subject)"));
      assert!(prompt.contains("avoid jargon, short descriptions"));
      assert!(prompt.contains("updated stuff"));
   }

   #[test]
   fn test_build_prompt_keeps_preferences_as_typed() {
      let registry = TemplateRegistry::new();
      let raw = "avoid jargon,,  no passive voice, e.g. x";
      let preferences = Preferences::new(raw);
      let request = FeedbackRequest {
         message:     "fix: something",
         template:    registry.active(),
         preferences: &preferences,
         findings:    &[],
      };
      let prompt = build_prompt(&request, &MentorConfig::default()).unwrap();
      assert!(prompt.contains(&format!("Consider these custom preferences: {raw}.")));
   }

   #[test]
   fn test_analyze_falls_back_on_failure() {
      let registry = TemplateRegistry::new();
      let preferences = Preferences::default();
      let request = FeedbackRequest {
         message:     "fix: something",
         template:    registry.active(),
         preferences: &preferences,
         findings:    &[],
      };
      // Nothing listens on the discard port
      let config = MentorConfig {
         api_base_url: "http://127.0.0.1:9".to_string(),
         max_retries: 1,
         initial_backoff_ms: 1,
         connect_timeout_secs: 1,
         request_timeout_secs: 1,
         ..Default::default()
      };
      assert_eq!(analyze_commit_message(&request, &config), FEEDBACK_FALLBACK);
   }
}
