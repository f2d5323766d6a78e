use std::{path::PathBuf, sync::LazyLock};

use parking_lot::Mutex;
use rust_embed::RustEmbed;
use tera::{Context, Tera};

use crate::error::{MentorError, Result};

/// Embedded prompts folder (compiled into binary)
#[derive(RustEmbed)]
#[folder = "prompts/"]
struct Prompts;

/// Shared Tera instance; `render_str` needs mutable access
static TERA: LazyLock<Mutex<Tera>> = LazyLock::new(|| {
   let mut tera = Tera::default();
   // Prompts are plain text, never HTML
   tera.autoescape_on(vec![]);
   Mutex::new(tera)
});

/// Inputs for the remote feedback prompt
#[derive(Debug, Clone, Copy)]
pub struct FeedbackPromptInput<'a> {
   pub message:              &'a str,
   pub template_name:        &'a str,
   pub template_description: &'a str,
   /// Free-text user preferences, forwarded as typed
   pub preferences:          &'a str,
   /// Local findings rendered as one line each
   pub findings:             &'a [String],
}

/// Determine user prompts directory (~/.commit-mentor/prompts/) if a home dir
/// exists.
fn get_user_prompts_dir() -> Option<PathBuf> {
   std::env::var("HOME")
      .or_else(|_| std::env::var("USERPROFILE"))
      .ok()
      .map(|home| PathBuf::from(home).join(".commit-mentor").join("prompts"))
}

/// Copy embedded prompts into the user prompts directory so they can be
/// edited. Existing files are left alone.
pub fn ensure_prompts_dir() -> Result<()> {
   let Some(user_prompts_dir) = get_user_prompts_dir() else {
      // No HOME/USERPROFILE: embedded prompts are used in-memory
      return Ok(());
   };

   for file in Prompts::iter() {
      let file_path = user_prompts_dir.join(file.as_ref());
      if file_path.exists() {
         continue;
      }

      if let Some(parent) = file_path.parent() {
         std::fs::create_dir_all(parent).map_err(|e| {
            MentorError::Other(format!("Failed to create directory {}: {}", parent.display(), e))
         })?;
      }

      if let Some(embedded_file) = Prompts::get(file.as_ref()) {
         std::fs::write(&file_path, embedded_file.data.as_ref()).map_err(|e| {
            MentorError::Other(format!("Failed to write file {}: {}", file_path.display(), e))
         })?;
      }
   }

   Ok(())
}

/// Load template content, preferring a user override over the embedded copy
fn load_template_file(category: &str, variant: &str) -> Result<String> {
   if let Some(prompts_dir) = get_user_prompts_dir() {
      let template_path = prompts_dir.join(category).join(format!("{variant}.md"));
      if template_path.exists() {
         return std::fs::read_to_string(&template_path).map_err(|e| {
            MentorError::TemplateError(format!(
               "Failed to read template file {}: {}",
               template_path.display(),
               e
            ))
         });
      }
   }

   let embedded_key = format!("{category}/{variant}.md");
   if let Some(bytes) = Prompts::get(&embedded_key) {
      return std::str::from_utf8(bytes.data.as_ref())
         .map(|s| s.to_string())
         .map_err(|e| {
            MentorError::TemplateError(format!(
               "Embedded template {embedded_key} is not valid UTF-8: {e}"
            ))
         });
   }

   Err(MentorError::TemplateError(format!(
      "Template variant '{variant}' in category '{category}' not found as user override or \
       embedded default (embedded: {})",
      embedded_variants().join(", ")
   )))
}

/// Names of the embedded feedback prompt variants
pub fn embedded_variants() -> Vec<String> {
   Prompts::iter()
      .filter_map(|file| {
         file
            .strip_prefix("feedback/")
            .and_then(|name| name.strip_suffix(".md"))
            .map(str::to_string)
      })
      .collect()
}

/// Render the prompt sent to the language model for qualitative feedback
pub fn render_feedback_prompt(variant: &str, input: &FeedbackPromptInput<'_>) -> Result<String> {
   let template_content = load_template_file("feedback", variant)?;

   let mut context = Context::new();
   context.insert("message", input.message);
   context.insert("template_name", input.template_name);
   context.insert("template_description", input.template_description);
   // Blank preferences render as absent
   let preferences = if input.preferences.trim().is_empty() { "" } else { input.preferences };
   context.insert("preferences", preferences);
   context.insert("findings", input.findings);

   let mut tera = TERA.lock();
   tera.render_str(&template_content, &context).map_err(|e| {
      MentorError::TemplateError(format!("Failed to render feedback prompt '{variant}': {e}"))
   })
}
