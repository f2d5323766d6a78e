use std::{fmt, ops::Range, path::PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use regex::Regex;
use serde::{Serialize, Serializer};

use crate::error::{MentorError, Result};

// === Templates ===

/// Stand-in for `.`: any character except a line terminator
const NON_TERMINATOR: &str = r"[^\n\r\x{2028}\x{2029}]";

/// Compiled structural matcher for a template.
///
/// Matching is done against the whole string handed to it. Nothing here
/// isolates the subject line; callers that want subject-only checks must slice
/// the text themselves before validating.
///
/// A bare `.` in the source never matches a line terminator (`\n`, `\r`,
/// U+2028, U+2029), so a subject with a stray carriage return is a mismatch.
#[derive(Clone)]
pub struct TemplatePattern {
   source: String,
   regex:  Regex,
}

impl TemplatePattern {
   /// Compile a pattern from its regex source
   pub fn new(source: impl Into<String>) -> Result<Self> {
      let source = source.into();
      let regex = Regex::new(&restrict_dot(&source)).map_err(|e| {
         MentorError::Other(format!("Invalid template pattern '{source}': {e}"))
      })?;
      Ok(Self { source, regex })
   }

   pub fn is_match(&self, text: &str) -> bool {
      self.regex.is_match(text)
   }

   pub fn as_str(&self) -> &str {
      &self.source
   }
}

/// Replace every `.` outside a character class with [`NON_TERMINATOR`].
/// Escaped dots and dots inside `[...]` are literal and stay as they are.
fn restrict_dot(source: &str) -> String {
   let mut out = String::with_capacity(source.len());
   let mut chars = source.chars();
   let mut in_class = false;

   while let Some(c) = chars.next() {
      match c {
         '\\' => {
            out.push(c);
            if let Some(escaped) = chars.next() {
               out.push(escaped);
            }
         },
         '[' if !in_class => {
            in_class = true;
            out.push(c);
         },
         ']' if in_class => {
            in_class = false;
            out.push(c);
         },
         '.' if !in_class => out.push_str(NON_TERMINATOR),
         _ => out.push(c),
      }
   }

   out
}

impl fmt::Debug for TemplatePattern {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_tuple("TemplatePattern").field(&self.source).finish()
   }
}

impl PartialEq for TemplatePattern {
   fn eq(&self, other: &Self) -> bool {
      self.source == other.source
   }
}

impl Eq for TemplatePattern {}

impl Serialize for TemplatePattern {
   fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
   where
      S: Serializer,
   {
      serializer.serialize_str(&self.source)
   }
}

/// A named, described structural rule a commit message is expected to satisfy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Template {
   pub name:        String,
   /// Format hint shown to users, e.g. `type(scope): subject`
   pub description: String,
   pub pattern:     TemplatePattern,
}

impl Template {
   pub fn new(
      name: impl Into<String>,
      description: impl Into<String>,
      pattern: &str,
   ) -> Result<Self> {
      Ok(Self {
         name:        name.into(),
         description: description.into(),
         pattern:     TemplatePattern::new(pattern)?,
      })
   }
}

// === Findings ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FindingKind {
   TemplateMismatch,
   WeakVerb,
   LineTooLong,
}

impl FindingKind {
   pub const fn as_str(&self) -> &'static str {
      match self {
         Self::TemplateMismatch => "template-mismatch",
         Self::WeakVerb => "weak-verb",
         Self::LineTooLong => "line-too-long",
      }
   }
}

impl fmt::Display for FindingKind {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str(self.as_str())
   }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
   Warning,
   Information,
}

impl fmt::Display for Severity {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      match self {
         Self::Warning => f.write_str("warning"),
         Self::Information => f.write_str("info"),
      }
   }
}

/// Half-open `[start, end)` range of character offsets into the text that
/// produced the finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
   pub start: usize,
   pub end:   usize,
}

impl Span {
   pub const fn new(start: usize, end: usize) -> Self {
      Self { start, end }
   }

   /// Map the character span back to a byte range of `text`.
   ///
   /// Returns `None` when the span does not fit inside `text`, which happens
   /// when a finding is applied to a different snapshot than the one it came
   /// from.
   pub fn byte_range(&self, text: &str) -> Option<Range<usize>> {
      if self.start > self.end {
         return None;
      }
      let mut boundaries = text
         .char_indices()
         .map(|(idx, _)| idx)
         .chain(std::iter::once(text.len()));
      let start = boundaries.nth(self.start)?;
      let end = if self.end == self.start {
         start
      } else {
         boundaries.nth(self.end - self.start - 1)?
      };
      Some(start..end)
   }

   /// Slice of `text` covered by this span
   pub fn slice<'a>(&self, text: &'a str) -> Option<&'a str> {
      self.byte_range(text).map(|range| &text[range])
   }
}

/// A single located issue discovered during validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
   pub kind:     FindingKind,
   pub message:  String,
   pub span:     Span,
   pub severity: Severity,
}

impl Finding {
   pub fn new(kind: FindingKind, message: impl Into<String>, span: Span, severity: Severity) -> Self {
      Self { kind, message: message.into(), span, severity }
   }
}

// === CLI ===

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
   /// `path:line:col: severity[kind]: message` lines
   #[default]
   Text,
   /// Findings as JSON
   Json,
}

// CLI Args
#[derive(Parser, Debug)]
#[command(author, version, about = "Lint git commit messages against style templates", long_about = None)]
pub struct Args {
   /// Path to config file (default: ~/.config/commit-mentor/config.toml)
   #[arg(long, global = true)]
   pub config: Option<PathBuf>,

   /// Path to state file holding the saved template and preferences
   /// (default: `COMMIT_MENTOR_STATE` or ~/.config/commit-mentor/state.toml)
   #[arg(long, global = true)]
   pub state: Option<PathBuf>,

   /// Template to validate against for this run only (not persisted)
   #[arg(long, global = true)]
   pub template: Option<String>,

   #[command(subcommand)]
   pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
   /// Check commit message files (default: .git/COMMIT_EDITMSG)
   Check {
      /// Message files to check
      files: Vec<PathBuf>,

      /// Also check files whose name does not end in COMMIT_EDITMSG
      #[arg(long)]
      all_files: bool,

      /// Validate only the first line of each message
      #[arg(long)]
      subject_only: bool,

      /// Fail on informational findings too, not only warnings
      #[arg(long)]
      strict: bool,

      #[arg(long, value_enum, default_value = "text")]
      format: OutputFormat,
   },

   /// List available templates
   Templates,

   /// Make a template the active one
   Use {
      /// Template name (exact, case-sensitive)
      name: String,
   },

   /// Manage free-text feedback preferences
   Prefs {
      #[command(subcommand)]
      action: PrefsAction,
   },

   /// Ask the language model for feedback on a commit message
   Analyze {
      /// Message file (default: .git/COMMIT_EDITMSG)
      file: Option<PathBuf>,

      /// Model to use for feedback
      #[arg(long, short = 'm')]
      model: Option<String>,

      /// Temperature for API calls (0.0-1.0)
      #[arg(long, short = 't')]
      temperature: Option<f32>,

      /// Copy the feedback to clipboard
      #[arg(long)]
      copy: bool,
   },
}

#[derive(Subcommand, Debug)]
pub enum PrefsAction {
   /// Store preferences (comma-separated, e.g. "avoid jargon, no passive voice")
   Set {
      #[arg(trailing_var_arg = true)]
      text: Vec<String>,
   },
   /// Print stored preferences
   Show,
   /// Remove stored preferences
   Clear,
}
