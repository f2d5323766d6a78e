use std::sync::LazyLock;

use regex::Regex;

use crate::types::{Finding, FindingKind, Severity, Span, Template};

/// Verbs considered too vague for commit messages, in scan order
pub const WEAK_VERBS: &[&str] = &["use", "utilize", "perform", "implement"];

/// Messages longer than this many characters get a `LineTooLong` finding
pub const MAX_MESSAGE_LENGTH: usize = 72;

/// One whole-word, case-insensitive matcher per weak verb, same order as
/// `WEAK_VERBS`. Word boundaries and case folding are ASCII-only.
static WEAK_VERB_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
   WEAK_VERBS
      .iter()
      .map(|&verb| {
         let regex = Regex::new(&format!(r"(?i-u)\b{verb}\b")).expect("weak verb pattern is valid");
         (verb, regex)
      })
      .collect()
});

/// Number of characters (not bytes) in `text`
pub fn char_len(text: &str) -> usize {
   text.chars().count()
}

/// Convert a byte offset on a char boundary into a character offset
fn char_offset(text: &str, byte_offset: usize) -> usize {
   char_len(&text[..byte_offset])
}

/// Check `text` against the template's structural pattern.
///
/// The pattern sees the whole text, embedded newlines included, so a message
/// with a body only matches if the pattern itself allows it. Returns at most
/// one finding.
pub fn validate_pattern(text: &str, template: &Template) -> Vec<Finding> {
   if template.pattern.is_match(text) {
      return Vec::new();
   }

   vec![Finding::new(
      FindingKind::TemplateMismatch,
      format!(
         "Commit message does not follow the {} template: {}",
         template.name, template.description
      ),
      Span::new(0, char_len(text)),
      Severity::Warning,
   )]
}

/// Find every whole-word occurrence of each weak verb.
///
/// Findings are grouped by verb in `WEAK_VERBS` order, and by position within
/// each verb.
pub fn scan_weak_verbs(text: &str) -> Vec<Finding> {
   let mut findings = Vec::new();

   for (verb, regex) in WEAK_VERB_PATTERNS.iter() {
      for m in regex.find_iter(text) {
         let start = char_offset(text, m.start());
         let end = start + char_len(m.as_str());
         findings.push(Finding::new(
            FindingKind::WeakVerb,
            format!("Consider using a stronger verb instead of \"{verb}\""),
            Span::new(start, end),
            Severity::Information,
         ));
      }
   }

   findings
}

/// Flag messages over `MAX_MESSAGE_LENGTH` characters.
///
/// Counts the raw text, body and newlines included, not just the subject line.
pub fn check_length(text: &str) -> Vec<Finding> {
   let len = char_len(text);
   if len <= MAX_MESSAGE_LENGTH {
      return Vec::new();
   }

   vec![Finding::new(
      FindingKind::LineTooLong,
      format!(
         "Commit message is too long. Consider keeping it under {MAX_MESSAGE_LENGTH} characters."
      ),
      Span::new(MAX_MESSAGE_LENGTH, len),
      Severity::Information,
   )]
}

/// Lexical checks: weak verbs first, then length. Template-independent.
pub fn critique(text: &str) -> Vec<Finding> {
   let mut findings = scan_weak_verbs(text);
   findings.extend(check_length(text));
   findings
}

/// First line of `text`, without the line terminator.
///
/// Offsets within the returned slice are valid offsets into `text`.
pub fn subject_line(text: &str) -> &str {
   let line = text.split('\n').next().unwrap_or("");
   line.strip_suffix('\r').unwrap_or(line)
}
