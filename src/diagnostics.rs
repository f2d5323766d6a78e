//! Merging validator output into the ordered finding list hosts render.

use std::path::Path;

use serde::Serialize;

use crate::{
   types::{Finding, Severity, Template},
   validation::{critique, validate_pattern},
};

/// Run every check against one text snapshot.
///
/// Order is fixed: template mismatch (if any), weak verbs, then length. An
/// empty result means the message is fully compliant.
pub fn build_diagnostics(text: &str, template: &Template) -> Vec<Finding> {
   let mut findings = validate_pattern(text, template);
   findings.extend(critique(text));
   findings
}

/// Zero-based line/column, both counted in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
   pub line:   usize,
   pub column: usize,
}

/// Maps character offsets to line/column positions for one text snapshot.
///
/// Only `\n` starts a new line; a `\r` before it counts as a column on the
/// previous line.
#[derive(Debug, Clone)]
pub struct LineIndex {
   /// Character offset at which each line starts
   line_starts: Vec<usize>,
   len:         usize,
}

impl LineIndex {
   pub fn new(text: &str) -> Self {
      let mut line_starts = vec![0];
      let mut len = 0;
      for (idx, ch) in text.chars().enumerate() {
         if ch == '\n' {
            line_starts.push(idx + 1);
         }
         len = idx + 1;
      }
      Self { line_starts, len }
   }

   /// Position of a character offset. Offsets past the end clamp to the end.
   pub fn position(&self, offset: usize) -> Position {
      let offset = offset.min(self.len);
      let line = match self.line_starts.binary_search(&offset) {
         Ok(line) => line,
         Err(next) => next - 1,
      };
      Position { line, column: offset - self.line_starts[line] }
   }
}

/// A finding with its span projected to line/column positions
#[derive(Debug, Clone, Serialize)]
pub struct LocatedFinding<'a> {
   #[serde(flatten)]
   pub finding: &'a Finding,
   pub start:   Position,
   pub end:     Position,
}

/// Project every finding's span onto `text`, which must be the snapshot the
/// findings were built from.
pub fn locate<'a>(text: &str, findings: &'a [Finding]) -> Vec<LocatedFinding<'a>> {
   let index = LineIndex::new(text);
   findings
      .iter()
      .map(|finding| LocatedFinding {
         finding,
         start: index.position(finding.span.start),
         end: index.position(finding.span.end),
      })
      .collect()
}

/// Whether `path` is a git commit message buffer (name ends in
/// `COMMIT_EDITMSG`)
pub fn is_commit_message_file(path: &Path) -> bool {
   path.to_string_lossy().ends_with("COMMIT_EDITMSG")
}

/// Per-severity counts for a finding list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiagnosticSummary {
   pub warnings:    usize,
   pub information: usize,
}

impl DiagnosticSummary {
   pub const fn total(&self) -> usize {
      self.warnings + self.information
   }

   pub const fn is_clean(&self) -> bool {
      self.total() == 0
   }
}

pub fn summarize(findings: &[Finding]) -> DiagnosticSummary {
   findings
      .iter()
      .fold(DiagnosticSummary::default(), |mut summary, finding| {
         match finding.severity {
            Severity::Warning => summary.warnings += 1,
            Severity::Information => summary.information += 1,
         }
         summary
      })
}
