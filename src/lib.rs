//! Commit message mentoring library
//!
//! The validation engine (`registry`, `validation`, `diagnostics`) is pure and
//! synchronous: feed it message text and a template, get back an ordered list
//! of located findings. The remaining modules are the glue the `cmentor` binary
//! wraps around it (config, preference persistence, remote feedback).
pub mod api;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod preferences;
pub mod registry;
pub mod style;
pub mod templates;
pub mod types;
pub mod validation;

// Re-export commonly used types
pub use config::MentorConfig;
pub use diagnostics::{LineIndex, Position, build_diagnostics};
pub use error::{MentorError, Result};
pub use preferences::{FilePreferenceStore, MemoryPreferenceStore, PreferenceStore, Preferences};
pub use registry::TemplateRegistry;
pub use types::{Finding, FindingKind, Severity, Span, Template, TemplatePattern};
