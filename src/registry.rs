//! Built-in commit templates and the active selection.

use parking_lot::RwLock;

use crate::types::Template;

/// Built-in templates as `(name, description, pattern)`, in presentation order.
/// The first entry is the default active template.
pub const BUILTIN_TEMPLATES: &[(&str, &str, &str)] = &[
   (
      "Conventional Commits",
      "type(scope): subject",
      r"^(feat|fix|docs|style|refactor|test|chore)(\([a-z ]+\))?: .{1,50}$",
   ),
   (
      "Angular",
      "type(scope): subject",
      r"^(build|ci|docs|feat|fix|perf|refactor|style|test)(\([a-z ]+\))?: .{1,50}$",
   ),
];

/// Ordered set of known templates plus the currently active one.
///
/// The active index is the only mutable state; it sits behind a lock so the
/// registry can be shared between threads running validation passes.
#[derive(Debug)]
pub struct TemplateRegistry {
   templates: Vec<Template>,
   active:    RwLock<usize>,
}

impl Default for TemplateRegistry {
   fn default() -> Self {
      Self::new()
   }
}

impl TemplateRegistry {
   /// Registry seeded with the built-in templates, first one active
   pub fn new() -> Self {
      let templates = BUILTIN_TEMPLATES
         .iter()
         .map(|(name, description, pattern)| {
            Template::new(*name, *description, pattern).expect("built-in template pattern is valid")
         })
         .collect();
      Self { templates, active: RwLock::new(0) }
   }

   /// Seeded registry with `name` selected if it exists, otherwise the default
   pub fn with_active(name: &str) -> Self {
      let registry = Self::new();
      registry.set_active(name);
      registry
   }

   /// All templates in stable presentation order
   pub fn list_templates(&self) -> &[Template] {
      &self.templates
   }

   /// Look up a template by exact name
   pub fn find(&self, name: &str) -> Option<&Template> {
      self.templates.iter().find(|t| t.name == name)
   }

   /// Currently active template
   pub fn active(&self) -> &Template {
      let idx = *self.active.read();
      // Index only ever comes from a position in `templates`
      &self.templates[idx]
   }

   /// Select the template named `name` (case-sensitive exact match).
   ///
   /// Unknown names leave the current selection untouched and return `false`.
   pub fn set_active(&self, name: &str) -> bool {
      match self.templates.iter().position(|t| t.name == name) {
         Some(idx) => {
            *self.active.write() = idx;
            true
         },
         None => false,
      }
   }

   /// Names of all templates, in order
   pub fn names(&self) -> Vec<&str> {
      self.templates.iter().map(|t| t.name.as_str()).collect()
   }
}
