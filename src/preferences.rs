//! Key/value store for user-supplied feedback preferences and CLI state.
//!
//! Values are opaque text: nothing here validates or interprets them. The
//! comma split in [`Preferences::constraints`] is for display only.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::error::{MentorError, Result};

/// Key holding the free-text feedback preferences
pub const FEEDBACK_PREFERENCES_KEY: &str = "feedbackPreferences";

/// Key holding the persisted active template name
pub const ACTIVE_TEMPLATE_KEY: &str = "activeTemplate";

/// Last-write-wins string store keyed by a caller-chosen namespace
pub trait PreferenceStore {
   fn get(&self, key: &str) -> Option<String>;
   fn set(&mut self, key: &str, value: String);
   fn remove(&mut self, key: &str) -> Option<String>;
}

/// Process-lifetime store
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferenceStore {
   entries: IndexMap<String, String>,
}

impl MemoryPreferenceStore {
   pub fn new() -> Self {
      Self::default()
   }
}

impl PreferenceStore for MemoryPreferenceStore {
   fn get(&self, key: &str) -> Option<String> {
      self.entries.get(key).cloned()
   }

   fn set(&mut self, key: &str, value: String) {
      self.entries.insert(key.to_string(), value);
   }

   fn remove(&mut self, key: &str) -> Option<String> {
      self.entries.shift_remove(key)
   }
}

/// Store persisted as a flat TOML table. Changes stay in memory until
/// [`FilePreferenceStore::save`] is called.
#[derive(Debug, Clone)]
pub struct FilePreferenceStore {
   path:    PathBuf,
   entries: IndexMap<String, String>,
}

impl FilePreferenceStore {
   /// Load from the default location (`COMMIT_MENTOR_STATE` or
   /// ~/.config/commit-mentor/state.toml)
   pub fn load_default() -> Result<Self> {
      Self::load(&Self::default_path()?)
   }

   /// Load from `path`. A missing file yields an empty store bound to `path`.
   pub fn load(path: &Path) -> Result<Self> {
      let entries = if path.exists() {
         let contents = std::fs::read_to_string(path).map_err(|e| {
            MentorError::Other(format!("Failed to read state file {}: {e}", path.display()))
         })?;
         toml::from_str(&contents)?
      } else {
         IndexMap::new()
      };

      Ok(Self { path: path.to_path_buf(), entries })
   }

   /// Write all entries back to the bound path, creating parent directories
   pub fn save(&self) -> Result<()> {
      if let Some(parent) = self.path.parent()
         && !parent.as_os_str().is_empty()
      {
         std::fs::create_dir_all(parent).map_err(|e| {
            MentorError::Other(format!("Failed to create directory {}: {e}", parent.display()))
         })?;
      }
      let contents = toml::to_string(&self.entries)?;
      std::fs::write(&self.path, contents).map_err(|e| {
         MentorError::Other(format!("Failed to write state file {}: {e}", self.path.display()))
      })?;
      Ok(())
   }

   pub fn path(&self) -> &Path {
      &self.path
   }

   /// Default state path (platform-safe)
   pub fn default_path() -> Result<PathBuf> {
      if let Ok(custom_path) = std::env::var("COMMIT_MENTOR_STATE") {
         return Ok(PathBuf::from(custom_path));
      }

      std::env::var("HOME")
         .or_else(|_| std::env::var("USERPROFILE"))
         .map(|home| PathBuf::from(home).join(".config/commit-mentor/state.toml"))
         .map_err(|_| {
            MentorError::Other("No home directory found (tried HOME and USERPROFILE)".to_string())
         })
   }
}

impl PreferenceStore for FilePreferenceStore {
   fn get(&self, key: &str) -> Option<String> {
      self.entries.get(key).cloned()
   }

   fn set(&mut self, key: &str, value: String) {
      self.entries.insert(key.to_string(), value);
   }

   fn remove(&mut self, key: &str) -> Option<String> {
      self.entries.shift_remove(key)
   }
}

/// User-specified feedback constraints, as typed (comma-separated)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preferences {
   pub raw: String,
}

impl Preferences {
   pub fn new(raw: impl Into<String>) -> Self {
      Self { raw: raw.into() }
   }

   /// Read the feedback preferences from `store`; absent means empty
   pub fn from_store(store: &dyn PreferenceStore) -> Self {
      Self { raw: store.get(FEEDBACK_PREFERENCES_KEY).unwrap_or_default() }
   }

   pub fn is_empty(&self) -> bool {
      self.raw.trim().is_empty()
   }

   /// Individual constraints for listing: split on commas, trimmed, blanks
   /// dropped. Prompts get `raw` instead.
   pub fn constraints(&self) -> Vec<&str> {
      self
         .raw
         .split(',')
         .map(str::trim)
         .filter(|s| !s.is_empty())
         .collect()
   }
}
