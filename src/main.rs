use std::path::{Path, PathBuf};

use arboard::Clipboard;
use clap::Parser;
use commit_mentor::*;
use diagnostics::{LocatedFinding, is_commit_message_file, locate, summarize};
use preferences::{ACTIVE_TEMPLATE_KEY, FEEDBACK_PREFERENCES_KEY};
use rayon::prelude::*;
use serde::Serialize;
use style::icons;
use types::{Args, Command, OutputFormat, PrefsAction};
use validation::subject_line;

/// Message file checked when none is given
const DEFAULT_MESSAGE_FILE: &str = ".git/COMMIT_EDITMSG";

/// Load config from args or default
fn load_config_from_args(args: &Args) -> Result<MentorConfig> {
   if let Some(ref config_path) = args.config {
      MentorConfig::from_file(config_path)
   } else {
      MentorConfig::load()
   }
}

/// Load the state file from `--state` or the default location
fn load_state(state_path: Option<&Path>) -> Result<FilePreferenceStore> {
   match state_path {
      Some(state_path) => FilePreferenceStore::load(state_path),
      None => FilePreferenceStore::load_default(),
   }
}

/// A config that cannot be loaded is reported and replaced by the defaults
fn config_or_default(loaded: Result<MentorConfig>) -> MentorConfig {
   loaded.unwrap_or_else(|e| {
      style::warn(&format!("{e}; using default settings"));
      MentorConfig::default()
   })
}

/// State for commands that only read it. An unreadable state file is
/// reported and treated as empty so validation still runs.
fn readable_state(loaded: Result<FilePreferenceStore>) -> Box<dyn PreferenceStore> {
   match loaded {
      Ok(store) => Box::new(store),
      Err(e) => {
         style::warn(&format!("{e}; ignoring saved template and preferences"));
         Box::new(MemoryPreferenceStore::new())
      },
   }
}

/// Apply per-command CLI overrides to config
fn apply_cli_overrides(config: &mut MentorConfig, model: Option<&str>, temperature: Option<f32>) {
   if let Some(model) = model {
      config.model = model.to_string();
   }
   if let Some(temp) = temperature {
      if (0.0..=1.0).contains(&temp) {
         config.temperature = temp;
      } else {
         style::warn(&format!(
            "Temperature {} out of range [0.0, 1.0], using {}",
            temp, config.temperature
         ));
      }
   }
}

fn unknown_template(name: &str, registry: &TemplateRegistry) -> MentorError {
   MentorError::UnknownTemplate {
      name:      name.to_string(),
      available: registry.names().join(", "),
   }
}

/// Pick the active template: `--template` beats the persisted selection, which
/// beats the configured default. Only an unknown `--template` is an error.
fn resolve_registry(
   cli_template: Option<&str>,
   config: &MentorConfig,
   state: &dyn PreferenceStore,
) -> Result<TemplateRegistry> {
   let registry = TemplateRegistry::new();

   if let Some(name) = cli_template {
      if !registry.set_active(name) {
         return Err(unknown_template(name, &registry));
      }
      return Ok(registry);
   }

   let selected = state
      .get(ACTIVE_TEMPLATE_KEY)
      .unwrap_or_else(|| config.default_template.clone());
   if !registry.set_active(&selected) {
      style::warn(&format!(
         "Unknown template '{selected}', falling back to {}",
         registry.active().name
      ));
   }
   Ok(registry)
}

/// One checked message file
#[derive(Debug)]
struct FileReport {
   path:     PathBuf,
   text:     String,
   findings: Vec<Finding>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
   path:     String,
   findings: Vec<LocatedFinding<'a>>,
}

fn check_file(path: &Path, subject_only: bool, template: &Template) -> Result<FileReport> {
   let raw = std::fs::read_to_string(path).map_err(|e| {
      MentorError::Other(format!("Failed to read commit message {}: {e}", path.display()))
   })?;
   // The subject is a prefix of the raw text, so offsets stay valid either way
   let text = if subject_only {
      subject_line(&raw).to_string()
   } else {
      raw
   };
   let findings = build_diagnostics(&text, template);
   Ok(FileReport { path: path.to_path_buf(), text, findings })
}

fn print_text_report(report: &FileReport) {
   let path = report.path.display().to_string();
   for located in locate(&report.text, &report.findings) {
      println!("{}", style::diagnostic_line(&path, located.start, located.finding));
   }
}

fn run_check(
   files: Vec<PathBuf>,
   all_files: bool,
   subject_only: bool,
   strict: bool,
   format: OutputFormat,
   registry: &TemplateRegistry,
) -> Result<()> {
   let files = if files.is_empty() {
      vec![PathBuf::from(DEFAULT_MESSAGE_FILE)]
   } else {
      files
   };

   let files: Vec<PathBuf> = files
      .into_iter()
      .filter(|path| {
         let keep = all_files || is_commit_message_file(path);
         if !keep {
            style::warn(&format!(
               "Skipping {} (not a COMMIT_EDITMSG file, use --all-files to check it)",
               path.display()
            ));
         }
         keep
      })
      .collect();

   let template = registry.active();
   let reports: Vec<Result<FileReport>> = files
      .par_iter()
      .map(|path| check_file(path, subject_only, template))
      .collect();

   let mut checked = Vec::with_capacity(reports.len());
   let mut failed_reads = 0;
   for report in reports {
      match report {
         Ok(report) => checked.push(report),
         Err(e) => {
            eprintln!("{} {}", style::error(icons::ERROR), style::error(&e.to_string()));
            failed_reads += 1;
         },
      }
   }

   match format {
      OutputFormat::Text => checked.iter().for_each(print_text_report),
      OutputFormat::Json => {
         let json: Vec<JsonReport<'_>> = checked
            .iter()
            .map(|report| JsonReport {
               path:     report.path.display().to_string(),
               findings: locate(&report.text, &report.findings),
            })
            .collect();
         println!("{}", serde_json::to_string_pretty(&json)?);
      },
   }

   let all_findings: Vec<Finding> = checked
      .iter()
      .flat_map(|report| report.findings.iter().cloned())
      .collect();
   let summary = summarize(&all_findings);

   if format == OutputFormat::Text {
      if checked.is_empty() {
         if failed_reads == 0 {
            style::print_info("No commit message files checked");
         }
      } else if summary.is_clean() {
         println!(
            "{} {}",
            style::success(icons::SUCCESS),
            style::success(&format!("Commit message follows {}", template.name))
         );
      } else {
         println!(
            "{} warning(s), {} info finding(s) against {}",
            summary.warnings,
            summary.information,
            style::template_name(&template.name)
         );
      }
   }

   if failed_reads > 0 {
      return Err(MentorError::CheckFailed(format!("{failed_reads} file(s) could not be read")));
   }
   if summary.warnings > 0 || (strict && summary.information > 0) {
      return Err(MentorError::CheckFailed(format!(
         "{} warning(s), {} info finding(s)",
         summary.warnings, summary.information
      )));
   }
   Ok(())
}

fn run_templates(registry: &TemplateRegistry) {
   let active = &registry.active().name;
   println!("{}", style::heading("Commit templates", style::term_width().min(60)));
   for template in registry.list_templates() {
      let marker = if &template.name == active {
         style::success(icons::ARROW)
      } else {
         " ".to_string()
      };
      println!(
         "{marker} {} {}",
         style::template_name(&template.name),
         style::dim(&format!("({})", template.description))
      );
      println!("    {}", style::dim(template.pattern.as_str()));
   }
}

fn run_use(name: &str, registry: &TemplateRegistry, state: &mut FilePreferenceStore) -> Result<()> {
   if !registry.set_active(name) {
      return Err(unknown_template(name, registry));
   }
   state.set(ACTIVE_TEMPLATE_KEY, name.to_string());
   state.save()?;
   println!(
      "{} Commit template changed to {}",
      style::success(icons::SUCCESS),
      style::template_name(name)
   );
   Ok(())
}

fn run_prefs(action: PrefsAction, state: &mut FilePreferenceStore) -> Result<()> {
   match action {
      PrefsAction::Set { text } => {
         let raw = text.join(" ");
         if raw.trim().is_empty() {
            style::warn("No preferences given, nothing stored");
            return Ok(());
         }
         state.set(FEEDBACK_PREFERENCES_KEY, raw);
         state.save()?;
         println!("{} Feedback preferences updated", style::success(icons::SUCCESS));
      },
      PrefsAction::Show => {
         let prefs = Preferences::from_store(&*state);
         if prefs.is_empty() {
            style::print_info("No feedback preferences set");
         } else {
            for constraint in prefs.constraints() {
               println!("{} {constraint}", icons::BULLET);
            }
         }
      },
      PrefsAction::Clear => {
         if state.remove(FEEDBACK_PREFERENCES_KEY).is_some() {
            state.save()?;
         }
         println!("{} Feedback preferences cleared", style::success(icons::SUCCESS));
      },
   }
   Ok(())
}

/// Copy text to clipboard
fn copy_to_clipboard(text: &str) -> Result<()> {
   let mut clipboard = Clipboard::new().map_err(MentorError::ClipboardError)?;
   clipboard
      .set_text(text)
      .map_err(MentorError::ClipboardError)?;
   Ok(())
}

fn run_analyze(
   file: Option<PathBuf>,
   copy: bool,
   registry: &TemplateRegistry,
   state: &dyn PreferenceStore,
   config: &MentorConfig,
) -> Result<()> {
   let path = file.unwrap_or_else(|| PathBuf::from(DEFAULT_MESSAGE_FILE));
   let message = std::fs::read_to_string(&path).map_err(|e| {
      MentorError::Other(format!("Failed to read commit message {}: {e}", path.display()))
   })?;
   let message = message.trim();
   let template = registry.active();

   if let Err(e) = templates::ensure_prompts_dir() {
      style::warn(&format!("Could not set up prompts directory: {e}"));
   }

   let findings = build_diagnostics(message, template);
   let finding_lines: Vec<String> = locate(message, &findings)
      .iter()
      .map(|located| {
         format!(
            "{}:{} {}: {}",
            located.start.line + 1,
            located.start.column + 1,
            located.finding.severity,
            located.finding.message
         )
      })
      .collect();

   let preferences = Preferences::from_store(state);
   let request = api::FeedbackRequest {
      message,
      template,
      preferences: &preferences,
      findings: &finding_lines,
   };

   println!("Using model: {} (temp: {})", config.model, config.temperature);
   let feedback = api::analyze_commit_message(&request, config);

   println!(
      "\n{}",
      style::framed(&format!("{} Commit Analysis", icons::ROBOT), &feedback, style::term_width())
   );

   if copy {
      match copy_to_clipboard(&feedback) {
         Ok(()) => println!("\n{} Copied to clipboard", icons::CLIPBOARD),
         Err(e) => println!("\nNote: Failed to copy to clipboard: {e}"),
      }
   }

   Ok(())
}

fn run(args: Args) -> Result<()> {
   let mut config = config_or_default(load_config_from_args(&args));
   let template = args.template.as_deref();
   let state_path = args.state.as_deref();

   let command = args.command.unwrap_or(Command::Check {
      files:        Vec::new(),
      all_files:    false,
      subject_only: false,
      strict:       false,
      format:       OutputFormat::Text,
   });

   match command {
      Command::Check { files, all_files, subject_only, strict, format } => {
         let state = readable_state(load_state(state_path));
         let registry = resolve_registry(template, &config, &*state)?;
         run_check(files, all_files, subject_only, strict, format, &registry)
      },
      Command::Templates => {
         let state = readable_state(load_state(state_path));
         run_templates(&resolve_registry(template, &config, &*state)?);
         Ok(())
      },
      Command::Use { name } => {
         let mut state = load_state(state_path)?;
         run_use(&name, &TemplateRegistry::new(), &mut state)
      },
      Command::Prefs { action } => run_prefs(action, &mut load_state(state_path)?),
      Command::Analyze { file, model, temperature, copy } => {
         let state = readable_state(load_state(state_path));
         let registry = resolve_registry(template, &config, &*state)?;
         apply_cli_overrides(&mut config, model.as_deref(), temperature);
         if std::env::var("COMMIT_MENTOR_VERBOSE").is_ok() {
            eprintln!("Config: {config:?}");
         }
         run_analyze(file, copy, &registry, &*state, &config)
      },
   }
}

fn main() -> Result<()> {
   dotenvy::dotenv().ok();
   run(Args::parse())
}

#[cfg(test)]
mod tests {
   use super::*;

   // ========== resolve_registry Tests ==========

   #[test]
   fn test_resolve_defaults_to_config() {
      let config = MentorConfig { default_template: "Angular".to_string(), ..Default::default() };
      let state = MemoryPreferenceStore::new();
      let registry = resolve_registry(None, &config, &state).unwrap();
      assert_eq!(registry.active().name, "Angular");
   }

   #[test]
   fn test_resolve_persisted_beats_config() {
      let config = MentorConfig { default_template: "Angular".to_string(), ..Default::default() };
      let mut state = MemoryPreferenceStore::new();
      state.set(ACTIVE_TEMPLATE_KEY, "Conventional Commits".to_string());
      let registry = resolve_registry(None, &config, &state).unwrap();
      assert_eq!(registry.active().name, "Conventional Commits");
   }

   #[test]
   fn test_resolve_cli_beats_persisted() {
      let config = MentorConfig::default();
      let mut state = MemoryPreferenceStore::new();
      state.set(ACTIVE_TEMPLATE_KEY, "Conventional Commits".to_string());
      let registry = resolve_registry(Some("Angular"), &config, &state).unwrap();
      assert_eq!(registry.active().name, "Angular");
   }

   #[test]
   fn test_resolve_unknown_cli_template_errors() {
      let config = MentorConfig::default();
      let state = MemoryPreferenceStore::new();
      let result = resolve_registry(Some("Gitmoji"), &config, &state);
      match result {
         Err(MentorError::UnknownTemplate { name, available }) => {
            assert_eq!(name, "Gitmoji");
            assert_eq!(available, "Conventional Commits, Angular");
         },
         other => panic!("Expected UnknownTemplate, got {other:?}"),
      }
   }

   #[test]
   fn test_resolve_unknown_persisted_falls_back() {
      let config = MentorConfig::default();
      let mut state = MemoryPreferenceStore::new();
      state.set(ACTIVE_TEMPLATE_KEY, "Removed Template".to_string());
      let registry = resolve_registry(None, &config, &state).unwrap();
      assert_eq!(registry.active().name, "Conventional Commits");
   }

   // ========== config and state fallbacks ==========

   #[test]
   fn test_garbage_state_still_checks() {
      let dir = tempfile::tempdir().unwrap();
      let state_path = dir.path().join("state.toml");
      std::fs::write(&state_path, "activeTemplate = [unclosed").unwrap();
      let message = dir.path().join("COMMIT_EDITMSG");
      std::fs::write(&message, "feat(parser): add support for trailing commas").unwrap();

      let state = readable_state(FilePreferenceStore::load(&state_path));
      assert_eq!(state.get(ACTIVE_TEMPLATE_KEY), None);

      let registry = resolve_registry(None, &MentorConfig::default(), &*state).unwrap();
      assert_eq!(registry.active().name, "Conventional Commits");
      assert!(run_check(vec![message], false, false, false, OutputFormat::Text, &registry).is_ok());
   }

   #[test]
   fn test_readable_state_keeps_loaded_values() {
      let dir = tempfile::tempdir().unwrap();
      let state_path = dir.path().join("state.toml");
      std::fs::write(&state_path, "activeTemplate = \"Angular\"\n").unwrap();

      let state = readable_state(FilePreferenceStore::load(&state_path));
      assert_eq!(state.get(ACTIVE_TEMPLATE_KEY).as_deref(), Some("Angular"));
   }

   #[test]
   fn test_garbage_config_falls_back_to_defaults() {
      let dir = tempfile::tempdir().unwrap();
      let path = dir.path().join("config.toml");
      std::fs::write(&path, "max_retries = \"three\"").unwrap();

      let config = config_or_default(MentorConfig::from_file(&path));
      assert_eq!(config.max_retries, MentorConfig::default().max_retries);
      assert_eq!(config.default_template, "Conventional Commits");
   }

   // ========== run Tests ==========

   fn args(dir: &Path, rest: &[&str]) -> Args {
      let config = dir.join("config.toml");
      let state = dir.join("state.toml");
      let mut argv = vec![
         "cmentor".to_string(),
         "--config".to_string(),
         config.display().to_string(),
         "--state".to_string(),
         state.display().to_string(),
      ];
      argv.extend(rest.iter().map(|s| (*s).to_string()));
      Args::parse_from(argv)
   }

   #[test]
   fn test_run_check_survives_garbage_state_and_config() {
      let dir = tempfile::tempdir().unwrap();
      std::fs::write(dir.path().join("state.toml"), "activeTemplate = [unclosed").unwrap();
      std::fs::write(dir.path().join("config.toml"), "max_retries = \"three\"").unwrap();
      let message = dir.path().join("COMMIT_EDITMSG");
      std::fs::write(&message, "feat(parser): add support for trailing commas").unwrap();

      let message = message.display().to_string();
      assert!(run(args(dir.path(), &["check", &message])).is_ok());
   }

   #[test]
   fn test_run_prefs_ignores_template_flag() {
      let dir = tempfile::tempdir().unwrap();
      assert!(run(args(dir.path(), &["--template", "Typo", "prefs", "set", "avoid", "jargon"])).is_ok());
      assert!(run(args(dir.path(), &["--template", "Typo", "prefs", "show"])).is_ok());

      let state = FilePreferenceStore::load(&dir.path().join("state.toml")).unwrap();
      assert_eq!(state.get(FEEDBACK_PREFERENCES_KEY).as_deref(), Some("avoid jargon"));
   }

   #[test]
   fn test_run_check_rejects_unknown_template_flag() {
      let dir = tempfile::tempdir().unwrap();
      let message = dir.path().join("COMMIT_EDITMSG");
      std::fs::write(&message, "feat: add parser").unwrap();

      let message = message.display().to_string();
      let result = run(args(dir.path(), &["--template", "Typo", "check", &message]));
      assert!(matches!(result, Err(MentorError::UnknownTemplate { .. })));
   }

   #[test]
   fn test_run_use_persists_selection() {
      let dir = tempfile::tempdir().unwrap();
      assert!(run(args(dir.path(), &["use", "Angular"])).is_ok());

      let state = FilePreferenceStore::load(&dir.path().join("state.toml")).unwrap();
      assert_eq!(state.get(ACTIVE_TEMPLATE_KEY).as_deref(), Some("Angular"));
      assert!(matches!(
         run(args(dir.path(), &["use", "Gitmoji"])),
         Err(MentorError::UnknownTemplate { .. })
      ));
   }

   // ========== check_file Tests ==========

   #[test]
   fn test_check_file_whole_message() {
      let dir = tempfile::tempdir().unwrap();
      let path = dir.path().join("COMMIT_EDITMSG");
      std::fs::write(&path, "fix: handle eof\n\nUse a guard.\n").unwrap();

      let registry = TemplateRegistry::new();
      let report = check_file(&path, false, registry.active()).unwrap();
      let kinds: Vec<_> = report.findings.iter().map(|f| f.kind).collect();
      assert_eq!(kinds, vec![FindingKind::TemplateMismatch, FindingKind::WeakVerb]);
   }

   #[test]
   fn test_check_file_subject_only() {
      let dir = tempfile::tempdir().unwrap();
      let path = dir.path().join("COMMIT_EDITMSG");
      std::fs::write(&path, "fix: handle eof\n\nUse a guard.\n").unwrap();

      let registry = TemplateRegistry::new();
      let report = check_file(&path, true, registry.active()).unwrap();
      assert!(report.findings.is_empty());
      assert_eq!(report.text, "fix: handle eof");
   }

   #[test]
   fn test_check_file_missing() {
      let registry = TemplateRegistry::new();
      let result = check_file(Path::new("/nonexistent/COMMIT_EDITMSG"), false, registry.active());
      assert!(result.is_err());
   }

   // ========== run_check Tests ==========

   #[test]
   fn test_run_check_clean_passes() {
      let dir = tempfile::tempdir().unwrap();
      let path = dir.path().join("COMMIT_EDITMSG");
      std::fs::write(&path, "feat(parser): add support for trailing commas").unwrap();

      let registry = TemplateRegistry::new();
      assert!(run_check(vec![path], false, false, false, OutputFormat::Text, &registry).is_ok());
   }

   #[test]
   fn test_run_check_info_only_passes_unless_strict() {
      let dir = tempfile::tempdir().unwrap();
      let path = dir.path().join("COMMIT_EDITMSG");
      std::fs::write(&path, "fix: use the cache").unwrap();

      let registry = TemplateRegistry::new();
      assert!(
         run_check(vec![path.clone()], false, false, false, OutputFormat::Json, &registry).is_ok()
      );
      let strict = run_check(vec![path], false, false, true, OutputFormat::Json, &registry);
      assert!(matches!(strict, Err(MentorError::CheckFailed(_))));
   }

   #[test]
   fn test_run_check_mismatch_fails() {
      let dir = tempfile::tempdir().unwrap();
      let path = dir.path().join("COMMIT_EDITMSG");
      std::fs::write(&path, "updated stuff").unwrap();

      let registry = TemplateRegistry::new();
      let result = run_check(vec![path], false, false, false, OutputFormat::Text, &registry);
      assert!(matches!(result, Err(MentorError::CheckFailed(_))));
   }

   #[test]
   fn test_run_check_skips_other_files() {
      let dir = tempfile::tempdir().unwrap();
      let path = dir.path().join("notes.txt");
      std::fs::write(&path, "updated stuff").unwrap();

      let registry = TemplateRegistry::new();
      assert!(
         run_check(vec![path.clone()], false, false, false, OutputFormat::Text, &registry).is_ok()
      );
      assert!(run_check(vec![path], true, false, false, OutputFormat::Text, &registry).is_err());
   }

   // ========== apply_cli_overrides Tests ==========

   #[test]
   fn test_cli_overrides_temperature_range() {
      let mut config = MentorConfig::default();
      apply_cli_overrides(&mut config, Some("local-model"), Some(1.5));
      assert_eq!(config.model, "local-model");
      assert_eq!(config.temperature, MentorConfig::default().temperature);

      apply_cli_overrides(&mut config, None, Some(0.9));
      assert_eq!(config.temperature, 0.9);
   }
}
