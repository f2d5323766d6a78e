//! What `cmentor` puts on the terminal: diagnostic lines, the template list
//! heading, the framed feedback box and the spinner shown while feedback is
//! requested.
//!
//! Colour is off when `NO_COLOR` is set or stdout cannot show it. Everything
//! except findings and feedback goes to stderr, so piped output stays clean.

use std::{
   io::IsTerminal,
   sync::{
      OnceLock,
      atomic::{AtomicBool, Ordering},
   },
   thread,
   time::Duration,
};

use owo_colors::{OwoColorize, Style};

use crate::{
   diagnostics::Position,
   types::{Finding, Severity},
};

static COLOR_ENABLED: OnceLock<bool> = OnceLock::new();

pub fn colors_enabled() -> bool {
   *COLOR_ENABLED.get_or_init(|| {
      std::env::var_os("NO_COLOR").is_none()
         && supports_color::on(supports_color::Stream::Stdout).is_some_and(|level| level.has_basic)
   })
}

fn paint(s: &str, style: Style) -> String {
   if colors_enabled() {
      s.style(style).to_string()
   } else {
      s.to_string()
   }
}

pub fn success(s: &str) -> String {
   paint(s, Style::new().green().bold())
}

pub fn error(s: &str) -> String {
   paint(s, Style::new().red().bold())
}

pub fn dim(s: &str) -> String {
   paint(s, Style::new().dimmed())
}

pub fn template_name(s: &str) -> String {
   paint(s, Style::new().blue().bold())
}

fn severity_style(severity: Severity) -> Style {
   match severity {
      Severity::Warning => Style::new().yellow(),
      Severity::Information => Style::new().cyan(),
   }
}

/// Warning on stderr, wiping a spinner frame left on the line
pub fn warn(msg: &str) {
   let clear = if std::io::stderr().is_terminal() { "\r\x1b[K" } else { "" };
   eprintln!("{clear}{}", paint(&format!("{} {msg}", icons::WARNING), Style::new().yellow()));
}

pub fn print_info(msg: &str) {
   eprintln!("{} {msg}", paint(icons::INFO, Style::new().cyan()));
}

/// One finding as `path:line:col: severity[kind]: message`, 1-based.
pub fn diagnostic_line(path: &str, start: Position, finding: &Finding) -> String {
   let label = format!("{}[{}]", finding.severity, finding.kind);
   format!(
      "{}:{}:{}: {}: {}",
      dim(path),
      start.line + 1,
      start.column + 1,
      paint(&label, severity_style(finding.severity)),
      finding.message
   )
}

/// Terminal width, capped at 120 columns
pub fn term_width() -> usize {
   terminal_size::terminal_size()
      .map_or(80, |(w, _)| usize::from(w.0))
      .min(120)
}

const HORIZONTAL: &str = "\u{2500}";

/// `──── title ────` spanning roughly `width` columns
pub fn heading(title: &str, width: usize) -> String {
   let side = HORIZONTAL.repeat(width.saturating_sub(title.chars().count() + 2) / 2);
   format!("{} {} {}", dim(&side), paint(title, Style::new().bold()), dim(&side))
}

/// Greedy word wrap. Words longer than `width` get a line of their own.
fn wrap_words(line: &str, width: usize) -> Vec<String> {
   let mut lines: Vec<String> = Vec::new();
   for word in line.split_whitespace() {
      match lines.last_mut() {
         Some(current) if current.chars().count() + 1 + word.chars().count() <= width => {
            current.push(' ');
            current.push_str(word);
         },
         _ => lines.push(word.to_string()),
      }
   }
   if lines.is_empty() {
      lines.push(String::new());
   }
   lines
}

/// Frame `content` in a rounded box `width` columns wide, title in the top
/// border. Blank lines in `content` are kept.
pub fn framed(title: &str, content: &str, width: usize) -> String {
   let inner = width.saturating_sub(4).max(1);
   let top_fill = width.saturating_sub(title.chars().count() + 5);

   let mut out = format!(
      "\u{256D}{HORIZONTAL} {} {}\u{256E}\n",
      paint(title, Style::new().bold()),
      HORIZONTAL.repeat(top_fill)
   );
   for line in content.lines().flat_map(|line| wrap_words(line, inner)) {
      out.push_str(&format!("\u{2502} {line:<inner$} \u{2502}\n"));
   }
   out.push_str(&format!("\u{2570}{}\u{256F}", HORIZONTAL.repeat(width.saturating_sub(2))));
   out
}

pub mod icons {
   pub const SUCCESS: &str = "\u{2713}";
   pub const WARNING: &str = "\u{26A0}";
   pub const ERROR: &str = "\u{2717}";
   pub const INFO: &str = "\u{2139}";
   pub const ARROW: &str = "\u{2192}";
   pub const BULLET: &str = "\u{2022}";
   pub const CLIPBOARD: &str = "\u{1F4CB}";
   pub const ROBOT: &str = "\u{1F916}";
}

const SPINNER_FRAMES: &[char] = &[
   '\u{280B}', '\u{2819}', '\u{2839}', '\u{2838}', '\u{283C}', '\u{2834}', '\u{2826}', '\u{2827}',
   '\u{2807}', '\u{280F}',
];

/// Run `f` behind a stderr spinner, then leave a success or failure mark.
pub fn with_spinner_result<T, E>(message: &str, f: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
   if !colors_enabled() || !std::io::stderr().is_terminal() {
      eprintln!("{message}");
      return f();
   }

   let done = AtomicBool::new(false);
   let result = thread::scope(|scope| {
      scope.spawn(|| {
         for frame in SPINNER_FRAMES.iter().cycle() {
            if done.load(Ordering::Relaxed) {
               break;
            }
            eprint!("\r{} {message}", frame.cyan());
            thread::sleep(Duration::from_millis(80));
         }
      });
      let result = f();
      done.store(true, Ordering::Relaxed);
      result
   });

   let mark = if result.is_ok() {
      icons::SUCCESS.green().to_string()
   } else {
      icons::ERROR.red().to_string()
   };
   eprintln!("\r\x1b[K{mark} {message}");
   result
}
