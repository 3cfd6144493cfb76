//! Terminal output for CLI handlers.
//!
//! Human-readable lines with colored symbols by default, one JSON object per
//! line in `--json` mode (`{"type": ..., "payload": ...}`), and nothing but
//! warnings and errors in `--quiet` mode.

use std::fmt::Display;
use std::io::IsTerminal;
use std::sync::{OnceLock, RwLock};

use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::json;
use tabled::{Table, Tabled};

/// Runtime output configuration shared by CLI handlers.
#[derive(Debug, Clone, Copy)]
pub struct OutputConfig {
    /// Emit machine-readable JSON output instead of human-readable text.
    pub json: bool,
    /// Suppress non-essential output.
    pub quiet: bool,
    /// Verbosity level (0 = normal, 1+ = increasingly verbose).
    pub verbose: u8,
    pub color: bool,
}

impl OutputConfig {
    #[must_use]
    pub const fn new(json: bool, quiet: bool, verbose: u8) -> Self {
        Self {
            json,
            quiet,
            verbose,
            color: true,
        }
    }

    #[must_use]
    pub const fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::new(false, false, 0)
    }
}

static OUTPUT_CONFIG: OnceLock<RwLock<OutputConfig>> = OnceLock::new();

fn config_cell() -> &'static RwLock<OutputConfig> {
    OUTPUT_CONFIG.get_or_init(|| RwLock::new(OutputConfig::default()))
}

fn read_config() -> OutputConfig {
    match config_cell().read() {
        Ok(config) => *config,
        Err(poisoned) => *poisoned.into_inner(),
    }
}

fn write_config(config: OutputConfig) {
    match config_cell().write() {
        Ok(mut current) => *current = config,
        Err(poisoned) => *poisoned.into_inner() = config,
    }
}

fn regular_output_suppressed(config: OutputConfig) -> bool {
    !config.json && config.quiet
}

fn emit_json_line(kind: &str, payload: serde_json::Value) {
    println!(
        "{}",
        json!({
            "type": kind,
            "payload": payload,
        })
    );
}

/// Apply `style` unless colors are disabled.
fn paint(config: OutputConfig, text: &str, style: fn(&str) -> String) -> String {
    if config.color {
        style(text)
    } else {
        text.to_string()
    }
}

/// Apply output settings from global CLI flags.
pub fn configure(config: OutputConfig) {
    write_config(config);
}

/// True when stdout is a terminal and `NO_COLOR` is unset.
#[must_use]
pub fn detect_color() -> bool {
    std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal()
}

#[must_use]
pub fn is_json() -> bool {
    read_config().json
}

/// Return the global verbosity level from `-v` flags.
#[must_use]
pub fn verbosity() -> u8 {
    read_config().verbose
}

/// Print a labeled value.
pub fn field(label: &str, value: impl Display) {
    let config = read_config();
    let value = value.to_string();

    if config.json {
        emit_json_line("field", json!({ "label": label, "value": value }));
        return;
    }
    if regular_output_suppressed(config) {
        return;
    }

    println!(
        "  {:<12} {}",
        paint(config, label, |s| s.dimmed().to_string()),
        value
    );
}

/// Print a success line.
pub fn success(message: &str) {
    let config = read_config();

    if config.json {
        emit_json_line("success", json!({ "message": message }));
        return;
    }
    if regular_output_suppressed(config) {
        return;
    }

    println!("  {} {}", paint(config, "✓", |s| s.green().to_string()), message);
}

/// Print a warning line.
pub fn warning(message: &str) {
    let config = read_config();

    if config.json {
        emit_json_line("warning", json!({ "message": message }));
        return;
    }

    println!("  {} {}", paint(config, "⚠", |s| s.yellow().to_string()), message);
}

/// Print an error line to stderr.
pub fn error(message: &str) {
    let config = read_config();

    if config.json {
        eprintln!(
            "{}",
            json!({
                "type": "error",
                "payload": { "message": message },
            })
        );
        return;
    }

    eprintln!("  {} {}", paint(config, "×", |s| s.red().to_string()), message);
}

/// Print a section header.
pub fn section(title: &str) {
    let config = read_config();

    if config.json {
        emit_json_line("section", json!({ "title": title }));
        return;
    }
    if regular_output_suppressed(config) {
        return;
    }

    println!();
    println!("{}", paint(config, title, |s| s.bold().to_string()));
}

/// Print a timestamped streaming line.
///
/// In JSON mode `payload` is emitted as-is under `kind`.
pub fn event(kind: &str, timestamp: &str, message: &str, payload: serde_json::Value) {
    let config = read_config();

    if config.json {
        emit_json_line(kind, payload);
        return;
    }
    if regular_output_suppressed(config) {
        return;
    }

    println!(
        "  {} {} {}",
        paint(config, timestamp, |s| s.dimmed().to_string()),
        paint(config, kind, |s| s.cyan().to_string()),
        message
    );
}

/// Print a note.
pub fn note(message: &str) {
    let config = read_config();

    if config.json {
        emit_json_line("note", json!({ "message": message }));
        return;
    }
    if regular_output_suppressed(config) {
        return;
    }

    println!("  {}", paint(config, message, |s| s.dimmed().to_string()));
}

/// Print a hint with a "hint:" prefix.
pub fn hint(message: &str) {
    let config = read_config();

    if config.json {
        emit_json_line("hint", json!({ "message": message }));
        return;
    }
    if regular_output_suppressed(config) {
        return;
    }

    println!(
        "  {}: {}",
        paint(config, "hint", |s| s.cyan().dimmed().to_string()),
        paint(config, message, |s| s.dimmed().to_string())
    );
}

/// Emit a single serializable record; JSON mode only.
pub fn record<S: Serialize>(kind: &str, value: &S) {
    if read_config().json {
        emit_json_line(kind, json!(value));
    }
}

/// Print `rows` as a table, or one `row` JSON line per item.
///
/// `records` are the serializable items behind the rows, emitted in JSON mode.
pub fn table<R, S>(rows: Vec<R>, records: &[S])
where
    R: Tabled,
    S: Serialize,
{
    let config = read_config();

    if config.json {
        for record in records {
            emit_json_line("row", json!(record));
        }
        return;
    }
    if regular_output_suppressed(config) {
        return;
    }

    let table = Table::new(rows).to_string();
    for line in table.lines() {
        println!("  {line}");
    }
}

/// Format a value in the color of a good outcome.
pub fn positive(value: impl Display) -> String {
    let value = value.to_string();
    paint(read_config(), &value, |s| s.green().to_string())
}

/// Format a value in the color of a bad outcome.
pub fn negative(value: impl Display) -> String {
    let value = value.to_string();
    paint(read_config(), &value, |s| s.red().to_string())
}

pub fn highlight(value: impl Display) -> String {
    let value = value.to_string();
    paint(read_config(), &value, |s| s.cyan().to_string())
}
