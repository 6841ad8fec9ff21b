//! # Output Configuration
//!
//! Controls how the CLI presents plans and publish results: whether status
//! markers are emoji or plain bracketed tags, and whether text is colored.
//!
//! The decision follows the usual conventions:
//! - `--color=never|always|auto` - CLI flag for color control
//! - `NO_COLOR` - Disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - Disables colors
//! - `CLICOLOR_FORCE=1` - Forces colors even in non-TTY
//! - `TERM=dumb` - Disables colors for dumb terminals

use std::env;

use console::style;

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Build from the value of the `--color` flag (`always`, `never`, `auto`).
    ///
    /// `always` overrides `NO_COLOR`; `auto` inspects the environment and
    /// whether stdout is a terminal.
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    fn detect_color_support() -> bool {
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        console::Term::stdout().features().colors_supported()
    }

    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Kind of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Warn,
    Fail,
    Info,
}

impl Status {
    /// Marker printed in front of a status line.
    pub fn marker(self, config: &OutputConfig) -> &'static str {
        match (self, config.use_color) {
            (Status::Ok, true) => "✅",
            (Status::Warn, true) => "⚠️ ",
            (Status::Fail, true) => "❌",
            (Status::Info, true) => "📦",
            (Status::Ok, false) => "[OK]",
            (Status::Warn, false) => "[WARN]",
            (Status::Fail, false) => "[FAIL]",
            (Status::Info, false) => "[INFO]",
        }
    }
}

/// A marker followed by `message`, colored by status when enabled.
pub fn status_line(config: &OutputConfig, status: Status, message: &str) -> String {
    let marker = status.marker(config);
    if !config.use_color {
        return format!("{} {}", marker, message);
    }
    let styled = match status {
        Status::Ok => style(message).green(),
        Status::Warn => style(message).yellow(),
        Status::Fail => style(message).red().bold(),
        Status::Info => style(message).cyan(),
    };
    format!("{} {}", marker, styled.force_styling(true))
}
