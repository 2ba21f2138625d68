//! Severity-tagged console messages.
//!
//! Every user-facing status line goes through [`printc`], which renders
//! `  [INFO]: message` with the tag colored by severity. Color output follows
//! the NO_COLOR standard (https://no-color.org/) and the CLICOLOR conventions:
//!
//! - `NO_COLOR`: if set (to any value), disable colors
//! - `CLICOLOR_FORCE`: if set to non-zero, force colors even when not a TTY
//! - `CLICOLOR`: if set to 0, disable colors
//!
//! Otherwise colors are enabled only when stdout is a terminal.

use colored::{Colorize, control};
use std::fmt;

/// Message severity shown in the `[TAG]` prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Progress,
    Warning,
    Error,
    /// rpm-get could not start; no command ran.
    Fatal,
}

impl Severity {
    pub fn tag(self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Progress => "PROGRESS",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }

    fn colored_tag(self) -> String {
        let tag = self.tag();
        match self {
            Severity::Info => tag.green().to_string(),
            Severity::Progress => tag.blue().to_string(),
            Severity::Warning => tag.yellow().to_string(),
            Severity::Error => tag.red().to_string(),
            Severity::Fatal => tag.truecolor(255, 128, 0).to_string(),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Configure color output from the environment and TTY status.
pub fn init_colors() {
    if std::env::var("NO_COLOR").is_ok() {
        control::set_override(false);
        return;
    }

    if std::env::var("CLICOLOR_FORCE")
        .map(|v| v != "0")
        .unwrap_or(false)
    {
        control::set_override(true);
        return;
    }

    if std::env::var("CLICOLOR").map(|v| v == "0").unwrap_or(false) {
        control::set_override(false);
        return;
    }

    let is_tty = std::io::IsTerminal::is_terminal(&std::io::stdout());
    control::set_override(is_tty);
}

/// Format a message with its severity tag. A leading blank line is added
/// when `new_line` is set.
pub fn format_message(msg: &str, severity: Severity, new_line: bool) -> String {
    let cr = if new_line { "\n" } else { "" };
    format!("{}  [{}]: {}", cr, severity.colored_tag(), msg)
}

/// Print a severity-tagged message. Errors and fatals go to stderr.
pub fn printc(msg: impl AsRef<str>, severity: Severity, new_line: bool) {
    let line = format_message(msg.as_ref(), severity, new_line);
    match severity {
        Severity::Error | Severity::Fatal => eprintln!("{}", line),
        _ => println!("{}", line),
    }
}

pub fn info(msg: impl AsRef<str>) {
    printc(msg, Severity::Info, false);
}

pub fn warn(msg: impl AsRef<str>) {
    printc(msg, Severity::Warning, false);
}

pub fn error(msg: impl AsRef<str>) {
    printc(msg, Severity::Error, false);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_message_plain() {
        control::set_override(false);
        assert_eq!(
            format_message("Cache cleared", Severity::Info, false),
            "  [INFO]: Cache cleared"
        );
        assert_eq!(
            format_message("Deleting cache file...", Severity::Warning, true),
            "\n  [WARNING]: Deleting cache file..."
        );
        control::unset_override();
    }

    #[test]
    fn test_severity_tags() {
        assert_eq!(Severity::Progress.to_string(), "PROGRESS");
        assert_eq!(Severity::Fatal.tag(), "FATAL");
    }
}
