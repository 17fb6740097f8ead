//! Output formatting and styling module.
//!
//! Centralizes console output: colored status lines, the live-mode progress
//! bar, and the shell-style rendering of operations used by dry runs.

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::borrow::Cow;
use std::path::Path;

/// Manages CLI output with consistent styling.
///
/// Status messages go to stdout, errors to stderr. Nothing here is used in
/// dry-run mode, where stdout carries only the rendered commands.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// ```no_run
    /// use rulemove::output::OutputFormatter;
    /// OutputFormatter::success("Moved 12 files");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Creates a progress bar over `total` filesystem operations.
    ///
    /// The bar draws to stderr and stays hidden when stderr is not a terminal.
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        pb.set_style(style);
        pb
    }
}

/// Quotes `input` for a POSIX shell when it contains whitespace or quotes.
///
/// The result is wrapped in single quotes with inner single quotes written as
/// `\'`. Anything else is returned unchanged.
///
/// ```
/// use rulemove::output::shell_escape;
/// assert_eq!(shell_escape("a.jpg"), "a.jpg");
/// assert_eq!(shell_escape("my file.jpg"), "'my file.jpg'");
/// ```
pub fn shell_escape(input: &str) -> Cow<'_, str> {
    if input
        .chars()
        .any(|c| c.is_whitespace() || c == '\'' || c == '"')
    {
        Cow::Owned(format!("'{}'", input.replace('\'', "\\'")))
    } else {
        Cow::Borrowed(input)
    }
}

/// `mkdir <path>`
pub fn render_mkdir(path: &Path) -> String {
    format!("mkdir {}", shell_escape(&path.to_string_lossy()))
}

/// `mv <source> <destination>`
pub fn render_move(source: &Path, destination: &Path) -> String {
    format!(
        "mv {} {}",
        shell_escape(&source.to_string_lossy()),
        shell_escape(&destination.to_string_lossy())
    )
}
