//! Command implementations for calltree CLI
//!
//! Each command module provides a `run` function that executes the command logic.

pub mod inspect;
pub mod prep;
pub mod stream;

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner on stderr, hidden when `quiet`.
pub(crate) fn spinner(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
