//! Output formatting for calltree CLI reports.
//!
//! Reports render as a colored table for humans or as JSON for scripts.
//! Example streams are always JSON Lines and bypass this module.

use clap::ValueEnum;
use serde::Serialize;
use std::io::IsTerminal;
use std::str::FromStr;

mod json;

pub use self::json::JsonOutput;

/// Output format for CLI reports
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format (default)
    #[default]
    Table,
    /// JSON format for machine consumption
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: '{}'", s)),
        }
    }
}

/// Configuration for output rendering
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Disable colored output
    pub no_color: bool,
}

impl OutputConfig {
    /// Colors are disabled when stdout is not a terminal.
    pub fn auto_detect(format: OutputFormat) -> Self {
        Self {
            format,
            no_color: !std::io::stdout().is_terminal(),
        }
    }
}

/// Types that can be displayed as a table or serialized as JSON.
pub trait TableDisplay: Serialize {
    fn to_table(&self) -> String;

    fn render(&self, config: &OutputConfig) -> String {
        match config.format {
            OutputFormat::Table => self.to_table(),
            OutputFormat::Json => JsonOutput::format(self),
        }
    }
}

/// Result wrapper that prints in the selected format
pub struct Output<T> {
    data: T,
    config: OutputConfig,
}

impl<T: TableDisplay> Output<T> {
    pub fn new(data: T, format: OutputFormat) -> Self {
        Self {
            data,
            config: OutputConfig::auto_detect(format),
        }
    }

    /// Render the output to stdout
    pub fn render(&self) -> anyhow::Result<()> {
        if self.config.no_color && self.config.format == OutputFormat::Table {
            colored::control::set_override(false);
        }
        println!("{}", self.data.render(&self.config));
        Ok(())
    }

    #[cfg(test)]
    pub fn render_to_string(&self) -> String {
        self.data.render(&self.config)
    }
}
