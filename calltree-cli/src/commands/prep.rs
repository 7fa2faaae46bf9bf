//! Prep command - Extract bundles from a source tree
//!
//! Walks a directory (or reads one file), extracts every distinct Python
//! source into a bundle and writes the bundles as JSON Lines.

use crate::config::CalltreeConfig;
use crate::output::{JsonOutput, Output, OutputFormat, TableDisplay};
use anyhow::{Context, Result};
use calltree_core::prep::{prepare_bundles, PrepReport};
use calltree_core::source::discover_files;
use colored::Colorize;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Outcome of one prep run.
#[derive(Debug, Serialize)]
pub struct PrepResult {
    pub root: String,
    pub output: String,
    pub files_read: usize,
    pub unreadable: usize,
    #[serde(flatten)]
    pub report: PrepReport,
}

impl TableDisplay for PrepResult {
    fn to_table(&self) -> String {
        let r = &self.report;
        let mut out = String::new();
        out.push_str(&format!("{} {}\n", "Prepared".green().bold(), self.root.bold()));
        out.push_str(&format!("  {:<16} {}\n", "Output:".cyan(), self.output));
        out.push_str(&format!("  {:<16} {}\n", "Files read:".cyan(), self.files_read));
        if self.unreadable > 0 {
            out.push_str(&format!("  {:<16} {}\n", "Unreadable:".yellow(), self.unreadable));
        }
        out.push_str(&format!("  {:<16} {}\n", "Duplicates:".cyan(), r.duplicates));
        if r.parse_failures > 0 {
            out.push_str(&format!("  {:<16} {}\n", "Parse failures:".yellow(), r.parse_failures));
        }
        out.push_str(&format!("  {:<16} {}\n", "No units:".cyan(), r.empty));
        out.push_str(&format!("  {:<16} {}\n", "Bundles:".cyan(), r.bundles));
        out.push_str(&format!("  {:<16} {}\n", "Units:".cyan(), r.units));
        out.push_str(&format!("  {:<16} {}\n", "Call edges:".cyan(), r.call_edges));
        out.push_str(&format!("  {:<16} {}ms", "Duration:".cyan(), r.duration_ms));
        out
    }
}

fn collect_paths(root: &Path, config: &CalltreeConfig) -> Vec<PathBuf> {
    if root.is_file() {
        vec![root.to_path_buf()]
    } else {
        discover_files(root, config.extensions(), &config.ignore_patterns())
    }
}

/// Run the prep command.
///
/// Bundles go to `output`, or to stdout when no output file is given; the
/// summary is only printed in the former case.
pub fn run(
    path: &str,
    output: Option<&str>,
    threads: Option<usize>,
    config: &CalltreeConfig,
    quiet: bool,
    format: OutputFormat,
) -> Result<()> {
    let root = Path::new(path);
    if !root.exists() {
        anyhow::bail!("Path does not exist: {}", path);
    }

    let spinner = super::spinner(quiet || output.is_none());
    spinner.set_message("Scanning sources...");
    let paths = collect_paths(root, config);

    spinner.set_message(format!("Reading {} files...", paths.len()));
    let mut sources = Vec::with_capacity(paths.len());
    let mut unreadable = 0;
    for file in &paths {
        match std::fs::read_to_string(file) {
            Ok(text) => sources.push(text),
            Err(e) => {
                unreadable += 1;
                tracing::warn!(path = %file.display(), error = %e, "skipping unreadable file");
            }
        }
    }

    spinner.set_message(format!("Extracting {} sources...", sources.len()));
    let (bundles, report) = prepare_bundles(&sources, threads);

    spinner.set_message("Writing bundles...");
    let mut writer: Box<dyn Write> = match output {
        Some(file) => Box::new(BufWriter::new(
            File::create(file).with_context(|| format!("Failed to create {}", file))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    for bundle in &bundles {
        if let Some(line) = JsonOutput::format_line(bundle) {
            writeln!(writer, "{}", line)?;
        }
    }
    writer.flush()?;
    spinner.finish_and_clear();

    tracing::info!(
        files = paths.len(),
        bundles = report.bundles,
        parse_failures = report.parse_failures,
        "prep finished"
    );

    if let Some(file) = output {
        let result = PrepResult {
            root: path.to_string(),
            output: file.to_string(),
            files_read: sources.len(),
            unreadable,
            report,
        };
        Output::new(result, format).render()?;
    }
    Ok(())
}
