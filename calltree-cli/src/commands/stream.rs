//! Stream command - Serve training examples from a shard pool
//!
//! Records come from a JSON Lines file, stdin (`-`), a single source file
//! or a directory of sources. Examples are written as JSON Lines.

use crate::config::CalltreeConfig;
use crate::output::{JsonOutput, Output, OutputFormat, TableDisplay};
use anyhow::{Context, Result};
use calltree_core::{
    CodeShardFactory, DirectorySource, Example, JsonLinesSource, LoaderConfig, PoolStats, RawRecord,
    ShardIterator,
};
use colored::Colorize;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

/// Extensions read as record streams rather than as source text.
const RECORD_EXTENSIONS: &[&str] = &["jsonl", "ndjson", "json"];

/// Summary printed after a stream run written to a file.
#[derive(Debug, Serialize)]
pub struct StreamResult {
    pub input: String,
    pub output: String,
    pub examples: usize,
    pub limited: bool,
    pub pool: PoolStats,
}

impl TableDisplay for StreamResult {
    fn to_table(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "{} {} examples from {}\n",
            "Streamed".green().bold(),
            self.examples.to_string().bold(),
            self.input
        ));
        out.push_str(&format!("  {:<14} {}\n", "Output:".cyan(), self.output));
        out.push_str(&format!("  {:<14} {}\n", "Shards:".cyan(), self.pool.admitted));
        if self.pool.skipped > 0 {
            out.push_str(&format!("  {:<14} {}\n", "Skipped:".yellow(), self.pool.skipped));
        }
        out.push_str(&format!("  {:<14} {}\n", "Exhausted:".cyan(), self.pool.exhausted));
        out.push_str(&format!("  {:<14} {:?}", "Phase:".cyan(), self.pool.phase));
        if self.limited {
            out.push_str(&format!(" {}", "(limit reached)".dimmed()));
        }
        out
    }
}

/// Command-line overrides applied on top of the `[loader]` section.
#[derive(Debug, Default)]
pub struct LoaderOverrides {
    pub batch_size: Option<usize>,
    pub max_seq_len: Option<usize>,
    pub num_emb_tokens: Option<usize>,
    pub max_depth: Option<usize>,
    pub contrastive: bool,
    pub unvisited: bool,
}

impl LoaderOverrides {
    pub fn apply(&self, mut loader: LoaderConfig) -> LoaderConfig {
        if let Some(batch_size) = self.batch_size {
            loader.batch_size = batch_size;
        }
        if let Some(max_seq_len) = self.max_seq_len {
            loader.max_seq_len = max_seq_len;
        }
        if let Some(num_emb_tokens) = self.num_emb_tokens {
            loader.num_emb_tokens = num_emb_tokens;
        }
        if self.max_depth.is_some() {
            loader.max_depth = self.max_depth;
        }
        if self.contrastive {
            loader.variant = calltree_core::shard::ShardVariant::Contrastive;
        }
        if self.unvisited {
            loader.admission = calltree_core::tree::AdmissionPolicy::Unvisited;
        }
        loader
    }
}

type Upstream = Box<dyn Iterator<Item = RawRecord>>;

fn open_upstream(input: &str, config: &CalltreeConfig) -> Result<Upstream> {
    if input == "-" {
        return Ok(Box::new(JsonLinesSource::new(BufReader::new(io::stdin()))));
    }

    let path = Path::new(input);
    if path.is_dir() {
        return Ok(Box::new(DirectorySource::new(
            path,
            config.extensions(),
            &config.ignore_patterns(),
        )));
    }

    let is_records = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| RECORD_EXTENSIONS.iter().any(|x| x.eq_ignore_ascii_case(e)))
        .unwrap_or(false);

    if is_records {
        let file = File::open(path).with_context(|| format!("Failed to open {}", input))?;
        Ok(Box::new(JsonLinesSource::new(BufReader::new(file))))
    } else {
        let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", input))?;
        Ok(Box::new(std::iter::once(RawRecord::Source(text))))
    }
}

/// Write examples as JSON Lines until `limit` lines are out or the
/// examples run dry. Returns the count and whether the limit stopped it.
fn write_examples<I>(examples: I, writer: &mut dyn Write, limit: Option<usize>) -> Result<(usize, bool)>
where
    I: Iterator<Item = Example>,
{
    let mut written = 0;
    let mut examples = examples;
    loop {
        if limit.is_some_and(|limit| written >= limit) {
            return Ok((written, true));
        }
        let Some(example) = examples.next() else {
            return Ok((written, false));
        };
        if let Some(line) = JsonOutput::format_line(&example) {
            writeln!(writer, "{}", line)?;
            written += 1;
        }
    }
}

/// Run the stream command.
pub fn run(
    input: &str,
    output: Option<&str>,
    limit: Option<usize>,
    overrides: &LoaderOverrides,
    config: &CalltreeConfig,
    format: OutputFormat,
) -> Result<()> {
    let loader = overrides.apply(config.loader.clone());
    loader.validate()?;

    let upstream = open_upstream(input, config)?;
    let factory = CodeShardFactory::new(loader.clone());
    let mut pool = ShardIterator::new(upstream, factory, loader.batch_size);
    if let Some(depth) = loader.max_depth {
        pool = pool.with_max_depth(depth);
    }

    let mut writer: Box<dyn Write> = match output {
        Some(file) => Box::new(BufWriter::new(
            File::create(file).with_context(|| format!("Failed to create {}", file))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let (examples, limited) = write_examples(pool.by_ref(), &mut writer, limit)?;
    writer.flush()?;

    let stats = pool.stats();
    tracing::info!(examples, skipped = stats.skipped, phase = ?stats.phase, "stream finished");

    if let Some(file) = output {
        let result = StreamResult {
            input: input.to_string(),
            output: file.to_string(),
            examples,
            limited,
            pool: stats,
        };
        Output::new(result, format).render()?;
    }
    Ok(())
}
