//! calltree CLI - Call-tree training data from Python sources
//!
//! Extracts callable units and call graphs, then streams depth-bounded
//! examples through a round-robin shard pool.

use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;

use commands::stream::LoaderOverrides;
use config::CalltreeConfig;
use output::OutputFormat;

/// Call-tree training data from Python sources.
#[derive(Parser)]
#[command(name = "calltree")]
#[command(author, version)]
#[command(about = "Call-tree training data from Python sources")]
#[command(propagate_version = true)]
#[command(after_help = "Examples:
  calltree prep src/ -o bundles.jsonl     Extract bundles from a source tree
  calltree stream bundles.jsonl --limit 100
  calltree stream src/ --max-depth 1      Stream straight from sources
  calltree inspect src/app.py --bodies    Show units and call markers")]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format for reports (overrides config default)
    #[arg(long, global = true, value_enum)]
    format: Option<OutputFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract call-graph bundles from Python sources into JSON Lines
    Prep {
        /// File or directory to read
        #[arg(default_value = ".")]
        path: String,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<String>,

        /// Worker threads for extraction (default: all cores)
        #[arg(short = 'j', long)]
        threads: Option<usize>,
    },

    /// Stream training examples from bundles, documents or sources
    Stream {
        /// JSON Lines file, `-` for stdin, a Python file or a directory
        input: String,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<String>,

        /// Stop after this many examples
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Number of shards drained round-robin
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Traversal cap for subtrees and call-tree descent
        #[arg(long)]
        max_seq_len: Option<usize>,

        /// `<emb>` placeholders appended to each child
        #[arg(long)]
        num_emb_tokens: Option<usize>,

        /// Serve only nodes at most this deep (root is depth 0)
        #[arg(short = 'd', long)]
        max_depth: Option<usize>,

        /// Emit contrastive examples instead of call-tree examples
        #[arg(long)]
        contrastive: bool,

        /// Expand callees not yet visited in the same tree
        #[arg(long)]
        unvisited: bool,
    },

    /// Show units, parameters and calls found in one Python file
    Inspect {
        /// Python source file
        file: String,

        /// Include call-marked bodies
        #[arg(long)]
        bodies: bool,
    },
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    // Load configuration from .calltreerc.toml
    let config = CalltreeConfig::load(std::path::Path::new("."));

    // Resolve output format: CLI flag > config default > Table
    let format = cli.format.unwrap_or_else(|| {
        config
            .default_format()
            .and_then(|f| f.parse().ok())
            .unwrap_or(OutputFormat::Table)
    });

    if let Some(use_color) = config.use_color() {
        colored::control::set_override(use_color);
    }

    let command = match cli.command {
        Some(cmd) => cmd,
        None => {
            Cli::command().print_help()?;
            return Ok(());
        }
    };

    match command {
        Commands::Prep {
            path,
            output,
            threads,
        } => commands::prep::run(&path, output.as_deref(), threads, &config, cli.quiet, format),
        Commands::Stream {
            input,
            output,
            limit,
            batch_size,
            max_seq_len,
            num_emb_tokens,
            max_depth,
            contrastive,
            unvisited,
        } => {
            let overrides = LoaderOverrides {
                batch_size,
                max_seq_len,
                num_emb_tokens,
                max_depth,
                contrastive,
                unvisited,
            };
            commands::stream::run(&input, output.as_deref(), limit, &overrides, &config, format)
        }
        Commands::Inspect { file, bodies } => commands::inspect::run(&file, bodies, format),
    }
}
