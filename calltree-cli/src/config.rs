//! calltree configuration loading from `.calltreerc.toml`.
//!
//! The file is optional. Missing sections fall back to defaults and a file
//! that fails to parse is reported and ignored.
//!
//! # Example Configuration
//!
//! ```toml
//! [loader]
//! batch_size = 8
//! max_seq_len = 4
//! num_emb_tokens = 1
//! variant = "contrastive"
//! admission = "unvisited"
//!
//! [source]
//! extensions = ["py", "pyi"]
//! ignore = ["migrations/", "*_pb2.py"]
//!
//! [output]
//! format = "json"
//! color = false
//! ```

use calltree_core::LoaderConfig;
use serde::Deserialize;
use std::path::Path;

pub const CONFIG_FILE: &str = ".calltreerc.toml";

/// Root configuration structure loaded from `.calltreerc.toml`.
#[derive(Debug, Deserialize, Default)]
pub struct CalltreeConfig {
    /// Shard construction and pooling options.
    #[serde(default)]
    pub loader: LoaderConfig,

    /// Which files a directory input contributes.
    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub output: OutputSettings,
}

/// File discovery for directory inputs.
#[derive(Debug, Deserialize)]
pub struct SourceConfig {
    /// File extensions to read, without the dot.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Additional glob patterns to skip, on top of `.gitignore`,
    /// `.calltreeignore` and the built-in defaults.
    #[serde(default)]
    pub ignore: Vec<String>,
}

fn default_extensions() -> Vec<String> {
    vec!["py".to_string()]
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            ignore: Vec::new(),
        }
    }
}

/// Output preferences. Command-line flags win.
#[derive(Debug, Deserialize, Default)]
pub struct OutputSettings {
    /// `table` or `json`
    #[serde(default)]
    pub format: Option<String>,

    #[serde(default)]
    pub color: Option<bool>,
}

/// Default ignore patterns that are always included.
const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    ".git/",
    "__pycache__/",
    "*.pyc",
    ".venv/",
    "venv/",
    ".tox/",
    "site-packages/",
];

impl CalltreeConfig {
    /// Load `.calltreerc.toml` from `root`, or defaults.
    ///
    /// Read and parse errors are logged as warnings.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE);
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse {}: {}", CONFIG_FILE, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read {}: {}", CONFIG_FILE, e);
                }
            }
        }
        Self::default()
    }

    /// User patterns first, then any default not already listed.
    pub fn ignore_patterns(&self) -> Vec<String> {
        let mut patterns = self.source.ignore.clone();
        for default in DEFAULT_IGNORE_PATTERNS {
            if !patterns.iter().any(|p| p == default) {
                patterns.push(default.to_string());
            }
        }
        patterns
    }

    pub fn extensions(&self) -> &[String] {
        &self.source.extensions
    }

    pub fn default_format(&self) -> Option<&str> {
        self.output.format.as_deref()
    }

    pub fn use_color(&self) -> Option<bool> {
        self.output.color
    }
}
