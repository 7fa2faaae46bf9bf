//! Raw records and the upstream sources that produce them.
//!
//! A source is any `Iterator<Item = RawRecord>`. Pulling may block on I/O;
//! `None` means the upstream is exhausted for good. Malformed input is
//! logged and skipped here so a single bad line never ends a stream.

use std::fs;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use serde_json::Value;

use crate::error::{RecordError, Result};
use crate::types::{Bundle, DocumentNode};

/// One upstream record, classified by shape.
#[derive(Clone, Debug, PartialEq)]
pub enum RawRecord {
    /// Already nested `{__data__, __children__}` document.
    Document(DocumentNode),
    /// Python source text.
    Source(String),
    /// Persisted extraction from an earlier `prep` run.
    Bundle(Box<Bundle>),
}

impl RawRecord {
    /// Classify a decoded JSON record.
    ///
    /// Recognised shapes, checked in order: a document (`__data__`), a
    /// wrapped bundle (`files`, as a JSON string or object), a bare bundle
    /// (`call_tree` and `node_set`), then source text under `code` or `text`.
    pub fn from_json(value: Value) -> Result<Self> {
        let Value::Object(object) = &value else {
            return Err(RecordError::invalid("record is not a JSON object"));
        };

        if object.contains_key("__data__") {
            return Ok(RawRecord::Document(serde_json::from_value(value)?));
        }
        if let Some(files) = object.get("files") {
            let bundle: Bundle = match files {
                Value::String(raw) => serde_json::from_str(raw)?,
                other => serde_json::from_value(other.clone())?,
            };
            return Ok(RawRecord::Bundle(Box::new(bundle)));
        }
        if object.contains_key("call_tree") && object.contains_key("node_set") {
            return Ok(RawRecord::Bundle(Box::new(serde_json::from_value(value)?)));
        }
        for key in ["code", "text"] {
            if let Some(text) = object.get(key).and_then(Value::as_str) {
                return Ok(RawRecord::Source(text.to_string()));
            }
        }

        Err(RecordError::invalid(
            "expected one of __data__, files, call_tree/node_set, code or text",
        ))
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        Self::from_json(serde_json::from_str(raw)?)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RawRecord::Document(_) => "document",
            RawRecord::Source(_) => "source",
            RawRecord::Bundle(_) => "bundle",
        }
    }
}

/// Records read one per line from a JSON-lines stream.
pub struct JsonLinesSource<R> {
    reader: R,
    line: usize,
    skipped: usize,
    done: bool,
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            skipped: 0,
            done: false,
        }
    }

    /// Lines that were not valid records.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl<R: BufRead> Iterator for JsonLinesSource<R> {
    type Item = RawRecord;

    fn next(&mut self) -> Option<RawRecord> {
        let mut buf = Vec::new();
        while !self.done {
            buf.clear();
            match self.reader.read_until(b'\n', &mut buf) {
                Ok(0) => self.done = true,
                Ok(_) => {
                    self.line += 1;
                    let line = match std::str::from_utf8(&buf) {
                        Ok(text) => text.trim(),
                        Err(e) => {
                            self.skipped += 1;
                            tracing::warn!(line = self.line, error = %e, "skipping non-UTF-8 line");
                            continue;
                        }
                    };
                    if line.is_empty() {
                        continue;
                    }
                    match RawRecord::from_json_str(line) {
                        Ok(record) => return Some(record),
                        Err(e) => {
                            self.skipped += 1;
                            tracing::warn!(line = self.line, error = %e, "skipping malformed record");
                        }
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!(line = self.line, error = %e, "upstream read failed");
                    self.done = true;
                }
            }
        }
        None
    }
}

/// Source files under a directory, read lazily in path order.
pub struct DirectorySource {
    files: std::vec::IntoIter<PathBuf>,
}

impl DirectorySource {
    /// Walk `root` honouring `.gitignore`, keeping files whose extension is
    /// in `extensions` and skipping paths matched by `ignore_patterns`.
    pub fn new(root: &Path, extensions: &[String], ignore_patterns: &[String]) -> Self {
        let files = discover_files(root, extensions, ignore_patterns);
        tracing::debug!(root = %root.display(), files = files.len(), "discovered source files");
        Self {
            files: files.into_iter(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.files.len()
    }
}

impl Iterator for DirectorySource {
    type Item = RawRecord;

    fn next(&mut self) -> Option<RawRecord> {
        for path in self.files.by_ref() {
            match fs::read_to_string(&path) {
                Ok(text) => return Some(RawRecord::Source(text)),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable file");
                }
            }
        }
        None
    }
}

/// Paths of matching files under `root`, sorted.
pub fn discover_files(root: &Path, extensions: &[String], ignore_patterns: &[String]) -> Vec<PathBuf> {
    let extensions: Vec<String> = extensions
        .iter()
        .map(|e| e.trim_start_matches('.').to_lowercase())
        .collect();

    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(false)
        .git_ignore(true)
        .git_exclude(true)
        .add_custom_ignore_filename(".calltreeignore");

    if !ignore_patterns.is_empty() {
        let mut overrides = ignore::overrides::OverrideBuilder::new(root);
        for pattern in ignore_patterns {
            if let Err(e) = overrides.add(&format!("!{}", pattern)) {
                tracing::warn!(pattern = %pattern, error = %e, "invalid ignore pattern");
            }
        }
        match overrides.build() {
            Ok(overrides) => {
                builder.overrides(overrides);
            }
            Err(e) => tracing::warn!(error = %e, "ignoring ignore patterns"),
        }
    }

    let mut files: Vec<PathBuf> = builder
        .build()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|ft| ft.is_file()).unwrap_or(false))
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .map(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}
