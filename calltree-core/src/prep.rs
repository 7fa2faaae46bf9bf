//! Batch preparation of bundles from raw sources.
//!
//! Identical sources are hashed with xxh3 and extracted once. Extraction
//! runs in parallel; results keep the order of first appearance.

use std::collections::HashSet;
use std::time::Instant;

use serde::Serialize;
use xxhash_rust::xxh3::xxh3_64;

use crate::error::RecordError;
use crate::parser::extract_many_parallel;
use crate::types::Bundle;

/// Counters for one preparation run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PrepReport {
    pub sources: usize,
    pub duplicates: usize,
    pub parse_failures: usize,
    pub empty: usize,
    pub bundles: usize,
    pub units: usize,
    pub call_edges: usize,
    pub duration_ms: u64,
}

/// Extract every distinct source into a bundle.
///
/// Sources that fail to parse or define no unit are counted and dropped.
pub fn prepare_bundles(sources: &[String], num_threads: Option<usize>) -> (Vec<Bundle>, PrepReport) {
    let start = Instant::now();
    let mut report = PrepReport {
        sources: sources.len(),
        ..Default::default()
    };

    let mut seen = HashSet::new();
    let unique: Vec<String> = sources
        .iter()
        .filter(|source| seen.insert(xxh3_64(source.as_bytes())))
        .cloned()
        .collect();
    report.duplicates = sources.len() - unique.len();

    let mut bundles = Vec::new();
    for (index, result) in extract_many_parallel(&unique, num_threads).into_iter().enumerate() {
        match result {
            Ok(extraction) if extraction.is_empty() => report.empty += 1,
            Ok(extraction) => {
                report.units += extraction.units.len();
                report.call_edges += extraction.call_graph.edge_count();
                bundles.push(extraction.into_bundle());
            }
            Err(RecordError::ParseFailure { line, message }) => {
                report.parse_failures += 1;
                tracing::debug!(index, line, message = %message, "source does not parse");
            }
            Err(e) => {
                report.parse_failures += 1;
                tracing::debug!(index, error = %e, "extraction failed");
            }
        }
    }

    report.bundles = bundles.len();
    report.duration_ms = start.elapsed().as_millis() as u64;
    tracing::debug!(?report, "prepared bundles");
    (bundles, report)
}
