//! Source parsing into callable units.
//!
//! Only Python is supported. [`python::extract`] turns one source file into
//! an [`Extraction`](python::Extraction); [`extract_many_parallel`] runs it
//! over a batch of independent sources with rayon.

use rayon::prelude::*;

use crate::error::Result;

pub mod python;

mod helpers;

pub use python::{callee_key, extract, Extraction};

/// Extract many sources in parallel.
///
/// Results keep the input order. The thread count defaults to rayon's global
/// pool; pass `Some(n)` to use a dedicated pool of `n` threads.
pub fn extract_many_parallel(
    sources: &[String],
    num_threads: Option<usize>,
) -> Vec<Result<Extraction>> {
    // Configure thread pool if specified
    let pool = match num_threads {
        Some(n) if n > 0 => rayon::ThreadPoolBuilder::new().num_threads(n).build().ok(),
        _ => None,
    };

    let extract_fn = |source: &String| extract(source);

    match pool {
        Some(pool) => pool.install(|| sources.par_iter().map(extract_fn).collect()),
        None => sources.par_iter().map(extract_fn).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parallel_keeps_order() {
        let sources = vec![
            "def a():\n    pass\n".to_string(),
            "def (:\n".to_string(),
            "def c():\n    pass\n".to_string(),
        ];
        let results = extract_many_parallel(&sources, Some(2));
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().units[0].name.as_deref(), Some("a"));
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap().units[0].name.as_deref(), Some("c"));
    }
}
