//! calltree core - call-graph trees and shard iteration for code training data.
//!
//! This crate turns Python source into hierarchies of callable units and
//! serves them lazily, in depth-bounded slices, through a round-robin pool of
//! shards that refills itself from an upstream record source.
//!
//! # Pipeline
//!
//! - **Extraction** ([`parser`]): tree-sitter parse into a unit forest, a call
//!   frequency graph and call-marked bodies
//! - **Tree building** ([`tree`]): breadth-first document decomposition, or
//!   one call tree per unit over a shared [`unit::UnitArena`]
//! - **Shards** ([`shard`]): drainable example sequences per record
//! - **Pool** ([`pool`]): round-robin [`ShardIterator`] with replenishment
//!
//! # Usage
//!
//! ```no_run
//! use calltree_core::{CodeShardFactory, LoaderConfig, RawRecord, ShardIterator};
//!
//! let records = vec![RawRecord::Source("def a():\n    b()\n\ndef b():\n    pass\n".into())];
//! let factory = CodeShardFactory::new(LoaderConfig::default());
//! for example in ShardIterator::init(records.into_iter(), factory, 4) {
//!     println!("{}", serde_json::to_string(&example).unwrap());
//! }
//! ```

pub mod config;
pub mod error;
pub mod factory;
pub mod graph;
pub mod parser;
pub mod pool;
pub mod prep;
pub mod shard;
pub mod source;
pub mod tokens;
pub mod tree;
pub mod types;
pub mod unit;

pub use config::LoaderConfig;
pub use error::{ConfigError, RecordError, Result};
pub use factory::{CodeShardFactory, ShardFactory};
pub use graph::CallGraph;
pub use pool::{PoolPhase, PoolStats, ShardIterator};
pub use shard::{Example, Shard};
pub use source::{DirectorySource, JsonLinesSource, RawRecord};
pub use types::{Bundle, CallableUnit, DocumentNode, NameMap, NodeRecord, UnitKind, UnitPayload};
