//! Turning raw records into shards.

use crate::config::LoaderConfig;
use crate::error::{RecordError, Result};
use crate::parser;
use crate::shard::{CallTreeShard, DocumentShard, Shard};
use crate::source::RawRecord;
use crate::tree::CallTreeBuilder;
use crate::types::Bundle;

/// Builds one shard from one record.
///
/// Any `FnMut(RawRecord) -> Result<Box<dyn Shard>>` is a factory.
pub trait ShardFactory {
    fn build(&mut self, record: RawRecord) -> Result<Box<dyn Shard>>;
}

impl<F> ShardFactory for F
where
    F: FnMut(RawRecord) -> Result<Box<dyn Shard>>,
{
    fn build(&mut self, record: RawRecord) -> Result<Box<dyn Shard>> {
        self(record)
    }
}

/// Standard pipeline: documents become [`DocumentShard`]s; source text and
/// bundles become [`CallTreeShard`]s.
#[derive(Clone, Debug, Default)]
pub struct CodeShardFactory {
    config: LoaderConfig,
}

impl CodeShardFactory {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    fn call_tree_shard(&self, bundle: &Bundle) -> Result<Box<dyn Shard>> {
        if bundle.node_set.is_empty() {
            return Err(RecordError::EmptyExtraction);
        }
        let forest = CallTreeBuilder::new(self.config.max_seq_len)
            .with_policy(self.config.admission)
            .build(&bundle.node_set, &bundle.call_tree)?;

        Ok(Box::new(
            CallTreeShard::new(forest)
                .with_variant(self.config.variant)
                .with_emb_tokens(self.config.num_emb_tokens),
        ))
    }
}

impl ShardFactory for CodeShardFactory {
    fn build(&mut self, record: RawRecord) -> Result<Box<dyn Shard>> {
        match record {
            RawRecord::Document(tree) => Ok(Box::new(DocumentShard::from_tree(
                tree,
                self.config.max_seq_len,
            ))),
            RawRecord::Source(text) => {
                let extraction = parser::extract(&text)?;
                if extraction.is_empty() {
                    return Err(RecordError::EmptyExtraction);
                }
                self.call_tree_shard(&extraction.into_bundle())
            }
            RawRecord::Bundle(bundle) => self.call_tree_shard(&bundle),
        }
    }
}
