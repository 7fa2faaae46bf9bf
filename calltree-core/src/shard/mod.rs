//! Shards: drainable sequences of training examples over one record.
//!
//! A shard keeps its full node list and a working subset selected by
//! [`Shard::init_depth`]. Pulling drains the working subset; once it is empty
//! the shard yields `None` until the next `init_depth`.

use serde::{Deserialize, Serialize};

pub mod call_tree;
pub mod document;

pub use call_tree::{CallTreeShard, ShardVariant};
pub use document::{flatten_payload, DocumentShard, FlattenMode, Flattener};

/// A drainable, depth-filterable source of examples.
pub trait Shard: Iterator<Item = Example> {
    /// Restrict the working subset to nodes at depth `<= depth`.
    ///
    /// Returns `false` when the shard cannot honour the cutoff; the shard is
    /// then left unchanged.
    fn init_depth(&mut self, depth: usize) -> bool;

    /// Examples left in the working subset.
    fn remaining(&self) -> usize;

    /// Nodes in the full list.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deepest node depth in the shard.
    fn max_depth(&self) -> usize;
}

/// Identity of the unit an example was rendered for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootInfo {
    pub name: String,
    pub depth: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallTreeInput {
    pub text: String,
    pub node_content: String,
}

/// Example for next-unit prediction with child context.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallTreeExample {
    pub target: String,
    pub input: CallTreeInput,
    pub root: RootInfo,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContrastiveInput {
    pub text: String,
    pub nodes: Vec<String>,
    pub contrastive: String,
}

/// Example pairing a unit's source with its callees' signatures.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContrastiveExample {
    pub input: ContrastiveInput,
    pub root: RootInfo,
}

/// Example for one node of a document tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentExample {
    pub depth: usize,
    /// Tagged fragment per node of the capped subtree.
    pub sub_node_content: Vec<String>,
    /// The node's raw payload.
    pub local_node_content: serde_json::Value,
    /// Total characters across all fragments.
    pub length: usize,
    pub node_seq: Vec<usize>,
    pub node_number: usize,
}

/// Any rendered example; serialises to the variant's own shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Example {
    CallTree(CallTreeExample),
    Contrastive(ContrastiveExample),
    Document(DocumentExample),
}

impl Example {
    pub fn depth(&self) -> usize {
        match self {
            Example::CallTree(e) => e.root.depth,
            Example::Contrastive(e) => e.root.depth,
            Example::Document(e) => e.depth,
        }
    }

    /// Unit name for call-tree examples.
    pub fn root_name(&self) -> Option<&str> {
        match self {
            Example::CallTree(e) => Some(&e.root.name),
            Example::Contrastive(e) => Some(&e.root.name),
            Example::Document(_) => None,
        }
    }
}
