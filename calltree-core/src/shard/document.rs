//! Shards over breadth-first decomposed documents.

use std::fmt;

use serde_json::Value;

use super::{DocumentExample, Example, Shard};
use crate::tree::{decompose, BfsDecomposition};
use crate::types::DocumentNode;

/// How much of a payload a fragment shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlattenMode {
    /// Signature and body; used for the example's own node.
    Full,
    /// Signature only; used for the surrounding nodes.
    Short,
}

/// Renders one payload as fragment text.
pub type Flattener = fn(&Value, FlattenMode) -> String;

/// Default payload rendering.
///
/// Unit payloads become `name|p1, p2`, followed by ` Body:{body}` in full
/// mode. Strings render verbatim; anything else as compact JSON.
pub fn flatten_payload(payload: &Value, mode: FlattenMode) -> String {
    let object = match payload {
        Value::String(s) => return s.clone(),
        Value::Object(object) => object,
        other => return other.to_string(),
    };
    let Some(name) = object.get("name").and_then(Value::as_str) else {
        return payload.to_string();
    };

    let mut out = name.to_string();
    if let Some(params) = object.get("params").and_then(Value::as_array) {
        let params: Vec<&str> = params.iter().filter_map(Value::as_str).collect();
        out.push('|');
        out.push_str(&params.join(", "));
    }
    if mode == FlattenMode::Full {
        if let Some(body) = object.get("body").and_then(Value::as_str) {
            out.push_str(" Body:");
            out.push_str(body);
        }
    }
    out
}

/// One document served node by node in breadth-first order.
#[derive(Clone)]
pub struct DocumentShard {
    tree: BfsDecomposition,
    working: Vec<usize>,
    cursor: usize,
    flattener: Flattener,
}

impl DocumentShard {
    /// Decompose `tree`, capturing at most `cap` ids per subtree.
    pub fn from_tree(tree: DocumentNode, cap: usize) -> Self {
        Self::from_decomposition(decompose(tree, cap))
    }

    pub fn from_decomposition(tree: BfsDecomposition) -> Self {
        let working = (0..tree.len()).collect();
        Self {
            tree,
            working,
            cursor: 0,
            flattener: flatten_payload,
        }
    }

    pub fn with_flattener(mut self, flattener: Flattener) -> Self {
        self.flattener = flattener;
        self
    }

    pub fn decomposition(&self) -> &BfsDecomposition {
        &self.tree
    }

    /// Render node `idx` without consuming it.
    pub fn example(&self, idx: usize) -> Option<DocumentExample> {
        let node_seq = self.tree.subtrees.get(idx)?.clone();

        let sub_node_content: Vec<String> = node_seq
            .iter()
            .map(|&i| {
                let mode = if i == idx {
                    FlattenMode::Full
                } else {
                    FlattenMode::Short
                };
                self.fragment(i, mode)
            })
            .collect();
        let length = sub_node_content.iter().map(|s| s.chars().count()).sum();

        Some(DocumentExample {
            depth: self.tree.depths[idx],
            sub_node_content,
            local_node_content: self.tree.payloads[idx].clone(),
            length,
            node_seq,
            node_number: idx,
        })
    }

    fn fragment(&self, idx: usize, mode: FlattenMode) -> String {
        format!(
            "<n>{}:{}:{}</n>",
            idx,
            self.tree.depths[idx],
            (self.flattener)(&self.tree.payloads[idx], mode)
        )
    }
}

impl fmt::Debug for DocumentShard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentShard")
            .field("tree", &self.tree)
            .field("working", &self.working)
            .field("cursor", &self.cursor)
            .finish_non_exhaustive()
    }
}

impl Iterator for DocumentShard {
    type Item = Example;

    fn next(&mut self) -> Option<Example> {
        let idx = *self.working.get(self.cursor)?;
        self.cursor += 1;
        self.example(idx).map(Example::Document)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl Shard for DocumentShard {
    fn init_depth(&mut self, depth: usize) -> bool {
        if depth > self.tree.max_depth {
            return false;
        }
        self.working = (0..self.tree.len())
            .filter(|&i| self.tree.depths[i] <= depth)
            .collect();
        self.cursor = 0;
        true
    }

    fn remaining(&self) -> usize {
        self.working.len().saturating_sub(self.cursor)
    }

    fn len(&self) -> usize {
        self.tree.len()
    }

    fn max_depth(&self) -> usize {
        self.tree.max_depth
    }
}
