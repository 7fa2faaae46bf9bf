//! Call frequency graph between the units of one source file.
//!
//! Maps caller name → callee name → number of call sites. Both levels keep
//! first-seen order so tree construction and shard ordering are stable for a
//! given input. Matching is by trailing identifier only, so `a.save()` and
//! `b.save()` both count towards a unit named `save`.

use serde::{Deserialize, Serialize};

use crate::types::NameMap;

/// Caller → callee → count.
///
/// Every callee that has been counted is also present as a caller key,
/// possibly with no outgoing edges.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallGraph {
    edges: NameMap<NameMap<u32>>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one call site of `callee` inside `caller`.
    pub fn record_call(&mut self, caller: &str, callee: &str) {
        self.edges.get_or_insert_with(caller, NameMap::new);
        self.edges.get_or_insert_with(callee, NameMap::new);
        if let Some(callees) = self.edges.get_mut(caller) {
            *callees.get_or_insert_with(callee, || 0) += 1;
        }
    }

    /// All keys of the graph, callers and counted callees alike.
    pub fn callers(&self) -> impl Iterator<Item = &str> {
        self.edges.keys()
    }

    /// Distinct callees of `caller` with their counts, in first-seen order.
    pub fn callees<'a>(&'a self, caller: &str) -> impl Iterator<Item = (&'a str, u32)> + 'a {
        self.edges
            .get(caller)
            .into_iter()
            .flat_map(|callees| callees.iter().map(|(name, &count)| (name, count)))
    }

    /// Number of call sites of `callee` inside `caller`.
    pub fn count(&self, caller: &str, callee: &str) -> u32 {
        self.edges
            .get(caller)
            .and_then(|callees| callees.get(callee))
            .copied()
            .unwrap_or(0)
    }

    pub fn has_node(&self, name: &str) -> bool {
        self.edges.contains_key(name)
    }

    pub fn node_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of distinct caller/callee pairs.
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(|callees| callees.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}
