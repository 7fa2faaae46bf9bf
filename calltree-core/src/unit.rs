//! Unit nodes and the arena that owns them.
//!
//! A unit can be reached from several call trees. Every tree refers to the
//! same arena slot through a [`UnitId`], so the depth recorded on a node is
//! the deepest occurrence across all trees built into the arena.

use std::collections::HashMap;
use std::ops::Index;

use serde::Serialize;

use crate::types::{NodeRecord, UnitKind};

/// Stable handle of a node inside a [`UnitArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct UnitId(usize);

impl UnitId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One callable unit as a tree node.
#[derive(Clone, Debug, PartialEq)]
pub struct UnitNode {
    pub name: String,
    pub params: Vec<String>,
    pub body: String,
    pub kind: UnitKind,
    /// Body with call markers, when the extractor produced one.
    pub emb_repr: Option<String>,
    short_repr: Option<String>,
    prediction_repr: Option<String>,
    depth: usize,
    children: Vec<UnitId>,
}

impl UnitNode {
    pub fn new(name: impl Into<String>, params: Vec<String>, body: impl Into<String>, kind: UnitKind) -> Self {
        Self {
            name: name.into(),
            params,
            body: body.into(),
            kind,
            emb_repr: None,
            short_repr: None,
            prediction_repr: None,
            depth: 0,
            children: Vec::new(),
        }
    }

    /// Node for a node-set entry; the prediction text is the definition source.
    pub fn from_record(record: &NodeRecord) -> Self {
        let mut node = Self::new(
            record.name.clone(),
            record.params.clone(),
            record.body.clone(),
            record.kind,
        );
        node.emb_repr = record.emb_repr.clone();
        node.prediction_repr = Some(record.body.clone());
        node
    }

    pub fn with_short_repr(mut self, repr: impl Into<String>) -> Self {
        self.short_repr = Some(repr.into());
        self
    }

    pub fn with_prediction_repr(mut self, repr: impl Into<String>) -> Self {
        self.prediction_repr = Some(repr.into());
        self
    }

    /// `name`, or `name | p1, p2` when the unit takes parameters.
    pub fn short_repr(&self) -> String {
        match &self.short_repr {
            Some(repr) => repr.clone(),
            None if self.params.is_empty() => self.name.clone(),
            None => format!("{} | {}", self.name, self.params.join(", ")),
        }
    }

    pub fn prediction_repr(&self) -> &str {
        self.prediction_repr.as_deref().unwrap_or(&self.body)
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn children(&self) -> &[UnitId] {
        &self.children
    }
}

/// Owner of every [`UnitNode`] built from one record.
#[derive(Clone, Debug, Default)]
pub struct UnitArena {
    nodes: Vec<UnitNode>,
    by_name: HashMap<String, UnitId>,
}

impl UnitArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. A node with an already known name takes over the name.
    pub fn insert(&mut self, node: UnitNode) -> UnitId {
        let id = UnitId(self.nodes.len());
        self.by_name.insert(node.name.clone(), id);
        self.nodes.push(node);
        id
    }

    pub fn lookup(&self, name: &str) -> Option<UnitId> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = UnitId> {
        (0..self.nodes.len()).map(UnitId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (UnitId, &UnitNode)> {
        self.nodes.iter().enumerate().map(|(i, node)| (UnitId(i), node))
    }

    /// Raise a node's depth to at least `depth`; never lowers it.
    /// Returns the resulting depth.
    pub fn raise_depth(&mut self, id: UnitId, depth: usize) -> usize {
        match self.nodes.get_mut(id.0) {
            Some(node) => {
                node.depth = node.depth.max(depth);
                node.depth
            }
            None => 0,
        }
    }

    pub fn set_children(&mut self, id: UnitId, children: Vec<UnitId>) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.children = children;
        }
    }

    /// Deepest depth recorded on any node.
    pub fn max_depth(&self) -> usize {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }
}

impl Index<UnitId> for UnitArena {
    type Output = UnitNode;

    fn index(&self, id: UnitId) -> &UnitNode {
        &self.nodes[id.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, params: &[&str]) -> UnitNode {
        UnitNode::new(
            name,
            params.iter().map(|p| p.to_string()).collect(),
            format!("def {}(): pass", name),
            UnitKind::Function,
        )
    }

    #[test]
    fn test_short_repr() {
        assert_eq!(node("run", &[]).short_repr(), "run");
        assert_eq!(node("add", &["a", "b"]).short_repr(), "add | a, b");
        assert_eq!(node("add", &["a"]).with_short_repr("custom").short_repr(), "custom");
    }

    #[test]
    fn test_prediction_repr_falls_back_to_body() {
        let plain = node("run", &[]);
        assert_eq!(plain.prediction_repr(), "def run(): pass");
        let custom = node("run", &[]).with_prediction_repr("run()");
        assert_eq!(custom.prediction_repr(), "run()");
    }

    #[test]
    fn test_from_record() {
        let record = NodeRecord {
            name: "f".to_string(),
            params: vec!["x".to_string()],
            body: "def f(x):\n    return g(x)".to_string(),
            kind: UnitKind::Function,
            emb_repr: Some("def f(x):\n    return #<call>g(x)</call>".to_string()),
        };
        let node = UnitNode::from_record(&record);
        assert_eq!(node.prediction_repr(), record.body);
        assert_eq!(node.emb_repr, record.emb_repr);
        assert_eq!(node.depth(), 0);
    }

    #[test]
    fn test_raise_depth_is_monotonic() {
        let mut arena = UnitArena::new();
        let id = arena.insert(node("f", &[]));
        assert_eq!(arena.raise_depth(id, 3), 3);
        assert_eq!(arena.raise_depth(id, 1), 3);
        assert_eq!(arena[id].depth(), 3);
        assert_eq!(arena.max_depth(), 3);
    }

    #[test]
    fn test_lookup_and_children() {
        let mut arena = UnitArena::new();
        let a = arena.insert(node("a", &[]));
        let b = arena.insert(node("b", &[]));
        arena.set_children(a, vec![b]);

        assert_eq!(arena.lookup("b"), Some(b));
        assert_eq!(arena.lookup("zzz"), None);
        assert_eq!(arena[a].children(), &[b]);
        assert_eq!(arena.ids().collect::<Vec<_>>(), vec![a, b]);
    }
}
