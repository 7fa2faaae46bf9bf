//! Call trees built from a call-frequency graph.
//!
//! Every unit of the graph becomes the root of its own tree. The root's
//! children are the callees discovered while descending from it; all roots
//! share nodes through one [`UnitArena`].

use serde::{Deserialize, Serialize};

use crate::error::{RecordError, Result};
use crate::graph::CallGraph;
use crate::types::{NameMap, NodeRecord};
use crate::unit::{UnitArena, UnitId, UnitNode};

/// When the builder descends into a callee.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionPolicy {
    /// Descend only into a callee that is already an ancestor of the current
    /// unit (and is not the current unit). Callees are never ancestors on
    /// first encounter, so in practice trees stay one level deep.
    #[default]
    AncestorGated,
    /// Descend into any callee that is not yet an ancestor.
    Unvisited,
}

impl AdmissionPolicy {
    fn admits(self, callee: &str, current: &str, ancestors: &Ancestors<'_>) -> bool {
        if callee == current {
            return false;
        }
        match self {
            AdmissionPolicy::AncestorGated => ancestors.contains(callee),
            AdmissionPolicy::Unvisited => !ancestors.contains(callee),
        }
    }
}

/// Persistent chain from the root to the current unit.
///
/// Each frame links a new head onto its parent's chain, so siblings never
/// see each other's descent.
struct Ancestors<'a> {
    name: &'a str,
    parent: Option<&'a Ancestors<'a>>,
}

impl<'a> Ancestors<'a> {
    fn root(name: &'a str) -> Self {
        Self { name, parent: None }
    }

    fn push(&'a self, name: &'a str) -> Ancestors<'a> {
        Ancestors {
            name,
            parent: Some(self),
        }
    }

    fn contains(&self, name: &str) -> bool {
        let mut cursor = Some(self);
        while let Some(link) = cursor {
            if link.name == name {
                return true;
            }
            cursor = link.parent;
        }
        false
    }
}

/// Nodes of one record, ordered for consumption.
#[derive(Clone, Debug)]
pub struct CallForest {
    arena: UnitArena,
    order: Vec<UnitId>,
}

impl CallForest {
    pub fn arena(&self) -> &UnitArena {
        &self.arena
    }

    /// Node ids by descending child count; ties keep node-set order.
    pub fn roots(&self) -> &[UnitId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct CallTreeBuilder {
    max_depth: usize,
    policy: AdmissionPolicy,
}

impl CallTreeBuilder {
    /// `max_depth` caps how far any descent goes below its root.
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            policy: AdmissionPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: AdmissionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Build one tree per unit that appears in `graph`.
    pub fn build(&self, node_set: &NameMap<NodeRecord>, graph: &CallGraph) -> Result<CallForest> {
        let mut arena = UnitArena::new();
        for (name, record) in node_set.iter() {
            if graph.has_node(name) {
                arena.insert(UnitNode::from_record(record));
            }
        }

        if arena.is_empty() {
            return Err(RecordError::construction(
                "call graph shares no unit with the node set",
            ));
        }

        let roots: Vec<(UnitId, String)> = arena
            .iter()
            .map(|(id, node)| (id, node.name.clone()))
            .collect();

        for (id, name) in &roots {
            let mut discovered = Vec::new();
            let ancestors = Ancestors::root(name);
            self.descend(&mut arena, graph, name, 0, &ancestors, &mut discovered);
            arena.set_children(*id, discovered);
        }

        let mut order: Vec<UnitId> = roots.into_iter().map(|(id, _)| id).collect();
        order.sort_by(|a, b| arena[*b].children().len().cmp(&arena[*a].children().len()));

        tracing::debug!(
            nodes = order.len(),
            edges = graph.edge_count(),
            max_depth = arena.max_depth(),
            "built call forest"
        );

        Ok(CallForest { arena, order })
    }

    fn descend(
        &self,
        arena: &mut UnitArena,
        graph: &CallGraph,
        current: &str,
        depth: usize,
        ancestors: &Ancestors<'_>,
        discovered: &mut Vec<UnitId>,
    ) {
        if let Some(id) = arena.lookup(current) {
            arena.raise_depth(id, depth);
        }

        for (callee, _) in graph.callees(current) {
            let Some(callee_id) = arena.lookup(callee) else {
                tracing::trace!(caller = current, callee, "skipping orphan edge");
                continue;
            };
            if !discovered.contains(&callee_id) {
                discovered.push(callee_id);
            }

            if depth < self.max_depth && self.policy.admits(callee, current, ancestors) {
                let next = ancestors.push(callee);
                self.descend(arena, graph, callee, depth + 1, &next, discovered);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UnitKind;

    fn record(name: &str) -> NodeRecord {
        NodeRecord {
            name: name.to_string(),
            params: Vec::new(),
            body: format!("def {}():\n    pass", name),
            kind: UnitKind::Function,
            emb_repr: None,
        }
    }

    fn node_set(names: &[&str]) -> NameMap<NodeRecord> {
        names.iter().map(|n| (*n, record(n))).collect()
    }

    /// main -> parse -> tokenize, main -> render, tokenize -> parse (cycle)
    fn sample_graph() -> CallGraph {
        let mut graph = CallGraph::new();
        graph.record_call("main", "parse");
        graph.record_call("main", "render");
        graph.record_call("parse", "tokenize");
        graph.record_call("tokenize", "parse");
        graph
    }

    fn child_names(forest: &CallForest, name: &str) -> Vec<String> {
        let arena = forest.arena();
        let id = arena.lookup(name).unwrap();
        arena[id]
            .children()
            .iter()
            .map(|c| arena[*c].name.clone())
            .collect()
    }

    #[test]
    fn test_ancestor_gated_never_expands() {
        let nodes = node_set(&["main", "parse", "render", "tokenize"]);
        let forest = CallTreeBuilder::new(3).build(&nodes, &sample_graph()).unwrap();

        // Only direct callees, every depth stays at 0
        assert_eq!(child_names(&forest, "main"), vec!["parse", "render"]);
        assert_eq!(child_names(&forest, "parse"), vec!["tokenize"]);
        assert_eq!(child_names(&forest, "tokenize"), vec!["parse"]);
        assert!(child_names(&forest, "render").is_empty());
        assert_eq!(forest.arena().max_depth(), 0);
    }

    #[test]
    fn test_unvisited_expands_without_cycles() {
        let nodes = node_set(&["main", "parse", "render", "tokenize"]);
        let forest = CallTreeBuilder::new(10)
            .with_policy(AdmissionPolicy::Unvisited)
            .build(&nodes, &sample_graph())
            .unwrap();

        assert_eq!(child_names(&forest, "main"), vec!["parse", "tokenize", "render"]);
        // parse -> tokenize is listed but not descended: tokenize is the root
        assert_eq!(child_names(&forest, "tokenize"), vec!["parse", "tokenize"]);

        let arena = forest.arena();
        assert_eq!(arena[arena.lookup("tokenize").unwrap()].depth(), 2);
        assert_eq!(arena[arena.lookup("render").unwrap()].depth(), 1);
        assert_eq!(arena[arena.lookup("main").unwrap()].depth(), 0);
    }

    #[test]
    fn test_max_depth_bounds_descent() {
        let nodes = node_set(&["main", "parse", "render", "tokenize"]);
        let forest = CallTreeBuilder::new(1)
            .with_policy(AdmissionPolicy::Unvisited)
            .build(&nodes, &sample_graph())
            .unwrap();

        assert_eq!(child_names(&forest, "main"), vec!["parse", "tokenize", "render"]);
        assert_eq!(forest.arena().max_depth(), 1);
    }

    #[test]
    fn test_roots_sorted_by_child_count() {
        let nodes = node_set(&["render", "parse", "main", "tokenize"]);
        let forest = CallTreeBuilder::new(3).build(&nodes, &sample_graph()).unwrap();
        let names: Vec<_> = forest
            .roots()
            .iter()
            .map(|id| forest.arena()[*id].name.as_str())
            .collect();
        assert_eq!(names, vec!["main", "parse", "tokenize", "render"]);
    }

    #[test]
    fn test_self_call_listed_not_expanded() {
        let mut graph = CallGraph::new();
        graph.record_call("walk", "walk");
        let forest = CallTreeBuilder::new(5)
            .with_policy(AdmissionPolicy::Unvisited)
            .build(&node_set(&["walk"]), &graph)
            .unwrap();
        assert_eq!(child_names(&forest, "walk"), vec!["walk"]);
        assert_eq!(forest.arena().max_depth(), 0);
    }

    #[test]
    fn test_orphans_skipped_and_unknown_units_dropped() {
        let mut graph = CallGraph::new();
        graph.record_call("main", "ghost");
        let nodes = node_set(&["main", "unused"]);
        let forest = CallTreeBuilder::new(3).build(&nodes, &graph).unwrap();

        assert_eq!(forest.len(), 1);
        assert!(child_names(&forest, "main").is_empty());
        assert!(forest.arena().lookup("unused").is_none());
    }

    #[test]
    fn test_empty_graph_fails() {
        let err = CallTreeBuilder::new(3)
            .build(&node_set(&["main"]), &CallGraph::new())
            .unwrap_err();
        assert!(matches!(err, RecordError::ShardConstruction { .. }));
    }
}
