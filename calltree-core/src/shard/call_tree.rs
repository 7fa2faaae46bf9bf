//! Shards over call forests.

use serde::{Deserialize, Serialize};

use super::{
    CallTreeExample, CallTreeInput, ContrastiveExample, ContrastiveInput, Example, RootInfo, Shard,
};
use crate::tokens::{ARTIFACTS_CLOSE, ARTIFACTS_OPEN, BEGIN_CODE, EMB, END_CODE, NODE_CLOSE, NODE_OPEN};
use crate::tree::CallForest;
use crate::unit::{UnitId, UnitNode};

/// Example shape a [`CallTreeShard`] renders.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShardVariant {
    /// `{target, input: {text, node_content}, root}` with tagged children.
    #[default]
    CallTree,
    /// `{input: {text, nodes, contrastive}, root}` with a flat child list.
    Contrastive,
}

/// One record's call forest, served most-recently-filtered node first.
#[derive(Clone, Debug)]
pub struct CallTreeShard {
    forest: CallForest,
    working: Vec<UnitId>,
    variant: ShardVariant,
    num_emb_tokens: usize,
}

impl CallTreeShard {
    pub fn new(forest: CallForest) -> Self {
        let working = forest.roots().to_vec();
        Self {
            forest,
            working,
            variant: ShardVariant::default(),
            num_emb_tokens: 0,
        }
    }

    pub fn with_variant(mut self, variant: ShardVariant) -> Self {
        self.variant = variant;
        self
    }

    /// Append `count` embedding placeholders to every child representation.
    pub fn with_emb_tokens(mut self, count: usize) -> Self {
        self.num_emb_tokens = count;
        self
    }

    /// Render the node at `idx` of the full list without consuming it.
    pub fn example(&self, idx: usize) -> Option<Example> {
        self.forest.roots().get(idx).map(|id| self.render(*id))
    }

    fn child_repr(&self, child: &UnitNode) -> String {
        let mut repr = child.short_repr();
        for _ in 0..self.num_emb_tokens {
            repr.push_str(EMB);
        }
        repr
    }

    fn render(&self, id: UnitId) -> Example {
        let arena = self.forest.arena();
        let node = &arena[id];
        let prediction = node.prediction_repr().to_string();
        let root = RootInfo {
            name: node.name.clone(),
            depth: node.depth(),
        };
        let children = node.children().iter().map(|c| self.child_repr(&arena[*c]));

        match self.variant {
            ShardVariant::CallTree => {
                let mut node_content = String::from(ARTIFACTS_OPEN);
                for child in children {
                    node_content.push_str(NODE_OPEN);
                    node_content.push_str(&child);
                    node_content.push_str(NODE_CLOSE);
                }
                node_content.push_str(ARTIFACTS_CLOSE);

                let text = format!("{}{}{}{}", BEGIN_CODE, node_content, prediction, END_CODE);
                Example::CallTree(CallTreeExample {
                    target: prediction,
                    input: CallTreeInput { text, node_content },
                    root,
                })
            }
            ShardVariant::Contrastive => Example::Contrastive(ContrastiveExample {
                input: ContrastiveInput {
                    text: prediction.clone(),
                    nodes: children.collect(),
                    contrastive: prediction,
                },
                root,
            }),
        }
    }
}

impl Iterator for CallTreeShard {
    type Item = Example;

    fn next(&mut self) -> Option<Example> {
        self.working.pop().map(|id| self.render(id))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.working.len(), Some(self.working.len()))
    }
}

impl Shard for CallTreeShard {
    fn init_depth(&mut self, depth: usize) -> bool {
        let arena = self.forest.arena();
        self.working = self
            .forest
            .roots()
            .iter()
            .copied()
            .filter(|id| arena[*id].depth() <= depth)
            .collect();
        true
    }

    fn remaining(&self) -> usize {
        self.working.len()
    }

    fn len(&self) -> usize {
        self.forest.len()
    }

    fn max_depth(&self) -> usize {
        self.forest.arena().max_depth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::CallGraph;
    use crate::tree::{AdmissionPolicy, CallTreeBuilder};
    use crate::types::{NameMap, NodeRecord, UnitKind};

    fn record(name: &str, params: &[&str]) -> NodeRecord {
        NodeRecord {
            name: name.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
            body: format!("def {}():\n    pass", name),
            kind: UnitKind::Function,
            emb_repr: None,
        }
    }

    fn forest(policy: AdmissionPolicy) -> CallForest {
        let nodes: NameMap<NodeRecord> = vec![
            ("main", record("main", &[])),
            ("load", record("load", &["path"])),
            ("save", record("save", &["data", "path"])),
        ]
        .into_iter()
        .collect();
        let mut graph = CallGraph::new();
        graph.record_call("main", "load");
        graph.record_call("main", "save");
        graph.record_call("load", "save");
        CallTreeBuilder::new(3)
            .with_policy(policy)
            .build(&nodes, &graph)
            .unwrap()
    }

    #[test]
    fn test_render_call_tree_example() {
        let shard = CallTreeShard::new(forest(AdmissionPolicy::AncestorGated));
        let Some(Example::CallTree(example)) = shard.example(0) else {
            panic!("expected call tree example");
        };

        assert_eq!(example.root.name, "main");
        assert_eq!(
            example.input.node_content,
            "<artifacts><node>load | path</node><node>save | data, path</node></artifacts>"
        );
        assert_eq!(example.target, "def main():\n    pass");
        assert_eq!(
            example.input.text,
            format!("<begin_code>{}def main():\n    pass<end_code>", example.input.node_content)
        );
    }

    #[test]
    fn test_render_contrastive_with_emb_tokens() {
        let shard = CallTreeShard::new(forest(AdmissionPolicy::AncestorGated))
            .with_variant(ShardVariant::Contrastive)
            .with_emb_tokens(2);
        let Some(Example::Contrastive(example)) = shard.example(0) else {
            panic!("expected contrastive example");
        };

        assert_eq!(
            example.input.nodes,
            vec!["load | path<emb><emb>", "save | data, path<emb><emb>"]
        );
        assert_eq!(example.input.text, example.input.contrastive);
    }

    #[test]
    fn test_drains_from_the_end() {
        let mut shard = CallTreeShard::new(forest(AdmissionPolicy::AncestorGated));
        assert_eq!(shard.remaining(), 3);

        let names: Vec<_> = shard
            .by_ref()
            .map(|e| e.root_name().unwrap_or_default().to_string())
            .collect();
        // Roots are ordered main, load, save by child count
        assert_eq!(names, vec!["save", "load", "main"]);
        assert_eq!(shard.remaining(), 0);
        assert!(shard.next().is_none());

        assert!(shard.init_depth(0));
        assert_eq!(shard.remaining(), 3);
    }

    #[test]
    fn test_init_depth_filters() {
        let mut shard = CallTreeShard::new(forest(AdmissionPolicy::Unvisited));
        assert_eq!(shard.max_depth(), 2);

        // main stays at 0; load and save are reached below it
        assert!(shard.init_depth(0));
        let names: Vec<_> = shard.by_ref().filter_map(|e| e.root_name().map(String::from)).collect();
        assert_eq!(names, vec!["main"]);

        assert!(shard.init_depth(5));
        assert_eq!(shard.remaining(), shard.len());
    }
}
