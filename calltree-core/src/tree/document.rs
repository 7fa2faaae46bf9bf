//! Breadth-first decomposition of document trees.

use std::collections::VecDeque;

use crate::types::DocumentNode;

/// A document tree flattened into breadth-first order.
///
/// Node ids are positions in that order; the root is `0`.
#[derive(Clone, Debug, PartialEq)]
pub struct BfsDecomposition<T = serde_json::Value> {
    pub payloads: Vec<T>,
    pub depths: Vec<usize>,
    /// Per node, the first `cap` ids of a breadth-first walk of its subtree,
    /// starting with the node itself.
    pub subtrees: Vec<Vec<usize>>,
    pub max_depth: usize,
}

impl<T> BfsDecomposition<T> {
    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }
}

/// Number nodes breadth-first and capture each node's capped subtree.
pub fn decompose<T>(tree: DocumentNode<T>, cap: usize) -> BfsDecomposition<T> {
    let mut payloads = Vec::new();
    let mut depths = Vec::new();
    let mut children: Vec<Vec<usize>> = Vec::new();

    let mut next_id = 1;
    let mut queue = VecDeque::from([(tree, 0usize)]);
    while let Some((node, depth)) = queue.pop_front() {
        payloads.push(node.data);
        depths.push(depth);

        let mut ids = Vec::with_capacity(node.children.len());
        for child in node.children {
            ids.push(next_id);
            next_id += 1;
            queue.push_back((child, depth + 1));
        }
        children.push(ids);
    }

    let subtrees = (0..payloads.len())
        .map(|id| capped_bfs(&children, id, cap))
        .collect();
    let max_depth = depths.iter().copied().max().unwrap_or(0);

    BfsDecomposition {
        payloads,
        depths,
        subtrees,
        max_depth,
    }
}

fn capped_bfs(children: &[Vec<usize>], start: usize, cap: usize) -> Vec<usize> {
    let mut seen = Vec::new();
    let mut queue = VecDeque::from([start]);
    while let Some(id) = queue.pop_front() {
        if seen.len() >= cap {
            break;
        }
        seen.push(id);
        queue.extend(children[id].iter().copied());
    }
    seen
}
