//! Round-robin shard pool with replenishment from an upstream source.
//!
//! The iterator keeps every admitted shard in a full list and drains a
//! filtered subset of it. Each pull serves the shard under the cursor and
//! advances; a shard that runs dry is dropped from both lists for good and
//! one replacement is ingested from upstream. When no filtered shard is left
//! and the upstream is exhausted, the pool is depleted and yields `None`
//! from then on.
//!
//! ```text
//! Filling ──► Draining ◄──► Refilling
//!                 │              │
//!                 └──► Depleted ◄┘
//! ```

use std::collections::BTreeMap;

use serde::Serialize;

use crate::factory::ShardFactory;
use crate::shard::{Example, Shard};
use crate::source::RawRecord;

/// Position of a shard in admission order.
pub type ShardId = usize;

/// Lifecycle of a [`ShardIterator`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolPhase {
    /// Initial fill up to the batch size.
    #[default]
    Filling,
    /// Serving examples.
    Draining,
    /// A shard ran dry and a replacement was requested.
    Refilling,
    /// No shard left and nothing upstream. Terminal.
    Depleted,
}

/// Snapshot of the pool's counters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub phase: PoolPhase,
    pub batch_size: usize,
    /// Shards in the filtered list.
    pub live: usize,
    /// Shards in the full list.
    pub total: usize,
    pub admitted: usize,
    /// Records that failed to become a shard.
    pub skipped: usize,
    /// Shards removed after running dry.
    pub exhausted: usize,
    pub served: usize,
    pub replenish_attempts: usize,
    pub upstream_exhausted: bool,
}

/// Pool of shards served round-robin.
pub struct ShardIterator<S, F> {
    upstream: S,
    factory: F,
    batch_size: usize,
    shards: BTreeMap<ShardId, Box<dyn Shard>>,
    filtered: Vec<ShardId>,
    cursor: usize,
    next_id: ShardId,
    phase: PoolPhase,
    upstream_exhausted: bool,
    depth_limit: Option<usize>,
    admitted: usize,
    skipped: usize,
    exhausted: usize,
    served: usize,
    replenish_attempts: usize,
}

impl<S, F> ShardIterator<S, F>
where
    S: Iterator<Item = RawRecord>,
    F: ShardFactory,
{
    /// Create an empty pool. It fills itself on the first pull.
    pub fn new(upstream: S, factory: F, batch_size: usize) -> Self {
        Self {
            upstream,
            factory,
            batch_size: batch_size.max(1),
            shards: BTreeMap::new(),
            filtered: Vec::new(),
            cursor: 0,
            next_id: 0,
            phase: PoolPhase::Filling,
            upstream_exhausted: false,
            depth_limit: None,
            admitted: 0,
            skipped: 0,
            exhausted: 0,
            served: 0,
            replenish_attempts: 0,
        }
    }

    /// Create a pool and fill it to `batch_size` shards right away.
    pub fn init(upstream: S, factory: F, batch_size: usize) -> Self {
        let mut pool = Self::new(upstream, factory, batch_size);
        pool.fill();
        pool
    }

    /// Ingest records until `batch_size` shards are live or the upstream
    /// runs out.
    pub fn fill(&mut self) {
        while self.filtered.len() < self.batch_size {
            if !self.ingest_one() {
                break;
            }
        }

        if self.filtered.is_empty() && self.upstream_exhausted {
            self.deplete();
        } else if self.phase != PoolPhase::Depleted {
            self.phase = PoolPhase::Draining;
            tracing::debug!(live = self.filtered.len(), skipped = self.skipped, "pool filled");
        }
    }

    /// Admit a shard into both the full and the filtered list.
    pub fn add_shard(&mut self, shard: Box<dyn Shard>) -> ShardId {
        let id = self.next_id;
        self.next_id += 1;
        self.shards.insert(id, shard);
        self.filtered.push(id);
        self.admitted += 1;
        id
    }

    /// Admit prepared shards, e.g. ones loaded outside the upstream.
    pub fn load_shards<I>(&mut self, shards: I) -> &mut Self
    where
        I: IntoIterator<Item = Box<dyn Shard>>,
    {
        for shard in shards {
            self.add_shard(shard);
        }
        self
    }

    /// Re-derive the filtered list from the full list.
    ///
    /// `make_filter` sees the pool's current counters and returns the
    /// predicate; the predicate may reconfigure each shard it inspects.
    /// The cursor restarts at the first filtered shard.
    pub fn set_filter<G, P>(&mut self, make_filter: G) -> &mut Self
    where
        G: FnOnce(&PoolStats) -> P,
        P: FnMut(&mut dyn Shard) -> bool,
    {
        let mut keep = make_filter(&self.stats());
        self.filtered = self
            .shards
            .iter_mut()
            .filter_map(|(id, shard)| keep(&mut **shard).then_some(*id))
            .collect();
        self.cursor = 0;
        tracing::debug!(
            live = self.filtered.len(),
            total = self.shards.len(),
            "filter applied"
        );
        self
    }

    /// Limit every shard, including later replacements, to nodes at depth
    /// `<= depth`. Shards that cannot reach it are left out.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.depth_limit = Some(depth);
        self.set_filter(|_| move |shard: &mut dyn Shard| shard.init_depth(depth));
        self
    }

    pub fn phase(&self) -> PoolPhase {
        self.phase
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Shards currently being drained.
    pub fn live(&self) -> usize {
        self.filtered.len()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            phase: self.phase,
            batch_size: self.batch_size,
            live: self.filtered.len(),
            total: self.shards.len(),
            admitted: self.admitted,
            skipped: self.skipped,
            exhausted: self.exhausted,
            served: self.served,
            replenish_attempts: self.replenish_attempts,
            upstream_exhausted: self.upstream_exhausted,
        }
    }

    /// Pull records until one becomes a shard. Returns `false` once the
    /// upstream is exhausted.
    fn ingest_one(&mut self) -> bool {
        if self.upstream_exhausted {
            return false;
        }

        while let Some(record) = self.upstream.next() {
            let kind = record.kind();
            match self.factory.build(record) {
                Ok(mut shard) => {
                    if let Some(depth) = self.depth_limit {
                        if !shard.init_depth(depth) {
                            self.skipped += 1;
                            tracing::debug!(kind, depth, "skipping shard shallower than depth limit");
                            continue;
                        }
                    }
                    let id = self.add_shard(shard);
                    tracing::trace!(kind, shard = id, "admitted shard");
                    return true;
                }
                Err(e) => {
                    self.skipped += 1;
                    tracing::debug!(kind, error = %e, "skipping record");
                }
            }
        }

        self.upstream_exhausted = true;
        tracing::debug!(admitted = self.admitted, skipped = self.skipped, "upstream exhausted");
        false
    }

    fn deplete(&mut self) {
        if self.phase != PoolPhase::Depleted {
            self.phase = PoolPhase::Depleted;
            tracing::info!(
                served = self.served,
                admitted = self.admitted,
                skipped = self.skipped,
                "shard pool depleted"
            );
        }
    }
}

impl<S, F> Iterator for ShardIterator<S, F>
where
    S: Iterator<Item = RawRecord>,
    F: ShardFactory,
{
    type Item = Example;

    fn next(&mut self) -> Option<Example> {
        if self.phase == PoolPhase::Filling {
            self.fill();
        }

        loop {
            if self.phase == PoolPhase::Depleted {
                return None;
            }

            if self.filtered.is_empty() {
                if !self.ingest_one() {
                    self.deplete();
                    return None;
                }
                continue;
            }

            let idx = self.cursor % self.filtered.len();
            let id = self.filtered[idx];
            let example = self.shards.get_mut(&id).and_then(|shard| shard.next());

            match example {
                Some(example) => {
                    self.cursor = idx + 1;
                    self.served += 1;
                    self.phase = PoolPhase::Draining;
                    return Some(example);
                }
                None => {
                    // The next shard slides into `idx`
                    self.filtered.remove(idx);
                    self.shards.remove(&id);
                    self.cursor = idx;
                    self.exhausted += 1;
                    self.phase = PoolPhase::Refilling;
                    self.replenish_attempts += 1;
                    tracing::trace!(shard = id, live = self.filtered.len(), "shard exhausted");
                    self.ingest_one();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::CodeShardFactory;
    use crate::types::DocumentNode;
    use serde_json::json;

    /// Document whose nodes are named `{prefix}0`, `{prefix}1`, ...
    fn doc(prefix: &str, children: usize) -> RawRecord {
        let kids = (1..=children)
            .map(|i| DocumentNode::leaf(json!(format!("{}{}", prefix, i))))
            .collect();
        RawRecord::Document(DocumentNode::with_children(json!(format!("{}0", prefix)), kids))
    }

    fn label(example: Example) -> String {
        match example {
            Example::Document(d) => d.local_node_content.as_str().unwrap_or_default().to_string(),
            other => format!("{:?}", other),
        }
    }

    fn pool(
        records: Vec<RawRecord>,
        batch_size: usize,
    ) -> ShardIterator<std::vec::IntoIter<RawRecord>, CodeShardFactory> {
        ShardIterator::init(records.into_iter(), CodeShardFactory::default(), batch_size)
    }

    #[test]
    fn test_round_robin() {
        let mut it = pool(vec![doc("a", 2), doc("b", 2), doc("c", 2)], 3);
        let labels: Vec<_> = it.by_ref().map(label).collect();
        assert_eq!(
            labels,
            vec!["a0", "b0", "c0", "a1", "b1", "c1", "a2", "b2", "c2"]
        );
        assert_eq!(it.phase(), PoolPhase::Depleted);
    }

    #[test]
    fn test_exhaustion_replenishes_in_place() {
        let mut it = pool(vec![doc("a", 0), doc("b", 1), doc("c", 0)], 2);
        let labels: Vec<_> = it.by_ref().map(label).collect();
        assert_eq!(labels, vec!["a0", "b0", "b1", "c0"]);

        let stats = it.stats();
        assert_eq!(stats.admitted, 3);
        assert_eq!(stats.exhausted, 3);
        assert_eq!(stats.served, 4);
        assert_eq!(stats.replenish_attempts, 3);
        assert_eq!(stats.total, 0);
        assert!(stats.upstream_exhausted);
    }

    #[test]
    fn test_skips_failed_records() {
        let records = vec![
            RawRecord::Source("def broken(:\n".to_string()),
            RawRecord::Source("x = 1\n".to_string()),
            doc("a", 0),
        ];
        let it = pool(records, 1);
        let stats = it.stats();
        assert_eq!(stats.live, 1);
        assert_eq!(stats.skipped, 2);
        assert_eq!(stats.phase, PoolPhase::Draining);
    }

    #[test]
    fn test_batch_of_four_waits_for_first_exhaustion() {
        let mut it = pool(vec![doc("a", 1), doc("b", 0), doc("c", 0), doc("d", 0)], 4);
        let stats = it.stats();
        assert_eq!(stats.phase, PoolPhase::Draining);
        assert_eq!(stats.live, 4);
        assert_eq!(stats.replenish_attempts, 0);
        assert!(!stats.upstream_exhausted);

        for _ in 0..4 {
            assert!(it.next().is_some());
        }
        assert_eq!(it.stats().replenish_attempts, 0);

        // The second pass still starts at a, which has one node left
        assert_eq!(it.next().map(label), Some("a1".to_string()));
        assert_eq!(it.stats().replenish_attempts, 0);

        assert!(it.next().is_none());
        assert_eq!(it.stats().replenish_attempts, 4);
    }

    #[test]
    fn test_depletion_is_terminal() {
        let mut it = pool(vec![doc("a", 0)], 2);
        assert!(it.next().is_some());
        assert!(it.next().is_none());
        assert_eq!(it.phase(), PoolPhase::Depleted);
        assert!(it.next().is_none());
        assert!(it.next().is_none());
    }

    #[test]
    fn test_empty_upstream_is_depleted_after_fill() {
        let mut it = pool(Vec::new(), 4);
        assert_eq!(it.phase(), PoolPhase::Depleted);
        assert!(it.next().is_none());
    }

    #[test]
    fn test_lazy_fill_on_first_pull() {
        let mut it = ShardIterator::new(
            vec![doc("a", 0), doc("b", 0)].into_iter(),
            CodeShardFactory::default(),
            2,
        );
        assert_eq!(it.phase(), PoolPhase::Filling);
        assert_eq!(it.next().map(label), Some("a0".to_string()));
        assert_eq!(it.stats().admitted, 2);
    }

    #[test]
    fn test_set_filter_uses_stats() {
        let mut it = pool(vec![doc("a", 2), doc("b", 0), doc("c", 1)], 3);
        it.set_filter(|stats| {
            let min = stats.live - 1;
            move |shard: &mut dyn Shard| shard.len() >= min
        });
        assert_eq!(it.live(), 2);
        assert_eq!(it.stats().total, 3);

        let labels: Vec<_> = it.by_ref().map(label).collect();
        assert_eq!(labels, vec!["a0", "c0", "a1", "c1", "a2"]);
    }

    #[test]
    fn test_with_max_depth() {
        let deep = RawRecord::Document(DocumentNode::with_children(
            json!("r0"),
            vec![DocumentNode::with_children(json!("r1"), vec![DocumentNode::leaf(json!("r2"))])],
        ));
        let it = pool(vec![deep, doc("flat", 0), doc("late", 1)], 2).with_max_depth(1);
        assert_eq!(it.live(), 1);

        let labels: Vec<_> = it.map(label).collect();
        // r2 sits below the limit; late0/late1 come from the replacement shard
        assert_eq!(labels, vec!["r0", "r1", "late0", "late1"]);
    }

    #[test]
    fn test_add_and_load_shards() {
        let mut factory = CodeShardFactory::default();
        let a = factory.build(doc("a", 1)).unwrap();
        let b = factory.build(doc("b", 0)).unwrap();

        let mut it = ShardIterator::new(std::iter::empty::<RawRecord>(), CodeShardFactory::default(), 2);
        it.load_shards(vec![a, b]);
        assert_eq!(it.stats().admitted, 2);

        let labels: Vec<_> = it.by_ref().map(label).collect();
        assert_eq!(labels, vec!["a0", "b0", "a1"]);
    }
}
