//! End-to-end scenarios for shards and the shard pool.

use calltree_core::shard::{DocumentShard, Shard};
use calltree_core::tree::decompose;
use calltree_core::{
    CodeShardFactory, DocumentNode, Example, LoaderConfig, PoolPhase, RawRecord, ShardIterator,
};
use serde_json::json;

fn tree_a() -> DocumentNode {
    serde_json::from_value(json!({
        "__data__": "A",
        "__children__": [
            {"__data__": "B", "__children__": [
                {"__data__": "D", "__children__": []},
                {"__data__": "E", "__children__": []}
            ]},
            {"__data__": "C", "__children__": [
                {"__data__": "F", "__children__": []},
                {"__data__": "G", "__children__": []}
            ]}
        ]
    }))
    .unwrap()
}

fn tree_b() -> DocumentNode {
    serde_json::from_value(json!({
        "__data__": "A",
        "__children__": [
            {"__data__": "B", "__children__": [
                {"__data__": "D", "__children__": []},
                {"__data__": "E", "__children__": [
                    {"__data__": "F", "__children__": []},
                    {"__data__": "G", "__children__": []}
                ]}
            ]},
            {"__data__": "C", "__children__": []}
        ]
    }))
    .unwrap()
}

fn tree_c() -> DocumentNode {
    serde_json::from_value(json!({
        "__data__": "A",
        "__children__": [
            {"__data__": "B", "__children__": [
                {"__data__": "D", "__children__": []},
                {"__data__": "E", "__children__": []},
                {"__data__": "F", "__children__": []},
                {"__data__": "G", "__children__": []}
            ]},
            {"__data__": "C", "__children__": []}
        ]
    }))
    .unwrap()
}

fn trees() -> Vec<DocumentNode> {
    vec![tree_a(), tree_b(), tree_c()]
}

fn node_number(example: Example) -> usize {
    match example {
        Example::Document(d) => d.node_number,
        other => panic!("unexpected example {:?}", other),
    }
}

#[test]
fn test_document_depths_and_subtrees() {
    let decomposed: Vec<_> = trees().into_iter().map(|t| decompose(t, 3)).collect();

    assert_eq!(decomposed[0].depths, vec![0, 1, 1, 2, 2, 2, 2]);
    assert_eq!(decomposed[1].depths, vec![0, 1, 1, 2, 2, 3, 3]);
    assert_eq!(decomposed[2].depths, vec![0, 1, 1, 2, 2, 2, 2]);

    assert_eq!(
        decomposed[0].subtrees,
        vec![vec![0, 1, 2], vec![1, 3, 4], vec![2, 5, 6], vec![3], vec![4], vec![5], vec![6]]
    );
    assert_eq!(
        decomposed[1].subtrees,
        vec![vec![0, 1, 2], vec![1, 3, 4], vec![2], vec![3], vec![4, 5, 6], vec![5], vec![6]]
    );
    assert_eq!(
        decomposed[2].subtrees,
        vec![vec![0, 1, 2], vec![1, 3, 4], vec![2], vec![3], vec![4], vec![5], vec![6]]
    );

    assert_eq!(decomposed[0].max_depth, 2);
    assert_eq!(decomposed[1].max_depth, 3);
}

#[test]
fn test_init_depth_selects_exact_subset() {
    for tree in trees() {
        for d in 0..4 {
            let mut shard = DocumentShard::from_tree(tree.clone(), 3);
            let expected: Vec<usize> = shard
                .decomposition()
                .depths
                .iter()
                .copied()
                .filter(|&depth| depth <= d)
                .collect();
            let reachable = d <= shard.max_depth();

            assert_eq!(shard.init_depth(d), reachable);
            if reachable {
                let served: Vec<usize> = shard.by_ref().map(|e| e.depth()).collect();
                assert_eq!(served, expected);
            } else {
                // Unchanged: the full list is still pending
                assert_eq!(shard.remaining(), shard.len());
            }
        }
    }
}

#[test]
fn test_pool_depth_filter_over_documents() {
    for d in 0..4 {
        let records = trees().into_iter().map(RawRecord::Document);
        let pool = ShardIterator::init(records, CodeShardFactory::default(), 3).with_max_depth(d);

        let served: Vec<Example> = pool.collect();
        assert!(served.iter().all(|e| e.depth() <= d));

        let expected: usize = trees()
            .into_iter()
            .map(|t| decompose(t, 3))
            .filter(|t| d <= t.max_depth)
            .map(|t| t.depths.iter().filter(|&&x| x <= d).count())
            .sum();
        assert_eq!(served.len(), expected);
    }
}

#[test]
fn test_round_robin_one_per_shard_per_pass() {
    let records = trees().into_iter().map(RawRecord::Document);
    let mut pool = ShardIterator::init(records, CodeShardFactory::default(), 3);

    // Every tree starts at its root, so the first pass serves three roots
    let first_pass: Vec<usize> = pool.by_ref().take(3).map(node_number).collect();
    assert_eq!(first_pass, vec![0, 0, 0]);

    let second_pass: Vec<usize> = pool.by_ref().take(3).map(node_number).collect();
    assert_eq!(second_pass, vec![1, 1, 1]);
}

#[test]
fn test_batch_of_four_sources() {
    let sources = [
        "def a():\n    b()\n\ndef b():\n    pass\n",
        "def c():\n    d()\n    d()\n\ndef d():\n    pass\n",
        "def e():\n    f()\n\ndef f():\n    e()\n",
        "class G:\n    def run(self):\n        return helper()\n\ndef helper():\n    return 1\n",
    ];
    let records = sources.iter().map(|s| RawRecord::Source(s.to_string()));
    let config = LoaderConfig::default();
    let mut pool = ShardIterator::init(records, CodeShardFactory::new(config), 4);

    let stats = pool.stats();
    assert_eq!(stats.phase, PoolPhase::Draining);
    assert_eq!(stats.live, 4);
    assert_eq!(stats.replenish_attempts, 0);

    let examples: Vec<Example> = pool.by_ref().collect();
    // Two units per record
    assert_eq!(examples.len(), 8);
    assert_eq!(pool.phase(), PoolPhase::Depleted);
    assert_eq!(pool.stats().exhausted, 4);
    assert!(pool.next().is_none());

    for example in &examples {
        let value = serde_json::to_value(example).unwrap();
        let text = value["input"]["text"].as_str().unwrap();
        assert!(text.starts_with("<begin_code><artifacts>"));
        assert!(text.ends_with("<end_code>"));
    }
}

#[test]
fn test_unparsable_records_do_not_stop_the_stream() {
    let records = vec![
        RawRecord::Source("def broken(:\n".to_string()),
        RawRecord::Source("def a():\n    b()\n\ndef b():\n    pass\n".to_string()),
        RawRecord::Source("print('no units')\n".to_string()),
        RawRecord::Source("def c():\n    d()\n\ndef d():\n    pass\n".to_string()),
    ];
    let mut pool = ShardIterator::init(records.into_iter(), CodeShardFactory::default(), 1);

    let names: Vec<String> = pool
        .by_ref()
        .filter_map(|e| e.root_name().map(String::from))
        .collect();
    assert_eq!(names, vec!["b", "a", "d", "c"]);
    assert_eq!(pool.stats().skipped, 2);
}
