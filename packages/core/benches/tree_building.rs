//! Performance benchmarks for tree maintenance
//!
//! Run with: `cargo bench -p pathtree-core`
//!
//! These benchmarks measure the two linear-time paths:
//! - Tree reconstruction from level-ordered rows
//! - Cascading a subtree move through the in-memory store

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pathtree_core::db::MemoryStore;
use pathtree_core::models::{Node, NodeId};
use pathtree_core::services::TreeService;
use pathtree_core::tree::build_from_sequence;
use serde_json::json;
use std::sync::Arc;
use tokio::runtime::Runtime;

/// Level-ordered rows of a complete tree with the given fan-out
fn generate_rows(node_count: usize, fan_out: usize) -> Vec<Node> {
    (1..=node_count)
        .map(|n| {
            let mut node = Node::with_id(NodeId::from(n as i64), format!("Node {}", n), json!({}));
            if n > 1 {
                node.parent_id = Some(NodeId::from(((n - 2) / fan_out + 1) as i64));
            }
            node
        })
        .collect()
}

/// Benchmark tree reconstruction
///
/// Reconstruction is a single pass; time should grow linearly with row count.
fn bench_build_complete_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_complete_tree");

    for size in [100usize, 1_000, 10_000] {
        let rows = generate_rows(size, 4);
        group.bench_with_input(BenchmarkId::from_parameter(size), &rows, |b, rows| {
            b.iter(|| {
                let tree = build_from_sequence(black_box(rows.clone()), None).unwrap();
                black_box(tree)
            })
        });
    }

    group.finish();
}

/// Benchmark moving a populated subtree to the root level
fn bench_cascade_move(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("cascade_move");
    group.sample_size(10);

    group.bench_function("500_descendants", |b| {
        b.iter_custom(|iters| {
            rt.block_on(async {
                let mut total = std::time::Duration::ZERO;
                for _ in 0..iters {
                    let service = TreeService::new(Arc::new(MemoryStore::new()));
                    let root = service
                        .set_as_root(Node::new("Root".to_string(), json!({})))
                        .await
                        .unwrap();
                    let branch = service
                        .set_child_of(Node::new("Branch".to_string(), json!({})), &root)
                        .await
                        .unwrap();

                    let mut parents = vec![branch.clone()];
                    for i in 0..500 {
                        let parent = parents[i / 4].clone();
                        let child = service
                            .set_child_of(Node::new(format!("Child{}", i), json!({})), &parent)
                            .await
                            .unwrap();
                        parents.push(child);
                    }

                    let start = std::time::Instant::now();
                    service.set_as_root(branch).await.unwrap();
                    total += start.elapsed();
                }
                total
            })
        });
    });

    group.finish();
}

criterion_group!(benches, bench_build_complete_tree, bench_cascade_move);
criterion_main!(benches);
