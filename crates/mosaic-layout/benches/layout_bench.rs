//! Benchmarks for split-tree editing, relayout and drop resolution.
//!
//! Run with: cargo bench -p mosaic-layout

use std::collections::VecDeque;
use std::hint::black_box;
use std::sync::Arc;

use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use mosaic_layout::{
    DropQuery, LocationHint, PanelId, PanelKeyStrategy, Point, Put, Size, SplitTree,
};

const WIDTH: f64 = 1920.0;
const HEIGHT: f64 = 1080.0;

/// Balanced tree of `panel_count` panels, alternating column and row splits.
fn build_tree(panel_count: usize) -> SplitTree {
    assert!(panel_count >= 1, "benchmark tree requires at least one panel");
    let mut tree = SplitTree::new().with_placeholder_strategy(Arc::new(PanelKeyStrategy));
    tree.on_container_resized(WIDTH, HEIGHT);
    let _ = tree
        .insert(PanelId::new("panel-0"), LocationHint::Anywhere)
        .expect("first panel should insert");

    let mut queue = VecDeque::from([PanelId::new("panel-0")]);
    for idx in 1..panel_count {
        let target = queue
            .pop_front()
            .expect("queue should always provide a target panel");
        let put = if idx % 2 == 0 { Put::Bottom } else { Put::Right };
        let panel = PanelId::new(format!("panel-{idx}"));
        let _ = tree
            .insert(
                panel.clone(),
                LocationHint::Beside {
                    panel: target.clone(),
                    put,
                    ratio: None,
                },
            )
            .expect("deterministic bench insert should succeed");
        queue.push_back(target);
        queue.push_back(panel);
    }
    let _ = tree.take_events();
    tree
}

fn bench_insert_stream(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout/insert_stream");

    for panel_count in [8usize, 32, 128] {
        group.bench_with_input(
            BenchmarkId::from_parameter(panel_count),
            &panel_count,
            |b, &panel_count| b.iter(|| black_box(build_tree(panel_count).state_hash())),
        );
    }

    group.finish();
}

fn bench_remove_and_restore(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout/remove_restore");
    let base = build_tree(32);
    let panels = base.panels();

    group.bench_function("remove_all", |b| {
        b.iter_batched(
            || base.clone(),
            |mut tree| {
                for panel in &panels {
                    let _ = tree.remove(panel).expect("panel should be removable");
                }
                black_box(tree.node_count());
            },
            BatchSize::SmallInput,
        );
    });

    group.bench_function("remove_then_reinsert", |b| {
        b.iter_batched(
            || base.clone(),
            |mut tree| {
                let panel = &panels[panels.len() / 2];
                let _ = tree.remove(panel).expect("panel should be removable");
                let outcome = tree
                    .insert(panel.clone(), LocationHint::Anywhere)
                    .expect("panel should return to its placeholder");
                black_box(outcome.after_hash);
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

fn bench_relayout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout/relayout");

    for panel_count in [8usize, 32, 128] {
        let base = build_tree(panel_count);
        group.bench_with_input(
            BenchmarkId::from_parameter(panel_count),
            &base,
            |b, base| {
                b.iter_batched(
                    || base.clone(),
                    |mut tree| {
                        tree.on_container_resized(black_box(1280.0), black_box(720.0));
                        black_box(tree.bounds_of(&PanelId::new("panel-0")));
                    },
                    BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

fn bench_resolve_drop(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout/resolve_drop");
    let points = (0..64)
        .map(|idx| {
            let x = (idx as f64 * 37.0) % WIDTH;
            let y = (idx as f64 * 53.0) % HEIGHT;
            Point::new(x, y)
        })
        .collect::<Vec<_>>();

    for panel_count in [8usize, 128] {
        let tree = build_tree(panel_count);
        group.bench_with_input(
            BenchmarkId::from_parameter(panel_count),
            &tree,
            |b, tree| {
                b.iter(|| {
                    for point in &points {
                        let query = DropQuery::at(*point)
                            .moving(PanelId::new("panel-1"), Some(Size::new(320.0, 240.0)));
                        black_box(tree.resolve_drop(&query));
                    }
                });
            },
        );
    }

    group.finish();
}

fn bench_placeholder_map(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout/placeholder_map");
    let source = build_tree(64);
    let map = source.export_placeholders();

    group.bench_function("export", |b| {
        b.iter(|| black_box(source.export_placeholders().entries.len()));
    });

    group.bench_function("import", |b| {
        b.iter_batched(
            || SplitTree::new().with_placeholder_strategy(Arc::new(PanelKeyStrategy)),
            |mut tree| {
                tree.import_placeholders(&map)
                    .expect("exported map should import");
                black_box(tree.node_count());
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_insert_stream,
    bench_remove_and_restore,
    bench_relayout,
    bench_resolve_drop,
    bench_placeholder_map,
);
criterion_main!(benches);
