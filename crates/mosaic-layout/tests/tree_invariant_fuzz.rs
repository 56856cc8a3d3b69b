//! Property/fuzz-style invariants for split-tree operation streams.
//!
//! Random operation streams run against the public API. After every step the
//! tree must validate, children must tile their split exactly, and a repeated
//! resize must not move anything. Replays are compared by blake3 digest.

use std::sync::Arc;

use mosaic_layout::{
    DropQuery, LayoutConfig, LayoutOperation, LocationHint, LockedSize, NodeId, NodeKind,
    Orientation, PanelId, PanelKeyStrategy, PlaceholderId, Point, Put, Size, SplitTree,
};
use proptest::prelude::*;

const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone)]
struct Lcg {
    state: u64,
}

impl Lcg {
    fn new(seed: u64) -> Self {
        Self {
            state: seed ^ 0x9E37_79B9_7F4A_7C15,
        }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        self.state
    }

    fn choose_index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0);
        (self.next_u64() % len as u64) as usize
    }

    fn next_unit(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1_u64 << 53) as f64
    }

    fn next_range(&mut self, min: f64, max: f64) -> f64 {
        min + (max - min) * self.next_unit()
    }
}

fn random_put(rng: &mut Lcg) -> Put {
    [Put::Left, Put::Right, Put::Top, Put::Bottom, Put::Center][rng.choose_index(5)]
}

fn split_ids(tree: &SplitTree) -> Vec<NodeId> {
    tree.nodes()
        .filter(|record| matches!(record.kind, NodeKind::Split(_)))
        .map(|record| record.id)
        .collect()
}

fn random_hint(tree: &SplitTree, rng: &mut Lcg) -> LocationHint {
    let panels = tree.panels();
    match rng.choose_index(4) {
        1 if !panels.is_empty() => LocationHint::Beside {
            panel: panels[rng.choose_index(panels.len())].clone(),
            put: random_put(rng),
            ratio: (rng.choose_index(2) == 0).then(|| rng.next_range(-0.2, 1.2)),
        },
        2 => {
            let size = tree.container_size();
            let query = DropQuery::at(Point::new(
                rng.next_range(0.0, size.width),
                rng.next_range(0.0, size.height),
            ));
            tree.resolve_drop(&query)
                .map_or(LocationHint::Anywhere, LocationHint::Drop)
        }
        3 => LocationHint::Placeholder {
            placeholder: PlaceholderId::new(format!("p{}", rng.choose_index(12))),
        },
        _ => LocationHint::Anywhere,
    }
}

fn random_operation(tree: &SplitTree, rng: &mut Lcg) -> LayoutOperation {
    let panels = tree.panels();
    let splits = split_ids(tree);
    match rng.choose_index(6) {
        1 if !panels.is_empty() => LayoutOperation::Remove {
            panel: panels[rng.choose_index(panels.len())].clone(),
        },
        2 if !panels.is_empty() => LayoutOperation::Move {
            panel: panels[rng.choose_index(panels.len())].clone(),
            hint: random_hint(tree, rng),
        },
        3 if !splits.is_empty() => LayoutOperation::SetDivider {
            node: splits[rng.choose_index(splits.len())],
            divider: rng.next_range(-0.5, 1.5),
        },
        4 => {
            let nodes = tree.nodes().map(|record| record.id).collect::<Vec<_>>();
            LayoutOperation::InsertPlaceholder {
                target: nodes[rng.choose_index(nodes.len())],
                placeholder: PlaceholderId::new(format!("ghost{}", rng.choose_index(6))),
            }
        }
        _ => LayoutOperation::Insert {
            panel: PanelId::new(format!("p{}", rng.choose_index(12))),
            hint: random_hint(tree, rng),
        },
    }
}

fn extent(bounds: mosaic_layout::Bounds, orientation: Orientation) -> f64 {
    match orientation {
        Orientation::Horizontal => bounds.width,
        Orientation::Vertical => bounds.height,
    }
}

fn assert_children_tile_splits(tree: &SplitTree) {
    for record in tree.nodes() {
        let NodeKind::Split(split) = &record.kind else {
            continue;
        };
        assert!((0.0..=1.0).contains(&split.divider));
        let first = tree.node(split.first).expect("first child").bounds;
        let second = tree.node(split.second).expect("second child").bounds;
        let sum = extent(first, split.orientation) + extent(second, split.orientation);
        assert!(
            (sum - extent(record.bounds, split.orientation)).abs() < EPSILON,
            "children of {} do not tile it: {first:?} + {second:?} vs {:?}",
            record.id,
            record.bounds
        );
        assert!(extent(first, split.orientation) >= 0.0);
        assert!(extent(second, split.orientation) >= 0.0);
    }
}

fn assert_resize_idempotent(tree: &mut SplitTree) {
    let size = tree.container_size();
    let before = tree
        .nodes()
        .map(|record| (record.id, record.bounds))
        .collect::<Vec<_>>();
    tree.on_container_resized(size.width, size.height);
    let after = tree
        .nodes()
        .map(|record| (record.id, record.bounds))
        .collect::<Vec<_>>();
    assert_eq!(before, after, "repeated resize moved nodes");
}

fn digest(tree: &SplitTree) -> blake3::Hash {
    let records = tree.nodes().collect::<Vec<_>>();
    let bytes = serde_json::to_vec(&records).expect("serialize records");
    blake3::hash(&bytes)
}

fn run_sequence(seed: u64, steps: usize) -> (SplitTree, Vec<LayoutOperation>) {
    let mut tree = SplitTree::new().with_placeholder_strategy(Arc::new(PanelKeyStrategy));
    tree.on_container_resized(640.0, 480.0);
    let mut rng = Lcg::new(seed);
    let mut applied = Vec::with_capacity(steps);

    for step in 0..steps {
        let operation = random_operation(&tree, &mut rng);
        let before = tree.state_hash();
        match tree.apply_operation(step as u64 + 1, operation.clone()) {
            Ok(outcome) => {
                assert_eq!(outcome.before_hash, before);
                assert_eq!(outcome.after_hash, tree.state_hash());
            }
            Err(err) => assert_eq!(
                tree.state_hash(),
                before,
                "rejected operation changed the tree at step {step}, seed={seed}: {err}"
            ),
        }
        tree.validate().unwrap_or_else(|err| {
            panic!("invalid tree at step {step}, seed={seed}, op={operation:?}: {err}")
        });
        assert_children_tile_splits(&tree);
        if step % 7 == 0 {
            tree.on_container_resized(rng.next_range(0.0, 1200.0), rng.next_range(0.0, 900.0));
            assert_children_tile_splits(&tree);
        }
        assert_resize_idempotent(&mut tree);
        applied.push(operation);
    }
    (tree, applied)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn random_operation_sequences_preserve_invariants(
        seed in any::<u64>(),
        steps in 20usize..120,
    ) {
        let (tree, _) = run_sequence(seed, steps);
        tree.validate().expect("final tree valid");
    }

    #[test]
    fn random_operation_sequences_replay_deterministically(
        seed in any::<u64>(),
        steps in 20usize..80,
    ) {
        let (first, _) = run_sequence(seed, steps);
        let (second, _) = run_sequence(seed, steps);
        prop_assert_eq!(first.state_hash(), second.state_hash());
        prop_assert_eq!(digest(&first), digest(&second));
    }

    #[test]
    fn export_import_round_trip_preserves_placeholders(
        seed in any::<u64>(),
        steps in 10usize..60,
    ) {
        let (tree, _) = run_sequence(seed, steps);
        let map = tree.export_placeholders();
        let mut restored = SplitTree::new().with_placeholder_strategy(Arc::new(PanelKeyStrategy));
        restored.import_placeholders(&map).expect("exported map imports");
        restored.validate().expect("restored tree valid");
        for id in map.placeholders() {
            prop_assert!(restored.placeholder_owner(id).is_some(), "lost {id}");
        }
    }

    #[test]
    fn locked_width_never_starves_sibling(
        container in 1.0f64..2000.0,
        locked in 0.0f64..4000.0,
        floor in 0.0f64..0.45,
    ) {
        let config = LayoutConfig {
            lock_floor: floor,
            ..LayoutConfig::default()
        };
        let mut tree = SplitTree::with_config(config).expect("config");
        let _ = tree.insert(PanelId::new("a"), LocationHint::Anywhere).expect("a");
        let _ = tree
            .insert(
                PanelId::new("b"),
                LocationHint::Beside {
                    panel: PanelId::new("a"),
                    put: Put::Right,
                    ratio: None,
                },
            )
            .expect("b");
        tree.on_container_resized(container, 100.0);
        let _ = tree
            .lock_resize(&PanelId::new("a"), LockedSize::exact(Size::new(locked, 100.0)))
            .expect("lock");

        let a = tree.leaf_of(&PanelId::new("a")).and_then(|id| tree.node(id)).expect("a").bounds;
        let b = tree.leaf_of(&PanelId::new("b")).and_then(|id| tree.node(id)).expect("b").bounds;
        prop_assert!(a.width <= container + EPSILON);
        prop_assert!(b.width + EPSILON >= floor * container);
    }
}

#[test]
fn seed_corpus_preserves_invariants() {
    let seeds = [
        0_u64,
        1,
        2,
        3,
        5,
        8,
        13,
        21,
        34,
        55,
        89,
        144,
        u32::MAX as u64,
        (u32::MAX as u64) + 1,
        u64::MAX - 1,
        u64::MAX,
    ];

    for seed in seeds {
        let (tree, _) = run_sequence(seed, 180);
        tree.validate().expect("valid after seed corpus run");
    }
}
