//! End-to-end docking scenarios through the public API.
//!
//! Run:
//!   cargo test -p mosaic-layout --test scenarios

use std::collections::BTreeMap;
use std::sync::Arc;

use mosaic_layout::{
    AsideContainer, AsideContext, AsideRequest, AsideState, Combiner, DropQuery, LayoutEvent,
    LayoutFailure, Location, LocationHint, LocationProperty, LockedSize, NodeKind, Orientation,
    PanelId, PanelKeyStrategy, PixelRect, PlaceholderId, Point, Put, SplitTree,
};

fn panel(key: &str) -> PanelId {
    PanelId::new(key)
}

fn tracked() -> SplitTree {
    SplitTree::new().with_placeholder_strategy(Arc::new(PanelKeyStrategy))
}

fn right_of(key: &str) -> LocationHint {
    LocationHint::Beside {
        panel: panel(key),
        put: Put::Right,
        ratio: None,
    }
}

/// P1 then P2 to its right.
fn two_columns(tree: &mut SplitTree) {
    let _ = tree
        .insert(panel("p1"), LocationHint::Anywhere)
        .expect("p1 into empty tree");
    let _ = tree
        .insert(panel("p2"), right_of("p1"))
        .expect("p2 right of p1");
}

#[test]
fn scenario_a_first_leaf_then_horizontal_split() {
    let mut tree = SplitTree::new();
    let p1 = tree
        .insert(panel("p1"), LocationHint::Anywhere)
        .expect("p1")
        .node
        .expect("leaf");
    assert_eq!(tree.root_child(), Some(p1));
    assert!(matches!(
        tree.node(p1).map(|record| &record.kind),
        Some(NodeKind::Leaf(_))
    ));

    let p2 = tree
        .insert(panel("p2"), right_of("p1"))
        .expect("p2")
        .node
        .expect("leaf");
    let split = tree.root_child().expect("split under root");
    match &tree.node(split).expect("split").kind {
        NodeKind::Split(node) => {
            assert_eq!(node.orientation, Orientation::Horizontal);
            assert_eq!(node.divider, 0.5);
            assert_eq!(node.first, p1);
            assert_eq!(node.second, p2);
        }
        other => panic!("expected split, got {other:?}"),
    }
    tree.validate().expect("valid");
}

#[test]
fn scenario_b_tracked_removal_leaves_placeholder() {
    let mut tree = tracked();
    two_columns(&mut tree);
    let p1 = tree.leaf_of(&panel("p1")).expect("p1 leaf");

    let outcome = tree.remove(&panel("p1")).expect("remove p1");
    assert_eq!(outcome.node, Some(p1));

    let split = tree.root_child().expect("split survives");
    match &tree.node(split).expect("split").kind {
        NodeKind::Split(node) => {
            assert_eq!(node.first, p1);
            assert!(matches!(
                tree.node(node.first).map(|record| &record.kind),
                Some(NodeKind::Placeholder(_))
            ));
            assert_eq!(
                tree.node(node.second).and_then(|record| record.panel()),
                Some(&panel("p2"))
            );
        }
        other => panic!("expected split, got {other:?}"),
    }
    assert_eq!(tree.placeholder_owner(&PlaceholderId::new("p1")), Some(p1));
}

#[test]
fn scenario_c_resize_scales_bounds() {
    let mut tree = SplitTree::new();
    two_columns(&mut tree);
    tree.on_container_resized(100.0, 100.0);
    tree.on_container_resized(200.0, 100.0);

    assert_eq!(tree.bounds_of(&panel("p1")), Some(PixelRect::new(0, 0, 100, 100)));
    assert_eq!(tree.bounds_of(&panel("p2")), Some(PixelRect::new(100, 0, 100, 100)));
}

#[test]
fn scenario_d_corner_drop_resolves_left() {
    let mut tree = SplitTree::new();
    let leaf = tree
        .insert(panel("p1"), LocationHint::Anywhere)
        .expect("p1")
        .node
        .expect("leaf");
    tree.on_container_resized(100.0, 100.0);

    let info = tree
        .resolve_drop(&DropQuery::at(Point::new(5.0, 5.0)))
        .expect("drop target");
    assert_eq!(info.target, leaf);
    assert_eq!(info.put, Put::Left);
}

#[derive(Debug)]
struct Named(&'static str);

impl AsideContainer for Named {
    fn handle_aside(&mut self, context: &mut AsideContext<'_>) {
        context.answer(Some(custom(self.0)));
    }
}

#[derive(Debug)]
struct Station {
    parent: Named,
    child: Named,
}

impl AsideContainer for Station {
    fn handle_aside(&mut self, context: &mut AsideContext<'_>) {
        let _ = context
            .forward_parent(&mut self.parent, custom("station-in-parent"))
            .expect("parent forward");
        let _ = context
            .forward_child(&mut self.child)
            .expect("child forward");
    }
}

fn custom(name: &str) -> Location {
    Location::new(LocationProperty::Custom {
        name: name.to_owned(),
        extensions: BTreeMap::new(),
    })
}

#[test]
fn scenario_e_child_answer_is_successor_tail() {
    let mut station = Station {
        parent: Named("window"),
        child: Named("tab"),
    };
    let mut request = AsideRequest::new(
        custom("station").with_successor(custom("inner")),
        PlaceholderId::new("new-panel"),
    );
    let answer = request.execute(&mut station).expect("execute");

    let location = answer.location.expect("answered");
    assert!(matches!(
        &location.property,
        LocationProperty::Custom { name, .. } if name == "window"
    ));
    let tail = location.successor().expect("tail");
    assert!(matches!(
        &tail.property,
        LocationProperty::Custom { name, .. } if name == "tab"
    ));
    assert!(tail.successor().is_none());
    assert_eq!(request.state(), AsideState::Answered);
}

#[test]
fn removed_panel_returns_to_its_position() {
    let mut tree = tracked();
    two_columns(&mut tree);
    let _ = tree
        .insert(
            panel("p3"),
            LocationHint::Beside {
                panel: panel("p2"),
                put: Put::Bottom,
                ratio: Some(0.7),
            },
        )
        .expect("p3 under p2");
    let before = tree.location_of(&panel("p3")).expect("location");
    let leaf = tree.leaf_of(&panel("p3")).expect("leaf");

    let _ = tree.remove(&panel("p3")).expect("remove");
    let outcome = tree
        .insert(panel("p3"), LocationHint::Anywhere)
        .expect("reinsert");
    assert_eq!(outcome.node, Some(leaf));
    assert_eq!(tree.location_of(&panel("p3")), Some(before));
}

#[test]
fn move_publishes_one_event_and_keeps_lock() {
    let mut tree = SplitTree::new();
    two_columns(&mut tree);
    tree.on_container_resized(300.0, 100.0);
    let _ = tree
        .lock_resize(&panel("p1"), LockedSize::new(Some(60.0), None))
        .expect("lock");
    let _ = tree.take_events();

    let _ = tree
        .move_panel(
            &panel("p1"),
            LocationHint::Beside {
                panel: panel("p2"),
                put: Put::Right,
                ratio: None,
            },
        )
        .expect("move");
    let events = tree.take_events();
    let structural = events
        .iter()
        .filter(|event| !matches!(event, LayoutEvent::Relayout { .. }))
        .collect::<Vec<_>>();
    assert_eq!(structural.len(), 1, "events: {events:?}");
    assert!(matches!(structural[0], LayoutEvent::Moved { .. }));

    assert_eq!(tree.panels(), vec![panel("p2"), panel("p1")]);
    let p1 = tree.bounds_of(&panel("p1")).expect("p1 bounds");
    assert_eq!(p1.width, 60);
}

#[test]
fn moving_beside_itself_is_rejected_without_change() {
    let mut tree = SplitTree::new();
    two_columns(&mut tree);
    let before = tree.state_hash();
    let err = tree
        .move_panel(&panel("p1"), right_of("p1"))
        .expect_err("self move");
    assert_eq!(err.reason, LayoutFailure::CannotMoveIntoSelf { panel: panel("p1") });
    assert_eq!(tree.state_hash(), before);
}

#[test]
fn stacking_without_combiner_is_rejected() {
    let mut tree = SplitTree::new();
    let leaf = tree
        .insert(panel("p1"), LocationHint::Anywhere)
        .expect("p1")
        .node
        .expect("leaf");
    let err = tree
        .insert(
            panel("p2"),
            LocationHint::Node {
                target: leaf,
                put: Put::Center,
                ratio: None,
            },
        )
        .expect_err("no combiner");
    assert_eq!(err.reason, LayoutFailure::StackingRejected { target: leaf });
}

#[derive(Debug)]
struct Tabs;

impl Combiner for Tabs {
    fn combine(&self, existing: &PanelId, incoming: &PanelId) -> Option<PanelId> {
        Some(PanelId::new(format!("{existing}+{incoming}")))
    }
}

#[test]
fn stacking_a_locked_panel_releases_its_lock() {
    let mut tree = SplitTree::new().with_combiner(Arc::new(Tabs));
    let _ = tree.insert(panel("a"), LocationHint::Anywhere).expect("a");
    let _ = tree.insert(panel("b"), right_of("a")).expect("b");
    tree.on_container_resized(400.0, 100.0);
    let _ = tree
        .lock_resize(&panel("b"), LockedSize::new(Some(50.0), None))
        .expect("lock b");

    let _ = tree
        .move_panel(
            &panel("b"),
            LocationHint::Beside {
                panel: panel("a"),
                put: Put::Center,
                ratio: None,
            },
        )
        .expect("stack b onto a");
    assert_eq!(tree.panels(), vec![panel("a+b")]);
    assert_eq!(tree.locked_size(&panel("b")), None);

    // A later panel with the same id starts unlocked.
    let _ = tree.insert(panel("b"), right_of("a+b")).expect("b again");
    assert_eq!(tree.bounds_of(&panel("b")).map(|rect| rect.width), Some(200));
}

#[test]
fn frozen_batch_relayouts_once() {
    let mut tree = SplitTree::new();
    tree.on_container_resized(120.0, 80.0);
    let _ = tree.take_events();
    {
        let mut batch = tree.freeze();
        two_columns(&mut batch);
        let _ = batch
            .insert(panel("p3"), right_of("p2"))
            .expect("p3");
        assert!(batch.is_frozen());
    }
    let relayouts = tree
        .take_events()
        .into_iter()
        .filter(|event| matches!(event, LayoutEvent::Relayout { .. }))
        .count();
    assert_eq!(relayouts, 1);
    assert!(tree.bounds_of(&panel("p3")).is_some_and(|rect| rect.width > 0));
}
