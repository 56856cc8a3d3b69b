//! Drop resolver: classify a point against the tree.
//!
//! Resolution is read-only. The returned [`PutInfo`] is committed by handing
//! it to [`SplitTree::insert`] or [`SplitTree::move_panel`] as
//! [`crate::LocationHint::Drop`].

use mosaic_core::{PanelId, Point, Size};
use serde::{Deserialize, Serialize};

use crate::node::{NodeId, NodeKind, Orientation, Put, Slot};
use crate::tree::SplitTree;

/// Where a dropped panel would go.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PutInfo {
    pub target: NodeId,
    pub put: Put,
    /// Divider of the split the drop would create (share of the first
    /// child). `1.0` for center drops.
    pub divider: f64,
}

/// Input to [`SplitTree::resolve_drop`].
#[derive(Debug, Clone, PartialEq)]
pub struct DropQuery {
    pub point: Point,
    /// Panel being dragged; its own leaf is never a target.
    pub moved: Option<PanelId>,
    /// Last known pixel size of the dragged panel. When absent, a dragged
    /// panel that is still in the tree is measured by its solved bounds.
    pub moved_size: Option<Size>,
}

impl DropQuery {
    #[must_use]
    pub fn at(point: Point) -> Self {
        Self {
            point,
            moved: None,
            moved_size: None,
        }
    }

    #[must_use]
    pub fn moving(mut self, panel: PanelId, size: Option<Size>) -> Self {
        self.moved = Some(panel);
        self.moved_size = size;
        self
    }
}

impl SplitTree {
    /// Resolve a drop at `query.point`, or `None` when nothing can take it.
    #[must_use]
    pub fn resolve_drop(&self, query: &DropQuery) -> Option<PutInfo> {
        let point = query.point;
        let root_bounds = self.node(self.root())?.bounds;
        if !root_bounds.contains(point) {
            tracing::trace!(
                target: "mosaic.layout",
                x = point.x,
                y = point.y,
                "drop outside container"
            );
            return None;
        }

        let visible = self.visibility();
        let shown = |id: NodeId| visible.get(&id).copied().unwrap_or(false);
        let Some(mut current) = self.root_child().filter(|child| shown(*child)) else {
            return Some(PutInfo {
                target: self.root(),
                put: Put::Center,
                divider: 1.0,
            });
        };

        loop {
            let record = self.node(current)?;
            match &record.kind {
                NodeKind::Split(split) => {
                    let first_hit = self
                        .node(split.first)
                        .is_some_and(|first| first.bounds.contains(point));
                    current = if shown(split.first) && (first_hit || !shown(split.second)) {
                        split.first
                    } else {
                        split.second
                    };
                }
                NodeKind::Leaf(_) | NodeKind::Placeholder(_) => break,
                NodeKind::Root(_) => return None,
            }
        }

        let record = self.node(current)?;
        if let (Some(moved), Some(panel)) = (&query.moved, record.panel())
            && moved == panel
        {
            tracing::trace!(target: "mosaic.layout", panel = %panel, "drop onto itself");
            return None;
        }

        let bounds = record.bounds;
        let relative = bounds.relative(point);
        let put = self.zone(relative);
        let divider = match put.split() {
            None => 1.0,
            Some((orientation, slot)) => {
                let extent = match orientation {
                    Orientation::Horizontal => bounds.width,
                    Orientation::Vertical => bounds.height,
                };
                let moved_size = query.moved_size.or_else(|| {
                    query
                        .moved
                        .as_ref()
                        .and_then(|panel| self.leaf_of(panel))
                        .and_then(|leaf| self.node(leaf))
                        .map(|record| record.bounds.size())
                });
                let wanted = moved_size.map(|size| match orientation {
                    Orientation::Horizontal => size.width,
                    Orientation::Vertical => size.height,
                });
                let share = match wanted {
                    Some(wanted) if extent > 0.0 => wanted / extent,
                    _ => 0.5,
                };
                let share = self.config.clamp_share(share);
                match slot {
                    Slot::First => share,
                    Slot::Second => 1.0 - share,
                }
            }
        };

        tracing::trace!(
            target: "mosaic.layout",
            target_node = %current,
            put = ?put,
            divider,
            "drop resolved"
        );
        Some(PutInfo {
            target: current,
            put,
            divider,
        })
    }

    /// Zone of a point given as fractions of the hit node's bounds. Corners
    /// pick the nearer edge; ties go left, right, top, bottom.
    fn zone(&self, relative: Point) -> Put {
        let band = self.config.edge_band;
        let candidates = [
            (Put::Left, relative.x),
            (Put::Right, 1.0 - relative.x),
            (Put::Top, relative.y),
            (Put::Bottom, 1.0 - relative.y),
        ];
        let mut best: Option<(Put, f64)> = None;
        for (put, distance) in candidates {
            if distance >= band {
                continue;
            }
            if best.is_none_or(|(_, current)| distance < current) {
                best = Some((put, distance));
            }
        }
        best.map_or(Put::Center, |(put, _)| put)
    }
}
