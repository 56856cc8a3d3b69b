//! Divider & resize manager.
//!
//! Bounds are recomputed top-down from the root's container size. Ordinary
//! resizes scale proportionally and leave dividers alone. Panels with a
//! [`LockedSize`] are different: every relayout aggregates their demands
//! bottom-up and then rewrites the dividers above them so they keep their
//! pixel extent while siblings absorb the difference.

use std::collections::BTreeSet;

use mosaic_core::{Bounds, PanelId, PixelRect, Size};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::LayoutFailure;
use crate::node::{NodeId, NodeKind, Orientation};
use crate::tree::{LayoutEvent, SplitTree};

/// Pixel size a panel must keep. `None` leaves that axis flexible.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LockedSize {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

impl LockedSize {
    #[must_use]
    pub const fn new(width: Option<f64>, height: Option<f64>) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub const fn exact(size: Size) -> Self {
        Self::new(Some(size.width), Some(size.height))
    }

    /// Drop non-finite axes and clamp negative ones to zero.
    #[must_use]
    pub fn sanitized(self) -> Self {
        fn axis(value: Option<f64>) -> Option<f64> {
            value.filter(|v| v.is_finite()).map(|v| v.max(0.0))
        }
        Self {
            width: axis(self.width),
            height: axis(self.height),
        }
    }
}

/// Change a locked panel asks of its ancestors, in root ratio space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ResizeRequest {
    pub delta_width: f64,
    pub delta_height: f64,
}

impl ResizeRequest {
    #[must_use]
    pub const fn new(delta_width: f64, delta_height: f64) -> Self {
        Self {
            delta_width,
            delta_height,
        }
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.delta_width == 0.0 && self.delta_height == 0.0
    }

    /// Per axis, the delta with the largest magnitude. Stacked groups report
    /// this over their visible children.
    pub fn strongest(
        requests: impl IntoIterator<Item = ResizeRequest>,
    ) -> Option<ResizeRequest> {
        requests.into_iter().reduce(|acc, next| ResizeRequest {
            delta_width: stronger(acc.delta_width, next.delta_width),
            delta_height: stronger(acc.delta_height, next.delta_height),
        })
    }
}

fn stronger(a: f64, b: f64) -> f64 {
    if b.abs() > a.abs() { b } else { a }
}

fn ratio_delta(pixels: f64, factor: f64) -> f64 {
    if factor > 0.0 { pixels / factor } else { 0.0 }
}

/// Aggregated lock demand of a subtree, in pixels.
#[derive(Debug, Clone, Copy, Default)]
struct Demand {
    width: Option<f64>,
    height: Option<f64>,
}

impl Demand {
    fn along(self, orientation: Orientation) -> Option<f64> {
        match orientation {
            Orientation::Horizontal => self.width,
            Orientation::Vertical => self.height,
        }
    }
}

fn max_opt(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

fn sum_opt(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a + b),
        _ => None,
    }
}

/// Split `area` between two children. An invisible child gets a zero-extent
/// strip at the edge and its visible sibling gets everything.
pub(crate) fn split_bounds(
    area: Bounds,
    orientation: Orientation,
    divider: f64,
    first_visible: bool,
    second_visible: bool,
) -> (Bounds, Bounds) {
    let share = match (first_visible, second_visible) {
        (true, false) => 1.0,
        (false, true) => 0.0,
        _ => divider,
    };
    match orientation {
        Orientation::Horizontal => {
            let first = area.width * share;
            (
                Bounds::new(area.x, area.y, first, area.height),
                Bounds::new(area.x + first, area.y, area.width - first, area.height),
            )
        }
        Orientation::Vertical => {
            let first = area.height * share;
            (
                Bounds::new(area.x, area.y, area.width, first),
                Bounds::new(area.x, area.y + first, area.width, area.height - first),
            )
        }
    }
}

impl SplitTree {
    /// Container pixel size currently applied to the root.
    #[must_use]
    pub fn container_size(&self) -> Size {
        match self.nodes.get(&NodeId::ROOT).map(|record| &record.kind) {
            Some(NodeKind::Root(root)) => Size::new(root.width_factor, root.height_factor),
            _ => Size::default(),
        }
    }

    /// The container was resized to `width` x `height` pixels.
    ///
    /// Negative or non-finite dimensions are treated as zero.
    pub fn on_container_resized(&mut self, width: f64, height: f64) {
        let requested = Size::new(width, height);
        let size = Size::new(
            if width.is_finite() { width } else { 0.0 },
            if height.is_finite() { height } else { 0.0 },
        )
        .clamped();
        if size != requested {
            tracing::warn!(
                target: "mosaic.layout",
                width,
                height,
                "container size clamped"
            );
        }
        if let Some(NodeKind::Root(root)) = self
            .nodes
            .get_mut(&NodeId::ROOT)
            .map(|record| &mut record.kind)
        {
            root.width_factor = size.width;
            root.height_factor = size.height;
        }
        tracing::debug!(
            target: "mosaic.layout",
            width = size.width,
            height = size.height,
            "container resized"
        );
        self.request_relayout();
    }

    /// Last solved pixel rectangle of `panel`.
    #[must_use]
    pub fn bounds_of(&self, panel: &PanelId) -> Option<PixelRect> {
        let leaf = self.leaf_of(panel)?;
        self.nodes.get(&leaf).map(|record| record.bounds.to_pixels())
    }

    #[must_use]
    pub fn locked_size(&self, panel: &PanelId) -> Option<LockedSize> {
        self.locks.get(panel).copied()
    }

    /// Keep `panel` at `size` pixels across resizes.
    ///
    /// Returns the change the lock asks of the panel's ancestors, or `None`
    /// when the panel already has that size.
    pub fn lock_resize(
        &mut self,
        panel: &PanelId,
        size: LockedSize,
    ) -> Result<Option<ResizeRequest>, LayoutFailure> {
        let leaf = self
            .leaf_of(panel)
            .ok_or_else(|| LayoutFailure::MissingPanel {
                panel: panel.clone(),
            })?;
        let request = self.store_lock(leaf, size)?;
        self.request_relayout();
        Ok((!request.is_zero()).then_some(request))
    }

    /// Lock every leaf in `leaves` to `size` and return the strongest
    /// request among them.
    pub fn lock_leaves(
        &mut self,
        leaves: &BTreeSet<NodeId>,
        size: LockedSize,
    ) -> Result<Option<ResizeRequest>, LayoutFailure> {
        let mut requests = Vec::with_capacity(leaves.len());
        for leaf in leaves {
            requests.push(self.store_lock(*leaf, size)?);
        }
        self.request_relayout();
        Ok(ResizeRequest::strongest(requests).filter(|request| !request.is_zero()))
    }

    /// Release `panel`'s lock. Returns whether one was held.
    pub fn unlock(&mut self, panel: &PanelId) -> bool {
        let released = self.locks.remove(panel).is_some();
        if released {
            tracing::debug!(target: "mosaic.layout", panel = %panel, "lock released");
            self.request_relayout();
        }
        released
    }

    fn store_lock(
        &mut self,
        leaf: NodeId,
        size: LockedSize,
    ) -> Result<ResizeRequest, LayoutFailure> {
        let record = self
            .nodes
            .get(&leaf)
            .ok_or(LayoutFailure::MissingNode { node_id: leaf })?;
        let panel = record
            .panel()
            .cloned()
            .ok_or(LayoutFailure::InvalidTarget { node_id: leaf })?;
        let sanitized = size.sanitized();
        if sanitized != size {
            tracing::warn!(
                target: "mosaic.layout",
                panel = %panel,
                "locked size clamped"
            );
        }

        let current = self.solved_bounds(leaf);
        let container = self.container_size();
        let request = ResizeRequest::new(
            sanitized
                .width
                .map_or(0.0, |w| ratio_delta(w - current.width, container.width)),
            sanitized
                .height
                .map_or(0.0, |h| ratio_delta(h - current.height, container.height)),
        );
        tracing::debug!(
            target: "mosaic.layout",
            panel = %panel,
            delta_width = request.delta_width,
            delta_height = request.delta_height,
            "lock stored"
        );
        let _ = self.locks.insert(panel, sanitized);
        Ok(request)
    }

    /// Bounds `node` gets from the current dividers, whether or not a
    /// relayout has run since the last edit.
    fn solved_bounds(&self, node: NodeId) -> Bounds {
        let mut chain = vec![node];
        let mut cursor = node;
        while let Some(parent) = self.nodes.get(&cursor).and_then(|record| record.parent) {
            chain.push(parent);
            cursor = parent;
        }

        let mut area = Bounds::from_size(self.container_size());
        for pair in chain.windows(2).rev() {
            let (child, parent) = (pair[0], pair[1]);
            let Some(NodeKind::Split(split)) = self.nodes.get(&parent).map(|record| &record.kind)
            else {
                continue;
            };
            let (first, second) = split_bounds(
                area,
                split.orientation,
                split.divider,
                self.is_visible(split.first),
                self.is_visible(split.second),
            );
            area = if split.first == child { first } else { second };
        }
        area
    }

    pub(crate) fn request_relayout(&mut self) {
        if self.freeze_depth > 0 {
            self.relayout_pending = true;
            return;
        }
        self.relayout();
    }

    /// Whether each node's subtree contains a leaf.
    pub(crate) fn visibility(&self) -> FxHashMap<NodeId, bool> {
        let order = self.iter().map(|view| view.id()).collect::<Vec<_>>();
        let mut visible = FxHashMap::default();
        for id in order.into_iter().rev() {
            let Some(record) = self.nodes.get(&id) else {
                continue;
            };
            let shown = match &record.kind {
                NodeKind::Leaf(_) => true,
                NodeKind::Placeholder(_) => false,
                NodeKind::Split(_) | NodeKind::Root(_) => record
                    .kind
                    .children()
                    .any(|child| visible.get(&child).copied().unwrap_or(false)),
            };
            let _ = visible.insert(id, shown);
        }
        visible
    }

    pub(crate) fn is_visible(&self, node: NodeId) -> bool {
        self.iter_from(node)
            .any(|view| matches!(view.kind(), NodeKind::Leaf(_)))
    }

    fn lock_demands(&self, visible: &FxHashMap<NodeId, bool>) -> FxHashMap<NodeId, Demand> {
        let mut demands: FxHashMap<NodeId, Demand> = FxHashMap::default();
        if self.locks.is_empty() {
            return demands;
        }
        let order = self.iter().map(|view| view.id()).collect::<Vec<_>>();
        for id in order.into_iter().rev() {
            let Some(record) = self.nodes.get(&id) else {
                continue;
            };
            let demand = match &record.kind {
                NodeKind::Leaf(leaf) => self
                    .locks
                    .get(&leaf.panel)
                    .map(|lock| Demand {
                        width: lock.width,
                        height: lock.height,
                    })
                    .unwrap_or_default(),
                NodeKind::Split(split) => {
                    let shown = |child: NodeId| visible.get(&child).copied().unwrap_or(false);
                    let first = demands.get(&split.first).copied().unwrap_or_default();
                    let second = demands.get(&split.second).copied().unwrap_or_default();
                    match (shown(split.first), shown(split.second)) {
                        (true, false) => first,
                        (false, true) => second,
                        _ => match split.orientation {
                            Orientation::Horizontal => Demand {
                                width: sum_opt(first.width, second.width),
                                height: max_opt(first.height, second.height),
                            },
                            Orientation::Vertical => Demand {
                                width: max_opt(first.width, second.width),
                                height: sum_opt(first.height, second.height),
                            },
                        },
                    }
                }
                NodeKind::Placeholder(_) | NodeKind::Root(_) => Demand::default(),
            };
            if demand.width.is_some() || demand.height.is_some() {
                let _ = demands.insert(id, demand);
            }
        }
        demands
    }

    /// Recompute every node's bounds from the container size, rewriting
    /// dividers above locked panels.
    pub(crate) fn relayout(&mut self) {
        self.relayout_pending = false;
        let container = self.container_size();
        let area = Bounds::from_size(container);
        if let Some(root) = self.nodes.get_mut(&NodeId::ROOT) {
            root.bounds = area;
        }

        let visible = self.visibility();
        let demands = self.lock_demands(&visible);
        let shown = |id: NodeId| visible.get(&id).copied().unwrap_or(false);
        let floor = self.config.lock_floor;

        let mut stack = Vec::new();
        if let Some(child) = self.root_child() {
            stack.push((child, area));
        }
        while let Some((id, bounds)) = stack.pop() {
            let Some(record) = self.nodes.get_mut(&id) else {
                continue;
            };
            record.bounds = bounds;
            let NodeKind::Split(split) = &mut record.kind else {
                continue;
            };

            let first_visible = shown(split.first);
            let second_visible = shown(split.second);
            if first_visible && second_visible {
                let extent = match split.orientation {
                    Orientation::Horizontal => bounds.width,
                    Orientation::Vertical => bounds.height,
                };
                let want_first = demands
                    .get(&split.first)
                    .and_then(|demand| demand.along(split.orientation));
                let want_second = demands
                    .get(&split.second)
                    .and_then(|demand| demand.along(split.orientation));
                let locked = match (want_first, want_second) {
                    (Some(a), Some(b)) if a + b > 0.0 => Some(a / (a + b)),
                    (Some(a), None) if extent > 0.0 => Some(a / extent),
                    (None, Some(b)) if extent > 0.0 => Some(1.0 - b / extent),
                    _ => None,
                };
                if let Some(divider) = locked {
                    let clamped = divider.clamp(floor, 1.0 - floor).clamp(0.0, 1.0);
                    if clamped != divider {
                        tracing::warn!(
                            target: "mosaic.layout",
                            node = %id,
                            requested = divider,
                            applied = clamped,
                            "locked resize clamped"
                        );
                    }
                    split.divider = clamped;
                }
            }

            let (first, second) = split_bounds(
                bounds,
                split.orientation,
                split.divider,
                first_visible,
                second_visible,
            );
            stack.push((split.second, second));
            stack.push((split.first, first));
        }

        tracing::debug!(
            target: "mosaic.layout",
            width = container.width,
            height = container.height,
            locks = self.locks.len(),
            "relayout"
        );
        self.events.push(LayoutEvent::Relayout {
            width: container.width,
            height: container.height,
        });
    }
}
