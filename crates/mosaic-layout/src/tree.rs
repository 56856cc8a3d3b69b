//! The live split tree.
//!
//! Nodes live in an arena keyed by [`NodeId`]. Every structural edit goes
//! through [`SplitTree::apply_operation`], which runs the edit on a cloned
//! working tree and swaps it in only when the edit and the follow-up
//! [`SplitTree::validate`] both succeed. Observers therefore never see an
//! intermediate state, and a rejected edit leaves the tree untouched.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use mosaic_core::{PanelId, PlaceholderId};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::config::{LayoutConfig, LayoutConfigError};
use crate::error::{LayoutFailure, LayoutModelError, LayoutOperationError};
use crate::location::{Location, LocationHint, LocationProperty, PathStep, SplitLocation};
use crate::node::{
    LeafNode, NodeId, NodeKind, NodeRecord, Orientation, PlaceholderNode, Put, RootNode, Slot,
    SplitNode,
};
use crate::resize::LockedSize;
use crate::strategy::{Combiner, PlaceholderStrategy};
use crate::traverse::DepthFirst;

/// Structural edit applied through [`SplitTree::apply_operation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LayoutOperation {
    Insert {
        panel: PanelId,
        hint: LocationHint,
    },
    Remove {
        panel: PanelId,
    },
    /// Remove then insert, published as one edit.
    Move {
        panel: PanelId,
        hint: LocationHint,
    },
    SetDivider {
        node: NodeId,
        divider: f64,
    },
    /// Create a placeholder node carrying `placeholder` beside `target`.
    InsertPlaceholder {
        target: NodeId,
        placeholder: PlaceholderId,
    },
}

impl LayoutOperation {
    #[must_use]
    pub const fn kind(&self) -> LayoutOperationKind {
        match self {
            Self::Insert { .. } => LayoutOperationKind::Insert,
            Self::Remove { .. } => LayoutOperationKind::Remove,
            Self::Move { .. } => LayoutOperationKind::Move,
            Self::SetDivider { .. } => LayoutOperationKind::SetDivider,
            Self::InsertPlaceholder { .. } => LayoutOperationKind::InsertPlaceholder,
        }
    }
}

/// Stable operation discriminator for logs and outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutOperationKind {
    Insert,
    Remove,
    Move,
    SetDivider,
    InsertPlaceholder,
}

/// Successful operation result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutOperationOutcome {
    pub operation_id: u64,
    pub kind: LayoutOperationKind,
    /// Node that now shows the panel (insert, move), the placeholder node
    /// left behind (remove), or the node created (insert placeholder).
    pub node: Option<NodeId>,
    pub touched_nodes: Vec<NodeId>,
    pub before_hash: u64,
    pub after_hash: u64,
}

/// Change notification drained with [`SplitTree::take_events`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LayoutEvent {
    Inserted {
        panel: PanelId,
        leaf: NodeId,
    },
    Removed {
        panel: PanelId,
        placeholder: Option<NodeId>,
    },
    Moved {
        panel: PanelId,
        leaf: NodeId,
    },
    DividerChanged {
        node: NodeId,
        divider: f64,
    },
    PlaceholderInserted {
        node: NodeId,
        placeholder: PlaceholderId,
    },
    Imported {
        entries: usize,
        restored: usize,
    },
    Relayout {
        width: f64,
        height: f64,
    },
}

/// Resolved form of a [`LocationHint`].
#[derive(Debug, Clone, Copy, PartialEq)]
enum InsertPlan {
    FirstLeaf,
    Occupy(NodeId),
    Split {
        target: NodeId,
        put: Put,
        divider: f64,
    },
    Combine(NodeId),
}

/// Clamp a divider into `[0, 1]`; NaN becomes `0.5`.
pub(crate) fn sanitize_divider(divider: f64) -> f64 {
    if divider.is_nan() {
        return 0.5;
    }
    divider.clamp(0.0, 1.0)
}

/// Binary split tree holding panel references, dividers and placeholders.
#[derive(Debug, Clone)]
pub struct SplitTree {
    pub(crate) config: LayoutConfig,
    pub(crate) next_id: NodeId,
    pub(crate) nodes: BTreeMap<NodeId, NodeRecord>,
    pub(crate) panels: FxHashMap<PanelId, NodeId>,
    pub(crate) placeholder_index: FxHashMap<PlaceholderId, NodeId>,
    pub(crate) locks: BTreeMap<PanelId, LockedSize>,
    pub(crate) strategy: Option<Arc<dyn PlaceholderStrategy>>,
    pub(crate) combiner: Option<Arc<dyn Combiner>>,
    pub(crate) events: Vec<LayoutEvent>,
    pub(crate) freeze_depth: u32,
    pub(crate) relayout_pending: bool,
    operation_seq: u64,
}

impl Default for SplitTree {
    fn default() -> Self {
        Self::build(LayoutConfig::default())
    }
}

impl SplitTree {
    /// Empty tree with the default configuration and no placeholder
    /// tracking.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: LayoutConfig) -> Result<Self, LayoutConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    pub(crate) fn build(config: LayoutConfig) -> Self {
        let mut nodes = BTreeMap::new();
        let _ = nodes.insert(
            NodeId::ROOT,
            NodeRecord::new(
                NodeId::ROOT,
                None,
                NodeKind::Root(RootNode {
                    child: None,
                    width_factor: 0.0,
                    height_factor: 0.0,
                }),
            ),
        );
        Self {
            config,
            next_id: NodeId(NodeId::ROOT.0 + 1),
            nodes,
            panels: FxHashMap::default(),
            placeholder_index: FxHashMap::default(),
            locks: BTreeMap::new(),
            strategy: None,
            combiner: None,
            events: Vec::new(),
            freeze_depth: 0,
            relayout_pending: false,
            operation_seq: 0,
        }
    }

    /// Track removed panels with `strategy`.
    #[must_use]
    pub fn with_placeholder_strategy(mut self, strategy: Arc<dyn PlaceholderStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Accept [`Put::Center`] insertions onto leaves through `combiner`.
    #[must_use]
    pub fn with_combiner(mut self, combiner: Arc<dyn Combiner>) -> Self {
        self.combiner = Some(combiner);
        self
    }

    #[must_use]
    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    #[must_use]
    pub const fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Content under the root, if any.
    #[must_use]
    pub fn root_child(&self) -> Option<NodeId> {
        match self.nodes.get(&NodeId::ROOT).map(|node| &node.kind) {
            Some(NodeKind::Root(root)) => root.child,
            _ => None,
        }
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&NodeRecord> {
        self.nodes.get(&id)
    }

    /// All records ordered by id.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeRecord> {
        self.nodes.values()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn panel_count(&self) -> usize {
        self.panels.len()
    }

    /// Whether no panel is shown. Placeholders may still be present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }

    #[must_use]
    pub fn contains_panel(&self, panel: &PanelId) -> bool {
        self.panels.contains_key(panel)
    }

    /// Leaf showing `panel`.
    #[must_use]
    pub fn leaf_of(&self, panel: &PanelId) -> Option<NodeId> {
        self.panels.get(panel).copied()
    }

    /// Node whose set currently carries `placeholder`.
    #[must_use]
    pub fn placeholder_owner(&self, placeholder: &PlaceholderId) -> Option<NodeId> {
        self.placeholder_index.get(placeholder).copied()
    }

    /// Panels in depth-first (first child before second) order.
    #[must_use]
    pub fn panels(&self) -> Vec<PanelId> {
        self.iter()
            .filter_map(|view| view.panel().cloned())
            .collect()
    }

    /// Lazy depth-first traversal from the root.
    #[must_use]
    pub fn iter(&self) -> DepthFirst<'_> {
        DepthFirst::new(self, NodeId::ROOT)
    }

    /// Lazy depth-first traversal of the subtree under `start`.
    #[must_use]
    pub fn iter_from(&self, start: NodeId) -> DepthFirst<'_> {
        DepthFirst::new(self, start)
    }

    /// Drain queued change notifications.
    pub fn take_events(&mut self) -> Vec<LayoutEvent> {
        std::mem::take(&mut self.events)
    }

    /// Defer relayout until the returned guard (and every nested guard) is
    /// dropped.
    pub fn freeze(&mut self) -> FreezeGuard<'_> {
        self.freeze_depth += 1;
        FreezeGuard { tree: self }
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.freeze_depth > 0
    }

    pub(crate) fn strategy_placeholder(&self, panel: &PanelId) -> Option<PlaceholderId> {
        self.strategy
            .as_ref()
            .and_then(|strategy| strategy.placeholder_for(panel))
    }

    pub(crate) fn is_valid_placeholder(&self, placeholder: &PlaceholderId) -> bool {
        match &self.strategy {
            Some(strategy) => strategy.is_valid_placeholder(placeholder),
            None => !placeholder.is_empty(),
        }
    }

    fn next_operation_id(&mut self) -> u64 {
        self.operation_seq = self.operation_seq.wrapping_add(1);
        self.operation_seq
    }

    /// Insert `panel` where `hint` says.
    pub fn insert(
        &mut self,
        panel: PanelId,
        hint: LocationHint,
    ) -> Result<LayoutOperationOutcome, LayoutOperationError> {
        let operation_id = self.next_operation_id();
        self.apply_operation(operation_id, LayoutOperation::Insert { panel, hint })
    }

    /// Remove `panel`, leaving a placeholder behind when it is tracked.
    pub fn remove(
        &mut self,
        panel: &PanelId,
    ) -> Result<LayoutOperationOutcome, LayoutOperationError> {
        let operation_id = self.next_operation_id();
        self.apply_operation(
            operation_id,
            LayoutOperation::Remove {
                panel: panel.clone(),
            },
        )
    }

    /// Move `panel` to `hint` in one atomic edit.
    pub fn move_panel(
        &mut self,
        panel: &PanelId,
        hint: LocationHint,
    ) -> Result<LayoutOperationOutcome, LayoutOperationError> {
        let operation_id = self.next_operation_id();
        self.apply_operation(
            operation_id,
            LayoutOperation::Move {
                panel: panel.clone(),
                hint,
            },
        )
    }

    pub fn set_divider(
        &mut self,
        node: NodeId,
        divider: f64,
    ) -> Result<LayoutOperationOutcome, LayoutOperationError> {
        let operation_id = self.next_operation_id();
        self.apply_operation(operation_id, LayoutOperation::SetDivider { node, divider })
    }

    pub fn insert_placeholder(
        &mut self,
        target: NodeId,
        placeholder: PlaceholderId,
    ) -> Result<LayoutOperationOutcome, LayoutOperationError> {
        let operation_id = self.next_operation_id();
        self.apply_operation(
            operation_id,
            LayoutOperation::InsertPlaceholder {
                target,
                placeholder,
            },
        )
    }

    /// Apply one structural operation atomically.
    ///
    /// The operation is executed on a cloned working tree. On success, the
    /// mutated clone replaces `self` and its events are published; on
    /// failure, `self` is unchanged.
    pub fn apply_operation(
        &mut self,
        operation_id: u64,
        operation: LayoutOperation,
    ) -> Result<LayoutOperationOutcome, LayoutOperationError> {
        let kind = operation.kind();
        let _span = tracing::debug_span!("layout.operation", operation_id, kind = ?kind).entered();

        let before_hash = self.state_hash();
        let mut working = self.clone();
        working.events.clear();
        let mut touched = BTreeSet::new();

        let node = match working.apply_operation_inner(operation, &mut touched) {
            Ok(node) => node,
            Err(reason) => {
                tracing::warn!(
                    target: "mosaic.layout",
                    operation_id,
                    kind = ?kind,
                    reason = %reason,
                    "layout operation rejected"
                );
                return Err(LayoutOperationError {
                    operation_id,
                    kind,
                    touched_nodes: touched.into_iter().collect(),
                    before_hash,
                    after_hash: working.state_hash(),
                    reason,
                });
            }
        };

        if let Err(err) = working.validate() {
            tracing::warn!(
                target: "mosaic.layout",
                operation_id,
                kind = ?kind,
                reason = %err,
                "layout operation failed validation"
            );
            return Err(LayoutOperationError {
                operation_id,
                kind,
                touched_nodes: touched.into_iter().collect(),
                before_hash,
                after_hash: working.state_hash(),
                reason: LayoutFailure::Validation(err),
            });
        }

        let after_hash = working.state_hash();
        let staged = std::mem::take(&mut working.events);
        let mut previous = std::mem::replace(self, working);
        self.events = std::mem::take(&mut previous.events);
        self.events.extend(staged);

        tracing::debug!(
            target: "mosaic.layout",
            operation_id,
            kind = ?kind,
            touched = touched.len(),
            after_hash,
            "layout operation committed"
        );
        self.request_relayout();

        Ok(LayoutOperationOutcome {
            operation_id,
            kind,
            node,
            touched_nodes: touched.into_iter().collect(),
            before_hash,
            after_hash,
        })
    }

    fn apply_operation_inner(
        &mut self,
        operation: LayoutOperation,
        touched: &mut BTreeSet<NodeId>,
    ) -> Result<Option<NodeId>, LayoutFailure> {
        match operation {
            LayoutOperation::Insert { panel, hint } => {
                self.apply_insert(panel, hint, touched).map(Some)
            }
            LayoutOperation::Remove { panel } => self.apply_remove(panel, touched),
            LayoutOperation::Move { panel, hint } => self.apply_move(panel, hint, touched).map(Some),
            LayoutOperation::SetDivider { node, divider } => {
                self.apply_set_divider(node, divider, touched).map(|()| None)
            }
            LayoutOperation::InsertPlaceholder {
                target,
                placeholder,
            } => self
                .apply_insert_placeholder(target, placeholder, touched)
                .map(Some),
        }
    }

    fn apply_insert(
        &mut self,
        panel: PanelId,
        hint: LocationHint,
        touched: &mut BTreeSet<NodeId>,
    ) -> Result<NodeId, LayoutFailure> {
        if self.panels.contains_key(&panel) {
            return Err(LayoutFailure::PanelAlreadyPresent { panel });
        }
        let plan = self.plan_insert(&panel, hint)?;
        let leaf = self.execute_plan(&panel, plan, touched)?;
        self.events.push(LayoutEvent::Inserted { panel, leaf });
        Ok(leaf)
    }

    fn apply_remove(
        &mut self,
        panel: PanelId,
        touched: &mut BTreeSet<NodeId>,
    ) -> Result<Option<NodeId>, LayoutFailure> {
        let leaf = self
            .panels
            .remove(&panel)
            .ok_or_else(|| LayoutFailure::MissingPanel {
                panel: panel.clone(),
            })?;
        let _ = touched.insert(leaf);
        let _ = self.locks.remove(&panel);

        let record = self
            .nodes
            .get_mut(&leaf)
            .ok_or(LayoutFailure::MissingNode { node_id: leaf })?;
        record.kind = NodeKind::Placeholder(PlaceholderNode);
        if let Some(placeholder) = self.strategy_placeholder(&panel) {
            self.attach_placeholder(leaf, placeholder, touched)?;
        }

        let keeps_position = self
            .nodes
            .get(&leaf)
            .is_some_and(|record| !record.placeholders.is_empty());
        let placeholder = if keeps_position {
            Some(leaf)
        } else {
            self.detach_node(leaf, touched)?;
            None
        };
        self.events.push(LayoutEvent::Removed { panel, placeholder });
        Ok(placeholder)
    }

    fn apply_move(
        &mut self,
        panel: PanelId,
        hint: LocationHint,
        touched: &mut BTreeSet<NodeId>,
    ) -> Result<NodeId, LayoutFailure> {
        let leaf = self
            .leaf_of(&panel)
            .ok_or_else(|| LayoutFailure::MissingPanel {
                panel: panel.clone(),
            })?;
        let hint_target = match &hint {
            LocationHint::Beside { panel: other, .. } if *other == panel => {
                return Err(LayoutFailure::CannotMoveIntoSelf { panel });
            }
            LocationHint::Node { target, .. } => Some(*target),
            LocationHint::Drop(info) => Some(info.target),
            _ => None,
        };
        if hint_target == Some(leaf) {
            return Err(LayoutFailure::CannotMoveIntoSelf { panel });
        }

        // Detach without leaving the moved panel's own placeholder behind.
        let _ = self.panels.remove(&panel);
        let _ = touched.insert(leaf);
        let record = self
            .nodes
            .get_mut(&leaf)
            .ok_or(LayoutFailure::MissingNode { node_id: leaf })?;
        record.kind = NodeKind::Placeholder(PlaceholderNode);
        if record.placeholders.is_empty() {
            self.detach_node(leaf, touched)?;
        }
        if let Some(target) = hint_target
            && !self.nodes.contains_key(&target)
        {
            return Err(LayoutFailure::TargetRemovedByDetach { target });
        }

        let plan = self.plan_insert(&panel, hint)?;
        let new_leaf = self.execute_plan(&panel, plan, touched)?;
        self.events.push(LayoutEvent::Moved {
            panel,
            leaf: new_leaf,
        });
        Ok(new_leaf)
    }

    fn apply_set_divider(
        &mut self,
        node_id: NodeId,
        divider: f64,
        touched: &mut BTreeSet<NodeId>,
    ) -> Result<(), LayoutFailure> {
        let record = self
            .nodes
            .get_mut(&node_id)
            .ok_or(LayoutFailure::MissingNode { node_id })?;
        let NodeKind::Split(split) = &mut record.kind else {
            return Err(LayoutFailure::InvalidTarget { node_id });
        };
        let applied = sanitize_divider(divider);
        if applied != divider {
            tracing::warn!(
                target: "mosaic.layout",
                node = %node_id,
                requested = divider,
                applied,
                "divider clamped"
            );
        }
        split.divider = applied;
        let _ = touched.insert(node_id);
        self.events.push(LayoutEvent::DividerChanged {
            node: node_id,
            divider: applied,
        });
        Ok(())
    }

    fn apply_insert_placeholder(
        &mut self,
        target: NodeId,
        placeholder: PlaceholderId,
        touched: &mut BTreeSet<NodeId>,
    ) -> Result<NodeId, LayoutFailure> {
        if !self.is_valid_placeholder(&placeholder) {
            return Err(LayoutFailure::InvalidPlaceholder { placeholder });
        }
        let record = self
            .nodes
            .get(&target)
            .ok_or(LayoutFailure::MissingNode { node_id: target })?;
        let beside = match (&record.kind, self.root_child()) {
            (NodeKind::Root(_), None) => None,
            (NodeKind::Root(_), Some(child)) => Some(child),
            _ => Some(target),
        };

        let node = match beside {
            None => {
                let node = self.allocate_node_id()?;
                let _ = self.nodes.insert(
                    node,
                    NodeRecord::new(
                        node,
                        Some(NodeId::ROOT),
                        NodeKind::Placeholder(PlaceholderNode),
                    ),
                );
                self.replace_child(NodeId::ROOT, None, Some(node))?;
                let _ = touched.insert(NodeId::ROOT);
                node
            }
            Some(beside) => {
                let orientation = self.enclosing_orientation(beside);
                self.split_node(
                    beside,
                    Put::from_split(orientation, Slot::Second),
                    self.config.default_divider,
                    NodeKind::Placeholder(PlaceholderNode),
                    touched,
                )?
            }
        };
        let _ = touched.insert(node);
        self.attach_placeholder(node, placeholder.clone(), touched)?;
        self.events
            .push(LayoutEvent::PlaceholderInserted { node, placeholder });
        Ok(node)
    }

    /// Orientation of the split directly above `node`; horizontal at the
    /// root content.
    fn enclosing_orientation(&self, node: NodeId) -> Orientation {
        self.nodes
            .get(&node)
            .and_then(|record| record.parent)
            .and_then(|parent| self.nodes.get(&parent))
            .and_then(|parent| match &parent.kind {
                NodeKind::Split(split) => Some(split.orientation),
                _ => None,
            })
            .unwrap_or(Orientation::Horizontal)
    }

    fn plan_insert(
        &self,
        panel: &PanelId,
        hint: LocationHint,
    ) -> Result<InsertPlan, LayoutFailure> {
        match hint {
            LocationHint::Anywhere => Ok(self.plan_anywhere(panel)),
            LocationHint::Placeholder { placeholder } => Ok(self
                .plan_placeholder(&placeholder)
                .unwrap_or_else(|| self.plan_default())),
            LocationHint::Beside {
                panel: other,
                put,
                ratio,
            } => {
                let target = self
                    .leaf_of(&other)
                    .ok_or(LayoutFailure::MissingPanel { panel: other })?;
                self.plan_at(target, put, ratio)
            }
            LocationHint::Node { target, put, ratio } => self.plan_at(target, put, ratio),
            LocationHint::Drop(info) => self.plan_at(info.target, info.put, Some(info.divider)),
            LocationHint::Location(location) => self.plan_location(&location),
        }
    }

    fn plan_anywhere(&self, panel: &PanelId) -> InsertPlan {
        self.strategy_placeholder(panel)
            .and_then(|placeholder| self.plan_placeholder(&placeholder))
            .unwrap_or_else(|| self.plan_default())
    }

    fn plan_default(&self) -> InsertPlan {
        match self.root_child() {
            None => InsertPlan::FirstLeaf,
            Some(child) => InsertPlan::Split {
                target: child,
                put: Put::Right,
                divider: self.default_divider_for(child),
            },
        }
    }

    fn plan_placeholder(&self, placeholder: &PlaceholderId) -> Option<InsertPlan> {
        let owner = self.node_for_placeholder(placeholder)?;
        match self.nodes.get(&owner).map(|record| &record.kind)? {
            NodeKind::Placeholder(_) => Some(InsertPlan::Occupy(owner)),
            NodeKind::Leaf(_) | NodeKind::Split(_) => Some(InsertPlan::Split {
                target: owner,
                put: Put::Right,
                divider: self.default_divider_for(owner),
            }),
            NodeKind::Root(_) => None,
        }
    }

    fn plan_at(
        &self,
        target: NodeId,
        put: Put,
        ratio: Option<f64>,
    ) -> Result<InsertPlan, LayoutFailure> {
        let record = self
            .nodes
            .get(&target)
            .ok_or(LayoutFailure::MissingNode { node_id: target })?;
        let target = match &record.kind {
            NodeKind::Root(root) => match root.child {
                None => return Ok(InsertPlan::FirstLeaf),
                Some(child) => child,
            },
            _ => target,
        };
        let kind = self
            .nodes
            .get(&target)
            .map(|record| &record.kind)
            .ok_or(LayoutFailure::MissingNode { node_id: target })?;

        if put == Put::Center {
            return match kind {
                NodeKind::Placeholder(_) => Ok(InsertPlan::Occupy(target)),
                NodeKind::Leaf(_) => Ok(InsertPlan::Combine(target)),
                NodeKind::Split(_) if !self.is_visible(target) => Ok(InsertPlan::Split {
                    target,
                    put: Put::Right,
                    divider: self.default_divider_for(target),
                }),
                NodeKind::Split(_) | NodeKind::Root(_) => {
                    Err(LayoutFailure::InvalidTarget { node_id: target })
                }
            };
        }

        let divider = match ratio {
            Some(ratio) => {
                let applied = sanitize_divider(ratio);
                if applied != ratio {
                    tracing::warn!(
                        target: "mosaic.layout",
                        node = %target,
                        requested = ratio,
                        applied,
                        "insert ratio clamped"
                    );
                }
                applied
            }
            None => self.default_divider_for(target),
        };
        Ok(InsertPlan::Split {
            target,
            put,
            divider,
        })
    }

    fn plan_location(&self, location: &Location) -> Result<InsertPlan, LayoutFailure> {
        let split = match &location.property {
            LocationProperty::Placeholder { placeholder } => {
                return Ok(self
                    .plan_placeholder(placeholder)
                    .unwrap_or_else(|| self.plan_default()));
            }
            LocationProperty::Split(split) => split,
            LocationProperty::Stack { .. } | LocationProperty::Custom { .. } => {
                return Err(LayoutFailure::UnsupportedLocation);
            }
        };
        if let Some(plan) = split
            .placeholder
            .as_ref()
            .and_then(|placeholder| self.plan_placeholder(placeholder))
        {
            return Ok(plan);
        }

        let Some(mut current) = self.root_child() else {
            return Ok(InsertPlan::FirstLeaf);
        };
        for step in &split.path {
            match self.nodes.get(&current).map(|record| &record.kind) {
                Some(NodeKind::Split(node)) if node.orientation == step.orientation => {
                    current = node.child(step.slot);
                }
                _ => {
                    return Ok(InsertPlan::Split {
                        target: current,
                        put: Put::from_split(step.orientation, step.slot),
                        divider: sanitize_divider(step.divider),
                    });
                }
            }
        }

        match (self.nodes.get(&current).map(|record| &record.kind), split.path.last()) {
            (Some(NodeKind::Placeholder(_)), _) => Ok(InsertPlan::Occupy(current)),
            (_, Some(last)) => Ok(InsertPlan::Split {
                target: current,
                put: Put::from_split(last.orientation, last.slot),
                divider: sanitize_divider(last.divider),
            }),
            (_, None) => Ok(InsertPlan::Split {
                target: current,
                put: Put::Right,
                divider: self.default_divider_for(current),
            }),
        }
    }

    /// Default divider for a split of `target`. Splitting the sole leaf keeps
    /// at least `min_fraction` on both sides.
    fn default_divider_for(&self, target: NodeId) -> f64 {
        let divider = self.config.default_divider;
        let sole_leaf = self.root_child() == Some(target)
            && matches!(
                self.nodes.get(&target).map(|record| &record.kind),
                Some(NodeKind::Leaf(_))
            );
        if sole_leaf {
            divider.clamp(self.config.min_fraction, 1.0 - self.config.min_fraction)
        } else {
            divider
        }
    }

    fn execute_plan(
        &mut self,
        panel: &PanelId,
        plan: InsertPlan,
        touched: &mut BTreeSet<NodeId>,
    ) -> Result<NodeId, LayoutFailure> {
        let leaf_kind = NodeKind::Leaf(LeafNode {
            panel: panel.clone(),
        });
        let leaf = match plan {
            InsertPlan::FirstLeaf => {
                let leaf = self.allocate_node_id()?;
                let _ = self
                    .nodes
                    .insert(leaf, NodeRecord::new(leaf, Some(NodeId::ROOT), leaf_kind));
                self.replace_child(NodeId::ROOT, None, Some(leaf))?;
                let _ = touched.insert(NodeId::ROOT);
                leaf
            }
            InsertPlan::Occupy(node) => {
                let record = self
                    .nodes
                    .get_mut(&node)
                    .ok_or(LayoutFailure::MissingNode { node_id: node })?;
                record.kind = leaf_kind;
                node
            }
            InsertPlan::Split {
                target,
                put,
                divider,
            } => self.split_node(target, put, divider, leaf_kind, touched)?,
            InsertPlan::Combine(target) => return self.combine_into(target, panel, touched),
        };
        let _ = touched.insert(leaf);
        let _ = self.panels.insert(panel.clone(), leaf);
        self.claim_own_placeholder(panel, leaf, touched)?;
        Ok(leaf)
    }

    fn combine_into(
        &mut self,
        target: NodeId,
        incoming: &PanelId,
        touched: &mut BTreeSet<NodeId>,
    ) -> Result<NodeId, LayoutFailure> {
        let existing = self
            .nodes
            .get(&target)
            .and_then(NodeRecord::panel)
            .cloned()
            .ok_or(LayoutFailure::InvalidTarget { node_id: target })?;
        let group = self
            .combiner
            .as_ref()
            .and_then(|combiner| combiner.combine(&existing, incoming))
            .ok_or(LayoutFailure::StackingRejected { target })?;
        if group != existing && self.panels.contains_key(&group) {
            return Err(LayoutFailure::PanelAlreadyPresent { panel: group });
        }

        let record = self
            .nodes
            .get_mut(&target)
            .ok_or(LayoutFailure::MissingNode { node_id: target })?;
        record.kind = NodeKind::Leaf(LeafNode {
            panel: group.clone(),
        });
        let _ = touched.insert(target);
        if group != existing {
            let _ = self.panels.remove(&existing);
            if let Some(lock) = self.locks.remove(&existing) {
                let _ = self.locks.insert(group.clone(), lock);
            }
        }
        // The incoming panel stops existing on its own; its lock goes with it.
        if *incoming != group && self.locks.remove(incoming).is_some() {
            tracing::debug!(
                target: "mosaic.layout",
                panel = %incoming,
                group = %group,
                "lock dropped by stacking"
            );
        }
        let _ = self.panels.insert(group.clone(), target);
        self.claim_own_placeholder(incoming, target, touched)?;
        self.claim_own_placeholder(&group, target, touched)?;
        Ok(target)
    }

    /// Take `panel`'s strategy placeholder off whichever node carries it.
    pub(crate) fn claim_own_placeholder(
        &mut self,
        panel: &PanelId,
        leaf: NodeId,
        touched: &mut BTreeSet<NodeId>,
    ) -> Result<(), LayoutFailure> {
        let Some(placeholder) = self.strategy_placeholder(panel) else {
            return Ok(());
        };
        let Some(owner) = self.placeholder_index.remove(&placeholder) else {
            return Ok(());
        };
        if let Some(record) = self.nodes.get_mut(&owner) {
            let _ = record.placeholders.remove(&placeholder);
        }
        let _ = touched.insert(owner);
        if owner != leaf {
            self.prune_if_dead(owner, touched)?;
        }
        Ok(())
    }

    /// Attach `placeholder` to `node`, detaching it from any previous owner.
    pub(crate) fn attach_placeholder(
        &mut self,
        node: NodeId,
        placeholder: PlaceholderId,
        touched: &mut BTreeSet<NodeId>,
    ) -> Result<(), LayoutFailure> {
        let previous = self.placeholder_index.insert(placeholder.clone(), node);
        let record = self
            .nodes
            .get_mut(&node)
            .ok_or(LayoutFailure::MissingNode { node_id: node })?;
        let _ = record.placeholders.insert(placeholder.clone());
        let _ = touched.insert(node);

        if let Some(previous) = previous.filter(|previous| *previous != node) {
            if let Some(record) = self.nodes.get_mut(&previous) {
                let _ = record.placeholders.remove(&placeholder);
            }
            let _ = touched.insert(previous);
            self.prune_if_dead(previous, touched)?;
        }
        Ok(())
    }

    /// Remove `node` if it is a placeholder with no ids left.
    pub(crate) fn prune_if_dead(
        &mut self,
        node: NodeId,
        touched: &mut BTreeSet<NodeId>,
    ) -> Result<(), LayoutFailure> {
        let dead = self.nodes.get(&node).is_some_and(|record| {
            matches!(record.kind, NodeKind::Placeholder(_)) && record.placeholders.is_empty()
        });
        if dead {
            self.detach_node(node, touched)?;
        }
        Ok(())
    }

    /// Remove `node` and its subtree. A split parent is replaced by the
    /// surviving sibling, which inherits the parent's placeholder set.
    pub(crate) fn detach_node(
        &mut self,
        node: NodeId,
        touched: &mut BTreeSet<NodeId>,
    ) -> Result<(), LayoutFailure> {
        let parent_id = self
            .nodes
            .get(&node)
            .ok_or(LayoutFailure::MissingNode { node_id: node })?
            .parent
            .ok_or(LayoutFailure::InvalidTarget { node_id: node })?;
        let parent = self
            .nodes
            .get(&parent_id)
            .ok_or(LayoutFailure::MissingNode { node_id: parent_id })?;
        let _ = touched.insert(parent_id);

        match &parent.kind {
            NodeKind::Root(_) => self.replace_child(NodeId::ROOT, Some(node), None)?,
            NodeKind::Split(split) => {
                let sibling = match split.slot_of(node) {
                    Some(slot) => split.child(slot.other()),
                    None => return Err(LayoutFailure::MissingNode { node_id: node }),
                };
                let grandparent = parent
                    .parent
                    .ok_or(LayoutFailure::InvalidTarget { node_id: parent_id })?;
                let _ = touched.insert(sibling);
                let _ = touched.insert(grandparent);
                self.replace_child(grandparent, Some(parent_id), Some(sibling))?;

                let inherited = self
                    .nodes
                    .remove(&parent_id)
                    .map(|mut record| record.placeholders.take())
                    .unwrap_or_default();
                let sibling_record = self
                    .nodes
                    .get_mut(&sibling)
                    .ok_or(LayoutFailure::MissingNode { node_id: sibling })?;
                sibling_record.parent = Some(grandparent);
                for placeholder in inherited {
                    if sibling_record.placeholders.insert(placeholder.clone()) {
                        let _ = self.placeholder_index.insert(placeholder, sibling);
                    }
                }
            }
            NodeKind::Leaf(_) | NodeKind::Placeholder(_) => {
                return Err(LayoutFailure::Validation(LayoutModelError::ParentMismatch {
                    node_id: node,
                    expected: None,
                    actual: Some(parent_id),
                }));
            }
        }

        for removed in self.collect_subtree_ids(node) {
            if let Some(record) = self.nodes.remove(&removed) {
                for placeholder in record.placeholders.iter() {
                    if self.placeholder_index.get(placeholder) == Some(&removed) {
                        let _ = self.placeholder_index.remove(placeholder);
                    }
                }
                if let NodeKind::Leaf(leaf) = &record.kind {
                    let _ = self.panels.remove(&leaf.panel);
                }
            }
        }
        Ok(())
    }

    /// Split `target` into a new split holding `target` and a new node of
    /// `kind` on the `put` side. Returns the new node.
    fn split_node(
        &mut self,
        target: NodeId,
        put: Put,
        divider: f64,
        kind: NodeKind,
        touched: &mut BTreeSet<NodeId>,
    ) -> Result<NodeId, LayoutFailure> {
        let (orientation, slot) = put
            .split()
            .ok_or(LayoutFailure::InvalidTarget { node_id: target })?;
        let target_parent = self
            .nodes
            .get(&target)
            .ok_or(LayoutFailure::MissingNode { node_id: target })?
            .parent
            .ok_or(LayoutFailure::InvalidTarget { node_id: target })?;

        let split_id = self.allocate_node_id()?;
        let new_id = self.allocate_node_id()?;
        let (first, second) = match slot {
            Slot::First => (new_id, target),
            Slot::Second => (target, new_id),
        };
        let _ = self
            .nodes
            .insert(new_id, NodeRecord::new(new_id, Some(split_id), kind));
        let _ = self.nodes.insert(
            split_id,
            NodeRecord::new(
                split_id,
                Some(target_parent),
                NodeKind::Split(SplitNode {
                    orientation,
                    divider: sanitize_divider(divider),
                    first,
                    second,
                }),
            ),
        );
        self.replace_child(target_parent, Some(target), Some(split_id))?;
        if let Some(record) = self.nodes.get_mut(&target) {
            record.parent = Some(split_id);
        }

        let _ = touched.insert(target);
        let _ = touched.insert(target_parent);
        let _ = touched.insert(split_id);
        let _ = touched.insert(new_id);
        Ok(new_id)
    }

    /// Point `parent_id`'s reference to `old_child` at `new_child`. The root
    /// accepts `None` on either side; splits require both.
    fn replace_child(
        &mut self,
        parent_id: NodeId,
        old_child: Option<NodeId>,
        new_child: Option<NodeId>,
    ) -> Result<(), LayoutFailure> {
        let parent = self
            .nodes
            .get_mut(&parent_id)
            .ok_or(LayoutFailure::MissingNode { node_id: parent_id })?;
        match &mut parent.kind {
            NodeKind::Root(root) if root.child == old_child => {
                root.child = new_child;
                Ok(())
            }
            NodeKind::Split(split) => {
                let (Some(old_child), Some(new_child)) = (old_child, new_child) else {
                    return Err(LayoutFailure::InvalidTarget { node_id: parent_id });
                };
                if split.first == old_child {
                    split.first = new_child;
                } else if split.second == old_child {
                    split.second = new_child;
                } else {
                    return Err(LayoutFailure::MissingNode { node_id: old_child });
                }
                Ok(())
            }
            _ => Err(LayoutFailure::InvalidTarget { node_id: parent_id }),
        }
    }

    pub(crate) fn collect_subtree_ids(&self, root_id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root_id];
        while let Some(node_id) = stack.pop() {
            let Some(node) = self.nodes.get(&node_id) else {
                continue;
            };
            out.push(node_id);
            stack.extend(node.kind.children());
        }
        out
    }

    pub(crate) fn allocate_node_id(&mut self) -> Result<NodeId, LayoutFailure> {
        let current = self.next_id;
        self.next_id = self
            .next_id
            .checked_next()
            .map_err(|_| LayoutFailure::NodeIdOverflow { current })?;
        Ok(current)
    }

    /// Node carrying `placeholder`, or the leaf whose panel maps to it.
    pub(crate) fn node_for_placeholder(&self, placeholder: &PlaceholderId) -> Option<NodeId> {
        if let Some(owner) = self.placeholder_index.get(placeholder) {
            return Some(*owner);
        }
        self.strategy.as_ref()?;
        self.panels.iter().find_map(|(panel, leaf)| {
            (self.strategy_placeholder(panel).as_ref() == Some(placeholder)).then_some(*leaf)
        })
    }

    /// Current position of `panel` as a split-path location.
    #[must_use]
    pub fn location_of(&self, panel: &PanelId) -> Option<Location> {
        self.leaf_of(panel).and_then(|leaf| self.location_of_node(leaf))
    }

    /// Split-path location of any non-root node.
    #[must_use]
    pub fn location_of_node(&self, node: NodeId) -> Option<Location> {
        let record = self.nodes.get(&node)?;
        if matches!(record.kind, NodeKind::Root(_)) {
            return None;
        }
        let placeholder = match &record.kind {
            NodeKind::Leaf(leaf) => self
                .strategy_placeholder(&leaf.panel)
                .or_else(|| record.placeholders.first().cloned()),
            _ => record.placeholders.first().cloned(),
        };

        let mut path = Vec::new();
        let mut child = node;
        let mut parent = record.parent;
        while let Some(parent_id) = parent {
            let parent_record = self.nodes.get(&parent_id)?;
            if let NodeKind::Split(split) = &parent_record.kind {
                path.push(PathStep {
                    orientation: split.orientation,
                    slot: split.slot_of(child)?,
                    divider: split.divider,
                });
            }
            child = parent_id;
            parent = parent_record.parent;
        }
        path.reverse();

        Some(Location::new(LocationProperty::Split(SplitLocation {
            path,
            placeholder,
        })))
    }

    /// Node a location points at, without creating anything. The location's
    /// placeholder wins over its path; the path must match exactly.
    #[must_use]
    pub fn resolve_location(&self, location: &Location) -> Option<NodeId> {
        match &location.property {
            LocationProperty::Placeholder { placeholder } => self.node_for_placeholder(placeholder),
            LocationProperty::Split(split) => {
                if let Some(node) = split
                    .placeholder
                    .as_ref()
                    .and_then(|placeholder| self.node_for_placeholder(placeholder))
                {
                    return Some(node);
                }
                let mut current = self.root_child()?;
                for step in &split.path {
                    match &self.nodes.get(&current)?.kind {
                        NodeKind::Split(node) if node.orientation == step.orientation => {
                            current = node.child(step.slot);
                        }
                        _ => return None,
                    }
                }
                Some(current)
            }
            LocationProperty::Stack { .. } | LocationProperty::Custom { .. } => None,
        }
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<(), LayoutModelError> {
        let root = self
            .nodes
            .get(&NodeId::ROOT)
            .ok_or(LayoutModelError::MissingRoot)?;
        if root.parent.is_some() {
            return Err(LayoutModelError::RootHasParent);
        }
        if !matches!(root.kind, NodeKind::Root(_)) {
            return Err(LayoutModelError::MissingRoot);
        }
        if let Some((&max_existing, _)) = self.nodes.last_key_value()
            && max_existing >= self.next_id
        {
            return Err(LayoutModelError::NextIdNotGreaterThanExisting {
                next_id: self.next_id,
                max_existing,
            });
        }

        let mut visited = BTreeSet::new();
        let mut stack = vec![(NodeId::ROOT, None)];
        while let Some((node_id, expected_parent)) = stack.pop() {
            if !visited.insert(node_id) {
                return Err(LayoutModelError::CycleDetected { node_id });
            }
            let Some(record) = self.nodes.get(&node_id) else {
                continue;
            };
            if record.parent != expected_parent {
                return Err(LayoutModelError::ParentMismatch {
                    node_id,
                    expected: expected_parent,
                    actual: record.parent,
                });
            }
            match &record.kind {
                NodeKind::Root(_) if node_id != NodeId::ROOT => {
                    return Err(LayoutModelError::RootNotAtTop { node_id });
                }
                NodeKind::Split(split) if !(0.0..=1.0).contains(&split.divider) => {
                    return Err(LayoutModelError::DividerOutOfRange {
                        node_id,
                        divider: split.divider,
                    });
                }
                NodeKind::Placeholder(_) if record.placeholders.is_empty() => {
                    return Err(LayoutModelError::EmptyPlaceholder { node_id });
                }
                _ => {}
            }
            for child in record.kind.children() {
                if !self.nodes.contains_key(&child) {
                    return Err(LayoutModelError::MissingChild {
                        parent: node_id,
                        child,
                    });
                }
                stack.push((child, Some(node_id)));
            }
        }
        if let Some(&node_id) = self.nodes.keys().find(|id| !visited.contains(*id)) {
            return Err(LayoutModelError::UnreachableNode { node_id });
        }

        let mut seen: FxHashMap<&PlaceholderId, NodeId> = FxHashMap::default();
        let mut leaves = 0_usize;
        for record in self.nodes.values() {
            for placeholder in record.placeholders.iter() {
                if let Some(first) = seen.insert(placeholder, record.id) {
                    return Err(LayoutModelError::DuplicatePlaceholder {
                        placeholder: placeholder.clone(),
                        first,
                        second: record.id,
                    });
                }
                if self.placeholder_index.get(placeholder) != Some(&record.id) {
                    return Err(LayoutModelError::StalePlaceholderIndex {
                        placeholder: placeholder.clone(),
                    });
                }
            }
            if let NodeKind::Leaf(leaf) = &record.kind {
                leaves += 1;
                if self.panels.get(&leaf.panel) != Some(&record.id) {
                    return Err(LayoutModelError::StalePanelIndex {
                        panel: leaf.panel.clone(),
                    });
                }
                if let Some(own) = self.strategy_placeholder(&leaf.panel)
                    && record.placeholders.contains(&own)
                {
                    return Err(LayoutModelError::LeafCarriesOwnPlaceholder {
                        node_id: record.id,
                        placeholder: own,
                    });
                }
            }
        }
        if let Some(placeholder) = self
            .placeholder_index
            .keys()
            .find(|placeholder| !seen.contains_key(placeholder))
        {
            return Err(LayoutModelError::StalePlaceholderIndex {
                placeholder: placeholder.clone(),
            });
        }
        if leaves != self.panels.len()
            && let Some(panel) = self
                .panels
                .iter()
                .find(|(panel, leaf)| {
                    self.nodes.get(*leaf).and_then(NodeRecord::panel) != Some(*panel)
                })
                .map(|(panel, _)| panel.clone())
        {
            return Err(LayoutModelError::StalePanelIndex { panel });
        }
        Ok(())
    }

    /// Deterministic structural hash of the current tree state.
    ///
    /// Solved bounds and queued events are excluded; dividers are included.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
        const PRIME: u64 = 0x0000_0001_0000_01b3;

        fn mix(hash: &mut u64, byte: u8) {
            *hash ^= u64::from(byte);
            *hash = hash.wrapping_mul(PRIME);
        }

        fn mix_bytes(hash: &mut u64, bytes: &[u8]) {
            for byte in bytes {
                mix(hash, *byte);
            }
        }

        fn mix_u64(hash: &mut u64, value: u64) {
            mix_bytes(hash, &value.to_le_bytes());
        }

        fn mix_opt_node_id(hash: &mut u64, value: Option<NodeId>) {
            match value {
                Some(value) => {
                    mix(hash, 1);
                    mix_u64(hash, value.get());
                }
                None => mix(hash, 0),
            }
        }

        fn mix_str(hash: &mut u64, value: &str) {
            mix_u64(hash, value.len() as u64);
            mix_bytes(hash, value.as_bytes());
        }

        let mut hash = OFFSET_BASIS;
        mix_u64(&mut hash, self.next_id.get());
        mix_u64(&mut hash, self.nodes.len() as u64);

        for node in self.nodes.values() {
            mix_u64(&mut hash, node.id.get());
            mix_opt_node_id(&mut hash, node.parent);
            mix_u64(&mut hash, node.placeholders.len() as u64);
            for placeholder in node.placeholders.iter() {
                mix_str(&mut hash, placeholder.as_str());
            }

            match &node.kind {
                NodeKind::Root(root) => {
                    mix(&mut hash, 0);
                    mix_opt_node_id(&mut hash, root.child);
                }
                NodeKind::Split(split) => {
                    mix(&mut hash, 1);
                    let orientation_byte = match split.orientation {
                        Orientation::Horizontal => 1,
                        Orientation::Vertical => 2,
                    };
                    mix(&mut hash, orientation_byte);
                    mix_u64(&mut hash, split.divider.to_bits());
                    mix_u64(&mut hash, split.first.get());
                    mix_u64(&mut hash, split.second.get());
                }
                NodeKind::Leaf(leaf) => {
                    mix(&mut hash, 2);
                    mix_str(&mut hash, leaf.panel.as_str());
                }
                NodeKind::Placeholder(_) => mix(&mut hash, 3),
            }
        }

        hash
    }
}

/// Scoped batch of edits. Relayout is deferred until the outermost guard
/// drops.
#[derive(Debug)]
pub struct FreezeGuard<'a> {
    tree: &'a mut SplitTree,
}

impl Deref for FreezeGuard<'_> {
    type Target = SplitTree;

    fn deref(&self) -> &Self::Target {
        self.tree
    }
}

impl DerefMut for FreezeGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.tree
    }
}

impl Drop for FreezeGuard<'_> {
    fn drop(&mut self) {
        self.tree.freeze_depth = self.tree.freeze_depth.saturating_sub(1);
        if self.tree.freeze_depth == 0 && self.tree.relayout_pending {
            self.tree.relayout();
        }
    }
}
