//! Node payloads, identifiers and read-only introspection.

use std::fmt;

use mosaic_core::{Bounds, PanelId, PixelRect, PlaceholderId};
use serde::{Deserialize, Serialize};

use crate::error::LayoutModelError;

/// Stable identifier for tree nodes.
///
/// `0` is reserved/invalid so IDs are always non-zero. IDs are never reused
/// within one tree, so a stale handle resolves to nothing rather than to a
/// different node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub(crate) u64);

impl NodeId {
    /// The root node of every tree.
    pub const ROOT: Self = Self(1);

    /// Create a node ID, rejecting 0.
    pub fn new(raw: u64) -> Result<Self, LayoutModelError> {
        if raw == 0 {
            return Err(LayoutModelError::ZeroNodeId);
        }
        Ok(Self(raw))
    }

    /// Get the raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Return the next ID, or an error on overflow.
    pub fn checked_next(self) -> Result<Self, LayoutModelError> {
        let Some(next) = self.0.checked_add(1) else {
            return Err(LayoutModelError::NodeIdOverflow { current: self });
        };
        Self::new(next)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Orientation of a split node.
///
/// `Horizontal` lays the children out side by side (first on the left),
/// `Vertical` stacks them (first on top).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// Child position within a split.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    #[default]
    First,
    Second,
}

impl Slot {
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }
}

/// Where an incoming panel goes relative to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Put {
    Left,
    Right,
    Top,
    Bottom,
    /// Merge into the target (stacking, or occupying a placeholder).
    Center,
}

impl Put {
    /// Split orientation and the slot the incoming panel takes, or `None`
    /// for [`Put::Center`].
    #[must_use]
    pub const fn split(self) -> Option<(Orientation, Slot)> {
        match self {
            Self::Left => Some((Orientation::Horizontal, Slot::First)),
            Self::Right => Some((Orientation::Horizontal, Slot::Second)),
            Self::Top => Some((Orientation::Vertical, Slot::First)),
            Self::Bottom => Some((Orientation::Vertical, Slot::Second)),
            Self::Center => None,
        }
    }

    #[must_use]
    pub const fn from_split(orientation: Orientation, slot: Slot) -> Self {
        match (orientation, slot) {
            (Orientation::Horizontal, Slot::First) => Self::Left,
            (Orientation::Horizontal, Slot::Second) => Self::Right,
            (Orientation::Vertical, Slot::First) => Self::Top,
            (Orientation::Vertical, Slot::Second) => Self::Bottom,
        }
    }
}

/// Insertion-ordered set of placeholder ids attached to one node.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaceholderSet(Vec<PlaceholderId>);

impl PlaceholderSet {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn contains(&self, id: &PlaceholderId) -> bool {
        self.0.contains(id)
    }

    /// Append `id`; returns `false` if it was already present.
    pub fn insert(&mut self, id: PlaceholderId) -> bool {
        if self.0.contains(&id) {
            return false;
        }
        self.0.push(id);
        true
    }

    /// Remove `id`; returns `true` if it was present.
    pub fn remove(&mut self, id: &PlaceholderId) -> bool {
        let before = self.0.len();
        self.0.retain(|existing| existing != id);
        self.0.len() != before
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlaceholderId> {
        self.0.iter()
    }

    #[must_use]
    pub fn first(&self) -> Option<&PlaceholderId> {
        self.0.first()
    }

    /// Move every id out of the set, leaving it empty.
    pub fn take(&mut self) -> Vec<PlaceholderId> {
        std::mem::take(&mut self.0)
    }
}

impl FromIterator<PlaceholderId> for PlaceholderSet {
    fn from_iter<T: IntoIterator<Item = PlaceholderId>>(iter: T) -> Self {
        let mut set = Self::new();
        for id in iter {
            let _ = set.insert(id);
        }
        set
    }
}

/// Tree root. Owns at most one child and the container's pixel size, which
/// doubles as the scale between ratio space and pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootNode {
    pub child: Option<NodeId>,
    pub width_factor: f64,
    pub height_factor: f64,
}

/// Internal binary split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitNode {
    pub orientation: Orientation,
    /// Share of the split's extent given to `first`, in `[0, 1]`.
    pub divider: f64,
    pub first: NodeId,
    pub second: NodeId,
}

impl SplitNode {
    #[must_use]
    pub fn child(&self, slot: Slot) -> NodeId {
        match slot {
            Slot::First => self.first,
            Slot::Second => self.second,
        }
    }

    #[must_use]
    pub fn slot_of(&self, child: NodeId) -> Option<Slot> {
        if self.first == child {
            Some(Slot::First)
        } else if self.second == child {
            Some(Slot::Second)
        } else {
            None
        }
    }
}

/// A node showing one panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafNode {
    pub panel: PanelId,
}

/// A vacated position with no panel. Its ids live on the owning record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlaceholderNode;

/// Closed set of node variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    Root(RootNode),
    Split(SplitNode),
    Leaf(LeafNode),
    Placeholder(PlaceholderNode),
}

impl NodeKind {
    /// Children in first/second order.
    pub fn children(&self) -> impl Iterator<Item = NodeId> {
        let pair = match self {
            Self::Root(root) => [root.child, None],
            Self::Split(split) => [Some(split.first), Some(split.second)],
            Self::Leaf(_) | Self::Placeholder(_) => [None, None],
        };
        pair.into_iter().flatten()
    }
}

/// Arena record for one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "PlaceholderSet::is_empty")]
    pub placeholders: PlaceholderSet,
    /// Last solved bounds in root ratio space.
    #[serde(default)]
    pub bounds: Bounds,
}

impl NodeRecord {
    pub(crate) fn new(id: NodeId, parent: Option<NodeId>, kind: NodeKind) -> Self {
        Self {
            id,
            parent,
            kind,
            placeholders: PlaceholderSet::new(),
            bounds: Bounds::default(),
        }
    }

    /// Panel shown by this node, if it is a leaf.
    #[must_use]
    pub fn panel(&self) -> Option<&PanelId> {
        match &self.kind {
            NodeKind::Leaf(leaf) => Some(&leaf.panel),
            _ => None,
        }
    }
}

/// One named value produced by [`Inspect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectField {
    pub name: &'static str,
    pub value: String,
}

impl InspectField {
    fn new(name: &'static str, value: impl ToString) -> Self {
        Self {
            name,
            value: value.to_string(),
        }
    }
}

/// Read-only field listing for debugging tools.
pub trait Inspect {
    fn kind_name(&self) -> &'static str;
    fn inspect(&self) -> Vec<InspectField>;
}

impl Inspect for RootNode {
    fn kind_name(&self) -> &'static str {
        "root"
    }

    fn inspect(&self) -> Vec<InspectField> {
        vec![
            InspectField::new(
                "child",
                self.child.map_or_else(|| "none".to_owned(), |c| c.to_string()),
            ),
            InspectField::new("width_factor", self.width_factor),
            InspectField::new("height_factor", self.height_factor),
        ]
    }
}

impl Inspect for SplitNode {
    fn kind_name(&self) -> &'static str {
        "split"
    }

    fn inspect(&self) -> Vec<InspectField> {
        let orientation = match self.orientation {
            Orientation::Horizontal => "horizontal",
            Orientation::Vertical => "vertical",
        };
        vec![
            InspectField::new("orientation", orientation),
            InspectField::new("divider", self.divider),
            InspectField::new("first", self.first),
            InspectField::new("second", self.second),
        ]
    }
}

impl Inspect for LeafNode {
    fn kind_name(&self) -> &'static str {
        "leaf"
    }

    fn inspect(&self) -> Vec<InspectField> {
        vec![InspectField::new("panel", &self.panel)]
    }
}

impl Inspect for PlaceholderNode {
    fn kind_name(&self) -> &'static str {
        "placeholder"
    }

    fn inspect(&self) -> Vec<InspectField> {
        Vec::new()
    }
}

impl Inspect for NodeKind {
    fn kind_name(&self) -> &'static str {
        match self {
            Self::Root(node) => node.kind_name(),
            Self::Split(node) => node.kind_name(),
            Self::Leaf(node) => node.kind_name(),
            Self::Placeholder(node) => node.kind_name(),
        }
    }

    fn inspect(&self) -> Vec<InspectField> {
        match self {
            Self::Root(node) => node.inspect(),
            Self::Split(node) => node.inspect(),
            Self::Leaf(node) => node.inspect(),
            Self::Placeholder(node) => node.inspect(),
        }
    }
}

/// Borrowed view of a node yielded by tree traversal.
#[derive(Debug, Clone, Copy)]
pub struct NodeView<'a> {
    record: &'a NodeRecord,
    depth: usize,
}

impl<'a> NodeView<'a> {
    pub(crate) fn new(record: &'a NodeRecord, depth: usize) -> Self {
        Self { record, depth }
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.record.id
    }

    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.record.parent
    }

    /// Distance from the root (the root itself is depth 0).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[must_use]
    pub fn kind(&self) -> &'a NodeKind {
        &self.record.kind
    }

    #[must_use]
    pub fn record(&self) -> &'a NodeRecord {
        self.record
    }

    #[must_use]
    pub fn panel(&self) -> Option<&'a PanelId> {
        self.record.panel()
    }

    #[must_use]
    pub fn placeholders(&self) -> &'a PlaceholderSet {
        &self.record.placeholders
    }

    #[must_use]
    pub fn bounds(&self) -> Bounds {
        self.record.bounds
    }

    #[must_use]
    pub fn pixel_bounds(&self) -> PixelRect {
        self.record.bounds.to_pixels()
    }
}

impl Inspect for NodeView<'_> {
    fn kind_name(&self) -> &'static str {
        self.record.kind.kind_name()
    }

    fn inspect(&self) -> Vec<InspectField> {
        let mut fields = vec![
            InspectField::new("id", self.record.id),
            InspectField::new("depth", self.depth),
        ];
        fields.extend(self.record.kind.inspect());
        if !self.record.placeholders.is_empty() {
            let ids = self
                .record
                .placeholders
                .iter()
                .map(PlaceholderId::as_str)
                .collect::<Vec<_>>()
                .join(",");
            fields.push(InspectField::new("placeholders", ids));
        }
        let px = self.pixel_bounds();
        fields.push(InspectField::new(
            "bounds",
            format!("{},{} {}x{}", px.x, px.y, px.width, px.height),
        ));
        fields
    }
}
