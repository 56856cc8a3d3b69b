//! Error types for the layout engine.

use std::fmt;

use mosaic_core::{PanelId, PlaceholderId};

use crate::node::{NodeId, Slot};
use crate::tree::LayoutOperationKind;

/// Structural invariant violations found by [`crate::SplitTree::validate`].
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutModelError {
    ZeroNodeId,
    NodeIdOverflow {
        current: NodeId,
    },
    MissingRoot,
    RootHasParent,
    RootNotAtTop {
        node_id: NodeId,
    },
    MissingChild {
        parent: NodeId,
        child: NodeId,
    },
    ParentMismatch {
        node_id: NodeId,
        expected: Option<NodeId>,
        actual: Option<NodeId>,
    },
    CycleDetected {
        node_id: NodeId,
    },
    UnreachableNode {
        node_id: NodeId,
    },
    DividerOutOfRange {
        node_id: NodeId,
        divider: f64,
    },
    NextIdNotGreaterThanExisting {
        next_id: NodeId,
        max_existing: NodeId,
    },
    EmptyPlaceholder {
        node_id: NodeId,
    },
    DuplicatePlaceholder {
        placeholder: PlaceholderId,
        first: NodeId,
        second: NodeId,
    },
    StalePlaceholderIndex {
        placeholder: PlaceholderId,
    },
    StalePanelIndex {
        panel: PanelId,
    },
    LeafCarriesOwnPlaceholder {
        node_id: NodeId,
        placeholder: PlaceholderId,
    },
}

impl fmt::Display for LayoutModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroNodeId => write!(f, "node id 0 is invalid"),
            Self::NodeIdOverflow { current } => write!(f, "node id overflow after {current}"),
            Self::MissingRoot => write!(f, "root node is missing"),
            Self::RootHasParent => write!(f, "root node must not have a parent"),
            Self::RootNotAtTop { node_id } => {
                write!(f, "node {node_id} is a root record below the top of the tree")
            }
            Self::MissingChild { parent, child } => {
                write!(f, "node {parent} references missing child {child}")
            }
            Self::ParentMismatch {
                node_id,
                expected,
                actual,
            } => write!(
                f,
                "node {node_id} has parent {actual:?}, expected {expected:?}"
            ),
            Self::CycleDetected { node_id } => write!(f, "cycle detected at node {node_id}"),
            Self::UnreachableNode { node_id } => {
                write!(f, "node {node_id} is not reachable from the root")
            }
            Self::DividerOutOfRange { node_id, divider } => {
                write!(f, "split node {node_id} has divider {divider} outside [0, 1]")
            }
            Self::NextIdNotGreaterThanExisting {
                next_id,
                max_existing,
            } => write!(
                f,
                "next id {next_id} must be greater than max existing id {max_existing}"
            ),
            Self::EmptyPlaceholder { node_id } => {
                write!(f, "placeholder node {node_id} carries no ids and should be pruned")
            }
            Self::DuplicatePlaceholder {
                placeholder,
                first,
                second,
            } => write!(
                f,
                "placeholder {placeholder} is attached to both node {first} and node {second}"
            ),
            Self::StalePlaceholderIndex { placeholder } => {
                write!(f, "placeholder index entry for {placeholder} is stale")
            }
            Self::StalePanelIndex { panel } => write!(f, "panel index entry for {panel} is stale"),
            Self::LeafCarriesOwnPlaceholder {
                node_id,
                placeholder,
            } => write!(
                f,
                "leaf {node_id} carries its own panel placeholder {placeholder}"
            ),
        }
    }
}

impl std::error::Error for LayoutModelError {}

/// Structured reasons for a rejected layout operation.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutFailure {
    MissingPanel { panel: PanelId },
    MissingNode { node_id: NodeId },
    PanelAlreadyPresent { panel: PanelId },
    InvalidTarget { node_id: NodeId },
    StackingRejected { target: NodeId },
    CannotMoveIntoSelf { panel: PanelId },
    TargetRemovedByDetach { target: NodeId },
    InvalidPlaceholder { placeholder: PlaceholderId },
    /// The location's first link is not something a split tree understands.
    UnsupportedLocation,
    NodeIdOverflow { current: NodeId },
    Validation(LayoutModelError),
}

impl fmt::Display for LayoutFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPanel { panel } => write!(f, "panel {panel} is not in the layout"),
            Self::MissingNode { node_id } => write!(f, "node {node_id} not found"),
            Self::PanelAlreadyPresent { panel } => {
                write!(f, "panel {panel} is already in the layout")
            }
            Self::InvalidTarget { node_id } => {
                write!(f, "node {node_id} cannot receive this insertion")
            }
            Self::StackingRejected { target } => {
                write!(f, "stacking onto node {target} was rejected")
            }
            Self::CannotMoveIntoSelf { panel } => {
                write!(f, "panel {panel} cannot be moved relative to itself")
            }
            Self::TargetRemovedByDetach { target } => write!(
                f,
                "target {target} would be removed while detaching the moved panel"
            ),
            Self::InvalidPlaceholder { placeholder } => {
                write!(f, "placeholder {placeholder:?} is not valid")
            }
            Self::UnsupportedLocation => {
                write!(f, "location does not describe a split tree position")
            }
            Self::NodeIdOverflow { current } => write!(f, "node id overflow after {current}"),
            Self::Validation(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for LayoutFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        if let Self::Validation(err) = self {
            return Some(err);
        }
        None
    }
}

impl From<LayoutModelError> for LayoutFailure {
    fn from(err: LayoutModelError) -> Self {
        match err {
            LayoutModelError::NodeIdOverflow { current } => Self::NodeIdOverflow { current },
            other => Self::Validation(other),
        }
    }
}

/// Failure payload for [`crate::SplitTree::apply_operation`].
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutOperationError {
    pub operation_id: u64,
    pub kind: LayoutOperationKind,
    pub touched_nodes: Vec<NodeId>,
    pub before_hash: u64,
    pub after_hash: u64,
    pub reason: LayoutFailure,
}

impl fmt::Display for LayoutOperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "operation {} ({:?}) failed: {}",
            self.operation_id, self.kind, self.reason
        )
    }
}

impl std::error::Error for LayoutOperationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.reason)
    }
}

/// Rejected placeholder map import. Import is atomic: on any of these the
/// tree is left untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaceholderMapError {
    UnsupportedSchemaVersion {
        version: u16,
    },
    DuplicatePlaceholder {
        placeholder: PlaceholderId,
        first_index: usize,
        second_index: usize,
    },
    DanglingParent {
        index: usize,
        parent: usize,
    },
    ParentNotSplit {
        index: usize,
        parent: usize,
    },
    SlotOccupied {
        index: usize,
        parent: usize,
        slot: Slot,
    },
    MissingChild {
        index: usize,
        slot: Slot,
    },
    MultipleRoots {
        index: usize,
    },
    TreeNotEmpty {
        panels: usize,
    },
    InvalidPlaceholder {
        index: usize,
    },
    NodeIdOverflow {
        current: NodeId,
    },
    /// Rebuilding the skeleton hit a structural failure.
    Rebuild(LayoutFailure),
}

impl fmt::Display for PlaceholderMapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedSchemaVersion { version } => {
                write!(f, "unsupported placeholder map schema version {version}")
            }
            Self::DuplicatePlaceholder {
                placeholder,
                first_index,
                second_index,
            } => write!(
                f,
                "placeholder {placeholder} appears in entries {first_index} and {second_index}"
            ),
            Self::DanglingParent { index, parent } => write!(
                f,
                "entry {index} references parent {parent}, which is not an earlier entry"
            ),
            Self::ParentNotSplit { index, parent } => {
                write!(f, "entry {index} has parent {parent}, which is not a split")
            }
            Self::SlotOccupied {
                index,
                parent,
                slot,
            } => write!(
                f,
                "entry {index} claims slot {slot:?} of parent {parent}, which is already taken"
            ),
            Self::MissingChild { index, slot } => {
                write!(f, "split entry {index} has no child in slot {slot:?}")
            }
            Self::MultipleRoots { index } => {
                write!(f, "entry {index} is a second root entry")
            }
            Self::TreeNotEmpty { panels } => write!(
                f,
                "cannot import placeholders into a tree holding {panels} live panels"
            ),
            Self::InvalidPlaceholder { index } => {
                write!(f, "entry {index} carries an empty placeholder id")
            }
            Self::NodeIdOverflow { current } => write!(f, "node id overflow after {current}"),
            Self::Rebuild(err) => write!(f, "imported skeleton is invalid: {err}"),
        }
    }
}

impl std::error::Error for PlaceholderMapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        if let Self::Rebuild(err) = self {
            return Some(err);
        }
        None
    }
}
