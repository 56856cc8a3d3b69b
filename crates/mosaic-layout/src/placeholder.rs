//! Placeholder map: the persisted, panel-free shape of a split tree.
//!
//! Entries are written in pre-order, so every entry's parent is an earlier
//! entry. A split entry carries its orientation and divider; every other
//! entry is a position that either restores a panel or becomes a
//! [`crate::NodeKind::Placeholder`] node on import.

use std::collections::{BTreeMap, BTreeSet};

use mosaic_core::{PanelId, PlaceholderId};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::PlaceholderMapError;
use crate::node::{
    LeafNode, NodeId, NodeKind, NodeRecord, Orientation, PlaceholderNode, PlaceholderSet,
    SplitNode, Slot,
};
use crate::tree::{LayoutEvent, SplitTree, sanitize_divider};

/// Current on-disk schema version for [`PlaceholderMap`].
pub const PLACEHOLDER_MAP_SCHEMA_VERSION: u16 = 1;

const fn default_schema_version() -> u16 {
    PLACEHOLDER_MAP_SCHEMA_VERSION
}

/// One position in the persisted tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlaceholderEntry {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub placeholders: Vec<PlaceholderId>,
    /// Present exactly for split entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Orientation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub divider: Option<f64>,
    /// Index of the parent split entry; `None` for the root content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<usize>,
    #[serde(default)]
    pub slot: Slot,
}

impl PlaceholderEntry {
    #[must_use]
    pub fn is_split(&self) -> bool {
        self.orientation.is_some()
    }
}

/// Ordered, serializable description of tree shape keyed by placeholder ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceholderMap {
    #[serde(default = "default_schema_version")]
    pub schema_version: u16,
    #[serde(default)]
    pub entries: Vec<PlaceholderEntry>,
    /// Opaque data preserved across round-trips.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, String>,
}

impl Default for PlaceholderMap {
    fn default() -> Self {
        Self {
            schema_version: PLACEHOLDER_MAP_SCHEMA_VERSION,
            entries: Vec::new(),
            extensions: BTreeMap::new(),
        }
    }
}

impl PlaceholderMap {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every placeholder id in entry order.
    pub fn placeholders(&self) -> impl Iterator<Item = &PlaceholderId> {
        self.entries.iter().flat_map(|entry| entry.placeholders.iter())
    }

    /// Check the map's own consistency: schema, unique non-empty ids and a
    /// well-formed parent/slot structure.
    pub fn validate(&self) -> Result<(), PlaceholderMapError> {
        if self.schema_version != PLACEHOLDER_MAP_SCHEMA_VERSION {
            return Err(PlaceholderMapError::UnsupportedSchemaVersion {
                version: self.schema_version,
            });
        }

        let mut seen: FxHashMap<&PlaceholderId, usize> = FxHashMap::default();
        let mut claimed: BTreeSet<(usize, Slot)> = BTreeSet::new();
        let mut root: Option<usize> = None;
        for (index, entry) in self.entries.iter().enumerate() {
            for placeholder in &entry.placeholders {
                if placeholder.is_empty() {
                    return Err(PlaceholderMapError::InvalidPlaceholder { index });
                }
                if let Some(first_index) = seen.insert(placeholder, index) {
                    return Err(PlaceholderMapError::DuplicatePlaceholder {
                        placeholder: placeholder.clone(),
                        first_index,
                        second_index: index,
                    });
                }
            }

            match entry.parent {
                None if root.is_some() => {
                    return Err(PlaceholderMapError::MultipleRoots { index });
                }
                None => root = Some(index),
                Some(parent) if parent >= index => {
                    return Err(PlaceholderMapError::DanglingParent { index, parent });
                }
                Some(parent) => {
                    if !self.entries[parent].is_split() {
                        return Err(PlaceholderMapError::ParentNotSplit { index, parent });
                    }
                    if !claimed.insert((parent, entry.slot)) {
                        return Err(PlaceholderMapError::SlotOccupied {
                            index,
                            parent,
                            slot: entry.slot,
                        });
                    }
                }
            }
        }

        for (index, entry) in self.entries.iter().enumerate() {
            if !entry.is_split() {
                continue;
            }
            for slot in [Slot::First, Slot::Second] {
                if !claimed.contains(&(index, slot)) {
                    return Err(PlaceholderMapError::MissingChild { index, slot });
                }
            }
        }
        Ok(())
    }
}

/// Import plan for one map entry.
#[derive(Debug, Default)]
struct PlannedEntry {
    placeholders: Vec<PlaceholderId>,
    panel: Option<PanelId>,
    children: [Option<usize>; 2],
    alive: bool,
}

impl SplitTree {
    /// Snapshot the tree's shape as a placeholder map.
    ///
    /// A leaf's entry lists its panel's own placeholder (when the strategy
    /// assigns one) ahead of the ids it carries, so the panel can be
    /// restored from the map alone.
    ///
    /// Without a placeholder strategy leaves carry no ids, and importing the
    /// result prunes every position. Round-trips need a strategy.
    #[must_use]
    pub fn export_placeholders(&self) -> PlaceholderMap {
        let mut indices: FxHashMap<NodeId, usize> = FxHashMap::default();
        let mut entries = Vec::new();
        for view in self.iter() {
            let record = view.record();
            let (orientation, divider) = match &record.kind {
                NodeKind::Root(_) => continue,
                NodeKind::Split(split) => (Some(split.orientation), Some(split.divider)),
                NodeKind::Leaf(_) | NodeKind::Placeholder(_) => (None, None),
            };

            let mut placeholders = Vec::with_capacity(record.placeholders.len() + 1);
            if let Some(own) = record
                .panel()
                .and_then(|panel| self.strategy_placeholder(panel))
            {
                placeholders.push(own);
            }
            for placeholder in record.placeholders.iter() {
                if !placeholders.contains(placeholder) {
                    placeholders.push(placeholder.clone());
                }
            }

            let parent_record = record.parent.and_then(|parent| self.node(parent));
            let (parent, slot) = match parent_record.map(|parent| (&parent.kind, parent.id)) {
                Some((NodeKind::Split(split), parent_id)) => (
                    indices.get(&parent_id).copied(),
                    split.slot_of(record.id).unwrap_or_default(),
                ),
                _ => (None, Slot::First),
            };

            let _ = indices.insert(record.id, entries.len());
            entries.push(PlaceholderEntry {
                placeholders,
                orientation,
                divider,
                parent,
                slot,
            });
        }

        tracing::debug!(
            target: "mosaic.layout",
            entries = entries.len(),
            "placeholders exported"
        );
        PlaceholderMap {
            entries,
            ..PlaceholderMap::default()
        }
    }

    /// Replace the tree's skeleton with `map`. No panels are restored.
    ///
    /// Fails without touching the tree when the map is inconsistent or the
    /// tree still shows panels.
    pub fn import_placeholders(
        &mut self,
        map: &PlaceholderMap,
    ) -> Result<(), PlaceholderMapError> {
        self.import_placeholders_with(map, |_| None).map(|_| ())
    }

    /// Like [`Self::import_placeholders`], restoring a panel into every
    /// position for which `restore` maps one of its placeholders to a panel.
    /// Returns the number of panels restored.
    ///
    /// Ids the placeholder strategy rejects are dropped; positions left with
    /// neither ids nor a panel are pruned, collapsing their parent split.
    pub fn import_placeholders_with<F>(
        &mut self,
        map: &PlaceholderMap,
        mut restore: F,
    ) -> Result<usize, PlaceholderMapError>
    where
        F: FnMut(&PlaceholderId) -> Option<PanelId>,
    {
        if !self.panels.is_empty() {
            return Err(PlaceholderMapError::TreeNotEmpty {
                panels: self.panels.len(),
            });
        }
        map.validate()?;

        let mut plan: Vec<PlannedEntry> = Vec::with_capacity(map.entries.len());
        let mut restored_panels: BTreeSet<PanelId> = BTreeSet::new();
        for (index, entry) in map.entries.iter().enumerate() {
            let mut planned = PlannedEntry::default();
            for placeholder in &entry.placeholders {
                if self.is_valid_placeholder(placeholder) {
                    planned.placeholders.push(placeholder.clone());
                } else {
                    tracing::warn!(
                        target: "mosaic.layout",
                        index,
                        placeholder = %placeholder,
                        "dropping invalid placeholder on import"
                    );
                }
            }
            if !entry.is_split() {
                planned.panel = planned
                    .placeholders
                    .iter()
                    .filter_map(&mut restore)
                    .find(|panel| !restored_panels.contains(panel));
                if let Some(panel) = &planned.panel {
                    let _ = restored_panels.insert(panel.clone());
                }
            }
            if let Some(parent) = entry.parent {
                let slot = match entry.slot {
                    Slot::First => 0,
                    Slot::Second => 1,
                };
                plan[parent].children[slot] = Some(index);
            }
            plan.push(planned);
        }

        // Children always follow their parent, so a reverse sweep settles
        // liveness bottom-up.
        for index in (0..plan.len()).rev() {
            let alive = if map.entries[index].is_split() {
                plan[index]
                    .children
                    .iter()
                    .flatten()
                    .any(|child| plan[*child].alive)
            } else {
                plan[index].panel.is_some() || !plan[index].placeholders.is_empty()
            };
            plan[index].alive = alive;
        }
        let pruned = map
            .entries
            .iter()
            .zip(&plan)
            .filter(|(entry, planned)| !entry.is_split() && !planned.alive)
            .count();
        if pruned > 0 {
            tracing::warn!(
                target: "mosaic.layout",
                pruned,
                entries = map.entries.len(),
                "empty placeholder positions pruned on import"
            );
        }

        let mut working = self.clone();
        working.nodes.retain(|id, _| *id == NodeId::ROOT);
        working.placeholder_index.clear();
        working.events.clear();
        if let Some(NodeKind::Root(root)) = working
            .nodes
            .get_mut(&NodeId::ROOT)
            .map(|record| &mut record.kind)
        {
            root.child = None;
        }

        // Top-down: fold splits with a single live child into that child,
        // which inherits the split's ids, then allocate ids in pre-order.
        let mut landed: Vec<Option<NodeId>> = vec![None; plan.len()];
        let mut built: Vec<(usize, NodeId, NodeId, Vec<PlaceholderId>)> = Vec::new();
        let mut stack: Vec<(usize, NodeId, Vec<PlaceholderId>)> = Vec::new();
        if let Some(root_index) = map.entries.iter().position(|entry| entry.parent.is_none())
            && plan[root_index].alive
        {
            stack.push((root_index, NodeId::ROOT, Vec::new()));
        }
        while let Some((start, parent, mut inherited)) = stack.pop() {
            let mut index = start;
            while map.entries[index].is_split() {
                let live = plan[index]
                    .children
                    .iter()
                    .flatten()
                    .copied()
                    .filter(|child| plan[*child].alive)
                    .collect::<Vec<_>>();
                match live.as_slice() {
                    [only] => {
                        inherited.extend(plan[index].placeholders.iter().cloned());
                        index = *only;
                    }
                    _ => break,
                }
            }

            let id = working.allocate_node_id().map_err(|_| {
                PlaceholderMapError::NodeIdOverflow {
                    current: working.next_id,
                }
            })?;
            landed[start] = Some(id);
            if map.entries[index].is_split() {
                let [first, second] = plan[index].children;
                if let (Some(first), Some(second)) = (first, second) {
                    stack.push((second, id, Vec::new()));
                    stack.push((first, id, Vec::new()));
                }
            }
            built.push((index, id, parent, inherited));
        }

        let mut restored = 0_usize;
        for (index, id, parent, inherited) in built {
            let entry = &map.entries[index];
            let planned = &plan[index];
            let kind = match entry.orientation {
                Some(orientation) => {
                    let [first, second] = planned.children;
                    let child_id = |child: Option<usize>, slot: Slot| {
                        child
                            .and_then(|child| landed[child])
                            .ok_or(PlaceholderMapError::MissingChild { index, slot })
                    };
                    let requested = entry.divider.unwrap_or(working.config.default_divider);
                    let divider = sanitize_divider(requested);
                    if divider != requested {
                        tracing::warn!(
                            target: "mosaic.layout",
                            index,
                            requested,
                            applied = divider,
                            "imported divider clamped"
                        );
                    }
                    NodeKind::Split(SplitNode {
                        orientation,
                        divider,
                        first: child_id(first, Slot::First)?,
                        second: child_id(second, Slot::Second)?,
                    })
                }
                None => match &planned.panel {
                    Some(panel) => {
                        restored += 1;
                        let _ = working.panels.insert(panel.clone(), id);
                        NodeKind::Leaf(LeafNode {
                            panel: panel.clone(),
                        })
                    }
                    None => NodeKind::Placeholder(PlaceholderNode),
                },
            };

            let own = planned
                .panel
                .as_ref()
                .and_then(|panel| working.strategy_placeholder(panel));
            let placeholders = planned
                .placeholders
                .iter()
                .chain(inherited.iter())
                .filter(|placeholder| own.as_ref() != Some(*placeholder))
                .cloned()
                .collect::<PlaceholderSet>();
            for placeholder in placeholders.iter() {
                let _ = working.placeholder_index.insert(placeholder.clone(), id);
            }

            let mut record = NodeRecord::new(id, Some(parent), kind);
            record.placeholders = placeholders;
            let _ = working.nodes.insert(id, record);
            if parent == NodeId::ROOT
                && let Some(NodeKind::Root(root)) = working
                    .nodes
                    .get_mut(&NodeId::ROOT)
                    .map(|record| &mut record.kind)
            {
                root.child = Some(id);
            }
        }

        // A restored panel's own id may still sit on another position.
        let mut touched = BTreeSet::new();
        for panel in &restored_panels {
            if let Some(leaf) = working.leaf_of(panel) {
                working
                    .claim_own_placeholder(panel, leaf, &mut touched)
                    .map_err(PlaceholderMapError::Rebuild)?;
            }
        }
        working
            .validate()
            .map_err(|err| PlaceholderMapError::Rebuild(err.into()))?;

        let staged = std::mem::take(&mut working.events);
        let mut previous = std::mem::replace(self, working);
        self.events = std::mem::take(&mut previous.events);
        self.events.extend(staged);
        self.events.push(LayoutEvent::Imported {
            entries: map.entries.len(),
            restored,
        });
        tracing::debug!(
            target: "mosaic.layout",
            entries = map.entries.len(),
            nodes = self.nodes.len(),
            restored,
            "placeholders imported"
        );
        self.request_relayout();
        Ok(restored)
    }
}
