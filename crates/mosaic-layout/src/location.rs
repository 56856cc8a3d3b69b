//! Location chains and insertion hints.
//!
//! A [`Location`] describes where a panel sits (or should sit) as a chain of
//! properties, outermost first. Each container along the chain interprets
//! its own property and hands the successor to the next container down.

use std::collections::BTreeMap;

use mosaic_core::{PanelId, PlaceholderId};
use serde::{Deserialize, Serialize};

use crate::drop::PutInfo;
use crate::node::{NodeId, Orientation, Put, Slot};

/// One split crossed on the way from the root to a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathStep {
    pub orientation: Orientation,
    pub slot: Slot,
    pub divider: f64,
}

/// Position inside a split tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SplitLocation {
    /// Splits from the root content down to the node.
    #[serde(default)]
    pub path: Vec<PathStep>,
    /// Placeholder identifying the node; preferred over `path` when the
    /// tree still knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<PlaceholderId>,
}

/// One link of a location chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LocationProperty {
    Split(SplitLocation),
    Placeholder { placeholder: PlaceholderId },
    Stack {
        index: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        placeholder: Option<PlaceholderId>,
    },
    /// Property understood by some other kind of container.
    Custom {
        name: String,
        #[serde(default)]
        extensions: BTreeMap<String, String>,
    },
}

/// Singly linked chain of location properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub property: LocationProperty,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub successor: Option<Box<Location>>,
}

impl Location {
    #[must_use]
    pub fn new(property: LocationProperty) -> Self {
        Self {
            property,
            successor: None,
        }
    }

    #[must_use]
    pub fn with_successor(mut self, successor: Location) -> Self {
        self.successor = Some(Box::new(successor));
        self
    }

    #[must_use]
    pub fn successor(&self) -> Option<&Location> {
        self.successor.as_deref()
    }

    /// Attach `tail` after the last link of this chain.
    pub fn append_tail(&mut self, tail: Location) {
        match &mut self.successor {
            Some(next) => next.append_tail(tail),
            None => self.successor = Some(Box::new(tail)),
        }
    }

    /// Properties from this link to the end of the chain.
    pub fn properties(&self) -> impl Iterator<Item = &LocationProperty> {
        std::iter::successors(Some(self), |loc| loc.successor()).map(|loc| &loc.property)
    }

    /// Number of links in the chain, at least one.
    #[must_use]
    pub fn link_count(&self) -> usize {
        self.properties().count()
    }
}

/// Where [`crate::SplitTree::insert`] and [`crate::SplitTree::move_panel`]
/// should put a panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "hint", rename_all = "snake_case")]
pub enum LocationHint {
    /// Restore the panel's placeholder if the tree has one; otherwise the
    /// first leaf of an empty tree, or right of the current root content.
    Anywhere,
    /// Next to (or stacked onto) another panel.
    Beside {
        panel: PanelId,
        put: Put,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ratio: Option<f64>,
    },
    /// Next to (or into) a specific node.
    Node {
        target: NodeId,
        put: Put,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ratio: Option<f64>,
    },
    /// Commit a resolved drop.
    Drop(PutInfo),
    /// Occupy the position remembered by a placeholder.
    Placeholder { placeholder: PlaceholderId },
    /// A location chain; only its first link is interpreted by the tree.
    Location(Location),
}
