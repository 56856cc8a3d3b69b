#![forbid(unsafe_code)]

//! Split-tree docking layout with persistent placeholders.
//!
//! # Role in mosaic
//! `mosaic-layout` decides where docked panels live. A [`SplitTree`]
//! partitions the container among panels with binary splits, resolves drop
//! points into edits ([`SplitTree::resolve_drop`]), and keeps the position
//! of removed panels as placeholder nodes so they can come back to the same
//! spot, in this session or after a reload via a [`PlaceholderMap`].
//!
//! # Editing
//! Every structural edit is a [`LayoutOperation`] applied atomically by
//! [`SplitTree::apply_operation`]; the convenience methods
//! [`SplitTree::insert`], [`SplitTree::remove`] and
//! [`SplitTree::move_panel`] wrap it. Committed edits queue
//! [`LayoutEvent`]s and trigger a relayout unless the tree is frozen.
//!
//! # Relative placement
//! [`AsideRequest`] places a new placeholder beside an existing location,
//! across any number of [`AsideContainer`]s, without a live panel.

pub mod aside;
pub mod config;
pub mod drop;
pub mod error;
pub mod location;
pub mod node;
pub mod placeholder;
pub mod resize;
pub mod strategy;
pub mod traverse;
pub mod tree;

pub use aside::{
    AsideAnswer, AsideContainer, AsideContext, AsideError, AsideRequest, AsideState,
    SkeletonStation,
};
pub use config::{LayoutConfig, LayoutConfigError};
pub use drop::{DropQuery, PutInfo};
pub use error::{LayoutFailure, LayoutModelError, LayoutOperationError, PlaceholderMapError};
pub use location::{Location, LocationHint, LocationProperty, PathStep, SplitLocation};
pub use node::{
    Inspect, InspectField, LeafNode, NodeId, NodeKind, NodeRecord, NodeView, Orientation,
    PlaceholderNode, PlaceholderSet, Put, RootNode, Slot, SplitNode,
};
pub use placeholder::{PLACEHOLDER_MAP_SCHEMA_VERSION, PlaceholderEntry, PlaceholderMap};
pub use resize::{LockedSize, ResizeRequest};
pub use strategy::{Combiner, PanelKeyStrategy, PlaceholderStrategy};
pub use traverse::DepthFirst;
pub use tree::{
    FreezeGuard, LayoutEvent, LayoutOperation, LayoutOperationKind, LayoutOperationOutcome,
    SplitTree,
};

pub use mosaic_core::{Bounds, PanelId, PixelRect, PlaceholderId, Point, Size};
