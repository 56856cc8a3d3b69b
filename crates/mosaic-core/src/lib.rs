#![forbid(unsafe_code)]

//! Core: geometry and identity primitives for the mosaic docking layout.
//!
//! # Role in mosaic
//! `mosaic-core` holds the small value types every other crate agrees on:
//! fractional [`Bounds`] in root-ratio space, integer [`PixelRect`]s for the
//! host toolkit, and the opaque [`PanelId`] / [`PlaceholderId`] keys that
//! identify docked content across sessions.
//!
//! # How it fits in the system
//! The layout engine (`mosaic-layout`) owns the split tree and all of its
//! policy. This crate stays free of policy so hosts can depend on the value
//! types without pulling in the engine.

pub mod geometry;
pub mod id;

pub use geometry::{Bounds, PixelRect, Point, Size};
pub use id::{PanelId, PlaceholderId};
