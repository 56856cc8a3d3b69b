//! Tuning knobs for the layout engine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Geometry policy shared by insertion, drop resolution and locked resizes.
///
/// All values are fractions of a node's extent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Width of each of the four drop bands, relative to the target.
    pub edge_band: f64,
    /// Share of the target's extent that the original content keeps when a
    /// panel is dropped beside it (and the most the incoming panel may take
    /// from the other side).
    pub min_fraction: f64,
    /// Divider used when an insertion does not name one.
    pub default_divider: f64,
    /// Share a sibling keeps when a locked leaf claims more than fits.
    pub lock_floor: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            edge_band: 0.25,
            min_fraction: 0.25,
            default_divider: 0.5,
            lock_floor: 0.0,
        }
    }
}

impl LayoutConfig {
    pub fn new(
        edge_band: f64,
        min_fraction: f64,
        default_divider: f64,
        lock_floor: f64,
    ) -> Result<Self, LayoutConfigError> {
        let config = Self {
            edge_band,
            min_fraction,
            default_divider,
            lock_floor,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(self) -> Result<(), LayoutConfigError> {
        check("edge_band", self.edge_band, |v| v > 0.0 && v <= 0.5)?;
        check("min_fraction", self.min_fraction, |v| (0.0..0.5).contains(&v))?;
        check("default_divider", self.default_divider, |v| {
            (0.0..=1.0).contains(&v)
        })?;
        check("lock_floor", self.lock_floor, |v| (0.0..0.5).contains(&v))?;
        Ok(())
    }

    /// Clamp an incoming panel's share of a target into the band the
    /// original content must keep.
    #[must_use]
    pub fn clamp_share(self, share: f64) -> f64 {
        let share = if share.is_finite() { share } else { 0.5 };
        share.clamp(self.min_fraction, 1.0 - self.min_fraction)
    }
}

fn check(
    field: &'static str,
    value: f64,
    ok: impl Fn(f64) -> bool,
) -> Result<(), LayoutConfigError> {
    if value.is_finite() && ok(value) {
        Ok(())
    } else {
        Err(LayoutConfigError::OutOfRange { field, value })
    }
}

/// Rejected configuration value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayoutConfigError {
    OutOfRange { field: &'static str, value: f64 },
}

impl fmt::Display for LayoutConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { field, value } => {
                write!(f, "layout config field {field} is out of range: {value}")
            }
        }
    }
}

impl std::error::Error for LayoutConfigError {}
