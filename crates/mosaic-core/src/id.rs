//! Opaque identifiers for docked content.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable key of a panel (a dockable unit of content).
///
/// The layout never interprets the key; it only compares and hashes it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PanelId(String);

impl PanelId {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PanelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PanelId {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

/// Stable token naming a position a panel once occupied (or may occupy).
///
/// Placeholders survive the removal of their panel and are what session
/// persistence writes to disk.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaceholderId(String);

impl PlaceholderId {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the token is empty. Empty tokens are never valid placeholders.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PlaceholderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlaceholderId {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

#[cfg(test)]
mod tests {
    use super::{PanelId, PlaceholderId};

    #[test]
    fn ids_serialize_transparently() {
        let panel = PanelId::new("editor");
        let json = serde_json::to_string(&panel).expect("panel id should serialize");
        assert_eq!(json, "\"editor\"");
        let back: PlaceholderId =
            serde_json::from_str("\"editor\"").expect("placeholder id should deserialize");
        assert_eq!(back.as_str(), panel.as_str());
    }

    #[test]
    fn empty_placeholder_detected() {
        assert!(PlaceholderId::new("").is_empty());
        assert!(!PlaceholderId::from("p").is_empty());
    }
}
