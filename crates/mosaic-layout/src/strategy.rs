//! Pluggable policies consulted by the tree: placeholder tracking and
//! stacking.

use std::fmt;

use mosaic_core::{PanelId, PlaceholderId};

/// Decides which placeholder, if any, remembers a panel's position.
///
/// A tree without a strategy never keeps placeholders for removed panels.
pub trait PlaceholderStrategy: fmt::Debug + Send + Sync {
    /// Placeholder naming `panel`'s position, or `None` to forget the panel
    /// on removal.
    fn placeholder_for(&self, panel: &PanelId) -> Option<PlaceholderId>;

    /// Whether a placeholder restored from a map is still meaningful.
    /// Invalid ids are dropped on import.
    fn is_valid_placeholder(&self, placeholder: &PlaceholderId) -> bool {
        !placeholder.is_empty()
    }
}

/// Uses the panel key itself as the placeholder id.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanelKeyStrategy;

impl PlaceholderStrategy for PanelKeyStrategy {
    fn placeholder_for(&self, panel: &PanelId) -> Option<PlaceholderId> {
        if panel.as_str().is_empty() {
            return None;
        }
        Some(PlaceholderId::new(panel.as_str()))
    }
}

/// Merges an incoming panel into an existing one (tabbed stacks and the
/// like). The spatial tree treats the result as a single opaque panel.
pub trait Combiner: fmt::Debug + Send + Sync {
    /// Return the panel that replaces `existing` in its leaf, or `None` to
    /// refuse the merge.
    fn combine(&self, existing: &PanelId, incoming: &PanelId) -> Option<PanelId>;
}

#[cfg(test)]
mod tests {
    use super::{PanelKeyStrategy, PlaceholderStrategy};
    use mosaic_core::{PanelId, PlaceholderId};

    #[test]
    fn panel_key_strategy_mirrors_key() {
        let strategy = PanelKeyStrategy;
        assert_eq!(
            strategy.placeholder_for(&PanelId::new("console")),
            Some(PlaceholderId::new("console"))
        );
        assert_eq!(strategy.placeholder_for(&PanelId::new("")), None);
        assert!(!strategy.is_valid_placeholder(&PlaceholderId::new("")));
    }
}
