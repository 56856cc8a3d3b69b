//! Aside requests: place a new position next to an existing one.
//!
//! An [`AsideRequest`] is executed once against an [`AsideContainer`]. The
//! container may answer itself and may forward fresh requests to a parent
//! or child container; the answers are chained parent, own, child.

use std::fmt;
use std::sync::Arc;

use mosaic_core::PlaceholderId;
use serde::{Deserialize, Serialize};

use crate::location::Location;
use crate::placeholder::PlaceholderMap;
use crate::strategy::PlaceholderStrategy;
use crate::tree::SplitTree;

/// Lifecycle of an [`AsideRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AsideState {
    Created,
    Executing,
    Answered,
    Canceled,
}

impl AsideState {
    #[must_use]
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Answered | Self::Canceled)
    }
}

/// Result of one executed request.
///
/// `location: None` on a non-canceled answer means the new position merges
/// directly with whatever forwarded the request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AsideAnswer {
    pub canceled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<PlaceholderMap>,
}

impl AsideAnswer {
    #[must_use]
    pub fn canceled() -> Self {
        Self {
            canceled: true,
            location: None,
            layout: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsideError {
    /// The request already ran; requests are single-use.
    AlreadyExecuted { state: AsideState },
}

impl fmt::Display for AsideError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyExecuted { state } => {
                write!(f, "aside request was already executed (state {state:?})")
            }
        }
    }
}

impl std::error::Error for AsideError {}

/// Something that can place a new position relative to a location.
pub trait AsideContainer {
    /// Handle `context`. Not calling [`AsideContext::answer`] and not
    /// receiving an answer from a forward cancels the request.
    fn handle_aside(&mut self, context: &mut AsideContext<'_>);
}

/// Single-use request to create `placeholder` beside `location`.
#[derive(Debug, Clone)]
pub struct AsideRequest {
    location: Location,
    placeholder: PlaceholderId,
    state: AsideState,
    answer: Option<AsideAnswer>,
}

impl AsideRequest {
    #[must_use]
    pub fn new(location: Location, placeholder: PlaceholderId) -> Self {
        Self {
            location,
            placeholder,
            state: AsideState::Created,
            answer: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> AsideState {
        self.state
    }

    #[must_use]
    pub fn location(&self) -> &Location {
        &self.location
    }

    #[must_use]
    pub fn placeholder(&self) -> &PlaceholderId {
        &self.placeholder
    }

    /// Final answer once the request has finished.
    #[must_use]
    pub fn answer(&self) -> Option<&AsideAnswer> {
        self.answer.as_ref()
    }

    /// Run the request against `container`.
    pub fn execute(
        &mut self,
        container: &mut dyn AsideContainer,
    ) -> Result<AsideAnswer, AsideError> {
        if self.state != AsideState::Created {
            tracing::warn!(
                target: "mosaic.layout",
                placeholder = %self.placeholder,
                state = ?self.state,
                "aside request executed twice"
            );
            return Err(AsideError::AlreadyExecuted { state: self.state });
        }
        self.state = AsideState::Executing;

        let mut context = AsideContext::new(&self.location, &self.placeholder);
        container.handle_aside(&mut context);
        let answer = context.finish();

        self.state = if answer.canceled {
            AsideState::Canceled
        } else {
            AsideState::Answered
        };
        tracing::debug!(
            target: "mosaic.layout",
            placeholder = %self.placeholder,
            state = ?self.state,
            links = answer.location.as_ref().map_or(0, Location::link_count),
            "aside request finished"
        );
        self.answer = Some(answer.clone());
        Ok(answer)
    }
}

/// View of a running request handed to [`AsideContainer::handle_aside`].
#[derive(Debug)]
pub struct AsideContext<'a> {
    location: &'a Location,
    placeholder: &'a PlaceholderId,
    parent: Option<AsideAnswer>,
    own: Option<Option<Location>>,
    own_layout: Option<PlaceholderMap>,
    child: Option<AsideAnswer>,
}

impl<'a> AsideContext<'a> {
    fn new(location: &'a Location, placeholder: &'a PlaceholderId) -> Self {
        Self {
            location,
            placeholder,
            parent: None,
            own: None,
            own_layout: None,
            child: None,
        }
    }

    /// Location this container should interpret (its first link).
    #[must_use]
    pub fn location(&self) -> &'a Location {
        self.location
    }

    #[must_use]
    pub fn placeholder(&self) -> &'a PlaceholderId {
        self.placeholder
    }

    /// Answer for this container. `None` means "merge directly".
    pub fn answer(&mut self, location: Option<Location>) {
        self.own = Some(location);
    }

    /// Layout to return alongside this container's answer.
    pub fn set_layout(&mut self, layout: PlaceholderMap) {
        self.own_layout = Some(layout);
    }

    /// Whether any part of the chain has answered so far.
    #[must_use]
    pub fn is_answered(&self) -> bool {
        self.own.is_some()
            || [&self.parent, &self.child]
                .into_iter()
                .flatten()
                .any(|answer| !answer.canceled)
    }

    /// Ask `parent` to place the new position at `location` in its own
    /// terms. Returns the parent's answer.
    pub fn forward_parent(
        &mut self,
        parent: &mut dyn AsideContainer,
        location: Location,
    ) -> Result<AsideAnswer, AsideError> {
        let answer = AsideRequest::new(location, self.placeholder.clone()).execute(parent)?;
        self.parent = Some(answer.clone());
        Ok(answer)
    }

    /// Hand the rest of the location chain to `child`. Without a successor
    /// there is nothing to forward and the child is not consulted.
    pub fn forward_child(
        &mut self,
        child: &mut dyn AsideContainer,
    ) -> Result<AsideAnswer, AsideError> {
        let Some(successor) = self.location.successor() else {
            return Ok(AsideAnswer::canceled());
        };
        let answer =
            AsideRequest::new(successor.clone(), self.placeholder.clone()).execute(child)?;
        self.child = Some(answer.clone());
        Ok(answer)
    }

    fn finish(self) -> AsideAnswer {
        let own = self.own.map(|location| AsideAnswer {
            canceled: false,
            location,
            layout: self.own_layout,
        });
        let parts = [self.parent, own, self.child]
            .into_iter()
            .flatten()
            .filter(|answer| !answer.canceled)
            .collect::<Vec<_>>();
        if parts.is_empty() {
            return AsideAnswer::canceled();
        }

        let mut location: Option<Location> = None;
        let mut layout = None;
        for part in parts {
            if let Some(next) = part.location {
                match location.as_mut() {
                    Some(chain) => chain.append_tail(next),
                    None => location = Some(next),
                }
            }
            if part.layout.is_some() {
                layout = part.layout;
            }
        }
        AsideAnswer {
            canceled: false,
            location,
            layout,
        }
    }
}

impl AsideContainer for SplitTree {
    fn handle_aside(&mut self, context: &mut AsideContext<'_>) {
        let Some(target) = self.resolve_location(context.location()) else {
            tracing::debug!(
                target: "mosaic.layout",
                placeholder = %context.placeholder(),
                "aside location did not resolve"
            );
            return;
        };
        match self.insert_placeholder(target, context.placeholder().clone()) {
            Ok(outcome) => {
                let location = outcome.node.and_then(|node| self.location_of_node(node));
                context.answer(location);
            }
            Err(err) => {
                tracing::warn!(
                    target: "mosaic.layout",
                    placeholder = %context.placeholder(),
                    reason = %err.reason,
                    "aside placement rejected"
                );
            }
        }
    }
}

impl SplitTree {
    /// Create a placeholder node for `placeholder` beside the node at
    /// `location` and answer with its location.
    pub fn request_aside(
        &mut self,
        location: Location,
        placeholder: PlaceholderId,
    ) -> Result<AsideAnswer, AsideError> {
        AsideRequest::new(location, placeholder).execute(self)
    }
}

/// Aside target for a station that exists only as a placeholder map.
///
/// Each request is resolved against a scratch tree rebuilt from the map.
/// The updated map is kept and returned as the answer's layout.
#[derive(Debug, Clone, Default)]
pub struct SkeletonStation {
    map: PlaceholderMap,
    strategy: Option<Arc<dyn PlaceholderStrategy>>,
}

impl SkeletonStation {
    #[must_use]
    pub fn new(map: PlaceholderMap) -> Self {
        Self {
            map,
            strategy: None,
        }
    }

    /// Validate imported ids with `strategy`.
    #[must_use]
    pub fn with_placeholder_strategy(mut self, strategy: Arc<dyn PlaceholderStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    #[must_use]
    pub fn map(&self) -> &PlaceholderMap {
        &self.map
    }

    #[must_use]
    pub fn into_map(self) -> PlaceholderMap {
        self.map
    }
}

impl AsideContainer for SkeletonStation {
    fn handle_aside(&mut self, context: &mut AsideContext<'_>) {
        let mut scratch = SplitTree::new();
        if let Some(strategy) = &self.strategy {
            scratch = scratch.with_placeholder_strategy(Arc::clone(strategy));
        }
        if let Err(err) = scratch.import_placeholders(&self.map) {
            tracing::warn!(
                target: "mosaic.layout",
                reason = %err,
                "skeleton station map rejected"
            );
            return;
        }

        scratch.handle_aside(context);
        if !context.is_answered() {
            return;
        }
        let mut layout = scratch.export_placeholders();
        layout.extensions = self.map.extensions.clone();
        self.map = layout.clone();
        context.set_layout(layout);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use mosaic_core::PanelId;

    use super::*;
    use crate::location::{LocationHint, LocationProperty, SplitLocation};
    use crate::node::NodeKind;
    use crate::strategy::PanelKeyStrategy;

    fn custom(name: &str) -> Location {
        Location::new(LocationProperty::Custom {
            name: name.to_owned(),
            extensions: BTreeMap::new(),
        })
    }

    fn names(location: &Location) -> Vec<String> {
        location
            .properties()
            .filter_map(|property| match property {
                LocationProperty::Custom { name, .. } => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    /// Answers with a fixed location, or not at all.
    #[derive(Debug)]
    struct Fixed(Option<Location>);

    impl AsideContainer for Fixed {
        fn handle_aside(&mut self, context: &mut AsideContext<'_>) {
            if let Some(location) = self.0.clone() {
                context.answer(Some(location));
            }
        }
    }

    /// Forwards to both neighbours without answering itself.
    #[derive(Debug)]
    struct Relay {
        parent: Fixed,
        child: Fixed,
    }

    impl AsideContainer for Relay {
        fn handle_aside(&mut self, context: &mut AsideContext<'_>) {
            let _ = context
                .forward_parent(&mut self.parent, custom("to-parent"))
                .expect("fresh request");
            let _ = context.forward_child(&mut self.child).expect("fresh request");
        }
    }

    #[test]
    fn child_answer_becomes_tail_of_parent_answer() {
        let mut relay = Relay {
            parent: Fixed(Some(custom("parent"))),
            child: Fixed(Some(custom("child"))),
        };
        let mut request = AsideRequest::new(
            custom("self").with_successor(custom("rest")),
            PlaceholderId::new("new"),
        );
        let answer = request.execute(&mut relay).expect("execute");
        assert!(!answer.canceled);
        let location = answer.location.expect("chained location");
        assert_eq!(names(&location), vec!["parent", "child"]);
        assert_eq!(request.state(), AsideState::Answered);
    }

    #[test]
    fn single_side_answer_is_used_verbatim() {
        let mut relay = Relay {
            parent: Fixed(None),
            child: Fixed(Some(custom("child"))),
        };
        let mut request = AsideRequest::new(
            custom("self").with_successor(custom("rest")),
            PlaceholderId::new("new"),
        );
        let answer = request.execute(&mut relay).expect("execute");
        assert_eq!(answer.location.as_ref().map(names), Some(vec!["child".to_owned()]));
    }

    #[test]
    fn no_answer_cancels() {
        let mut relay = Relay {
            parent: Fixed(None),
            child: Fixed(None),
        };
        let mut request = AsideRequest::new(custom("self"), PlaceholderId::new("new"));
        let answer = request.execute(&mut relay).expect("execute");
        assert!(answer.canceled);
        assert_eq!(request.state(), AsideState::Canceled);
    }

    #[test]
    fn null_answer_is_not_a_cancel() {
        #[derive(Debug)]
        struct Merge;
        impl AsideContainer for Merge {
            fn handle_aside(&mut self, context: &mut AsideContext<'_>) {
                context.answer(None);
            }
        }

        let mut request = AsideRequest::new(custom("self"), PlaceholderId::new("new"));
        let answer = request.execute(&mut Merge).expect("execute");
        assert!(!answer.canceled);
        assert_eq!(answer.location, None);
    }

    #[test]
    fn executing_twice_is_an_error() {
        let mut request = AsideRequest::new(custom("self"), PlaceholderId::new("new"));
        let _ = request.execute(&mut Fixed(Some(custom("a")))).expect("first");
        let err = request
            .execute(&mut Fixed(Some(custom("a"))))
            .expect_err("second run");
        assert_eq!(err, AsideError::AlreadyExecuted {
            state: AsideState::Answered
        });
    }

    #[test]
    fn split_tree_creates_placeholder_beside_panel() {
        let mut tree = SplitTree::new().with_placeholder_strategy(Arc::new(PanelKeyStrategy));
        let _ = tree
            .insert(PanelId::new("a"), LocationHint::Anywhere)
            .expect("a");
        let existing = tree.location_of(&PanelId::new("a")).expect("location");

        let answer = tree
            .request_aside(existing, PlaceholderId::new("later"))
            .expect("execute");
        let location = answer.location.expect("answered");
        let node = tree.resolve_location(&location).expect("resolves");
        assert_eq!(tree.placeholder_owner(&PlaceholderId::new("later")), Some(node));
        assert!(matches!(
            tree.node(node).map(|record| &record.kind),
            Some(NodeKind::Placeholder(_))
        ));

        // The remembered position is restored when the panel shows up.
        let outcome = tree
            .insert(PanelId::new("later"), LocationHint::Anywhere)
            .expect("restore");
        assert_eq!(outcome.node, Some(node));
    }

    #[test]
    fn unresolved_location_cancels() {
        let mut tree = SplitTree::new();
        let location = Location::new(LocationProperty::Split(SplitLocation::default()));
        let answer = tree
            .request_aside(location, PlaceholderId::new("x"))
            .expect("execute");
        assert!(answer.canceled);
    }

    #[test]
    fn skeleton_station_answers_with_updated_layout() {
        let mut live = SplitTree::new().with_placeholder_strategy(Arc::new(PanelKeyStrategy));
        let _ = live
            .insert(PanelId::new("tools"), LocationHint::Anywhere)
            .expect("tools");
        let existing = live.location_of(&PanelId::new("tools")).expect("location");

        let mut station = SkeletonStation::new(live.export_placeholders())
            .with_placeholder_strategy(Arc::new(PanelKeyStrategy));
        let answer = AsideRequest::new(existing, PlaceholderId::new("log"))
            .execute(&mut station)
            .expect("execute");

        assert!(!answer.canceled);
        let layout = answer.layout.expect("layout");
        assert!(layout.placeholders().any(|id| id.as_str() == "log"));
        assert!(layout.placeholders().any(|id| id.as_str() == "tools"));
        assert_eq!(station.map(), &layout);
    }
}
