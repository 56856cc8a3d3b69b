//! Lazy depth-first traversal.

use std::iter::FusedIterator;

use crate::node::{NodeId, NodeView};
use crate::tree::SplitTree;

/// Pre-order walk (node, then first child, then second child).
///
/// The walk is lazy and can be restarted without reallocating.
#[derive(Debug, Clone)]
pub struct DepthFirst<'a> {
    tree: &'a SplitTree,
    start: NodeId,
    stack: Vec<(NodeId, usize)>,
}

impl<'a> DepthFirst<'a> {
    pub(crate) fn new(tree: &'a SplitTree, start: NodeId) -> Self {
        let mut walk = Self {
            tree,
            start,
            stack: Vec::new(),
        };
        walk.restart();
        walk
    }

    /// Rewind to the starting node.
    pub fn restart(&mut self) {
        self.stack.clear();
        if self.tree.node(self.start).is_some() {
            self.stack.push((self.start, 0));
        }
    }
}

impl<'a> Iterator for DepthFirst<'a> {
    type Item = NodeView<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((id, depth)) = self.stack.pop() {
            let Some(record) = self.tree.node(id) else {
                continue;
            };
            let children = record.kind.children().collect::<Vec<_>>();
            self.stack
                .extend(children.into_iter().rev().map(|child| (child, depth + 1)));
            return Some(NodeView::new(record, depth));
        }
        None
    }
}

impl FusedIterator for DepthFirst<'_> {}
