//! Source-line anchored blocks of the live tree, as overlapping windows.

use crate::tree::{LiveTree, NodeId};

/// Attribute carrying the first source line of a rendered block.
pub const LINE_ATTR: &str = "data-line-begin";

/// Two consecutive anchored blocks, or the last block on its own.
///
/// Covers the source lines `[line(begin), line(end))`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockWindow {
    pub begin: NodeId,
    pub end: Option<NodeId>,
}

/// Parsed `data-line-begin` of a node.
///
/// Read at lookup time: line numbers shift on edits that don't change the
/// tree structure, so the index only remembers nodes.
pub fn line_begin(tree: &LiveTree, node: NodeId) -> Option<u32> {
    tree.attr(node, LINE_ATTR)?.trim().parse().ok()
}

#[derive(Debug, Default, Clone)]
pub struct BlockIndex {
    windows: Vec<BlockWindow>,
}

impl BlockIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from scratch over every anchored node in document order.
    pub fn rebuild(&mut self, tree: &LiveTree) {
        let blocks: Vec<NodeId> = tree
            .descendants(tree.root())
            .filter(|node| tree.has_attr(*node, LINE_ATTR))
            .collect();

        self.windows.clear();
        self.windows.extend(blocks.iter().enumerate().map(|(i, begin)| BlockWindow {
            begin: *begin,
            end: blocks.get(i + 1).copied(),
        }));
        tracing::trace!(target: "peek::scroll", windows = self.windows.len(), "block index rebuilt");
    }

    pub fn windows(&self) -> &[BlockWindow] {
        &self.windows
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// Whether a nested anchored node was dropped without a change among
    /// the root's children.
    pub fn is_stale(&self, tree: &LiveTree) -> bool {
        self.windows.iter().any(|w| !tree.is_connected(w.begin))
    }

    /// The last window starting at or before `line`, else the first window.
    pub fn locate(&self, tree: &LiveTree, line: u32) -> Option<BlockWindow> {
        self.windows
            .iter()
            .rev()
            .find(|w| line_begin(tree, w.begin).is_some_and(|begin| begin <= line))
            .or_else(|| self.windows.first())
            .copied()
    }
}
