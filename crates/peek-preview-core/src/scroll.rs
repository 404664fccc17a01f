//! Source line to viewport scroll offset.

use crate::block_index::{BlockIndex, line_begin};
use crate::tree::{LiveTree, NodeId};

/// Layout measurements of the rendered tree, supplied by the host.
pub trait LayoutProbe {
    /// Top edge of the node's box relative to the viewport. Nodes without a
    /// box report zero.
    fn client_top(&self, tree: &LiveTree, node: NodeId) -> f64;

    fn height(&self, tree: &LiveTree, node: NodeId) -> f64;

    fn width(&self, tree: &LiveTree, node: NodeId) -> f64;

    fn viewport_height(&self) -> f64;

    /// Current vertical scroll position of the document.
    fn scroll_y(&self) -> f64;

    fn document_height(&self) -> f64;
}

/// Document-relative top of `node`.
///
/// Walks up from `node` and takes the first non-zero top edge, so box-less
/// elements defer to their nearest laid out ancestor.
pub fn document_offset(probe: &impl LayoutProbe, tree: &LiveTree, node: NodeId) -> f64 {
    let mut current = Some(node);
    let mut top = 0.0;
    while top == 0.0 {
        let Some(id) = current else { break };
        top = probe.client_top(tree, id);
        current = tree.parent(id);
    }
    let top = if top.is_finite() { top } else { 0.0 };
    top + probe.scroll_y()
}

/// Where to scroll, and the interval the target was derived from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollPlan {
    pub top: f64,
    pub line_begin: u32,
    pub line_end: u32,
    pub pixels_per_line: f64,
}

/// Keeps the last requested source line so layout changes can re-center it.
#[derive(Debug, Default, Clone)]
pub struct ScrollTranslator {
    last_line: Option<u32>,
}

impl ScrollTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_line(&self) -> Option<u32> {
        self.last_line
    }

    /// Record `line` as the current position and plan a scroll to it.
    ///
    /// The line is remembered even when no plan can be made yet (no blocks,
    /// or no line count), so the first render can pick it up.
    pub fn request(
        &mut self,
        line: u32,
        index: &BlockIndex,
        tree: &LiveTree,
        lcount: Option<u32>,
        probe: &impl LayoutProbe,
    ) -> Option<ScrollPlan> {
        self.last_line = Some(line);
        plan(line, index, tree, lcount?, probe)
    }

    /// Re-plan the last requested line against the current layout.
    pub fn replay(
        &self,
        index: &BlockIndex,
        tree: &LiveTree,
        lcount: Option<u32>,
        probe: &impl LayoutProbe,
    ) -> Option<ScrollPlan> {
        plan(self.last_line?, index, tree, lcount?, probe)
    }
}

/// Center the content authored at `line` in the viewport.
pub fn plan(
    line: u32,
    index: &BlockIndex,
    tree: &LiveTree,
    lcount: u32,
    probe: &impl LayoutProbe,
) -> Option<ScrollPlan> {
    let window = index.locate(tree, line)?;
    let target = window.begin;

    let offset_begin = document_offset(probe, tree, target);
    let line_begin_at = line_begin(tree, target).unwrap_or(1);

    let (offset_end, line_end) = match window.end {
        Some(next) => (
            document_offset(probe, tree, next),
            line_begin(tree, next).unwrap_or(lcount.saturating_add(1)),
        ),
        None => (
            offset_begin + finite_or_zero(probe.height(tree, target)),
            lcount.saturating_add(1),
        ),
    };

    let span = i64::from(line_end) - i64::from(line_begin_at);
    // Zero-length span: the whole block stands for a single line.
    let span = if span > 0 { span as f64 } else { 1.0 };
    let pixels_per_line = finite_or_zero((offset_end - offset_begin) / span);

    let delta = f64::from(line) - f64::from(line_begin_at);
    let mut top = offset_begin + delta * pixels_per_line - probe.viewport_height() / 2.0
        + pixels_per_line / 2.0;
    if !top.is_finite() {
        top = offset_begin;
    }

    let plan = ScrollPlan {
        top: top.max(0.0),
        line_begin: line_begin_at,
        line_end,
        pixels_per_line,
    };
    tracing::debug!(
        target: "peek::scroll",
        line,
        line_begin = plan.line_begin,
        line_end = plan.line_end,
        pixels_per_line = plan.pixels_per_line,
        top = plan.top,
        "scroll planned"
    );
    Some(plan)
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::Reconciler;
    use crate::test_support::FixedLayout;

    /// 100 source lines, blocks at lines 1, 10 and 50.
    fn scenario() -> (LiveTree, BlockIndex, Vec<NodeId>) {
        let mut tree = LiveTree::new("main");
        Reconciler::new().apply(
            &mut tree,
            r#"<h1 data-line-begin="1">T</h1><p data-line-begin="10">a</p><p data-line-begin="50">b</p>"#,
        );
        let mut index = BlockIndex::new();
        index.rebuild(&tree);
        let blocks = index.windows().iter().map(|w| w.begin).collect();
        (tree, index, blocks)
    }

    fn layout(blocks: &[NodeId], scale: f64) -> FixedLayout {
        FixedLayout::new(200.0)
            .with_box(blocks[0], 0.0, 90.0 * scale)
            .with_box(blocks[1], 90.0 * scale, 400.0 * scale)
            .with_box(blocks[2], 490.0 * scale, 500.0 * scale)
    }

    #[test]
    fn test_scroll_into_middle_interval() {
        let (tree, index, blocks) = scenario();
        let probe = layout(&blocks, 1.0);
        let mut translator = ScrollTranslator::new();

        let plan = translator
            .request(30, &index, &tree, Some(100), &probe)
            .unwrap();
        assert_eq!((plan.line_begin, plan.line_end), (10, 50));
        assert_eq!(plan.pixels_per_line, 10.0);
        // 90 + 20 * 10 - 200 / 2 + 10 / 2
        assert_eq!(plan.top, 195.0);
    }

    #[test]
    fn test_resize_keeps_relative_position() {
        let (tree, index, blocks) = scenario();
        let mut translator = ScrollTranslator::new();
        let before = translator
            .request(30, &index, &tree, Some(100), &layout(&blocks, 1.0))
            .unwrap();

        let after = translator
            .replay(&index, &tree, Some(100), &layout(&blocks, 2.0))
            .unwrap();
        assert_eq!(
            (after.line_begin, after.line_end),
            (before.line_begin, before.line_end)
        );
        assert_eq!(after.pixels_per_line, before.pixels_per_line * 2.0);
        // 180 + 20 * 20 - 100 + 10
        assert_eq!(after.top, 490.0);
    }

    #[test]
    fn test_last_block_uses_synthesized_interval() {
        let (tree, index, blocks) = scenario();
        let probe = layout(&blocks, 1.0);
        let plan = plan(1000, &index, &tree, 100, &probe).unwrap();
        assert_eq!((plan.line_begin, plan.line_end), (50, 101));
        assert_eq!(plan.pixels_per_line, 500.0 / 51.0);
    }

    #[test]
    fn test_huge_line_count_saturates() {
        let (tree, index, blocks) = scenario();
        let probe = layout(&blocks, 1.0);
        let plan = plan(60, &index, &tree, u32::MAX, &probe).unwrap();
        assert_eq!((plan.line_begin, plan.line_end), (50, u32::MAX));
        assert!(plan.pixels_per_line > 0.0);
        assert!(plan.top.is_finite());
    }

    #[test]
    fn test_before_first_block_clamps_to_top() {
        let mut tree = LiveTree::new("main");
        Reconciler::new().apply(
            &mut tree,
            r#"<p data-line-begin="5">a</p><p data-line-begin="9">b</p>"#,
        );
        let mut index = BlockIndex::new();
        index.rebuild(&tree);
        let blocks: Vec<_> = index.windows().iter().map(|w| w.begin).collect();
        let probe = FixedLayout::new(400.0)
            .with_box(blocks[0], 10.0, 40.0)
            .with_box(blocks[1], 50.0, 40.0);

        let plan = plan(1, &index, &tree, 10, &probe).unwrap();
        assert_eq!(plan.line_begin, 5);
        assert_eq!(plan.top, 0.0);
    }

    #[test]
    fn test_zero_line_span_is_safe() {
        let mut tree = LiveTree::new("main");
        Reconciler::new().apply(
            &mut tree,
            r#"<ul data-line-begin="3"><li data-line-begin="3">a</li></ul>"#,
        );
        let mut index = BlockIndex::new();
        index.rebuild(&tree);
        let blocks: Vec<_> = index.windows().iter().map(|w| w.begin).collect();
        let probe = FixedLayout::new(100.0)
            .with_box(blocks[0], 300.0, 60.0)
            .with_box(blocks[1], 300.0, 0.0);

        let plan = plan(3, &index, &tree, 3, &probe).unwrap();
        assert!(plan.top.is_finite());
        assert!(plan.pixels_per_line.is_finite());
    }

    #[test]
    fn test_no_blocks_or_no_lcount_is_noop() {
        let (tree, index, blocks) = scenario();
        let probe = layout(&blocks, 1.0);
        let mut translator = ScrollTranslator::new();
        assert!(translator.request(30, &index, &tree, None, &probe).is_none());
        assert_eq!(translator.last_line(), Some(30));

        let empty = BlockIndex::new();
        assert!(translator.request(30, &empty, &tree, Some(100), &probe).is_none());
    }

    #[test]
    fn test_boxless_node_defers_to_ancestor() {
        let mut tree = LiveTree::new("main");
        Reconciler::new().apply(&mut tree, r#"<div><span data-line-begin="1">x</span></div>"#);
        let div = tree.first_child(tree.root()).unwrap();
        let span = tree.first_child(div).unwrap();
        let probe = FixedLayout::new(100.0).with_box(div, 42.0, 10.0).scrolled(8.0);
        assert_eq!(document_offset(&probe, &tree, span), 42.0);
    }
}
