//! Test doubles shared by the unit tests.

use std::collections::HashMap;

use crate::diagram::CompileJob;
use crate::preview::PreviewHost;
use crate::scroll::LayoutProbe;
use crate::store::{KeyValueStore, MemoryStore};
use crate::tree::{LiveTree, NodeId, TreeMutation};

#[derive(Debug, Clone, Copy, Default)]
struct Rect {
    top: f64,
    height: f64,
    width: f64,
}

/// Layout with explicitly placed boxes. Unplaced nodes have no box.
#[derive(Debug, Clone, Default)]
pub struct FixedLayout {
    boxes: HashMap<NodeId, Rect>,
    viewport_height: f64,
    scroll_y: f64,
}

impl FixedLayout {
    pub fn new(viewport_height: f64) -> Self {
        Self {
            viewport_height,
            ..Self::default()
        }
    }

    /// Place `node` at document offset `top`.
    pub fn with_box(self, node: NodeId, top: f64, height: f64) -> Self {
        self.with_size(node, top, height, 0.0)
    }

    pub fn with_size(mut self, node: NodeId, top: f64, height: f64, width: f64) -> Self {
        self.boxes.insert(node, Rect { top, height, width });
        self
    }

    pub fn place(&mut self, node: NodeId, top: f64, height: f64) {
        self.boxes.insert(
            node,
            Rect {
                top,
                height,
                width: 0.0,
            },
        );
    }

    pub fn scrolled(mut self, scroll_y: f64) -> Self {
        self.scroll_y = scroll_y;
        self
    }
}

impl LayoutProbe for FixedLayout {
    fn client_top(&self, _tree: &LiveTree, node: NodeId) -> f64 {
        self.boxes
            .get(&node)
            .map(|r| r.top - self.scroll_y)
            .unwrap_or(0.0)
    }

    fn height(&self, _tree: &LiveTree, node: NodeId) -> f64 {
        self.boxes.get(&node).map(|r| r.height).unwrap_or(0.0)
    }

    fn width(&self, _tree: &LiveTree, node: NodeId) -> f64 {
        self.boxes.get(&node).map(|r| r.width).unwrap_or(0.0)
    }

    fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    fn scroll_y(&self) -> f64 {
        self.scroll_y
    }

    fn document_height(&self) -> f64 {
        self.boxes
            .values()
            .map(|r| r.top + r.height)
            .fold(0.0, f64::max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollTarget {
    To(f64),
    By(f64),
}

/// Records everything a preview asks of its surface.
#[derive(Debug, Default)]
pub struct FakeHost {
    pub layout: FixedLayout,
    pub mutations: Vec<TreeMutation>,
    pub scrolls: Vec<ScrollTarget>,
    pub jobs: Vec<CompileJob>,
    pub clipboard: Vec<(String, NodeId)>,
    pub tooltips: Vec<(NodeId, String)>,
    pub font_sizes: Vec<String>,
    pub zoom_labels: Vec<String>,
    pub base: Option<String>,
    pub theme: Option<String>,
    pub session: MemoryStore,
    pub settings: MemoryStore,
    pub resets: usize,
}

impl FakeHost {
    pub fn new(viewport_height: f64) -> Self {
        Self {
            layout: FixedLayout::new(viewport_height),
            ..Self::default()
        }
    }

    pub fn place(&mut self, node: NodeId, top: f64, height: f64) {
        self.layout.place(node, top, height);
    }
}

impl LayoutProbe for FakeHost {
    fn client_top(&self, tree: &LiveTree, node: NodeId) -> f64 {
        self.layout.client_top(tree, node)
    }

    fn height(&self, tree: &LiveTree, node: NodeId) -> f64 {
        self.layout.height(tree, node)
    }

    fn width(&self, tree: &LiveTree, node: NodeId) -> f64 {
        self.layout.width(tree, node)
    }

    fn viewport_height(&self) -> f64 {
        self.layout.viewport_height()
    }

    fn scroll_y(&self) -> f64 {
        self.layout.scroll_y()
    }

    fn document_height(&self) -> f64 {
        self.layout.document_height()
    }
}

impl PreviewHost for FakeHost {
    fn apply_mutations(&mut self, mutations: Vec<TreeMutation>) {
        self.mutations.extend(mutations);
    }

    fn scroll_to(&mut self, top: f64) {
        self.scrolls.push(ScrollTarget::To(top));
    }

    fn scroll_by(&mut self, delta: f64) {
        self.scrolls.push(ScrollTarget::By(delta));
    }

    fn set_base(&mut self, base: &str) {
        self.base = Some(base.to_string());
    }

    fn set_theme(&mut self, theme: &str) {
        self.theme = Some(theme.to_string());
    }

    fn set_font_size(&mut self, size: &str) {
        self.font_sizes.push(size.to_string());
    }

    fn announce_zoom(&mut self, label: &str) {
        self.zoom_labels.push(label.to_string());
    }

    fn spawn_compile(&mut self, jobs: Vec<CompileJob>) {
        self.jobs.extend(jobs);
    }

    fn write_clipboard(&mut self, text: String, button: NodeId) {
        self.clipboard.push((text, button));
    }

    fn show_tooltip(&mut self, anchor: NodeId, text: &str) {
        self.tooltips.push((anchor, text.to_string()));
    }

    fn session_store(&mut self) -> &mut dyn KeyValueStore {
        &mut self.session
    }

    fn settings_store(&mut self) -> &mut dyn KeyValueStore {
        &mut self.settings
    }

    /// Stores outlive a reset, like Web Storage outlives a page load.
    fn reset(&mut self) {
        let viewport_height = self.layout.viewport_height();
        *self = Self {
            session: std::mem::take(&mut self.session),
            settings: std::mem::take(&mut self.settings),
            resets: self.resets + 1,
            ..Self::new(viewport_height)
        };
    }
}
