//! Diagram placeholders: discovery, compilation batches, mounting and
//! per-diagram pan/zoom.
//!
//! View state lives in a map keyed by the placeholder's stable id, never on
//! tree nodes, so it survives any number of reconciliation passes that keep
//! the placeholder around.

mod compile;
mod debounce;
mod view;

use std::collections::{HashMap, HashSet};

use smol_str::SmolStr;
use web_time::Instant;

pub use compile::{CompileJob, DiagramCompiler, compile_all};
pub use debounce::Debouncer;
pub use view::{DiagramAction, DiagramConfig, ViewState};

use crate::parse::parse_html_fragment;
use crate::reconcile::{CHROME_ATTR, DIAGRAM_FRAME_CLASS, is_diagram_graph, node_key};
use crate::scroll::LayoutProbe;
use crate::style::set_style_property;
use crate::tree::{Attribute, LiveTree, NodeId};

pub const DEFINITION_ATTR: &str = "data-graph-definition";
pub const LOADER_CLASS: &str = "peek-loader";
pub const VIEWPORT_CLASS: &str = "peek-mermaid-viewport";
pub const TOOLBAR_CLASS: &str = "peek-mermaid-toolbar";
pub const NAV_CLASS: &str = "peek-mermaid-nav";
pub const BUTTON_CLASS: &str = "peek-mermaid-btn";

const TOOLBAR_BUTTONS: &[(DiagramAction, &str, &str)] = &[
    (DiagramAction::Fit, "Fit to width", "\u{2194}"),
    (DiagramAction::CopySource, "Copy source", "\u{2398}"),
];

/// Three by three pad; `None` is an empty cell.
const NAV_PAD: [Option<(DiagramAction, &str, &str)>; 9] = [
    None,
    Some((DiagramAction::PanUp, "Pan up", "\u{25B2}")),
    None,
    Some((DiagramAction::PanLeft, "Pan left", "\u{25C0}")),
    Some((DiagramAction::Reset, "Reset view", "\u{25CB}")),
    Some((DiagramAction::PanRight, "Pan right", "\u{25B6}")),
    Some((DiagramAction::ZoomOut, "Zoom out", "\u{2212}")),
    Some((DiagramAction::PanDown, "Pan down", "\u{25BC}")),
    Some((DiagramAction::ZoomIn, "Zoom in", "+")),
];

/// Result of handing a compiled graphic back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountOutcome {
    Mounted {
        viewport: NodeId,
        /// The enclosing diagram frame, if the placeholder sits in one.
        frame: Option<NodeId>,
    },
    /// The placeholder was replaced or removed while compiling.
    Stale,
    /// Another pass mounted a graphic first.
    AlreadyMounted,
}

/// Result of a toolbar or navigation action.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// The view changed and the transform was rewritten.
    Transformed(ViewState),
    /// Nothing to do (fit without a measurable graphic, unknown target).
    Unchanged,
    /// The diagram source to put on the clipboard.
    CopySource(String),
}

#[derive(Debug)]
pub struct DiagramManager {
    config: DiagramConfig,
    views: HashMap<SmolStr, ViewState>,
    /// Placeholder nodes with a compilation outstanding. Keyed by node, so a
    /// placeholder re-created under the same id is compiled again.
    in_flight: HashSet<NodeId>,
    debounce: Debouncer,
}

impl DiagramManager {
    pub fn new(config: DiagramConfig) -> Self {
        Self {
            debounce: Debouncer::new(config.debounce()),
            config,
            views: HashMap::new(),
            in_flight: HashSet::new(),
        }
    }

    pub fn config(&self) -> &DiagramConfig {
        &self.config
    }

    /// Arm (or re-arm) the compile pass after a reconciliation added
    /// placeholders.
    pub fn schedule(&mut self, now: Instant) {
        self.debounce.arm(now);
        tracing::trace!(target: "peek::diagram", "compile pass scheduled");
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.debounce.deadline()
    }

    /// If the quiet interval elapsed, collect every placeholder still lacking
    /// a graphic and not already compiling.
    pub fn take_due(&mut self, tree: &LiveTree, now: Instant) -> Vec<CompileJob> {
        if !self.debounce.take_due(now) {
            return Vec::new();
        }
        let jobs = self.pending(tree);
        tracing::debug!(target: "peek::diagram", jobs = jobs.len(), "compile pass fired");
        jobs
    }

    fn pending(&mut self, tree: &LiveTree) -> Vec<CompileJob> {
        let mut jobs = Vec::new();
        for node in tree.descendants(tree.root()) {
            if !is_diagram_graph(tree, node) || has_graphic(tree, node) {
                continue;
            }
            let (Some(key), Some(definition)) = (node_key(tree, node), tree.attr(node, DEFINITION_ATTR))
            else {
                continue;
            };
            if !self.in_flight.insert(node) {
                continue;
            }
            jobs.push(CompileJob {
                render_id: format!("{key}-svg"),
                definition: definition.to_string(),
                node,
                key,
            });
        }
        jobs
    }

    pub fn is_in_flight(&self, node: NodeId) -> bool {
        self.in_flight.contains(&node)
    }

    /// A compilation failed: the placeholder keeps its loader and becomes
    /// eligible again on the next pass.
    pub fn abandon(&mut self, job: &CompileJob) {
        self.in_flight.remove(&job.node);
    }

    /// Mount compiled SVG into its placeholder.
    ///
    /// The graphic goes into a viewport wrapper carrying the current view
    /// transform; the loader is dropped and the frame gets its toolbar.
    pub fn mount(&mut self, tree: &mut LiveTree, job: &CompileJob, svg: &str) -> MountOutcome {
        self.in_flight.remove(&job.node);
        let node = job.node;
        if !tree.is_connected(node) || node_key(tree, node).as_ref() != Some(&job.key) {
            tracing::debug!(target: "peek::diagram", key = %job.key, "discarding graphic for stale placeholder");
            return MountOutcome::Stale;
        }
        if has_graphic(tree, node) {
            return MountOutcome::AlreadyMounted;
        }

        for child in tree.children(node).to_vec() {
            if tree.has_class(child, LOADER_CLASS) {
                tree.remove(child);
            }
        }

        let view = self.views.get(&job.key).copied().unwrap_or_default();
        let viewport = tree.create_element(
            "div",
            vec![
                Attribute::new("class", VIEWPORT_CLASS),
                Attribute::new("style", format!("transform: {};", view.transform())),
            ],
        );
        let graphic = parse_html_fragment(svg);
        for child in graphic.children(graphic.root()) {
            if let Some(copy) = tree.import(&graphic, *child) {
                tree.append_child(viewport, copy);
            }
        }
        tree.append_child(node, viewport);

        let frame = tree
            .parent(node)
            .filter(|p| tree.has_class(*p, DIAGRAM_FRAME_CLASS));
        if let Some(frame) = frame {
            inject_chrome(tree, frame);
        }
        tracing::debug!(target: "peek::diagram", key = %job.key, "graphic mounted");
        MountOutcome::Mounted { viewport, frame }
    }

    /// Pin the frame's height to the mounted graphic's rendered height.
    pub fn reserve_height(
        &self,
        tree: &mut LiveTree,
        frame: NodeId,
        viewport: NodeId,
        probe: &impl LayoutProbe,
    ) -> bool {
        let height = probe.height(tree, viewport);
        if !(height.is_finite() && height > 0.0) {
            return false;
        }
        set_style_property(tree, frame, "height", Some(&format!("{height}px")))
    }

    /// Run a toolbar or navigation action for the diagram enclosing `target`.
    pub fn apply_action(
        &mut self,
        tree: &mut LiveTree,
        target: NodeId,
        action: DiagramAction,
        probe: &impl LayoutProbe,
    ) -> ActionOutcome {
        let Some(frame) = tree.closest(target, |t, n| t.has_class(n, DIAGRAM_FRAME_CLASS)) else {
            return ActionOutcome::Unchanged;
        };
        let Some(graph) = tree.find(frame, is_diagram_graph) else {
            return ActionOutcome::Unchanged;
        };

        if action == DiagramAction::CopySource {
            let source = tree.attr(graph, DEFINITION_ATTR).unwrap_or_default();
            return ActionOutcome::CopySource(source.to_string());
        }

        let Some(key) = node_key(tree, graph) else {
            return ActionOutcome::Unchanged;
        };
        let viewport = tree.find(graph, |t, n| t.has_class(n, VIEWPORT_CLASS));
        let state = self.views.entry(key.clone()).or_default();

        if action == DiagramAction::Fit {
            let graphic = viewport.and_then(|v| tree.find(v, |t, n| t.tag(n) == Some("svg")));
            let Some(graphic) = graphic else {
                return ActionOutcome::Unchanged;
            };
            let frame_width = probe.width(tree, frame);
            let graphic_width = probe.width(tree, graphic);
            if !state.fit(frame_width, graphic_width, &self.config) {
                return ActionOutcome::Unchanged;
            }
        } else {
            state.apply(action, &self.config);
        }

        let view = *state;
        if let Some(viewport) = viewport {
            set_style_property(tree, viewport, "transform", Some(&view.transform()));
        }
        tracing::trace!(
            target: "peek::diagram",
            key = %key,
            action = action.as_str(),
            scale = view.scale,
            tx = view.translate_x,
            ty = view.translate_y,
            "view updated"
        );
        ActionOutcome::Transformed(view)
    }

    pub fn view(&self, key: &str) -> Option<&ViewState> {
        self.views.get(key)
    }

    /// Forget view state for diagrams no longer in the tree.
    pub fn prune(&mut self, tree: &LiveTree) {
        if self.views.is_empty() {
            return;
        }
        let present: HashSet<SmolStr> = tree
            .descendants(tree.root())
            .filter(|n| is_diagram_graph(tree, *n))
            .filter_map(|n| node_key(tree, n))
            .collect();
        let before = self.views.len();
        self.views.retain(|key, _| present.contains(key));
        if self.views.len() != before {
            tracing::trace!(
                target: "peek::diagram",
                dropped = before - self.views.len(),
                "pruned view state"
            );
        }
    }
}

impl Default for DiagramManager {
    fn default() -> Self {
        Self::new(DiagramConfig::default())
    }
}

/// Whether a graphic is mounted under the placeholder.
pub fn has_graphic(tree: &LiveTree, node: NodeId) -> bool {
    tree.find(node, |t, n| t.tag(n) == Some("svg")).is_some()
}

/// Add the toolbar and navigation pad to a frame, once.
pub fn inject_chrome(tree: &mut LiveTree, frame: NodeId) -> bool {
    let present = tree
        .children(frame)
        .iter()
        .any(|c| tree.has_class(*c, TOOLBAR_CLASS));
    if present {
        return false;
    }

    let toolbar = chrome_container(tree, TOOLBAR_CLASS);
    for (action, title, glyph) in TOOLBAR_BUTTONS {
        let button = action_button(tree, *action, title, glyph);
        tree.append_child(toolbar, button);
    }

    let nav = chrome_container(tree, NAV_CLASS);
    for cell in NAV_PAD {
        let node = match cell {
            Some((action, title, glyph)) => action_button(tree, action, title, glyph),
            None => tree.create_element("span", Vec::new()),
        };
        tree.append_child(nav, node);
    }

    tree.append_child(frame, toolbar);
    tree.append_child(frame, nav);
    true
}

fn chrome_container(tree: &mut LiveTree, class: &str) -> NodeId {
    tree.create_element(
        "div",
        vec![Attribute::new("class", class), Attribute::new(CHROME_ATTR, "")],
    )
}

fn action_button(tree: &mut LiveTree, action: DiagramAction, title: &str, glyph: &str) -> NodeId {
    let button = tree.create_element(
        "button",
        vec![
            Attribute::new("class", BUTTON_CLASS),
            Attribute::new("data-action", action.as_str()),
            Attribute::new("title", title),
        ],
    );
    let label = tree.create_text(glyph);
    tree.append_child(button, label);
    button
}
