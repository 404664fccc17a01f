//! Merging freshly rendered HTML into the live tree.
//!
//! Every node is classified into a [`NodeClass`]; the class's [`ClassRule`]
//! decides how it is matched and which runtime state survives a patch:
//!
//! - diagram graphs are keyed by their content-addressed id and their
//!   children are never diffed, since the mounted graphic only exists in the
//!   live tree;
//! - diagram frames carry their measured height onto the new markup;
//! - disclosure widgets keep the user's `open` state. They are keyed only
//!   when the markup gives them an `id`; rendered markdown usually does not,
//!   so in practice they match by position like everything else.
//!
//! Everything else is matched positionally.

use smol_str::{SmolStr, format_smolstr};

use crate::morph::{MorphPolicy, morph_children};
use crate::parse::parse_html_fragment;
use crate::style::{set_style_property, style_property};
use crate::tree::{LiveTree, NodeId};

/// Class on the block wrapping a diagram.
pub const DIAGRAM_FRAME_CLASS: &str = "peek-mermaid-container";
/// `data-graph` value of a diagram placeholder.
pub const DIAGRAM_KIND: &str = "mermaid";
/// Marker on host-owned nodes the rendered markup never describes.
pub const CHROME_ATTR: &str = "data-peek-chrome";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagramPart {
    /// Block wrapper around the graph and its toolbar.
    Frame,
    /// The placeholder that receives the compiled graphic.
    Graph,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeClass {
    DiagramContainer(DiagramPart),
    Disclosure,
    Plain,
}

/// What the reconciler does with nodes of one class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassRule {
    /// Matched by identity rather than position.
    pub keyed: bool,
    /// Children are diffed against the new markup.
    pub diff_children: bool,
    /// The live `open` flag overrides the markup.
    pub preserve_open: bool,
    /// The live inline height is carried onto the replacement.
    pub carry_height: bool,
}

impl NodeClass {
    pub const fn rule(self) -> ClassRule {
        match self {
            NodeClass::DiagramContainer(DiagramPart::Graph) => ClassRule {
                keyed: true,
                diff_children: false,
                preserve_open: false,
                carry_height: false,
            },
            NodeClass::DiagramContainer(DiagramPart::Frame) => ClassRule {
                keyed: false,
                diff_children: true,
                preserve_open: false,
                carry_height: true,
            },
            NodeClass::Disclosure => ClassRule {
                keyed: true,
                diff_children: true,
                preserve_open: true,
                carry_height: false,
            },
            NodeClass::Plain => ClassRule {
                keyed: false,
                diff_children: true,
                preserve_open: false,
                carry_height: false,
            },
        }
    }
}

pub fn classify(tree: &LiveTree, node: NodeId) -> NodeClass {
    if !tree.is_element(node) {
        return NodeClass::Plain;
    }
    if is_diagram_graph(tree, node) {
        NodeClass::DiagramContainer(DiagramPart::Graph)
    } else if tree.has_class(node, DIAGRAM_FRAME_CLASS) {
        NodeClass::DiagramContainer(DiagramPart::Frame)
    } else if tree.tag(node) == Some("details") || tree.has_attr(node, "open") {
        NodeClass::Disclosure
    } else {
        NodeClass::Plain
    }
}

pub fn is_diagram_graph(tree: &LiveTree, node: NodeId) -> bool {
    tree.attr(node, "data-graph") == Some(DIAGRAM_KIND)
}

/// Stable identity of a node across passes, if its class is keyed.
pub fn node_key(tree: &LiveTree, node: NodeId) -> Option<SmolStr> {
    let class = classify(tree, node);
    if !class.rule().keyed {
        return None;
    }
    let id = tree.attr(node, "id").filter(|id| !id.is_empty())?;
    match class {
        NodeClass::DiagramContainer(_) => Some(SmolStr::new(id)),
        // A bare `open` attribute comes and goes with the user; only the
        // element itself is a stable identity.
        NodeClass::Disclosure if tree.tag(node) == Some("details") => {
            Some(format_smolstr!("disclosure:{id}"))
        }
        _ => None,
    }
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Writes recorded against the live tree.
    pub writes: u64,
    /// A direct child of the root was inserted or removed.
    pub structure_changed: bool,
    /// Keys of diagram graphs created by this pass.
    pub added_diagrams: Vec<SmolStr>,
}

/// Applies rendered fragments to a live tree.
#[derive(Debug, Default)]
pub struct Reconciler {
    passes: u64,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Morph the children of the tree root into `html`.
    ///
    /// The root itself is never touched. An empty string empties it.
    pub fn apply(&mut self, tree: &mut LiveTree, html: &str) -> ReconcileOutcome {
        self.passes += 1;
        if tracing::enabled!(target: "peek::reconcile", tracing::Level::TRACE) {
            tracing::trace!(target: "peek::reconcile", pass = self.passes, html, "applying fragment");
        }

        let mut fragment = parse_html_fragment(html);
        let writes_before = tree.writes();
        let mut policy = PreviewPolicy::default();
        let (from, to) = (tree.root(), fragment.root());
        morph_children(tree, from, &mut fragment, to, &mut policy);

        let outcome = ReconcileOutcome {
            writes: tree.writes() - writes_before,
            structure_changed: tree.take_root_children_changed(),
            added_diagrams: policy.added_diagrams,
        };
        tracing::debug!(
            target: "peek::reconcile",
            pass = self.passes,
            writes = outcome.writes,
            structure_changed = outcome.structure_changed,
            added_diagrams = outcome.added_diagrams.len(),
            "fragment applied"
        );
        outcome
    }

    pub fn passes(&self) -> u64 {
        self.passes
    }
}

#[derive(Debug, Default)]
struct PreviewPolicy {
    added_diagrams: Vec<SmolStr>,
}

impl MorphPolicy for PreviewPolicy {
    fn node_key(&self, tree: &LiveTree, node: NodeId) -> Option<SmolStr> {
        node_key(tree, node)
    }

    fn before_update(
        &mut self,
        live: &LiveTree,
        from: NodeId,
        fragment: &mut LiveTree,
        to: NodeId,
    ) -> bool {
        let from_rule = classify(live, from).rule();
        let to_rule = classify(fragment, to).rule();

        if from_rule.preserve_open && live.has_attr(from, "open") {
            let open = live.attr(from, "open").unwrap_or_default().to_string();
            fragment.set_attribute(to, "open", &open);
        } else if from_rule.carry_height && to_rule.carry_height {
            let height = style_property(live, from, "height");
            set_style_property(fragment, to, "height", height.as_deref());
        }

        !live.is_equal_node(from, fragment, to)
    }

    fn before_children_update(
        &mut self,
        _live: &LiveTree,
        _from: NodeId,
        fragment: &LiveTree,
        to: NodeId,
    ) -> bool {
        classify(fragment, to).rule().diff_children
    }

    fn node_added(&mut self, live: &LiveTree, node: NodeId) {
        if let NodeClass::DiagramContainer(DiagramPart::Graph) = classify(live, node) {
            if let Some(key) = node_key(live, node) {
                tracing::trace!(target: "peek::reconcile", key = %key, "diagram placeholder added");
                self.added_diagrams.push(key);
            }
        }
    }

    fn retain_unmatched(&self, live: &LiveTree, node: NodeId) -> bool {
        live.has_attr(node, CHROME_ATTR)
    }
}
