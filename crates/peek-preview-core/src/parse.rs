//! Rendered HTML to [`LiveTree`] fragments via html5ever.

use html5ever::tendril::TendrilSink;
use html5ever::{ParseOpts, QualName, local_name, namespace_url, ns, parse_fragment};
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

use smol_str::SmolStr;

use crate::tree::{Attribute, LiveTree, Namespace, NodeData, NodeId};

/// Tag of the wrapper every fragment is parsed into.
pub const FRAGMENT_ROOT: &str = "main";

/// Parse `html` as the children of a `<main>` wrapper.
///
/// The returned tree's root is the wrapper; its children are the parsed
/// fragment. Whitespace-only text nodes are kept so serialization stays
/// faithful. An empty string yields an empty wrapper.
pub fn parse_html_fragment(html: &str) -> LiveTree {
    let mut fragment = LiveTree::new(FRAGMENT_ROOT);
    if html.is_empty() {
        return fragment;
    }

    let context = QualName::new(None, ns!(html), local_name!("body"));
    let dom: RcDom = parse_fragment(RcDom::default(), ParseOpts::default(), context, Vec::new())
        .one(html);

    let root = fragment.root();
    for child in content_children(&dom.document) {
        convert_node(&mut fragment, &child, root);
    }
    // Parsing is not a change anyone replays.
    fragment.take_mutations();
    fragment.take_root_children_changed();
    fragment
}

/// The fragment parser wraps content in a synthetic `<html>` element.
/// Fall back to `<body>` if a full document structure was produced.
fn content_children(document: &Handle) -> Vec<Handle> {
    let top: Vec<Handle> = document.children.borrow().iter().cloned().collect();
    let Some(html) = top.iter().find(|h| element_name(h) == Some("html")) else {
        return top;
    };
    let children: Vec<Handle> = html.children.borrow().iter().cloned().collect();
    if let Some(body) = children.iter().find(|h| element_name(h) == Some("body")) {
        return body.children.borrow().iter().cloned().collect();
    }
    children
}

fn element_name(handle: &Handle) -> Option<&str> {
    match &handle.data {
        RcNodeData::Element { name, .. } => Some(&*name.local),
        _ => None,
    }
}

fn convert_node(tree: &mut LiveTree, handle: &Handle, parent: NodeId) {
    match &handle.data {
        RcNodeData::Document => {
            for child in handle.children.borrow().iter() {
                convert_node(tree, child, parent);
            }
        }
        RcNodeData::Text { contents } => {
            let node = tree.create(NodeData::Text(contents.borrow().to_string()));
            tree.append_child(parent, node);
        }
        RcNodeData::Comment { contents } => {
            let node = tree.create(NodeData::Comment(contents.to_string()));
            tree.append_child(parent, node);
        }
        RcNodeData::Element { name, attrs, .. } => {
            let attrs = attrs
                .borrow()
                .iter()
                .map(|a| Attribute::new(&*a.name.local, a.value.to_string()))
                .collect();
            let namespace = if name.ns == ns!(svg) {
                Namespace::Svg
            } else if name.ns == ns!(mathml) {
                Namespace::MathMl
            } else {
                Namespace::Html
            };
            let node = tree.create(NodeData::Element {
                tag: SmolStr::new(&*name.local),
                namespace,
                attrs,
            });
            tree.append_child(parent, node);
            for child in handle.children.borrow().iter() {
                convert_node(tree, child, node);
            }
        }
        RcNodeData::Doctype { .. } | RcNodeData::ProcessingInstruction { .. } => {}
    }
}
