//! DOM replica of the live tree.
//!
//! Replays [`TreeMutation`]s onto real DOM nodes. Every mirrored node is
//! stamped with its [`NodeId`] so event targets can be mapped back.

use std::collections::HashMap;

use js_sys::Reflect;
use peek_preview_core::{Namespace, NodeData, NodeId, TreeMutation};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, Node};

const NODE_ID_PROP: &str = "__peekNodeId";

pub struct DomMirror {
    document: Document,
    root: Element,
    root_id: NodeId,
    nodes: HashMap<NodeId, Node>,
}

impl DomMirror {
    /// Mirror into `root`, which stands for the tree root `root_id`.
    pub fn new(document: Document, root: Element, root_id: NodeId) -> Self {
        let mut mirror = Self {
            document,
            root,
            root_id,
            nodes: HashMap::new(),
        };
        mirror.adopt_root();
        mirror
    }

    fn adopt_root(&mut self) {
        let root: Node = self.root.clone().into();
        stamp(&root, self.root_id);
        self.nodes.insert(self.root_id, root);
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.nodes.get(&id)?.dyn_ref::<Element>()
    }

    /// Nearest mirrored node at or above `target`.
    pub fn node_at(&self, target: &Node) -> Option<NodeId> {
        let mut current = Some(target.clone());
        while let Some(node) = current {
            if let Some(id) = read_stamp(&node).filter(|id| self.nodes.contains_key(id)) {
                return Some(id);
            }
            current = node.parent_node();
        }
        None
    }

    /// Empty the root and forget every mirrored node. Fresh trees reuse
    /// the root handle.
    pub fn reset(&mut self) {
        self.root.set_text_content(None);
        self.nodes.clear();
        self.adopt_root();
    }

    pub fn apply(&mut self, mutation: TreeMutation) -> Result<(), JsValue> {
        match mutation {
            TreeMutation::Created { node, data } => {
                let created = self.create(&data)?;
                stamp(&created, node);
                self.nodes.insert(node, created);
            }
            TreeMutation::Inserted {
                parent,
                node,
                before,
            } => {
                let (Some(parent), Some(child)) = (self.nodes.get(&parent), self.nodes.get(&node))
                else {
                    return Err(JsValue::from_str("insert of unknown node"));
                };
                let before = before.and_then(|b| self.nodes.get(&b));
                parent.insert_before(child, before)?;
            }
            TreeMutation::Detached { node } => {
                if let Some(node) = self.nodes.get(&node) {
                    unlink(node)?;
                }
            }
            TreeMutation::Removed { node, freed } => {
                if let Some(node) = self.nodes.get(&node) {
                    unlink(node)?;
                }
                for id in freed {
                    self.nodes.remove(&id);
                }
            }
            TreeMutation::SetAttribute { node, name, value } => {
                if let Some(element) = self.element(node) {
                    element.set_attribute(&name, &value)?;
                }
            }
            TreeMutation::RemoveAttribute { node, name } => {
                if let Some(element) = self.element(node) {
                    element.remove_attribute(&name)?;
                }
            }
            TreeMutation::SetText { node, text } => {
                if let Some(node) = self.nodes.get(&node) {
                    node.set_text_content(Some(&text));
                }
            }
        }
        Ok(())
    }

    fn create(&self, data: &NodeData) -> Result<Node, JsValue> {
        let node: Node = match data {
            NodeData::Element {
                tag,
                namespace,
                attrs,
            } => {
                let element = match namespace {
                    Namespace::Html => self.document.create_element(tag)?,
                    other => self.document.create_element_ns(Some(other.uri()), tag)?,
                };
                for attr in attrs {
                    if let Err(e) = element.set_attribute(&attr.name, &attr.value) {
                        tracing::debug!("Skipping attribute {}: {:?}", attr.name, e);
                    }
                }
                element.into()
            }
            NodeData::Text(text) => self.document.create_text_node(text).into(),
            NodeData::Comment(text) => self.document.create_comment(text).into(),
        };
        Ok(node)
    }
}

fn unlink(node: &Node) -> Result<(), JsValue> {
    if let Some(parent) = node.parent_node() {
        parent.remove_child(node)?;
    }
    Ok(())
}

fn stamp(node: &Node, id: NodeId) {
    let value = JsValue::from_str(&format!("{}:{}", id.index(), id.generation()));
    let _ = Reflect::set(node, &JsValue::from_str(NODE_ID_PROP), &value);
}

fn read_stamp(node: &Node) -> Option<NodeId> {
    let raw = Reflect::get(node, &JsValue::from_str(NODE_ID_PROP))
        .ok()?
        .as_string()?;
    let (index, generation) = raw.split_once(':')?;
    Some(NodeId::from_parts(index.parse().ok()?, generation.parse().ok()?))
}
