//! Arena-backed document tree.
//!
//! `LiveTree` is the single shared mutable resource of the preview: the
//! reconciler and the diagram manager write to it, everything else reads it.
//! Every write is recorded as a [`TreeMutation`] so a host can replay the
//! exact same changes onto its own surface (the browser DOM, a test double).
//!
//! Node handles are generational: a [`NodeId`] held across a reconciliation
//! pass can be checked for liveness, and never aliases a node created later
//! in the same slot.

use std::fmt::Write as _;

use smol_str::SmolStr;

/// Elements serialized without a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose text children are serialized without escaping.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Generational handle to a node in a [`LiveTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    /// Rebuild a handle from its parts (hosts stash these on their own nodes).
    pub fn from_parts(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

/// A single element attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: SmolStr,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<SmolStr>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Element namespace. Hosts need it to create foreign content correctly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Namespace {
    #[default]
    Html,
    Svg,
    MathMl,
}

impl Namespace {
    pub fn uri(self) -> &'static str {
        match self {
            Namespace::Html => "http://www.w3.org/1999/xhtml",
            Namespace::Svg => "http://www.w3.org/2000/svg",
            Namespace::MathMl => "http://www.w3.org/1998/Math/MathML",
        }
    }
}

/// Payload of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Element {
        tag: SmolStr,
        namespace: Namespace,
        attrs: Vec<Attribute>,
    },
    Text(String),
    Comment(String),
}

impl NodeData {
    /// An HTML element.
    pub fn element(tag: impl Into<SmolStr>, attrs: Vec<Attribute>) -> Self {
        NodeData::Element {
            tag: tag.into(),
            namespace: Namespace::Html,
            attrs,
        }
    }

    pub fn same_kind(&self, other: &NodeData) -> bool {
        matches!(
            (self, other),
            (NodeData::Element { .. }, NodeData::Element { .. })
                | (NodeData::Text(_), NodeData::Text(_))
                | (NodeData::Comment(_), NodeData::Comment(_))
        )
    }
}

/// A recorded write, replayed by hosts onto their own surface.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeMutation {
    /// A node was created, detached. Its attributes are part of `data`.
    Created { node: NodeId, data: NodeData },
    /// `node` was inserted under `parent` before `before` (or appended).
    /// Inserting an attached node moves it.
    Inserted {
        parent: NodeId,
        node: NodeId,
        before: Option<NodeId>,
    },
    /// `node` was unlinked from its parent but stays alive for reuse.
    Detached { node: NodeId },
    /// `node` was unlinked and its whole subtree freed.
    Removed { node: NodeId, freed: Vec<NodeId> },
    SetAttribute {
        node: NodeId,
        name: SmolStr,
        value: String,
    },
    RemoveAttribute { node: NodeId, name: SmolStr },
    SetText { node: NodeId, text: String },
}

#[derive(Debug)]
struct Entry {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Index in the parent's `children`; meaningless while detached.
    position: usize,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

/// The displayed document tree.
#[derive(Debug)]
pub struct LiveTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
    mutations: Vec<TreeMutation>,
    writes: u64,
    root_children_changed: bool,
}

impl LiveTree {
    /// Create a tree whose root is an element with the given tag.
    ///
    /// The root itself is host-provided and never appears in the mutation log.
    pub fn new(root_tag: &str) -> Self {
        let root_entry = Entry {
            data: NodeData::element(root_tag, Vec::new()),
            parent: None,
            children: Vec::new(),
            position: 0,
        };
        Self {
            slots: vec![Slot {
                generation: 0,
                entry: Some(root_entry),
            }],
            free: Vec::new(),
            root: NodeId::from_parts(0, 0),
            mutations: Vec::new(),
            writes: 0,
            root_children_changed: false,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn entry(&self, id: NodeId) -> Option<&Entry> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entry.as_ref()
    }

    fn entry_mut(&mut self, id: NodeId) -> Option<&mut Entry> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entry.as_mut()
    }

    fn record(&mut self, mutation: TreeMutation) {
        self.writes += 1;
        self.mutations.push(mutation);
    }

    /// Whether the handle still refers to a live (not freed) node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.entry(id).is_some()
    }

    /// Whether the node is alive and reachable from the root.
    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == self.root {
                return true;
            }
            current = match self.entry(node) {
                Some(entry) => entry.parent,
                None => return false,
            };
        }
        false
    }

    /// Whether `ancestor` is `node` or one of its ancestors.
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.entry(id).map(|e| &e.data)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.entry(id).and_then(|e| e.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.entry(id).map(|e| e.children.as_slice()).unwrap_or(&[])
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let entry = self.entry(id)?;
        self.children(entry.parent?).get(entry.position + 1).copied()
    }

    /// Index of a child within its parent.
    fn position_in(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        let entry = self.entry(child)?;
        (entry.parent == Some(parent)).then_some(entry.position)
    }

    /// Refresh the stored positions of `parent`'s children from `start` on.
    fn reindex(&mut self, parent: NodeId, start: usize) {
        let shifted: Vec<NodeId> = self.children(parent).get(start..).unwrap_or(&[]).to_vec();
        for (offset, child) in shifted.into_iter().enumerate() {
            if let Some(entry) = self.entry_mut(child) {
                entry.position = start + offset;
            }
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.data(id), Some(NodeData::Element { .. }))
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match self.data(id)? {
            NodeData::Element { tag, .. } => Some(tag.as_str()),
            _ => None,
        }
    }

    pub fn attrs(&self, id: NodeId) -> &[Attribute] {
        match self.data(id) {
            Some(NodeData::Element { attrs, .. }) => attrs.as_slice(),
            _ => &[],
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attrs(id)
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .map(|v| v.split_ascii_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    /// Text of a text or comment node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.data(id)? {
            NodeData::Text(t) | NodeData::Comment(t) => Some(t.as_str()),
            NodeData::Element { .. } => None,
        }
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(NodeData::Text(t)) = self.data(id) {
            return t.clone();
        }
        let mut out = String::new();
        for node in self.descendants(id) {
            if let Some(NodeData::Text(t)) = self.data(node) {
                out.push_str(t);
            }
        }
        out
    }

    // === Creation ===

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let entry = Entry {
            data,
            parent: None,
            children: Vec::new(),
            position: 0,
        };
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation = slot.generation.wrapping_add(1);
            slot.entry = Some(entry);
            NodeId::from_parts(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                entry: Some(entry),
            });
            NodeId::from_parts(index, 0)
        }
    }

    /// Create a detached node.
    pub fn create(&mut self, data: NodeData) -> NodeId {
        let node = self.alloc(data.clone());
        self.record(TreeMutation::Created { node, data });
        node
    }

    pub fn create_element(&mut self, tag: &str, attrs: Vec<Attribute>) -> NodeId {
        self.create(NodeData::element(tag, attrs))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.create(NodeData::Text(text.into()))
    }

    /// Deep-copy `node` from another tree into this one, detached.
    pub fn import(&mut self, source: &LiveTree, node: NodeId) -> Option<NodeId> {
        let data = source.data(node)?.clone();
        let copy = self.create(data);
        for child in source.children(node).to_vec() {
            if let Some(child_copy) = self.import(source, child) {
                self.append_child(copy, child_copy);
            }
        }
        Some(copy)
    }

    // === Structure ===

    fn unlink(&mut self, node: NodeId) -> Option<NodeId> {
        let parent = self.entry(node)?.parent?;
        let position = self.position_in(parent, node)?;
        if let Some(parent_entry) = self.entry_mut(parent) {
            parent_entry.children.remove(position);
        }
        self.reindex(parent, position);
        if let Some(entry) = self.entry_mut(node) {
            entry.parent = None;
        }
        if parent == self.root {
            self.root_children_changed = true;
        }
        Some(parent)
    }

    /// Insert `node` under `parent` before `before`, or append when `before`
    /// is `None` or not a child of `parent`. An attached node is moved.
    pub fn insert_before(&mut self, parent: NodeId, node: NodeId, before: Option<NodeId>) {
        if !self.contains(parent) || !self.contains(node) || self.is_inclusive_ancestor(node, parent)
        {
            return;
        }
        self.unlink(node);
        let position = before.and_then(|b| self.position_in(parent, b));
        let before = position.and(before);
        let Some(parent_entry) = self.entry_mut(parent) else {
            return;
        };
        let at = match position {
            Some(pos) => {
                parent_entry.children.insert(pos, node);
                pos
            }
            None => {
                parent_entry.children.push(node);
                parent_entry.children.len() - 1
            }
        };
        if let Some(entry) = self.entry_mut(node) {
            entry.parent = Some(parent);
        }
        self.reindex(parent, at);
        if parent == self.root {
            self.root_children_changed = true;
        }
        self.record(TreeMutation::Inserted {
            parent,
            node,
            before,
        });
    }

    pub fn append_child(&mut self, parent: NodeId, node: NodeId) {
        self.insert_before(parent, node, None);
    }

    /// Unlink `node` from its parent, keeping it alive for reinsertion.
    pub fn detach(&mut self, node: NodeId) {
        if self.unlink(node).is_some() {
            self.record(TreeMutation::Detached { node });
        }
    }

    /// Unlink `node` and free it together with its subtree.
    pub fn remove(&mut self, node: NodeId) {
        if node == self.root || !self.contains(node) {
            return;
        }
        self.unlink(node);
        let mut freed = vec![node];
        freed.extend(self.descendants(node));
        for id in &freed {
            let slot = &mut self.slots[id.index as usize];
            slot.entry = None;
            self.free.push(id.index);
        }
        self.record(TreeMutation::Removed { node, freed });
    }

    /// Free every child of `node`.
    pub fn clear_children(&mut self, node: NodeId) {
        for child in self.children(node).to_vec() {
            self.remove(child);
        }
    }

    // === Content ===

    /// Set an attribute. Returns whether anything changed; unchanged values
    /// are not recorded.
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> bool {
        if !self.write_attribute(node, name, Some(value)) {
            return false;
        }
        self.record(TreeMutation::SetAttribute {
            node,
            name: SmolStr::new(name),
            value: value.to_string(),
        });
        true
    }

    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> bool {
        if !self.write_attribute(node, name, None) {
            return false;
        }
        self.record(TreeMutation::RemoveAttribute {
            node,
            name: SmolStr::new(name),
        });
        true
    }

    /// Update an attribute without recording it.
    ///
    /// Used when the host surface already holds the value, e.g. a disclosure
    /// widget the user toggled directly.
    pub fn sync_attribute(&mut self, node: NodeId, name: &str, value: Option<&str>) {
        self.write_attribute(node, name, value);
    }

    fn write_attribute(&mut self, node: NodeId, name: &str, value: Option<&str>) -> bool {
        let Some(Entry {
            data: NodeData::Element { attrs, .. },
            ..
        }) = self.entry_mut(node)
        else {
            return false;
        };
        let existing = attrs.iter().position(|a| a.name == name);
        match (existing, value) {
            (Some(pos), Some(value)) => {
                if attrs[pos].value == value {
                    return false;
                }
                attrs[pos].value = value.to_string();
            }
            (None, Some(value)) => attrs.push(Attribute::new(name, value)),
            (Some(pos), None) => {
                attrs.remove(pos);
            }
            (None, None) => return false,
        }
        true
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) -> bool {
        if self.has_class(node, class) || !self.is_element(node) {
            return false;
        }
        let value = match self.attr(node, "class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing.trim(), class),
            _ => class.to_string(),
        };
        self.set_attribute(node, "class", &value)
    }

    pub fn remove_class(&mut self, node: NodeId, class: &str) -> bool {
        if !self.has_class(node, class) {
            return false;
        }
        let value = self
            .attr(node, "class")
            .unwrap_or_default()
            .split_ascii_whitespace()
            .filter(|c| *c != class)
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attribute(node, "class", &value)
    }

    /// Replace the text of a text or comment node.
    pub fn set_text(&mut self, node: NodeId, text: &str) -> bool {
        let Some(entry) = self.entry_mut(node) else {
            return false;
        };
        match &mut entry.data {
            NodeData::Text(t) | NodeData::Comment(t) => {
                if t == text {
                    return false;
                }
                *t = text.to_string();
            }
            NodeData::Element { .. } => return false,
        }
        self.record(TreeMutation::SetText {
            node,
            text: text.to_string(),
        });
        true
    }

    // === Mutation log ===

    /// Drain the recorded mutations for replay on the host surface.
    pub fn take_mutations(&mut self) -> Vec<TreeMutation> {
        std::mem::take(&mut self.mutations)
    }

    /// Total recorded writes since creation.
    pub fn writes(&self) -> u64 {
        self.writes
    }

    /// Whether a direct child of the root was inserted or removed since the
    /// last call. Resets the flag.
    pub fn take_root_children_changed(&mut self) -> bool {
        std::mem::take(&mut self.root_children_changed)
    }

    // === Queries ===

    /// Pre-order iterator over the descendants of `node` (excluding itself).
    pub fn descendants(&self, node: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.children(node).to_vec();
        stack.reverse();
        Descendants { tree: self, stack }
    }

    /// First descendant in document order matching `pred`.
    pub fn find(&self, node: NodeId, pred: impl Fn(&LiveTree, NodeId) -> bool) -> Option<NodeId> {
        self.descendants(node).find(|n| pred(self, *n))
    }

    /// `node` itself or its nearest ancestor matching `pred`.
    pub fn closest(
        &self,
        node: NodeId,
        pred: impl Fn(&LiveTree, NodeId) -> bool,
    ) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(id) = current {
            if pred(self, id) {
                return Some(id);
            }
            current = self.parent(id);
        }
        None
    }

    /// Deep equality of `node` in this tree and `other_node` in `other`:
    /// same kind, tag, attribute set, text and children.
    pub fn is_equal_node(&self, node: NodeId, other: &LiveTree, other_node: NodeId) -> bool {
        let (Some(a), Some(b)) = (self.data(node), other.data(other_node)) else {
            return false;
        };
        if !a.same_kind(b) {
            return false;
        }
        match (a, b) {
            (
                NodeData::Element {
                    tag: tag_a,
                    namespace: ns_a,
                    attrs: attrs_a,
                },
                NodeData::Element {
                    tag: tag_b,
                    namespace: ns_b,
                    attrs: attrs_b,
                },
            ) => {
                if tag_a != tag_b || ns_a != ns_b || attrs_a.len() != attrs_b.len() {
                    return false;
                }
                if !attrs_a
                    .iter()
                    .all(|attr| other.attr(other_node, &attr.name) == Some(attr.value.as_str()))
                {
                    return false;
                }
            }
            (NodeData::Text(x), NodeData::Text(y)) | (NodeData::Comment(x), NodeData::Comment(y)) => {
                return x == y;
            }
            _ => return false,
        }
        let ours = self.children(node);
        let theirs = other.children(other_node);
        ours.len() == theirs.len()
            && ours
                .iter()
                .zip(theirs)
                .all(|(a, b)| self.is_equal_node(*a, other, *b))
    }

    // === Serialization ===

    /// Serialize the children of `node` as HTML.
    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(node) {
            self.write_html(*child, &mut out);
        }
        out
    }

    /// Serialize `node` and its subtree as HTML.
    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        match self.data(node) {
            Some(NodeData::Element { tag, attrs, .. }) => {
                out.push('<');
                out.push_str(tag);
                for attr in attrs {
                    let _ = write!(out, " {}=\"{}\"", attr.name, escape_attribute(&attr.value));
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&tag.as_str()) {
                    return;
                }
                let raw = RAW_TEXT_ELEMENTS.contains(&tag.as_str());
                for child in self.children(node) {
                    match self.data(*child) {
                        Some(NodeData::Text(t)) if raw => out.push_str(t),
                        _ => self.write_html(*child, out),
                    }
                }
                let _ = write!(out, "</{}>", tag);
            }
            Some(NodeData::Text(t)) => out.push_str(&escape_text(t)),
            Some(NodeData::Comment(t)) => {
                let _ = write!(out, "<!--{}-->", t);
            }
            None => {}
        }
    }
}

/// Pre-order descendant iterator, see [`LiveTree::descendants`].
pub struct Descendants<'a> {
    tree: &'a LiveTree,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let node = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(node).iter().rev().copied());
        Some(node)
    }
}

pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (LiveTree, NodeId, NodeId) {
        let mut tree = LiveTree::new("main");
        let root = tree.root();
        let p = tree.create_element("p", vec![Attribute::new("data-line-begin", "1")]);
        let text = tree.create_text("hello");
        tree.append_child(p, text);
        tree.append_child(root, p);
        (tree, p, text)
    }

    #[test]
    fn test_insert_and_serialize() {
        let (tree, _, _) = sample();
        assert_eq!(
            tree.inner_html(tree.root()),
            r#"<p data-line-begin="1">hello</p>"#
        );
    }

    #[test]
    fn test_root_child_flag_ignores_deep_changes() {
        let (mut tree, p, _) = sample();
        assert!(tree.take_root_children_changed());
        assert!(!tree.take_root_children_changed());

        let em = tree.create_element("em", vec![]);
        tree.append_child(p, em);
        assert!(!tree.take_root_children_changed());

        tree.remove(p);
        assert!(tree.take_root_children_changed());
    }

    #[test]
    fn test_siblings_follow_moves() {
        let mut tree = LiveTree::new("main");
        let root = tree.root();
        let ids: Vec<NodeId> = (0..4)
            .map(|i| {
                let node = tree.create_element("p", vec![Attribute::new("id", i.to_string())]);
                tree.append_child(root, node);
                node
            })
            .collect();
        assert_eq!(tree.next_sibling(ids[0]), Some(ids[1]));
        assert_eq!(tree.next_sibling(ids[3]), None);

        // Move the last node to the front, then drop the second.
        tree.insert_before(root, ids[3], Some(ids[0]));
        tree.remove(ids[1]);
        assert_eq!(tree.children(root), &[ids[3], ids[0], ids[2]]);
        assert_eq!(tree.next_sibling(ids[3]), Some(ids[0]));
        assert_eq!(tree.next_sibling(ids[0]), Some(ids[2]));
        assert_eq!(tree.next_sibling(ids[2]), None);

        // Moving within the same parent towards the end.
        tree.insert_before(root, ids[3], Some(ids[2]));
        assert_eq!(tree.children(root), &[ids[0], ids[3], ids[2]]);
        assert_eq!(tree.next_sibling(ids[3]), Some(ids[2]));

        tree.detach(ids[0]);
        assert_eq!(tree.next_sibling(ids[0]), None);
        assert_eq!(tree.next_sibling(ids[3]), Some(ids[2]));
    }

    #[test]
    fn test_removed_handles_go_stale() {
        let (mut tree, p, text) = sample();
        tree.remove(p);
        assert!(!tree.contains(p));
        assert!(!tree.contains(text));

        // Slot reuse bumps the generation, old handles stay dead.
        let fresh = tree.create_element("div", vec![]);
        assert!(!tree.contains(p));
        assert!(tree.contains(fresh));
        assert_ne!(fresh, p);
    }

    #[test]
    fn test_detached_node_stays_alive() {
        let (mut tree, p, text) = sample();
        tree.detach(p);
        assert!(tree.contains(p));
        assert!(tree.contains(text));
        assert!(!tree.is_connected(text));

        let root = tree.root();
        tree.append_child(root, p);
        assert!(tree.is_connected(text));
    }

    #[test]
    fn test_unchanged_attribute_not_recorded() {
        let (mut tree, p, _) = sample();
        tree.take_mutations();
        let before = tree.writes();
        assert!(!tree.set_attribute(p, "data-line-begin", "1"));
        assert_eq!(tree.writes(), before);
        assert!(tree.set_attribute(p, "data-line-begin", "2"));
        assert_eq!(tree.writes(), before + 1);
        assert_eq!(tree.take_mutations().len(), 1);
    }

    #[test]
    fn test_is_equal_node_ignores_attribute_order() {
        let mut a = LiveTree::new("main");
        let mut b = LiveTree::new("main");
        let x = a.create_element(
            "div",
            vec![Attribute::new("id", "x"), Attribute::new("class", "c")],
        );
        let y = b.create_element(
            "div",
            vec![Attribute::new("class", "c"), Attribute::new("id", "x")],
        );
        assert!(a.is_equal_node(x, &b, y));

        let t = b.create_text("child");
        b.append_child(y, t);
        assert!(!a.is_equal_node(x, &b, y));
    }

    #[test]
    fn test_class_helpers() {
        let (mut tree, p, _) = sample();
        assert!(tree.add_class(p, "peek-copy-btn--copied"));
        assert!(!tree.add_class(p, "peek-copy-btn--copied"));
        assert!(tree.has_class(p, "peek-copy-btn--copied"));
        assert!(tree.remove_class(p, "peek-copy-btn--copied"));
        assert_eq!(tree.attr(p, "class"), Some(""));
    }

    #[test]
    fn test_text_content_and_closest() {
        let (tree, p, text) = sample();
        assert_eq!(tree.text_content(p), "hello");
        assert_eq!(tree.closest(text, |t, n| t.tag(n) == Some("p")), Some(p));
        assert_eq!(tree.closest(text, |t, n| t.tag(n) == Some("pre")), None);
    }

    #[test]
    fn test_escaping() {
        let mut tree = LiveTree::new("main");
        let root = tree.root();
        let div = tree.create_element("div", vec![Attribute::new("title", "a \"b\" & c")]);
        let text = tree.create_text("1 < 2 & 3");
        tree.append_child(div, text);
        tree.append_child(root, div);
        assert_eq!(
            tree.inner_html(root),
            r#"<div title="a &quot;b&quot; &amp; c">1 &lt; 2 &amp; 3</div>"#
        );
    }
}
