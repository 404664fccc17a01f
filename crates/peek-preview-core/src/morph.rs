//! Keyed in-place tree diff.
//!
//! [`morph_children`] mutates the children of a live node until they match
//! the children of a node in a freshly parsed fragment, reusing live nodes
//! wherever possible. Matching is positional except for nodes the policy
//! assigns a key to: keyed nodes are looked up anywhere under the live root
//! and moved into place, so their subtree (and any host-side state hanging
//! off it) survives.
//!
//! The live root's own attributes are never touched.

use std::collections::HashMap;

use smol_str::SmolStr;

use crate::tree::{LiveTree, NodeData, NodeId};

/// Per-node decisions consulted while diffing.
///
/// All hooks have permissive defaults: no keys, always update, nothing
/// retained.
pub trait MorphPolicy {
    /// Stable identity of `node`, if it has one. Called for nodes of both
    /// trees.
    fn node_key(&self, tree: &LiveTree, node: NodeId) -> Option<SmolStr> {
        let _ = (tree, node);
        None
    }

    /// Called before `from` is updated to match `to`. The policy may adjust
    /// `to` in the fragment. Returning `false` leaves `from` and its subtree
    /// untouched.
    fn before_update(
        &mut self,
        live: &LiveTree,
        from: NodeId,
        fragment: &mut LiveTree,
        to: NodeId,
    ) -> bool {
        let _ = (live, from, fragment, to);
        true
    }

    /// Called after attributes were synced. Returning `false` skips the
    /// child diff of `from`.
    fn before_children_update(
        &mut self,
        live: &LiveTree,
        from: NodeId,
        fragment: &LiveTree,
        to: NodeId,
    ) -> bool {
        let _ = (live, from, fragment, to);
        true
    }

    /// A node was created in the live tree from fragment content.
    fn node_added(&mut self, live: &LiveTree, node: NodeId) {
        let _ = (live, node);
    }

    /// Live nodes the fragment never describes. They are skipped during
    /// matching and never removed.
    fn retain_unmatched(&self, live: &LiveTree, node: NodeId) -> bool {
        let _ = (live, node);
        false
    }
}

/// Morph the children of `from` (in `live`) to match the children of `to`
/// (in `fragment`).
pub fn morph_children<P: MorphPolicy + ?Sized>(
    live: &mut LiveTree,
    from: NodeId,
    fragment: &mut LiveTree,
    to: NodeId,
    policy: &mut P,
) {
    let mut morpher = Morpher {
        live,
        fragment,
        policy,
        lookup: HashMap::new(),
        keyed_removals: Vec::new(),
    };
    morpher.index_tree(from);
    morpher.morph_el(from, to, true);
    morpher.finish();
}

struct Morpher<'a, P: MorphPolicy + ?Sized> {
    live: &'a mut LiveTree,
    fragment: &'a mut LiveTree,
    policy: &'a mut P,
    /// Keyed live nodes not yet matched against the fragment.
    lookup: HashMap<SmolStr, NodeId>,
    /// Keys whose live node was displaced; freed at the end unless matched.
    keyed_removals: Vec<SmolStr>,
}

impl<P: MorphPolicy + ?Sized> Morpher<'_, P> {
    fn index_tree(&mut self, root: NodeId) {
        let keyed: Vec<(SmolStr, NodeId)> = self
            .live
            .descendants(root)
            .filter_map(|node| self.policy.node_key(self.live, node).map(|k| (k, node)))
            .collect();
        self.lookup.extend(keyed);
    }

    fn live_key(&self, node: NodeId) -> Option<SmolStr> {
        self.policy.node_key(self.live, node)
    }

    fn fragment_key(&self, node: NodeId) -> Option<SmolStr> {
        self.policy.node_key(self.fragment, node)
    }

    fn same_tag(&self, from: NodeId, to: NodeId) -> bool {
        match (self.live.tag(from), self.fragment.tag(to)) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => false,
        }
    }

    fn same_kind(&self, from: NodeId, to: NodeId) -> bool {
        match (self.live.data(from), self.fragment.data(to)) {
            (Some(a), Some(b)) => a.same_kind(b),
            _ => false,
        }
    }

    fn morph_el(&mut self, from: NodeId, to: NodeId, children_only: bool) {
        if let Some(key) = self.fragment_key(to) {
            self.lookup.remove(&key);
        }

        if !children_only {
            if !self.policy.before_update(self.live, from, self.fragment, to) {
                return;
            }
            self.morph_attrs(from, to);
            if !self
                .policy
                .before_children_update(self.live, from, self.fragment, to)
            {
                return;
            }
        }

        self.morph_child_list(from, to);
    }

    fn morph_attrs(&mut self, from: NodeId, to: NodeId) {
        let wanted = self.fragment.attrs(to).to_vec();
        for attr in &wanted {
            self.live.set_attribute(from, &attr.name, &attr.value);
        }
        let stale: Vec<SmolStr> = self
            .live
            .attrs(from)
            .iter()
            .filter(|a| !wanted.iter().any(|w| w.name == a.name))
            .map(|a| a.name.clone())
            .collect();
        for name in stale {
            self.live.remove_attribute(from, &name);
        }
    }

    fn morph_child_list(&mut self, from_el: NodeId, to_el: NodeId) {
        let to_children = self.fragment.children(to_el).to_vec();
        let mut cur_from = self.live.first_child(from_el);

        'outer: for to_child in to_children {
            let to_key = self.fragment_key(to_child);

            while let Some(mut from_child) = cur_from {
                if self.policy.retain_unmatched(self.live, from_child) {
                    cur_from = self.live.next_sibling(from_child);
                    continue;
                }

                let mut from_key = self.live_key(from_child);
                let mut compatible: Option<bool> = None;

                if self.same_kind(from_child, to_child) {
                    if self.live.is_element(from_child) {
                        if let Some(to_key) = &to_key {
                            if from_key.as_ref() != Some(to_key) {
                                match self.lookup.get(to_key).copied() {
                                    Some(matching)
                                        if self.live.next_sibling(from_child) == Some(matching) =>
                                    {
                                        // The wanted node is right behind us:
                                        // dropping `from_child` lines it up.
                                        compatible = Some(false);
                                    }
                                    Some(matching) => {
                                        self.live.insert_before(from_el, matching, Some(from_child));
                                        self.discard(from_child, from_key.take());
                                        from_child = matching;
                                        from_key = self.live_key(from_child);
                                    }
                                    None => compatible = Some(false),
                                }
                            }
                        } else if from_key.is_some() {
                            compatible = Some(false);
                        }

                        let ok = compatible != Some(false) && self.same_tag(from_child, to_child);
                        if ok {
                            self.morph_el(from_child, to_child, false);
                        }
                        compatible = Some(ok);
                    } else {
                        let text = self.fragment.text(to_child).unwrap_or_default().to_string();
                        self.live.set_text(from_child, &text);
                        compatible = Some(true);
                    }
                }

                if compatible == Some(true) {
                    cur_from = self.live.next_sibling(from_child);
                    continue 'outer;
                }

                let next = self.live.next_sibling(from_child);
                self.discard(from_child, from_key);
                cur_from = next;
            }

            // Ran out of live candidates: reuse a keyed node from elsewhere
            // or build the fragment node.
            let reusable = to_key
                .as_ref()
                .and_then(|k| self.lookup.get(k).copied())
                .filter(|m| self.same_tag(*m, to_child));
            match reusable {
                Some(matching) => {
                    self.live.append_child(from_el, matching);
                    self.morph_el(matching, to_child, false);
                }
                None => {
                    let added = self.adopt(to_child);
                    self.live.append_child(from_el, added);
                }
            }
        }

        while let Some(from_child) = cur_from {
            let next = self.live.next_sibling(from_child);
            if !self.policy.retain_unmatched(self.live, from_child) {
                let key = self.live_key(from_child);
                self.discard(from_child, key);
            }
            cur_from = next;
        }
    }

    /// Drop a live node that has no counterpart at this position.
    ///
    /// Keyed nodes stay in place until the end of the pass since they may
    /// still be matched further on. Unkeyed nodes are freed, but keyed
    /// descendants are parked so a later match can rescue them.
    fn discard(&mut self, node: NodeId, key: Option<SmolStr>) {
        if let Some(key) = key {
            self.keyed_removals.push(key);
            return;
        }

        let mut parked = Vec::new();
        let mut stack: Vec<NodeId> = self.live.children(node).to_vec();
        while let Some(descendant) = stack.pop() {
            match self.live_key(descendant) {
                Some(key) if self.lookup.get(&key) == Some(&descendant) => {
                    self.keyed_removals.push(key);
                    parked.push(descendant);
                }
                _ => stack.extend(self.live.children(descendant).iter().copied()),
            }
        }
        for descendant in parked {
            self.live.detach(descendant);
        }
        self.live.remove(node);
    }

    /// Materialize a fragment subtree in the live tree, detached.
    ///
    /// Keyed descendants that already exist in the live tree are moved in
    /// and morphed instead of being rebuilt.
    fn adopt(&mut self, to: NodeId) -> NodeId {
        let data = match self.fragment.data(to) {
            Some(data) => data.clone(),
            None => NodeData::Text(String::new()),
        };
        let copy = self.live.create(data);
        self.policy.node_added(self.live, copy);

        for child in self.fragment.children(to).to_vec() {
            let existing = self
                .fragment_key(child)
                .and_then(|k| self.lookup.get(&k).copied())
                .filter(|m| self.same_tag(*m, child));
            match existing {
                Some(existing) => {
                    self.live.append_child(copy, existing);
                    self.morph_el(existing, child, false);
                }
                None => {
                    let built = self.adopt(child);
                    self.live.append_child(copy, built);
                }
            }
        }
        copy
    }

    fn finish(&mut self) {
        for key in std::mem::take(&mut self.keyed_removals) {
            if let Some(node) = self.lookup.remove(&key) {
                self.live.remove(node);
            }
        }
        // Parked nodes are gone from the live tree either way.
        let stragglers: Vec<NodeId> = self
            .lookup
            .values()
            .copied()
            .filter(|n| self.live.contains(*n) && self.live.parent(*n).is_none())
            .collect();
        for node in stragglers {
            self.live.remove(node);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_html_fragment;
    use crate::tree::TreeMutation;

    /// Keys elements by their `id`.
    struct ById;

    impl MorphPolicy for ById {
        fn node_key(&self, tree: &LiveTree, node: NodeId) -> Option<SmolStr> {
            tree.attr(node, "id").map(SmolStr::new)
        }
    }

    struct Plain;
    impl MorphPolicy for Plain {}

    fn morph(live: &mut LiveTree, html: &str, policy: &mut impl MorphPolicy) {
        let mut fragment = parse_html_fragment(html);
        let (from, to) = (live.root(), fragment.root());
        morph_children(live, from, &mut fragment, to, policy);
    }

    fn live(html: &str) -> LiveTree {
        let mut tree = LiveTree::new("main");
        morph(&mut tree, html, &mut Plain);
        tree.take_mutations();
        tree
    }

    #[test]
    fn test_builds_from_empty() {
        let tree = live(r#"<p data-line-begin="1">a</p><p data-line-begin="2">b</p>"#);
        assert_eq!(
            tree.inner_html(tree.root()),
            r#"<p data-line-begin="1">a</p><p data-line-begin="2">b</p>"#
        );
    }

    #[test]
    fn test_identical_fragment_writes_nothing() {
        let html = r#"<h1 data-line-begin="1">T</h1><ul><li>x</li><li>y</li></ul>"#;
        let mut tree = live(html);
        let before = tree.writes();
        morph(&mut tree, html, &mut Plain);
        assert_eq!(tree.writes(), before);
        assert!(tree.take_mutations().is_empty());
    }

    #[test]
    fn test_text_change_reuses_nodes() {
        let mut tree = live("<p>old</p>");
        let p = tree.first_child(tree.root()).unwrap();
        morph(&mut tree, "<p>new</p>", &mut Plain);
        assert_eq!(tree.first_child(tree.root()), Some(p));
        let mutations = tree.take_mutations();
        assert_eq!(mutations.len(), 1);
        assert!(matches!(&mutations[0], TreeMutation::SetText { text, .. } if text == "new"));
    }

    #[test]
    fn test_stale_attributes_removed() {
        let mut tree = live(r#"<p class="a" title="t">x</p>"#);
        morph(&mut tree, r#"<p class="b">x</p>"#, &mut Plain);
        assert_eq!(tree.inner_html(tree.root()), r#"<p class="b">x</p>"#);
    }

    #[test]
    fn test_tag_change_replaces() {
        let mut tree = live("<p>x</p><p>y</p>");
        morph(&mut tree, "<h2>x</h2>", &mut Plain);
        assert_eq!(tree.inner_html(tree.root()), "<h2>x</h2>");
    }

    #[test]
    fn test_keyed_node_moves_instead_of_rebuilding() {
        let mut tree = live(r#"<div id="a">A</div><div id="b">B</div>"#);
        let root = tree.root();
        let a = tree.children(root)[0];
        let b = tree.children(root)[1];

        morph(
            &mut tree,
            r#"<div id="b">B</div><div id="a">A</div>"#,
            &mut ById,
        );
        assert_eq!(tree.children(root), &[b, a]);
        assert_eq!(
            tree.inner_html(root),
            r#"<div id="b">B</div><div id="a">A</div>"#
        );
    }

    #[test]
    fn test_keyed_node_survives_removed_wrapper() {
        let mut tree = live(r#"<section><div id="g">kept</div></section>"#);
        let root = tree.root();
        let g = tree.find(root, |t, n| t.attr(n, "id") == Some("g")).unwrap();

        morph(&mut tree, r#"<article><div id="g">kept</div></article>"#, &mut ById);
        assert!(tree.is_connected(g));
        assert_eq!(tree.tag(tree.parent(g).unwrap()), Some("article"));
    }

    #[test]
    fn test_unmatched_keyed_node_freed() {
        let mut tree = live(r#"<div id="a">A</div><p>x</p>"#);
        let a = tree.first_child(tree.root()).unwrap();
        morph(&mut tree, "<p>x</p>", &mut ById);
        assert!(!tree.contains(a));
        assert_eq!(tree.inner_html(tree.root()), "<p>x</p>");
    }

    #[test]
    fn test_empty_fragment_clears() {
        let mut tree = live("<p>a</p><p>b</p>");
        morph(&mut tree, "", &mut Plain);
        assert!(tree.children(tree.root()).is_empty());
    }

    struct KeepMarked;

    impl MorphPolicy for KeepMarked {
        fn retain_unmatched(&self, live: &LiveTree, node: NodeId) -> bool {
            live.has_attr(node, "data-keep")
        }
    }

    #[test]
    fn test_retained_nodes_are_invisible_to_matching() {
        let mut tree = live("<div><p>a</p></div>");
        let root = tree.root();
        let div = tree.first_child(root).unwrap();
        let marker = tree.create_element("div", vec![crate::tree::Attribute::new("data-keep", "")]);
        let p = tree.first_child(div).unwrap();
        tree.insert_before(div, marker, Some(p));

        morph(&mut tree, "<div><div>b</div><p>a</p></div>", &mut KeepMarked);
        assert!(tree.is_connected(marker));
        assert_eq!(tree.text_content(marker), "");
        assert_eq!(
            tree.inner_html(root),
            r#"<div><div data-keep=""></div><div>b</div><p>a</p></div>"#
        );
    }

    struct Frozen;

    impl MorphPolicy for Frozen {
        fn before_children_update(
            &mut self,
            live: &LiveTree,
            from: NodeId,
            _fragment: &LiveTree,
            _to: NodeId,
        ) -> bool {
            !live.has_attr(from, "data-frozen")
        }
    }

    #[test]
    fn test_children_update_can_be_skipped() {
        let mut tree = live(r#"<div data-frozen="1"><svg></svg></div>"#);
        morph(&mut tree, r#"<div data-frozen="1"></div>"#, &mut Frozen);
        assert_eq!(
            tree.inner_html(tree.root()),
            r#"<div data-frozen="1"><svg></svg></div>"#
        );
    }
}
