//! Single-property access to inline `style` attributes.

use crate::tree::{LiveTree, NodeId};

fn declarations(style: &str) -> impl Iterator<Item = (&str, &str)> {
    style.split(';').filter_map(|decl| {
        let (name, value) = decl.split_once(':')?;
        let name = name.trim();
        (!name.is_empty()).then_some((name, value.trim()))
    })
}

/// Value of one inline style property.
pub fn style_property(tree: &LiveTree, node: NodeId, property: &str) -> Option<String> {
    let style = tree.attr(node, "style")?;
    declarations(style)
        .find(|(name, _)| name.eq_ignore_ascii_case(property))
        .map(|(_, value)| value.to_string())
}

/// Set (or with `None`, clear) one inline style property, leaving the others
/// in place. Returns whether the tree changed.
pub fn set_style_property(
    tree: &mut LiveTree,
    node: NodeId,
    property: &str,
    value: Option<&str>,
) -> bool {
    let current = tree.attr(node, "style").unwrap_or_default();
    let mut rest: Vec<String> = declarations(current)
        .filter(|(name, _)| !name.eq_ignore_ascii_case(property))
        .map(|(name, value)| format!("{name}: {value}"))
        .collect();
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        rest.push(format!("{property}: {value}"));
    }

    if rest.is_empty() {
        return tree.remove_attribute(node, "style");
    }
    let style = format!("{};", rest.join("; "));
    if declarations(current).eq(declarations(&style)) {
        return false;
    }
    tree.set_attribute(node, "style", &style)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Attribute;

    #[test]
    fn test_set_and_read_property() {
        let mut tree = LiveTree::new("main");
        let div = tree.create_element("div", vec![Attribute::new("style", "color: red")]);
        assert!(set_style_property(&mut tree, div, "height", Some("120px")));
        assert_eq!(style_property(&tree, div, "height").as_deref(), Some("120px"));
        assert_eq!(style_property(&tree, div, "color").as_deref(), Some("red"));
        assert_eq!(tree.attr(div, "style"), Some("color: red; height: 120px;"));
    }

    #[test]
    fn test_unchanged_value_is_not_written() {
        let mut tree = LiveTree::new("main");
        let div = tree.create_element("div", vec![Attribute::new("style", "height: 10px;")]);
        let writes = tree.writes();
        assert!(!set_style_property(&mut tree, div, "height", Some("10px")));
        assert_eq!(tree.writes(), writes);
    }

    #[test]
    fn test_clearing_last_property_drops_attribute() {
        let mut tree = LiveTree::new("main");
        let div = tree.create_element("div", vec![Attribute::new("style", "height: 10px")]);
        assert!(set_style_property(&mut tree, div, "height", None));
        assert!(!tree.has_attr(div, "style"));
    }
}
