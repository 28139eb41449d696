//! Element Query
//!
//! getElementById, querySelector, querySelectorAll over a deliberately tiny
//! selector grammar: `#id` or a bare tag name.

use crate::{DomTree, Node, NodeId};

/// Element query trait
pub trait ElementQuery {
    /// First descendant element whose `id` attribute equals `id`
    fn get_element_by_id(&self, root: NodeId, id: &str) -> Option<NodeId>;

    /// First descendant matching the selector, in document order
    fn query_selector(&self, root: NodeId, selector: &str) -> Option<NodeId>;

    /// All descendants matching the selector, in document order
    fn query_selector_all(&self, root: NodeId, selector: &str) -> Vec<NodeId>;
}

/// Parsed selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// `#id`
    Id(String),
    /// Bare tag name, matched case-sensitively
    Tag(String),
    /// Anything else; matches nothing
    Unsupported,
}

impl Selector {
    /// Parse a selector string. Never fails.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if let Some(id) = s.strip_prefix('#') {
            if is_name(id) {
                return Self::Id(id.to_string());
            }
        } else if is_name(s) {
            return Self::Tag(s.to_string());
        }
        Self::Unsupported
    }

    /// Check if a node matches this selector
    pub fn matches(&self, node: &Node) -> bool {
        let Some(elem) = node.as_element() else {
            return false;
        };
        match self {
            Self::Id(id) => elem.id() == Some(id.as_str()),
            Self::Tag(tag) => elem.tag == *tag,
            Self::Unsupported => false,
        }
    }
}

fn is_name(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl ElementQuery for DomTree {
    fn get_element_by_id(&self, root: NodeId, id: &str) -> Option<NodeId> {
        self.descendants(root)
            .find(|(_, n)| n.as_element().and_then(|e| e.id()) == Some(id))
            .map(|(found, _)| found)
    }

    fn query_selector(&self, root: NodeId, selector: &str) -> Option<NodeId> {
        let selector = Selector::parse(selector);
        if selector == Selector::Unsupported {
            return None;
        }
        self.descendants(root)
            .find(|(_, n)| selector.matches(n))
            .map(|(found, _)| found)
    }

    fn query_selector_all(&self, root: NodeId, selector: &str) -> Vec<NodeId> {
        let selector = Selector::parse(selector);
        if selector == Selector::Unsupported {
            return Vec::new();
        }
        self.descendants(root)
            .filter(|(_, n)| selector.matches(n))
            .map(|(found, _)| found)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_parse() {
        assert_eq!(Selector::parse("#main"), Selector::Id("main".into()));
        assert_eq!(Selector::parse("div"), Selector::Tag("div".into()));
        assert_eq!(Selector::parse(" my-widget "), Selector::Tag("my-widget".into()));
        assert_eq!(Selector::parse(".btn"), Selector::Unsupported);
        assert_eq!(Selector::parse("div p"), Selector::Unsupported);
        assert_eq!(Selector::parse("#"), Selector::Unsupported);
        assert_eq!(Selector::parse(""), Selector::Unsupported);
    }

    fn sample() -> (DomTree, NodeId, Vec<NodeId>) {
        let mut tree = DomTree::new();
        let root = tree.create_element("div");
        let a = tree.create_element("p");
        let b = tree.create_element("span");
        let c = tree.create_element("p");
        tree.set_attribute(b, "id", "target");
        tree.set_attribute(c, "id", "target");
        tree.append_child(root, a).unwrap();
        tree.append_child(a, b).unwrap();
        tree.append_child(root, c).unwrap();
        (tree, root, vec![a, b, c])
    }

    #[test]
    fn test_get_element_by_id_first_in_document_order() {
        let (tree, root, nodes) = sample();
        assert_eq!(tree.get_element_by_id(root, "target"), Some(nodes[1]));
        assert_eq!(tree.get_element_by_id(root, "missing"), None);
    }

    #[test]
    fn test_query_selector_all_order() {
        let (tree, root, nodes) = sample();
        assert_eq!(tree.query_selector_all(root, "p"), vec![nodes[0], nodes[2]]);
        assert_eq!(tree.query_selector(root, "p"), Some(nodes[0]));
        assert_eq!(tree.query_selector(root, "#target"), Some(nodes[1]));
    }

    #[test]
    fn test_tag_match_is_case_sensitive() {
        let (tree, root, _) = sample();
        assert!(tree.query_selector_all(root, "P").is_empty());
    }

    #[test]
    fn test_unsupported_matches_nothing() {
        let (tree, root, _) = sample();
        assert!(tree.query_selector_all(root, "div > p").is_empty());
        assert_eq!(tree.query_selector(root, "[id]"), None);
    }

    #[test]
    fn test_root_not_matched() {
        let (tree, root, _) = sample();
        assert!(tree.query_selector_all(root, "div").is_empty());
    }
}
