//! DOM Tree (arena-based allocation)
//!
//! Nodes are never freed while the tree lives: a detached node stays
//! addressable so handles held elsewhere remain valid, it is merely
//! unreachable from the document root.

use crate::{Attribute, DomError, DomResult, Node, NodeId, NodeKind};

/// Arena-based DOM tree. Slot 0 is always the document node.
#[derive(Debug, Clone)]
pub struct DomTree {
    nodes: Vec<Node>,
}

impl DomTree {
    /// Create a tree holding only its document node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::document()],
        }
    }

    /// The document node
    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Get a mutable node by ID
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    /// Number of nodes in the arena, detached ones included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the document node is never removed
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn node(&self, id: NodeId) -> DomResult<&Node> {
        self.get(id).ok_or(DomError::NotFound(id))
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(Node::element(tag))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, content: &str) -> NodeId {
        self.push(Node::text(content))
    }

    /// Create a detached comment
    pub fn create_comment(&mut self, content: &str) -> NodeId {
        self.push(Node::comment(content))
    }

    /// Create a detached doctype
    pub fn create_doctype(&mut self, name: &str) -> NodeId {
        self.push(Node::doctype(name))
    }

    // ---------------------------------------------------------------------
    // Navigation
    // ---------------------------------------------------------------------

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.get(id).map(Node::kind)
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(Node::tag)
    }

    #[inline]
    pub fn is_tag(&self, id: NodeId, tag: &str) -> bool {
        self.tag(id) == Some(tag)
    }

    #[inline]
    pub fn is_element(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(Node::is_element)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent.get())
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.first_child.get())
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.last_child.get())
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.next_sibling.get())
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.prev_sibling.get())
    }

    /// Iterate over the direct children of a node
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.get(id).map_or(NodeId::NONE, |n| n.first_child),
        }
    }

    /// Snapshot of child IDs, safe to hold across mutation
    pub fn child_ids(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id).map(|(child, _)| child).collect()
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .filter(|(_, n)| n.is_element())
            .map(|(child, _)| child)
            .collect()
    }

    pub fn first_element_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id)
            .find(|(_, n)| n.is_element())
            .map(|(child, _)| child)
    }

    pub fn last_element_child(&self, id: NodeId) -> Option<NodeId> {
        let mut cur = self.last_child(id);
        while let Some(c) = cur {
            if self.is_element(c) {
                return Some(c);
            }
            cur = self.prev_sibling(c);
        }
        None
    }

    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut cur = self.next_sibling(id);
        while let Some(c) = cur {
            if self.is_element(c) {
                return Some(c);
            }
            cur = self.next_sibling(c);
        }
        None
    }

    pub fn previous_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut cur = self.prev_sibling(id);
        while let Some(c) = cur {
            if self.is_element(c) {
                return Some(c);
            }
            cur = self.prev_sibling(c);
        }
        None
    }

    /// First child element with the given tag
    pub fn find_child(&self, parent: NodeId, tag: &str) -> Option<NodeId> {
        self.children(parent)
            .find(|(_, n)| n.is_tag(tag))
            .map(|(child, _)| child)
    }

    /// Last child element with the given tag
    pub fn find_last_child(&self, parent: NodeId, tag: &str) -> Option<NodeId> {
        let mut cur = self.last_child(parent);
        while let Some(c) = cur {
            if self.is_tag(c, tag) {
                return Some(c);
            }
            cur = self.prev_sibling(c);
        }
        None
    }

    /// Pre-order traversal of the descendants of `root` (root excluded)
    pub fn descendants(&self, root: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            root,
            next: self.get(root).map_or(NodeId::NONE, |n| n.first_child),
        }
    }

    /// Ancestors of a node, nearest first
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&p| self.parent(p))
    }

    /// True if `ancestor` is `node` or one of its ancestors
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        ancestor == node || self.ancestors(node).any(|a| a == ancestor)
    }

    /// `Node.contains`
    pub fn contains(&self, node: NodeId, other: NodeId) -> bool {
        self.is_inclusive_ancestor(node, other)
    }

    /// True if the node is reachable from the document node
    pub fn is_connected(&self, id: NodeId) -> bool {
        id == NodeId::ROOT || self.ancestors(id).last() == Some(NodeId::ROOT)
    }

    // ---------------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------------

    pub(crate) fn ensure_insertable(
        &self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
        replacing: Option<NodeId>,
    ) -> DomResult<()> {
        let parent_kind = self.node(parent)?.kind();
        let child_kind = self.node(child)?.kind();

        if !matches!(parent_kind, NodeKind::Document | NodeKind::Element) {
            return Err(DomError::HierarchyRequest("parent cannot have children"));
        }
        if child_kind == NodeKind::Document {
            return Err(DomError::HierarchyRequest("a document cannot be inserted"));
        }
        if self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::HierarchyRequest(
                "node would become its own ancestor",
            ));
        }
        if let Some(r) = reference {
            if self.node(r)?.parent != parent {
                return Err(DomError::NotAChild { parent, child: r });
            }
        }

        let others = |kind: NodeKind| {
            self.children(parent)
                .any(|(id, n)| n.kind() == kind && id != child && Some(id) != replacing)
        };
        match (parent_kind, child_kind) {
            (NodeKind::Document, NodeKind::Text) => Err(DomError::HierarchyRequest(
                "text cannot be a child of the document",
            )),
            (NodeKind::Document, NodeKind::Element) if others(NodeKind::Element) => Err(
                DomError::HierarchyRequest("document already has a document element"),
            ),
            (NodeKind::Document, NodeKind::Doctype) if others(NodeKind::Doctype) => {
                Err(DomError::HierarchyRequest("document already has a doctype"))
            }
            (NodeKind::Element, NodeKind::Doctype) => Err(DomError::HierarchyRequest(
                "doctype must be a child of the document",
            )),
            _ => Ok(()),
        }
    }

    /// Unlink a node from its parent; no-op if already detached
    fn unlink(&mut self, id: NodeId) {
        let Some(node) = self.get(id) else {
            return;
        };
        let (parent, prev, next) = (node.parent, node.prev_sibling, node.next_sibling);
        if !parent.is_valid() {
            return;
        }

        if prev.is_valid() {
            self.nodes[prev.index()].next_sibling = next;
        } else {
            self.nodes[parent.index()].first_child = next;
        }
        if next.is_valid() {
            self.nodes[next.index()].prev_sibling = prev;
        } else {
            self.nodes[parent.index()].last_child = prev;
        }

        let node = &mut self.nodes[id.index()];
        node.parent = NodeId::NONE;
        node.prev_sibling = NodeId::NONE;
        node.next_sibling = NodeId::NONE;
    }

    /// Link a detached node under `parent`, before `reference` or at the end
    fn link(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        match reference {
            Some(r) => {
                let prev = self.nodes[r.index()].prev_sibling;
                self.nodes[child.index()].prev_sibling = prev;
                self.nodes[child.index()].next_sibling = r;
                self.nodes[r.index()].prev_sibling = child;
                if prev.is_valid() {
                    self.nodes[prev.index()].next_sibling = child;
                } else {
                    self.nodes[parent.index()].first_child = child;
                }
            }
            None => {
                let last = self.nodes[parent.index()].last_child;
                self.nodes[child.index()].prev_sibling = last;
                self.nodes[child.index()].next_sibling = NodeId::NONE;
                if last.is_valid() {
                    self.nodes[last.index()].next_sibling = child;
                } else {
                    self.nodes[parent.index()].first_child = child;
                }
                self.nodes[parent.index()].last_child = child;
            }
        }
        self.nodes[child.index()].parent = parent;
    }

    /// Append `child` as the last child of `parent`, moving it if attached
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` before `reference` (append when `None`)
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<NodeId> {
        let reference = reference.filter(|r| r.is_valid());
        self.ensure_insertable(parent, child, reference, None)?;

        let reference = match reference {
            Some(r) if r == child => self.next_sibling(child),
            other => other,
        };
        self.unlink(child);
        self.link(parent, child, reference);
        Ok(child)
    }

    /// Remove `child` from `parent`. The removed node's parent link is cleared.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        self.node(parent)?;
        if self.node(child)?.parent != parent {
            return Err(DomError::NotAChild { parent, child });
        }
        self.unlink(child);
        Ok(child)
    }

    /// Replace `old` with `new` under `parent`, returning `old`
    pub fn replace_child(&mut self, parent: NodeId, new: NodeId, old: NodeId) -> DomResult<NodeId> {
        if self.node(old)?.parent != parent {
            return Err(DomError::NotAChild { parent, child: old });
        }
        if new == old {
            return Ok(old);
        }
        self.ensure_insertable(parent, new, None, Some(old))?;

        self.unlink(new);
        let reference = self.next_sibling(old);
        self.unlink(old);
        self.link(parent, new, reference);
        Ok(old)
    }

    /// Detach a node from wherever it is
    pub fn detach(&mut self, id: NodeId) {
        self.unlink(id);
    }

    /// Detach every child of `id`, returning them in order
    pub fn remove_all_children(&mut self, id: NodeId) -> Vec<NodeId> {
        let children = self.child_ids(id);
        for &child in &children {
            self.unlink(child);
        }
        children
    }

    /// Copy a node (and, if `deep`, its subtree). The copy starts detached.
    pub fn clone_node(&mut self, id: NodeId, deep: bool) -> DomResult<NodeId> {
        let node = self.node(id)?;
        if node.kind() == NodeKind::Document {
            return Err(DomError::HierarchyRequest(
                "a document cannot be cloned into its own tree",
            ));
        }
        let copy = self.push(node.detached_copy());
        if deep {
            for child in self.child_ids(id) {
                let child_copy = self.clone_node(child, true)?;
                self.link(copy, child_copy, None);
            }
        }
        Ok(copy)
    }

    /// Deep copy a subtree of another tree into this one, detached
    pub fn import_subtree(&mut self, src: &DomTree, id: NodeId) -> DomResult<NodeId> {
        let node = src.node(id)?;
        if node.kind() == NodeKind::Document {
            return Err(DomError::HierarchyRequest("a document cannot be imported"));
        }
        let copy = self.push(node.detached_copy());
        for (child, _) in src.children(id) {
            let child_copy = self.import_subtree(src, child)?;
            self.link(copy, child_copy, None);
        }
        Ok(copy)
    }

    // ---------------------------------------------------------------------
    // Attributes and character data
    // ---------------------------------------------------------------------

    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.get(id)?.as_element()?.get_attr(name)
    }

    /// Set an attribute. Returns false if the node is not an element.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> bool {
        match self.get_mut(id).and_then(Node::as_element_mut) {
            Some(elem) => {
                elem.set_attr(name, value);
                true
            }
            None => false,
        }
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.get_mut(id)?.as_element_mut()?.remove_attr(name)
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.get_attribute(id, name).is_some()
    }

    /// Attributes in order; empty for non-elements
    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        self.get(id)
            .and_then(Node::as_element)
            .map_or(&[], |e| e.attrs())
    }

    /// `textContent` read.
    ///
    /// `None` for document and doctype nodes. Comments are skipped at every
    /// depth; a text or comment node read directly returns its own datum.
    pub fn text_content(&self, id: NodeId) -> Option<String> {
        let node = self.get(id)?;
        match node.kind() {
            NodeKind::Document | NodeKind::Doctype => None,
            NodeKind::Text | NodeKind::Comment => node.character_data().map(str::to_string),
            NodeKind::Element => {
                let mut out = String::new();
                for (_, desc) in self.descendants(id) {
                    if let crate::NodeData::Text(text) = &desc.data {
                        out.push_str(text);
                    }
                }
                Some(out)
            }
        }
    }

    /// Replace the datum of a text or comment node
    pub fn set_character_data(&mut self, id: NodeId, content: &str) -> bool {
        self.get_mut(id)
            .is_some_and(|n| n.set_character_data(content))
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over the direct children of a node
pub struct Children<'a> {
    tree: &'a DomTree,
    next: NodeId,
}

impl<'a> Iterator for Children<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next.get()?;
        let node = self.tree.get(id)?;
        self.next = node.next_sibling;
        Some((id, node))
    }
}

/// Pre-order (document order) iterator over a subtree, root excluded
pub struct Descendants<'a> {
    tree: &'a DomTree,
    root: NodeId,
    next: NodeId,
}

impl Descendants<'_> {
    fn following(&self, id: NodeId) -> NodeId {
        let Some(node) = self.tree.get(id) else {
            return NodeId::NONE;
        };
        if node.first_child.is_valid() {
            return node.first_child;
        }
        let mut cur = id;
        while cur != self.root {
            let Some(c) = self.tree.get(cur) else {
                break;
            };
            if c.next_sibling.is_valid() {
                return c.next_sibling;
            }
            cur = c.parent;
        }
        NodeId::NONE
    }
}

impl<'a> Iterator for Descendants<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next.get()?;
        let node = self.tree.get(id)?;
        self.next = self.following(id);
        Some((id, node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_siblings() {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        let a = tree.create_element("a");
        let b = tree.create_element("b");
        tree.append_child(tree.root(), div).unwrap();
        tree.append_child(div, a).unwrap();
        tree.append_child(div, b).unwrap();

        assert_eq!(tree.child_ids(div), vec![a, b]);
        assert_eq!(tree.next_sibling(a), Some(b));
        assert_eq!(tree.prev_sibling(b), Some(a));
        assert_eq!(tree.parent(a), Some(div));
        assert!(tree.is_connected(b));
    }

    #[test]
    fn test_insert_before_reference_is_child() {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        let a = tree.create_element("a");
        let b = tree.create_element("b");
        tree.append_child(div, a).unwrap();
        tree.append_child(div, b).unwrap();

        tree.insert_before(div, a, Some(a)).unwrap();
        assert_eq!(tree.child_ids(div), vec![a, b]);

        tree.insert_before(div, b, Some(a)).unwrap();
        assert_eq!(tree.child_ids(div), vec![b, a]);
    }

    #[test]
    fn test_remove_clears_parent() {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        let p = tree.create_element("p");
        tree.append_child(div, p).unwrap();

        tree.remove_child(div, p).unwrap();
        assert_eq!(tree.parent(p), None);
        assert!(tree.child_ids(div).is_empty());
        assert_eq!(tree.first_child(div), None);
        assert_eq!(tree.last_child(div), None);
    }

    #[test]
    fn test_remove_non_child_fails() {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        let p = tree.create_element("p");
        assert_eq!(
            tree.remove_child(div, p),
            Err(DomError::NotAChild { parent: div, child: p })
        );
    }

    #[test]
    fn test_append_moves_between_parents() {
        let mut tree = DomTree::new();
        let a = tree.create_element("div");
        let b = tree.create_element("div");
        let p = tree.create_element("p");
        tree.append_child(a, p).unwrap();
        tree.append_child(b, p).unwrap();

        assert!(tree.child_ids(a).is_empty());
        assert_eq!(tree.child_ids(b), vec![p]);
    }

    #[test]
    fn test_cycle_rejected() {
        let mut tree = DomTree::new();
        let outer = tree.create_element("div");
        let inner = tree.create_element("div");
        tree.append_child(outer, inner).unwrap();

        assert!(matches!(
            tree.append_child(inner, outer),
            Err(DomError::HierarchyRequest(_))
        ));
        assert!(matches!(
            tree.append_child(outer, outer),
            Err(DomError::HierarchyRequest(_))
        ));
    }

    #[test]
    fn test_document_accepts_one_element() {
        let mut tree = DomTree::new();
        let html = tree.create_element("html");
        let other = tree.create_element("html");
        tree.append_child(tree.root(), html).unwrap();

        assert!(tree.append_child(tree.root(), other).is_err());
        // Replacing the document element with another is fine.
        tree.replace_child(tree.root(), other, html).unwrap();
        assert_eq!(tree.first_element_child(tree.root()), Some(other));

        let text = tree.create_text("x");
        assert!(tree.append_child(tree.root(), text).is_err());
    }

    #[test]
    fn test_replace_child_with_next_sibling() {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        let a = tree.create_element("a");
        let b = tree.create_element("b");
        let c = tree.create_element("c");
        for n in [a, b, c] {
            tree.append_child(div, n).unwrap();
        }

        let old = tree.replace_child(div, b, a).unwrap();
        assert_eq!(old, a);
        assert_eq!(tree.child_ids(div), vec![b, c]);
        assert_eq!(tree.parent(a), None);
    }

    #[test]
    fn test_clone_deep_and_shallow() {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        tree.set_attribute(div, "id", "x");
        let text = tree.create_text("hi");
        tree.append_child(div, text).unwrap();
        tree.append_child(tree.root(), div).unwrap();

        let shallow = tree.clone_node(div, false).unwrap();
        assert_eq!(tree.get_attribute(shallow, "id"), Some("x"));
        assert!(tree.child_ids(shallow).is_empty());
        assert_eq!(tree.parent(shallow), None);

        let deep = tree.clone_node(div, true).unwrap();
        assert_eq!(tree.text_content(deep).as_deref(), Some("hi"));
        assert_eq!(tree.parent(deep), None);
        assert_ne!(tree.child_ids(deep), tree.child_ids(div));
    }

    #[test]
    fn test_text_content_skips_comments() {
        let mut tree = DomTree::new();
        let p = tree.create_element("p");
        let t1 = tree.create_text("hello");
        let c = tree.create_comment("hidden");
        let t2 = tree.create_text(" world");
        for n in [t1, c, t2] {
            tree.append_child(p, n).unwrap();
        }

        assert_eq!(tree.text_content(p).as_deref(), Some("hello world"));
        assert_eq!(tree.text_content(c).as_deref(), Some("hidden"));
        assert_eq!(tree.text_content(tree.root()), None);
    }

    #[test]
    fn test_descendants_preorder() {
        let mut tree = DomTree::new();
        let a = tree.create_element("a");
        let b = tree.create_element("b");
        let c = tree.create_element("c");
        let d = tree.create_element("d");
        tree.append_child(a, b).unwrap();
        tree.append_child(b, c).unwrap();
        tree.append_child(a, d).unwrap();

        let order: Vec<_> = tree.descendants(a).map(|(id, _)| id).collect();
        assert_eq!(order, vec![b, c, d]);
        let inner: Vec<_> = tree.descendants(b).map(|(id, _)| id).collect();
        assert_eq!(inner, vec![c]);
    }

    #[test]
    fn test_element_navigation_skips_text() {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        let t = tree.create_text(" ");
        let a = tree.create_element("a");
        let t2 = tree.create_text(" ");
        let b = tree.create_element("b");
        for n in [t, a, t2, b] {
            tree.append_child(div, n).unwrap();
        }

        assert_eq!(tree.first_element_child(div), Some(a));
        assert_eq!(tree.last_element_child(div), Some(b));
        assert_eq!(tree.next_element_sibling(a), Some(b));
        assert_eq!(tree.previous_element_sibling(b), Some(a));
        assert_eq!(tree.element_children(div), vec![a, b]);
    }
}
