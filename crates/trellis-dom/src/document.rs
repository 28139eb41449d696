//! Document - High-level document API

use crate::{DomTree, ElementQuery, NodeId, NodeKind};

/// HTML Document
#[derive(Debug, Clone)]
pub struct Document {
    /// The DOM tree
    tree: DomTree,
    /// Document URL
    url: String,
}

impl Document {
    /// Create a document with the usual `<!DOCTYPE html><html><head><body>`
    /// skeleton
    pub fn new(url: &str) -> Self {
        let mut tree = DomTree::new();
        let root = tree.root();
        let doctype = tree.create_doctype("html");
        let html = tree.create_element("html");
        let head = tree.create_element("head");
        let body = tree.create_element("body");

        // A fresh tree accepts this shape; the results cannot be errors.
        let _ = tree.append_child(root, doctype);
        let _ = tree.append_child(root, html);
        let _ = tree.append_child(html, head);
        let _ = tree.append_child(html, body);

        Self {
            tree,
            url: url.to_string(),
        }
    }

    /// Create an empty document (no structure)
    pub fn empty(url: &str) -> Self {
        Self {
            tree: DomTree::new(),
            url: url.to_string(),
        }
    }

    /// Build a document around an existing tree
    pub fn from_tree(tree: DomTree, url: &str) -> Self {
        Self {
            tree,
            url: url.to_string(),
        }
    }

    /// Get document URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The document node
    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    /// Get the `<html>` element
    pub fn document_element(&self) -> Option<NodeId> {
        self.tree.first_element_child(self.tree.root())
    }

    /// Get the `<head>` element
    pub fn head(&self) -> Option<NodeId> {
        self.document_element()
            .and_then(|html| self.tree.find_child(html, "head"))
    }

    /// Get the `<body>` element
    pub fn body(&self) -> Option<NodeId> {
        self.document_element()
            .and_then(|html| self.tree.find_child(html, "body"))
    }

    /// The doctype node, if any
    pub fn doctype(&self) -> Option<NodeId> {
        self.tree
            .children(self.tree.root())
            .find(|(_, n)| n.kind() == NodeKind::Doctype)
            .map(|(id, _)| id)
    }

    /// Text of the first `<title>` in `<head>`, or empty
    pub fn title(&self) -> String {
        self.head()
            .and_then(|head| self.tree.query_selector(head, "title"))
            .and_then(|title| self.tree.text_content(title))
            .unwrap_or_default()
    }

    /// Get element by ID
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.tree.get_element_by_id(self.tree.root(), id)
    }

    /// Access the DOM tree
    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    /// Access the DOM tree mutably
    pub fn tree_mut(&mut self) -> &mut DomTree {
        &mut self.tree
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new("about:blank")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_document_skeleton() {
        let doc = Document::default();
        let html = doc.document_element().unwrap();
        assert!(doc.tree().is_tag(html, "html"));
        assert!(doc.doctype().is_some());

        let head = doc.head().unwrap();
        let body = doc.body().unwrap();
        assert_eq!(doc.tree().child_ids(html), vec![head, body]);
        assert_eq!(doc.url(), "about:blank");
    }

    #[test]
    fn test_empty_document() {
        let doc = Document::empty("test://page");
        assert_eq!(doc.document_element(), None);
        assert_eq!(doc.head(), None);
        assert_eq!(doc.title(), "");
    }

    #[test]
    fn test_title() {
        let mut doc = Document::default();
        let head = doc.head().unwrap();
        let tree = doc.tree_mut();
        let title = tree.create_element("title");
        let text = tree.create_text("Hello");
        tree.append_child(title, text).unwrap();
        tree.append_child(head, title).unwrap();

        assert_eq!(doc.title(), "Hello");
    }
}
