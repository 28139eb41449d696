//! HTML5 Parser implementation
//!
//! Uses html5ever's RcDom and converts the result into the arena tree.
//! Fragments are parsed by wrapping them in a document that puts them in the
//! right insertion mode for their context element, so `<tr>` parsed for a
//! `<table>` gets its implicit `<tbody>` just as a browser's would.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};
use trellis_dom::{Document, DomTree, NodeId};

/// HTML5 parser
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlParser;

impl HtmlParser {
    /// Create a new HTML parser
    pub fn new() -> Self {
        Self
    }

    /// Parse HTML string into a Document
    pub fn parse(&self, html: &str) -> Document {
        self.parse_with_url(html, "about:blank")
    }

    /// Parse HTML with a base URL
    pub fn parse_with_url(&self, html: &str, url: &str) -> Document {
        tracing::debug!("Parsing HTML document: {}", url);

        let dom = parse_document(RcDom::default(), Default::default()).one(html);

        let mut tree = DomTree::new();
        let root = tree.root();
        for child in dom.document.children.borrow().iter() {
            if let Some(id) = self.convert_node(child, &mut tree) {
                attach(&mut tree, root, id);
            }
        }

        tracing::debug!("Parsed {} nodes", tree.len());
        Document::from_tree(tree, url)
    }

    /// Parse a fragment for the given context element. The returned nodes
    /// are detached and in source order.
    pub fn parse_fragment(&self, tree: &mut DomTree, context: &str, html: &str) -> Vec<NodeId> {
        let (source, path) = wrap_fragment(context, html);
        let dom = parse_document(RcDom::default(), Default::default()).one(source);

        let Some(container) = find_path(&dom.document, path) else {
            tracing::debug!(context, "fragment context not found after parsing");
            return Vec::new();
        };

        let nodes: Vec<NodeId> = container
            .children
            .borrow()
            .iter()
            .filter_map(|child| self.convert_node(child, tree))
            .collect();
        tracing::debug!(context, count = nodes.len(), "Parsed fragment");
        nodes
    }

    /// Convert an RcDom node (and its subtree) into a detached arena node
    fn convert_node(&self, handle: &Handle, tree: &mut DomTree) -> Option<NodeId> {
        match &handle.data {
            RcNodeData::Document | RcNodeData::ProcessingInstruction { .. } => None,
            RcNodeData::Doctype { name, .. } => Some(tree.create_doctype(name)),
            RcNodeData::Text { contents } => Some(tree.create_text(&contents.borrow())),
            RcNodeData::Comment { contents } => Some(tree.create_comment(contents)),
            RcNodeData::Element {
                name,
                attrs,
                template_contents,
                ..
            } => {
                let id = tree.create_element(&name.local);
                for attr in attrs.borrow().iter() {
                    tree.set_attribute(id, &attr.name.local, &attr.value);
                }

                for child in handle.children.borrow().iter() {
                    if let Some(child_id) = self.convert_node(child, tree) {
                        attach(tree, id, child_id);
                    }
                }
                // Template contents live in a separate fragment; keep them as
                // ordinary children so they serialize back out.
                if let Some(contents) = template_contents.borrow().as_ref() {
                    for child in contents.children.borrow().iter() {
                        if let Some(child_id) = self.convert_node(child, tree) {
                            attach(tree, id, child_id);
                        }
                    }
                }
                Some(id)
            }
        }
    }
}

fn attach(tree: &mut DomTree, parent: NodeId, child: NodeId) {
    if let Err(err) = tree.append_child(parent, child) {
        tracing::debug!(%err, "dropping parsed node");
    }
}

/// Wrap a fragment so html5ever parses it in the insertion mode of the
/// context element. Returns the source and the element path to the context.
fn wrap_fragment(context: &str, html: &str) -> (String, &'static [&'static str]) {
    const HTML: &[&str] = &["html"];
    const HEAD: &[&str] = &["html", "head"];
    const BODY: &[&str] = &["html", "body"];
    const TABLE: &[&str] = &["html", "body", "table"];
    const TBODY: &[&str] = &["html", "body", "table", "tbody"];
    const THEAD: &[&str] = &["html", "body", "table", "thead"];
    const TFOOT: &[&str] = &["html", "body", "table", "tfoot"];
    const ROW: &[&str] = &["html", "body", "table", "tbody", "tr"];

    let in_body = |inner: String| format!("<!DOCTYPE html><html><head></head><body>{inner}</body></html>");
    match context {
        "html" => (format!("<!DOCTYPE html><html>{html}</html>"), HTML),
        "head" => (
            format!("<!DOCTYPE html><html><head>{html}</head><body></body></html>"),
            HEAD,
        ),
        "table" => (in_body(format!("<table>{html}</table>")), TABLE),
        "tbody" => (in_body(format!("<table><tbody>{html}</tbody></table>")), TBODY),
        "thead" => (in_body(format!("<table><thead>{html}</thead></table>")), THEAD),
        "tfoot" => (in_body(format!("<table><tfoot>{html}</tfoot></table>")), TFOOT),
        "tr" => (in_body(format!("<table><tbody><tr>{html}</tr></tbody></table>")), ROW),
        _ => (in_body(html.to_string()), BODY),
    }
}

/// Follow a path of element names down from `start`, taking the first
/// matching child at each level
fn find_path(start: &Handle, path: &[&str]) -> Option<Handle> {
    let mut current = start.clone();
    for &tag in path {
        let next = current
            .children
            .borrow()
            .iter()
            .find(|child| match &child.data {
                RcNodeData::Element { name, .. } => &*name.local == tag,
                _ => false,
            })
            .cloned()?;
        current = next;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_document() {
        let html = "<!DOCTYPE html><html><head><title>Test</title></head><body><p>Hello</p></body></html>";
        let doc = HtmlParser::new().parse(html);

        assert!(doc.doctype().is_some());
        assert_eq!(doc.title(), "Test");
        let body = doc.body().unwrap();
        assert_eq!(doc.tree().text_content(body).as_deref(), Some("Hello"));
    }

    #[test]
    fn test_parse_fragment_body_context() {
        let mut tree = DomTree::new();
        let nodes = HtmlParser::new().parse_fragment(&mut tree, "div", "a<b id=\"x\">b</b><!--c-->");

        assert_eq!(nodes.len(), 3);
        assert_eq!(tree.get(nodes[0]).unwrap().character_data(), Some("a"));
        assert!(tree.is_tag(nodes[1], "b"));
        assert_eq!(tree.get_attribute(nodes[1], "id"), Some("x"));
        assert_eq!(tree.parent(nodes[1]), None);
    }

    #[test]
    fn test_parse_fragment_table_context() {
        let mut tree = DomTree::new();
        let nodes = HtmlParser::new().parse_fragment(&mut tree, "table", "<tr><td>1</td></tr>");

        assert_eq!(nodes.len(), 1);
        assert!(tree.is_tag(nodes[0], "tbody"));
        let tr = tree.first_child(nodes[0]).unwrap();
        assert!(tree.is_tag(tr, "tr"));
    }

    #[test]
    fn test_parse_fragment_row_context() {
        let mut tree = DomTree::new();
        let nodes = HtmlParser::new().parse_fragment(&mut tree, "tr", "<td>a</td><td>b</td>");
        assert_eq!(nodes.len(), 2);
        assert!(nodes.iter().all(|&n| tree.is_tag(n, "td")));
    }

    #[test]
    fn test_parse_fragment_keeps_whitespace_text() {
        let mut tree = DomTree::new();
        let nodes = HtmlParser::new().parse_fragment(&mut tree, "p", "<i>a</i> <i>b</i>");
        assert_eq!(nodes.len(), 3);
        assert_eq!(tree.get(nodes[1]).unwrap().character_data(), Some(" "));
    }
}
