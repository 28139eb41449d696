//! Content-model correction tests for trellis-dom
//!
//! Exercises the corrector the way the host value layer drives it.

use trellis_dom::{ContentModel, Document, DomTree, ElementQuery, NodeId};

// ============================================================================
// REMOVAL INVARIANTS
// ============================================================================

#[test]
fn test_removed_node_is_fully_detached() {
    let mut doc = Document::default();
    let body = doc.body().unwrap();
    let tree = doc.tree_mut();

    let items: Vec<NodeId> = (0..5).map(|_| tree.create_element("li")).collect();
    for &item in &items {
        tree.append_child(body, item).unwrap();
    }

    for &item in &items {
        tree.remove_child(body, item).unwrap();
        assert_eq!(tree.parent(item), None);
        assert!(tree.children(body).all(|(id, _)| id != item));
        assert!(!tree.is_connected(item));
    }
    assert!(tree.child_ids(body).is_empty());
}

// ============================================================================
// HTML AUTO-PROMOTION
// ============================================================================

#[test]
fn test_two_heads_merge_into_one() {
    let mut doc = Document::default();
    let html = doc.document_element().unwrap();
    let head = doc.head().unwrap();
    let tree = doc.tree_mut();

    let first = tree.create_element("head");
    tree.set_attribute(first, "data-a", "1");
    let meta = tree.create_element("meta");
    tree.append_child(first, meta).unwrap();

    let second = tree.create_element("head");
    tree.set_attribute(second, "data-b", "2");
    let title = tree.create_element("title");
    tree.append_child(second, title).unwrap();

    tree.append_corrected(html, first).unwrap();
    tree.append_corrected(html, second).unwrap();

    let heads: Vec<_> = tree
        .element_children(html)
        .into_iter()
        .filter(|&id| tree.is_tag(id, "head"))
        .collect();
    assert_eq!(heads, vec![head]);
    assert_eq!(tree.get_attribute(head, "data-a"), Some("1"));
    assert_eq!(tree.get_attribute(head, "data-b"), Some("2"));
    assert_eq!(tree.child_ids(head), vec![meta, title]);
}

#[test]
fn test_body_merge_keeps_order() {
    let mut doc = Document::default();
    let html = doc.document_element().unwrap();
    let body = doc.body().unwrap();
    let tree = doc.tree_mut();

    let existing = tree.create_element("main");
    tree.append_child(body, existing).unwrap();

    let donor = tree.create_element("body");
    tree.set_attribute(donor, "class", "dark");
    let footer = tree.create_element("footer");
    tree.append_child(donor, footer).unwrap();

    let landed = tree.append_corrected(html, donor).unwrap();
    assert_eq!(landed, body);
    assert_eq!(tree.child_ids(body), vec![existing, footer]);
    assert_eq!(tree.get_attribute(body, "class"), Some("dark"));
}

#[test]
fn test_head_and_body_created_in_order() {
    let mut tree = DomTree::new();
    let html = tree.create_element("html");
    tree.append_child(tree.root(), html).unwrap();

    let body = tree.ensure_body(html).unwrap();
    let head = tree.ensure_head(html).unwrap();
    assert_eq!(tree.child_ids(html), vec![head, body]);
    assert_eq!(tree.ensure_head(html).unwrap(), head);
}

// ============================================================================
// TABLE CONTENT MODEL
// ============================================================================

#[test]
fn test_many_cells_one_row() {
    let mut tree = DomTree::new();
    let table = tree.create_element("table");

    let n = 12;
    let cells: Vec<_> = (0..n)
        .map(|i| {
            let tag = if i % 2 == 0 { "td" } else { "th" };
            tree.create_element(tag)
        })
        .collect();
    for &cell in &cells {
        tree.append_corrected(table, cell).unwrap();
    }

    assert_eq!(tree.query_selector_all(table, "tbody").len(), 1);
    assert_eq!(tree.query_selector_all(table, "tr").len(), 1);
    let tr = tree.query_selector(table, "tr").unwrap();
    assert_eq!(tree.child_ids(tr), cells);
}

#[test]
fn test_existing_tbody_reused() {
    let mut tree = DomTree::new();
    let table = tree.create_element("table");
    let tbody = tree.create_element("tbody");
    tree.append_corrected(table, tbody).unwrap();

    let tr = tree.create_element("tr");
    tree.append_corrected(table, tr).unwrap();
    assert_eq!(tree.parent(tr), Some(tbody));

    let td = tree.create_element("td");
    tree.append_corrected(table, td).unwrap();
    assert_eq!(tree.parent(td), Some(tr));
}

// ============================================================================
// HEAD CONTENT MODEL
// ============================================================================

#[test]
fn test_div_never_stays_in_head() {
    let mut doc = Document::default();
    let head = doc.head().unwrap();
    let body = doc.body().unwrap();
    let tree = doc.tree_mut();

    for tag in ["div", "p", "section", "span"] {
        let el = tree.create_element(tag);
        tree.append_corrected(head, el).unwrap();
        assert_eq!(tree.parent(el), Some(body), "{tag} should land in body");
    }
    let text = tree.create_text("visible");
    tree.append_corrected(head, text).unwrap();
    assert_eq!(tree.parent(text), Some(body));

    assert!(tree.head_is_clean(head));
}

#[test]
fn test_head_filter_creates_missing_body() {
    let mut tree = DomTree::new();
    let html = tree.create_element("html");
    let head = tree.create_element("head");
    tree.append_child(tree.root(), html).unwrap();
    tree.append_child(html, head).unwrap();

    let div = tree.create_element("div");
    tree.append_corrected(head, div).unwrap();

    let body = tree.find_child(html, "body").unwrap();
    assert_eq!(tree.parent(div), Some(body));
    assert_eq!(tree.child_ids(html), vec![head, body]);
}
