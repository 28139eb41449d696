//! Trellis HTML
//!
//! HTML5 parsing built on html5ever, and the innerHTML/outerHTML serializer
//! for the synthetic DOM.

mod parser;
mod serializer;

pub use parser::HtmlParser;
pub use serializer::{HtmlSerializer, inner_html, outer_html};

use trellis_dom::{Document, DomTree, NodeId};

/// Parse an HTML string into a new document
pub fn parse(html: &str) -> Document {
    HtmlParser::new().parse(html)
}

/// Parse an HTML fragment as the children of a `context` element would be,
/// creating detached nodes in `tree`
pub fn parse_fragment(tree: &mut DomTree, context: &str, html: &str) -> Vec<NodeId> {
    HtmlParser::new().parse_fragment(tree, context, html)
}
