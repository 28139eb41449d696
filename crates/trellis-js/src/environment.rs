//! Global environment: the window and document a set of values lives in
//!
//! Each environment owns one shared document. Environments are independent
//! of each other, so tests and concurrent renders never share state.

use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};

use trellis_dom::{Document, NodeId, NodeKind};

use crate::handle::{SharedDocument, lock};
use crate::{Func, NodeHandle, Value};

/// DOM interfaces exposed as constructors on the window, for `instanceof`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interface {
    Node,
    Element,
    HtmlElement,
    Text,
    Comment,
    Document,
}

impl Interface {
    pub const ALL: [Interface; 6] = [
        Interface::Node,
        Interface::Element,
        Interface::HtmlElement,
        Interface::Text,
        Interface::Comment,
        Interface::Document,
    ];

    /// Global name of the constructor
    pub fn name(self) -> &'static str {
        match self {
            Interface::Node => "Node",
            Interface::Element => "Element",
            Interface::HtmlElement => "HTMLElement",
            Interface::Text => "Text",
            Interface::Comment => "Comment",
            Interface::Document => "Document",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|i| i.name() == name)
    }

    /// The constructor function. The same `Func` is returned every time so
    /// constructors compare equal.
    pub fn constructor(self) -> Func {
        static CONSTRUCTORS: OnceLock<Vec<Func>> = OnceLock::new();
        let all = CONSTRUCTORS.get_or_init(|| Self::ALL.into_iter().map(Func::interface).collect());
        all[self as usize].clone()
    }

    /// Whether a node of this kind is an instance of the interface
    pub fn matches(self, kind: NodeKind) -> bool {
        match self {
            Interface::Node => true,
            Interface::Element | Interface::HtmlElement => kind == NodeKind::Element,
            Interface::Text => kind == NodeKind::Text,
            Interface::Comment => kind == NodeKind::Comment,
            Interface::Document => kind == NodeKind::Document,
        }
    }
}

/// A window and its document
#[derive(Clone)]
pub struct Environment {
    document: SharedDocument,
}

impl Environment {
    /// Environment around an empty `<html><head><body>` document
    pub fn new() -> Self {
        Self::with_document(Document::default())
    }

    pub fn with_document(document: Document) -> Self {
        Self::from_shared(Arc::new(Mutex::new(document)))
    }

    /// Environment around parsed HTML
    pub fn from_html(html: &str) -> Self {
        Self::with_document(trellis_html::parse(html))
    }

    pub fn from_shared(document: SharedDocument) -> Self {
        Self { document }
    }

    /// `implementation.createHTMLDocument(title)`: a fresh, independent
    /// environment
    pub fn create_html_document(title: Option<&str>) -> Self {
        let mut document = Document::default();
        if let (Some(title), Some(head)) = (title, document.head()) {
            let tree = document.tree_mut();
            let el = tree.create_element("title");
            let text = tree.create_text(title);
            // Fresh elements under a fresh head; these cannot fail.
            let _ = tree.append_child(el, text);
            let _ = tree.append_child(head, el);
        }
        Self::with_document(document)
    }

    pub fn shared_document(&self) -> &SharedDocument {
        &self.document
    }

    /// The window object (`Global()`)
    pub fn global(&self) -> Value {
        Value::Window(self.clone())
    }

    /// The document node
    pub fn document(&self) -> Value {
        Value::Node(NodeHandle::new(self.document.clone(), NodeId::ROOT))
    }

    /// `document.implementation`
    pub fn implementation(&self) -> Value {
        Value::DocumentImplementation(self.clone())
    }

    /// Serialize the whole document
    pub fn to_html(&self) -> String {
        let doc = lock(&self.document);
        trellis_html::outer_html(doc.tree(), doc.root())
    }

    /// Both environments share one document
    pub fn same(&self, other: &Environment) -> bool {
        Arc::ptr_eq(&self.document, &other.document)
    }

    /// Property read on the window
    pub(crate) fn window_get(&self, prop: &str) -> Value {
        match prop {
            "document" => self.document(),
            "window" | "self" | "globalThis" => self.global(),
            _ => match Interface::from_name(prop) {
                Some(interface) => Value::Func(interface.constructor()),
                None => Value::Undefined,
            },
        }
    }

    /// Method call on `document.implementation`
    pub(crate) fn implementation_call(&self, method: &str, args: &[Value]) -> Value {
        match method {
            "createHTMLDocument" => {
                let title = args.first().filter(|v| !v.is_undefined()).map(Value::string);
                Self::create_html_document(title.as_deref()).document()
            }
            _ => {
                tracing::warn!(method, "unknown DOMImplementation method");
                Value::Undefined
            }
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment({:p})", Arc::as_ptr(&self.document))
    }
}
