//! DOM properties and methods of node values
//!
//! Every entry point takes the document lock once. Arguments are coerced
//! before locking because coercing a node value reads its own document.

use trellis_dom::{ContentModel, Document, DomTree, ElementQuery, NodeData, NodeId, NodeKind};
use trellis_html::{inner_html, outer_html, parse_fragment};

use crate::handle::{NodeHandle, lock};
use crate::value::UNDEFINED;
use crate::{Environment, HostError, StringMap, Value};

/// Elements whose content is text, never markup
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// String properties reflecting an attribute
const STRING_ATTRIBUTES: &[(&str, &str)] = &[
    ("id", "id"),
    ("className", "class"),
    ("title", "title"),
    ("lang", "lang"),
    ("dir", "dir"),
    ("href", "href"),
    ("src", "src"),
    ("alt", "alt"),
    ("type", "type"),
    ("name", "name"),
    ("value", "value"),
    ("placeholder", "placeholder"),
    ("rel", "rel"),
    ("target", "target"),
    ("htmlFor", "for"),
    ("role", "role"),
];

/// Boolean properties reflecting the presence of an attribute
const BOOLEAN_ATTRIBUTES: &[(&str, &str)] = &[
    ("hidden", "hidden"),
    ("disabled", "disabled"),
    ("checked", "checked"),
    ("readOnly", "readonly"),
    ("required", "required"),
    ("selected", "selected"),
    ("multiple", "multiple"),
    ("autofocus", "autofocus"),
];

#[derive(Debug, Clone, Copy)]
enum Reflected {
    Str(&'static str),
    Bool(&'static str),
    TabIndex,
}

fn reflected(prop: &str) -> Option<Reflected> {
    if prop == "tabIndex" {
        return Some(Reflected::TabIndex);
    }
    let lookup = |table: &[(&str, &'static str)]| {
        table
            .iter()
            .find(|(p, _)| *p == prop)
            .map(|&(_, attr)| attr)
    };
    lookup(STRING_ATTRIBUTES)
        .map(Reflected::Str)
        .or_else(|| lookup(BOOLEAN_ATTRIBUTES).map(Reflected::Bool))
}

// ============================================================================
// Reads
// ============================================================================

pub(crate) fn get(handle: &NodeHandle, prop: &str) -> Value {
    let doc = lock(handle.document());
    let tree = doc.tree();
    let id = handle.id();
    let Some(kind) = tree.kind(id) else {
        return Value::Undefined;
    };

    let node = |id: Option<NodeId>| Value::from(id.map(|id| handle.sibling(id)));
    let list = |ids: Vec<NodeId>| Value::NodeList(ids.into_iter().map(|id| handle.sibling(id)).collect());

    if kind == NodeKind::Document {
        let env = || Environment::from_shared(handle.document().clone());
        match prop {
            "documentElement" => return node(doc.document_element()),
            "head" => return node(doc.head()),
            "body" => return node(doc.body()),
            "title" => return Value::Str(doc.title()),
            "implementation" => return env().implementation(),
            "defaultView" => return env().global(),
            _ => {}
        }
    }

    if kind == NodeKind::Element {
        match reflected(prop) {
            Some(Reflected::Str(attr)) => {
                return Value::from(tree.get_attribute(id, attr).unwrap_or_default());
            }
            Some(Reflected::Bool(attr)) => return Value::Bool(tree.has_attribute(id, attr)),
            Some(Reflected::TabIndex) => {
                let index = tree
                    .get_attribute(id, "tabindex")
                    .and_then(|v| v.trim().parse::<i32>().ok())
                    .unwrap_or(-1);
                return Value::from(index);
            }
            None => {}
        }
    }

    match prop {
        "children" => list(tree.element_children(id)),
        "childNodes" => list(tree.child_ids(id)),
        "childElementCount" => Value::from(tree.element_children(id).len()),
        "attributes" => Value::StringMap(
            tree.attributes(id)
                .iter()
                .map(|a| (a.name.as_str(), a.value.as_str()))
                .collect::<StringMap>(),
        ),
        "tagName" => tree
            .tag(id)
            .map_or(Value::Undefined, |tag| Value::Str(tag.to_ascii_uppercase())),
        "localName" => tree.tag(id).map_or(Value::Null, Value::from),
        "nodeName" => Value::Str(node_name(tree, id)),
        "nodeType" => Value::Number(f64::from(kind.node_type())),
        "nodeValue" => character_data(tree, id).map_or(Value::Null, Value::from),
        "data" => character_data(tree, id).map_or(Value::Undefined, Value::from),
        "parentNode" => node(tree.parent(id)),
        "parentElement" => node(tree.parent(id).filter(|&p| tree.is_element(p))),
        "firstChild" => node(tree.first_child(id)),
        "lastChild" => node(tree.last_child(id)),
        "nextSibling" => node(tree.next_sibling(id)),
        "previousSibling" => node(tree.prev_sibling(id)),
        "firstElementChild" => node(tree.first_element_child(id)),
        "lastElementChild" => node(tree.last_element_child(id)),
        "nextElementSibling" => node(tree.next_element_sibling(id)),
        "previousElementSibling" => node(tree.previous_element_sibling(id)),
        "textContent" => tree.text_content(id).map_or(Value::Null, Value::Str),
        "innerText" if kind == NodeKind::Element => {
            Value::Str(tree.text_content(id).unwrap_or_default())
        }
        "innerHTML" if matches!(kind, NodeKind::Element | NodeKind::Document) => {
            Value::Str(inner_html(tree, id))
        }
        "outerHTML" if kind == NodeKind::Element => Value::Str(outer_html(tree, id)),
        "isConnected" => Value::Bool(tree.is_connected(id)),
        "ownerDocument" if kind == NodeKind::Document => Value::Null,
        "ownerDocument" => node(Some(tree.root())),
        _ => Value::Undefined,
    }
}

fn character_data(tree: &DomTree, id: NodeId) -> Option<&str> {
    tree.get(id)?.character_data()
}

fn node_name(tree: &DomTree, id: NodeId) -> String {
    match tree.get(id).map(|n| &n.data) {
        Some(NodeData::Element(elem)) => elem.tag.to_ascii_uppercase(),
        Some(NodeData::Text(_)) => "#text".to_string(),
        Some(NodeData::Comment(_)) => "#comment".to_string(),
        Some(NodeData::Document) => "#document".to_string(),
        Some(NodeData::Doctype { name }) => name.clone(),
        None => String::new(),
    }
}

/// `String(node)`
pub(crate) fn object_name(handle: &NodeHandle) -> String {
    let kind = handle.with(|doc| doc.tree().kind(handle.id()));
    let name = match kind {
        Some(NodeKind::Element) => "HTMLElement",
        Some(NodeKind::Text) => "Text",
        Some(NodeKind::Comment) => "Comment",
        Some(NodeKind::Document) => "HTMLDocument",
        Some(NodeKind::Doctype) => "DocumentType",
        None => "Node",
    };
    format!("[object {name}]")
}

// ============================================================================
// Writes
// ============================================================================

pub(crate) fn set(handle: &NodeHandle, prop: &str, value: &Value) {
    let text = value.string();
    let content = if value.is_null() { String::new() } else { text.clone() };
    let truthy = value.truthy();
    let int = value.int();

    let mut doc = lock(handle.document());
    let id = handle.id();
    let Some(kind) = doc.tree().kind(id) else {
        return;
    };

    if kind == NodeKind::Document && prop == "title" {
        set_title(&mut doc, &text);
        return;
    }

    let tree = doc.tree_mut();
    if kind == NodeKind::Element {
        match reflected(prop) {
            Some(Reflected::Str(attr)) => {
                tree.set_attribute(id, attr, &text);
                return;
            }
            Some(Reflected::Bool(attr)) => {
                if truthy {
                    tree.set_attribute(id, attr, "");
                } else {
                    tree.remove_attribute(id, attr);
                }
                return;
            }
            Some(Reflected::TabIndex) => {
                tree.set_attribute(id, "tabindex", &int.to_string());
                return;
            }
            None => {}
        }
    }

    match prop {
        "textContent" | "innerText" => match kind {
            NodeKind::Text | NodeKind::Comment => {
                tree.set_character_data(id, &content);
            }
            NodeKind::Element => replace_with_text(tree, id, &content),
            _ => {}
        },
        "nodeValue" | "data" => {
            tree.set_character_data(id, &content);
        }
        "innerHTML" if kind == NodeKind::Element => set_inner_html(tree, id, &content),
        "outerHTML" if kind == NodeKind::Element => set_outer_html(tree, id, &content),
        _ => tracing::trace!(prop, "ignoring write to unknown node property"),
    }
}

pub(crate) fn delete(handle: &NodeHandle, prop: &str) {
    let attr = match reflected(prop) {
        Some(Reflected::Str(attr) | Reflected::Bool(attr)) => attr,
        Some(Reflected::TabIndex) => "tabindex",
        None => return,
    };
    handle.with_mut(|doc| doc.tree_mut().remove_attribute(handle.id(), attr));
}

fn attach(tree: &mut DomTree, parent: NodeId, child: NodeId) {
    if let Err(err) = tree.append_child(parent, child) {
        tracing::warn!(%err, "dropping node that cannot be attached");
    }
}

fn replace_with_text(tree: &mut DomTree, id: NodeId, text: &str) {
    tree.remove_all_children(id);
    if !text.is_empty() {
        let node = tree.create_text(text);
        attach(tree, id, node);
    }
}

fn set_inner_html(tree: &mut DomTree, id: NodeId, html: &str) {
    let tag = tree.tag(id).unwrap_or("body").to_string();
    if RAW_TEXT_ELEMENTS.contains(&tag.as_str()) {
        replace_with_text(tree, id, html);
        return;
    }
    tree.remove_all_children(id);
    for node in parse_fragment(tree, &tag, html) {
        attach(tree, id, node);
    }
}

fn set_outer_html(tree: &mut DomTree, id: NodeId, html: &str) {
    let Some(parent) = tree.parent(id) else {
        tracing::warn!(
            node = ?id,
            "outerHTML set on a node without a parent; replacing its children instead"
        );
        set_inner_html(tree, id, html);
        return;
    };

    if tree.kind(parent) == Some(NodeKind::Document) {
        tracing::warn!(node = ?id, "outerHTML cannot replace the document element; ignoring");
        return;
    }

    let context = tree.tag(parent).unwrap_or("body").to_string();
    let nodes = parse_fragment(tree, &context, html);
    let mut spliced = nodes.is_empty();
    for node in nodes {
        match tree.insert_before(parent, node, Some(id)) {
            Ok(_) => spliced = true,
            Err(err) => tracing::warn!(%err, "dropping outerHTML node that cannot be inserted"),
        }
    }
    if spliced {
        tree.detach(id);
    }
}

fn set_title(doc: &mut Document, title: &str) {
    let Some(head) = doc.head() else {
        tracing::debug!("document has no <head>; title not set");
        return;
    };
    let tree = doc.tree_mut();
    let element = match tree.query_selector(head, "title") {
        Some(element) => element,
        None => {
            let element = tree.create_element("title");
            attach(tree, head, element);
            element
        }
    };
    replace_with_text(tree, element, title);
}

// ============================================================================
// Methods
// ============================================================================

/// Argument to `append`/`prepend`/`replaceWith`
enum Insert {
    Node(NodeId),
    Text(String),
}

fn arg(args: &[Value], i: usize) -> &Value {
    args.get(i).unwrap_or(&UNDEFINED)
}

/// A node argument of the receiver's document
fn node_arg(handle: &NodeHandle, method: &str, args: &[Value], i: usize) -> Result<NodeId, HostError> {
    match args.get(i) {
        Some(Value::Node(node)) if node.same_document(handle) => Ok(node.id()),
        Some(Value::Node(_)) => Err(HostError::WrongDocument),
        _ => Err(HostError::NotANode {
            method: method.to_string(),
            index: i,
        }),
    }
}

/// Like [`node_arg`], with `null`/`undefined` meaning "none"
fn optional_node_arg(
    handle: &NodeHandle,
    method: &str,
    args: &[Value],
    i: usize,
) -> Result<Option<NodeId>, HostError> {
    match arg(args, i) {
        Value::Null | Value::Undefined => Ok(None),
        _ => node_arg(handle, method, args, i).map(Some),
    }
}

fn inserts(handle: &NodeHandle, args: &[Value]) -> Result<Vec<Insert>, HostError> {
    args.iter()
        .map(|value| match value {
            Value::Node(node) if node.same_document(handle) => Ok(Insert::Node(node.id())),
            Value::Node(_) => Err(HostError::WrongDocument),
            other => Ok(Insert::Text(other.string())),
        })
        .collect()
}

fn materialize(tree: &mut DomTree, insert: Insert) -> NodeId {
    match insert {
        Insert::Node(id) => id,
        Insert::Text(text) => tree.create_text(&text),
    }
}

pub(crate) fn call(handle: &NodeHandle, method: &str, args: &[Value]) -> Result<Value, HostError> {
    let id = handle.id();
    let node = |id: NodeId| Value::Node(handle.sibling(id));

    match method {
        // --- Tree mutation (through the content-model corrector) ---
        "appendChild" => {
            let child = node_arg(handle, method, args, 0)?;
            handle.with_mut(|doc| doc.tree_mut().append_corrected(id, child))?;
            Ok(node(child))
        }
        "insertBefore" => {
            let child = node_arg(handle, method, args, 0)?;
            let reference = optional_node_arg(handle, method, args, 1)?;
            handle.with_mut(|doc| doc.tree_mut().insert_corrected(id, child, reference))?;
            Ok(node(child))
        }
        "removeChild" => {
            let child = node_arg(handle, method, args, 0)?;
            handle.with_mut(|doc| doc.tree_mut().remove_child(id, child))?;
            Ok(node(child))
        }
        "replaceChild" => {
            let new = node_arg(handle, method, args, 0)?;
            let old = node_arg(handle, method, args, 1)?;
            handle.with_mut(|doc| doc.tree_mut().replace_corrected(id, new, old))?;
            Ok(node(old))
        }
        "append" => {
            let items = inserts(handle, args)?;
            handle.with_mut(|doc| {
                let tree = doc.tree_mut();
                for item in items {
                    let child = materialize(tree, item);
                    tree.append_corrected(id, child)?;
                }
                Ok::<_, HostError>(())
            })?;
            Ok(Value::Undefined)
        }
        "prepend" => {
            let items = inserts(handle, args)?;
            handle.with_mut(|doc| {
                let tree = doc.tree_mut();
                let reference = tree.first_child(id);
                for item in items {
                    let child = materialize(tree, item);
                    tree.insert_corrected(id, child, reference)?;
                }
                Ok::<_, HostError>(())
            })?;
            Ok(Value::Undefined)
        }
        "replaceWith" => {
            let items = inserts(handle, args)?;
            handle.with_mut(|doc| {
                let tree = doc.tree_mut();
                let Some(parent) = tree.parent(id) else {
                    return Ok(());
                };
                let mut keeps_self = false;
                for item in items {
                    let child = materialize(tree, item);
                    keeps_self |= child == id;
                    tree.insert_corrected(parent, child, Some(id))?;
                }
                if !keeps_self && tree.parent(id) == Some(parent) {
                    tree.remove_child(parent, id)?;
                }
                Ok::<_, HostError>(())
            })?;
            Ok(Value::Undefined)
        }
        "remove" => {
            handle.with_mut(|doc| doc.tree_mut().detach(id));
            Ok(Value::Undefined)
        }
        "cloneNode" => {
            let deep = arg(args, 0).truthy();
            clone_node(handle, deep)
        }

        // --- Factories ---
        "createElement" | "createTextNode" | "createComment" => {
            let text = arg(args, 0).string();
            handle.with_mut(|doc| {
                if doc.tree().kind(id) != Some(NodeKind::Document) {
                    tracing::warn!(method, "factory called on a non-document node");
                    return Ok(Value::Undefined);
                }
                let tree = doc.tree_mut();
                let created = match method {
                    "createElement" => tree.create_element(&text.to_ascii_lowercase()),
                    "createTextNode" => tree.create_text(&text),
                    _ => tree.create_comment(&text),
                };
                Ok(node(created))
            })
        }

        // --- Attributes ---
        "getAttribute" => {
            let name = arg(args, 0).string();
            Ok(handle.with(|doc| {
                doc.tree()
                    .get_attribute(id, &name)
                    .map_or(Value::Null, Value::from)
            }))
        }
        "setAttribute" => {
            let name = arg(args, 0).string();
            let value = arg(args, 1).string();
            handle.with_mut(|doc| doc.tree_mut().set_attribute(id, &name, &value));
            Ok(Value::Undefined)
        }
        "removeAttribute" => {
            let name = arg(args, 0).string();
            handle.with_mut(|doc| doc.tree_mut().remove_attribute(id, &name));
            Ok(Value::Undefined)
        }
        "hasAttribute" => {
            let name = arg(args, 0).string();
            Ok(Value::Bool(handle.with(|doc| doc.tree().has_attribute(id, &name))))
        }
        "getAttributeNames" => Ok(handle.with(|doc| {
            Value::Array(
                doc.tree()
                    .attributes(id)
                    .iter()
                    .map(|a| Value::from(a.name.as_str()))
                    .collect(),
            )
        })),

        // --- Queries ---
        "getElementById" => {
            let target = arg(args, 0).string();
            let found = handle.with(|doc| doc.tree().get_element_by_id(id, &target));
            Ok(Value::from(found.map(|found| handle.sibling(found))))
        }
        "querySelector" => {
            let selector = arg(args, 0).string();
            let found = handle.with(|doc| doc.tree().query_selector(id, &selector));
            Ok(Value::from(found.map(|found| handle.sibling(found))))
        }
        "querySelectorAll" => {
            let selector = arg(args, 0).string();
            let found = handle.with(|doc| doc.tree().query_selector_all(id, &selector));
            Ok(Value::NodeList(found.into_iter().map(|n| handle.sibling(n)).collect()))
        }
        "hasChildNodes" => Ok(Value::Bool(
            handle.with(|doc| doc.tree().first_child(id).is_some()),
        )),
        "contains" => {
            let other = match arg(args, 0) {
                Value::Node(other) if other.same_document(handle) => other.id(),
                _ => return Ok(Value::Bool(false)),
            };
            Ok(Value::Bool(handle.with(|doc| doc.tree().contains(id, other))))
        }

        _ => {
            tracing::warn!(method, "unknown node method");
            Ok(Value::Undefined)
        }
    }
}

/// `cloneNode`. Cloning a document node yields an independent document.
fn clone_node(handle: &NodeHandle, deep: bool) -> Result<Value, HostError> {
    let id = handle.id();
    let mut doc = lock(handle.document());
    if doc.tree().kind(id) == Some(NodeKind::Document) {
        let copy = if deep {
            Document::from_tree(doc.tree().clone(), doc.url())
        } else {
            Document::empty(doc.url())
        };
        drop(doc);
        return Ok(Environment::with_document(copy).document());
    }
    let copy = doc.tree_mut().clone_node(id, deep)?;
    Ok(Value::Node(handle.sibling(copy)))
}
