//! HTML content-model correction
//!
//! Structural inserts made through [`ContentModel`] are re-routed the way a
//! browser's parser would place them instead of being rejected:
//!
//! 1. `<head>`/`<body>` inserted under `<html>` are merged into the existing
//!    head/body; any other element under `<html>` goes into `<body>`.
//! 2. Table rows and cells inserted into `<table>` get an implicit
//!    `<tbody>` (and `<tr>` for cells).
//! 3. Non-metadata content inserted into `<head>` goes into `<body>`.
//!
//! Rule 1 is evaluated first because it can change the target. After that
//! at most one of rules 2 and 3 applies.

use crate::{DomError, DomResult, DomTree, NodeData, NodeId, NodeKind};

/// Elements allowed to stay in `<head>`
pub const METADATA_TAGS: &[&str] = &[
    "base", "link", "meta", "noscript", "script", "style", "template", "title",
];

/// Elements that may be direct children of `<table>`
const TABLE_SECTION_TAGS: &[&str] = &["caption", "colgroup", "col", "thead", "tfoot", "tbody"];

/// The node an insertion lands under. Implicit wrappers are only created
/// once the insertion has been validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Node(NodeId),
    /// `<body>` of this `<html>`
    Body(NodeId),
    /// Last `<tbody>` of this `<table>`
    Tbody(NodeId),
    /// Last `<tr>` of the last `<tbody>` of this `<table>`
    Row(NodeId),
}

/// Where an insertion ends up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    /// Insert the child under this target
    Insert(Target),
    /// Move the child's attributes and children into this node
    Merge(NodeId),
    /// Install the child as the missing head/body of this `<html>`
    Adopt(NodeId, &'static str),
    /// The child already is the head/body it would merge into
    Unchanged,
}

/// Content-model aware insertion
pub trait ContentModel {
    /// `appendChild` with correction. Returns the node that ended up in the
    /// tree: the child itself, or the head/body it was merged into.
    fn append_corrected(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId>;

    /// `insertBefore` with correction. A re-routed insert keeps `reference`
    /// only when it is a child of the new target, else appends.
    fn insert_corrected(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<NodeId>;

    /// `replaceChild` with correction. When the new node is re-routed, the
    /// old child is removed and the new one inserted at the corrected target.
    /// Returns the old child.
    fn replace_corrected(&mut self, parent: NodeId, new: NodeId, old: NodeId)
    -> DomResult<NodeId>;
}

impl ContentModel for DomTree {
    fn append_corrected(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        self.insert_corrected(parent, child, None)
    }

    fn insert_corrected(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<NodeId> {
        let reference = reference.filter(|r| r.is_valid());
        self.ensure_insertable(parent, child, reference, None)?;
        let route = self.route(parent, child);
        self.apply(route, child, reference)
    }

    fn replace_corrected(
        &mut self,
        parent: NodeId,
        new: NodeId,
        old: NodeId,
    ) -> DomResult<NodeId> {
        self.kind(old).ok_or(DomError::NotFound(old))?;
        if self.parent(old) != Some(parent) {
            return Err(DomError::NotAChild { parent, child: old });
        }
        if new == old {
            return Ok(old);
        }
        self.ensure_insertable(parent, new, None, Some(old))?;

        match self.route(parent, new) {
            Route::Insert(Target::Node(target)) if target == parent => {
                self.replace_child(parent, new, old)
            }
            Route::Merge(target) if target == old => self.replace_child(parent, new, old),
            route => {
                // Targets resolve after `old` is gone, so replacing the
                // target itself gets a fresh one
                self.remove_child(parent, old)?;
                self.apply(route, new, None)?;
                Ok(old)
            }
        }
    }
}

impl DomTree {
    /// Decide where `child` goes without touching the tree
    fn route(&self, parent: NodeId, child: NodeId) -> Route {
        let child_tag = self.tag(child);

        // Rule 1: html auto-promotion
        if self.is_tag(parent, "html") {
            let section = match child_tag {
                Some("head") => "head",
                Some("body") => "body",
                Some(_) => {
                    tracing::trace!("redirecting element under <html> into <body>");
                    return Route::Insert(Target::Body(parent));
                }
                None => return Route::Insert(Target::Node(parent)),
            };
            return match self.find_child(parent, section) {
                Some(existing) if existing == child => Route::Unchanged,
                Some(existing) => {
                    tracing::trace!(tag = section, "merging into existing section");
                    Route::Merge(existing)
                }
                None => Route::Adopt(parent, section),
            };
        }

        // Rule 2: table content model
        if self.is_tag(parent, "table") {
            return match child_tag {
                Some(tag) if TABLE_SECTION_TAGS.contains(&tag) => Route::Insert(Target::Node(parent)),
                Some("tr") => Route::Insert(Target::Tbody(parent)),
                Some("td" | "th") => Route::Insert(Target::Row(parent)),
                _ => Route::Insert(Target::Node(parent)),
            };
        }

        // Rule 3: head content model
        if self.is_tag(parent, "head") && !self.is_metadata(child) {
            if let Some(html) = self.parent(parent).filter(|&p| self.is_tag(p, "html")) {
                tracing::trace!("redirecting non-metadata content out of <head>");
                return Route::Insert(Target::Body(html));
            }
        }

        Route::Insert(Target::Node(parent))
    }

    /// Carry out a validated route
    fn apply(&mut self, route: Route, child: NodeId, reference: Option<NodeId>) -> DomResult<NodeId> {
        match route {
            Route::Unchanged => Ok(child),
            Route::Adopt(html, section) => {
                self.adopt_section(html, child, section)?;
                Ok(child)
            }
            Route::Merge(target) => self.merge_into(target, child),
            Route::Insert(target) => {
                let target = self.resolve(target)?;
                let reference = reference.filter(|&r| self.parent(r) == Some(target));
                self.insert_before(target, child, reference)
            }
        }
    }

    /// Find or create the node a target names
    fn resolve(&mut self, target: Target) -> DomResult<NodeId> {
        match target {
            Target::Node(id) => Ok(id),
            Target::Body(html) => self.ensure_body(html),
            Target::Tbody(table) => self.ensure_tbody(table),
            Target::Row(table) => {
                let tbody = self.ensure_tbody(table)?;
                self.ensure_row(tbody)
            }
        }
    }

    /// True for content allowed to remain in `<head>`
    fn is_metadata(&self, id: NodeId) -> bool {
        match self.get(id).map(|n| &n.data) {
            Some(NodeData::Element(elem)) => METADATA_TAGS.contains(&elem.tag.as_str()),
            Some(NodeData::Text(text)) => text.trim().is_empty(),
            Some(NodeData::Comment(_)) => true,
            _ => false,
        }
    }

    /// Install `section` (a fresh head or body) as `html`'s only one, keeping
    /// head before body, then re-route any children it carried.
    fn adopt_section(&mut self, html: NodeId, section: NodeId, tag: &str) -> DomResult<()> {
        let reference = match tag {
            "head" => self.find_child(html, "body"),
            _ => None,
        };
        self.insert_before(html, section, reference)?;
        if tag == "head" {
            for child in self.child_ids(section) {
                if !self.is_metadata(child) {
                    let body = self.ensure_body(html)?;
                    self.append_child(body, child)?;
                }
            }
        }
        Ok(())
    }

    /// Merge `donor`'s attributes and children into `target`, then detach
    /// the emptied donor.
    fn merge_into(&mut self, target: NodeId, donor: NodeId) -> DomResult<NodeId> {
        let attrs = self.attributes(donor).to_vec();
        for attr in &attrs {
            self.set_attribute(target, &attr.name, &attr.value);
        }
        for child in self.child_ids(donor) {
            self.append_corrected(target, child)?;
        }
        self.detach(donor);
        Ok(target)
    }

    /// Existing `<head>` of `html`, created before `<body>` if absent
    pub fn ensure_head(&mut self, html: NodeId) -> DomResult<NodeId> {
        if let Some(head) = self.find_child(html, "head") {
            return Ok(head);
        }
        let head = self.create_element("head");
        let body = self.find_child(html, "body");
        self.insert_before(html, head, body)
    }

    /// Existing `<body>` of `html`, appended if absent
    pub fn ensure_body(&mut self, html: NodeId) -> DomResult<NodeId> {
        if let Some(body) = self.find_child(html, "body") {
            return Ok(body);
        }
        let body = self.create_element("body");
        self.append_child(html, body)
    }

    fn ensure_tbody(&mut self, table: NodeId) -> DomResult<NodeId> {
        if let Some(tbody) = self.find_last_child(table, "tbody") {
            return Ok(tbody);
        }
        let tbody = self.create_element("tbody");
        self.append_child(table, tbody)
    }

    fn ensure_row(&mut self, tbody: NodeId) -> DomResult<NodeId> {
        if let Some(tr) = self.find_last_child(tbody, "tr") {
            return Ok(tr);
        }
        let tr = self.create_element("tr");
        self.append_child(tbody, tr)
    }

    /// `true` if the element holds only metadata content
    pub fn head_is_clean(&self, head: NodeId) -> bool {
        self.children(head)
            .all(|(id, n)| n.kind() != NodeKind::Element || self.is_metadata(id))
    }
}
