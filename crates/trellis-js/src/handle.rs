//! Node handles shared between values

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use trellis_dom::{Document, NodeId};

/// A document shared by every value that points into it
pub type SharedDocument = Arc<Mutex<Document>>;

/// Lock a shared document. A poisoned lock still yields the document; the
/// tree is never left half-linked by a panicking caller.
pub(crate) fn lock(doc: &SharedDocument) -> MutexGuard<'_, Document> {
    doc.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A node of a shared document
#[derive(Clone)]
pub struct NodeHandle {
    doc: SharedDocument,
    id: NodeId,
}

impl NodeHandle {
    pub fn new(doc: SharedDocument, id: NodeId) -> Self {
        Self { doc, id }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn document(&self) -> &SharedDocument {
        &self.doc
    }

    /// Both handles point into the same document
    pub fn same_document(&self, other: &NodeHandle) -> bool {
        Arc::ptr_eq(&self.doc, &other.doc)
    }

    /// Another node of the same document
    pub(crate) fn sibling(&self, id: NodeId) -> NodeHandle {
        NodeHandle {
            doc: self.doc.clone(),
            id,
        }
    }

    /// Read the document under its lock
    pub fn with<R>(&self, f: impl FnOnce(&Document) -> R) -> R {
        f(&lock(&self.doc))
    }

    /// Mutate the document under its lock
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut Document) -> R) -> R {
        f(&mut lock(&self.doc))
    }
}

impl PartialEq for NodeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.same_document(other)
    }
}

impl Eq for NodeHandle {}

impl fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeHandle({:?} @ {:p})", self.id, Arc::as_ptr(&self.doc))
    }
}
