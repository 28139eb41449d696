//! Trellis DOM - Synthetic Document Object Model
//!
//! Arena-based node tree used in place of a browser DOM when rendering on
//! the server. Structural inserts can be routed through [`ContentModel`],
//! which re-targets nodes the way a browser's parser would.

mod content_model;
mod document;
mod error;
mod node;
mod query;
mod tree;

pub use content_model::{ContentModel, METADATA_TAGS};
pub use document::Document;
pub use error::{DomError, DomResult};
pub use node::{Attribute, ElementData, Node, NodeData, NodeKind};
pub use query::{ElementQuery, Selector};
pub use tree::{Children, Descendants, DomTree};

/// Node identifier (index into the arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// The document node of every tree
    pub const ROOT: NodeId = NodeId(0);

    /// Sentinel for a missing link
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Check if this ID refers to a node
    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::NONE
    }

    /// Convert to `Option`, mapping [`NodeId::NONE`] to `None`
    #[inline]
    pub fn get(self) -> Option<NodeId> {
        self.is_valid().then_some(self)
    }

    /// Arena index
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}
