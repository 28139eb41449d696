//! Host value errors

use trellis_dom::DomError;

/// Errors raised by DOM calls made through [`crate::Value::try_call`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error(transparent)]
    Dom(#[from] DomError),

    /// A node of one document was passed to a method of another
    #[error("wrong document: node belongs to a different document")]
    WrongDocument,

    /// A method expected a node argument
    #[error("{method}: argument {index} is not a node")]
    NotANode { method: String, index: usize },
}
