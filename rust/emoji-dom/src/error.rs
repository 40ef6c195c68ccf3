//! Error type shared by every fallible document operation

use thiserror::Error;

use crate::dom::NodeId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    #[error("node {0} does not exist")]
    NotFound(NodeId),

    #[error("node {0} is not an element")]
    NotAnElement(NodeId),

    #[error("node {0} is not connected to the document")]
    Detached(NodeId),

    #[error("node {0} is still attached to a parent")]
    Attached(NodeId),

    #[error("node {child} cannot be inserted under {parent}")]
    Hierarchy { parent: NodeId, child: NodeId },

    #[error("invalid selector `{0}`")]
    InvalidSelector(String),

    #[error("invalid observer options: {0}")]
    InvalidObserverInit(&'static str),

    #[error("document has been unloaded")]
    Unloaded,
}
