use crate::tree::NodeId;

/// Misuse of a tree handle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("node {0} is no longer part of the model")]
    StaleNode(NodeId),
    #[error("node {0} has no parent")]
    NoParent(NodeId),
    #[error("row {row} is out of range for node {parent}")]
    RowOutOfRange { parent: NodeId, row: usize },
    #[error("node {0} is not a variable")]
    NotAVariable(NodeId),
}
