use crate::id::NodeId;
use thiserror::Error;

/// Failures building or editing the shape of a [`Document`](crate::Document).
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("invalid document JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("document has no root node")]
    NoRoot,

    #[error("document has more than one root: {0} and {1}")]
    MultipleRoots(String, String),

    #[error("node {node} references missing parent {parent}")]
    MissingParent { node: String, parent: String },

    #[error("node {0} is part of a parent cycle")]
    Cycle(String),

    #[error("node {0} already exists")]
    DuplicateId(NodeId),

    #[error("unknown node {0}")]
    UnknownNode(NodeId),
}

/// A prop patch the document refused to apply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// The node changed after the writer last looked at it.
    #[error("stale patch for {id}: based on generation {based_on}, node is at {current}")]
    Stale {
        id: NodeId,
        based_on: u64,
        current: u64,
    },
}
