//! Read/write seam over the shared document.
//!
//! The resize engine is one of several writers (property panels and undo
//! are others). It only ever talks to the document through this trait.

use crate::error::PatchError;
use crate::id::NodeId;
use crate::model::{Document, DocumentNode, PropPatch};

pub trait DocumentAccess {
    fn node(&self, id: NodeId) -> Option<&DocumentNode>;

    fn parent_of(&self, id: NodeId) -> Option<NodeId>;

    fn is_root(&self, id: NodeId) -> bool;

    fn generation(&self, id: NodeId) -> Option<u64> {
        self.node(id).map(|n| n.generation)
    }

    /// The parent's node, if `id` has one.
    fn parent_node(&self, id: NodeId) -> Option<&DocumentNode> {
        self.parent_of(id).and_then(|p| self.node(p))
    }

    /// Apply `patch`; see [`Document::patch`] for the `based_on` contract.
    fn patch_node_props(
        &mut self,
        id: NodeId,
        patch: &PropPatch,
        based_on: Option<u64>,
    ) -> Result<u64, PatchError>;
}

impl DocumentAccess for Document {
    fn node(&self, id: NodeId) -> Option<&DocumentNode> {
        self.get(id)
    }

    fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id)
    }

    fn is_root(&self, id: NodeId) -> bool {
        self.index_of(id) == Some(self.root)
    }

    fn patch_node_props(
        &mut self,
        id: NodeId,
        patch: &PropPatch,
        based_on: Option<u64>,
    ) -> Result<u64, PatchError> {
        self.patch(id, patch, based_on)
    }
}
