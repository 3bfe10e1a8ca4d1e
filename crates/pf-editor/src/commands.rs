//! Undo/Redo history of prop writes.
//!
//! Every committed patch is recorded together with the patch that restores
//! the props it overwrote. A resize gesture may reach the document several
//! times (one write per debounce window); those writes are grouped into a
//! batch so the whole gesture undoes in a single step. Another write to the
//! batched node first records what the batch has written so far, so history
//! keeps the order in which the writes actually landed.
//!
//! Undo and redo write without a generation stamp: they always win, and
//! they bump the node's generation like any other writer.

use pf_core::{DocumentAccess, NodeId, PatchError, PropPatch};

#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub node: NodeId,
    pub forward: PropPatch,
    pub inverse: PropPatch,
    pub description: String,
}

/// What an undo or redo touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub node: NodeId,
    pub description: String,
}

#[derive(Debug)]
struct Batch {
    node: NodeId,
    /// Values of the batched keys before the first write.
    before: PropPatch,
    /// Every batched write, merged.
    after: PropPatch,
    description: String,
}

impl Batch {
    /// One command for every write so far, unless they changed nothing
    /// overall.
    fn command(&self) -> Option<Command> {
        if self.after.is_empty() {
            return None;
        }
        let mut inverse = PropPatch::new();
        for (key, _) in self.after.iter() {
            inverse.insert(key, self.before.get(key).flatten().cloned());
        }
        (inverse != self.after).then(|| Command {
            node: self.node,
            forward: self.after.clone(),
            inverse,
            description: self.description.clone(),
        })
    }
}

#[derive(Debug)]
pub struct CommandStack {
    undo_stack: Vec<Command>,
    redo_stack: Vec<Command>,
    max_depth: usize,
    batch: Option<Batch>,
}

impl CommandStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: Vec::with_capacity(max_depth.min(64)),
            redo_stack: Vec::new(),
            max_depth,
            batch: None,
        }
    }

    /// Group writes made through [`execute_batched`](Self::execute_batched)
    /// until [`end_batch`](Self::end_batch). `before` holds the values to
    /// restore on undo.
    pub fn begin_batch(&mut self, node: NodeId, before: PropPatch, description: &str) {
        self.batch = Some(Batch {
            node,
            before,
            after: PropPatch::new(),
            description: description.to_string(),
        });
    }

    /// Close the open batch, recording one command if its writes changed
    /// anything overall.
    pub fn end_batch(&mut self) {
        if let Some(command) = self.batch.take().and_then(|b| b.command()) {
            self.push(command);
        }
    }

    /// Record the open batch's writes on `id` so far as their own step and
    /// keep the batch open from there.
    fn split_batch(&mut self, id: NodeId) {
        let Some(batch) = self.batch.as_mut().filter(|b| b.node == id) else {
            return;
        };
        let command = batch.command();
        let written = std::mem::take(&mut batch.after);
        batch.before.merge(written);
        if let Some(command) = command {
            log::trace!("splitting batch '{}' ahead of another write", command.description);
            self.push(command);
        }
    }

    pub fn in_batch(&self) -> bool {
        self.batch.is_some()
    }

    /// Apply `patch` and record it as its own undo step.
    pub fn execute(
        &mut self,
        doc: &mut impl DocumentAccess,
        id: NodeId,
        patch: &PropPatch,
        based_on: Option<u64>,
        description: &str,
    ) -> Result<u64, PatchError> {
        let inverse = doc
            .node(id)
            .map(|n| patch.inverse_against(&n.props))
            .ok_or(PatchError::UnknownNode(id))?;
        self.split_batch(id);
        let before = doc.generation(id);
        let generation = doc.patch_node_props(id, patch, based_on)?;
        if before != Some(generation) {
            self.push(Command {
                node: id,
                forward: patch.clone(),
                inverse,
                description: description.to_string(),
            });
        }
        Ok(generation)
    }

    /// Apply `patch` as part of the open batch. Without a batch on `id`
    /// this is [`execute`](Self::execute).
    pub fn execute_batched(
        &mut self,
        doc: &mut impl DocumentAccess,
        id: NodeId,
        patch: &PropPatch,
        based_on: Option<u64>,
    ) -> Result<u64, PatchError> {
        let Some(batch) = self.batch.as_mut().filter(|b| b.node == id) else {
            return self.execute(doc, id, patch, based_on, "edit");
        };
        let generation = doc.patch_node_props(id, patch, based_on)?;
        batch.after.merge(patch.clone());
        self.redo_stack.clear();
        Ok(generation)
    }

    fn push(&mut self, command: Command) {
        self.undo_stack.push(command);
        if self.undo_stack.len() > self.max_depth {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
    }

    pub fn undo(&mut self, doc: &mut impl DocumentAccess) -> Option<Applied> {
        if let Some(node) = self.batch.as_ref().map(|b| b.node) {
            self.split_batch(node);
        }
        let cmd = self.undo_stack.pop()?;
        if let Err(e) = doc.patch_node_props(cmd.node, &cmd.inverse, None) {
            log::warn!("dropping undo step '{}': {e}", cmd.description);
            return None;
        }
        let applied = Applied {
            node: cmd.node,
            description: cmd.description.clone(),
        };
        self.redo_stack.push(cmd);
        Some(applied)
    }

    pub fn redo(&mut self, doc: &mut impl DocumentAccess) -> Option<Applied> {
        let cmd = self.redo_stack.pop()?;
        if let Err(e) = doc.patch_node_props(cmd.node, &cmd.forward, None) {
            log::warn!("dropping redo step '{}': {e}", cmd.description);
            return None;
        }
        let applied = Applied {
            node: cmd.node,
            description: cmd.description.clone(),
        };
        self.undo_stack.push(cmd);
        Some(applied)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo_stack.is_empty()
    }
}
