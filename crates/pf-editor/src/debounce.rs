//! Timer-based coalescing queue for document writes.
//!
//! A drag produces a patch per pointer move. Writing each one would flood
//! the document and the undo history, so patches are parked here keyed by
//! `(node, origin)`. A new patch for the same key merges into the parked one
//! and pushes its deadline out again (trailing debounce). The host's clock
//! drives flushing through [`PatchQueue::take_due`]; a gesture end pulls its
//! patch out early with [`PatchQueue::take`].
//!
//! Time is a `Duration` since an origin the host picks.

use pf_core::{NodeId, PropPatch};
use std::time::Duration;

/// Who queued a patch. Gesture patches carry a generation stamp, panel
/// writes do not, so the two are never merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatchOrigin {
    Resize,
    Panel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingPatch {
    pub id: NodeId,
    pub origin: PatchOrigin,
    pub patch: PropPatch,
    pub based_on: Option<u64>,
    pub deadline: Duration,
}

#[derive(Debug, Default)]
pub struct PatchQueue {
    /// Kept in first-enqueue order so flushes apply in arrival order.
    pending: Vec<PendingPatch>,
}

impl PatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park `patch` until `now + window`, merging into any patch already
    /// waiting for the same node and origin.
    pub fn push(
        &mut self,
        id: NodeId,
        origin: PatchOrigin,
        patch: PropPatch,
        based_on: Option<u64>,
        now: Duration,
        window: Duration,
    ) {
        let deadline = now + window;
        if let Some(existing) = self
            .pending
            .iter_mut()
            .find(|p| p.id == id && p.origin == origin)
        {
            existing.patch.merge(patch);
            existing.based_on = based_on;
            existing.deadline = deadline;
            log::trace!("coalesced patch for {id}, deadline {deadline:?}");
            return;
        }
        self.pending.push(PendingPatch {
            id,
            origin,
            patch,
            based_on,
            deadline,
        });
    }

    /// Remove and return every patch whose deadline has passed.
    pub fn take_due(&mut self, now: Duration) -> Vec<PendingPatch> {
        let (due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|p| p.deadline <= now);
        self.pending = waiting;
        due
    }

    /// Remove the patch for `(id, origin)` regardless of its deadline.
    pub fn take(&mut self, id: NodeId, origin: PatchOrigin) -> Option<PendingPatch> {
        let pos = self
            .pending
            .iter()
            .position(|p| p.id == id && p.origin == origin)?;
        Some(self.pending.remove(pos))
    }

    /// Remove everything, in arrival order.
    pub fn drain(&mut self) -> Vec<PendingPatch> {
        std::mem::take(&mut self.pending)
    }

    pub fn is_pending(&self, id: NodeId, origin: PatchOrigin) -> bool {
        self.pending.iter().any(|p| p.id == id && p.origin == origin)
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending.iter().map(|p| p.deadline).min()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
