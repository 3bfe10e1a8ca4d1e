//! Editor session: the single entry point hosts talk to.
//!
//! Owns the document together with everything that reads or writes it
//! interactively: the resize controller, the debounced patch queue, the
//! layout listener, undo history, selection, and the working (rendered)
//! pixel size of each mounted node.
//!
//! The host drives time. Pointer handlers call [`begin_resize`],
//! [`pointer_move`] and [`end_resize`]; an animation-frame loop calls
//! [`tick`], which commits due patches and runs pending recomputes.
//!
//! [`begin_resize`]: EditorSession::begin_resize
//! [`pointer_move`]: EditorSession::pointer_move
//! [`end_resize`]: EditorSession::end_resize
//! [`tick`]: EditorSession::tick

use crate::commands::{Applied, CommandStack};
use crate::config::EditorConfig;
use crate::debounce::{PatchOrigin, PatchQueue, PendingPatch};
use crate::handles::{Handle, HandleSet, Indicator, handles_for};
use crate::recompute::{LayoutListener, Subscription, resolve_working_size};
use crate::resize::{GestureError, GestureSession, Point, ResizeController, ResizeStep};
use pf_core::{
    Document, DocumentAccess, LayoutProbe, NodeId, PatchError, PropKeys, PropPatch, Size,
    element_box, get_element_dimensions,
};
use serde::Serialize;
use smallvec::SmallVec;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

#[derive(Debug)]
struct Mounted {
    keys: PropKeys,
    subscription: Subscription,
}

/// What a [`tick`](EditorSession::tick) did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TickReport {
    /// Nodes whose queued patch reached the document.
    pub committed: Vec<NodeId>,
    /// Nodes whose queued patch was refused as stale.
    pub rejected: Vec<NodeId>,
    /// Nodes whose working size was re-derived.
    pub recomputed: Vec<NodeId>,
}

impl TickReport {
    pub fn is_empty(&self) -> bool {
        self.committed.is_empty() && self.rejected.is_empty() && self.recomputed.is_empty()
    }
}

#[derive(Debug)]
pub struct EditorSession {
    document: Document,
    config: EditorConfig,
    controller: ResizeController,
    queue: PatchQueue,
    listener: LayoutListener,
    history: CommandStack,
    mounted: HashMap<NodeId, Mounted>,
    working: HashMap<NodeId, Size>,
    /// Mounted nodes whose committed size changed since their working size
    /// was last derived.
    dirty: BTreeSet<NodeId>,
    selected: Option<NodeId>,
    /// Outcomes of queued patches flushed outside `tick`, reported by the
    /// next one.
    carried: TickReport,
}

impl EditorSession {
    pub fn new(document: Document, config: EditorConfig) -> Self {
        Self {
            controller: ResizeController::new(config.precision),
            history: CommandStack::new(config.history_depth),
            document,
            config,
            queue: PatchQueue::new(),
            listener: LayoutListener::new(),
            mounted: HashMap::new(),
            working: HashMap::new(),
            dirty: BTreeSet::new(),
            selected: None,
            carried: TickReport::default(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    // ─── Mounting ────────────────────────────────────────────────────────

    /// A renderer for `id` appeared. Subscribes it to layout changes and
    /// derives its working size. Returns false for unknown nodes.
    pub fn mount(&mut self, id: NodeId, keys: PropKeys, probe: &impl LayoutProbe) -> bool {
        if !self.document.contains(id) {
            return false;
        }
        let subscription = self.listener.subscribe(id);
        if let Some(old) = self.mounted.insert(id, Mounted { keys, subscription }) {
            self.listener.unsubscribe(old.subscription);
        }
        self.recompute(id, probe);
        log::debug!("mounted {id}");
        true
    }

    /// The renderer for `id` went away. A gesture on it is dropped.
    pub fn unmount(&mut self, id: NodeId) -> bool {
        let Some(mounted) = self.mounted.remove(&id) else {
            return false;
        };
        self.listener.unsubscribe(mounted.subscription);
        if self.controller.session().is_some_and(|s| s.target == id) {
            self.drop_gesture(id);
        }
        self.working.remove(&id);
        self.dirty.remove(&id);
        log::debug!("unmounted {id}");
        true
    }

    pub fn is_mounted(&self, id: NodeId) -> bool {
        self.mounted.contains_key(&id)
    }

    /// Pixel size the renderer should draw `id` at.
    pub fn working_size(&self, id: NodeId) -> Option<Size> {
        self.working.get(&id).copied()
    }

    // ─── Selection & handles ─────────────────────────────────────────────

    pub fn select(&mut self, id: NodeId) -> bool {
        if !self.document.contains(id) {
            return false;
        }
        self.selected = Some(id);
        true
    }

    pub fn deselect(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    pub fn handles(&self, id: NodeId) -> HandleSet {
        handles_for(&self.document, id, self.selected == Some(id))
    }

    pub fn indicators(&self, id: NodeId) -> SmallVec<[Indicator; 8]> {
        self.handles(id).indicators()
    }

    // ─── Resize gesture ──────────────────────────────────────────────────

    pub fn is_resizing(&self) -> bool {
        !self.controller.is_idle()
    }

    pub fn gesture(&self) -> Option<&GestureSession> {
        self.controller.session()
    }

    /// Pointer down on one of `id`'s handles. Returns the starting working
    /// size.
    pub fn begin_resize(
        &mut self,
        id: NodeId,
        handle: Handle,
        pointer: Point,
        probe: &impl LayoutProbe,
    ) -> Result<Size, GestureError> {
        let keys = self
            .mounted
            .get(&id)
            .map(|m| m.keys.clone())
            .unwrap_or_default();
        let parent_keys = self
            .document
            .parent(id)
            .and_then(|p| self.mounted.get(&p))
            .map(|m| m.keys.clone())
            .unwrap_or_default();
        let enabled = self.handles(id);
        let live = self.controller.begin(
            &self.document,
            probe,
            id,
            handle,
            keys,
            &parent_keys,
            pointer,
            enabled,
        )?;
        let start_props = self
            .controller
            .session()
            .map(|s| s.start_props.clone())
            .unwrap_or_default();
        self.history
            .begin_batch(id, start_props, &format!("Resize {id}"));
        self.working.insert(id, live);
        Ok(live)
    }

    /// Pointer moved during a gesture. The working size updates at once;
    /// the document write waits in the debounce queue.
    pub fn pointer_move(
        &mut self,
        pointer: Point,
        now: Duration,
        probe: &impl LayoutProbe,
    ) -> Result<ResizeStep, GestureError> {
        let step = match self.controller.update(&self.document, pointer) {
            Ok(step) => step,
            Err(GestureError::Stale(id)) => {
                self.drop_gesture(id);
                self.refresh_dirty(probe);
                return Err(GestureError::Stale(id));
            }
            Err(e) => return Err(e),
        };
        self.queue.push(
            step.target,
            PatchOrigin::Resize,
            step.patch.clone(),
            Some(step.based_on),
            now,
            self.config.commit_debounce(),
        );
        self.working.insert(step.target, step.live);
        self.flush_due(now);
        Ok(step)
    }

    /// Pointer released. Commits the gesture's pending patch immediately
    /// and re-derives the node's working size from the committed value.
    /// Returns the node's generation afterwards.
    pub fn end_resize(
        &mut self,
        now: Duration,
        probe: &impl LayoutProbe,
    ) -> Result<u64, GestureError> {
        let target = self
            .controller
            .session()
            .map(|s| s.target)
            .ok_or(GestureError::NoActiveGesture)?;
        self.flush_due(now);
        if !self.controller.is_active() {
            // A due patch was refused and took the gesture with it.
            self.refresh_dirty(probe);
            return Err(GestureError::Stale(target));
        }

        let outcome = match self.queue.take(target, PatchOrigin::Resize) {
            Some(pending) => self.apply_pending(pending),
            None => self
                .document
                .generation(target)
                .ok_or(PatchError::UnknownNode(target)),
        };
        self.controller.finish();
        self.history.end_batch();
        self.controller.settle();
        self.dirty.insert(target);
        self.refresh_dirty(probe);
        log::debug!("resize of {target} ended");

        outcome.map_err(|e| match e {
            PatchError::UnknownNode(id) => GestureError::UnknownNode(id),
            PatchError::Stale { id, .. } => GestureError::Stale(id),
        })
    }

    /// Abandon the gesture. Anything it already committed is reverted to
    /// the props it started from.
    pub fn cancel_resize(&mut self, probe: &impl LayoutProbe) -> Result<(), GestureError> {
        let session = self
            .controller
            .abort()
            .ok_or(GestureError::NoActiveGesture)?;
        let target = session.target;
        self.queue.take(target, PatchOrigin::Resize);
        if session.committed_any
            && let Err(e) =
                self.history
                    .execute_batched(&mut self.document, target, &session.start_props, None)
        {
            log::warn!("could not restore {target} after cancel: {e}");
        }
        self.history.end_batch();
        self.dirty.insert(target);
        self.refresh_dirty(probe);
        log::debug!("resize of {target} cancelled");
        Ok(())
    }

    // ─── Layout changes ──────────────────────────────────────────────────

    /// The viewport or a container changed size.
    pub fn notify_layout_change(&mut self, now: Duration) {
        self.listener
            .notify(now, self.config.recompute_debounce());
    }

    /// Advance the session clock: commit due patches, then re-derive
    /// working sizes for a due layout change and for nodes whose committed
    /// size changed.
    pub fn tick(&mut self, now: Duration, probe: &impl LayoutProbe) -> TickReport {
        self.flush_due(now);
        let mut report = std::mem::take(&mut self.carried);

        if self.listener.poll(now) {
            let active = self.controller.active_target();
            for id in self.listener.subscribers() {
                if Some(id) == active {
                    continue;
                }
                if self.recompute(id, probe) {
                    self.dirty.remove(&id);
                    report.recomputed.push(id);
                }
            }
        }
        report.recomputed.extend(self.refresh_dirty(probe));
        if !report.is_empty() {
            log::trace!("tick at {now:?}: {report:?}");
        }
        report
    }

    /// Earliest time [`tick`](Self::tick) has work to do.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.queue.next_deadline()
    }

    // ─── Other writers ───────────────────────────────────────────────────

    /// Property-panel write. With `debounce` the patch waits in the queue;
    /// without it lands at once. Panel writes always win over a concurrent
    /// gesture.
    pub fn set_props(
        &mut self,
        id: NodeId,
        patch: PropPatch,
        debounce: Option<Duration>,
        now: Duration,
    ) -> Result<(), PatchError> {
        if !self.document.contains(id) {
            return Err(PatchError::UnknownNode(id));
        }
        match debounce {
            Some(window) => {
                self.queue
                    .push(id, PatchOrigin::Panel, patch, None, now, window);
            }
            None => {
                self.history
                    .execute(&mut self.document, id, &patch, None, "Edit props")?;
                self.dirty.insert(id);
            }
        }
        Ok(())
    }

    /// Commit everything still queued, regardless of deadlines.
    pub fn flush_pending(&mut self) -> Vec<NodeId> {
        let mut committed = Vec::new();
        for pending in self.queue.drain() {
            let id = pending.id;
            if self.apply_pending(pending).is_ok() {
                committed.push(id);
            }
        }
        committed
    }

    pub fn undo(&mut self) -> Option<Applied> {
        let applied = self.history.undo(&mut self.document)?;
        self.dirty.insert(applied.node);
        Some(applied)
    }

    pub fn redo(&mut self) -> Option<Applied> {
        let applied = self.history.redo(&mut self.document)?;
        self.dirty.insert(applied.node);
        Some(applied)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // ─── Internals ───────────────────────────────────────────────────────

    /// Commit every due patch, noting the outcomes for the next tick.
    fn flush_due(&mut self, now: Duration) {
        for pending in self.queue.take_due(now) {
            let id = pending.id;
            match self.apply_pending(pending) {
                Ok(_) => self.carried.committed.push(id),
                Err(PatchError::Stale { .. }) => self.carried.rejected.push(id),
                Err(PatchError::UnknownNode(_)) => {}
            }
        }
    }

    fn apply_pending(&mut self, pending: PendingPatch) -> Result<u64, PatchError> {
        let PendingPatch {
            id,
            origin,
            patch,
            mut based_on,
            ..
        } = pending;
        if origin == PatchOrigin::Resize && self.controller.active_target() == Some(id) {
            // Only a change to the gesture's own dimensions makes it stale.
            match self.controller.revalidate(&self.document) {
                Ok(generation) => based_on = Some(generation),
                Err(_) => {
                    let current = self.document.generation(id).unwrap_or_default();
                    log::debug!("resize patch for {id} refused: dimensions changed outside");
                    self.drop_gesture(id);
                    return Err(PatchError::Stale {
                        id,
                        based_on: based_on.unwrap_or_default(),
                        current,
                    });
                }
            }
        }
        let result = match origin {
            PatchOrigin::Resize => {
                self.history
                    .execute_batched(&mut self.document, id, &patch, based_on)
            }
            PatchOrigin::Panel => {
                self.history
                    .execute(&mut self.document, id, &patch, based_on, "Edit props")
            }
        };
        match &result {
            Ok(generation) => {
                log::trace!("committed {origin:?} patch for {id} at generation {generation}");
                if origin == PatchOrigin::Resize {
                    self.controller.committed(*generation, &patch);
                } else {
                    self.dirty.insert(id);
                }
            }
            Err(PatchError::Stale { .. }) => {
                log::debug!("{origin:?} patch for {id} refused: {result:?}");
                if self.controller.session().is_some_and(|s| s.target == id) {
                    self.drop_gesture(id);
                }
                self.dirty.insert(id);
            }
            Err(e) => log::warn!("dropping {origin:?} patch: {e}"),
        }
        result
    }

    /// Stop the active gesture on `id` without writing anything further.
    fn drop_gesture(&mut self, id: NodeId) {
        self.queue.take(id, PatchOrigin::Resize);
        self.controller.abort();
        self.history.end_batch();
        self.dirty.insert(id);
        log::debug!("dropped resize of {id}");
    }

    /// Re-derive working sizes of dirty nodes that are not mid-gesture.
    fn refresh_dirty(&mut self, probe: &impl LayoutProbe) -> Vec<NodeId> {
        let active = self.controller.active_target();
        let ready: Vec<NodeId> = self
            .dirty
            .iter()
            .copied()
            .filter(|id| Some(*id) != active)
            .collect();
        let mut refreshed = Vec::with_capacity(ready.len());
        for id in ready {
            self.dirty.remove(&id);
            if self.recompute(id, probe) {
                refreshed.push(id);
            }
        }
        refreshed
    }

    /// Working size from the committed props and the parent's current
    /// content box. Only mounted nodes have one.
    fn recompute(&mut self, id: NodeId, probe: &impl LayoutProbe) -> bool {
        let Some(mounted) = self.mounted.get(&id) else {
            return false;
        };
        let Some(node) = self.document.get(id) else {
            return false;
        };
        let reference = match self.document.parent(id) {
            Some(parent) => get_element_dimensions(probe, parent),
            None => element_box(probe, id),
        };
        let size = resolve_working_size(node, &mounted.keys, reference);
        self.working.insert(id, size);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pf_core::{DocumentNode, StaticLayout};
    use pretty_assertions::assert_eq;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn session() -> (EditorSession, StaticLayout) {
        let mut doc = Document::new();
        doc.add_node(
            NodeId::root(),
            DocumentNode::new(NodeId::intern("s_panel")).with_prop("width", "40%"),
        )
        .unwrap();
        let probe = StaticLayout::new()
            .with(NodeId::root(), 1000.0, 800.0)
            .with(NodeId::intern("s_panel"), 400.0, 100.0);
        (EditorSession::new(doc, EditorConfig::default()), probe)
    }

    #[test]
    fn mount_derives_working_size() {
        let (mut s, probe) = session();
        let id = NodeId::intern("s_panel");
        assert!(s.mount(id, PropKeys::default(), &probe));
        // Height is undeclared, so it fills the parent.
        assert_eq!(s.working_size(id), Some(Size::new(400.0, 800.0)));
        assert!(!s.mount(NodeId::intern("s_missing"), PropKeys::default(), &probe));
    }

    #[test]
    fn unmount_forgets_node() {
        let (mut s, probe) = session();
        let id = NodeId::intern("s_panel");
        s.mount(id, PropKeys::default(), &probe);
        assert!(s.unmount(id));
        assert_eq!(s.working_size(id), None);
        assert!(!s.unmount(id));
    }

    #[test]
    fn unselected_node_cannot_resize() {
        let (mut s, probe) = session();
        let id = NodeId::intern("s_panel");
        let err = s
            .begin_resize(id, Handle::Right, Point::default(), &probe)
            .unwrap_err();
        assert!(matches!(err, GestureError::HandleDisabled { .. }));
        assert!(!s.is_resizing());
    }

    #[test]
    fn immediate_panel_write_is_undoable() {
        let (mut s, probe) = session();
        let id = NodeId::intern("s_panel");
        s.mount(id, PropKeys::default(), &probe);
        s.set_props(id, PropPatch::new().set("width", "10%"), None, ms(0))
            .unwrap();
        s.tick(ms(0), &probe);
        assert_eq!(s.working_size(id).map(|sz| sz.width), Some(100.0));
        let undone = s.undo().unwrap();
        assert_eq!(undone.node, id);
        s.tick(ms(1), &probe);
        assert_eq!(s.working_size(id).map(|sz| sz.width), Some(400.0));
    }

    #[test]
    fn unknown_node_panel_write() {
        let (mut s, _) = session();
        let err = s
            .set_props(NodeId::intern("s_ghost"), PropPatch::new(), None, ms(0))
            .unwrap_err();
        assert_eq!(err, PatchError::UnknownNode(NodeId::intern("s_ghost")));
    }
}
