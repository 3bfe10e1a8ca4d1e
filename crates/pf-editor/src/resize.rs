//! Resize interaction controller.
//!
//! Drives one pointer gesture on one node:
//!
//! ```text
//!   Idle ──begin──▶ Active ──finish──▶ Committing ──settle──▶ Idle
//!                    │  ▲
//!                    └──┘ update (pointer move)
//!   Active ──abort (cancel, or node changed underneath)──▶ Idle
//! ```
//!
//! The controller does not own the document or write to it. [`update`]
//! hands back the new live pixel size (applied to the rendered element
//! immediately) and a patch in the node's committed unit, which the session
//! parks in the debounce queue.
//!
//! [`update`]: ResizeController::update

use crate::handles::{Handle, HandleSet};
use crate::recompute::resolve_working_size;
use pf_core::dimension::{format_percent, format_px, px_to_percent};
use pf_core::{
    Axis, Dimension, DocumentAccess, LayoutProbe, NodeId, PropKeys, PropPatch, Size, element_box,
    get_element_dimensions,
};
use thiserror::Error;

/// Pointer position in canvas pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GestureError {
    #[error("a resize of {active} is already in progress")]
    SessionActive { active: NodeId },

    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("{0} is the document root and cannot be resized")]
    RootNotResizable(NodeId),

    #[error("handle {} is not enabled on {id}", .handle.name())]
    HandleDisabled { id: NodeId, handle: Handle },

    #[error("no resize in progress")]
    NoActiveGesture,

    /// The node's committed size changed outside the gesture.
    #[error("{0} changed while it was being resized")]
    Stale(NodeId),
}

/// Transient state of one resize gesture.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureSession {
    pub target: NodeId,
    pub handle: Handle,
    pub keys: PropKeys,
    /// Rendered size when the gesture started.
    pub start_box: Size,
    pub start_pointer: Point,
    /// Current pixel size, tracking the pointer.
    pub live: Size,
    /// Parent content box at start; the percentage basis for the gesture.
    pub parent_reference: Size,
    /// Parent declares `auto` on (width, height).
    pub parent_auto: (bool, bool),
    /// Committed width/height when the gesture started.
    pub start_props: PropPatch,
    /// Width/height as the gesture last left them in the document.
    pub last_written: PropPatch,
    pub start_units: (Option<Dimension>, Option<Dimension>),
    /// Node generation the gesture last saw.
    pub expected_generation: u64,
    /// Whether any patch of this gesture reached the document.
    pub committed_any: bool,
}

impl GestureSession {
    fn unit(&self, axis: Axis) -> Option<Dimension> {
        match axis {
            Axis::Horizontal => self.start_units.0,
            Axis::Vertical => self.start_units.1,
        }
    }

    fn parent_is_auto(&self, axis: Axis) -> bool {
        match axis {
            Axis::Horizontal => self.parent_auto.0,
            Axis::Vertical => self.parent_auto.1,
        }
    }

    /// Format `px` in the unit the node committed at gesture start.
    ///
    /// Percentages are kept unless the parent is `auto` on that axis: an
    /// `auto` parent has no stable basis, so the value falls back to pixels.
    fn format_axis(&self, axis: Axis, px: f64, precision: u32) -> String {
        let keep_percent =
            self.unit(axis).is_some_and(|d| d.is_percentage()) && !self.parent_is_auto(axis);
        if keep_percent {
            format_percent(
                px_to_percent(px, self.parent_reference.get(axis)),
                precision,
            )
        } else {
            format_px(px, precision)
        }
    }
}

/// Output of one pointer move.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeStep {
    pub target: NodeId,
    pub live: Size,
    pub patch: PropPatch,
    pub based_on: u64,
}

#[derive(Debug, Clone, Default)]
enum Phase {
    #[default]
    Idle,
    Active(Box<GestureSession>),
    Committing(NodeId),
}

#[derive(Debug)]
pub struct ResizeController {
    phase: Phase,
    precision: u32,
}

impl ResizeController {
    pub fn new(precision: u32) -> Self {
        Self {
            phase: Phase::Idle,
            precision,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.phase, Phase::Idle)
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, Phase::Active(_))
    }

    /// Node under an active or committing gesture.
    pub fn active_target(&self) -> Option<NodeId> {
        match &self.phase {
            Phase::Idle => None,
            Phase::Active(s) => Some(s.target),
            Phase::Committing(id) => Some(*id),
        }
    }

    pub fn session(&self) -> Option<&GestureSession> {
        match &self.phase {
            Phase::Active(s) => Some(s),
            _ => None,
        }
    }

    /// Start a gesture on `id` from `handle`, returning the starting live
    /// size. `parent_keys` name the parent's own width/height props.
    ///
    /// Rejected while another gesture is live, for unknown or root nodes,
    /// and for handles outside `enabled`. A rejected start changes nothing.
    #[allow(clippy::too_many_arguments)]
    pub fn begin(
        &mut self,
        doc: &impl DocumentAccess,
        probe: &impl LayoutProbe,
        id: NodeId,
        handle: Handle,
        keys: PropKeys,
        parent_keys: &PropKeys,
        pointer: Point,
        enabled: HandleSet,
    ) -> Result<Size, GestureError> {
        if let Some(active) = self.active_target() {
            return Err(GestureError::SessionActive { active });
        }
        let node = doc.node(id).ok_or(GestureError::UnknownNode(id))?;
        if doc.is_root(id) {
            return Err(GestureError::RootNotResizable(id));
        }
        if !enabled.contains(handle) {
            return Err(GestureError::HandleDisabled { id, handle });
        }

        let parent = doc.parent_node(id);
        let parent_reference = parent
            .map(|p| get_element_dimensions(probe, p.id))
            .unwrap_or(Size::ZERO);
        let parent_auto = parent.map_or((false, false), |p| {
            (
                p.dimension(&parent_keys.width).is_some_and(|d| d.is_auto()),
                p.dimension(&parent_keys.height).is_some_and(|d| d.is_auto()),
            )
        });

        let mut start_props = PropPatch::new();
        start_props.insert(&keys.width, node.props.get(&keys.width).cloned());
        start_props.insert(&keys.height, node.props.get(&keys.height).cloned());

        let session = GestureSession {
            target: id,
            handle,
            start_box: element_box(probe, id),
            start_pointer: pointer,
            live: resolve_working_size(node, &keys, parent_reference),
            parent_reference,
            parent_auto,
            last_written: start_props.clone(),
            start_props,
            start_units: (node.dimension(&keys.width), node.dimension(&keys.height)),
            expected_generation: node.generation,
            committed_any: false,
            keys,
        };
        log::debug!(
            "resize start on {id} via {}: box {:?}, parent {:?}",
            handle.name(),
            session.start_box,
            session.parent_reference
        );
        let live = session.live;
        self.phase = Phase::Active(Box::new(session));
        Ok(live)
    }

    /// Check the target against what the gesture last wrote and return the
    /// generation its next patch should be based on.
    ///
    /// Writes to other props are adopted. If the node's width or height
    /// changed from outside, or the node is gone, the gesture is dropped and
    /// [`GestureError::Stale`] returned.
    pub fn revalidate(&mut self, doc: &impl DocumentAccess) -> Result<u64, GestureError> {
        let Phase::Active(session) = &mut self.phase else {
            return Err(GestureError::NoActiveGesture);
        };
        let target = session.target;
        let stale = match doc.node(target) {
            None => true,
            Some(node) if node.generation == session.expected_generation => false,
            Some(node) if session.last_written.is_noop_for(&node.props) => {
                log::trace!(
                    "{target} patched outside the gesture, dimensions untouched: {} -> {}",
                    session.expected_generation,
                    node.generation
                );
                session.expected_generation = node.generation;
                false
            }
            Some(_) => true,
        };
        let generation = session.expected_generation;
        if stale {
            log::debug!("resize of {target} went stale, dropping gesture");
            self.phase = Phase::Idle;
            return Err(GestureError::Stale(target));
        }
        Ok(generation)
    }

    /// Feed a pointer position. Produces the live size and the patch to
    /// queue. If the node's dimensions changed underneath the gesture, the
    /// gesture is dropped and [`GestureError::Stale`] returned.
    pub fn update(
        &mut self,
        doc: &impl DocumentAccess,
        pointer: Point,
    ) -> Result<ResizeStep, GestureError> {
        self.revalidate(doc)?;
        let Phase::Active(session) = &mut self.phase else {
            return Err(GestureError::NoActiveGesture);
        };
        let target = session.target;

        let (dw, dh) = session.handle.size_delta(
            pointer.x - session.start_pointer.x,
            pointer.y - session.start_pointer.y,
        );
        let live = Size::new(
            (session.start_box.width + dw).max(0.0),
            (session.start_box.height + dh).max(0.0),
        );

        let mut patch = PropPatch::new();
        for axis in [Axis::Horizontal, Axis::Vertical] {
            if session.handle.moves(axis) {
                let value = session.format_axis(axis, live.get(axis), self.precision);
                patch.insert(session.keys.for_axis(axis), Some(value.into()));
            }
        }
        // Untouched axes keep their resolved size.
        if session.handle.moves(Axis::Horizontal) {
            session.live.width = live.width;
        }
        if session.handle.moves(Axis::Vertical) {
            session.live.height = live.height;
        }
        log::trace!("resize {target}: live {:?}", session.live);

        Ok(ResizeStep {
            target,
            live: session.live,
            patch,
            based_on: session.expected_generation,
        })
    }

    /// The session's own `patch` landed at `generation`.
    pub fn committed(&mut self, generation: u64, patch: &PropPatch) {
        if let Phase::Active(session) = &mut self.phase {
            session.expected_generation = generation;
            session.last_written.merge(patch.clone());
            session.committed_any = true;
        }
    }

    /// Pointer released: Active → Committing. Returns the session so the
    /// caller can flush its pending patch before calling [`settle`].
    ///
    /// [`settle`]: Self::settle
    pub fn finish(&mut self) -> Option<GestureSession> {
        match std::mem::take(&mut self.phase) {
            Phase::Active(session) => {
                self.phase = Phase::Committing(session.target);
                Some(*session)
            }
            other => {
                self.phase = other;
                None
            }
        }
    }

    /// Committing → Idle.
    pub fn settle(&mut self) {
        if let Phase::Committing(id) = self.phase {
            log::debug!("resize of {id} settled");
            self.phase = Phase::Idle;
        }
    }

    /// Drop the active gesture without committing anything further.
    pub fn abort(&mut self) -> Option<GestureSession> {
        match std::mem::take(&mut self.phase) {
            Phase::Active(session) => Some(*session),
            other => {
                self.phase = other;
                None
            }
        }
    }
}

impl Default for ResizeController {
    fn default() -> Self {
        Self::new(pf_core::dimension::DEFAULT_PRECISION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pf_core::{Document, DocumentNode, StaticLayout};
    use pretty_assertions::assert_eq;

    fn doc_with(width: &str) -> Document {
        let mut doc = Document::new();
        doc.add_node(
            NodeId::root(),
            DocumentNode::new(NodeId::intern("frame")).with_prop("width", "500px"),
        )
        .unwrap();
        doc.add_node(
            NodeId::intern("frame"),
            DocumentNode::new(NodeId::intern("tile"))
                .with_prop("width", width)
                .with_prop("height", "80px"),
        )
        .unwrap();
        doc
    }

    fn layout(tile_width: f64) -> StaticLayout {
        StaticLayout::new()
            .with(NodeId::intern("frame"), 500.0, 400.0)
            .with(NodeId::intern("tile"), tile_width, 80.0)
    }

    fn start(
        c: &mut ResizeController,
        doc: &Document,
        probe: &StaticLayout,
        handle: Handle,
    ) -> Result<(), GestureError> {
        c.begin(
            doc,
            probe,
            NodeId::intern("tile"),
            handle,
            PropKeys::default(),
            &PropKeys::default(),
            Point::new(0.0, 0.0),
            HandleSet::ALL,
        )
        .map(|_| ())
    }

    #[test]
    fn pixel_width_stays_pixels() {
        let doc = doc_with("100px");
        let mut c = ResizeController::default();
        start(&mut c, &doc, &layout(100.0), Handle::Right).unwrap();
        let step = c.update(&doc, Point::new(50.0, 12.0)).unwrap();
        assert_eq!(step.patch, PropPatch::new().set("width", "150px"));
        assert_eq!(step.live, Size::new(150.0, 80.0));
    }

    #[test]
    fn percent_width_stays_percent() {
        let doc = doc_with("20%");
        let mut c = ResizeController::default();
        start(&mut c, &doc, &layout(100.0), Handle::Right).unwrap();
        let step = c.update(&doc, Point::new(50.0, 0.0)).unwrap();
        assert_eq!(step.patch, PropPatch::new().set("width", "30%"));
    }

    #[test]
    fn corner_writes_both_axes() {
        let doc = doc_with("100px");
        let mut c = ResizeController::default();
        start(&mut c, &doc, &layout(100.0), Handle::BottomRight).unwrap();
        let step = c.update(&doc, Point::new(10.0, 20.0)).unwrap();
        assert_eq!(
            step.patch,
            PropPatch::new().set("width", "110px").set("height", "100px")
        );
    }

    #[test]
    fn left_handle_grows_leftwards_and_clamps() {
        let doc = doc_with("100px");
        let mut c = ResizeController::default();
        start(&mut c, &doc, &layout(100.0), Handle::Left).unwrap();
        let step = c.update(&doc, Point::new(-30.0, 0.0)).unwrap();
        assert_eq!(step.patch, PropPatch::new().set("width", "130px"));
        let step = c.update(&doc, Point::new(400.0, 0.0)).unwrap();
        assert_eq!(step.patch, PropPatch::new().set("width", "0px"));
    }

    #[test]
    fn second_gesture_rejected() {
        let doc = doc_with("100px");
        let probe = layout(100.0);
        let mut c = ResizeController::default();
        start(&mut c, &doc, &probe, Handle::Right).unwrap();
        let err = start(&mut c, &doc, &probe, Handle::Right).unwrap_err();
        assert_eq!(
            err,
            GestureError::SessionActive {
                active: NodeId::intern("tile")
            }
        );
        assert!(c.finish().is_some());
        // Still committing until settled.
        assert!(start(&mut c, &doc, &probe, Handle::Right).is_err());
        c.settle();
        assert!(start(&mut c, &doc, &probe, Handle::Right).is_ok());
    }

    #[test]
    fn root_and_disabled_handles_rejected() {
        let doc = doc_with("100px");
        let probe = layout(100.0);
        let mut c = ResizeController::default();
        let err = c
            .begin(
                &doc,
                &probe,
                NodeId::root(),
                Handle::Right,
                PropKeys::default(),
                &PropKeys::default(),
                Point::default(),
                HandleSet::ALL,
            )
            .unwrap_err();
        assert_eq!(err, GestureError::RootNotResizable(NodeId::root()));

        let err = c
            .begin(
                &doc,
                &probe,
                NodeId::intern("tile"),
                Handle::Right,
                PropKeys::default(),
                &PropKeys::default(),
                Point::default(),
                HandleSet::edges_along(Axis::Vertical),
            )
            .unwrap_err();
        assert!(matches!(err, GestureError::HandleDisabled { .. }));
        assert!(c.is_idle());
    }

    #[test]
    fn foreign_write_makes_gesture_stale() {
        let mut doc = doc_with("100px");
        let mut c = ResizeController::default();
        start(&mut c, &doc, &layout(100.0), Handle::Right).unwrap();
        doc.patch(
            NodeId::intern("tile"),
            &PropPatch::new().set("width", "300px"),
            None,
        )
        .unwrap();
        let err = c.update(&doc, Point::new(5.0, 0.0)).unwrap_err();
        assert_eq!(err, GestureError::Stale(NodeId::intern("tile")));
        assert!(c.is_idle());
    }

    #[test]
    fn unrelated_write_keeps_gesture_alive() {
        let mut doc = doc_with("100px");
        let mut c = ResizeController::default();
        start(&mut c, &doc, &layout(100.0), Handle::Right).unwrap();
        let generation = doc
            .patch(
                NodeId::intern("tile"),
                &PropPatch::new().set("color", "red"),
                None,
            )
            .unwrap();
        let step = c.update(&doc, Point::new(5.0, 0.0)).unwrap();
        assert_eq!(step.based_on, generation);
        assert_eq!(step.patch, PropPatch::new().set("width", "105px"));
    }

    #[test]
    fn own_commits_are_not_foreign() {
        let mut doc = doc_with("100px");
        let mut c = ResizeController::default();
        start(&mut c, &doc, &layout(100.0), Handle::Right).unwrap();
        let step = c.update(&doc, Point::new(20.0, 0.0)).unwrap();
        let generation = doc
            .patch(NodeId::intern("tile"), &step.patch, Some(step.based_on))
            .unwrap();
        c.committed(generation, &step.patch);
        // A later write elsewhere on the node still leaves 120px in place.
        doc.patch(
            NodeId::intern("tile"),
            &PropPatch::new().set("color", "red"),
            None,
        )
        .unwrap();
        assert!(c.update(&doc, Point::new(30.0, 0.0)).is_ok());

        doc.patch(
            NodeId::intern("tile"),
            &PropPatch::new().set("width", "100px"),
            None,
        )
        .unwrap();
        assert_eq!(
            c.update(&doc, Point::new(40.0, 0.0)).unwrap_err(),
            GestureError::Stale(NodeId::intern("tile"))
        );
    }

    #[test]
    fn auto_parent_read_through_its_own_keys() {
        let mut doc = Document::new();
        doc.add_node(
            NodeId::root(),
            DocumentNode::new(NodeId::intern("gallery"))
                .with_prop("width", "500px")
                .with_prop("imageWidth", "auto"),
        )
        .unwrap();
        doc.add_node(
            NodeId::intern("gallery"),
            DocumentNode::new(NodeId::intern("tile")).with_prop("width", "20%"),
        )
        .unwrap();
        let probe = StaticLayout::new()
            .with(NodeId::intern("gallery"), 500.0, 400.0)
            .with(NodeId::intern("tile"), 100.0, 80.0);
        let mut c = ResizeController::default();
        c.begin(
            &doc,
            &probe,
            NodeId::intern("tile"),
            Handle::Right,
            PropKeys::default(),
            &PropKeys::new("imageWidth", "imageHeight"),
            Point::default(),
            HandleSet::ALL,
        )
        .unwrap();
        let step = c.update(&doc, Point::new(50.0, 0.0)).unwrap();
        assert_eq!(step.patch, PropPatch::new().set("width", "150px"));
    }

    #[test]
    fn update_without_gesture() {
        let doc = doc_with("100px");
        let mut c = ResizeController::default();
        assert_eq!(
            c.update(&doc, Point::default()).unwrap_err(),
            GestureError::NoActiveGesture
        );
    }
}
