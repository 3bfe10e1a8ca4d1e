//! Resize handles and which of them a node exposes.
//!
//! A selected node nominally has 8 handles: four edges and four corners.
//! The root never has any. A node that fills its parent's layout axis only
//! keeps the edge pair on the cross axis; corners would imply resizing both
//! axes, which such a node cannot honor, so they are dropped entirely.

use pf_core::{Axis, DocumentAccess, FillSpace, LayoutAxis, NodeId};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// One of the 8 grab points around a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Handle {
    Top,
    Right,
    Bottom,
    Left,
    TopRight,
    BottomRight,
    BottomLeft,
    TopLeft,
}

impl Handle {
    pub const ALL: [Handle; 8] = [
        Handle::Top,
        Handle::Right,
        Handle::Bottom,
        Handle::Left,
        Handle::TopRight,
        Handle::BottomRight,
        Handle::BottomLeft,
        Handle::TopLeft,
    ];

    const fn bit(self) -> u8 {
        1 << (self as u8)
    }

    /// Name used by the browser canvas (`"topRight"` etc).
    pub fn name(self) -> &'static str {
        match self {
            Handle::Top => "top",
            Handle::Right => "right",
            Handle::Bottom => "bottom",
            Handle::Left => "left",
            Handle::TopRight => "topRight",
            Handle::BottomRight => "bottomRight",
            Handle::BottomLeft => "bottomLeft",
            Handle::TopLeft => "topLeft",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|h| h.name() == name)
    }

    /// Whether dragging this handle changes the size along `axis`.
    pub fn moves(self, axis: Axis) -> bool {
        self.sign(axis) != 0.0
    }

    /// +1 when pointer motion along `axis` grows the node, -1 when it
    /// shrinks it (left/top edges), 0 when the handle ignores that axis.
    fn sign(self, axis: Axis) -> f64 {
        match (self, axis) {
            (Handle::Right | Handle::TopRight | Handle::BottomRight, Axis::Horizontal) => 1.0,
            (Handle::Left | Handle::TopLeft | Handle::BottomLeft, Axis::Horizontal) => -1.0,
            (Handle::Bottom | Handle::BottomLeft | Handle::BottomRight, Axis::Vertical) => 1.0,
            (Handle::Top | Handle::TopLeft | Handle::TopRight, Axis::Vertical) => -1.0,
            _ => 0.0,
        }
    }

    /// Position on the node's box, as fractions of width and height.
    pub fn anchor(self) -> (f64, f64) {
        match self {
            Handle::Top => (0.5, 0.0),
            Handle::Right => (1.0, 0.5),
            Handle::Bottom => (0.5, 1.0),
            Handle::Left => (0.0, 0.5),
            Handle::TopRight => (1.0, 0.0),
            Handle::BottomRight => (1.0, 1.0),
            Handle::BottomLeft => (0.0, 1.0),
            Handle::TopLeft => (0.0, 0.0),
        }
    }

    /// CSS cursor shown while hovering the handle.
    pub fn cursor(self) -> &'static str {
        match self {
            Handle::Top | Handle::Bottom => "ns-resize",
            Handle::Left | Handle::Right => "ew-resize",
            Handle::TopRight | Handle::BottomLeft => "nesw-resize",
            Handle::TopLeft | Handle::BottomRight => "nwse-resize",
        }
    }

    /// Size change `(dw, dh)` produced by a pointer displacement.
    pub fn size_delta(self, dx: f64, dy: f64) -> (f64, f64) {
        (
            dx * self.sign(Axis::Horizontal),
            dy * self.sign(Axis::Vertical),
        )
    }
}

/// Overlay a renderer draws for one enabled handle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Indicator {
    pub handle: Handle,
    pub name: &'static str,
    pub x: f64,
    pub y: f64,
    pub cursor: &'static str,
}

/// A set of handles, stored as a bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HandleSet {
    mask: u8,
}

impl HandleSet {
    pub const NONE: Self = Self { mask: 0 };
    pub const ALL: Self = Self { mask: 0xFF };

    pub fn of(handles: &[Handle]) -> Self {
        handles.iter().fold(Self::NONE, |set, h| set.with(*h))
    }

    #[must_use]
    pub fn with(self, handle: Handle) -> Self {
        Self {
            mask: self.mask | handle.bit(),
        }
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.mask & handle.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.mask == 0
    }

    pub fn len(&self) -> usize {
        self.mask.count_ones() as usize
    }

    pub fn iter(&self) -> impl Iterator<Item = Handle> + '_ {
        Handle::ALL.into_iter().filter(|h| self.contains(*h))
    }

    /// Overlays for every handle in the set, in [`Handle::ALL`] order.
    pub fn indicators(&self) -> SmallVec<[Indicator; 8]> {
        self.iter()
            .map(|handle| {
                let (x, y) = handle.anchor();
                Indicator {
                    handle,
                    name: handle.name(),
                    x,
                    y,
                    cursor: handle.cursor(),
                }
            })
            .collect()
    }

    /// The edge pair that resizes along `axis`.
    pub fn edges_along(axis: Axis) -> Self {
        match axis {
            Axis::Horizontal => Self::of(&[Handle::Left, Handle::Right]),
            Axis::Vertical => Self::of(&[Handle::Top, Handle::Bottom]),
        }
    }
}

/// Handle policy as a pure function of node state.
pub fn enabled_handles(
    is_root: bool,
    selected: bool,
    fill_space: FillSpace,
    parent_axis: Option<LayoutAxis>,
) -> HandleSet {
    if is_root || !selected {
        return HandleSet::NONE;
    }
    match (fill_space, parent_axis) {
        (FillSpace::Yes, Some(axis)) => HandleSet::edges_along(axis.axis().cross()),
        _ => HandleSet::ALL,
    }
}

/// [`enabled_handles`] evaluated against the document.
pub fn handles_for(doc: &impl DocumentAccess, id: NodeId, selected: bool) -> HandleSet {
    let Some(node) = doc.node(id) else {
        return HandleSet::NONE;
    };
    let parent_axis = doc.parent_node(id).and_then(|p| p.layout_axis());
    enabled_handles(doc.is_root(id), selected, node.fill_space(), parent_axis)
}
