//! Rendered-layout measurement.
//!
//! This is the one place the engine looks at the live rendered page rather
//! than the declared model. Hosts implement [`LayoutProbe`] over whatever
//! renders the nodes (the DOM in the browser bridge, a fixed table in tests).

use crate::id::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A width/height pair in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0.0,
        height: 0.0,
    };

    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Horizontal => self.width,
            Axis::Vertical => self.height,
        }
    }
}

/// A layout axis. Width lives on `Horizontal`, height on `Vertical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    pub fn cross(self) -> Axis {
        match self {
            Axis::Horizontal => Axis::Vertical,
            Axis::Vertical => Axis::Horizontal,
        }
    }
}

/// Padding on each edge of a rendered box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Insets {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Insets {
    pub const fn uniform(v: f64) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }
}

/// What a probe reports for one rendered element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoxMetrics {
    /// Bounding-box size (what the user sees and drags).
    pub border_box: Size,
    /// Inner client size, before padding is taken off.
    pub client: Size,
    pub padding: Insets,
}

impl BoxMetrics {
    /// Metrics for an element with no border or padding.
    pub fn plain(width: f64, height: f64) -> Self {
        let size = Size::new(width, height);
        Self {
            border_box: size,
            client: size,
            padding: Insets::default(),
        }
    }

    pub fn with_padding(mut self, padding: Insets) -> Self {
        self.padding = padding;
        self
    }

    /// Client size minus padding, each axis clamped at 0.
    pub fn content_box(&self) -> Size {
        let w = self.client.width - nonneg(self.padding.left) - nonneg(self.padding.right);
        let h = self.client.height - nonneg(self.padding.top) - nonneg(self.padding.bottom);
        Size::new(clamp_size(w), clamp_size(h))
    }
}

/// Source of rendered-element measurements.
pub trait LayoutProbe {
    /// Metrics for the element rendering `id`, or `None` if it is not
    /// currently rendered.
    fn measure(&self, id: NodeId) -> Option<BoxMetrics>;
}

impl<P: LayoutProbe + ?Sized> LayoutProbe for &P {
    fn measure(&self, id: NodeId) -> Option<BoxMetrics> {
        (**self).measure(id)
    }
}

/// Content-box size of a rendered element; 0×0 when it is not rendered.
pub fn get_element_dimensions(probe: &impl LayoutProbe, id: NodeId) -> Size {
    probe
        .measure(id)
        .map(|m| m.content_box())
        .unwrap_or(Size::ZERO)
}

/// Bounding-box size of a rendered element; 0×0 when it is not rendered.
pub fn element_box(probe: &impl LayoutProbe, id: NodeId) -> Size {
    probe
        .measure(id)
        .map(|m| Size::new(clamp_size(m.border_box.width), clamp_size(m.border_box.height)))
        .unwrap_or(Size::ZERO)
}

/// A map-backed probe. The browser bridge fills it from DOM reads; tests
/// fill it by hand.
#[derive(Debug, Clone, Default)]
pub struct StaticLayout {
    boxes: HashMap<NodeId, BoxMetrics>,
}

impl StaticLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, id: NodeId, metrics: BoxMetrics) {
        self.boxes.insert(id, metrics);
    }

    /// Builder form of [`set`](Self::set) for plain boxes.
    pub fn with(mut self, id: NodeId, width: f64, height: f64) -> Self {
        self.set(id, BoxMetrics::plain(width, height));
        self
    }

    pub fn remove(&mut self, id: NodeId) {
        self.boxes.remove(&id);
    }
}

impl LayoutProbe for StaticLayout {
    fn measure(&self, id: NodeId) -> Option<BoxMetrics> {
        self.boxes.get(&id).copied()
    }
}

fn nonneg(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 { v } else { 0.0 }
}

fn clamp_size(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 { v } else { 0.0 }
}
