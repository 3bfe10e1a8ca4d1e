//! Working-size recompute on layout change.
//!
//! A node declared as `50%` keeps that committed value when the browser
//! window shrinks, but its pixel size changes. Renderers draw from the
//! working size, so after a viewport or container resize every mounted node
//! re-resolves its committed dimensions against the parent's current
//! content box. Committed props are never written here.

use pf_core::{Dimension, DocumentNode, NodeId, PropKeys, Size};
use std::collections::BTreeMap;
use std::time::Duration;

/// Handle returned by [`LayoutListener::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    id: u64,
    node: NodeId,
}

impl Subscription {
    pub fn node(&self) -> NodeId {
        self.node
    }
}

/// Registry of nodes that want their working size refreshed when the
/// layout changes, plus the debounce timer for the refresh.
#[derive(Debug, Default)]
pub struct LayoutListener {
    subscribers: BTreeMap<u64, NodeId>,
    next_id: u64,
    deadline: Option<Duration>,
}

impl LayoutListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, node: NodeId) -> Subscription {
        self.next_id += 1;
        self.subscribers.insert(self.next_id, node);
        Subscription {
            id: self.next_id,
            node,
        }
    }

    /// Returns false if the subscription was already gone.
    pub fn unsubscribe(&mut self, sub: Subscription) -> bool {
        self.subscribers.remove(&sub.id).is_some()
    }

    pub fn is_subscribed(&self, node: NodeId) -> bool {
        self.subscribers.values().any(|n| *n == node)
    }

    /// Subscribed nodes, each once, in subscription order.
    pub fn subscribers(&self) -> Vec<NodeId> {
        let mut seen = Vec::with_capacity(self.subscribers.len());
        for node in self.subscribers.values() {
            if !seen.contains(node) {
                seen.push(*node);
            }
        }
        seen
    }

    /// Record a layout change. Repeated notifications inside the window
    /// collapse into one recompute.
    pub fn notify(&mut self, now: Duration, window: Duration) {
        self.deadline = Some(now + window);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// True once the armed recompute is due; disarms the timer.
    pub fn poll(&mut self, now: Duration) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Pixel size a node renders at, given its committed props and its
/// parent's current content box.
///
/// A missing or `auto` dimension fills the parent. A malformed one
/// resolves to 0.
pub fn resolve_working_size(node: &DocumentNode, keys: &PropKeys, parent: Size) -> Size {
    Size::new(
        resolve_axis(node, &keys.width, parent.width),
        resolve_axis(node, &keys.height, parent.height),
    )
}

fn resolve_axis(node: &DocumentNode, key: &str, reference: f64) -> f64 {
    if !node.props.contains_key(key) {
        return reference;
    }
    match node.dimension(key) {
        Some(Dimension::Auto) => reference,
        Some(dim) => dim.to_px(reference),
        None => 0.0,
    }
}
