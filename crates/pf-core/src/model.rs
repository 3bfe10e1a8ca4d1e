//! Page document model.
//!
//! The document is a tree of [`DocumentNode`]s stored in a petgraph arena.
//! Edges go parent → child; a node's parent is found through its single
//! incoming edge, so nodes never own each other. Each node carries an open
//! map of props (width, height, fillSpace, layoutAxis, plus whatever the
//! component renderer stores) and a generation stamp bumped on every
//! applied patch.

use crate::dimension::Dimension;
use crate::error::{DocumentError, PatchError};
use crate::id::NodeId;
use crate::measure::Axis;
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::{BTreeMap, HashMap};

// ─── Props ───────────────────────────────────────────────────────────────

/// One prop value. Component renderers store arbitrary JSON; the engine
/// only interprets text and flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    Flag(bool),
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl PropValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for PropValue {
    fn from(s: &str) -> Self {
        PropValue::Text(s.to_string())
    }
}

impl From<String> for PropValue {
    fn from(s: String) -> Self {
        PropValue::Text(s)
    }
}

impl From<bool> for PropValue {
    fn from(b: bool) -> Self {
        PropValue::Flag(b)
    }
}

impl From<f64> for PropValue {
    fn from(n: f64) -> Self {
        PropValue::Number(n)
    }
}

pub type Props = BTreeMap<String, PropValue>;

/// Prop keys a component stores its size under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropKeys {
    pub width: String,
    pub height: String,
}

impl PropKeys {
    pub fn new(width: &str, height: &str) -> Self {
        Self {
            width: width.to_string(),
            height: height.to_string(),
        }
    }

    pub fn for_axis(&self, axis: Axis) -> &str {
        match axis {
            Axis::Horizontal => &self.width,
            Axis::Vertical => &self.height,
        }
    }
}

impl Default for PropKeys {
    fn default() -> Self {
        Self::new("width", "height")
    }
}

/// A batch of prop writes. `None` removes the key.
///
/// Writing a key twice keeps only the latest value, which is what lets the
/// debounce queue coalesce a burst of pointer moves into one patch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropPatch {
    entries: SmallVec<[(String, Option<PropValue>); 2]>,
}

impl PropPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert) of a value.
    pub fn set(mut self, key: &str, value: impl Into<PropValue>) -> Self {
        self.insert(key, Some(value.into()));
        self
    }

    pub fn insert(&mut self, key: &str, value: Option<PropValue>) {
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key.to_string(), value));
        }
    }

    /// Fold `newer` into this patch; its values win.
    pub fn merge(&mut self, newer: PropPatch) {
        for (key, value) in newer.entries {
            self.insert(&key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<Option<&PropValue>> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&PropValue>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether applying this patch would leave `props` unchanged.
    pub fn is_noop_for(&self, props: &Props) -> bool {
        self.entries
            .iter()
            .all(|(k, v)| props.get(k) == v.as_ref())
    }

    pub fn apply_to(&self, props: &mut Props) {
        for (key, value) in &self.entries {
            match value {
                Some(v) => {
                    props.insert(key.clone(), v.clone());
                }
                None => {
                    props.remove(key);
                }
            }
        }
    }

    /// The patch that restores `props` as they are now, for the same keys.
    pub fn inverse_against(&self, props: &Props) -> PropPatch {
        let mut inverse = PropPatch::new();
        for (key, _) in &self.entries {
            inverse.insert(key, props.get(key).cloned());
        }
        inverse
    }
}

// ─── Node-level prop semantics ───────────────────────────────────────────

/// Whether a node stretches along its parent's layout axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FillSpace {
    Yes,
    #[default]
    No,
}

/// Main axis of a flex-like container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayoutAxis {
    Row,
    Column,
}

impl LayoutAxis {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "row" | "row-reverse" => Some(LayoutAxis::Row),
            "column" | "column-reverse" => Some(LayoutAxis::Column),
            _ => None,
        }
    }

    pub fn axis(self) -> Axis {
        match self {
            LayoutAxis::Row => Axis::Horizontal,
            LayoutAxis::Column => Axis::Vertical,
        }
    }
}

pub const FILL_SPACE_KEY: &str = "fillSpace";
pub const LAYOUT_AXIS_KEY: &str = "layoutAxis";
/// Older component renderers store the axis under the CSS name.
pub const FLEX_DIRECTION_KEY: &str = "flexDirection";

/// A single visual element of the page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentNode {
    pub id: NodeId,
    pub props: Props,
    /// Revision of the document at this node's last applied patch.
    pub generation: u64,
}

impl DocumentNode {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            props: Props::new(),
            generation: 0,
        }
    }

    pub fn with_prop(mut self, key: &str, value: impl Into<PropValue>) -> Self {
        self.props.insert(key.to_string(), value.into());
        self
    }

    pub fn prop_str(&self, key: &str) -> Option<&str> {
        self.props.get(key).and_then(PropValue::as_str)
    }

    /// Declared dimension under `key`; missing or malformed is `None`.
    pub fn dimension(&self, key: &str) -> Option<Dimension> {
        self.prop_str(key).and_then(Dimension::parse)
    }

    pub fn fill_space(&self) -> FillSpace {
        match self.props.get(FILL_SPACE_KEY) {
            Some(PropValue::Flag(true)) => FillSpace::Yes,
            Some(PropValue::Text(s)) if s.trim() == "yes" => FillSpace::Yes,
            _ => FillSpace::No,
        }
    }

    /// The layout axis this node imposes on its children, if it is a
    /// flex-like container.
    pub fn layout_axis(&self) -> Option<LayoutAxis> {
        self.prop_str(LAYOUT_AXIS_KEY)
            .or_else(|| self.prop_str(FLEX_DIRECTION_KEY))
            .and_then(LayoutAxis::parse)
    }
}

// ─── Document ────────────────────────────────────────────────────────────

/// The page document: a tree of nodes in an arena, indexed by id.
#[derive(Debug, Clone)]
pub struct Document {
    /// Edges run parent → child, weighted by the child's insertion order.
    pub graph: StableDiGraph<DocumentNode, u64>,
    pub root: NodeIndex,
    id_index: HashMap<NodeId, NodeIndex>,
    next_order: u64,
    /// Bumped on every applied patch; copied into the patched node.
    revision: u64,
}

impl Document {
    /// Empty document holding only a `ROOT` node.
    #[must_use]
    pub fn new() -> Self {
        Self::with_root(DocumentNode::new(NodeId::root()))
    }

    #[must_use]
    pub fn with_root(root_node: DocumentNode) -> Self {
        let mut graph = StableDiGraph::new();
        let id = root_node.id;
        let root = graph.add_node(root_node);
        let mut id_index = HashMap::new();
        id_index.insert(id, root);
        Self {
            graph,
            root,
            id_index,
            next_order: 0,
            revision: 0,
        }
    }

    pub fn root_id(&self) -> NodeId {
        self.graph[self.root].id
    }

    /// Insert `node` as the last child of `parent`.
    pub fn add_node(
        &mut self,
        parent: NodeId,
        node: DocumentNode,
    ) -> Result<NodeIndex, DocumentError> {
        if self.id_index.contains_key(&node.id) {
            return Err(DocumentError::DuplicateId(node.id));
        }
        let parent_idx = self
            .index_of(parent)
            .ok_or(DocumentError::UnknownNode(parent))?;
        let id = node.id;
        let idx = self.graph.add_node(node);
        self.graph.add_edge(parent_idx, idx, self.next_order);
        self.next_order += 1;
        self.id_index.insert(id, idx);
        Ok(idx)
    }

    /// Remove a node and its whole subtree. The root cannot be removed.
    pub fn remove_node(&mut self, id: NodeId) -> Option<DocumentNode> {
        let idx = self.index_of(id)?;
        if idx == self.root {
            return None;
        }
        for child in self.children(id) {
            self.remove_node(child);
        }
        let removed = self.graph.remove_node(idx)?;
        self.id_index.remove(&removed.id);
        Some(removed)
    }

    pub fn get(&self, id: NodeId) -> Option<&DocumentNode> {
        self.id_index.get(&id).map(|idx| &self.graph[*idx])
    }

    pub fn index_of(&self, id: NodeId) -> Option<NodeIndex> {
        self.id_index.get(&id).copied()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.id_index.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.id_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_index.is_empty()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        let idx = self.index_of(id)?;
        self.graph
            .neighbors_directed(idx, petgraph::Direction::Incoming)
            .next()
            .map(|pidx| self.graph[pidx].id)
    }

    /// Children in insertion order.
    ///
    /// Ordered by edge weight: node indices are recycled after a removal,
    /// so they cannot stand in for insertion order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let Some(idx) = self.index_of(id) else {
            return Vec::new();
        };
        let mut children: Vec<(u64, NodeIndex)> = self
            .graph
            .edges_directed(idx, petgraph::Direction::Outgoing)
            .map(|e| (*e.weight(), e.target()))
            .collect();
        children.sort_unstable_by_key(|(order, _)| *order);
        children.into_iter().map(|(_, c)| self.graph[c].id).collect()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.id_index.keys().copied()
    }

    /// Apply `patch` to a node's props.
    ///
    /// With `based_on`, the patch is refused if the node has been patched
    /// since that generation. Without it the write always wins. Returns the
    /// node's generation afterwards; a patch that changes nothing leaves the
    /// generation alone.
    pub fn patch(
        &mut self,
        id: NodeId,
        patch: &PropPatch,
        based_on: Option<u64>,
    ) -> Result<u64, PatchError> {
        let idx = self.index_of(id).ok_or(PatchError::UnknownNode(id))?;
        let current = self.graph[idx].generation;
        if let Some(based_on) = based_on
            && based_on != current
        {
            log::debug!("rejecting stale patch for {id}: based on {based_on}, node at {current}");
            return Err(PatchError::Stale {
                id,
                based_on,
                current,
            });
        }
        if patch.is_noop_for(&self.graph[idx].props) {
            return Ok(current);
        }
        self.revision += 1;
        let node = &mut self.graph[idx];
        patch.apply_to(&mut node.props);
        node.generation = self.revision;
        Ok(self.revision)
    }

    /// Load a document from a JSON node map:
    ///
    /// ```json
    /// { "ROOT": { "parent": null, "props": { "width": "800px" } },
    ///   "hero": { "parent": "ROOT", "props": { "width": "50%" } } }
    /// ```
    ///
    /// Exactly one node must have a null parent. Siblings are inserted in
    /// the order their parent's `nodes` list gives, falling back to key
    /// order.
    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        let raw: BTreeMap<String, RawNode> = serde_json::from_str(json)?;

        let mut root_key: Option<&str> = None;
        for (key, node) in &raw {
            if node.parent.is_none() {
                if let Some(existing) = root_key {
                    return Err(DocumentError::MultipleRoots(
                        existing.to_string(),
                        key.clone(),
                    ));
                }
                root_key = Some(key);
            } else if let Some(parent) = &node.parent
                && !raw.contains_key(parent)
            {
                return Err(DocumentError::MissingParent {
                    node: key.clone(),
                    parent: parent.clone(),
                });
            }
        }
        let root_key = root_key.ok_or(DocumentError::NoRoot)?;

        let mut root_node = DocumentNode::new(NodeId::intern(root_key));
        root_node.props = raw[root_key].props.clone();
        let mut doc = Document::with_root(root_node);

        // Breadth-first from the root; anything left over hangs off a cycle.
        let mut queue = vec![root_key.to_string()];
        while let Some(parent_key) = queue.pop() {
            for child_key in ordered_children(&raw, &parent_key) {
                let mut node = DocumentNode::new(NodeId::intern(&child_key));
                node.props = raw[&child_key].props.clone();
                doc.add_node(NodeId::intern(&parent_key), node)?;
                queue.insert(0, child_key);
            }
        }

        if let Some(orphan) = raw.keys().find(|k| !doc.contains(NodeId::intern(k))) {
            return Err(DocumentError::Cycle(orphan.clone()));
        }
        Ok(doc)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct RawNode {
    #[serde(default)]
    parent: Option<String>,
    #[serde(default)]
    props: Props,
    #[serde(default)]
    nodes: Vec<String>,
}

fn ordered_children(raw: &BTreeMap<String, RawNode>, parent: &str) -> Vec<String> {
    let mut children: Vec<String> = raw
        .iter()
        .filter(|(_, n)| n.parent.as_deref() == Some(parent))
        .map(|(k, _)| k.clone())
        .collect();
    if let Some(order) = raw.get(parent).map(|n| &n.nodes)
        && !order.is_empty()
    {
        children.sort_by_key(|k| order.iter().position(|o| o == k).unwrap_or(usize::MAX));
    }
    children
}
