pub mod access;
pub mod dimension;
pub mod error;
pub mod id;
pub mod measure;
pub mod model;

pub use access::DocumentAccess;
pub use dimension::{Dimension, is_percentage, percent_to_px, px_to_percent};
pub use error::{DocumentError, PatchError};
pub use id::NodeId;
pub use measure::{
    Axis, BoxMetrics, Insets, LayoutProbe, Size, StaticLayout, element_box, get_element_dimensions,
};
pub use model::*;

// Re-export petgraph types so downstream crates don't need a direct dependency
pub use petgraph::graph::NodeIndex;
