pub mod layout;
pub mod tree;

pub use layout::{EdgeLineSegment, NodePosition, ProcessLayout, VisibleEntities};
pub use tree::IndexedProcessTree;
