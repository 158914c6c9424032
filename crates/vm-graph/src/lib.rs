//! Vessel graph extraction from one-pixel-wide skeletons.
//!
//! - Node pixels are skeleton pixels whose degree is not 2.
//! - Maximal runs of degree-2 pixels are traced into segments between nodes.
//! - Pure cycles (all degree-2) get a `LoopAnchor` node and a loop segment.
//! - Degree-0 pixels become `Isolated` nodes with no segments.
//!
//! Adjacency is 8-connected, but a diagonal link is dropped whenever one of
//! the two pixels sharing a side with both ends is set. This keeps staircase
//! runs of a thinned skeleton at degree 2.

mod build;
mod graph;

pub use build::{build_graph, pixel_degree};
pub use graph::{EdgeId, GraphComponent, Node, NodeId, NodeKind, Segment, VesselGraph, tortuosity};
