//! Medial-axis extraction for vessel masks.
//!
//! [`thin`] peels border pixels in four directional sub-passes until only a
//! one-pixel-wide, topology-preserving skeleton remains. [`skeletonize`]
//! then alternates graph classification and correction (spur removal and
//! loop resolution) until the skeleton stops changing, and finally labels
//! each segment with its parent trunk.

mod correct;
mod parents;
mod skeletonize;
mod thin;

pub use parents::assign_parents;
pub use skeletonize::{SkeletonConfig, Skeletonization, skeletonize};
pub use thin::{is_simple, thin};
