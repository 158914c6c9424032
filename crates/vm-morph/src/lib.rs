//! Binary morphology helpers for vessel masks.
//!
//! Masks are `Image<bool>`. Foreground connectivity is 8-neighbour by
//! default; holes are background components under 4-connectivity (the dual
//! of 8-connected foreground), so a diagonal gap in a vessel wall does not
//! open a hole to the outside.

mod components;
mod ops;

pub use components::{Components, Connectivity, fill_holes, label_components, remove_small_objects};
pub use ops::{close3x3, dilate3x3, erode3x3, median3x3_f32};
