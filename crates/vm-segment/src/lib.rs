//! Vessel mask segmentation.
//!
//! A vesselness response is thresholded and then refined in a fixed order:
//! small enclosed holes are filled, small foreground specks are dropped and,
//! optionally, a 3x3 closing smooths the outline (followed by a second hole
//! fill). Every refinement step only ever adds pixels to a superset or removes
//! them from a subset of its input, so a stricter threshold never yields a
//! larger mask.

mod preprocess;
mod segment;
mod threshold;

pub use preprocess::{PreprocessConfig, preprocess};
pub use segment::{
    SegmentConfig, SegmentStages, SegmentWarning, Segmentation, Segmenter, segment, segment_response,
};
pub use threshold::{Threshold, percentile};
