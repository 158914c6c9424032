//! Umbrella crate for the vessel-metrics workspace.
//!
//! Re-exports the stage crates and adds the end-to-end [`Pipeline`] together
//! with network-level measurements (length, density, branch-point density).
//!
//! ```no_run
//! use vessel_metrics::{Image, Pipeline, PipelineConfig};
//!
//! # fn main() -> Result<(), vessel_metrics::Error> {
//! let img = Image::new_fill(256, 256, 0.0f32);
//! let report = Pipeline::new(PipelineConfig::default())?.run(&img.as_view())?;
//! println!("network length: {} px", report.metrics.network_length_px);
//! # Ok(())
//! # }
//! ```

pub mod metrics;
mod pipeline;
mod warning;

pub use metrics::{
    BranchpointDensity, DensityMap, NetworkMetrics, PixelSize, branchpoint_density,
    network_length, vessel_density,
};
pub use pipeline::{MaskAnalysis, Pipeline, PipelineConfig, PipelineReport};
pub use warning::Warning;

pub use vm_core::*;
pub use vm_diameter::{
    DiameterConfig, DiameterReport, DiameterSample, DiameterSummary, Method, SampleStatus,
    SegmentDiameters, measure,
};
pub use vm_filter::{FilterBank, FilterConfig, FilterKind, FilterResponse, ScaleRange, enhance};
pub use vm_graph::{
    EdgeId, GraphComponent, Node, NodeId, NodeKind, Segment, VesselGraph, build_graph, tortuosity,
};
pub use vm_morph::{Components, Connectivity, fill_holes, label_components, remove_small_objects};
pub use vm_segment::{
    PreprocessConfig, SegmentConfig, SegmentStages, SegmentWarning, Segmentation, Segmenter, Threshold,
    preprocess, segment, segment_response,
};
pub use vm_skeleton::{SkeletonConfig, Skeletonization, skeletonize, thin};
