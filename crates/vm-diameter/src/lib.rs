//! Cross-sectional vessel widths along skeleton segments.
//!
//! Each segment path is sampled every `interval` path pixels. The interval
//! counts pixels along the path, not arc length, so on a diagonal run samples
//! sit `interval * sqrt(2)` apart; `arc_position` records the true distance.
//! At a sample the local tangent is estimated from neighbouring path pixels
//! and rays are cast both ways along the normal until they leave the vessel
//! mask:
//! - [`Method::NearestPixel`] counts whole-pixel steps.
//! - [`Method::SubPixelGradient`] locates the mask boundary at the half-level
//!   crossing of the bilinearly sampled mask and, when an intensity image is
//!   supplied, moves it to the steepest intensity change nearby.

mod config;
mod measure;
mod ray;
mod summary;

pub use config::{DiameterConfig, Method};
pub use measure::{DiameterReport, DiameterSample, SampleStatus, SegmentDiameters, measure};
pub use summary::DiameterSummary;
