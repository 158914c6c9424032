//! Foundational primitives for vessel network extraction.
//!
//! ## Images and masks
//! [`Image`] is an owned row-major buffer; [`ImageView`] borrows one with an
//! element stride, so padded buffers from external loaders can be used
//! without copying. Binary masks and skeletons are `Image<bool>` ([`Mask`]).
//!
//! ## Coordinates
//! Integer `(x, y)` refers to the centre of pixel `(x, y)`. Bilinear sampling
//! uses the floor-based 2x2 neighbourhood, so the boundary between a set and
//! an unset pixel of a mask sits half way between their centres.
//!
//! ## Errors
//! Every stage reports failures through [`Error`]. Configuration and shape
//! errors are raised before any computation starts.

mod border;
mod error;
mod geom;
mod image;
mod sample;

pub use border::{BorderMode, map_index};
pub use error::{Error, Result, ensure_finite, ensure_same_dims};
pub use geom::{Point2f, Vec2f};
pub use image::{Image, ImageView, Mask};
pub use sample::{sample_bilinear_f32, sample_mask_nearest};
