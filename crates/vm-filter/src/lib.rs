//! Multi-scale vesselness filter bank.
//!
//! Each operator is built from the scale-normalised 2D Hessian
//! (`sigma^2 * H`) of the Gaussian-smoothed image, computed with separable
//! Gaussian-derivative kernels and reflect-101 borders:
//! - [`FilterKind::Frangi`]: blobness-penalised structureness.
//! - [`FilterKind::Sato`]: cross-sectional curvature with an asymmetric
//!   along-axis penalty.
//! - [`FilterKind::Meijering`]: neuriteness from modified eigenvalues.
//! - [`FilterKind::Jerman`]: volume-ratio measure with a regularised
//!   eigenvalue, saturating at `1` on strong ridges.
//!
//! Scales come from two half-open sweeps ([`ScaleRange`]); in multi-scale
//! mode the per-pixel maximum over their union is kept. Inputs must be
//! finite: a NaN is reported as [`vm_core::Error::NumericAnomaly`].
//!
//! With the `parallel` feature the scales are evaluated on the rayon pool.
//! Results are identical to the serial path.

mod bank;
pub mod conv;
mod hessian;
mod kernels;
mod vesselness;

pub use bank::{FilterBank, FilterConfig, FilterResponse, ScaleRange, enhance};
pub use conv::gaussian_blur;
pub use hessian::{Hessian, eigenvalues_sym2};
pub use kernels::GaussianKernels;
pub use vesselness::{FilterKind, RidgeParams, ridge_response};
