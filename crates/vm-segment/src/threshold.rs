use serde::{Deserialize, Serialize};
use vm_core::Error;

/// How the vesselness response is cut into foreground and background.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Threshold {
    /// Percentile of the response values, in `[0, 100]`.
    Percentile(f32),
    /// Absolute response value.
    Absolute(f32),
}

impl Default for Threshold {
    fn default() -> Self {
        Threshold::Percentile(60.0)
    }
}

impl Threshold {
    pub fn validate(&self) -> Result<(), Error> {
        match *self {
            Threshold::Percentile(p) if !(0.0..=100.0).contains(&p) => Err(Error::config(
                format!("percentile threshold must be in [0, 100], got {p}"),
            )),
            Threshold::Absolute(v) if !v.is_finite() => {
                Err(Error::config("absolute threshold must be finite"))
            }
            _ => Ok(()),
        }
    }

    /// Cut-off value for `values`. Pixels strictly above it are foreground.
    pub fn resolve(&self, values: &[f32]) -> f32 {
        match *self {
            Threshold::Percentile(p) => percentile(values, p),
            Threshold::Absolute(v) => v,
        }
    }
}

/// Percentile with linear interpolation between order statistics.
///
/// Returns `0.0` for an empty slice. NaN values must be filtered beforehand.
pub fn percentile(values: &[f32], p: f32) -> f32 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f32::total_cmp);

    let rank = (p.clamp(0.0, 100.0) as f64 / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = (rank - lo as f64) as f32;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
