use log::debug;
use serde::{Deserialize, Serialize};
use vm_core::{Error, Image, ImageView, ensure_finite};

use crate::hessian::Hessian;
use crate::vesselness::{FilterKind, RidgeParams, ridge_response};

/// Half-open scale sweep `start, start + step, ...` strictly below `stop`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleRange {
    pub start: f32,
    pub stop: f32,
    pub step: f32,
}

impl ScaleRange {
    pub fn new(start: f32, stop: f32, step: f32) -> Self {
        Self { start, stop, step }
    }

    pub fn validate(&self, name: &str) -> Result<(), Error> {
        if !(self.start.is_finite() && self.stop.is_finite() && self.step.is_finite()) {
            return Err(Error::config(format!("{name}: scale bounds must be finite")));
        }
        if self.start <= 0.0 {
            return Err(Error::config(format!(
                "{name}: scales must be > 0, got start {}",
                self.start
            )));
        }
        if self.step <= 0.0 {
            return Err(Error::config(format!(
                "{name}: step must be > 0, got {}",
                self.step
            )));
        }
        if self.stop <= self.start {
            return Err(Error::config(format!(
                "{name}: empty scale range [{}, {})",
                self.start, self.stop
            )));
        }
        Ok(())
    }

    /// Number of scales in the sweep; `0` for invalid ranges, saturating at
    /// `usize::MAX` when the count does not fit.
    pub fn len(&self) -> usize {
        if self.validate("range").is_err() {
            return 0;
        }
        let raw = ((f64::from(self.stop) - f64::from(self.start)) / f64::from(self.step)).ceil();
        if !raw.is_finite() || raw >= usize::MAX as f64 {
            return usize::MAX;
        }
        let mut n = raw.max(0.0) as usize;
        // `start + (n - 1) * step` can round onto `stop`; one step back suffices.
        for _ in 0..2 {
            if n > 0 && self.at(n - 1) >= self.stop - 1e-6 {
                n -= 1;
            }
        }
        n
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn values(&self) -> Vec<f32> {
        (0..self.len()).map(|i| self.at(i)).collect()
    }

    fn at(&self, i: usize) -> f32 {
        self.start + i as f32 * self.step
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub kind: FilterKind,
    /// Small-scale sweep for thin vessels.
    pub scales1: ScaleRange,
    /// Large-scale sweep for thick vessels.
    pub scales2: ScaleRange,
    pub multi_scale: bool,
    /// Detect dark vessels on a bright background.
    pub black_ridges: bool,
    pub frangi_beta: f32,
    pub frangi_gamma: Option<f32>,
    pub jerman_tau: f32,
    /// Upper bound on the number of evaluated scales.
    pub max_scales: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            kind: FilterKind::Frangi,
            scales1: ScaleRange::new(1.0, 8.0, 1.0),
            scales2: ScaleRange::new(10.0, 20.0, 5.0),
            multi_scale: true,
            black_ridges: false,
            frangi_beta: 0.5,
            frangi_gamma: None,
            jerman_tau: 0.75,
            max_scales: 64,
        }
    }
}

impl FilterConfig {
    pub fn validate(&self) -> Result<(), Error> {
        self.scales1.validate("scales1")?;
        if self.multi_scale {
            self.scales2.validate("scales2")?;
        }
        if !(self.frangi_beta.is_finite() && self.frangi_beta > 0.0) {
            return Err(Error::config("frangi_beta must be > 0"));
        }
        if let Some(g) = self.frangi_gamma
            && !(g.is_finite() && g > 0.0)
        {
            return Err(Error::config("frangi_gamma must be > 0 when set"));
        }
        if !(self.jerman_tau.is_finite() && self.jerman_tau > 0.0 && self.jerman_tau <= 1.0) {
            return Err(Error::config("jerman_tau must be in (0, 1]"));
        }

        // Bound each sweep before materialising the union.
        let sweeps = [("scales1", &self.scales1), ("scales2", &self.scales2)];
        for (name, range) in sweeps.into_iter().take(if self.multi_scale { 2 } else { 1 }) {
            let n = range.len();
            if n > self.max_scales {
                return Err(Error::config(format!(
                    "{name}: {} scales requested, limit is {}",
                    if n == usize::MAX { "too many".to_string() } else { n.to_string() },
                    self.max_scales
                )));
            }
        }
        let n = self.scales().len();
        if n > self.max_scales {
            return Err(Error::config(format!(
                "{n} scales requested, limit is {}",
                self.max_scales
            )));
        }
        Ok(())
    }

    /// Scales evaluated by the bank, ascending.
    ///
    /// Multi-scale mode uses the de-duplicated union of both sweeps; otherwise
    /// the median of `scales1` stands in for the whole sweep.
    pub fn scales(&self) -> Vec<f32> {
        if !self.multi_scale {
            let n = self.scales1.len();
            return if n == 0 {
                Vec::new()
            } else {
                vec![self.scales1.at((n - 1) / 2)]
            };
        }

        let mut all = self.scales1.values();
        all.extend(self.scales2.values());
        all.sort_by(f32::total_cmp);
        all.dedup_by(|a, b| (*a - *b).abs() < 1e-6);
        all
    }

    fn ridge_params(&self) -> RidgeParams {
        RidgeParams {
            black_ridges: self.black_ridges,
            frangi_beta: self.frangi_beta,
            frangi_gamma: self.frangi_gamma,
            jerman_tau: self.jerman_tau,
        }
    }
}

/// Per-pixel vesselness and the scale that produced it.
#[derive(Debug, Clone)]
pub struct FilterResponse {
    pub response: Image<f32>,
    pub best_scale: Image<f32>,
    pub scales: Vec<f32>,
}

impl FilterResponse {
    pub fn dims(&self) -> (usize, usize) {
        self.response.dims()
    }
}

/// Validated filter configuration, reusable across images.
#[derive(Debug, Clone)]
pub struct FilterBank {
    kind: FilterKind,
    scales: Vec<f32>,
    params: RidgeParams,
}

impl FilterBank {
    pub fn new(cfg: &FilterConfig) -> Result<Self, Error> {
        cfg.validate()?;
        Ok(Self {
            kind: cfg.kind,
            scales: cfg.scales(),
            params: cfg.ridge_params(),
        })
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    pub fn scales(&self) -> &[f32] {
        &self.scales
    }

    /// Runs every scale and keeps the per-pixel maximum.
    ///
    /// Ties keep the smaller scale. Fails with [`Error::NumericAnomaly`] if
    /// the input holds a non-finite value.
    pub fn enhance(&self, img: &ImageView<'_, f32>) -> Result<FilterResponse, Error> {
        let src = img.to_image();
        ensure_finite("filter input", src.data())?;

        let (w, h) = src.dims();
        let mut response = Image::new_fill(w, h, 0.0f32);
        let mut best_scale = Image::new_fill(w, h, self.scales.first().copied().unwrap_or(0.0));
        if w == 0 || h == 0 {
            return Ok(FilterResponse {
                response,
                best_scale,
                scales: self.scales.clone(),
            });
        }

        let per_scale = self.evaluate_scales(&src);
        for (&sigma, values) in self.scales.iter().zip(&per_scale) {
            ensure_finite("filter response", values)?;
            for ((r, s), &v) in response
                .data_mut()
                .iter_mut()
                .zip(best_scale.data_mut().iter_mut())
                .zip(values)
            {
                if v > *r {
                    *r = v;
                    *s = sigma;
                }
            }
        }

        debug!(
            "filter bank {}: {}x{} over {} scales, peak {:.4}",
            self.kind.name(),
            w,
            h,
            self.scales.len(),
            response.data().iter().copied().fold(0.0f32, f32::max)
        );

        Ok(FilterResponse {
            response,
            best_scale,
            scales: self.scales.clone(),
        })
    }

    #[cfg(not(feature = "parallel"))]
    fn evaluate_scales(&self, src: &Image<f32>) -> Vec<Vec<f32>> {
        self.scales
            .iter()
            .map(|&sigma| self.evaluate_scale(src, sigma))
            .collect()
    }

    #[cfg(feature = "parallel")]
    fn evaluate_scales(&self, src: &Image<f32>) -> Vec<Vec<f32>> {
        use rayon::prelude::*;

        self.scales
            .par_iter()
            .map(|&sigma| self.evaluate_scale(src, sigma))
            .collect()
    }

    fn evaluate_scale(&self, src: &Image<f32>, sigma: f32) -> Vec<f32> {
        let hessian = Hessian::compute(src, sigma);
        ridge_response(self.kind, &hessian, &self.params)
    }
}

/// One-shot convenience over [`FilterBank`].
pub fn enhance(img: &ImageView<'_, f32>, cfg: &FilterConfig) -> Result<FilterResponse, Error> {
    FilterBank::new(cfg)?.enhance(img)
}
