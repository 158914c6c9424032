use log::debug;
use serde::{Deserialize, Serialize};
use vm_core::{Error, Image, ImageView, ensure_finite};
use vm_filter::gaussian_blur;
use vm_morph::median3x3_f32;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Gaussian sigma of the background estimate, pixels.
    pub background_sigma: f32,
    pub median: bool,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            background_sigma: 20.0,
            median: true,
        }
    }
}

impl PreprocessConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.background_sigma.is_finite() && self.background_sigma > 0.0) {
            return Err(Error::config("background_sigma must be > 0"));
        }
        Ok(())
    }
}

/// Flattens uneven illumination and suppresses salt noise.
///
/// The blurred background is subtracted and its mean added back so the
/// output stays on the input's intensity scale; negatives are clamped to 0.
pub fn preprocess(img: &ImageView<'_, f32>, cfg: &PreprocessConfig) -> Result<Image<f32>, Error> {
    cfg.validate()?;
    let src = img.to_image();
    ensure_finite("preprocess", src.data())?;
    if src.is_empty() {
        return Ok(src);
    }

    let background = gaussian_blur(&src, cfg.background_sigma);
    let mean = background.data().iter().map(|&v| v as f64).sum::<f64>()
        / background.data().len() as f64;
    let mean = mean as f32;

    let mut flat = src;
    for (v, &bg) in flat.data_mut().iter_mut().zip(background.data()) {
        *v = (*v - bg + mean).max(0.0);
    }
    debug!(
        "preprocess: {}x{} background mean {mean:.3}",
        flat.width(),
        flat.height()
    );

    Ok(if cfg.median { median3x3_f32(&flat) } else { flat })
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use vm_core::{Error, Image};

    use super::{PreprocessConfig, preprocess};

    #[test]
    fn flat_image_is_unchanged() {
        let img = Image::new_fill(24, 24, 7.5f32);
        let out = preprocess(&img.as_view(), &PreprocessConfig::default()).unwrap();
        for &v in out.data() {
            assert_abs_diff_eq!(v, 7.5, epsilon = 1e-3);
        }
    }

    #[test]
    fn removes_linear_ramp() {
        let w = 64;
        let mut data = Vec::with_capacity(w * w);
        for _y in 0..w {
            for x in 0..w {
                data.push(10.0 + x as f32 * 0.5);
            }
        }
        let img = Image::from_vec(w, w, data).unwrap();
        let cfg = PreprocessConfig {
            background_sigma: 4.0,
            median: false,
        };
        let out = preprocess(&img.as_view(), &cfg).unwrap();

        // Away from the border the ramp is absorbed by the background.
        let a = *out.get(24, 32).unwrap();
        let b = *out.get(40, 32).unwrap();
        assert_abs_diff_eq!(a, b, epsilon = 1e-2);
    }

    #[test]
    fn output_is_non_negative() {
        let mut img = Image::new_fill(16, 16, 0.0f32);
        img.set(8, 8, 100.0);
        let out = preprocess(&img.as_view(), &PreprocessConfig::default()).unwrap();
        assert!(out.data().iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn rejects_non_finite_input() {
        let mut img = Image::new_fill(4, 4, 1.0f32);
        img.set(1, 2, f32::INFINITY);
        let err = preprocess(&img.as_view(), &PreprocessConfig::default()).unwrap_err();
        assert_eq!(
            err,
            Error::NumericAnomaly {
                stage: "preprocess",
                index: 9
            }
        );
    }
}
