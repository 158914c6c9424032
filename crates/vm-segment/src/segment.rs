use log::{debug, warn};
use serde::{Deserialize, Serialize};
use vm_core::{Error, Image, ImageView, Mask, ensure_finite};
use vm_filter::{FilterBank, FilterConfig, FilterResponse};
use vm_morph::{close3x3, fill_holes, remove_small_objects};

use crate::preprocess::{PreprocessConfig, preprocess};
use crate::threshold::Threshold;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    pub threshold: Threshold,
    /// Enclosed background regions smaller than this are filled.
    pub hole_size: usize,
    /// Foreground objects smaller than this are removed.
    pub speckle_size: usize,
    /// Apply a 3x3 closing after speckle removal.
    pub close: bool,
    pub preprocess: bool,
    pub preprocess_params: PreprocessConfig,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            threshold: Threshold::default(),
            hole_size: 50,
            speckle_size: 500,
            close: true,
            preprocess: true,
            preprocess_params: PreprocessConfig::default(),
        }
    }
}

impl SegmentConfig {
    pub fn validate(&self) -> Result<(), Error> {
        self.threshold.validate()?;
        if self.preprocess {
            self.preprocess_params.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentWarning {
    /// Nothing survived thresholding and refinement.
    EmptyMask,
    /// Every pixel was above the threshold.
    AllForeground,
}

#[derive(Debug, Clone)]
pub struct Segmentation {
    pub mask: Mask,
    /// Response value the mask was cut at.
    pub threshold: f32,
    pub warnings: Vec<SegmentWarning>,
}

/// Thresholds a vesselness response and refines the resulting mask.
pub fn segment_response(resp: &FilterResponse, cfg: &SegmentConfig) -> Result<Segmentation, Error> {
    cfg.validate()?;
    let values = resp.response.data();
    ensure_finite("segment", values)?;

    let t = cfg.threshold.resolve(values);
    let raw = resp.response.map(|&v| v > t);
    let raw_count = raw.count_set();

    let mut warnings = Vec::new();
    if !raw.is_empty() && raw_count == raw.data().len() {
        warn!("segment: every pixel exceeds threshold {t}");
        warnings.push(SegmentWarning::AllForeground);
    }

    let mut mask = fill_holes(&raw, cfg.hole_size);
    mask = remove_small_objects(&mask, cfg.speckle_size);
    if cfg.close {
        mask = close3x3(&mask);
        mask = fill_holes(&mask, cfg.hole_size);
    }

    let count = mask.count_set();
    debug!(
        "segment: threshold {t:.4}, {raw_count} px above, {count} px after refinement"
    );
    if count == 0 {
        warn!("segment: empty vessel mask");
        warnings.push(SegmentWarning::EmptyMask);
    }

    Ok(Segmentation {
        mask,
        threshold: t,
        warnings,
    })
}

/// Intermediate images of one [`Segmenter::run`].
#[derive(Debug, Clone)]
pub struct SegmentStages {
    /// Image the filter bank saw (after preprocessing, when enabled).
    pub input: Image<f32>,
    pub response: FilterResponse,
    pub segmentation: Segmentation,
}

/// Validated preprocessing, filter and threshold settings.
#[derive(Debug, Clone)]
pub struct Segmenter {
    config: SegmentConfig,
    bank: FilterBank,
}

impl Segmenter {
    pub fn new(config: &SegmentConfig, filter: &FilterConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            bank: FilterBank::new(filter)?,
        })
    }

    pub fn config(&self) -> &SegmentConfig {
        &self.config
    }

    pub fn bank(&self) -> &FilterBank {
        &self.bank
    }

    /// Flattens the background when preprocessing is enabled; otherwise
    /// returns a copy of `img`.
    pub fn prepare(&self, img: &ImageView<'_, f32>) -> Result<Image<f32>, Error> {
        if self.config.preprocess {
            preprocess(img, &self.config.preprocess_params)
        } else {
            Ok(img.to_image())
        }
    }

    /// Runs preprocessing, the filter bank and thresholding, keeping every
    /// intermediate image.
    pub fn run(&self, img: &ImageView<'_, f32>) -> Result<SegmentStages, Error> {
        let input = self.prepare(img)?;
        let response = self.bank.enhance(&input.as_view())?;
        let segmentation = segment_response(&response, &self.config)?;
        Ok(SegmentStages {
            input,
            response,
            segmentation,
        })
    }

    /// Runs preprocessing (when enabled), the filter bank and thresholding.
    pub fn segment(&self, img: &ImageView<'_, f32>) -> Result<Segmentation, Error> {
        self.run(img).map(|stages| stages.segmentation)
    }
}

/// One-shot convenience over [`Segmenter`].
pub fn segment(
    img: &ImageView<'_, f32>,
    cfg: &SegmentConfig,
    filter: &FilterConfig,
) -> Result<Segmentation, Error> {
    Segmenter::new(cfg, filter)?.segment(img)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use vm_core::{Error, Image};
    use vm_filter::{FilterConfig, FilterResponse};

    use super::{SegmentConfig, SegmentWarning, Segmenter, segment, segment_response};
    use crate::preprocess::preprocess;
    use crate::threshold::Threshold;

    fn response_from(w: usize, h: usize, data: Vec<f32>) -> FilterResponse {
        FilterResponse {
            response: Image::from_vec(w, h, data).unwrap(),
            best_scale: Image::new_fill(w, h, 1.0),
            scales: vec![1.0],
        }
    }

    fn loose(threshold: Threshold) -> SegmentConfig {
        SegmentConfig {
            threshold,
            hole_size: 0,
            speckle_size: 0,
            close: false,
            preprocess: false,
            ..SegmentConfig::default()
        }
    }

    #[test]
    fn absolute_threshold_is_strict() {
        let resp = response_from(3, 1, vec![0.1, 0.5, 0.9]);
        let seg = segment_response(&resp, &loose(Threshold::Absolute(0.5))).unwrap();
        assert_eq!(seg.mask.data(), &[false, false, true]);
        assert!(seg.warnings.is_empty());
    }

    #[test]
    fn all_background_yields_empty_mask_warning() {
        let resp = response_from(4, 4, vec![0.0; 16]);
        let seg = segment_response(&resp, &SegmentConfig::default()).unwrap();
        assert_eq!(seg.mask.count_set(), 0);
        assert_eq!(seg.warnings, vec![SegmentWarning::EmptyMask]);
    }

    #[test]
    fn all_foreground_is_kept_with_warning() {
        let resp = response_from(4, 4, vec![1.0; 16]);
        let seg = segment_response(&resp, &loose(Threshold::Absolute(0.5))).unwrap();
        assert_eq!(seg.mask.count_set(), 16);
        assert_eq!(seg.warnings, vec![SegmentWarning::AllForeground]);
    }

    #[test]
    fn specks_removed_and_holes_filled() {
        let (w, h) = (20, 12);
        let mut data = vec![0.0f32; w * h];
        // 7x7 block with a one-pixel hole.
        for y in 2..9 {
            for x in 2..9 {
                data[y * w + x] = 1.0;
            }
        }
        data[5 * w + 5] = 0.0;
        // Isolated speck.
        data[6 * w + 15] = 1.0;

        let cfg = SegmentConfig {
            threshold: Threshold::Absolute(0.5),
            hole_size: 5,
            speckle_size: 10,
            close: false,
            preprocess: false,
            ..SegmentConfig::default()
        };
        let seg = segment_response(&response_from(w, h, data), &cfg).unwrap();
        assert!(seg.mask.is_set(5, 5));
        assert!(!seg.mask.is_set(15, 6));
        assert_eq!(seg.mask.count_set(), 49);
    }

    #[test]
    fn invalid_percentile_is_configuration_error() {
        let resp = response_from(2, 2, vec![0.0; 4]);
        let err = segment_response(&resp, &loose(Threshold::Percentile(120.0))).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn nan_response_is_numeric_anomaly() {
        let resp = response_from(2, 1, vec![0.0, f32::NAN]);
        let err = segment_response(&resp, &loose(Threshold::Absolute(0.5))).unwrap_err();
        assert_eq!(
            err,
            Error::NumericAnomaly {
                stage: "segment",
                index: 1
            }
        );
    }

    #[test]
    fn end_to_end_finds_bright_bar() {
        let (w, h) = (48, 32);
        let mut img = Image::new_fill(w, h, 0.0f32);
        for y in 14..18 {
            for x in 4..44 {
                img.set(x, y, 1.0);
            }
        }
        let cfg = SegmentConfig {
            threshold: Threshold::Percentile(90.0),
            speckle_size: 20,
            preprocess: false,
            ..SegmentConfig::default()
        };
        let filter = FilterConfig {
            multi_scale: false,
            ..FilterConfig::default()
        };
        let seg = segment(&img.as_view(), &cfg, &filter).unwrap();
        assert!(seg.mask.is_set(24, 15));
        assert!(!seg.mask.is_set(24, 2));
    }

    #[test]
    fn stages_keep_preprocessed_input_and_response() {
        let (w, h) = (40, 24);
        let mut img = Image::new_fill(w, h, 0.0f32);
        for y in 0..h {
            for x in 0..w {
                let bar = if (10..14).contains(&y) { 1.0 } else { 0.0 };
                img.set(x, y, bar + 0.01 * x as f32);
            }
        }
        let cfg = SegmentConfig {
            speckle_size: 20,
            ..SegmentConfig::default()
        };
        let filter = FilterConfig {
            multi_scale: false,
            ..FilterConfig::default()
        };
        let segmenter = Segmenter::new(&cfg, &filter).unwrap();

        let stages = segmenter.run(&img.as_view()).unwrap();
        let flat = preprocess(&img.as_view(), &cfg.preprocess_params).unwrap();
        assert_eq!(stages.input, flat);
        assert_eq!(stages.response.dims(), (w, h));
        assert_eq!(stages.response.scales, segmenter.bank().scales().to_vec());

        let seg = segmenter.segment(&img.as_view()).unwrap();
        assert_eq!(seg.mask, stages.segmentation.mask);
        assert_eq!(seg.threshold, stages.segmentation.threshold);

        let raw = Segmenter::new(&SegmentConfig { preprocess: false, ..cfg }, &filter).unwrap();
        assert_eq!(raw.prepare(&img.as_view()).unwrap(), img);
    }

    proptest! {
        #[test]
        fn raising_percentile_never_grows_mask(
            values in proptest::collection::vec(0.0f32..1.0, 100),
            p in 0.0f32..90.0,
            dp in 0.0f32..10.0,
        ) {
            let resp = response_from(10, 10, values);
            let base = SegmentConfig {
                hole_size: 6,
                speckle_size: 3,
                close: true,
                preprocess: false,
                ..SegmentConfig::default()
            };
            let lo = segment_response(&resp, &SegmentConfig { threshold: Threshold::Percentile(p), ..base.clone() }).unwrap();
            let hi = segment_response(&resp, &SegmentConfig { threshold: Threshold::Percentile(p + dp), ..base }).unwrap();
            prop_assert!(hi.mask.count_set() <= lo.mask.count_set());
        }
    }
}
