use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use vm_core::{Error, Image, ImageView, Mask};
use vm_diameter::{DiameterConfig, DiameterReport, measure};
use vm_filter::{FilterConfig, FilterResponse};
use vm_graph::VesselGraph;
use vm_segment::{SegmentConfig, SegmentStages, SegmentWarning, Segmenter};
use vm_skeleton::{SkeletonConfig, skeletonize};

use crate::metrics::{DensityMap, NetworkMetrics, PixelSize, vessel_density};
use crate::warning::Warning;

/// Every stage setting of one run. All fields default to the reference
/// analysis settings, so a partial JSON document is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub filter: FilterConfig,
    pub segment: SegmentConfig,
    pub skeleton: SkeletonConfig,
    pub diameter: DiameterConfig,
    pub density_tiles_x: usize,
    pub density_tiles_y: usize,
    pub pixel_size: PixelSize,
    /// Pass the (preprocessed) image to the diameter stage for sub-pixel
    /// boundary refinement.
    pub refine_on_intensity: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            filter: FilterConfig::default(),
            segment: SegmentConfig::default(),
            skeleton: SkeletonConfig::default(),
            diameter: DiameterConfig::default(),
            density_tiles_x: 16,
            density_tiles_y: 16,
            pixel_size: PixelSize::default(),
            refine_on_intensity: true,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), Error> {
        self.filter.validate()?;
        self.segment.validate()?;
        self.skeleton.validate()?;
        self.diameter.validate()?;
        self.pixel_size.validate()?;
        if self.density_tiles_x == 0 || self.density_tiles_y == 0 {
            return Err(Error::config("density tile counts must be >= 1"));
        }
        Ok(())
    }
}

/// Everything produced by one run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Image the filter bank saw (after preprocessing, when enabled).
    pub input: Image<f32>,
    pub response: FilterResponse,
    pub threshold: f32,
    pub mask: Mask,
    pub skeleton: Mask,
    pub graph: VesselGraph,
    pub diameters: DiameterReport,
    pub density: DensityMap,
    pub metrics: NetworkMetrics,
    pub warnings: Vec<Warning>,
}

/// Skeleton, diameters and metrics of one vessel mask.
#[derive(Debug, Clone)]
pub struct MaskAnalysis {
    pub skeleton: Mask,
    pub graph: VesselGraph,
    pub diameters: DiameterReport,
    pub density: DensityMap,
    pub metrics: NetworkMetrics,
    pub warnings: Vec<Warning>,
}

/// Validated analysis pipeline, reusable across images.
#[derive(Debug, Clone)]
pub struct Pipeline {
    cfg: PipelineConfig,
    segmenter: Segmenter,
}

impl Pipeline {
    pub fn new(cfg: PipelineConfig) -> Result<Self, Error> {
        cfg.validate()?;
        let segmenter = Segmenter::new(&cfg.segment, &cfg.filter)?;
        Ok(Self { cfg, segmenter })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.cfg
    }

    pub fn segmenter(&self) -> &Segmenter {
        &self.segmenter
    }

    /// Runs segmentation, skeletonisation, diameter measurement and network
    /// metrics on a single grayscale image.
    pub fn run(&self, img: &ImageView<'_, f32>) -> Result<PipelineReport, Error> {
        info!("pipeline: {}x{} image", img.width(), img.height());

        let SegmentStages {
            input,
            response,
            segmentation,
        } = self.segmenter.run(img)?;
        debug!(
            "pipeline: mask {} px at threshold {:.4}",
            segmentation.mask.count_set(),
            segmentation.threshold
        );

        let intensity = self.cfg.refine_on_intensity.then(|| input.as_view());
        let analysis = self.analyse_mask(&segmentation.mask, intensity.as_ref())?;

        let mut warnings: Vec<Warning> = segmentation
            .warnings
            .iter()
            .map(|w| match w {
                SegmentWarning::EmptyMask => Warning::EmptyMask,
                SegmentWarning::AllForeground => Warning::AllForegroundMask,
            })
            .collect();
        warnings.extend(analysis.warnings);
        for w in &warnings {
            warn!("pipeline: {w}");
        }
        let metrics = analysis.metrics;
        info!(
            "pipeline: {} segments, {} branch points, length {:.1} px, density {:.4}",
            metrics.segments,
            metrics.branchpoints.branch_points,
            metrics.network_length_px,
            metrics.vessel_density
        );

        Ok(PipelineReport {
            input,
            response,
            threshold: segmentation.threshold,
            mask: segmentation.mask,
            skeleton: analysis.skeleton,
            graph: analysis.graph,
            diameters: analysis.diameters,
            density: analysis.density,
            metrics,
            warnings,
        })
    }

    /// Skeletonises and measures an already segmented mask.
    ///
    /// `intensity`, when given, refines diameter boundaries and must match
    /// the mask size.
    pub fn analyse_mask(
        &self,
        mask: &Mask,
        intensity: Option<&ImageView<'_, f32>>,
    ) -> Result<MaskAnalysis, Error> {
        let cfg = &self.cfg;
        let mut warnings = Vec::new();

        let skel = skeletonize(mask, &cfg.skeleton)?;
        if !skel.converged {
            warnings.push(Warning::SkeletonNotConverged {
                iterations: skel.iterations,
            });
        }
        warnings.extend(skel.graph.iter_isolated().map(|n| Warning::IsolatedPixel {
            x: n.idx.0,
            y: n.idx.1,
        }));

        let diameters = measure(mask, &skel.graph, &cfg.diameter, intensity)?;
        warnings.extend(
            diameters
                .unmeasured_ids()
                .into_iter()
                .map(|edge_id| Warning::UnmeasuredSegment { edge_id }),
        );

        let density = vessel_density(mask, cfg.density_tiles_x, cfg.density_tiles_y)?;
        let metrics =
            NetworkMetrics::compute(&skel.graph, mask, &diameters, &density, cfg.pixel_size);

        Ok(MaskAnalysis {
            skeleton: skel.skeleton,
            graph: skel.graph,
            diameters,
            density,
            metrics,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use vm_core::Error;
    use vm_filter::ScaleRange;

    use super::{Pipeline, PipelineConfig};

    #[test]
    fn invalid_config_fails_before_running() {
        let mut cfg = PipelineConfig::default();
        cfg.filter.scales1 = ScaleRange::new(3.0, 1.0, 1.0);
        assert!(matches!(Pipeline::new(cfg), Err(Error::Configuration(_))));

        let cfg = PipelineConfig {
            density_tiles_x: 0,
            ..PipelineConfig::default()
        };
        assert!(matches!(Pipeline::new(cfg), Err(Error::Configuration(_))));
    }

    #[test]
    fn partial_json_config_uses_defaults() {
        let cfg: PipelineConfig = serde_json::from_str(
            r#"{
                "filter": { "kind": "jerman", "multi_scale": false },
                "segment": { "threshold": { "absolute": 0.2 }, "speckle_size": 30 },
                "diameter": { "interval": 4, "method": "sub_pixel_gradient" }
            }"#,
        )
        .unwrap();

        assert_eq!(cfg.filter.kind, vm_filter::FilterKind::Jerman);
        assert!(!cfg.filter.multi_scale);
        assert_eq!(cfg.segment.speckle_size, 30);
        assert_eq!(cfg.segment.hole_size, 50);
        assert_eq!(cfg.diameter.interval, 4);
        assert_eq!(cfg.diameter.method, vm_diameter::Method::SubPixelGradient);
        assert_eq!(cfg.density_tiles_x, 16);
        assert!(cfg.validate().is_ok());
    }
}
