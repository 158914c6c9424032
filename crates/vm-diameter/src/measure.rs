use log::debug;
use serde::Serialize;
use vm_core::{Error, Image, ImageView, Mask, Point2f, Vec2f, ensure_finite, ensure_same_dims};
use vm_graph::{EdgeId, Segment, VesselGraph};

use crate::config::{DiameterConfig, Method};
use crate::ray::{mask_crossing, refine_on_intensity, walk};
use crate::summary::DiameterSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleStatus {
    Valid,
    /// Both rays left the mask on their first step.
    Sliver,
    /// A ray reached `max_radius` without leaving the mask.
    Unbounded,
    /// The skeleton pixel itself is outside the mask.
    OffMask,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiameterSample {
    /// Position in the segment path.
    pub index: usize,
    /// Arc length from the start of the path.
    pub arc_position: f32,
    pub point: Point2f,
    /// Path pixels represented by this sample.
    pub span: usize,
    pub width: f32,
    pub status: SampleStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentDiameters {
    pub edge_id: EdgeId,
    pub samples: Vec<DiameterSample>,
    pub summary: DiameterSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiameterReport {
    /// One entry per graph segment, in segment id order.
    pub segments: Vec<SegmentDiameters>,
}

impl DiameterReport {
    pub fn measured(&self) -> impl Iterator<Item = &SegmentDiameters> {
        self.segments.iter().filter(|s| s.summary.is_measured())
    }

    pub fn unmeasured_ids(&self) -> Vec<EdgeId> {
        self.segments
            .iter()
            .filter(|s| !s.summary.is_measured())
            .map(|s| s.edge_id)
            .collect()
    }

    /// Mean of the per-segment mean widths.
    pub fn mean_width(&self) -> Option<f32> {
        let means: Vec<f32> = self.measured().filter_map(|s| s.summary.mean()).collect();
        if means.is_empty() {
            return None;
        }
        Some(means.iter().sum::<f32>() / means.len() as f32)
    }
}

/// Samples vessel widths along every segment of `graph`.
///
/// `mask` is the segmentation the skeleton was derived from. `intensity`,
/// when given, refines sub-pixel boundaries and must match the mask size.
pub fn measure(
    mask: &Mask,
    graph: &VesselGraph,
    cfg: &DiameterConfig,
    intensity: Option<&ImageView<'_, f32>>,
) -> Result<DiameterReport, Error> {
    cfg.validate()?;
    ensure_same_dims(mask.dims(), graph.dims())?;
    let intensity: Option<Image<f32>> = match intensity {
        Some(img) => {
            ensure_same_dims(mask.dims(), img.dims())?;
            let owned = img.to_image();
            ensure_finite("diameter intensity", owned.data())?;
            Some(owned)
        }
        None => None,
    };

    let ctx = Context {
        mask,
        mask_f32: mask.to_f32(),
        intensity,
        cfg,
    };
    let segments = ctx.measure_all(&graph.edges);

    debug!(
        "measure: {} segments, {} measured, method {:?}",
        segments.len(),
        segments.iter().filter(|s| s.summary.is_measured()).count(),
        cfg.method
    );

    Ok(DiameterReport { segments })
}

struct Context<'a> {
    mask: &'a Mask,
    mask_f32: Image<f32>,
    intensity: Option<Image<f32>>,
    cfg: &'a DiameterConfig,
}

impl Context<'_> {
    #[cfg(not(feature = "parallel"))]
    fn measure_all(&self, edges: &[Segment]) -> Vec<SegmentDiameters> {
        edges.iter().map(|e| self.measure_segment(e)).collect()
    }

    #[cfg(feature = "parallel")]
    fn measure_all(&self, edges: &[Segment]) -> Vec<SegmentDiameters> {
        use rayon::prelude::*;

        edges.par_iter().map(|e| self.measure_segment(e)).collect()
    }

    fn measure_segment(&self, edge: &Segment) -> SegmentDiameters {
        let path = &edge.path;
        let interval = self.cfg.interval;

        let mut arc = 0.0f32;
        let mut samples = Vec::with_capacity(path.len().div_ceil(interval));
        for (i, &(x, y)) in path.iter().enumerate() {
            if i > 0 {
                let (px, py) = path[i - 1];
                arc += Point2f::from_idx((px, py)).distance(Point2f::from_idx((x, y)));
            }
            if i % interval != 0 {
                continue;
            }

            let span = interval.min(path.len() - i);
            let point = Point2f::from_idx((x, y));
            let (width, status) = self.width_at(path, i);
            samples.push(DiameterSample {
                index: i,
                arc_position: arc,
                point,
                span,
                width,
                status,
            });
        }

        let widths: Vec<f32> = samples
            .iter()
            .filter(|s| s.status == SampleStatus::Valid)
            .map(|s| s.width)
            .collect();

        SegmentDiameters {
            edge_id: edge.id,
            summary: DiameterSummary::from_widths(&widths),
            samples,
        }
    }

    fn width_at(&self, path: &[(usize, usize)], i: usize) -> (f32, SampleStatus) {
        let (x, y) = path[i];
        if !self.mask.is_set(x, y) {
            return (0.0, SampleStatus::OffMask);
        }

        let origin = Point2f::from_idx((x, y));
        let normal = tangent(path, i, self.cfg.tangent_window).perp();

        let fwd = walk(self.mask, origin, normal, self.cfg.max_radius);
        let back = walk(self.mask, origin, -normal, self.cfg.max_radius);

        let width = match self.cfg.method {
            Method::NearestPixel => (fwd.steps + back.steps + 1) as f32,
            Method::SubPixelGradient => {
                self.boundary(origin, normal, fwd.steps) + self.boundary(origin, -normal, back.steps)
            }
        };

        let status = if fwd.exhausted || back.exhausted {
            SampleStatus::Unbounded
        } else if fwd.steps == 0 && back.steps == 0 {
            SampleStatus::Sliver
        } else {
            SampleStatus::Valid
        };
        (width, status)
    }

    fn boundary(&self, origin: Point2f, dir: Vec2f, steps: usize) -> f32 {
        let r = mask_crossing(&self.mask_f32.as_view(), origin, dir, steps);
        match &self.intensity {
            Some(img) => refine_on_intensity(&img.as_view(), origin, dir, r),
            None => r,
        }
    }
}

/// Unit tangent at path index `i` from a central difference over `window`
/// pixels on each side, clipped to the path ends.
fn tangent(path: &[(usize, usize)], i: usize, window: usize) -> Vec2f {
    let lo = i.saturating_sub(window);
    let hi = (i + window).min(path.len() - 1);
    let t = Point2f::from_idx(path[hi]) - Point2f::from_idx(path[lo]);
    let t = t.normalize();
    if t.norm() == 0.0 { Vec2f { x: 1.0, y: 0.0 } } else { t }
}
