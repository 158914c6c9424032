//! Network-level measurements over a segmented and skeletonised image.

use serde::{Deserialize, Serialize};
use vm_core::{Error, Mask};
use vm_diameter::DiameterReport;
use vm_graph::VesselGraph;

/// Physical pixel pitch in micrometres. The default of 1.0 keeps results in
/// pixel units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PixelSize {
    pub x: f32,
    pub y: f32,
}

impl Default for PixelSize {
    fn default() -> Self {
        Self { x: 1.0, y: 1.0 }
    }
}

impl PixelSize {
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.x.is_finite() && self.x > 0.0 && self.y.is_finite() && self.y > 0.0) {
            return Err(Error::config("pixel size must be > 0"));
        }
        Ok(())
    }

    /// Isotropic pitch used for lengths: the mean of both axes.
    pub fn mean(&self) -> f32 {
        0.5 * (self.x + self.y)
    }

    pub fn length(&self, px: f32) -> f32 {
        px * self.mean()
    }
}

/// Sum of segment arc lengths, pixels.
pub fn network_length(graph: &VesselGraph) -> f32 {
    graph.edges.iter().map(|e| e.length).sum()
}

/// Foreground fraction per tile and over the whole image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DensityMap {
    pub tiles_x: usize,
    pub tiles_y: usize,
    /// Row-major, `tiles_x * tiles_y` values in `[0, 1]`.
    pub tiles: Vec<f32>,
    pub overall: f32,
}

impl DensityMap {
    pub fn tile(&self, tx: usize, ty: usize) -> Option<f32> {
        if tx >= self.tiles_x || ty >= self.tiles_y {
            return None;
        }
        self.tiles.get(ty * self.tiles_x + tx).copied()
    }
}

/// Splits the mask into a `tiles_x` by `tiles_y` grid and reports the vessel
/// area fraction of each tile. Tile edges are spread as evenly as integer
/// pixel bounds allow; empty tiles report 0.
pub fn vessel_density(mask: &Mask, tiles_x: usize, tiles_y: usize) -> Result<DensityMap, Error> {
    if tiles_x == 0 || tiles_y == 0 {
        return Err(Error::config("density tile counts must be >= 1"));
    }

    let (w, h) = mask.dims();
    let mut tiles = Vec::with_capacity(tiles_x * tiles_y);
    for ty in 0..tiles_y {
        let (y0, y1) = (ty * h / tiles_y, (ty + 1) * h / tiles_y);
        for tx in 0..tiles_x {
            let (x0, x1) = (tx * w / tiles_x, (tx + 1) * w / tiles_x);
            let area = (x1 - x0) * (y1 - y0);
            if area == 0 {
                tiles.push(0.0);
                continue;
            }
            let set = (y0..y1)
                .map(|y| mask.row(y)[x0..x1].iter().filter(|&&v| v).count())
                .sum::<usize>();
            tiles.push(set as f32 / area as f32);
        }
    }

    let overall = if mask.is_empty() {
        0.0
    } else {
        mask.count_set() as f32 / mask.data().len() as f32
    };

    Ok(DensityMap {
        tiles_x,
        tiles_y,
        tiles,
        overall,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BranchpointDensity {
    pub branch_points: usize,
    /// Branch points per vessel pixel; 0 for an empty mask.
    pub per_vessel_pixel: f32,
    /// Branch points per image pixel.
    pub per_image_pixel: f32,
}

pub fn branchpoint_density(graph: &VesselGraph, mask: &Mask) -> BranchpointDensity {
    let branch_points = graph.num_branches();
    let vessel = mask.count_set();
    let total = mask.data().len();
    let ratio = |n: usize| if n == 0 { 0.0 } else { branch_points as f32 / n as f32 };

    BranchpointDensity {
        branch_points,
        per_vessel_pixel: ratio(vessel),
        per_image_pixel: ratio(total),
    }
}

/// Summary of one analysed image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkMetrics {
    pub network_length_px: f32,
    pub network_length_um: f32,
    pub vessel_density: f32,
    pub branchpoints: BranchpointDensity,
    pub segments: usize,
    pub measured_segments: usize,
    pub endpoints: usize,
    /// Mean of per-segment mean diameters, pixels.
    pub mean_diameter_px: Option<f32>,
    pub mean_diameter_um: Option<f32>,
    /// Spread of per-segment mean diameters, pixels.
    pub diameter_std_px: Option<f32>,
}

impl NetworkMetrics {
    pub fn compute(
        graph: &VesselGraph,
        mask: &Mask,
        diameters: &DiameterReport,
        density: &DensityMap,
        pixel_size: PixelSize,
    ) -> Self {
        let length = network_length(graph);
        let means: Vec<f32> = diameters
            .measured()
            .filter_map(|s| s.summary.mean())
            .collect();

        let (mean, std) = if means.is_empty() {
            (None, None)
        } else {
            let n = means.len() as f32;
            let m = means.iter().sum::<f32>() / n;
            let var = means.iter().map(|v| (v - m) * (v - m)).sum::<f32>() / n;
            (Some(m), Some(var.sqrt()))
        };

        Self {
            network_length_px: length,
            network_length_um: pixel_size.length(length),
            vessel_density: density.overall,
            branchpoints: branchpoint_density(graph, mask),
            segments: graph.edges.len(),
            measured_segments: means.len(),
            endpoints: graph.num_endpoints(),
            mean_diameter_px: mean,
            mean_diameter_um: mean.map(|m| pixel_size.length(m)),
            diameter_std_px: std,
        }
    }
}
