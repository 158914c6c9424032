use log::{debug, warn};
use serde::{Deserialize, Serialize};
use vm_core::{Error, Mask};
use vm_graph::{VesselGraph, build_graph};
use vm_morph::dilate3x3;

use crate::correct::correct;
use crate::parents::assign_parents;
use crate::thin::thin;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkeletonConfig {
    /// Endpoint-to-branch segments shorter than this are pruned, pixels.
    pub min_spur_length: f32,
    /// Parallel segments and self-loops shorter than this are collapsed.
    pub max_loop_length: f32,
    /// Spurs whose tip lies within this many pixels of the border are kept.
    pub border_margin: usize,
    pub max_iterations: usize,
}

impl Default for SkeletonConfig {
    fn default() -> Self {
        Self {
            min_spur_length: 10.0,
            max_loop_length: 20.0,
            border_margin: 3,
            max_iterations: 10,
        }
    }
}

impl SkeletonConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.min_spur_length.is_finite() && self.min_spur_length >= 0.0) {
            return Err(Error::config("min_spur_length must be finite and >= 0"));
        }
        if !(self.max_loop_length.is_finite() && self.max_loop_length >= 0.0) {
            return Err(Error::config("max_loop_length must be finite and >= 0"));
        }
        if self.max_iterations == 0 {
            return Err(Error::config("max_iterations must be >= 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Skeletonization {
    pub skeleton: Mask,
    /// Graph of `skeleton` with parent segments assigned.
    pub graph: VesselGraph,
    /// Classify/correct rounds run.
    pub iterations: usize,
    /// Spurs and loops removed in total.
    pub corrections: usize,
    /// `false` when `max_iterations` ran out with corrections still pending.
    pub converged: bool,
}

/// Thins `mask` and corrects the skeleton until it is stable.
///
/// After the first round only segments near pixels changed by the previous
/// round are re-examined.
pub fn skeletonize(mask: &Mask, cfg: &SkeletonConfig) -> Result<Skeletonization, Error> {
    cfg.validate()?;

    let mut skeleton = thin(mask);
    let mut dirty: Option<Mask> = None;
    let mut iterations = 0;
    let mut corrections = 0;
    let mut converged = false;
    let mut graph = None;

    while iterations < cfg.max_iterations {
        iterations += 1;
        let current = build_graph(&skeleton);

        let mut next = skeleton.clone();
        let n = correct(&mut next, &current, cfg, dirty.as_ref());
        debug!("skeletonize: round {iterations}, {n} corrections");
        if n == 0 {
            converged = true;
            graph = Some(current);
            break;
        }
        corrections += n;

        let next = thin(&next);
        let changed = Mask::from_vec(
            next.width(),
            next.height(),
            skeleton
                .data()
                .iter()
                .zip(next.data())
                .map(|(a, b)| a != b)
                .collect(),
        )?;
        dirty = Some(dilate3x3(&changed));
        skeleton = next;
    }

    if !converged {
        warn!(
            "skeletonize: still correcting after {} rounds",
            cfg.max_iterations
        );
    }

    let mut graph = match graph {
        Some(g) => g,
        None => build_graph(&skeleton),
    };
    assign_parents(&mut graph);

    debug!(
        "skeletonize: {} px, {} nodes, {} segments",
        skeleton.count_set(),
        graph.nodes.len(),
        graph.edges.len()
    );

    Ok(Skeletonization {
        skeleton,
        graph,
        iterations,
        corrections,
        converged,
    })
}
