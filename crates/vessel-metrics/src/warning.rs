use std::fmt;

use serde::Serialize;
use vm_graph::EdgeId;

/// Degenerate conditions met during a run. They never stop the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Warning {
    EmptyMask,
    AllForegroundMask,
    IsolatedPixel { x: usize, y: usize },
    UnmeasuredSegment { edge_id: EdgeId },
    SkeletonNotConverged { iterations: usize },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::EmptyMask => write!(f, "segmentation produced an empty mask"),
            Warning::AllForegroundMask => {
                write!(f, "every pixel was above the segmentation threshold")
            }
            Warning::IsolatedPixel { x, y } => {
                write!(f, "isolated skeleton pixel at ({x}, {y})")
            }
            Warning::UnmeasuredSegment { edge_id } => {
                write!(f, "segment {edge_id} has no valid diameter samples")
            }
            Warning::SkeletonNotConverged { iterations } => {
                write!(f, "skeleton correction did not settle in {iterations} rounds")
            }
        }
    }
}
