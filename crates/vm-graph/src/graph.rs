use serde::Serialize;
use vm_core::{Image, Mask};

pub type NodeId = usize;
pub type EdgeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Degree 1: a vessel tip.
    Endpoint,
    /// Degree >= 3: a bifurcation or crossing.
    Branch,
    /// Degree 0.
    Isolated,
    /// Arbitrary pixel chosen to anchor a closed loop with no other nodes.
    LoopAnchor,
}

#[derive(Debug, Clone, Serialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub idx: (usize, usize),
    pub degree: usize,
    pub incident_edges: Vec<EdgeId>,
}

/// One vessel segment between two nodes.
#[derive(Debug, Clone, Serialize)]
pub struct Segment {
    pub id: EdgeId,
    pub a: NodeId,
    pub b: NodeId,
    /// Pixels from node `a` to node `b`, both included. Loops do not repeat
    /// the anchor at the end.
    pub path: Vec<(usize, usize)>,
    /// Arc length in pixels; diagonal steps count `sqrt(2)`.
    pub length: f32,
    pub is_loop: bool,
    /// Trunk segment this one branches off, when known.
    pub parent: Option<EdgeId>,
}

impl Segment {
    /// Path pixels strictly between the two end nodes.
    pub fn interior(&self) -> &[(usize, usize)] {
        if self.is_loop {
            return self.path.get(1..).unwrap_or(&[]);
        }
        let n = self.path.len();
        if n <= 2 { &[] } else { &self.path[1..n - 1] }
    }

    pub fn other_end(&self, node: NodeId) -> NodeId {
        if self.a == node { self.b } else { self.a }
    }
}

/// Nodes and segments that are connected to each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphComponent {
    pub nodes: Vec<NodeId>,
    pub edges: Vec<EdgeId>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VesselGraph {
    pub width: usize,
    pub height: usize,
    pub nodes: Vec<Node>,
    pub edges: Vec<Segment>,
}

impl VesselGraph {
    pub fn empty(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn dims(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn num_branches(&self) -> usize {
        self.iter_branches().count()
    }

    pub fn num_endpoints(&self) -> usize {
        self.iter_endpoints().count()
    }

    pub fn num_isolated(&self) -> usize {
        self.iter_isolated().count()
    }

    pub fn iter_branches(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.kind == NodeKind::Branch)
    }

    pub fn iter_endpoints(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.kind == NodeKind::Endpoint)
    }

    pub fn iter_isolated(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.kind == NodeKind::Isolated)
    }

    pub fn iter_edges(&self) -> impl Iterator<Item = &Segment> {
        self.edges.iter()
    }

    pub fn node_at(&self, idx: (usize, usize)) -> Option<&Node> {
        self.nodes.iter().find(|n| n.idx == idx)
    }

    /// Connected node/segment groups, ordered by their lowest node id.
    pub fn components(&self) -> Vec<GraphComponent> {
        let mut comp_of = vec![usize::MAX; self.nodes.len()];
        let mut out = Vec::new();
        let mut stack = Vec::new();

        for start in 0..self.nodes.len() {
            if comp_of[start] != usize::MAX {
                continue;
            }
            let cid = out.len();
            let mut nodes = Vec::new();
            let mut edges = Vec::new();
            comp_of[start] = cid;
            stack.push(start);

            while let Some(n) = stack.pop() {
                nodes.push(n);
                for &e in &self.nodes[n].incident_edges {
                    if !edges.contains(&e) {
                        edges.push(e);
                    }
                    let m = self.edges[e].other_end(n);
                    if comp_of[m] == usize::MAX {
                        comp_of[m] = cid;
                        stack.push(m);
                    }
                }
            }

            nodes.sort_unstable();
            edges.sort_unstable();
            out.push(GraphComponent { nodes, edges });
        }

        out
    }

    /// Rasterises node pixels and segment paths.
    pub fn to_mask(&self) -> Mask {
        let mut m = Mask::new_fill(self.width, self.height, false);
        for n in &self.nodes {
            m.set(n.idx.0, n.idx.1, true);
        }
        for e in &self.edges {
            for &(x, y) in &e.path {
                m.set(x, y, true);
            }
        }
        m
    }

    /// Per-pixel `edge id + 1`, `0` off the skeleton. Node pixels take the
    /// lowest incident edge id.
    pub fn edge_label_image(&self) -> Image<u32> {
        let mut labels = Image::new_fill(self.width, self.height, 0u32);
        for e in self.edges.iter().rev() {
            for &(x, y) in &e.path {
                labels.set(x, y, e.id as u32 + 1);
            }
        }
        labels
    }
}

/// Arc length over chord length of a segment. Loops and zero-chord paths
/// yield infinity.
pub fn tortuosity(edge: &Segment) -> f32 {
    let (Some(&(x0, y0)), Some(&(x1, y1))) = (edge.path.first(), edge.path.last()) else {
        return f32::INFINITY;
    };
    let dx = x1 as f32 - x0 as f32;
    let dy = y1 as f32 - y0 as f32;
    let chord = (dx * dx + dy * dy).sqrt();
    if edge.is_loop || chord <= 0.0 {
        return f32::INFINITY;
    }
    edge.length / chord
}
