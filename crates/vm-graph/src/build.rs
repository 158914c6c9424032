use log::debug;
use vm_core::Mask;

use crate::graph::{EdgeId, Node, NodeId, NodeKind, Segment, VesselGraph};

const DX: [isize; 8] = [1, 1, 0, -1, -1, -1, 0, 1];
const DY: [isize; 8] = [0, -1, -1, -1, 0, 1, 1, 1];

/// Builds the vessel graph of a skeleton.
///
/// Nodes are created in raster order, so node ids are stable for a given
/// skeleton. Segments are traced from each node in direction order, then any
/// remaining pure cycles are anchored at their first raster pixel.
pub fn build_graph(skeleton: &Mask) -> VesselGraph {
    let (width, height) = skeleton.dims();
    if skeleton.is_empty() {
        return VesselGraph::empty(width, height);
    }

    let active = skeleton.data();
    let n = active.len();

    let mut deg = vec![0_u8; n];
    for p in 0..n {
        if active[p] {
            deg[p] = degree_at(p, active, width, height);
        }
    }

    let mut nodes = Vec::new();
    let mut node_at = vec![-1_i32; n];
    for p in 0..n {
        if !active[p] || deg[p] == 2 {
            continue;
        }
        push_node(p, kind_from_degree(deg[p]), &deg, width, &mut node_at, &mut nodes);
    }

    let mut edges = Vec::new();
    let mut used_link = vec![0_u8; n];

    let mut start_node = 0_usize;
    while start_node < nodes.len() {
        let start_idx = linear_idx(nodes[start_node].idx, width);

        for dir in 0..8u8 {
            let Some(first) = connected_neighbor(start_idx, dir, active, width, height) else {
                continue;
            };
            if is_link_used(&used_link, start_idx, dir) {
                continue;
            }

            let trace = trace_chain(
                start_idx,
                first,
                dir,
                active,
                &node_at,
                &mut used_link,
                width,
                height,
            );
            let end_node = if trace.closed {
                start_node
            } else {
                terminal_node(trace.last, &deg, width, &mut node_at, &mut nodes)
            };
            push_edge(&mut edges, start_node, end_node, trace, width);
        }

        start_node += 1;
    }

    // Cycles with no degree != 2 pixel.
    for p in 0..n {
        if !active[p] {
            continue;
        }

        for dir in 0..8u8 {
            let Some(next) = connected_neighbor(p, dir, active, width, height) else {
                continue;
            };
            if is_link_used(&used_link, p, dir) {
                continue;
            }

            let anchor = if node_at[p] >= 0 {
                node_at[p] as NodeId
            } else {
                push_node(p, NodeKind::LoopAnchor, &deg, width, &mut node_at, &mut nodes)
            };
            let trace = trace_chain(p, next, dir, active, &node_at, &mut used_link, width, height);
            let end_node = if trace.closed {
                anchor
            } else {
                terminal_node(trace.last, &deg, width, &mut node_at, &mut nodes)
            };
            push_edge(&mut edges, anchor, end_node, trace, width);
        }
    }

    for edge in &edges {
        let id: EdgeId = edge.id;
        nodes[edge.a].incident_edges.push(id);
        if edge.a != edge.b {
            nodes[edge.b].incident_edges.push(id);
        }
    }

    debug!(
        "build_graph: {}x{} -> {} nodes, {} segments",
        width,
        height,
        nodes.len(),
        edges.len()
    );

    VesselGraph {
        width,
        height,
        nodes,
        edges,
    }
}

/// Graph degree of `(x, y)` under the suppressed-diagonal 8-neighbourhood.
/// Zero for unset pixels.
pub fn pixel_degree(skeleton: &Mask, x: usize, y: usize) -> usize {
    let (width, height) = skeleton.dims();
    if !skeleton.is_set(x, y) {
        return 0;
    }
    degree_at(y * width + x, skeleton.data(), width, height) as usize
}

struct Trace {
    pixels: Vec<usize>,
    last: usize,
    closed: bool,
}

#[allow(clippy::too_many_arguments)]
fn trace_chain(
    start: usize,
    first: usize,
    start_dir: u8,
    active: &[bool],
    node_at: &[i32],
    used_link: &mut [u8],
    width: usize,
    height: usize,
) -> Trace {
    let mut pixels = vec![start];
    let mut prev = start;
    let mut cur = first;
    let mut dir = start_dir;
    let mut closed = false;

    let max_steps = active.len().max(1);
    for _ in 0..max_steps {
        mark_link_both(used_link, prev, dir, cur);

        if cur == start {
            closed = true;
            break;
        }

        pixels.push(cur);
        if node_at[cur] >= 0 {
            break;
        }

        let Some((next_dir, next)) =
            find_next_neighbor(cur, prev, active, used_link, width, height)
        else {
            break;
        };

        prev = cur;
        cur = next;
        dir = next_dir;
    }

    let last = pixels[pixels.len() - 1];
    Trace {
        pixels,
        last,
        closed,
    }
}

fn find_next_neighbor(
    cur: usize,
    prev: usize,
    active: &[bool],
    used_link: &[u8],
    width: usize,
    height: usize,
) -> Option<(u8, usize)> {
    (0..8u8).find_map(|dir| {
        let nb = connected_neighbor(cur, dir, active, width, height)?;
        (nb != prev && !is_link_used(used_link, cur, dir)).then_some((dir, nb))
    })
}

fn push_edge(edges: &mut Vec<Segment>, a: NodeId, b: NodeId, trace: Trace, width: usize) {
    let path: Vec<(usize, usize)> = trace
        .pixels
        .iter()
        .map(|&p| (p % width, p / width))
        .collect();
    let is_loop = trace.closed;
    edges.push(Segment {
        id: edges.len(),
        a,
        b,
        length: arc_length(&path, is_loop),
        path,
        is_loop,
        parent: None,
    });
}

fn push_node(
    pixel: usize,
    kind: NodeKind,
    deg: &[u8],
    width: usize,
    node_at: &mut [i32],
    nodes: &mut Vec<Node>,
) -> NodeId {
    let id = nodes.len();
    node_at[pixel] = id as i32;
    nodes.push(Node {
        id,
        kind,
        idx: (pixel % width, pixel / width),
        degree: deg[pixel] as usize,
        incident_edges: Vec::new(),
    });
    id
}

/// Node at the end of an open chain. Chains normally stop on an existing
/// node; an unterminated chain gets an endpoint at its last pixel.
fn terminal_node(
    pixel: usize,
    deg: &[u8],
    width: usize,
    node_at: &mut [i32],
    nodes: &mut Vec<Node>,
) -> NodeId {
    if node_at[pixel] >= 0 {
        return node_at[pixel] as NodeId;
    }
    push_node(pixel, NodeKind::Endpoint, deg, width, node_at, nodes)
}

fn kind_from_degree(d: u8) -> NodeKind {
    match d {
        0 => NodeKind::Isolated,
        1 => NodeKind::Endpoint,
        _ => NodeKind::Branch,
    }
}

fn arc_length(path: &[(usize, usize)], closed: bool) -> f32 {
    let step = |a: (usize, usize), b: (usize, usize)| {
        let dx = a.0 as f32 - b.0 as f32;
        let dy = a.1 as f32 - b.1 as f32;
        (dx * dx + dy * dy).sqrt()
    };

    let mut len: f32 = path.windows(2).map(|w| step(w[0], w[1])).sum();
    if closed && path.len() > 1 {
        len += step(path[path.len() - 1], path[0]);
    }
    len
}

#[inline]
fn degree_at(p: usize, active: &[bool], width: usize, height: usize) -> u8 {
    (0..8u8)
        .filter(|&dir| connected_neighbor(p, dir, active, width, height).is_some())
        .count() as u8
}

#[inline]
fn linear_idx(idx: (usize, usize), width: usize) -> usize {
    idx.1 * width + idx.0
}

#[inline]
fn opposite_dir(dir: u8) -> u8 {
    (dir + 4) & 7
}

#[inline]
fn is_link_used(used_link: &[u8], p: usize, dir: u8) -> bool {
    (used_link[p] & (1_u8 << dir)) != 0
}

#[inline]
fn mark_link_both(used_link: &mut [u8], from: usize, dir: u8, to: usize) {
    used_link[from] |= 1_u8 << dir;
    used_link[to] |= 1_u8 << opposite_dir(dir);
}

#[inline]
fn neighbor_index(p: usize, dir: u8, width: usize, height: usize) -> Option<usize> {
    let x = (p % width) as isize + DX[dir as usize];
    let y = (p / width) as isize + DY[dir as usize];
    index_if_in_bounds(x, y, width, height)
}

#[inline]
fn connected_neighbor(
    p: usize,
    dir: u8,
    active: &[bool],
    width: usize,
    height: usize,
) -> Option<usize> {
    let nb = neighbor_index(p, dir, width, height)?;
    if !active[nb] {
        return None;
    }

    if is_diagonal_dir(dir) {
        let x = (p % width) as isize;
        let y = (p / width) as isize;
        let side_a = index_if_in_bounds(x + DX[dir as usize], y, width, height);
        let side_b = index_if_in_bounds(x, y + DY[dir as usize], width, height);
        if side_a.is_some_and(|i| active[i]) || side_b.is_some_and(|i| active[i]) {
            return None;
        }
    }

    Some(nb)
}

#[inline]
fn is_diagonal_dir(dir: u8) -> bool {
    DX[dir as usize] != 0 && DY[dir as usize] != 0
}

#[inline]
fn index_if_in_bounds(x: isize, y: isize, width: usize, height: usize) -> Option<usize> {
    if x < 0 || y < 0 {
        return None;
    }

    let (xu, yu) = (x as usize, y as usize);
    if xu >= width || yu >= height {
        return None;
    }

    Some(yu * width + xu)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use vm_core::Mask;

    use crate::{NodeKind, build_graph, pixel_degree};

    fn mask_from(w: usize, h: usize, pixels: &[(usize, usize)]) -> Mask {
        let mut m = Mask::new_fill(w, h, false);
        for &(x, y) in pixels {
            m.set(x, y, true);
        }
        m
    }

    #[test]
    fn straight_line_is_one_segment() {
        let pixels: Vec<_> = (2..12).map(|x| (x, 3)).collect();
        let g = build_graph(&mask_from(16, 8, &pixels));

        assert_eq!(g.num_endpoints(), 2);
        assert_eq!(g.num_branches(), 0);
        assert_eq!(g.edges.len(), 1);
        let e = &g.edges[0];
        assert_eq!(e.path.first(), Some(&(2, 3)));
        assert_eq!(e.path.last(), Some(&(11, 3)));
        assert_eq!(e.path.len(), 10);
        assert_eq!(e.length, 9.0);
        assert!(!e.is_loop);
    }

    #[test]
    fn t_junction_graph() {
        let mut pixels: Vec<_> = (1..=7).map(|y| (4, y)).collect();
        pixels.extend((5..=7).map(|x| (x, 4)));
        let g = build_graph(&mask_from(9, 9, &pixels));

        assert_eq!(g.num_branches(), 1);
        assert_eq!(g.num_endpoints(), 3);
        assert_eq!(g.edges.len(), 3);

        let j = g.iter_branches().next().unwrap();
        assert_eq!(j.idx, (4, 4));
        assert_eq!(j.degree, 3);
        assert_eq!(j.incident_edges.len(), 3);

        for edge in g.iter_edges() {
            assert!(edge.path.len() >= 2);
            assert!(edge.path.contains(&(4, 4)));
        }
    }

    #[test]
    fn plus_shape_has_degree_four_branch() {
        let mut pixels: Vec<_> = (0..9).map(|x| (x, 4)).collect();
        pixels.extend((0..9).filter(|&y| y != 4).map(|y| (4, y)));
        let g = build_graph(&mask_from(9, 9, &pixels));

        assert_eq!(g.num_branches(), 1);
        assert_eq!(g.num_endpoints(), 4);
        assert_eq!(g.edges.len(), 4);
        let center = g.node_at((4, 4)).unwrap();
        assert_eq!(center.kind, NodeKind::Branch);
        assert_eq!(center.degree, 4);
        for e in g.iter_edges() {
            assert_eq!(e.length, 4.0);
        }
    }

    #[test]
    fn staircase_diagonal_stays_degree_two() {
        // (1,1) (2,1) (2,2) (3,2) (3,3): the (1,1)-(2,2) diagonal is suppressed.
        let m = mask_from(6, 6, &[(1, 1), (2, 1), (2, 2), (3, 2), (3, 3)]);
        assert_eq!(pixel_degree(&m, 2, 1), 2);
        assert_eq!(pixel_degree(&m, 2, 2), 2);
        let g = build_graph(&m);
        assert_eq!(g.num_endpoints(), 2);
        assert_eq!(g.edges.len(), 1);
        assert_eq!(g.edges[0].length, 4.0);
    }

    #[test]
    fn diagonal_line_counts_sqrt2_steps() {
        let pixels: Vec<_> = (0..5).map(|i| (i + 1, i + 1)).collect();
        let g = build_graph(&mask_from(8, 8, &pixels));
        assert_eq!(g.edges.len(), 1);
        assert!((g.edges[0].length - 4.0 * std::f32::consts::SQRT_2).abs() < 1e-5);
    }

    #[test]
    fn loop_component_creates_loop_edge() {
        let mut pixels = Vec::new();
        for x in 2..=5 {
            pixels.push((x, 2));
            pixels.push((x, 5));
        }
        for y in 3..=4 {
            pixels.push((2, y));
            pixels.push((5, y));
        }
        let g = build_graph(&mask_from(9, 9, &pixels));

        assert_eq!(g.num_branches(), 0);
        assert_eq!(g.num_endpoints(), 0);
        assert_eq!(g.edges.len(), 1);
        assert!(g.edges[0].is_loop);
        assert_eq!(g.edges[0].a, g.edges[0].b);
        assert_eq!(g.edges[0].path.len(), 12);
        assert_eq!(g.edges[0].length, 12.0);

        assert_eq!(g.nodes.len(), 1);
        assert_eq!(g.nodes[0].kind, NodeKind::LoopAnchor);
        assert_eq!(g.nodes[0].idx, (2, 2));
    }

    #[test]
    fn isolated_pixels_become_nodes_without_edges() {
        let g = build_graph(&mask_from(5, 5, &[(1, 1), (3, 3)]));
        assert_eq!(g.num_isolated(), 2);
        assert!(g.edges.is_empty());
        assert_eq!(g.components().len(), 2);
    }

    #[test]
    fn empty_skeleton_gives_empty_graph() {
        let g = build_graph(&Mask::new_fill(10, 10, false));
        assert!(g.is_empty());
        assert_eq!(g.dims(), (10, 10));
        assert!(build_graph(&Mask::new_fill(0, 0, false)).is_empty());
    }

    #[test]
    fn disjoint_lines_are_separate_components() {
        let mut pixels: Vec<_> = (1..6).map(|x| (x, 1)).collect();
        pixels.extend((1..6).map(|x| (x, 6)));
        let g = build_graph(&mask_from(8, 8, &pixels));
        let comps = g.components();
        assert_eq!(comps.len(), 2);
        assert_eq!(comps[0].edges.len(), 1);
        assert_eq!(comps[1].edges.len(), 1);
    }

    #[test]
    fn edge_labels_cover_skeleton() {
        let mut pixels: Vec<_> = (1..=7).map(|y| (4, y)).collect();
        pixels.extend((5..=7).map(|x| (x, 4)));
        let m = mask_from(9, 9, &pixels);
        let g = build_graph(&m);
        let labels = g.edge_label_image();
        for (i, (&set, &label)) in m.data().iter().zip(labels.data()).enumerate() {
            assert_eq!(set, label != 0, "pixel {i}");
        }
        assert_eq!(g.to_mask(), m);
    }

    proptest! {
        #[test]
        fn round_trip_reproduces_pixels(bits in proptest::collection::vec(any::<bool>(), 12 * 10)) {
            let m = Mask::from_vec(12, 10, bits).unwrap();
            let g = build_graph(&m);
            prop_assert_eq!(g.to_mask(), m);

            for e in &g.edges {
                let mut seen = e.path.clone();
                seen.sort_unstable();
                seen.dedup();
                prop_assert_eq!(seen.len(), e.path.len());
                prop_assert!(e.a < g.nodes.len() && e.b < g.nodes.len());
            }
        }
    }
}
