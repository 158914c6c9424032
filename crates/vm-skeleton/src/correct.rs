use std::collections::BTreeMap;

use vm_core::Mask;
use vm_graph::{EdgeId, NodeId, NodeKind, Segment, VesselGraph, tortuosity};

use crate::skeletonize::SkeletonConfig;

/// Applies one round of spur removal and loop resolution to `skeleton`.
///
/// Only segments with a pixel in `dirty` are examined (all segments when
/// `dirty` is `None`). Returns the number of corrections applied.
pub(crate) fn correct(
    skeleton: &mut Mask,
    graph: &VesselGraph,
    cfg: &SkeletonConfig,
    dirty: Option<&Mask>,
) -> usize {
    let touches_dirty =
        |e: &Segment| dirty.is_none_or(|d| e.path.iter().any(|&(x, y)| d.is_set(x, y)));
    let kind = |n: NodeId| graph.nodes[n].kind;

    let mut remaining: Vec<usize> = graph.nodes.iter().map(|n| n.degree).collect();
    let mut erased = vec![false; graph.edges.len()];
    let mut corrections = 0;

    // Spurs, shortest first. A branch keeps at least two segments.
    let mut spurs: Vec<(f32, EdgeId, NodeId)> = graph
        .edges
        .iter()
        .filter(|e| !e.is_loop && e.length < cfg.min_spur_length && touches_dirty(*e))
        .filter_map(|e| {
            let (end, branch) = match (kind(e.a), kind(e.b)) {
                (NodeKind::Endpoint, NodeKind::Branch) => (e.a, e.b),
                (NodeKind::Branch, NodeKind::Endpoint) => (e.b, e.a),
                _ => return None,
            };
            let (x, y) = graph.nodes[end].idx;
            (!near_border(x, y, graph.width, graph.height, cfg.border_margin))
                .then_some((e.length, e.id, branch))
        })
        .collect();
    spurs.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    for (_, id, branch) in spurs {
        if remaining[branch] < 3 {
            continue;
        }
        let keep = graph.nodes[branch].idx;
        for &(x, y) in &graph.edges[id].path {
            if (x, y) != keep {
                skeleton.set(x, y, false);
            }
        }
        remaining[branch] -= 1;
        erased[id] = true;
        corrections += 1;
    }

    // Parallel segments between the same pair of branch nodes.
    let mut groups: BTreeMap<(NodeId, NodeId), Vec<&Segment>> = BTreeMap::new();
    for e in &graph.edges {
        if erased[e.id]
            || e.is_loop
            || e.length >= cfg.max_loop_length
            || kind(e.a) != NodeKind::Branch
            || kind(e.b) != NodeKind::Branch
        {
            continue;
        }
        groups.entry((e.a.min(e.b), e.a.max(e.b))).or_default().push(e);
    }

    for mut group in groups.into_values() {
        if group.len() < 2 || !group.iter().any(|e| touches_dirty(*e)) {
            continue;
        }
        group.sort_by(|p, q| {
            tortuosity(p)
                .total_cmp(&tortuosity(q))
                .then(q.length.total_cmp(&p.length))
                .then(p.id.cmp(&q.id))
        });
        for e in &group[1..] {
            let interior = e.interior();
            if interior.is_empty() {
                continue;
            }
            for &(x, y) in interior {
                skeleton.set(x, y, false);
            }
            erased[e.id] = true;
            corrections += 1;
        }
    }

    // Short self-loops hanging off a branch.
    for e in &graph.edges {
        if erased[e.id]
            || !e.is_loop
            || kind(e.a) != NodeKind::Branch
            || e.length >= cfg.max_loop_length
            || !touches_dirty(e)
        {
            continue;
        }
        for &(x, y) in e.interior() {
            skeleton.set(x, y, false);
        }
        corrections += 1;
    }

    corrections
}

fn near_border(x: usize, y: usize, width: usize, height: usize, margin: usize) -> bool {
    x < margin || y < margin || x + margin >= width || y + margin >= height
}
