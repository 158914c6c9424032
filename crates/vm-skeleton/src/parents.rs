use vm_graph::{EdgeId, NodeId, VesselGraph};

/// Labels every segment that branches off a trunk with that trunk's id.
///
/// At each branch node the incident segment leading to the largest total
/// vessel length (everything reachable through it without crossing the node)
/// is the trunk. A segment that is a side branch at both of its ends takes the
/// trunk with the larger reach. Segments that are never a side branch keep
/// `parent = None`.
pub fn assign_parents(graph: &mut VesselGraph) {
    for e in &mut graph.edges {
        e.parent = None;
    }

    // (reach of trunk, child, trunk)
    let mut best: Vec<Option<(f32, EdgeId)>> = vec![None; graph.edges.len()];
    for node in graph.iter_branches() {
        let mut incident = node.incident_edges.clone();
        incident.sort_unstable();
        incident.dedup();
        if incident.len() < 2 {
            continue;
        }

        let reach: Vec<f32> = incident
            .iter()
            .map(|&e| reachable_length(graph, node.id, e))
            .collect();
        let Some(trunk_pos) = (0..incident.len()).max_by(|&i, &j| {
            reach[i]
                .total_cmp(&reach[j])
                .then(graph.edges[incident[i]].length.total_cmp(&graph.edges[incident[j]].length))
                .then(incident[j].cmp(&incident[i]))
        }) else {
            continue;
        };
        let trunk = incident[trunk_pos];
        let trunk_reach = reach[trunk_pos];

        for &child in incident.iter().filter(|&&e| e != trunk) {
            let replace = match best[child] {
                Some((r, _)) => trunk_reach > r,
                None => true,
            };
            if replace {
                best[child] = Some((trunk_reach, trunk));
            }
        }
    }

    let mut order: Vec<(f32, EdgeId, EdgeId)> = best
        .iter()
        .enumerate()
        .filter_map(|(child, b)| b.map(|(r, trunk)| (r, child, trunk)))
        .collect();
    order.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));

    for (_, child, trunk) in order {
        if graph.edges[trunk].parent == Some(child) {
            continue;
        }
        graph.edges[child].parent = Some(trunk);
    }
}

/// Total length of the segments reachable from `node` through `edge`
/// without passing through `node` again.
fn reachable_length(graph: &VesselGraph, node: NodeId, edge: EdgeId) -> f32 {
    let mut seen_edge = vec![false; graph.edges.len()];
    let mut seen_node = vec![false; graph.nodes.len()];
    seen_edge[edge] = true;
    seen_node[node] = true;
    let mut total = graph.edges[edge].length;

    let mut stack = Vec::new();
    let start = graph.edges[edge].other_end(node);
    if !seen_node[start] {
        seen_node[start] = true;
        stack.push(start);
    }

    while let Some(n) = stack.pop() {
        for &e in &graph.nodes[n].incident_edges {
            if seen_edge[e] {
                continue;
            }
            seen_edge[e] = true;
            total += graph.edges[e].length;
            let m = graph.edges[e].other_end(n);
            if !seen_node[m] {
                seen_node[m] = true;
                stack.push(m);
            }
        }
    }

    total
}
