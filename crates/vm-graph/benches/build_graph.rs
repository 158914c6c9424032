use criterion::{Criterion, black_box, criterion_group, criterion_main};
use vm_core::Mask;
use vm_graph::build_graph;

/// Grid of one-pixel lines: horizontal vessels every 20 rows crossed by
/// vertical ones every 80 columns.
fn synthetic_skeleton(width: usize, height: usize) -> Mask {
    let mut m = Mask::new_fill(width, height, false);

    for y in (16..height.saturating_sub(16)).step_by(20) {
        for x in 32..width.saturating_sub(32) {
            m.set(x, y, true);
        }
    }

    for x in (64..width.saturating_sub(64)).step_by(80) {
        for y in 64..height.saturating_sub(64) {
            m.set(x, y, true);
        }
    }

    m
}

fn bench_build_graph(c: &mut Criterion) {
    let skeleton = synthetic_skeleton(1280, 1024);

    c.bench_function("vm_graph_build_1280x1024", |b| {
        b.iter(|| {
            let g = build_graph(black_box(&skeleton));
            black_box((g.nodes.len(), g.edges.len()));
        });
    });
}

criterion_group!(benches, bench_build_graph);
criterion_main!(benches);
