use log::debug;
use vm_core::Mask;

/// Neighbour offsets E, NE, N, NW, W, SW, S, SE.
const RING: [(isize, isize); 8] = [
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// North, south, east and west sub-passes: a pixel is a candidate when its
/// neighbour at this offset is background.
const SUB_PASSES: [(isize, isize); 4] = [(0, -1), (0, 1), (1, 0), (-1, 0)];

/// Thins `mask` to a one-pixel-wide skeleton.
///
/// Each sub-pass collects the border pixels facing one direction and visits
/// them in raster order against the current image, deleting those that are
/// simple and not line ends. Passes repeat until nothing changes. Pixels
/// outside the image count as background.
///
/// Single-pixel background holes (a background pixel whose four 4-neighbours
/// are all set) count as foreground in the simple-point test, so chains of
/// pinholes collapse instead of surviving as a ladder of tiny cycles.
pub fn thin(mask: &Mask) -> Mask {
    let mut img = mask.clone();
    if img.is_empty() {
        return img;
    }

    let mut candidates = Vec::new();
    let mut passes = 0usize;
    loop {
        passes += 1;
        let mut changed = false;
        for &(dx, dy) in &SUB_PASSES {
            candidates.clear();
            candidates.extend(
                img.iter_set()
                    .filter(|&(x, y)| !img.is_set_signed(x as isize + dx, y as isize + dy)),
            );

            for &(x, y) in &candidates {
                let ring = ring(&img, x, y);
                if ring.iter().filter(|&&v| v).count() > 1 && connectivity_number(&ring) == 1 {
                    img.set(x, y, false);
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }

    debug!(
        "thin: {} -> {} px in {passes} passes",
        mask.count_set(),
        img.count_set()
    );
    img
}

/// Whether removing `(x, y)` keeps the 8-connected topology intact
/// (Yokoi connectivity number equal to 1), ignoring single-pixel holes.
pub fn is_simple(img: &Mask, x: usize, y: usize) -> bool {
    connectivity_number(&ring(img, x, y)) == 1
}

/// The 8-neighbourhood in `RING` order, with pinholes at the 4-neighbours
/// filled in.
fn ring(img: &Mask, x: usize, y: usize) -> [bool; 8] {
    let (x, y) = (x as isize, y as isize);
    let mut ring = RING.map(|(dx, dy)| img.is_set_signed(x + dx, y + dy));
    for k in [0usize, 2, 4, 6] {
        let (dx, dy) = RING[k];
        if !ring[k] && is_pinhole(img, x + dx, y + dy) {
            ring[k] = true;
        }
    }
    ring
}

/// Background pixel enclosed by its four 4-neighbours. Never true outside the
/// image, since such a pixel has an outside 4-neighbour.
fn is_pinhole(img: &Mask, x: isize, y: isize) -> bool {
    !img.is_set_signed(x, y)
        && [(1, 0), (-1, 0), (0, 1), (0, -1)]
            .iter()
            .all(|&(dx, dy)| img.is_set_signed(x + dx, y + dy))
}

fn connectivity_number(ring: &[bool; 8]) -> u8 {
    let bg = ring.map(|v| u8::from(!v));
    [0usize, 2, 4, 6]
        .iter()
        .map(|&k| bg[k] - bg[k] * bg[(k + 1) % 8] * bg[(k + 2) % 8])
        .sum()
}

#[cfg(test)]
mod tests {
    use vm_core::Mask;
    use vm_morph::{Connectivity, label_components};

    use super::{is_pinhole, is_simple, thin};

    fn block(w: usize, h: usize, x0: usize, y0: usize, x1: usize, y1: usize) -> Mask {
        let mut m = Mask::new_fill(w, h, false);
        for y in y0..y1 {
            for x in x0..x1 {
                m.set(x, y, true);
            }
        }
        m
    }

    #[test]
    fn thick_bar_thins_to_centre_line() {
        let sk = thin(&block(100, 100, 30, 48, 70, 51));
        assert_eq!(sk.count_set(), 40);
        assert!((30..70).all(|x| sk.is_set(x, 49)));
    }

    #[test]
    fn single_pixel_and_line_are_kept() {
        let mut m = Mask::new_fill(8, 8, false);
        m.set(1, 1, true);
        for x in 3..7 {
            m.set(x, 5, true);
        }
        assert_eq!(thin(&m), m);
    }

    #[test]
    fn two_by_two_block_keeps_one_component() {
        let sk = thin(&block(6, 6, 2, 2, 4, 4));
        assert_eq!(sk.count_set(), 2);
    }

    #[test]
    fn thinning_is_idempotent() {
        let sk = thin(&block(30, 20, 3, 4, 25, 15));
        assert_eq!(thin(&sk), sk);
    }

    #[test]
    fn simple_point_classification() {
        // Middle of a line joins two parts: not simple.
        let mut m = Mask::new_fill(5, 3, false);
        for x in 1..4 {
            m.set(x, 1, true);
        }
        assert!(!is_simple(&m, 2, 1));
        // Line end: simple.
        assert!(is_simple(&m, 1, 1));
        // Isolated pixel: not simple.
        let mut iso = Mask::new_fill(3, 3, false);
        iso.set(1, 1, true);
        assert!(!is_simple(&iso, 1, 1));
    }

    #[test]
    fn empty_mask() {
        assert_eq!(thin(&Mask::new_fill(4, 4, false)).count_set(), 0);
        assert!(thin(&Mask::new_fill(0, 0, false)).is_empty());
    }

    #[test]
    fn pinhole_chain_collapses_to_a_tree() {
        // Two diagonal lines two apart: every pixel between them is a
        // pinhole and the raw mask is a strip of 4-cycles.
        let mut m = Mask::new_fill(24, 24, false);
        for y in 2..20 {
            m.set(y, y, true);
            m.set(y + 2, y, true);
        }
        assert!(is_pinhole(&m, 5, 4));

        let sk = thin(&m);
        assert_eq!(label_components(&sk, true, Connectivity::C8).len(), 1);
        for y in 0..24 {
            for x in 0..24 {
                assert!(!is_pinhole(&sk, x, y), "pinhole left at ({x}, {y})");
            }
        }
        assert_eq!(thin(&sk), sk);
    }
}
