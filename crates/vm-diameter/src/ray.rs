use vm_core::{BorderMode, ImageView, Mask, Point2f, Vec2f, sample_bilinear_f32, sample_mask_nearest};

/// Result of walking from the centre line along one direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct RayHit {
    /// Whole foreground steps taken before leaving the mask.
    pub steps: usize,
    /// `true` when `max_radius` ran out while still inside the mask.
    pub exhausted: bool,
}

/// Counts unit steps from `origin` along `dir` that stay in the mask.
pub(crate) fn walk(mask: &Mask, origin: Point2f, dir: Vec2f, max_radius: f32) -> RayHit {
    let max_steps = max_radius.floor().max(0.0) as usize;
    for d in 1..=max_steps {
        if !sample_mask_nearest(mask, origin + dir * d as f32) {
            return RayHit {
                steps: d - 1,
                exhausted: false,
            };
        }
    }
    RayHit {
        steps: max_steps,
        exhausted: true,
    }
}

/// Distance to the half-level crossing of the bilinear mask inside
/// `[steps, steps + 1]`. Falls back to the bracket midpoint when the profile
/// does not cross there.
pub(crate) fn mask_crossing(mask: &ImageView<'_, f32>, origin: Point2f, dir: Vec2f, steps: usize) -> f32 {
    let level = |t: f32| sample_bilinear_f32(mask, origin + dir * t, BorderMode::Constant(0.0));

    let mut lo = steps as f32;
    let mut hi = lo + 1.0;
    if !(level(lo) >= 0.5 && level(hi) < 0.5) {
        return lo + 0.5;
    }

    for _ in 0..24 {
        let mid = 0.5 * (lo + hi);
        if level(mid) >= 0.5 {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

const GRAD_STEP: f32 = 0.25;
const GRAD_HALF: f32 = 0.5;

/// Moves a boundary estimate `r` to the strongest intensity change along the
/// ray within one pixel, with a three-point parabolic peak fit.
pub(crate) fn refine_on_intensity(
    intensity: &ImageView<'_, f32>,
    origin: Point2f,
    dir: Vec2f,
    r: f32,
) -> f32 {
    let at = |t: f32| sample_bilinear_f32(intensity, origin + dir * t, BorderMode::Clamp);
    let grad = |t: f32| (at(t - GRAD_HALF) - at(t + GRAD_HALF)).abs();

    let n = (2.0 / GRAD_STEP) as usize;
    let start = (r - 1.0).max(0.0);
    let profile: Vec<f32> = (0..=n).map(|j| grad(start + j as f32 * GRAD_STEP)).collect();

    let Some((best, &peak)) = profile
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
    else {
        return r;
    };
    if peak <= f32::EPSILON {
        return r;
    }

    let mut delta = 0.0;
    if best > 0 && best < n {
        let (ym1, y0, yp1) = (profile[best - 1], profile[best], profile[best + 1]);
        let denom = ym1 - 2.0 * y0 + yp1;
        if denom.abs() > 1e-12 {
            delta = (0.5 * (ym1 - yp1) / denom).clamp(-1.0, 1.0);
        }
    }
    (start + (best as f32 + delta) * GRAD_STEP).max(0.0)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use vm_core::{Image, Mask, Point2f, Vec2f};

    use super::{mask_crossing, refine_on_intensity, walk};

    fn bar(w: usize, h: usize, y0: usize, y1: usize) -> Mask {
        let mut m = Mask::new_fill(w, h, false);
        for y in y0..y1 {
            for x in 0..w {
                m.set(x, y, true);
            }
        }
        m
    }

    #[test]
    fn walk_counts_steps_and_exhaustion() {
        let m = bar(20, 20, 8, 13);
        let up = Vec2f { x: 0.0, y: -1.0 };
        let down = Vec2f { x: 0.0, y: 1.0 };
        let c = Point2f::new(10.0, 10.0);
        assert_eq!(walk(&m, c, up, 50.0).steps, 2);
        assert_eq!(walk(&m, c, down, 50.0).steps, 2);

        let hit = walk(&m, c, up, 1.5);
        assert_eq!(hit.steps, 1);
        assert!(hit.exhausted);
    }

    #[test]
    fn walk_stops_at_image_border() {
        let m = Mask::new_fill(5, 5, true);
        let hit = walk(&m, Point2f::new(2.0, 2.0), Vec2f { x: 1.0, y: 0.0 }, 10.0);
        assert_eq!(hit.steps, 2);
        assert!(!hit.exhausted);
    }

    #[test]
    fn crossing_sits_half_way_between_pixels() {
        let m = bar(20, 20, 8, 13).to_f32();
        let c = Point2f::new(10.0, 10.0);
        let r = mask_crossing(&m.as_view(), c, Vec2f { x: 0.0, y: 1.0 }, 2);
        assert_abs_diff_eq!(r, 2.5, epsilon = 1e-4);
    }

    #[test]
    fn intensity_refinement_finds_soft_edge() {
        // Intensity falls linearly from 1 at y = 12 to 0 at y = 14.
        let mut img = Image::new_fill(20, 24, 0.0f32);
        for y in 0..24 {
            let v = ((14.0 - y as f32) / 2.0).clamp(0.0, 1.0);
            for x in 0..20 {
                img.set(x, y, v);
            }
        }
        let r = refine_on_intensity(
            &img.as_view(),
            Point2f::new(10.0, 10.0),
            Vec2f { x: 0.0, y: 1.0 },
            2.5,
        );
        assert!((2.0..=4.0).contains(&r), "r = {r}");
    }
}
