use crate::border::{BorderMode, map_index};
use crate::geom::Point2f;
use crate::image::{ImageView, Mask};

/// Nearest-pixel lookup in a binary mask; positions outside the image read as
/// background.
pub fn sample_mask_nearest(mask: &Mask, p: Point2f) -> bool {
    let xi = p.x.round();
    let yi = p.y.round();
    if !xi.is_finite() || !yi.is_finite() {
        return false;
    }
    mask.is_set_signed(xi as isize, yi as isize)
}

/// Floor-based 2x2 bilinear interpolation at pixel-centre coordinates.
pub fn sample_bilinear_f32(img: &ImageView<'_, f32>, p: Point2f, border: BorderMode<f32>) -> f32 {
    if img.width() == 0 || img.height() == 0 {
        return match border {
            BorderMode::Constant(v) => v,
            _ => 0.0,
        };
    }

    let x0 = p.x.floor() as isize;
    let y0 = p.y.floor() as isize;
    let dx = p.x - x0 as f32;
    let dy = p.y - y0 as f32;

    let p00 = sample_at(img, x0, y0, &border);
    let p10 = sample_at(img, x0 + 1, y0, &border);
    let p01 = sample_at(img, x0, y0 + 1, &border);
    let p11 = sample_at(img, x0 + 1, y0 + 1, &border);

    let top = p00 * (1.0 - dx) + p10 * dx;
    let bottom = p01 * (1.0 - dx) + p11 * dx;
    top * (1.0 - dy) + bottom * dy
}

fn sample_at(img: &ImageView<'_, f32>, x: isize, y: isize, border: &BorderMode<f32>) -> f32 {
    match (
        map_index(x, img.width(), border),
        map_index(y, img.height(), border),
    ) {
        // SAFETY: `map_index` only returns indices in `[0, len)`.
        (Some(xi), Some(yi)) => unsafe { *img.get_unchecked(xi, yi) },
        _ => match border {
            BorderMode::Constant(c) => *c,
            _ => 0.0,
        },
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use crate::border::BorderMode;
    use crate::geom::Point2f;
    use crate::image::{Image, Mask};
    use crate::sample::{sample_bilinear_f32, sample_mask_nearest};

    #[test]
    fn bilinear_center_and_borders() {
        let img = Image::from_vec(2, 2, vec![0.0f32, 10.0, 20.0, 30.0]).expect("valid image");
        let view = img.as_view();

        let center = sample_bilinear_f32(&view, Point2f::new(0.5, 0.5), BorderMode::Clamp);
        assert_abs_diff_eq!(center, 15.0, epsilon = 1e-6);

        let clamped = sample_bilinear_f32(&view, Point2f::new(-0.25, -0.25), BorderMode::Clamp);
        assert_abs_diff_eq!(clamped, 0.0, epsilon = 1e-6);

        // p00/p10/p01 fall outside and read 100, p11 is pixel (0, 0).
        let constant =
            sample_bilinear_f32(&view, Point2f::new(-0.25, -0.25), BorderMode::Constant(100.0));
        assert_abs_diff_eq!(constant, 43.75, epsilon = 1e-6);
    }

    #[test]
    fn mask_edge_is_half_way_between_pixel_centres() {
        let mut m = Mask::new_fill(4, 1, false);
        m.set(0, 0, true);
        m.set(1, 0, true);
        let f = m.to_f32();

        let v = sample_bilinear_f32(&f.as_view(), Point2f::new(1.5, 0.0), BorderMode::Constant(0.0));
        assert_abs_diff_eq!(v, 0.5, epsilon = 1e-6);

        assert!(sample_mask_nearest(&m, Point2f::new(1.4, 0.2)));
        assert!(!sample_mask_nearest(&m, Point2f::new(1.6, 0.0)));
        assert!(!sample_mask_nearest(&m, Point2f::new(-3.0, 0.0)));
        assert!(!sample_mask_nearest(&m, Point2f::new(f32::NAN, 0.0)));
    }
}
