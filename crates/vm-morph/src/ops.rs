use vm_core::{Image, Mask};

/// 3x3 erosion. `outside` is the value assumed beyond the image border.
pub fn erode3x3(src: &Mask, outside: bool) -> Mask {
    let mut out = Mask::new_fill(src.width(), src.height(), false);
    if src.is_empty() {
        return out;
    }

    for y in 0..src.height() {
        for x in 0..src.width() {
            let all_set = neighbourhood(x, y).all(|(nx, ny)| match src.get_signed(nx, ny) {
                Some(&v) => v,
                None => outside,
            });
            out.set(x, y, all_set);
        }
    }

    out
}

/// 3x3 dilation; pixels beyond the border never contribute.
pub fn dilate3x3(src: &Mask) -> Mask {
    let mut out = Mask::new_fill(src.width(), src.height(), false);
    if src.is_empty() {
        return out;
    }

    for y in 0..src.height() {
        for x in 0..src.width() {
            let any_set = neighbourhood(x, y).any(|(nx, ny)| src.is_set_signed(nx, ny));
            out.set(x, y, any_set);
        }
    }

    out
}

/// 3x3 closing. The erosion treats the outside as foreground, so the result
/// always contains `src`.
pub fn close3x3(src: &Mask) -> Mask {
    let dilated = dilate3x3(src);
    erode3x3(&dilated, true)
}

/// 3x3 median with replicated borders.
pub fn median3x3_f32(src: &Image<f32>) -> Image<f32> {
    let (w, h) = src.dims();
    let mut out = Image::new_fill(w, h, 0.0f32);
    if src.is_empty() {
        return out;
    }

    let mut window = [0.0f32; 9];
    for y in 0..h {
        for x in 0..w {
            for (slot, (nx, ny)) in window.iter_mut().zip(neighbourhood(x, y)) {
                let cx = nx.clamp(0, w as isize - 1) as usize;
                let cy = ny.clamp(0, h as isize - 1) as usize;
                *slot = src.data()[cy * w + cx];
            }
            window.sort_by(f32::total_cmp);
            out.set(x, y, window[4]);
        }
    }

    out
}

#[inline]
fn neighbourhood(x: usize, y: usize) -> impl Iterator<Item = (isize, isize)> {
    let (x, y) = (x as isize, y as isize);
    (-1isize..=1).flat_map(move |dy| (-1isize..=1).map(move |dx| (x + dx, y + dy)))
}

#[cfg(test)]
mod tests {
    use vm_core::{Image, Mask};

    use super::{close3x3, erode3x3, median3x3_f32};

    #[test]
    fn close_fills_single_pixel_hole() {
        let mut m = Mask::new_fill(5, 5, true);
        m.set(2, 2, false);
        let out = close3x3(&m);
        assert!(out.is_set(2, 2));
        assert_eq!(out.count_set(), 25);
    }

    #[test]
    fn close_never_removes_border_pixels() {
        let mut m = Mask::new_fill(6, 4, false);
        for x in 0..6 {
            m.set(x, 0, true);
        }
        let out = close3x3(&m);
        for x in 0..6 {
            assert!(out.is_set(x, 0));
        }
    }

    #[test]
    fn erosion_border_policy() {
        let m = Mask::new_fill(3, 3, true);
        assert_eq!(erode3x3(&m, false).count_set(), 1);
        assert_eq!(erode3x3(&m, true).count_set(), 9);
    }

    #[test]
    fn median_removes_salt_noise() {
        let mut img = Image::new_fill(5, 5, 10.0f32);
        img.set(2, 2, 250.0);
        let out = median3x3_f32(&img);
        assert_eq!(out.get(2, 2), Some(&10.0));
        assert!(out.data().iter().all(|&v| v == 10.0));
    }
}
