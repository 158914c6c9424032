use vm_core::{BorderMode, Image, map_index};

use crate::kernels::GaussianKernels;

/// 1D convolution, `out[i] = sum_k signal[i + radius - k] * kernel[k]`.
pub fn convolve_f32(
    signal: &[f32],
    kernel: &[f32],
    radius: usize,
    border: BorderMode<f32>,
    out: &mut [f32],
) {
    assert_eq!(out.len(), signal.len(), "out must match signal length");
    assert_eq!(
        kernel.len(),
        2 * radius + 1,
        "kernel len must be 2*radius+1"
    );

    let n = signal.len();
    if n == 0 {
        return;
    }

    let klen = kernel.len();
    let interior = radius..n.saturating_sub(radius);

    for (i, out_i) in out.iter_mut().enumerate() {
        let mut acc = 0.0f32;
        if interior.contains(&i) {
            // Full footprint in range.
            let base = i - radius;
            for k in 0..klen {
                acc += signal[base + klen - 1 - k] * kernel[k];
            }
        } else {
            for (k, &kv) in kernel.iter().enumerate() {
                let idx = i as isize + radius as isize - k as isize;
                let v = match map_index(idx, n, &border) {
                    Some(j) => signal[j],
                    None => match border {
                        BorderMode::Constant(c) => c,
                        _ => 0.0,
                    },
                };
                acc += v * kv;
            }
        }
        *out_i = acc;
    }
}

/// Convolves every row of `src` with `kernel`.
pub fn convolve_rows(
    src: &Image<f32>,
    kernel: &[f32],
    radius: usize,
    border: BorderMode<f32>,
) -> Image<f32> {
    let (w, h) = src.dims();
    let mut out = Image::new_fill(w, h, 0.0f32);
    if w == 0 || h == 0 {
        return out;
    }

    for (y, out_row) in out.data_mut().chunks_exact_mut(w).enumerate() {
        convolve_f32(src.row(y), kernel, radius, border, out_row);
    }
    out
}

/// Convolves every column of `src` with `kernel`.
pub fn convolve_cols(
    src: &Image<f32>,
    kernel: &[f32],
    radius: usize,
    border: BorderMode<f32>,
) -> Image<f32> {
    let (w, h) = src.dims();
    let mut out = Image::new_fill(w, h, 0.0f32);
    if w == 0 || h == 0 {
        return out;
    }

    let mut col = vec![0.0f32; h];
    let mut col_out = vec![0.0f32; h];
    for x in 0..w {
        for (y, c) in col.iter_mut().enumerate() {
            *c = src.data()[y * w + x];
        }
        convolve_f32(&col, kernel, radius, border, &mut col_out);
        for (y, &v) in col_out.iter().enumerate() {
            out.data_mut()[y * w + x] = v;
        }
    }
    out
}

/// Separable convolution: `row_kernel` along x, then `col_kernel` along y.
pub fn convolve_separable(
    src: &Image<f32>,
    row_kernel: &[f32],
    col_kernel: &[f32],
    radius: usize,
    border: BorderMode<f32>,
) -> Image<f32> {
    let tmp = convolve_rows(src, row_kernel, radius, border);
    convolve_cols(&tmp, col_kernel, radius, border)
}

/// Isotropic Gaussian smoothing with reflect-101 borders.
pub fn gaussian_blur(src: &Image<f32>, sigma: f32) -> Image<f32> {
    let k = GaussianKernels::new(sigma);
    convolve_separable(src, &k.g, &k.g, k.radius, BorderMode::Reflect101)
}

#[cfg(test)]
mod tests {
    use vm_core::{BorderMode, Image};

    use super::{convolve_cols, convolve_f32, convolve_rows, gaussian_blur};

    #[test]
    fn identity_kernel() {
        let signal = [1.0f32, 2.0, 3.0, 4.0];
        let mut out = vec![0.0f32; signal.len()];
        convolve_f32(&signal, &[1.0], 0, BorderMode::Clamp, &mut out);
        assert_eq!(&out, &signal);
    }

    #[test]
    fn constant_border_and_flip() {
        let signal = [1.0f32, 2.0, 3.0];
        let mut out = vec![0.0f32; 3];
        convolve_f32(&signal, &[1.0, 1.0, 1.0], 1, BorderMode::Constant(0.0), &mut out);
        assert_eq!(out, vec![3.0, 6.0, 5.0]);

        // Kernel [1, 0, -1] is flipped: out[i] = s[i+1] - s[i-1].
        convolve_f32(&signal, &[1.0, 0.0, -1.0], 1, BorderMode::Clamp, &mut out);
        assert_eq!(out, vec![1.0, 2.0, 1.0]);
    }

    #[test]
    fn reflect_border_keeps_symmetric_signal_flat() {
        let signal = [5.0f32; 4];
        let mut out = vec![0.0f32; 4];
        convolve_f32(&signal, &[0.25, 0.5, 0.25], 1, BorderMode::Reflect101, &mut out);
        assert_eq!(out, vec![5.0; 4]);
    }

    #[test]
    fn rows_and_cols_act_on_their_axis() {
        let img = Image::from_vec(3, 2, vec![1.0f32, 2.0, 3.0, 10.0, 20.0, 30.0]).expect("valid");
        let dx = convolve_rows(&img, &[1.0, 0.0, -1.0], 1, BorderMode::Clamp);
        assert_eq!(dx.data(), &[1.0, 2.0, 1.0, 10.0, 20.0, 10.0]);

        let dy = convolve_cols(&img, &[1.0, 0.0, -1.0], 1, BorderMode::Clamp);
        assert_eq!(dy.data(), &[9.0, 18.0, 27.0, 9.0, 18.0, 27.0]);
    }

    #[test]
    fn blur_preserves_mean_of_an_impulse_far_from_borders() {
        let mut img = Image::new_fill(31, 31, 0.0f32);
        img.set(15, 15, 100.0);
        let out = gaussian_blur(&img, 2.0);
        let total: f32 = out.data().iter().sum();
        assert!((total - 100.0).abs() < 1e-2);
        assert!(out.get(15, 15).copied().unwrap_or(0.0) < 100.0);
    }
}
