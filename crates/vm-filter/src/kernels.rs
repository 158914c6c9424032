/// Sampled 1D Gaussian and its first two derivatives.
///
/// Conventions:
/// - `radius = ceil(4*sigma)`, minimum 1.
/// - `g` is normalized such that `sum(g) == 1`.
/// - `dg[i] = -(x/sigma^2) * g[i]`, antisymmetric, `sum(dg) ~= 0`.
/// - `ddg[i] = (x^2/sigma^4 - 1/sigma^2) * g[i]`, shifted to zero sum so a
///   constant signal has zero curvature.
#[derive(Debug, Clone)]
pub struct GaussianKernels {
    pub sigma: f32,
    pub radius: usize,
    pub g: Vec<f32>,
    pub dg: Vec<f32>,
    pub ddg: Vec<f32>,
}

impl GaussianKernels {
    pub fn new(sigma: f32) -> Self {
        assert!(
            sigma.is_finite() && sigma > 0.0,
            "sigma must be > 0 and finite"
        );

        let radius = ((4.0 * sigma).ceil() as usize).max(1);
        let len = 2 * radius + 1;
        let sigma2 = sigma * sigma;

        let offsets: Vec<f32> = (0..len).map(|i| i as f32 - radius as f32).collect();

        let mut g: Vec<f32> = offsets
            .iter()
            .map(|&x| (-(x * x) / (2.0 * sigma2)).exp())
            .collect();
        let sum_g: f32 = g.iter().sum();
        for gi in &mut g {
            *gi /= sum_g;
        }

        let dg = offsets
            .iter()
            .zip(&g)
            .map(|(&x, &gi)| -(x / sigma2) * gi)
            .collect();

        let mut ddg: Vec<f32> = offsets
            .iter()
            .zip(&g)
            .map(|(&x, &gi)| (x * x / (sigma2 * sigma2) - 1.0 / sigma2) * gi)
            .collect();
        let mean = ddg.iter().sum::<f32>() / len as f32;
        for v in &mut ddg {
            *v -= mean;
        }

        Self {
            sigma,
            radius,
            g,
            dg,
            ddg,
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::GaussianKernels;

    #[test]
    fn gaussian_family_properties() {
        let k = GaussianKernels::new(1.5);
        assert_eq!(k.radius, 6);
        assert_eq!(k.g.len(), 13);

        assert_abs_diff_eq!(k.g.iter().sum::<f32>(), 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(k.dg.iter().sum::<f32>(), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(k.ddg.iter().sum::<f32>(), 0.0, epsilon = 1e-6);

        for i in 1..=k.radius {
            assert_abs_diff_eq!(k.dg[k.radius + i], -k.dg[k.radius - i], epsilon = 1e-7);
            assert_abs_diff_eq!(k.ddg[k.radius + i], k.ddg[k.radius - i], epsilon = 1e-7);
        }

        // Curvature is most negative at the centre.
        assert!(k.ddg[k.radius] < 0.0);
    }

    #[test]
    fn second_derivative_of_parabola_is_two() {
        // sum(x^2 * ddg(x)) approximates d^2/dx^2 (x^2) = 2.
        let k = GaussianKernels::new(2.0);
        let m: f32 = k
            .ddg
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let x = i as f32 - k.radius as f32;
                x * x * v
            })
            .sum();
        assert_abs_diff_eq!(m, 2.0, epsilon = 0.05);
    }
}
