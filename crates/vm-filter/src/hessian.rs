use vm_core::{BorderMode, Image};

use crate::conv::convolve_separable;
use crate::kernels::GaussianKernels;

/// Scale-normalised 2D Hessian of a Gaussian-smoothed image.
#[derive(Debug, Clone)]
pub struct Hessian {
    pub sigma: f32,
    pub hxx: Image<f32>,
    pub hxy: Image<f32>,
    pub hyy: Image<f32>,
}

impl Hessian {
    /// Computes `sigma^2 * d2(G_sigma * img)` with reflect-101 borders.
    pub fn compute(img: &Image<f32>, sigma: f32) -> Self {
        let k = GaussianKernels::new(sigma);
        let border = BorderMode::Reflect101;
        let norm = sigma * sigma;

        let mut hxx = convolve_separable(img, &k.ddg, &k.g, k.radius, border);
        let mut hxy = convolve_separable(img, &k.dg, &k.dg, k.radius, border);
        let mut hyy = convolve_separable(img, &k.g, &k.ddg, k.radius, border);

        for v in hxx
            .data_mut()
            .iter_mut()
            .chain(hxy.data_mut().iter_mut())
            .chain(hyy.data_mut().iter_mut())
        {
            *v *= norm;
        }

        Self {
            sigma,
            hxx,
            hxy,
            hyy,
        }
    }

    pub fn len(&self) -> usize {
        self.hxx.data().len()
    }

    pub fn is_empty(&self) -> bool {
        self.hxx.data().is_empty()
    }

    /// Eigenvalues at linear index `i`, ordered `|l1| <= |l2|`.
    pub fn eigenvalues(&self, i: usize) -> (f32, f32) {
        eigenvalues_sym2(self.hxx.data()[i], self.hxy.data()[i], self.hyy.data()[i])
    }
}

/// Eigenvalues of `[[a, b], [b, c]]` ordered by absolute value.
pub fn eigenvalues_sym2(a: f32, b: f32, c: f32) -> (f32, f32) {
    let half_trace = 0.5 * (a + c);
    let diff = 0.5 * (a - c);
    let root = (diff * diff + b * b).sqrt();
    let mu1 = half_trace + root;
    let mu2 = half_trace - root;
    if mu1.abs() <= mu2.abs() {
        (mu1, mu2)
    } else {
        (mu2, mu1)
    }
}
