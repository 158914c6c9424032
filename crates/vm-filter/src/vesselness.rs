//! Per-scale ridge measures computed from Hessian eigenvalues.
//!
//! Every measure first maps eigenvalues to the bright-ridge convention
//! (a ridge has a strongly negative `l2`), so dark ridges are handled by a
//! sign flip. Outputs are finite and `>= 0`.

use serde::{Deserialize, Serialize};

use crate::hessian::Hessian;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    Frangi,
    Sato,
    Meijering,
    Jerman,
}

impl FilterKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Frangi => "frangi",
            Self::Sato => "sato",
            Self::Meijering => "meijering",
            Self::Jerman => "jerman",
        }
    }
}

/// Operator parameters shared by all scales of one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RidgeParams {
    pub black_ridges: bool,
    pub frangi_beta: f32,
    /// `None` picks half the maximum structureness per scale.
    pub frangi_gamma: Option<f32>,
    pub jerman_tau: f32,
}

const SATO_ALPHA_NEG: f32 = 0.5;
const SATO_ALPHA_POS: f32 = 2.0;
const MEIJERING_ALPHA: f32 = -1.0 / 3.0;
const EPS: f32 = 1e-12;

/// Evaluates `kind` over one scale and returns one value per pixel.
pub fn ridge_response(kind: FilterKind, hessian: &Hessian, params: &RidgeParams) -> Vec<f32> {
    let eig: Vec<(f32, f32)> = (0..hessian.len())
        .map(|i| oriented(hessian.eigenvalues(i), params.black_ridges))
        .collect();

    match kind {
        FilterKind::Frangi => frangi(&eig, params),
        FilterKind::Sato => eig.iter().map(|&(l1, l2)| sato(l1, l2)).collect(),
        FilterKind::Meijering => meijering(&eig),
        FilterKind::Jerman => jerman(&eig, params.jerman_tau),
    }
}

#[inline]
fn oriented((l1, l2): (f32, f32), black_ridges: bool) -> (f32, f32) {
    if black_ridges { (-l1, -l2) } else { (l1, l2) }
}

fn frangi(eig: &[(f32, f32)], params: &RidgeParams) -> Vec<f32> {
    let c = match params.frangi_gamma {
        Some(g) => g,
        None => {
            let max_s = eig
                .iter()
                .map(|&(l1, l2)| (l1 * l1 + l2 * l2).sqrt())
                .fold(0.0f32, f32::max);
            0.5 * max_s
        }
    };
    if c <= EPS {
        return vec![0.0; eig.len()];
    }

    let two_beta2 = 2.0 * params.frangi_beta * params.frangi_beta;
    let two_c2 = 2.0 * c * c;

    eig.iter()
        .map(|&(l1, l2)| {
            if l2 >= 0.0 || l2.abs() < EPS {
                return 0.0;
            }
            let rb = l1 / l2;
            let s2 = l1 * l1 + l2 * l2;
            let v = (-(rb * rb) / two_beta2).exp() * (1.0 - (-s2 / two_c2).exp());
            sanitize(v)
        })
        .collect()
}

fn sato(l1: f32, l2: f32) -> f32 {
    if l2 >= 0.0 {
        return 0.0;
    }
    let alpha = if l1 <= 0.0 {
        SATO_ALPHA_NEG
    } else {
        SATO_ALPHA_POS
    };
    let denom = 2.0 * (alpha * l2) * (alpha * l2);
    sanitize(l2.abs() * (-(l1 * l1) / denom).exp())
}

fn meijering(eig: &[(f32, f32)]) -> Vec<f32> {
    let dominant: Vec<f32> = eig
        .iter()
        .map(|&(l1, l2)| {
            let m1 = l1 + MEIJERING_ALPHA * l2;
            let m2 = l2 + MEIJERING_ALPHA * l1;
            if m1.abs() > m2.abs() { m1 } else { m2 }
        })
        .collect();

    let most_negative = dominant.iter().copied().fold(0.0f32, f32::min);
    if most_negative >= -EPS {
        return vec![0.0; eig.len()];
    }

    dominant
        .iter()
        .map(|&m| if m < 0.0 { sanitize(m / most_negative) } else { 0.0 })
        .collect()
}

fn jerman(eig: &[(f32, f32)], tau: f32) -> Vec<f32> {
    // Cross-sectional curvature, positive on a ridge.
    let v: Vec<f32> = eig.iter().map(|&(_, l2)| -l2).collect();
    let max_v = v.iter().copied().fold(0.0f32, f32::max);
    if max_v <= EPS {
        return vec![0.0; eig.len()];
    }

    let floor = tau * max_v;
    v.iter()
        .map(|&l| {
            if l <= 0.0 {
                return 0.0;
            }
            let rho = if l > floor { l } else { floor };
            if l >= 0.5 * rho {
                return 1.0;
            }
            let k = 3.0 / (l + rho);
            sanitize(l * l * (rho - l) * k * k * k)
        })
        .collect()
}

#[inline]
fn sanitize(v: f32) -> f32 {
    if v.is_finite() { v.max(0.0) } else { 0.0 }
}
