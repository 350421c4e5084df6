use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;

/// Gaussian probability density with total area `area`.
///
/// `p(x) = A / (w·sqrt(π/2)) · exp(-2 (x - x0)² / w²)`, following
/// Milano, Goudeau and Müller-Plathe (2005). The width `w` equals twice the
/// standard deviation.
#[inline]
pub fn gaussian(x: f64, x0: f64, width: f64, area: f64) -> f64 {
    let d = x - x0;
    area / (width * FRAC_PI_2.sqrt()) * (-2.0 * d * d / (width * width)).exp()
}

/// Harmonic well with an energy offset: `c + ½·a·(x - x0)²`.
#[inline]
pub fn gaussian_to_energy(x: f64, constant: f64, a: f64, x0: f64) -> f64 {
    constant + 0.5 * a * (x - x0).powi(2)
}

#[inline]
pub fn harmonic_energy(x: f64, x0: f64, force_constant: f64) -> f64 {
    0.5 * force_constant * (x - x0).powi(2)
}

#[inline]
pub fn harmonic_force(x: f64, x0: f64, force_constant: f64) -> f64 {
    force_constant * (x - x0)
}

/// Force constant implied by a Gaussian of width `w` at thermal energy `kT`.
#[inline]
pub fn force_constant_from_width(width: f64, kt: f64) -> f64 {
    4.0 * kt / (width * width)
}

/// Harmonic bond or angle parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HarmonicParameters {
    pub force_constant: f64,
    pub x0: f64,
}

impl HarmonicParameters {
    pub fn new(force_constant: f64, x0: f64) -> Self {
        Self { force_constant, x0 }
    }

    pub fn energy(&self, x: f64) -> f64 {
        harmonic_energy(x, self.x0, self.force_constant)
    }

    pub fn force(&self, x: f64) -> f64 {
        harmonic_force(x, self.x0, self.force_constant)
    }

    pub fn is_finite(&self) -> bool {
        self.force_constant.is_finite() && self.x0.is_finite()
    }
}

/// A model with `N` parameters and analytic partial derivatives.
pub trait FitModel<const N: usize> {
    fn value(&self, x: f64, params: &[f64; N]) -> f64;

    /// `∂value/∂params` at `x`.
    fn gradient(&self, x: f64, params: &[f64; N]) -> [f64; N];
}

/// [`gaussian`] with parameters `[x0, w, A]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GaussianDensity;

impl FitModel<3> for GaussianDensity {
    fn value(&self, x: f64, params: &[f64; 3]) -> f64 {
        let [x0, width, area] = *params;
        gaussian(x, x0, width, area)
    }

    fn gradient(&self, x: f64, params: &[f64; 3]) -> [f64; 3] {
        let [x0, width, area] = *params;
        let d = x - x0;
        let w2 = width * width;
        let shape = (-2.0 * d * d / w2).exp() / (width * FRAC_PI_2.sqrt());
        let value = area * shape;
        [
            value * 4.0 * d / w2,
            value * (4.0 * d * d / (w2 * width) - 1.0 / width),
            shape,
        ]
    }
}

/// [`gaussian_to_energy`] with parameters `[constant, a, x0]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HarmonicWell;

impl FitModel<3> for HarmonicWell {
    fn value(&self, x: f64, params: &[f64; 3]) -> f64 {
        let [constant, a, x0] = *params;
        gaussian_to_energy(x, constant, a, x0)
    }

    fn gradient(&self, x: f64, params: &[f64; 3]) -> [f64; 3] {
        let [_, a, x0] = *params;
        let d = x - x0;
        [1.0, 0.5 * d * d, -a * d]
    }
}
