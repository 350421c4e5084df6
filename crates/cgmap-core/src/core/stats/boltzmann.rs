use super::histogram::Histogram;
use super::observable::ObservableKind;

/// Smallest probability passed to the logarithm; empty bins are clamped to it.
pub const PROBABILITY_FLOOR: f64 = 1e-6;

/// Boltzmann inversion of a single probability: `-kT · ln(max(p, floor))`.
#[inline]
pub fn invert(probability: f64, kt: f64, floor: f64) -> f64 {
    -kt * probability.max(floor).ln()
}

/// Boltzmann-inverted potential sampled at histogram bin centers.
///
/// `probabilities` holds the values the harmonic fit works on: the raw
/// densities for distances, and the floored densities divided by
/// `sin(θ)` for angles. `energies` are shifted so the global minimum is
/// exactly zero.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyCurve {
    centers: Vec<f64>,
    probabilities: Vec<f64>,
    energies: Vec<f64>,
}

impl EnergyCurve {
    pub fn from_histogram(
        histogram: &Histogram,
        kind: ObservableKind,
        kt: f64,
        probability_floor: f64,
    ) -> Self {
        let centers = histogram.centers();
        let mut probabilities = Vec::with_capacity(histogram.len());
        let mut energies = Vec::with_capacity(histogram.len());

        for (&density, &center) in histogram.densities().iter().zip(&centers) {
            match kind {
                ObservableKind::Distance => {
                    probabilities.push(density);
                    energies.push(invert(density, kt, probability_floor));
                }
                ObservableKind::Angle => {
                    // Spherical Jacobian: uniform orientations sample sin(θ).
                    let scaled = density.max(probability_floor) / center.sin();
                    probabilities.push(scaled);
                    energies.push(-kt * scaled.ln());
                }
            }
        }

        let min_energy = energies.iter().copied().fold(f64::INFINITY, f64::min);
        for energy in &mut energies {
            *energy -= min_energy;
        }

        Self {
            centers,
            probabilities,
            energies,
        }
    }

    pub fn centers(&self) -> &[f64] {
        &self.centers
    }

    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    pub fn energies(&self) -> &[f64] {
        &self.energies
    }

    pub fn len(&self) -> usize {
        self.energies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.energies.is_empty()
    }

    /// Index of the first bin attaining the zero minimum, i.e. the distribution mode.
    pub fn min_index(&self) -> Option<usize> {
        self.energies.iter().position(|&energy| energy == 0.0)
    }
}
