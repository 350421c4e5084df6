use super::models::{GaussianDensity, HarmonicParameters, HarmonicWell, force_constant_from_width};
use super::solver::{Bounds, FitError, LevenbergMarquardt, SolverSettings};
use crate::core::stats::boltzmann::{EnergyCurve, PROBABILITY_FLOOR};
use crate::core::stats::histogram::Histogram;
use crate::core::stats::observable::ObservableKind;
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;
use std::fmt;
use tracing::{debug, warn};

pub const DEFAULT_BIN_COUNT: usize = 50;
pub const DEFAULT_INITIAL_HALF_WIDTH: usize = 2;
/// Angle fits at or below this force constant are treated as unreliable.
pub const DEFAULT_FORCE_CONSTANT_FLOOR: f64 = 0.01;

/// Which curve the harmonic model is fitted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FitTarget {
    /// Gaussian fitted to the probability densities; `k = 4kT / w²`.
    #[default]
    Density,
    /// `c + ½·a·(x − x0)²` fitted to the Boltzmann-inverted energies; `k = a`.
    Energy,
}

impl fmt::Display for FitTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Density => write!(f, "density"),
            Self::Energy => write!(f, "energy"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitOptions {
    pub bin_count: usize,
    pub initial_half_width: usize,
    pub force_constant_floor: f64,
    pub probability_floor: f64,
    /// Cap on windowed attempts before the terminal fallback; `None` means `bin_count / 2 + 1`.
    pub max_attempts: Option<usize>,
    pub target: FitTarget,
    pub solver: SolverSettings,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            bin_count: DEFAULT_BIN_COUNT,
            initial_half_width: DEFAULT_INITIAL_HALF_WIDTH,
            force_constant_floor: DEFAULT_FORCE_CONSTANT_FLOOR,
            probability_floor: PROBABILITY_FLOOR,
            max_attempts: None,
            target: FitTarget::default(),
            solver: SolverSettings::default(),
        }
    }
}

impl FitOptions {
    pub fn max_attempts(&self) -> usize {
        self.max_attempts.unwrap_or(self.bin_count / 2 + 1)
    }
}

/// Half-open bin range `[center − half_width, center + half_width)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitWindow {
    pub start: usize,
    pub end: usize,
    pub half_width: usize,
}

impl FitWindow {
    /// Returns `None` once the window reaches either end of a curve with `len` bins.
    pub fn around(center: usize, half_width: usize, len: usize) -> Option<Self> {
        if center + half_width >= len || center <= half_width {
            return None;
        }
        Some(Self {
            start: center - half_width,
            end: center + half_width,
            half_width,
        })
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// How much a returned fit can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FitQuality {
    /// A windowed fit around the mode converged and passed the confidence check.
    Converged,
    /// The window hit the histogram boundary; the full-range (bonds) or
    /// mirrored (angles) fit was accepted unconditionally.
    BoundaryReached,
    /// Even the terminal fit failed; parameters come from the curve's moments.
    MomentEstimate,
}

impl fmt::Display for FitQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Converged => "converged",
            Self::BoundaryReached => "boundary-reached",
            Self::MomentEstimate => "moment-estimate",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HarmonicFit {
    pub parameters: HarmonicParameters,
    pub quality: FitQuality,
    /// Half-width of the accepted window; `None` for fallback fits.
    pub half_width: Option<usize>,
    /// Number of solver runs, including the terminal one.
    pub attempts: usize,
}

/// Result of a single windowed solver run.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Converged(HarmonicParameters),
    RejectedLowConfidence(HarmonicParameters),
    Failed(FitError),
}

impl AttemptOutcome {
    pub fn classify(
        kind: ObservableKind,
        result: Result<HarmonicParameters, FitError>,
        force_constant_floor: f64,
    ) -> Self {
        match result {
            Ok(parameters) if !parameters.is_finite() => Self::Failed(FitError::NonFinite),
            Ok(parameters)
                if kind == ObservableKind::Angle
                    && parameters.force_constant <= force_constant_floor =>
            {
                Self::RejectedLowConfidence(parameters)
            }
            Ok(parameters) => Self::Converged(parameters),
            Err(e) => Self::Failed(e),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FitState {
    Fitting(usize),
    Widening(usize),
    /// Bond terminal fallback: fit every bin.
    FullRange,
    /// Angle terminal fallback: fit the curve reflected about its last bin.
    Mirrored,
    Done(HarmonicFit),
}

/// Adaptive-window harmonic fitting of one Energy Curve.
pub struct HarmonicFitEngine<'a> {
    kind: ObservableKind,
    kt: f64,
    options: &'a FitOptions,
    solver: LevenbergMarquardt,
}

impl<'a> HarmonicFitEngine<'a> {
    pub fn new(kind: ObservableKind, kt: f64, options: &'a FitOptions) -> Self {
        Self {
            kind,
            kt,
            options,
            solver: LevenbergMarquardt::new(options.solver),
        }
    }

    /// Runs the widening state machine to completion.
    ///
    /// Returns `None` only for an empty curve; every other input yields a fit.
    pub fn fit(&self, curve: &EnergyCurve) -> Option<HarmonicFit> {
        let min_index = curve.min_index()?;
        let xs = curve.centers();
        let ys = self.targets(curve);
        let max_attempts = self.options.max_attempts();

        let mut attempts = 0;
        let mut state = FitState::Fitting(self.options.initial_half_width);

        loop {
            state = match state {
                FitState::Fitting(half_width) => {
                    match FitWindow::around(min_index, half_width, curve.len()) {
                        Some(window) if attempts < max_attempts => {
                            attempts += 1;
                            let result = self.solve(
                                &xs[window.start..window.end],
                                &ys[window.start..window.end],
                            );
                            match AttemptOutcome::classify(
                                self.kind,
                                result,
                                self.options.force_constant_floor,
                            ) {
                                AttemptOutcome::Converged(parameters) => {
                                    debug!(
                                        kind = %self.kind,
                                        half_width,
                                        k = parameters.force_constant,
                                        x0 = parameters.x0,
                                        "Windowed fit converged"
                                    );
                                    FitState::Done(HarmonicFit {
                                        parameters,
                                        quality: FitQuality::Converged,
                                        half_width: Some(half_width),
                                        attempts,
                                    })
                                }
                                AttemptOutcome::RejectedLowConfidence(parameters) => {
                                    debug!(
                                        kind = %self.kind,
                                        half_width,
                                        k = parameters.force_constant,
                                        "Force constant below floor, widening"
                                    );
                                    FitState::Widening(half_width)
                                }
                                AttemptOutcome::Failed(e) => {
                                    debug!(kind = %self.kind, half_width, error = %e, "Windowed fit failed, widening");
                                    FitState::Widening(half_width)
                                }
                            }
                        }
                        _ => self.fallback_state(),
                    }
                }
                FitState::Widening(half_width) => FitState::Fitting(half_width + 1),
                FitState::FullRange => {
                    attempts += 1;
                    warn!(kind = %self.kind, attempts, "Fit window reached the histogram boundary, fitting the full range");
                    FitState::Done(self.terminal_fit(curve, xs, ys, attempts))
                }
                FitState::Mirrored => {
                    attempts += 1;
                    warn!(kind = %self.kind, attempts, "Fit window reached the histogram boundary, fitting the mirrored curve");
                    let (mirrored_xs, mirrored_ys) = mirrored(xs, ys);
                    FitState::Done(self.terminal_fit(curve, &mirrored_xs, &mirrored_ys, attempts))
                }
                FitState::Done(fit) => return Some(fit),
            };
        }
    }

    fn fallback_state(&self) -> FitState {
        match self.kind {
            ObservableKind::Distance => FitState::FullRange,
            ObservableKind::Angle => FitState::Mirrored,
        }
    }

    fn targets<'c>(&self, curve: &'c EnergyCurve) -> &'c [f64] {
        match self.options.target {
            FitTarget::Density => curve.probabilities(),
            FitTarget::Energy => curve.energies(),
        }
    }

    fn terminal_fit(
        &self,
        curve: &EnergyCurve,
        xs: &[f64],
        ys: &[f64],
        attempts: usize,
    ) -> HarmonicFit {
        match self.solve(xs, ys) {
            Ok(parameters) if parameters.is_finite() => HarmonicFit {
                parameters,
                quality: FitQuality::BoundaryReached,
                half_width: None,
                attempts,
            },
            result => {
                warn!(
                    kind = %self.kind,
                    error = ?result.err(),
                    "Terminal fit failed, falling back to a moment estimate"
                );
                HarmonicFit {
                    parameters: self.moment_estimate(curve),
                    quality: FitQuality::MomentEstimate,
                    half_width: None,
                    attempts,
                }
            }
        }
    }

    fn solve(&self, xs: &[f64], ys: &[f64]) -> Result<HarmonicParameters, FitError> {
        match self.options.target {
            FitTarget::Density => {
                let outcome = self
                    .solver
                    .fit(&GaussianDensity, xs, ys, density_guess(xs, ys), None)?;
                let [x0, width, _] = outcome.params;
                Ok(HarmonicParameters::new(
                    force_constant_from_width(width, self.kt),
                    x0,
                ))
            }
            FitTarget::Energy => {
                let bounds = Bounds::new([f64::NEG_INFINITY, 0.0, 0.0], [f64::INFINITY; 3]);
                let outcome =
                    self.solver
                        .fit(&HarmonicWell, xs, ys, energy_guess(xs, ys), Some(&bounds))?;
                let [_, a, x0] = outcome.params;
                Ok(HarmonicParameters::new(a, x0))
            }
        }
    }

    /// `x0` is the probability-weighted mean and `w = 2σ`, with `σ` floored at half a bin.
    fn moment_estimate(&self, curve: &EnergyCurve) -> HarmonicParameters {
        let xs = curve.centers();
        let weights: Vec<f64> = curve.probabilities().iter().map(|p| p.max(0.0)).collect();
        let total: f64 = weights.iter().sum();
        let spacing = mean_spacing(xs);

        let mean = if total > 0.0 {
            xs.iter().zip(&weights).map(|(x, w)| x * w).sum::<f64>() / total
        } else {
            curve.min_index().map_or(0.0, |i| xs[i])
        };
        let variance = if total > 0.0 {
            xs.iter()
                .zip(&weights)
                .map(|(x, w)| w * (x - mean).powi(2))
                .sum::<f64>()
                / total
        } else {
            0.0
        };
        let sigma = variance.sqrt().max(0.5 * spacing).max(f64::EPSILON);
        HarmonicParameters::new(force_constant_from_width(2.0 * sigma, self.kt), mean)
    }
}

/// Fits a single observable sample set end to end.
///
/// Histograms the samples, inverts the histogram and runs the fit engine.
/// Returns `None` when no finite samples remain, which callers report as
/// "no such interaction".
pub fn fit_samples(
    kind: ObservableKind,
    samples: &[f64],
    kt: f64,
    options: &FitOptions,
) -> Option<HarmonicFit> {
    let histogram = Histogram::density(samples, options.bin_count, kind.domain()).ok()?;
    let curve = EnergyCurve::from_histogram(&histogram, kind, kt, options.probability_floor);
    HarmonicFitEngine::new(kind, kt, options).fit(&curve)
}

/// Reflects the curve about its last point: `x'[j] = 2·x_last − x[n−1−j]`,
/// `y'[j] = y[n−1−j]`, appended after the originals.
pub fn mirrored(xs: &[f64], ys: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut mirrored_xs = xs.to_vec();
    let mut mirrored_ys = ys.to_vec();
    let Some(&last) = xs.last() else {
        return (mirrored_xs, mirrored_ys);
    };
    for reflected in (0..xs.len().min(ys.len())).rev() {
        mirrored_xs.push(2.0 * last - xs[reflected]);
        mirrored_ys.push(ys[reflected]);
    }
    (mirrored_xs, mirrored_ys)
}

fn mean_spacing(xs: &[f64]) -> f64 {
    match (xs.first(), xs.last()) {
        (Some(first), Some(last)) if xs.len() > 1 => (last - first).abs() / (xs.len() - 1) as f64,
        _ => 1.0,
    }
}

/// Least-squares `y = α + β·u + γ·u²` with `u = x − mean(x)`.
///
/// Returns `(mean(x), α, β, γ)`.
fn quadratic_fit(points: impl Iterator<Item = (f64, f64)> + Clone) -> Option<(f64, f64, f64, f64)> {
    let (count, sum) = points.clone().fold((0usize, 0.0), |(n, s), (x, _)| (n + 1, s + x));
    if count < 3 {
        return None;
    }
    let center = sum / count as f64;

    let mut normal = Matrix3::<f64>::zeros();
    let mut rhs = Vector3::<f64>::zeros();
    for (x, y) in points {
        let u = x - center;
        let basis = Vector3::new(1.0, u, u * u);
        normal += basis * basis.transpose();
        rhs += basis * y;
    }
    let solution = normal.lu().solve(&rhs)?;
    Some((center, solution[0], solution[1], solution[2]))
}

/// Initial `[x0, w, A]` for a Gaussian fit.
///
/// A parabola through `ln y` gives all three directly when the window is
/// concave; otherwise the weighted moments of the window are used.
fn density_guess(xs: &[f64], ys: &[f64]) -> [f64; 3] {
    let positive = xs
        .iter()
        .zip(ys)
        .filter(|&(_, &y)| y > 0.0)
        .map(|(&x, &y)| (x, y.ln()));
    if let Some((center, alpha, beta, gamma)) = quadratic_fit(positive) {
        if gamma < 0.0 {
            let offset = -beta / (2.0 * gamma);
            let width = (-2.0 / gamma).sqrt();
            let peak = (alpha + beta * offset + gamma * offset * offset).exp();
            let guess = [center + offset, width, peak * width * FRAC_PI_2.sqrt()];
            if guess.iter().all(|v| v.is_finite()) {
                return guess;
            }
        }
    }

    let spacing = mean_spacing(xs);
    let weights: Vec<f64> = ys.iter().map(|y| y.max(0.0)).collect();
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        let mid = xs.get(xs.len() / 2).copied().unwrap_or(0.0);
        return [mid, spacing * xs.len() as f64 / 2.0, 1.0];
    }
    let mean = xs.iter().zip(&weights).map(|(x, w)| x * w).sum::<f64>() / total;
    let variance = xs
        .iter()
        .zip(&weights)
        .map(|(x, w)| w * (x - mean).powi(2))
        .sum::<f64>()
        / total;
    let mut width = 2.0 * variance.sqrt();
    if !(width.is_finite() && width > 0.0) {
        width = spacing * xs.len() as f64 / 2.0;
    }
    let peak = xs
        .iter()
        .zip(ys)
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map_or(mean, |(&x, _)| x);
    [peak, width, total * spacing]
}

/// Initial `[c, a, x0]` for a harmonic well fit.
fn energy_guess(xs: &[f64], ys: &[f64]) -> [f64; 3] {
    let points = xs.iter().copied().zip(ys.iter().copied());
    if let Some((center, alpha, beta, gamma)) = quadratic_fit(points) {
        if gamma > 0.0 {
            let offset = -beta / (2.0 * gamma);
            let constant = alpha + beta * offset + gamma * offset * offset;
            let guess = [constant, 2.0 * gamma, (center + offset).max(0.0)];
            if guess.iter().all(|v| v.is_finite()) {
                return guess;
            }
        }
    }

    let (x_min, y_min) = xs
        .iter()
        .zip(ys)
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map_or((0.0, 0.0), |(&x, &y)| (x, y));
    [y_min, 1.0, x_min.max(0.0)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng, rngs::StdRng};
    use std::f64::consts::PI;

    const KT: f64 = 8.314e-3 * 305.0;

    /// Evenly spaced quantiles of `N(mean, sigma²)`, from a tabulated CDF.
    fn gaussian_quantiles(mean: f64, sigma: f64, n: usize) -> Vec<f64> {
        let (lo, hi, steps) = (-6.0, 6.0, 240_000usize);
        let step = (hi - lo) / steps as f64;
        let pdf = |z: f64| (-0.5 * z * z).exp();

        let mut cdf = Vec::with_capacity(steps + 1);
        let mut acc = 0.0;
        cdf.push(acc);
        for i in 0..steps {
            let a = lo + i as f64 * step;
            acc += 0.5 * (pdf(a) + pdf(a + step)) * step;
            cdf.push(acc);
        }
        for value in &mut cdf {
            *value /= acc;
        }

        let mut samples = Vec::with_capacity(n);
        let mut index = 0;
        for k in 0..n {
            let q = (k as f64 + 0.5) / n as f64;
            while index + 1 < steps && cdf[index + 1] < q {
                index += 1;
            }
            let fraction = (q - cdf[index]) / (cdf[index + 1] - cdf[index]);
            samples.push(mean + sigma * (lo + (index as f64 + fraction) * step));
        }
        samples
    }

    fn noisy_gaussian(rng: &mut StdRng, mean: f64, sigma: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|_| {
                let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
                let u2: f64 = rng.gen_range(0.0..1.0);
                mean + sigma * (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
            })
            .collect()
    }

    fn relative_error(actual: f64, expected: f64) -> f64 {
        ((actual - expected) / expected).abs()
    }

    #[test]
    fn default_options_use_fifty_bins_and_half_width_two() {
        let options = FitOptions::default();
        assert_eq!(options.bin_count, 50);
        assert_eq!(options.initial_half_width, 2);
        assert_eq!(options.force_constant_floor, 0.01);
        assert_eq!(options.probability_floor, 1e-6);
        assert_eq!(options.max_attempts(), 26);
        assert_eq!(options.target, FitTarget::Density);
    }

    #[test]
    fn fit_window_is_centered_and_half_open() {
        let window = FitWindow::around(10, 2, 50).unwrap();
        assert_eq!((window.start, window.end), (8, 12));
        assert_eq!(window.len(), 4);
    }

    #[test]
    fn fit_window_stops_at_either_boundary() {
        assert!(FitWindow::around(2, 2, 50).is_none());
        assert!(FitWindow::around(48, 2, 50).is_none());
        assert!(FitWindow::around(3, 2, 50).is_some());
        assert!(FitWindow::around(47, 2, 50).is_some());
    }

    #[test]
    fn mirrored_reflects_positions_and_probabilities_about_the_last_point() {
        let (xs, ys) = mirrored(&[1.0, 2.0, 3.0], &[0.1, 0.5, 0.9]);
        assert_eq!(xs, vec![1.0, 2.0, 3.0, 3.0, 4.0, 5.0]);
        assert_eq!(ys, vec![0.1, 0.5, 0.9, 0.9, 0.5, 0.1]);
    }

    #[test]
    fn low_force_constants_are_rejected_only_for_angles() {
        let weak = Ok(HarmonicParameters::new(0.005, 1.9));
        assert!(matches!(
            AttemptOutcome::classify(ObservableKind::Angle, weak.clone(), 0.01),
            AttemptOutcome::RejectedLowConfidence(_)
        ));
        assert!(matches!(
            AttemptOutcome::classify(ObservableKind::Distance, weak, 0.01),
            AttemptOutcome::Converged(_)
        ));
    }

    #[test]
    fn non_finite_parameters_count_as_failures() {
        let outcome = AttemptOutcome::classify(
            ObservableKind::Distance,
            Ok(HarmonicParameters::new(f64::INFINITY, 0.3)),
            0.01,
        );
        assert_eq!(outcome, AttemptOutcome::Failed(FitError::NonFinite));
    }

    #[test]
    fn gaussian_bond_samples_round_trip_within_five_percent() {
        let (mean, sigma) = (0.47, 0.02);
        let samples = gaussian_quantiles(mean, sigma, 100_000);
        let fit = fit_samples(ObservableKind::Distance, &samples, KT, &FitOptions::default()).unwrap();

        let expected_k = KT / (sigma * sigma);
        assert_eq!(fit.quality, FitQuality::Converged);
        assert_eq!(fit.half_width, Some(2));
        assert!(relative_error(fit.parameters.x0, mean) < 0.05);
        assert!(
            relative_error(fit.parameters.force_constant, expected_k) < 0.05,
            "k = {}, expected {}",
            fit.parameters.force_constant,
            expected_k
        );
    }

    #[test]
    fn energy_target_recovers_the_same_force_constant() {
        let (mean, sigma) = (0.47, 0.02);
        let samples = gaussian_quantiles(mean, sigma, 100_000);
        let options = FitOptions {
            target: FitTarget::Energy,
            ..FitOptions::default()
        };
        let fit = fit_samples(ObservableKind::Distance, &samples, KT, &options).unwrap();

        assert!(relative_error(fit.parameters.x0, mean) < 0.05);
        assert!(relative_error(fit.parameters.force_constant, KT / (sigma * sigma)) < 0.05);
    }

    #[test]
    fn angle_peaked_at_right_angle_recovers_right_angle() {
        let samples = gaussian_quantiles(FRAC_PI_2, 0.1, 100_000);
        let fit = fit_samples(ObservableKind::Angle, &samples, KT, &FitOptions::default()).unwrap();

        assert_eq!(fit.quality, FitQuality::Converged);
        assert!(relative_error(fit.parameters.x0, FRAC_PI_2) < 0.02);
        assert!(fit.parameters.force_constant > 0.0);
    }

    #[test]
    fn angle_mode_at_pi_uses_the_mirrored_fallback() {
        let samples: Vec<f64> = gaussian_quantiles(3.05, 0.1, 50_000)
            .into_iter()
            .filter(|&theta| theta <= PI)
            .collect();
        let fit = fit_samples(ObservableKind::Angle, &samples, KT, &FitOptions::default()).unwrap();

        assert!(matches!(
            fit.quality,
            FitQuality::BoundaryReached | FitQuality::MomentEstimate
        ));
        assert_eq!(fit.half_width, None);
        assert!(fit.parameters.is_finite());
        assert!(fit.attempts >= 1);
    }

    #[test]
    fn rejected_angle_windows_widen_until_the_mirrored_fit() {
        let samples = gaussian_quantiles(FRAC_PI_2, 0.1, 100_000);
        let options = FitOptions {
            force_constant_floor: 1e12,
            ..FitOptions::default()
        };
        let histogram =
            Histogram::density(&samples, options.bin_count, ObservableKind::Angle.domain()).unwrap();
        let curve =
            EnergyCurve::from_histogram(&histogram, ObservableKind::Angle, KT, options.probability_floor);
        let mode = curve.min_index().unwrap();
        let widest = (mode - 1).min(curve.len() - mode - 1);

        let fit = HarmonicFitEngine::new(ObservableKind::Angle, KT, &options)
            .fit(&curve)
            .unwrap();

        assert_eq!(fit.quality, FitQuality::BoundaryReached);
        assert_eq!(fit.half_width, None);
        // One run per half-width from 2 through `widest`, then the mirrored fit.
        assert_eq!(fit.attempts, widest);
        assert!(fit.attempts > 20);
        assert!(fit.parameters.is_finite());
    }

    #[test]
    fn sub_ulp_spread_is_still_a_present_interaction() {
        let fit = fit_samples(ObservableKind::Distance, &[1.0, 1.0 + 1e-15], KT, &FitOptions::default())
            .unwrap();
        assert!(fit.parameters.is_finite());
        assert!((fit.parameters.x0 - 1.0).abs() < 0.5);
    }

    #[test]
    fn bond_mode_at_first_bin_goes_straight_to_the_full_range_fit() {
        let samples: Vec<f64> = (0..20_000)
            .map(|k| {
                let q = (k as f64 + 0.5) / 20_000.0;
                0.3 - 0.05 * (1.0 - q).ln()
            })
            .collect();
        let fit = fit_samples(ObservableKind::Distance, &samples, KT, &FitOptions::default()).unwrap();

        assert_ne!(fit.quality, FitQuality::Converged);
        assert_eq!(fit.half_width, None);
        assert_eq!(fit.attempts, 1);
        assert!(fit.parameters.is_finite());
    }

    #[test]
    fn exhausted_attempt_budget_forces_the_terminal_fit() {
        let samples = gaussian_quantiles(0.47, 0.02, 50_000);
        let options = FitOptions {
            max_attempts: Some(0),
            ..FitOptions::default()
        };
        let fit = fit_samples(ObservableKind::Distance, &samples, KT, &options).unwrap();

        assert_ne!(fit.quality, FitQuality::Converged);
        assert_eq!(fit.attempts, 1);
        assert!(fit.parameters.is_finite());
    }

    #[test]
    fn engine_always_returns_a_finite_fit_for_noisy_samples() {
        let mut rng = StdRng::seed_from_u64(305);
        for trial in 0..20 {
            let n = 50 + trial * 100;
            let bond = noisy_gaussian(&mut rng, 0.35, 0.03, n);
            let angle = noisy_gaussian(&mut rng, 2.0, 0.2, n);

            for (kind, samples) in [
                (ObservableKind::Distance, bond),
                (ObservableKind::Angle, angle),
            ] {
                let fit = fit_samples(kind, &samples, KT, &FitOptions::default())
                    .unwrap_or_else(|| panic!("no fit for {kind} trial {trial}"));
                assert!(fit.parameters.is_finite(), "{kind} trial {trial}: {fit:?}");
                assert!(fit.attempts <= FitOptions::default().max_attempts() + 1);
            }
        }
    }

    #[test]
    fn single_valued_samples_still_produce_a_fit() {
        let fit = fit_samples(ObservableKind::Distance, &[0.5; 100], KT, &FitOptions::default()).unwrap();
        assert!(fit.parameters.is_finite());
    }

    #[test]
    fn empty_samples_produce_no_fit() {
        assert!(fit_samples(ObservableKind::Distance, &[], KT, &FitOptions::default()).is_none());
        assert!(
            fit_samples(ObservableKind::Angle, &[f64::NAN], KT, &FitOptions::default()).is_none()
        );
    }

    #[test]
    fn quality_displays_in_kebab_case() {
        assert_eq!(FitQuality::BoundaryReached.to_string(), "boundary-reached");
        assert_eq!(FitTarget::Energy.to_string(), "energy");
    }
}
