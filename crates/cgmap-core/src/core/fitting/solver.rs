use super::models::FitModel;
use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt as Minimizer, TerminationReason};
use nalgebra::storage::Owned;
use nalgebra::{Const, DVector, Dyn, Matrix, OMatrix, SVector, Vector};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum FitError {
    #[error("Need at least {required} points to fit, got {found}")]
    InsufficientData { required: usize, found: usize },
    #[error("Fit did not converge within {evaluations} function evaluations")]
    NotConverged { evaluations: usize },
    #[error("Model produced non-finite values")]
    NonFinite,
    #[error("Solver stopped without converging: {0}")]
    Stalled(String),
}

/// Box constraints, enforced by fitting in an unbounded internal space.
///
/// A lower bound alone maps `p = lo − 1 + √(u² + 1)`, an upper bound alone
/// `p = hi + 1 − √(u² + 1)`, and both `p = lo + (sin u + 1)·(hi − lo)/2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds<const N: usize> {
    pub lower: [f64; N],
    pub upper: [f64; N],
}

impl<const N: usize> Bounds<N> {
    pub fn new(lower: [f64; N], upper: [f64; N]) -> Self {
        Self { lower, upper }
    }

    fn to_internal(&self, k: usize, value: f64) -> f64 {
        let (lo, hi) = (self.lower[k], self.upper[k]);
        let value = value.clamp(lo, hi);
        match (lo.is_finite(), hi.is_finite()) {
            (true, true) => (2.0 * (value - lo) / (hi - lo) - 1.0).asin(),
            (true, false) => ((value - lo + 1.0).powi(2) - 1.0).sqrt(),
            (false, true) => ((hi - value + 1.0).powi(2) - 1.0).sqrt(),
            (false, false) => value,
        }
    }

    fn to_external(&self, k: usize, internal: f64) -> f64 {
        let (lo, hi) = (self.lower[k], self.upper[k]);
        match (lo.is_finite(), hi.is_finite()) {
            (true, true) => lo + (internal.sin() + 1.0) * (hi - lo) / 2.0,
            (true, false) => lo - 1.0 + (internal * internal + 1.0).sqrt(),
            (false, true) => hi + 1.0 - (internal * internal + 1.0).sqrt(),
            (false, false) => internal,
        }
    }

    /// `∂external/∂internal` for parameter `k`.
    fn derivative(&self, k: usize, internal: f64) -> f64 {
        let (lo, hi) = (self.lower[k], self.upper[k]);
        match (lo.is_finite(), hi.is_finite()) {
            (true, true) => internal.cos() * (hi - lo) / 2.0,
            (true, false) => internal / (internal * internal + 1.0).sqrt(),
            (false, true) => -internal / (internal * internal + 1.0).sqrt(),
            (false, false) => 1.0,
        }
    }
}

/// Termination settings for [`LevenbergMarquardt`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverSettings {
    /// Relative reduction in the sum of squares below which the fit has converged.
    pub ftol: f64,
    /// Relative step size below which the fit has converged.
    pub xtol: f64,
    /// Orthogonality between residuals and Jacobian columns below which the fit has converged.
    pub gtol: f64,
    /// Evaluation cap; `None` means `200 · (N + 1)`.
    pub max_evaluations: Option<usize>,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            ftol: 1.49012e-8,
            xtol: 1.49012e-8,
            gtol: 1e-12,
            max_evaluations: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitOutcome<const N: usize> {
    pub params: [f64; N],
    /// Half the sum of squared residuals at `params`.
    pub cost: f64,
    pub evaluations: usize,
}

/// Curve-fitting front end for the MINPACK-style minimizer of the
/// `levenberg-marquardt` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct LevenbergMarquardt {
    settings: SolverSettings,
}

impl LevenbergMarquardt {
    pub fn new(settings: SolverSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    /// Minimizes `Σ (ys[i] − model(xs[i], p))²` starting from `initial`.
    ///
    /// Returns `Ok` only when one of the tolerance criteria is met before the
    /// evaluation cap.
    pub fn fit<M: FitModel<N>, const N: usize>(
        &self,
        model: &M,
        xs: &[f64],
        ys: &[f64],
        initial: [f64; N],
        bounds: Option<&Bounds<N>>,
    ) -> Result<FitOutcome<N>, FitError> {
        let found = xs.len().min(ys.len());
        if found < N {
            return Err(FitError::InsufficientData { required: N, found });
        }

        let problem = CurveProblem::new(model, &xs[..found], &ys[..found], initial, bounds);
        if !problem.residual_values().all(f64::is_finite) {
            return Err(FitError::NonFinite);
        }

        let patience = self
            .settings
            .max_evaluations
            .map_or(200, |cap| (cap / (N + 1)).max(1));
        let (problem, report) = Minimizer::new()
            .with_ftol(self.settings.ftol)
            .with_xtol(self.settings.xtol)
            .with_gtol(self.settings.gtol)
            .with_patience(patience)
            .minimize(problem);

        match report.termination {
            TerminationReason::Converged { .. }
            | TerminationReason::Orthogonal
            | TerminationReason::ResidualsZero => {
                let params = problem.external();
                if !params.iter().all(|v| v.is_finite()) {
                    return Err(FitError::NonFinite);
                }
                Ok(FitOutcome {
                    params,
                    cost: report.objective_function,
                    evaluations: report.number_of_evaluations,
                })
            }
            TerminationReason::LostPatience => Err(FitError::NotConverged {
                evaluations: report.number_of_evaluations,
            }),
            TerminationReason::Numerical(_) => Err(FitError::NonFinite),
            reason => Err(FitError::Stalled(format!("{reason:?}"))),
        }
    }
}

/// Residuals `model(x, p) − y` over internal (unbounded) parameters.
struct CurveProblem<'a, M, const N: usize> {
    model: &'a M,
    xs: &'a [f64],
    ys: &'a [f64],
    bounds: Option<&'a Bounds<N>>,
    internal: SVector<f64, N>,
}

impl<'a, M: FitModel<N>, const N: usize> CurveProblem<'a, M, N> {
    fn new(
        model: &'a M,
        xs: &'a [f64],
        ys: &'a [f64],
        initial: [f64; N],
        bounds: Option<&'a Bounds<N>>,
    ) -> Self {
        let internal = SVector::<f64, N>::from_fn(|k, _| match bounds {
            Some(bounds) => bounds.to_internal(k, initial[k]),
            None => initial[k],
        });
        Self {
            model,
            xs,
            ys,
            bounds,
            internal,
        }
    }

    fn external(&self) -> [f64; N] {
        std::array::from_fn(|k| match self.bounds {
            Some(bounds) => bounds.to_external(k, self.internal[k]),
            None => self.internal[k],
        })
    }

    fn residual_values(&self) -> impl Iterator<Item = f64> + '_ {
        let params = self.external();
        self.xs
            .iter()
            .zip(self.ys)
            .map(move |(&x, &y)| self.model.value(x, &params) - y)
    }
}

impl<M: FitModel<N>, const N: usize> LeastSquaresProblem<f64, Dyn, Const<N>>
    for CurveProblem<'_, M, N>
{
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, Const<N>>;
    type ParameterStorage = Owned<f64, Const<N>>;

    fn set_params(&mut self, x: &Vector<f64, Const<N>, Self::ParameterStorage>) {
        self.internal.copy_from(x);
    }

    fn params(&self) -> Vector<f64, Const<N>, Self::ParameterStorage> {
        self.internal
    }

    fn residuals(&self) -> Option<Vector<f64, Dyn, Self::ResidualStorage>> {
        Some(DVector::from_iterator(self.xs.len(), self.residual_values()))
    }

    fn jacobian(&self) -> Option<Matrix<f64, Dyn, Const<N>, Self::JacobianStorage>> {
        let params = self.external();
        let chain: [f64; N] = std::array::from_fn(|k| match self.bounds {
            Some(bounds) => bounds.derivative(k, self.internal[k]),
            None => 1.0,
        });
        let rows: Vec<[f64; N]> = self
            .xs
            .iter()
            .map(|&x| self.model.gradient(x, &params))
            .collect();
        Some(OMatrix::<f64, Dyn, Const<N>>::from_fn(
            self.xs.len(),
            |i, k| rows[i][k] * chain[k],
        ))
    }
}
