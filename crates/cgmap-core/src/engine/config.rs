use crate::core::fitting::harmonic::{FitOptions, FitTarget};
use crate::core::fitting::solver::SolverSettings;
use crate::core::mapping::assembler::DEFAULT_WATERS_PER_BEAD;
use std::path::PathBuf;
use thiserror::Error;

/// Boltzmann constant in kJ/(mol·K).
pub const DEFAULT_BOLTZMANN_CONSTANT: f64 = 8.314e-3;
/// Temperature in K.
pub const DEFAULT_TEMPERATURE: f64 = 305.0;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidValue {
        parameter: &'static str,
        reason: String,
    },
}

fn positive(parameter: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidValue {
            parameter,
            reason: format!("expected a positive finite number, got {value}"),
        })
    }
}

/// Thermodynamic state the inversion is performed at.
///
/// Immutable once built; a different temperature means a different state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermoState {
    k_b: f64,
    temperature: f64,
}

impl Default for ThermoState {
    fn default() -> Self {
        Self {
            k_b: DEFAULT_BOLTZMANN_CONSTANT,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl ThermoState {
    pub fn new(k_b: f64, temperature: f64) -> Result<Self, ConfigError> {
        Ok(Self {
            k_b: positive("k_b", k_b)?,
            temperature: positive("temperature", temperature)?,
        })
    }

    pub fn k_b(&self) -> f64 {
        self.k_b
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Thermal energy `k_B · T`.
    pub fn kt(&self) -> f64 {
        self.k_b * self.temperature
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticsConfig {
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterizationConfig {
    pub fit: FitOptions,
    pub diagnostics: Option<DiagnosticsConfig>,
}

#[derive(Default)]
pub struct ParameterizationConfigBuilder {
    bin_count: Option<usize>,
    initial_half_width: Option<usize>,
    force_constant_floor: Option<f64>,
    probability_floor: Option<f64>,
    max_attempts: Option<usize>,
    target: Option<FitTarget>,
    solver: Option<SolverSettings>,
    diagnostics_dir: Option<PathBuf>,
}

impl ParameterizationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bin_count(mut self, n: usize) -> Self {
        self.bin_count = Some(n);
        self
    }
    pub fn initial_half_width(mut self, n: usize) -> Self {
        self.initial_half_width = Some(n);
        self
    }
    pub fn force_constant_floor(mut self, floor: f64) -> Self {
        self.force_constant_floor = Some(floor);
        self
    }
    pub fn probability_floor(mut self, floor: f64) -> Self {
        self.probability_floor = Some(floor);
        self
    }
    pub fn max_attempts(mut self, n: usize) -> Self {
        self.max_attempts = Some(n);
        self
    }
    pub fn target(mut self, target: FitTarget) -> Self {
        self.target = Some(target);
        self
    }
    pub fn solver(mut self, settings: SolverSettings) -> Self {
        self.solver = Some(settings);
        self
    }
    pub fn diagnostics_dir(mut self, dir: PathBuf) -> Self {
        self.diagnostics_dir = Some(dir);
        self
    }

    pub fn build(self) -> Result<ParameterizationConfig, ConfigError> {
        let bin_count = self
            .bin_count
            .ok_or(ConfigError::MissingParameter("bin_count"))?;
        let initial_half_width = self
            .initial_half_width
            .ok_or(ConfigError::MissingParameter("initial_half_width"))?;
        let force_constant_floor = self
            .force_constant_floor
            .ok_or(ConfigError::MissingParameter("force_constant_floor"))?;
        let probability_floor = self
            .probability_floor
            .ok_or(ConfigError::MissingParameter("probability_floor"))?;

        if bin_count < 3 {
            return Err(ConfigError::InvalidValue {
                parameter: "bin_count",
                reason: format!("at least 3 bins are needed for a fit, got {bin_count}"),
            });
        }
        if initial_half_width == 0 {
            return Err(ConfigError::InvalidValue {
                parameter: "initial_half_width",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(force_constant_floor.is_finite() && force_constant_floor >= 0.0) {
            return Err(ConfigError::InvalidValue {
                parameter: "force_constant_floor",
                reason: format!("expected a non-negative number, got {force_constant_floor}"),
            });
        }
        let probability_floor = positive("probability_floor", probability_floor)?;

        Ok(ParameterizationConfig {
            fit: FitOptions {
                bin_count,
                initial_half_width,
                force_constant_floor,
                probability_floor,
                max_attempts: self.max_attempts,
                target: self.target.unwrap_or_default(),
                solver: self.solver.unwrap_or_default(),
            },
            diagnostics: self
                .diagnostics_dir
                .map(|output_dir| DiagnosticsConfig { output_dir }),
        })
    }
}

/// Radial distribution settings. Distances share the trajectory's length unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RdfOptions {
    pub r_range: (f64, f64),
    pub bin_width: f64,
    /// Pairs separated by at most this many bonds are left out.
    pub exclude_up_to: Option<usize>,
}

impl Default for RdfOptions {
    fn default() -> Self {
        Self {
            r_range: (0.0, 2.0),
            bin_width: 0.01,
            exclude_up_to: Some(3),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappingOptions {
    pub waters_per_bead: usize,
}

impl Default for MappingOptions {
    fn default() -> Self {
        Self {
            waters_per_bead: DEFAULT_WATERS_PER_BEAD,
        }
    }
}
