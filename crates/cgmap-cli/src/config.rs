use crate::cli::FitArgs;
use crate::error::{CliError, Result};
use cgmap::core::fitting::harmonic::{
    DEFAULT_BIN_COUNT, DEFAULT_FORCE_CONSTANT_FLOOR, DEFAULT_INITIAL_HALF_WIDTH, FitTarget,
};
use cgmap::core::fitting::solver::SolverSettings;
use cgmap::core::stats::boltzmann::PROBABILITY_FLOOR;
use cgmap::engine::config::{
    DEFAULT_BOLTZMANN_CONSTANT, DEFAULT_TEMPERATURE, ParameterizationConfig,
    ParameterizationConfigBuilder, ThermoState,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct DefaultsConfig {
    pub k_b: f64,
    pub temperature: f64,
    pub bin_count: usize,
    pub initial_half_width: usize,
    pub force_constant_floor: f64,
    pub probability_floor: f64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            k_b: DEFAULT_BOLTZMANN_CONSTANT,
            temperature: DEFAULT_TEMPERATURE,
            bin_count: DEFAULT_BIN_COUNT,
            initial_half_width: DEFAULT_INITIAL_HALF_WIDTH,
            force_constant_floor: DEFAULT_FORCE_CONSTANT_FLOOR,
            probability_floor: PROBABILITY_FLOOR,
        }
    }
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileThermodynamicsConfig {
    pub k_b: Option<f64>,
    pub temperature: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileSolverConfig {
    pub ftol: Option<f64>,
    pub xtol: Option<f64>,
    pub gtol: Option<f64>,
    pub max_evaluations: Option<usize>,
}

impl FileSolverConfig {
    fn into_settings(self) -> SolverSettings {
        let defaults = SolverSettings::default();
        SolverSettings {
            ftol: self.ftol.unwrap_or(defaults.ftol),
            xtol: self.xtol.unwrap_or(defaults.xtol),
            gtol: self.gtol.unwrap_or(defaults.gtol),
            max_evaluations: self.max_evaluations.or(defaults.max_evaluations),
        }
    }
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileFittingConfig {
    pub bin_count: Option<usize>,
    pub initial_half_width: Option<usize>,
    pub force_constant_floor: Option<f64>,
    pub probability_floor: Option<f64>,
    pub max_attempts: Option<usize>,
    pub target: Option<FitTarget>,
    pub solver: Option<FileSolverConfig>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileDiagnosticsConfig {
    pub output_dir: Option<PathBuf>,
}

/// Contents of a `--config` TOML file. Every value is optional.
///
/// ```toml
/// [thermodynamics]
/// temperature = 300.0
///
/// [fitting]
/// bin-count = 60
/// target = "energy"
///
/// [fitting.solver]
/// max-evaluations = 2000
///
/// [diagnostics]
/// output-dir = "diagnostics"
/// ```
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub thermodynamics: Option<FileThermodynamicsConfig>,
    pub fitting: Option<FileFittingConfig>,
    pub diagnostics: Option<FileDiagnosticsConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}

pub struct AppConfig {
    pub samples_path: PathBuf,
    pub output_path: PathBuf,
    pub thermo: ThermoState,
    pub parameterization: ParameterizationConfig,
}

/// Resolves every setting as command line, then config file, then default.
pub fn build_config(args: &FitArgs) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();

    let mut file_config = if let Some(config_path) = &args.config {
        FileConfig::from_file(config_path)?
    } else {
        FileConfig::default()
    };

    let thermo_file = file_config.thermodynamics.take().unwrap_or_default();
    let k_b = args.k_b.or(thermo_file.k_b).unwrap_or(defaults.k_b);
    let temperature = args
        .temperature
        .or(thermo_file.temperature)
        .unwrap_or(defaults.temperature);
    let thermo = ThermoState::new(k_b, temperature)?;

    let fitting_file = file_config.fitting.take().unwrap_or_default();
    let bin_count = args
        .bins
        .or(fitting_file.bin_count)
        .unwrap_or(defaults.bin_count);
    let target = args
        .target
        .map(FitTarget::from)
        .or(fitting_file.target)
        .unwrap_or_default();

    let mut builder = ParameterizationConfigBuilder::new()
        .bin_count(bin_count)
        .initial_half_width(
            fitting_file
                .initial_half_width
                .unwrap_or(defaults.initial_half_width),
        )
        .force_constant_floor(
            fitting_file
                .force_constant_floor
                .unwrap_or(defaults.force_constant_floor),
        )
        .probability_floor(
            fitting_file
                .probability_floor
                .unwrap_or(defaults.probability_floor),
        )
        .target(target)
        .solver(fitting_file.solver.unwrap_or_default().into_settings());

    if let Some(max_attempts) = fitting_file.max_attempts {
        builder = builder.max_attempts(max_attempts);
    }

    let diagnostics_dir = args.diagnostics_dir.clone().or_else(|| {
        file_config
            .diagnostics
            .take()
            .and_then(|diagnostics| diagnostics.output_dir)
    });
    if let Some(dir) = diagnostics_dir {
        builder = builder.diagnostics_dir(dir);
    }

    let parameterization = builder.build()?;
    debug!(?thermo, ?parameterization, "Resolved fit configuration.");

    Ok(AppConfig {
        samples_path: args.samples.clone(),
        output_path: args.output.clone(),
        thermo,
        parameterization,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use std::fs;
    use tempfile::tempdir;

    fn fit_args(extra: &[&str]) -> FitArgs {
        let mut argv = vec!["cgmap", "fit", "-s", "samples.csv", "-o", "params.toml"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Fit(args) => args,
            _ => panic!("Expected 'fit' subcommand"),
        }
    }

    #[test]
    fn defaults_are_used_without_file_or_flags() {
        let config = build_config(&fit_args(&[])).unwrap();
        assert_eq!(config.samples_path, PathBuf::from("samples.csv"));
        assert_eq!(config.output_path, PathBuf::from("params.toml"));
        assert_eq!(config.thermo, ThermoState::default());
        assert_eq!(config.parameterization.fit.bin_count, DEFAULT_BIN_COUNT);
        assert_eq!(config.parameterization.fit.target, FitTarget::Density);
        assert_eq!(config.parameterization.diagnostics, None);
    }

    #[test]
    fn file_values_are_overridden_by_flags() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[thermodynamics]
temperature = 280.0
k-b = 0.0083

[fitting]
bin-count = 30
initial-half-width = 3
max-attempts = 4
target = "energy"

[fitting.solver]
max-evaluations = 500

[diagnostics]
output-dir = "from-file"
"#,
        )
        .unwrap();
        let config_arg = path.to_string_lossy().to_string();
        let args = fit_args(&["-c", &config_arg, "-T", "310", "--diagnostics-dir", "cli"]);

        let config = build_config(&args).unwrap();
        assert_eq!(config.thermo.temperature(), 310.0);
        assert_eq!(config.thermo.k_b(), 0.0083);
        let fit = config.parameterization.fit;
        assert_eq!(fit.bin_count, 30);
        assert_eq!(fit.initial_half_width, 3);
        assert_eq!(fit.max_attempts, Some(4));
        assert_eq!(fit.target, FitTarget::Energy);
        assert_eq!(fit.solver.max_evaluations, Some(500));
        assert_eq!(fit.solver.ftol, SolverSettings::default().ftol);
        assert_eq!(
            config.parameterization.diagnostics.map(|d| d.output_dir),
            Some(PathBuf::from("cli"))
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[fitting]\nbins = 30\n").unwrap();

        let result = FileConfig::from_file(&path);
        assert!(matches!(result, Err(CliError::FileParsing { .. })));
    }

    #[test]
    fn missing_config_file_names_its_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        match FileConfig::from_file(&path) {
            Err(CliError::FileParsing { path: reported, .. }) => assert_eq!(reported, path),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("missing file should not load"),
        }
        let config_arg = path.to_string_lossy().to_string();
        let message = build_config(&fit_args(&["-c", &config_arg]))
            .err()
            .map(|e| e.to_string())
            .unwrap_or_default();
        assert!(message.contains("absent.toml"), "{message}");
    }

    #[test]
    fn invalid_values_surface_as_config_errors() {
        assert!(matches!(
            build_config(&fit_args(&["--temperature=-5"])),
            Err(CliError::Config(_))
        ));
        assert!(matches!(
            build_config(&fit_args(&["--bins", "2"])),
            Err(CliError::Config(_))
        ));
    }
}
