use crate::cli::FitArgs;
use crate::config::build_config;
use crate::error::{CliError, Result};
use crate::io::{parameters, samples};
use crate::utils::progress::CliProgressHandler;
use cgmap::engine::progress::ProgressReporter;
use cgmap::workflows::parameterize;
use tracing::{info, instrument};

#[instrument(skip_all, name = "fit_command")]
pub fn run(args: FitArgs) -> Result<()> {
    let config = build_config(&args)?;
    info!(
        temperature = config.thermo.temperature(),
        kt = config.thermo.kt(),
        "Configuration resolved."
    );

    let sample_sets = samples::read_samples(&config.samples_path)?;
    if sample_sets.is_empty() {
        return Err(CliError::FileParsing {
            path: config.samples_path.clone(),
            source: anyhow::anyhow!("no sample rows found"),
        });
    }

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    let parameter_set = parameterize::fit_sample_sets(
        &sample_sets,
        config.thermo.kt(),
        &config.parameterization,
        &reporter,
    )?;

    parameters::write_parameters(&config.output_path, &parameter_set, &config.thermo)?;

    println!(
        "Fitted {} interaction(s), {} without samples. Parameters written to {}",
        parameter_set.len(),
        parameter_set.missing.len(),
        config.output_path.display()
    );
    Ok(())
}
