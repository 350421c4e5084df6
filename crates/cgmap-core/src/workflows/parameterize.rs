use crate::core::fitting::harmonic::{FitQuality, HarmonicFit};
use crate::core::io::diagnostics::DiagnosticsWriter;
use crate::core::models::trajectory::Trajectory;
use crate::core::stats::observable::ObservableKind;
use crate::engine::config::ParameterizationConfig;
use crate::engine::context::ThermodynamicContext;
use crate::engine::error::EngineError;
use crate::engine::observables::{self, InteractionQuery, ObservableSamples};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::tasks;
use serde::Serialize;
use tracing::{info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterEntry {
    pub interaction: String,
    pub kind: ObservableKind,
    pub n_samples: usize,
    pub fit: HarmonicFit,
}

/// Fitted parameters in query order, plus the queries with no samples.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParameterSet {
    pub entries: Vec<ParameterEntry>,
    pub missing: Vec<String>,
}

impl ParameterSet {
    pub fn get(&self, interaction: &str) -> Option<&ParameterEntry> {
        self.entries
            .iter()
            .find(|entry| entry.interaction == interaction)
    }

    pub fn of_kind(&self, kind: ObservableKind) -> impl Iterator<Item = &ParameterEntry> {
        self.entries.iter().filter(move |entry| entry.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Every bonded type pair and angle type triplet of the context's topology.
pub fn discover_interactions<T>(context: &ThermodynamicContext<'_, T>) -> Vec<InteractionQuery>
where
    T: Trajectory + Sync,
{
    let topology = context.trajectory().topology();
    let mut queries = observables::bonded_type_pairs(topology);
    queries.extend(observables::angle_type_triplets(topology, context.graph()));
    queries
}

#[instrument(skip_all, name = "parameterization_workflow")]
pub fn run<T>(
    context: &ThermodynamicContext<'_, T>,
    queries: &[InteractionQuery],
    config: &ParameterizationConfig,
    reporter: &ProgressReporter,
) -> Result<ParameterSet, EngineError>
where
    T: Trajectory + Sync,
{
    reporter.report(Progress::PhaseStart { name: "Sampling" });
    info!(
        interactions = queries.len(),
        frames = context.trajectory().n_frames(),
        "Sampling observables."
    );
    reporter.report(Progress::TaskStart {
        total_steps: queries.len() as u64,
    });
    let sample_sets: Vec<ObservableSamples> = queries
        .iter()
        .map(|query| {
            let samples = context.samples(query);
            reporter.report(Progress::TaskIncrement);
            samples
        })
        .collect();
    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    let writer = config
        .diagnostics
        .as_ref()
        .map(|diagnostics| DiagnosticsWriter::new(diagnostics.output_dir.clone()))
        .or_else(|| context.diagnostics().cloned());
    fit_all(&sample_sets, context.kt(), config, writer.as_ref(), reporter)
}

/// Fits sample sets gathered elsewhere, one independent fit per set.
#[instrument(skip_all, name = "sample_fitting_workflow")]
pub fn fit_sample_sets(
    sample_sets: &[ObservableSamples],
    kt: f64,
    config: &ParameterizationConfig,
    reporter: &ProgressReporter,
) -> Result<ParameterSet, EngineError> {
    let writer = config
        .diagnostics
        .as_ref()
        .map(|diagnostics| DiagnosticsWriter::new(diagnostics.output_dir.clone()));
    fit_all(sample_sets, kt, config, writer.as_ref(), reporter)
}

fn fit_all(
    sample_sets: &[ObservableSamples],
    kt: f64,
    config: &ParameterizationConfig,
    writer: Option<&DiagnosticsWriter>,
    reporter: &ProgressReporter,
) -> Result<ParameterSet, EngineError> {
    reporter.report(Progress::PhaseStart { name: "Fitting" });
    info!(
        interactions = sample_sets.len(),
        kt,
        target = %config.fit.target,
        "Fitting harmonic parameters."
    );
    reporter.report(Progress::TaskStart {
        total_steps: sample_sets.len() as u64,
    });

    #[cfg(not(feature = "parallel"))]
    let iterator = sample_sets.iter();

    #[cfg(feature = "parallel")]
    let iterator = sample_sets.par_iter();

    let fits = iterator
        .map(|samples| {
            let fit = tasks::inversion::run(samples, kt, &config.fit, writer)?;
            reporter.report(Progress::InteractionFitted {
                label: samples.label(),
                quality: fit.map(|fit| fit.quality),
            });
            reporter.report(Progress::TaskIncrement);
            Ok(fit)
        })
        .collect::<Result<Vec<Option<HarmonicFit>>, EngineError>>()?;

    reporter.report(Progress::TaskFinish);

    let mut parameters = ParameterSet::default();
    for (samples, fit) in sample_sets.iter().zip(fits) {
        let interaction = samples.label();
        match fit {
            Some(fit) => {
                if fit.quality != FitQuality::Converged {
                    warn!(
                        "{}: accepted a {} fit after {} attempts.",
                        interaction, fit.quality, fit.attempts
                    );
                }
                parameters.entries.push(ParameterEntry {
                    interaction,
                    kind: samples.kind(),
                    n_samples: samples.len(),
                    fit,
                });
            }
            None => {
                warn!("{}: no samples, interaction skipped.", interaction);
                parameters.missing.push(interaction);
            }
        }
    }

    let fallbacks = parameters
        .entries
        .iter()
        .filter(|entry| entry.fit.quality != FitQuality::Converged)
        .count();
    info!(
        fitted = parameters.len(),
        fallbacks,
        missing = parameters.missing.len(),
        "Parameterization finished."
    );
    reporter.report(Progress::Summary {
        fitted: parameters.len(),
        fallbacks,
        missing: parameters.missing.len(),
    });
    reporter.report(Progress::PhaseFinish);
    Ok(parameters)
}
