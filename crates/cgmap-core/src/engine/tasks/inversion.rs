use crate::core::fitting::harmonic::{FitOptions, HarmonicFit, HarmonicFitEngine};
use crate::core::io::diagnostics::DiagnosticsWriter;
use crate::core::stats::boltzmann::EnergyCurve;
use crate::core::stats::histogram::{Histogram, HistogramError};
use crate::core::stats::observable::ObservableKind;
use crate::engine::error::EngineError;
use crate::engine::observables::ObservableSamples;
use tracing::{debug, instrument, warn};

/// Histogram, invert and fit one sample set.
///
/// An empty sample set (after dropping non-finite values) is reported as
/// `Ok(None)`. When `diagnostics` is set the intermediate tables are written
/// next to the fit; failures to write them are logged and otherwise ignored.
#[instrument(skip_all, name = "inversion_task", fields(interaction = %samples.query))]
pub fn run(
    samples: &ObservableSamples,
    kt: f64,
    options: &FitOptions,
    diagnostics: Option<&DiagnosticsWriter>,
) -> Result<Option<HarmonicFit>, EngineError> {
    let kind = samples.kind();
    let histogram = match Histogram::density(&samples.values, options.bin_count, kind.domain()) {
        Ok(histogram) => histogram,
        Err(HistogramError::Empty) => {
            debug!("No finite samples; interaction is absent.");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };
    let curve = EnergyCurve::from_histogram(&histogram, kind, kt, options.probability_floor);
    let fit = HarmonicFitEngine::new(kind, kt, options).fit(&curve);

    if let Some(fit) = &fit {
        debug!(
            k = fit.parameters.force_constant,
            x0 = fit.parameters.x0,
            quality = %fit.quality,
            attempts = fit.attempts,
            "Fitted harmonic parameters."
        );
    }
    if let Some(writer) = diagnostics {
        write_diagnostics(writer, samples, &histogram, &curve, fit.as_ref());
    }
    Ok(fit)
}

fn write_diagnostics(
    writer: &DiagnosticsWriter,
    samples: &ObservableSamples,
    histogram: &Histogram,
    curve: &EnergyCurve,
    fit: Option<&HarmonicFit>,
) {
    let label = samples.label();
    let kind = samples.kind();
    let mut results = vec![writer.write_distribution(&label, kind, histogram)];
    if kind == ObservableKind::Angle {
        results.push(writer.write_scaled_probabilities(&label, curve));
    }
    if let Some(fit) = fit {
        results.push(writer.write_energies(&label, kind, curve, &fit.parameters));
    }
    for result in results {
        if let Err(e) = result {
            warn!("Skipping diagnostics for {}: {}", label, e);
        }
    }
}
