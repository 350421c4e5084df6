use crate::error::{CliError, Result};
use cgmap::core::fitting::harmonic::FitQuality;
use cgmap::core::stats::observable::ObservableKind;
use cgmap::engine::config::ThermoState;
use cgmap::workflows::parameterize::{ParameterEntry, ParameterSet};
use serde::Serialize;
use std::path::Path;
use tracing::debug;

/// One fitted interaction, flattened for tabular output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterRecord {
    pub interaction: String,
    pub kind: ObservableKind,
    pub force_constant: f64,
    pub x0: f64,
    pub quality: FitQuality,
    pub samples: usize,
    pub half_width: Option<usize>,
    pub attempts: usize,
}

impl From<&ParameterEntry> for ParameterRecord {
    fn from(entry: &ParameterEntry) -> Self {
        Self {
            interaction: entry.interaction.clone(),
            kind: entry.kind,
            force_constant: entry.fit.parameters.force_constant,
            x0: entry.fit.parameters.x0,
            quality: entry.fit.quality,
            samples: entry.n_samples,
            half_width: entry.fit.half_width,
            attempts: entry.fit.attempts,
        }
    }
}

#[derive(Debug, Serialize)]
struct ThermodynamicsRecord {
    k_b: f64,
    temperature: f64,
    kt: f64,
}

// Plain values must precede tables in TOML output.
#[derive(Debug, Serialize)]
struct ParameterDocument {
    missing: Vec<String>,
    thermodynamics: ThermodynamicsRecord,
    parameters: Vec<ParameterRecord>,
}

/// Writes fitted parameters as TOML or CSV, chosen by the file extension.
///
/// The CSV form carries only the fitted rows; interactions without samples
/// and the thermodynamic state are recorded in the TOML form alone.
pub fn write_parameters(path: &Path, parameters: &ParameterSet, thermo: &ThermoState) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let content = match extension.as_deref() {
        Some("toml") => to_toml(parameters, thermo),
        Some("csv") => to_csv(parameters),
        _ => {
            return Err(CliError::Argument(format!(
                "unsupported parameter output '{}' (expected .toml or .csv)",
                path.display()
            )));
        }
    }
    .map_err(|source| CliError::FileWriting {
        path: path.to_path_buf(),
        source,
    })?;

    std::fs::write(path, content).map_err(|e| CliError::FileWriting {
        path: path.to_path_buf(),
        source: e.into(),
    })?;
    debug!(entries = parameters.len(), "Wrote parameters to {:?}", path);
    Ok(())
}

fn to_toml(parameters: &ParameterSet, thermo: &ThermoState) -> anyhow::Result<String> {
    let document = ParameterDocument {
        missing: parameters.missing.clone(),
        thermodynamics: ThermodynamicsRecord {
            k_b: thermo.k_b(),
            temperature: thermo.temperature(),
            kt: thermo.kt(),
        },
        parameters: parameters.entries.iter().map(ParameterRecord::from).collect(),
    };
    Ok(toml::to_string_pretty(&document)?)
}

fn to_csv(parameters: &ParameterSet) -> anyhow::Result<String> {
    let mut buffer = Vec::new();
    {
        let mut writer = csv::Writer::from_writer(&mut buffer);
        for entry in &parameters.entries {
            writer.serialize(ParameterRecord::from(entry))?;
        }
        writer.flush()?;
    }
    Ok(String::from_utf8(buffer)?)
}
