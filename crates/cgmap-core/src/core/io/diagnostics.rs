use crate::core::fitting::models::HarmonicParameters;
use crate::core::stats::boltzmann::EnergyCurve;
use crate::core::stats::histogram::Histogram;
use crate::core::stats::observable::ObservableKind;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiagnosticsError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("CSV writing error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
}

#[derive(Debug, Serialize)]
struct DistributionRow {
    bin_start: f64,
    bin_end: f64,
    center: f64,
    density: f64,
}

#[derive(Debug, Serialize)]
struct ScaledProbabilityRow {
    center: f64,
    scaled_probability: f64,
}

#[derive(Debug, Serialize)]
struct EnergyRow {
    center: f64,
    target: f64,
    predicted: f64,
}

/// Writes per-interaction distribution and energy tables into one directory.
#[derive(Debug, Clone)]
pub struct DiagnosticsWriter {
    output_dir: PathBuf,
}

impl DiagnosticsWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// `{label}_{kind}_distribution.csv`: histogram edges, centers and densities.
    pub fn write_distribution(
        &self,
        label: &str,
        kind: ObservableKind,
        histogram: &Histogram,
    ) -> Result<PathBuf, DiagnosticsError> {
        let rows = histogram
            .bin_edges()
            .windows(2)
            .zip(histogram.densities())
            .map(|(edges, &density)| DistributionRow {
                bin_start: edges[0],
                bin_end: edges[1],
                center: 0.5 * (edges[0] + edges[1]),
                density,
            });
        self.write_rows(&format!("{label}_{kind}_distribution.csv"), rows)
    }

    /// `{label}-scaled_probabilities.csv`: sin-corrected angle probabilities.
    pub fn write_scaled_probabilities(
        &self,
        label: &str,
        curve: &EnergyCurve,
    ) -> Result<PathBuf, DiagnosticsError> {
        let rows = curve
            .centers()
            .iter()
            .zip(curve.probabilities())
            .map(|(&center, &scaled_probability)| ScaledProbabilityRow {
                center,
                scaled_probability,
            });
        self.write_rows(&format!("{label}-scaled_probabilities.csv"), rows)
    }

    /// `{label}_{kind}_energies.csv`: inverted target energies next to the fitted harmonic.
    pub fn write_energies(
        &self,
        label: &str,
        kind: ObservableKind,
        curve: &EnergyCurve,
        parameters: &HarmonicParameters,
    ) -> Result<PathBuf, DiagnosticsError> {
        let rows = curve
            .centers()
            .iter()
            .zip(curve.energies())
            .map(|(&center, &target)| EnergyRow {
                center,
                target,
                predicted: parameters.energy(center),
            });
        self.write_rows(&format!("{label}_{kind}_energies.csv"), rows)
    }

    fn write_rows<R: Serialize>(
        &self,
        file_name: &str,
        rows: impl IntoIterator<Item = R>,
    ) -> Result<PathBuf, DiagnosticsError> {
        std::fs::create_dir_all(&self.output_dir).map_err(|e| DiagnosticsError::Io {
            path: self.output_dir.to_string_lossy().to_string(),
            source: e,
        })?;

        let path = self.output_dir.join(file_name);
        let path_str = path.to_string_lossy().to_string();
        let mut writer = csv::Writer::from_path(&path).map_err(|e| DiagnosticsError::Csv {
            path: path_str.clone(),
            source: e,
        })?;
        for row in rows {
            writer.serialize(row).map_err(|e| DiagnosticsError::Csv {
                path: path_str.clone(),
                source: e,
            })?;
        }
        writer.flush().map_err(|e| DiagnosticsError::Io {
            path: path_str,
            source: e,
        })?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const KT: f64 = 2.5;

    fn histogram() -> Histogram {
        Histogram::density(&[1.0, 1.2, 1.2, 1.4, 1.6], 4, ObservableKind::Angle.domain()).unwrap()
    }

    #[test]
    fn distribution_file_uses_label_and_kind() {
        let dir = tempdir().unwrap();
        let writer = DiagnosticsWriter::new(dir.path());
        let path = writer
            .write_distribution("A-B-C", ObservableKind::Angle, &histogram())
            .unwrap();

        assert_eq!(path.file_name().unwrap(), "A-B-C_angle_distribution.csv");
        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("bin_start,bin_end,center,density"));
        assert_eq!(lines.count(), 4);
    }

    #[test]
    fn scaled_probabilities_and_energies_are_written_per_bin() {
        let dir = tempdir().unwrap();
        let writer = DiagnosticsWriter::new(dir.path().join("nested"));
        let curve =
            EnergyCurve::from_histogram(&histogram(), ObservableKind::Angle, KT, 1e-6);
        let parameters = HarmonicParameters::new(10.0, 1.3);

        let scaled = writer.write_scaled_probabilities("A-B-C", &curve).unwrap();
        let energies = writer
            .write_energies("A-B-C", ObservableKind::Angle, &curve, &parameters)
            .unwrap();

        assert_eq!(scaled.file_name().unwrap(), "A-B-C-scaled_probabilities.csv");
        assert_eq!(energies.file_name().unwrap(), "A-B-C_angle_energies.csv");

        let mut reader = csv::Reader::from_path(&energies).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, vec!["center", "target", "predicted"]);
        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 4);
        let center: f64 = rows[0][0].parse().unwrap();
        let predicted: f64 = rows[0][2].parse().unwrap();
        assert!((predicted - parameters.energy(center)).abs() < 1e-9);
    }

    #[test]
    fn bond_tables_use_bond_in_the_file_name() {
        let dir = tempdir().unwrap();
        let writer = DiagnosticsWriter::new(dir.path());
        let histogram = Histogram::density(&[0.3, 0.31, 0.35], 3, None).unwrap();
        let curve = EnergyCurve::from_histogram(&histogram, ObservableKind::Distance, KT, 1e-6);

        let distribution = writer
            .write_distribution("P4-C1", ObservableKind::Distance, &histogram)
            .unwrap();
        let energies = writer
            .write_energies(
                "P4-C1",
                ObservableKind::Distance,
                &curve,
                &HarmonicParameters::new(1000.0, 0.31),
            )
            .unwrap();

        assert_eq!(distribution.file_name().unwrap(), "P4-C1_bond_distribution.csv");
        assert_eq!(energies.file_name().unwrap(), "P4-C1_bond_energies.csv");
    }
}
