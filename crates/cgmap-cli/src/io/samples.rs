use crate::error::{CliError, Result};
use cgmap::engine::observables::{InteractionQuery, ObservableSamples};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct SampleRecord {
    interaction: String,
    value: f64,
}

/// Reads an `interaction,value` CSV file into one sample set per interaction,
/// in the order each interaction first appears.
pub fn read_samples(path: &Path) -> Result<Vec<ObservableSamples>> {
    let file = std::fs::File::open(path).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })?;
    let sample_sets = parse_samples(file).map_err(|source| CliError::FileParsing {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(
        interactions = sample_sets.len(),
        "Read sample sets from {:?}", path
    );
    Ok(sample_sets)
}

fn parse_samples(reader: impl Read) -> anyhow::Result<Vec<ObservableSamples>> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let mut sample_sets: Vec<ObservableSamples> = Vec::new();
    let mut index: HashMap<InteractionQuery, usize> = HashMap::new();

    for (row, record) in csv_reader.deserialize::<SampleRecord>().enumerate() {
        // Header is line 1.
        let line = row + 2;
        let record = record.map_err(|e| anyhow::anyhow!("line {line}: {e}"))?;
        let query = InteractionQuery::parse(&record.interaction).ok_or_else(|| {
            anyhow::anyhow!(
                "line {line}: '{}' is not a bond (A-B) or angle (A-B-C) label",
                record.interaction
            )
        })?;
        if !record.value.is_finite() {
            anyhow::bail!("line {line}: non-finite value for '{}'", record.interaction);
        }

        let slot = *index.entry(query.clone()).or_insert_with(|| {
            sample_sets.push(ObservableSamples {
                query,
                values: Vec::new(),
            });
            sample_sets.len() - 1
        });
        sample_sets[slot].values.push(record.value);
    }

    Ok(sample_sets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmap::core::stats::observable::ObservableKind;

    #[test]
    fn rows_are_grouped_in_first_seen_order() {
        let data = "interaction,value\nP-Q-P,1.9\nP-Q,0.35\nP-Q-P, 2.1\nP-Q,0.36\n";
        let sets = parse_samples(data.as_bytes()).unwrap();

        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].query, InteractionQuery::angle("P", "Q", "P"));
        assert_eq!(sets[0].kind(), ObservableKind::Angle);
        assert_eq!(sets[0].values, vec![1.9, 2.1]);
        assert_eq!(sets[1].query, InteractionQuery::bond("P", "Q"));
        assert_eq!(sets[1].values, vec![0.35, 0.36]);
    }

    #[test]
    fn invalid_labels_report_their_line() {
        let data = "interaction,value\nP-Q,0.35\nP,0.4\n";
        let message = parse_samples(data.as_bytes()).unwrap_err().to_string();
        assert!(message.contains("line 3"), "{message}");
    }

    #[test]
    fn unparsable_values_are_rejected() {
        let data = "interaction,value\nP-Q,abc\n";
        assert!(parse_samples(data.as_bytes()).is_err());
        let data = "interaction,value\nP-Q,NaN\n";
        assert!(parse_samples(data.as_bytes()).is_err());
    }

    #[test]
    fn missing_file_is_a_parsing_error_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.csv");
        assert!(matches!(
            read_samples(&path),
            Err(CliError::FileParsing { path: ref p, .. }) if *p == path
        ));
    }
}
