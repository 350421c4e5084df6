use std::f64::consts::PI;
use std::io::{self, Write};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RdfError {
    #[error("Invalid radial range [{min}, {max}] with bin width {bin_width}")]
    InvalidRange { min: f64, max: f64, bin_width: f64 },
}

/// Pair-distance histogram accumulated frame by frame.
///
/// Normalization follows the ideal-gas convention: counts are divided by the
/// number of pairs, the sum of inverse cell volumes over frames and the shell
/// volume of each bin.
///
/// Each frame is weighted by its own density `1/V`. This matches a mean-volume
/// normalization `n_frames / ⟨V⟩` only at constant volume; under pressure
/// coupling the two differ by the spread of the cell volume.
#[derive(Debug, Clone, PartialEq)]
pub struct RdfAccumulator {
    r_min: f64,
    r_max: f64,
    bin_width: f64,
    counts: Vec<u64>,
    n_pairs: usize,
    inverse_volume_sum: f64,
}

impl RdfAccumulator {
    /// Creates `floor((r_max − r_min) / bin_width)` equal bins over `[r_min, r_max]`.
    pub fn new(r_range: (f64, f64), bin_width: f64, n_pairs: usize) -> Result<Self, RdfError> {
        let (r_min, r_max) = r_range;
        let invalid = || RdfError::InvalidRange {
            min: r_min,
            max: r_max,
            bin_width,
        };
        if !(bin_width > 0.0) || !(r_max > r_min) || r_min < 0.0 {
            return Err(invalid());
        }
        let n_bins = ((r_max - r_min) / bin_width).floor() as usize;
        if n_bins == 0 {
            return Err(invalid());
        }
        Ok(Self {
            r_min,
            r_max,
            bin_width: (r_max - r_min) / n_bins as f64,
            counts: vec![0; n_bins],
            n_pairs,
            inverse_volume_sum: 0.0,
        })
    }

    pub fn n_bins(&self) -> usize {
        self.counts.len()
    }

    /// Adds one frame's pair distances and its cell volume.
    pub fn add_frame(&mut self, distances: impl IntoIterator<Item = f64>, volume: f64) {
        self.inverse_volume_sum += 1.0 / volume;
        let last = self.counts.len() - 1;
        for r in distances {
            if !(r >= self.r_min && r <= self.r_max) {
                continue;
            }
            let index = (((r - self.r_min) / self.bin_width) as usize).min(last);
            self.counts[index] += 1;
        }
    }

    pub fn finish(&self) -> Rdf {
        let edge = |i: usize| self.r_min + i as f64 * self.bin_width;
        let (radii, g_r) = self
            .counts
            .iter()
            .enumerate()
            .map(|(i, &count)| {
                let (inner, outer) = (edge(i), edge(i + 1));
                let shell = 4.0 / 3.0 * PI * (outer.powi(3) - inner.powi(3));
                let norm = self.n_pairs as f64 * self.inverse_volume_sum * shell;
                let g = if norm > 0.0 { count as f64 / norm } else { 0.0 };
                (0.5 * (inner + outer), g)
            })
            .unzip();
        Rdf { radii, g_r }
    }
}

/// Radial distribution function sampled at bin centers.
#[derive(Debug, Clone, PartialEq)]
pub struct Rdf {
    pub radii: Vec<f64>,
    pub g_r: Vec<f64>,
}

impl Rdf {
    /// Writes whitespace-separated `r g(r)` rows.
    pub fn write_to(&self, writer: &mut impl Write) -> io::Result<()> {
        for (r, g) in self.radii.iter().zip(&self.g_r) {
            writeln!(writer, "{r:.18e} {g:.18e}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bin_count_is_floor_of_range_over_width() {
        let accumulator = RdfAccumulator::new((0.0, 2.0), 0.01, 1).unwrap();
        assert_eq!(accumulator.n_bins(), 200);
        let coarse = RdfAccumulator::new((0.0, 1.0), 0.3, 1).unwrap();
        assert_eq!(coarse.n_bins(), 3);
    }

    #[test]
    fn invalid_ranges_are_rejected() {
        assert!(RdfAccumulator::new((1.0, 1.0), 0.1, 1).is_err());
        assert!(RdfAccumulator::new((0.0, 1.0), 0.0, 1).is_err());
        assert!(RdfAccumulator::new((0.0, 0.05), 0.1, 1).is_err());
    }

    #[test]
    fn single_pair_is_normalized_by_shell_volume_and_cell_volume() {
        let mut accumulator = RdfAccumulator::new((0.0, 1.0), 0.5, 1).unwrap();
        accumulator.add_frame([0.75], 8.0);
        let rdf = accumulator.finish();

        assert_eq!(rdf.radii, vec![0.25, 0.75]);
        assert_eq!(rdf.g_r[0], 0.0);
        let shell = 4.0 / 3.0 * PI * (1.0 - 0.125);
        assert!((rdf.g_r[1] - 1.0 / (1.0 / 8.0 * shell)).abs() < 1e-12);
    }

    #[test]
    fn fluctuating_volumes_are_weighted_per_frame() {
        let mut accumulator = RdfAccumulator::new((0.0, 1.0), 1.0, 1).unwrap();
        accumulator.add_frame([0.5], 1.0);
        accumulator.add_frame([0.5], 2.0);
        let rdf = accumulator.finish();

        let shell = 4.0 / 3.0 * PI;
        let per_frame = 2.0 / (shell * (1.0 + 0.5));
        let mean_volume = 2.0 / (shell * 2.0 / 1.5);
        assert!((rdf.g_r[0] - per_frame).abs() < 1e-12);
        assert!((rdf.g_r[0] - mean_volume).abs() > 1e-3);
    }

    #[test]
    fn distances_outside_the_range_are_ignored() {
        let mut accumulator = RdfAccumulator::new((0.0, 1.0), 0.5, 2).unwrap();
        accumulator.add_frame([1.5, -0.1, f64::NAN], 1.0);
        assert!(accumulator.finish().g_r.iter().all(|&g| g == 0.0));
    }

    #[test]
    fn write_to_emits_two_columns_per_bin() {
        let rdf = Rdf {
            radii: vec![0.005, 0.015],
            g_r: vec![0.0, 1.25],
        };
        let mut buffer = Vec::new();
        rdf.write_to(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let columns: Vec<f64> = lines[1]
            .split_whitespace()
            .map(|v| v.parse().unwrap())
            .collect();
        assert_eq!(columns, vec![0.015, 1.25]);
    }
}
