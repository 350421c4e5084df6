use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum HistogramError {
    #[error("No finite samples to bin")]
    Empty,
    #[error("Bin count must be positive")]
    ZeroBins,
    #[error("Samples do not overlap the domain [{min}, {max}]")]
    OutsideDomain { min: f64, max: f64 },
}

/// A normalized probability density histogram.
///
/// `bin_edges` has one more entry than `densities`, edges are strictly
/// increasing, and `Σ densities[i] · (edges[i + 1] − edges[i]) == 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    bin_edges: Vec<f64>,
    densities: Vec<f64>,
}

impl Histogram {
    /// Bins `samples` into `bin_count` equal-width bins and normalizes to a density.
    ///
    /// Non-finite samples are dropped before binning. The binning range is the
    /// observed `[min, max]` of the remaining samples, intersected with
    /// `domain` when one is given; samples outside that range are ignored. A
    /// zero-width range is widened to `[v - 0.5, v + 0.5]`, still within the
    /// domain. The last bin is closed on the right.
    ///
    /// # Errors
    ///
    /// Returns [`HistogramError::Empty`] if no finite samples remain, which
    /// callers treat as "no such interaction".
    pub fn density(
        samples: &[f64],
        bin_count: usize,
        domain: Option<(f64, f64)>,
    ) -> Result<Self, HistogramError> {
        if bin_count == 0 {
            return Err(HistogramError::ZeroBins);
        }

        let finite: Vec<f64> = samples.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return Err(HistogramError::Empty);
        }

        let observed_min = finite.iter().copied().fold(f64::INFINITY, f64::min);
        let observed_max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let (mut lower, mut upper) = match domain {
            Some((domain_min, domain_max)) => {
                (observed_min.max(domain_min), observed_max.min(domain_max))
            }
            None => (observed_min, observed_max),
        };
        if lower > upper {
            let (min, max) = domain.unwrap_or((observed_min, observed_max));
            return Err(HistogramError::OutsideDomain { min, max });
        }
        if !edges_increase(lower, upper, bin_count) {
            let center = 0.5 * (lower + upper);
            lower = center - 0.5;
            upper = center + 0.5;
            if let Some((domain_min, domain_max)) = domain {
                lower = lower.max(domain_min);
                upper = upper.min(domain_max);
            }
        }

        let width = (upper - lower) / bin_count as f64;
        let bin_edges = edges(lower, upper, bin_count);

        let mut counts = vec![0usize; bin_count];
        for &value in &finite {
            if value < lower || value > upper {
                continue;
            }
            let index = (((value - lower) / width) as usize).min(bin_count - 1);
            counts[index] += 1;
        }

        let total: usize = counts.iter().sum();
        if total == 0 {
            return Err(HistogramError::Empty);
        }

        let densities = counts
            .iter()
            .zip(bin_edges.windows(2))
            .map(|(&count, edges)| count as f64 / (total as f64 * (edges[1] - edges[0])))
            .collect();

        Ok(Self {
            bin_edges,
            densities,
        })
    }

    pub fn bin_edges(&self) -> &[f64] {
        &self.bin_edges
    }

    pub fn densities(&self) -> &[f64] {
        &self.densities
    }

    pub fn len(&self) -> usize {
        self.densities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.densities.is_empty()
    }

    /// Midpoints of all bins.
    pub fn centers(&self) -> Vec<f64> {
        self.bin_edges
            .windows(2)
            .map(|edges| 0.5 * (edges[0] + edges[1]))
            .collect()
    }

    pub fn widths(&self) -> Vec<f64> {
        self.bin_edges
            .windows(2)
            .map(|edges| edges[1] - edges[0])
            .collect()
    }

    /// `Σ density · width`; equal to 1 up to rounding.
    pub fn integral(&self) -> f64 {
        self.densities
            .iter()
            .zip(self.widths())
            .map(|(density, width)| density * width)
            .sum()
    }
}

fn edges(lower: f64, upper: f64, bin_count: usize) -> Vec<f64> {
    let width = (upper - lower) / bin_count as f64;
    (0..=bin_count)
        .map(|i| {
            if i == bin_count {
                upper
            } else {
                lower + i as f64 * width
            }
        })
        .collect()
}

fn edges_increase(lower: f64, upper: f64, bin_count: usize) -> bool {
    upper > lower && edges(lower, upper, bin_count).windows(2).all(|e| e[1] > e[0])
}
