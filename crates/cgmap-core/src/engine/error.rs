use thiserror::Error;

use crate::core::mapping::assembler::MappingError;
use crate::core::stats::histogram::HistogramError;
use crate::core::stats::rdf::RdfError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Topology has no bonds; bonded interactions cannot be parameterized")]
    MissingTopology,

    #[error("Frame {frame} has no unit cell")]
    MissingUnitCell { frame: usize },

    #[error("Histogram construction failed: {source}")]
    Histogram {
        #[from]
        source: HistogramError,
    },

    #[error("Radial distribution failed: {source}")]
    Rdf {
        #[from]
        source: RdfError,
    },

    #[error("Coarse-grained mapping failed: {source}")]
    Mapping {
        #[from]
        source: MappingError,
    },
}
