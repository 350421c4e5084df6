//! Per-interaction computations on a thermodynamic context.
//!
//! Each task is a pure function of its inputs: [`inversion`] turns one
//! observable sample set into harmonic parameters, [`rdf`] accumulates a
//! radial distribution between two particle types.

pub mod inversion;
pub mod rdf;
