//! # Fitting Module
//!
//! Harmonic parameter inference from Boltzmann-inverted curves.
//!
//! - [`models`] - Gaussian density and harmonic well model functions with analytic gradients
//! - [`solver`] - Bounded curve fitting on the `levenberg-marquardt` minimizer
//! - [`harmonic`] - The adaptive-window fit engine with boundary fallbacks

pub mod harmonic;
pub mod models;
pub mod solver;
