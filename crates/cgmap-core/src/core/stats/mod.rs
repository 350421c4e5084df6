//! # Statistics Module
//!
//! Turns raw observable samples into the curves the harmonic fit works on.
//!
//! - [`observable`] - Distance vs. angle observables and their domains
//! - [`histogram`] - Normalized probability density histograms
//! - [`boltzmann`] - Boltzmann inversion `E = -kT ln p` with a probability floor,
//!   the spherical Jacobian correction for angles, and the zero-minimum shift
//! - [`rdf`] - Radial distribution functions from pair distances

pub mod boltzmann;
pub mod histogram;
pub mod observable;
pub mod rdf;
