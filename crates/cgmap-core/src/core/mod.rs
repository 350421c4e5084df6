//! # Core Module
//!
//! Stateless building blocks for coarse-grained parameterization: data models,
//! geometry, statistics, curve fitting and mapping.
//!
//! ## Overview
//!
//! Everything in this layer is a pure function of its inputs. Nothing here knows
//! about temperatures held in a context, batches of interaction types, or progress
//! reporting; those concerns live in [`crate::engine`] and [`crate::workflows`].
//!
//! ## Architecture
//!
//! - **Molecular Representation** ([`models`]) - Topologies, bond graphs and the trajectory interface
//! - **Geometry** ([`utils`]) - Periodic distances, angles and centers of mass
//! - **Distributions** ([`stats`]) - Histograms, Boltzmann inversion and radial distribution functions
//! - **Parameter Inference** ([`fitting`]) - Model functions, least-squares solver and the adaptive fit engine
//! - **Coarse Graining** ([`mapping`]) - Bead mapping files, CG topology assembly and coordinate mapping
//! - **Diagnostics** ([`io`]) - CSV tables of distributions and fitted energies
//!
//! ## Scientific Foundation
//!
//! Bonded parameters are derived by Boltzmann inversion of sampled distributions,
//! `U(x) = -kT ln p(x)`, with harmonic forms fitted around the distribution mode
//! following Milano, Goudeau and Müller-Plathe (2005). Angle distributions are
//! corrected by the `sin θ` Jacobian before inversion.

pub mod fitting;
pub mod io;
pub mod mapping;
pub mod models;
pub mod stats;
pub mod utils;
