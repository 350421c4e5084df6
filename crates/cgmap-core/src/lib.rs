//! # CGMAP Core Library
//!
//! Coarse-grained mapping of molecular dynamics trajectories: group atoms into
//! beads and derive harmonic bond and angle parameters from all-atom distributions.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Topology`, `BondGraph`),
//!   distribution statistics, the harmonic fit engine and bead mapping.
//!
//! - **[`engine`]: The Logic Core.** Holds the immutable thermodynamic context
//!   (trajectory, bond graph, `kT`) and runs per-interaction tasks against it:
//!   bond and angle parameterization and radial distribution functions.
//!
//! - **[`workflows`]: The Public API.** Batch parameterization of every bonded
//!   interaction type in a topology, and end-to-end all-atom to coarse-grained
//!   trajectory mapping.

pub mod core;
pub mod engine;
pub mod workflows;
