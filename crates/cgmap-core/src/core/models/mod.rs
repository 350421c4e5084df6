//! # Core Models Module
//!
//! Data structures shared by the mapping and parameterization layers.
//!
//! - [`topology`] - Particles (atoms or beads), residues and bonds
//! - [`graph`] - Bond graph used for neighbor queries and 1-n exclusions
//! - [`trajectory`] - The trajectory interface consumed by the engine, plus an in-memory implementation
//!
//! Particle indices are plain `usize` values shared with the coordinate arrays
//! of a [`trajectory::Trajectory`], so the topology and the coordinates can be
//! produced by different collaborators.

pub mod graph;
pub mod topology;
pub mod trajectory;
