//! # Mapping Module
//!
//! Forward mapping from all-atom to coarse-grained representations.
//!
//! - [`definition`] - Per-residue bead definitions and their `.map` / TOML file formats
//! - [`assembler`] - Builds the coarse-grained topology, including water beads
//! - [`coordinates`] - Center-of-mass coordinate mapping over whole trajectories

pub mod assembler;
pub mod coordinates;
pub mod definition;
