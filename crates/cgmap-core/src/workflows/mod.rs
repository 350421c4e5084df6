//! # Workflows Module
//!
//! End-to-end procedures built from the engine's tasks.
//!
//! - **Mapping Workflow** ([`map`]) - All-atom trajectory to coarse-grained beads,
//!   including water beads and the mean periodic box.
//! - **Parameterization Workflow** ([`parameterize`]) - Samples every requested bond and
//!   angle type and fits harmonic parameters to each, in parallel per interaction type.

pub mod map;
pub mod parameterize;
