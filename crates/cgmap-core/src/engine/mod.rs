//! # Engine Module
//!
//! The engine turns an all-atom trajectory into harmonic interaction parameters.
//!
//! ## Overview
//!
//! A [`context::ThermodynamicContext`] pairs a trajectory with its bond graph
//! and a fixed thermodynamic state. Interaction queries sample distances or
//! angles from it ([`observables`]) and hand the samples to the tasks, which
//! histogram, Boltzmann-invert and fit them.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Thermodynamic state, fit, diagnostics and RDF settings
//! - **Context** ([`context`]) - Immutable trajectory + bond graph + state bundle
//! - **Observables** ([`observables`]) - Interaction queries and sample collection
//! - **Tasks** ([`tasks`]) - Per-interaction inversion and radial distribution
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress reporting
//! - **Error Handling** ([`error`]) - Engine error type

pub mod config;
pub mod context;
pub mod error;
pub mod observables;
pub mod progress;
pub mod tasks;
