//! # I/O Module
//!
//! Diagnostic tables written next to a parameterization run.

pub mod diagnostics;
