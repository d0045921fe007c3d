//! Compute module - Evolutionary algorithms for neuroevolve.

pub mod evolution;
