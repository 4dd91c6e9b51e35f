//! # Force Field Module
//!
//! Pair-potential parameters and the per-type-pair tables that interactions consult.
//!
//! - [`potentials`] - the shifted 12-6 Lennard-Jones potential
//! - [`table`] - symmetric lookup from an unordered pair of particle types to its potential

pub mod potentials;
pub mod table;
