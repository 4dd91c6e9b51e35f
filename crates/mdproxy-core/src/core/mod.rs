//! # Core Module
//!
//! Stateless building blocks shared by the controller and every worker rank.
//!
//! - **Particle Representation** ([`models`]) - particle records, identifiers and integer grids
//! - **Geometry** ([`bc`], [`decomp`]) - periodic boundary conditions and domain sizing
//! - **Population** ([`lattice`]) - initial particle placement
//! - **Energy Parameters** ([`forcefield`]) - pair potentials and their type tables
//! - **Observables** ([`analysis`]) - rank-local partial sums and their reduction
//! - **File I/O** ([`io`]) - XYZ snapshots for restarts and inspection
//! - **Randomness** ([`rng`]) - seedable, per-rank random streams

pub mod analysis;
pub mod bc;
pub mod decomp;
pub mod forcefield;
pub mod io;
pub mod lattice;
pub mod models;
pub mod rng;
