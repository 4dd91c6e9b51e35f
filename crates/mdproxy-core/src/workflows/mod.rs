//! # Workflows Module
//!
//! High-level entry points that run a complete simulation from a validated
//! [`SimulationConfig`](crate::engine::config::SimulationConfig).
//!
//! ## Overview
//!
//! A workflow owns the whole driver sequence: it starts the worker pool, sizes the domain
//! decomposition, creates the system and populates it, wires the integrator, interaction
//! and thermostat proxies together, runs the stage schedule while sampling observables,
//! and hands back a report that front-ends turn into status lines.
//!
//! - **Simulation Workflow** ([`simulate`]) - the Lennard-Jones fluid driver with staged
//!   thermostatting.

pub mod simulate;
