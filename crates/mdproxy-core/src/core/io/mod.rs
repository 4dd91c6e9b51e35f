//! # I/O Module
//!
//! Plain-text particle snapshots. The XYZ dialect written here carries the box lengths on
//! the comment line and velocities next to positions, so a snapshot is enough to restart
//! a simulation.

pub mod xyz;
