//! # Engine Module
//!
//! The remote-object layer of mdproxy. Objects such as systems, integrators, thermostats
//! and interactions are created on every worker rank through the [`crate::pmi`] pool and
//! are steered from the controller through proxies that hold nothing but an object id and
//! a mirror of their settable properties.
//!
//! ## Architecture
//!
//! - **Contract** ([`protocol`]) - the typed requests and responses exchanged with ranks
//! - **Rank-local objects** ([`local`]) - the per-rank registry that executes requests
//! - **Propagation seam** ([`propagator`]) - the pluggable per-step kernel
//! - **Session** ([`session`]) - the worker pool plus the controller-side object registry
//! - **Proxies** ([`proxy`]) - `System`, `VelocityVerlet`, `Langevin`,
//!   `LennardJonesInteraction` and `Temperature`
//! - **Configuration** ([`config`]) - validated simulation settings and their builder
//! - **Progress Monitoring** ([`progress`]) - progress events for front-ends
//! - **Error Handling** ([`error`]) - engine-level errors

pub mod config;
pub mod error;
pub mod local;
pub mod progress;
pub mod propagator;
pub mod protocol;
pub mod proxy;
pub mod session;
