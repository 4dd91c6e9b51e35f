//! # mdproxy Core Library
//!
//! A driver for molecular-dynamics simulations whose heavy objects live on a pool of
//! worker processes and are steered from a single controller through lightweight proxies.
//!
//! ## Architectural Philosophy
//!
//! The library is split into four layers, each depending only on the ones above it:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Particle`, `Int3D`), boundary
//!   conditions, decomposition sizing, Lennard-Jones parameters and snapshot I/O.
//!
//! - **[`pmi`]: The Process-Management Interface.** A generic controller/worker pool that
//!   broadcasts typed requests to every rank in lock-step and gathers their replies.
//!
//! - **[`engine`]: The Remote Objects.** The request contract, the per-rank object registry,
//!   and the controller-side proxies (`System`, `VelocityVerlet`, `Langevin`,
//!   `LennardJonesInteraction`, `Temperature`) that forward every operation to the workers.
//!
//! - **[`workflows`]: The Public API.** The complete setup-and-run driver sequence behind a
//!   single call.

pub mod core;
pub mod engine;
pub mod pmi;
pub mod workflows;
