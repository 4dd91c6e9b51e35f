//! # PMI Module
//!
//! A process-management interface in the small: one controller drives a fixed pool of
//! worker ranks, each running on its own thread and owning its own state.
//!
//! Every request is broadcast to all ranks and every rank answers it before the next
//! request is sent, so the ranks observe the same sequence of operations and stay in
//! lock-step. Replies are gathered in rank order.
//!
//! - [`worker`] - the [`Worker`](worker::Worker) trait implemented by rank-local state
//! - [`controller`] - the [`Controller`](controller::Controller) that owns the pool
//! - [`error`] - transport and remote failures

pub mod controller;
pub mod error;
pub mod worker;

pub use controller::Controller;
pub use error::PmiError;
pub use worker::{Rank, Worker};
