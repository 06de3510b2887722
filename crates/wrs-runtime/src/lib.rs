//! CPU compute runtime for the wrs parallel primitives.
//!
//! Buffers are arrays of 32-bit words shared between the host and a pool of persistent worker
//! threads. Kernels are dispatched as a number of independent cubes, each one executed to
//! completion by a single worker. Every host-visible operation goes through the
//! [ComputeClient](client::ComputeClient), which also keeps the read/write hazard bookkeeping of
//! each buffer.

#[macro_use]
extern crate derive_new;

/// Compute client module.
pub mod client;
/// Configuration module.
pub mod config;
/// Element types stored in buffers.
pub mod element;
/// Buffer hazard bookkeeping.
pub mod hazard;
/// Kernel trait and launch types.
pub mod kernel;
/// Field-order description of buffer structs.
pub mod layout;
/// Dispatch logging.
pub mod logging;

mod backtrace;
mod compute;
mod error;
mod handle;

pub use backtrace::*;
pub use error::*;
pub use handle::*;
