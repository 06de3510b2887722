/// Logger config module.
pub mod logger;
/// Lookback config module.
pub mod lookback;
/// Scheduler config module.
pub mod scheduler;

mod base;

pub use base::*;
pub use logger::Logger;
