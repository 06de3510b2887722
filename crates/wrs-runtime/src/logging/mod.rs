mod dispatch;
mod profiling;

pub use dispatch::*;
pub use profiling::*;
