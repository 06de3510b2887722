mod scheduler;
mod task;
mod worker;

pub(crate) use scheduler::*;
