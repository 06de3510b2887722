//! The per-partition work of each algorithm, for both engines.

mod mean;
mod partition;
mod prefix_partition;
mod prefix_sum;

pub(crate) use mean::*;
pub(crate) use partition::*;
pub(crate) use prefix_partition::*;
pub(crate) use prefix_sum::*;

use wrs_runtime::{Handle, hazard::Access, kernel::KernelBinding};

pub(crate) fn read(handle: &Handle) -> KernelBinding {
    KernelBinding::new(handle.clone(), Access::Read)
}

pub(crate) fn write(handle: &Handle) -> KernelBinding {
    KernelBinding::new(handle.clone(), Access::Write)
}

pub(crate) fn read_write(handle: &Handle) -> KernelBinding {
    KernelBinding::new(handle.clone(), Access::ReadWrite)
}
