//! Read/write hazard bookkeeping.
//!
//! Every buffer remembers the accesses that haven't been made visible by a [Barrier] yet. An
//! access that conflicts with one of those is a missing barrier in the calling code: the
//! client asserts on it in debug builds and carries on in release builds.

use bitflags::bitflags;
use thiserror::Error;

use crate::Handle;

bitflags! {
    /// Pipeline stages that can access a buffer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PipelineStage: u8 {
        /// Host reads and writes.
        const HOST = 1;
        /// Device side fills and copies.
        const TRANSFER = 1 << 1;
        /// Kernel dispatches.
        const COMPUTE = 1 << 2;
    }
}

/// How a buffer is accessed by an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// The operation only reads the buffer.
    Read,
    /// The operation only writes the buffer.
    Write,
    /// The operation reads and writes the buffer.
    ReadWrite,
}

impl Access {
    /// If the access reads the buffer.
    pub fn reads(&self) -> bool {
        matches!(self, Access::Read | Access::ReadWrite)
    }

    /// If the access writes the buffer.
    pub fn writes(&self) -> bool {
        matches!(self, Access::Write | Access::ReadWrite)
    }

    /// Combines two accesses of the same operation.
    pub fn merge(self, other: Access) -> Access {
        if self == other {
            self
        } else {
            Access::ReadWrite
        }
    }
}

/// A missing barrier.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hazard {
    /// A read of data written without a barrier.
    #[error("read-after-write hazard, pending write from {0:?}")]
    ReadAfterWrite(PipelineStage),
    /// A write over data written without a barrier.
    #[error("write-after-write hazard, pending write from {0:?}")]
    WriteAfterWrite(PipelineStage),
    /// A write over data read without a barrier.
    #[error("write-after-read hazard, pending reads from {0:?}")]
    WriteAfterRead(PipelineStage),
}

/// Pending accesses of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HazardState {
    write: PipelineStage,
    reads: PipelineStage,
}

impl Default for HazardState {
    fn default() -> Self {
        Self {
            write: PipelineStage::empty(),
            reads: PipelineStage::empty(),
        }
    }
}

impl HazardState {
    /// Returns the first hazard the given access would run into.
    pub fn check(&self, access: Access) -> Option<Hazard> {
        if !self.write.is_empty() {
            if access.reads() {
                return Some(Hazard::ReadAfterWrite(self.write));
            }
            return Some(Hazard::WriteAfterWrite(self.write));
        }

        if access.writes() && !self.reads.is_empty() {
            return Some(Hazard::WriteAfterRead(self.reads));
        }

        None
    }

    /// Records a pending access, returning the hazard it ran into if any.
    ///
    /// The access is recorded even when a hazard is found.
    pub fn record(&mut self, stage: PipelineStage, access: Access) -> Option<Hazard> {
        let hazard = self.check(access);

        if access.writes() {
            self.write = stage;
        }
        if access.reads() {
            self.reads |= stage;
        }

        hazard
    }

    /// Makes the accesses of the `src` stages visible.
    pub fn release(&mut self, src: PipelineStage) {
        if self.write.intersects(src) {
            self.write = PipelineStage::empty();
        }
        self.reads.remove(src);
    }

    /// If no access is pending.
    pub fn is_idle(&self) -> bool {
        self.write.is_empty() && self.reads.is_empty()
    }
}

/// A memory dependency between two stages on a single buffer.
#[derive(new, Debug, Clone, Copy)]
pub struct Barrier<'a> {
    /// The buffer whose accesses are synchronized.
    pub handle: &'a Handle,
    /// The stages that produced pending accesses.
    pub src: PipelineStage,
    /// The stages that will consume the buffer next.
    pub dst: PipelineStage,
}

impl<'a> Barrier<'a> {
    /// Kernel writes consumed by a following kernel.
    pub fn compute_to_compute(handle: &'a Handle) -> Self {
        Self::new(handle, PipelineStage::COMPUTE, PipelineStage::COMPUTE)
    }

    /// Device writes read back by the host.
    pub fn device_to_host(handle: &'a Handle) -> Self {
        Self::new(
            handle,
            PipelineStage::TRANSFER | PipelineStage::COMPUTE,
            PipelineStage::HOST,
        )
    }

    /// Kernel accesses followed by a device fill.
    pub fn compute_to_transfer(handle: &'a Handle) -> Self {
        Self::new(handle, PipelineStage::COMPUTE, PipelineStage::TRANSFER)
    }

    /// A device fill consumed by a kernel.
    pub fn transfer_to_compute(handle: &'a Handle) -> Self {
        Self::new(handle, PipelineStage::TRANSFER, PipelineStage::COMPUTE)
    }
}
