use core::marker::PhantomData;

use wrs_runtime::{
    Handle,
    client::ComputeClient,
    layout::{ArrayLayout, StructLayout},
};

use crate::monoid::Monoid;

/// One reduction per block followed by the total of every block.
///
/// After the top level scan, the reduction of each block is replaced by its exclusive prefix.
pub struct BlockReductions<M: Monoid> {
    handle: Handle,
    block_count: usize,
    _monoid: PhantomData<M>,
}

impl<M: Monoid> BlockReductions<M> {
    pub fn layout() -> ArrayLayout {
        ArrayLayout::new(StructLayout::new(), M::layout())
    }

    /// The size in words of the reductions of `block_count` blocks and their total.
    pub fn size_words(block_count: usize) -> usize {
        Self::layout().size_words(block_count + 1)
    }

    pub fn allocate(client: &ComputeClient, block_count: usize) -> Handle {
        client.empty(Self::size_words(block_count))
    }

    pub fn new(handle: Handle, block_count: usize) -> Self {
        debug_assert!(
            handle.len_words() >= Self::size_words(block_count),
            "Reduction buffer of {} words is too small for {block_count} blocks",
            handle.len_words()
        );

        Self {
            handle,
            block_count,
            _monoid: PhantomData,
        }
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn block_count(&self) -> usize {
        self.block_count
    }

    pub fn load(&self, block: usize) -> M::Value {
        M::load(&self.handle, Self::layout().element_offset(block))
    }

    pub fn store(&self, block: usize, value: M::Value) {
        M::store(&self.handle, Self::layout().element_offset(block), value)
    }

    /// The combination of every block, written by the top level scan.
    pub fn total(&self) -> M::Value {
        self.load(self.block_count)
    }

    pub fn store_total(&self, total: M::Value) {
        self.store(self.block_count, total)
    }
}
