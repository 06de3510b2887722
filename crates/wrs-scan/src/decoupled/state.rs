use core::{marker::PhantomData, sync::atomic::Ordering};

use wrs_runtime::{
    Handle,
    client::ComputeClient,
    layout::{ArrayLayout, ScalarType, StructLayout},
};

use crate::monoid::Monoid;

/// The publication state of a partition descriptor.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
pub enum DescriptorState {
    /// Nothing published yet, the state after the buffer is zeroed.
    #[display("invalid")]
    Invalid = 0,
    /// The partition aggregate is published.
    #[display("aggregate available")]
    AggregateAvailable = 1,
    /// The inclusive prefix up to and including the partition is published.
    #[display("prefix available")]
    PrefixAvailable = 2,
}

impl DescriptorState {
    /// Decodes a state word. Unknown words are invalid.
    pub fn from_word(word: u32) -> Self {
        match word {
            1 => DescriptorState::AggregateAvailable,
            2 => DescriptorState::PrefixAvailable,
            _ => DescriptorState::Invalid,
        }
    }

    pub fn to_word(self) -> u32 {
        self as u32
    }
}

/// Word offsets of a descriptor's fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DescriptorOffsets {
    aggregate: usize,
    prefix: usize,
    state: usize,
}

impl DescriptorOffsets {
    fn of(descriptor: &StructLayout) -> Self {
        let missing = |name: &str| -> usize {
            panic!("Descriptor layout has no `{name}` field: {descriptor}")
        };

        Self {
            aggregate: descriptor
                .offset_of_struct("aggregate")
                .unwrap_or_else(|| missing("aggregate")),
            prefix: descriptor
                .offset_of_struct("prefix")
                .unwrap_or_else(|| missing("prefix")),
            state: descriptor
                .offset_of("state")
                .unwrap_or_else(|| missing("state")),
        }
    }
}

/// The shared state of a decoupled scan: a partition counter followed by one descriptor per
/// partition.
///
/// Each descriptor is written by the cube owning its partition only, and read by every later
/// partition. The payload is stored before the state with release ordering, and the state is
/// loaded with acquire ordering before the payload, so a published state implies a visible
/// payload.
pub struct DecoupledStates<M: Monoid> {
    handle: Handle,
    partition_count: usize,
    layout: ArrayLayout,
    offsets: DescriptorOffsets,
    _monoid: PhantomData<M>,
}

impl<M: Monoid> DecoupledStates<M> {
    /// The layout of the state buffer.
    pub fn layout() -> ArrayLayout {
        let value = M::layout();
        ArrayLayout::new(
            StructLayout::new().with_field("counter", ScalarType::U32),
            StructLayout::new()
                .with_struct("aggregate", &value)
                .with_struct("prefix", &value)
                .with_field("state", ScalarType::U32),
        )
    }

    /// The size in words of the state of `partition_count` partitions.
    pub fn size_words(partition_count: usize) -> usize {
        Self::layout().size_words(partition_count)
    }

    /// Allocates a state buffer for `partition_count` partitions.
    pub fn allocate(client: &ComputeClient, partition_count: usize) -> Handle {
        client.empty(Self::size_words(partition_count))
    }

    /// Views the handle as the state of `partition_count` partitions.
    pub fn new(handle: Handle, partition_count: usize) -> Self {
        let layout = Self::layout();
        debug_assert!(
            handle.len_words() >= layout.size_words(partition_count),
            "State buffer of {} words is too small for {partition_count} partitions",
            handle.len_words(),
        );

        let offsets = DescriptorOffsets::of(&layout.element);

        Self {
            handle,
            partition_count,
            layout,
            offsets,
            _monoid: PhantomData,
        }
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn partition_count(&self) -> usize {
        self.partition_count
    }

    /// Takes the next partition id from the counter.
    pub fn acquire_partition_id(&self) -> usize {
        self.handle.word(0).fetch_add(1, Ordering::Relaxed) as usize
    }

    /// The state of a partition, with acquire ordering.
    pub fn state(&self, partition: usize) -> DescriptorState {
        let word = self.handle.word(self.state_offset(partition));
        DescriptorState::from_word(word.load(Ordering::Acquire))
    }

    /// The aggregate of a partition. Only meaningful once its state is published.
    pub fn aggregate(&self, partition: usize) -> M::Value {
        M::load(&self.handle, self.descriptor(partition) + self.offsets.aggregate)
    }

    /// The inclusive prefix of a partition. Only meaningful once its state is
    /// [PrefixAvailable](DescriptorState::PrefixAvailable).
    pub fn prefix(&self, partition: usize) -> M::Value {
        M::load(&self.handle, self.descriptor(partition) + self.offsets.prefix)
    }

    /// Publishes the aggregate of a partition.
    pub fn publish_aggregate(&self, partition: usize, aggregate: M::Value) {
        M::store(
            &self.handle,
            self.descriptor(partition) + self.offsets.aggregate,
            aggregate,
        );
        self.publish_state(partition, DescriptorState::AggregateAvailable);
    }

    /// Publishes the inclusive prefix of a partition.
    pub fn publish_prefix(&self, partition: usize, prefix: M::Value) {
        M::store(
            &self.handle,
            self.descriptor(partition) + self.offsets.prefix,
            prefix,
        );
        self.publish_state(partition, DescriptorState::PrefixAvailable);
    }

    /// Publishes a partition without predecessors, whose aggregate is its prefix.
    pub fn publish_first(&self, partition: usize, aggregate: M::Value) {
        M::store(
            &self.handle,
            self.descriptor(partition) + self.offsets.aggregate,
            aggregate,
        );
        self.publish_prefix(partition, aggregate);
    }

    fn publish_state(&self, partition: usize, state: DescriptorState) {
        debug_assert!(
            self.state(partition) < state,
            "Partition {partition} is already {}",
            self.state(partition)
        );
        self.handle
            .word(self.state_offset(partition))
            .store(state.to_word(), Ordering::Release);
    }

    fn descriptor(&self, partition: usize) -> usize {
        debug_assert!(
            partition < self.partition_count,
            "Partition {partition} out of {}",
            self.partition_count
        );
        self.layout.element_offset(partition)
    }

    fn state_offset(&self, partition: usize) -> usize {
        self.descriptor(partition) + self.offsets.state
    }
}
