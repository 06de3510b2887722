use crossbeam::utils::Backoff;
use wrs_runtime::{config::GlobalConfig, kernel::CubeContext};

use super::{DecoupledStates, DescriptorState};
use crate::monoid::Monoid;

/// The backward walk computing the exclusive prefix of a partition.
///
/// Each round polls up to `depth` predecessors, nearest first, combining their aggregates
/// until one of them has a published prefix. When a round hits a predecessor that published
/// nothing yet, the walk polls that single predecessor until it does, then resumes with full
/// rounds.
///
/// The walk always terminates, since every predecessor is owned by a cube that started
/// earlier. Its latency is not bounded though: a single slow predecessor delays every
/// partition after it. A warning is logged when a single predecessor is polled more than
/// `stall_warning_spins` times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lookback {
    depth: usize,
    stall_warning_spins: u64,
}

/// The result of polling a single predecessor.
enum Poll<V> {
    Prefix(V),
    Aggregate(V),
    Pending,
}

impl Lookback {
    /// Creates a walk polling `depth` predecessors per round, with the stall threshold of the
    /// global configuration.
    pub fn new(depth: u32) -> Self {
        Self {
            depth: depth.max(1) as usize,
            stall_warning_spins: GlobalConfig::get().lookback.stall_warning_spins,
        }
    }

    pub fn with_stall_warning_spins(mut self, spins: u64) -> Self {
        self.stall_warning_spins = spins;
        self
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The combination of every partition before `partition`.
    ///
    /// Returns `None` if the dispatch was aborted while waiting on a predecessor.
    pub fn exclusive_prefix<M: Monoid>(
        &self,
        states: &DecoupledStates<M>,
        partition: usize,
        context: &CubeContext<'_>,
    ) -> Option<M::Value> {
        let mut exclusive = M::identity();
        // Partitions before `next` are still to be combined.
        let mut next = partition;

        while next > 0 {
            let window = self.depth.min(next);
            let mut blocked = false;

            for predecessor in (next - window..next).rev() {
                match poll(states, predecessor) {
                    Poll::Prefix(prefix) => return Some(M::combine(prefix, exclusive)),
                    Poll::Aggregate(aggregate) => {
                        exclusive = M::combine(aggregate, exclusive);
                        next = predecessor;
                    }
                    Poll::Pending => {
                        blocked = true;
                        break;
                    }
                }
            }

            // The next round starts with the predecessor that was waited on.
            if blocked {
                self.wait(states, partition, next - 1, context)?;
            }
        }

        Some(exclusive)
    }

    /// Polls `predecessor` until it publishes, returning whether the wait stalled.
    fn wait<M: Monoid>(
        &self,
        states: &DecoupledStates<M>,
        partition: usize,
        predecessor: usize,
        context: &CubeContext<'_>,
    ) -> Option<bool> {
        let backoff = Backoff::new();
        let mut stall = StallCounter::new(self.stall_warning_spins);

        while states.state(predecessor) == DescriptorState::Invalid {
            if context.is_aborted() {
                log::debug!(
                    "Partition {partition} stops waiting on {predecessor}, dispatch aborted"
                );
                return None;
            }

            if stall.tick() {
                log::warn!(
                    "Partition {partition} polled partition {predecessor} {} times without \
                     progress, the lookback is stalled",
                    stall.spins
                );
            }

            backoff.snooze();
        }

        Some(stall.stalled)
    }
}

/// Counts the polls on a single predecessor. The stall is reported once, when the count
/// reaches the threshold. A zero threshold never reports.
#[derive(Debug)]
struct StallCounter {
    spins: u64,
    threshold: u64,
    stalled: bool,
}

impl StallCounter {
    fn new(threshold: u64) -> Self {
        Self {
            spins: 0,
            threshold,
            stalled: false,
        }
    }

    fn tick(&mut self) -> bool {
        self.spins += 1;
        let reached = self.spins == self.threshold;
        self.stalled |= reached;
        reached
    }
}

fn poll<M: Monoid>(states: &DecoupledStates<M>, partition: usize) -> Poll<M::Value> {
    match states.state(partition) {
        DescriptorState::PrefixAvailable => Poll::Prefix(states.prefix(partition)),
        DescriptorState::AggregateAvailable => Poll::Aggregate(states.aggregate(partition)),
        DescriptorState::Invalid => Poll::Pending,
    }
}
