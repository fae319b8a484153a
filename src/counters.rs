//! Track allocation counters for a [`Heap`](crate::Heap).

use crate::{Arena, Heap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Counters {
    /// Number of active allocations.
    pub allocation_count: usize,
    /// Total number of allocations.
    pub total_allocation_count: u64,

    /// Sum of active allocations' payload sizes.
    pub allocated_bytes: usize,
    /// Sum of all allocations' payload sizes.
    pub total_allocated_bytes: u64,

    /// Payload bytes held by free blocks.
    pub available_bytes: usize,
    /// Number of free blocks.
    pub fragment_count: usize,

    /// Bytes between the heap's lower and upper boundaries.
    pub claimed_bytes: usize,
    /// Number of times the arena was grown.
    pub growth_count: u64,
}

impl Counters {
    pub const fn new() -> Self {
        Self {
            allocation_count: 0,
            total_allocation_count: 0,
            allocated_bytes: 0,
            total_allocated_bytes: 0,
            available_bytes: 0,
            fragment_count: 0,
            claimed_bytes: 0,
            growth_count: 0,
        }
    }

    /// Returns the number of bytes taken by headers and boundary tags.
    pub const fn overhead_bytes(&self) -> usize {
        self.claimed_bytes - self.available_bytes - self.allocated_bytes
    }

    /// Returns the total number of allocated bytes released.
    pub const fn total_released_bytes(&self) -> u64 {
        self.total_allocated_bytes - self.allocated_bytes as u64
    }

    pub(crate) fn account_alloc(&mut self, size: usize) {
        self.allocation_count += 1;
        self.allocated_bytes += size;

        self.total_allocation_count += 1;
        self.total_allocated_bytes += size as u64;
    }

    /// A released block of `size`, after `merges` neighbours were coalesced with it.
    pub(crate) fn account_release(&mut self, size: usize, merges: usize) {
        self.allocation_count -= 1;
        self.allocated_bytes -= size;

        self.available_bytes += size + merges * crate::BLOCK_OVERHEAD;
        self.fragment_count = self.fragment_count + 1 - merges;
    }

    /// `bytes` of a free block were handed out, `fragment_used` if the whole block went.
    pub(crate) fn account_take(&mut self, bytes: usize, fragment_used: bool) {
        self.available_bytes -= bytes;

        if fragment_used {
            self.fragment_count -= 1;
        }
    }

    pub(crate) fn account_growth(&mut self, bytes: usize) {
        self.claimed_bytes += bytes;
        self.growth_count += 1;
    }
}

impl<A: Arena> Heap<A> {
    pub fn get_counters(&self) -> &Counters {
        &self.counters
    }
}
