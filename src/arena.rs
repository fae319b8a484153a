//! The heap-growth collaborator.
//!
//! An [`Arena`] owns a contiguous run of bytes whose upper boundary (the
//! "break") only ever moves up. [`Heap`](crate::Heap) asks it for more room
//! whenever no free block fits a request.

use allocator_api2::{
    alloc::{AllocError, Allocator, Global},
    vec::Vec,
};

/// A contiguous region that grows upward on request.
///
/// Offsets are relative to the start of the region. Implementations must
/// uphold:
/// - `grow` is monotonic: on success it returns the old break and moves the
///   break up by exactly `bytes`, never down.
/// - `memory` and `memory_mut` cover `0..brk()`, and bytes below the old break
///   are left untouched by `grow`.
pub trait Arena {
    /// The current upper boundary.
    fn brk(&self) -> usize;

    /// Moves the break up by `bytes`, returning the previous break.
    ///
    /// On failure, the arena must be unchanged.
    fn grow(&mut self, bytes: usize) -> Result<usize, AllocError>;

    /// The bytes below the break.
    fn memory(&self) -> &[u8];

    /// The bytes below the break.
    fn memory_mut(&mut self) -> &mut [u8];
}

/// An arena in a growable vector, optionally capped at a number of bytes.
///
/// The backing storage comes from any [`Allocator`], the global one by default.
/// Growth may move the storage, which is why the heap hands out offsets.
pub struct VecArena<A: Allocator = Global> {
    bytes: Vec<u8, A>,
    limit: usize,
}

impl VecArena {
    /// An arena limited only by the global allocator.
    pub fn new() -> Self {
        Self::new_in(Global)
    }

    /// An arena that refuses to grow beyond `limit` bytes.
    pub fn with_limit(limit: usize) -> Self {
        Self::with_limit_in(limit, Global)
    }
}

impl Default for VecArena {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Allocator> VecArena<A> {
    pub fn new_in(alloc: A) -> Self {
        Self::with_limit_in(usize::MAX, alloc)
    }

    pub fn with_limit_in(limit: usize, alloc: A) -> Self {
        Self { bytes: Vec::new_in(alloc), limit }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl<A: Allocator> core::fmt::Debug for VecArena<A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VecArena")
            .field("brk", &self.bytes.len())
            .field("capacity", &self.bytes.capacity())
            .field("limit", &self.limit)
            .finish()
    }
}

impl<A: Allocator> Arena for VecArena<A> {
    fn brk(&self) -> usize {
        self.bytes.len()
    }

    fn grow(&mut self, bytes: usize) -> Result<usize, AllocError> {
        let prev = self.bytes.len();
        let acme = prev.checked_add(bytes).filter(|&acme| acme <= self.limit).ok_or(AllocError)?;

        self.bytes.try_reserve(bytes).map_err(|_| AllocError)?;
        self.bytes.resize(acme, 0);

        Ok(prev)
    }

    fn memory(&self) -> &[u8] {
        &self.bytes
    }

    fn memory_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

/// An arena over a caller-provided slice, grown by moving a break through it.
///
/// Bytes below the initial break are left alone, so a heap built on this
/// arena starts wherever the break was on its first allocation.
#[derive(Debug)]
pub struct SliceArena<'a> {
    memory: &'a mut [u8],
    brk: usize,
}

impl<'a> SliceArena<'a> {
    /// An arena with its break at the start of `memory`.
    pub fn new(memory: &'a mut [u8]) -> Self {
        Self { memory, brk: 0 }
    }

    /// An arena with its break `brk` bytes into `memory`.
    ///
    /// # Panics
    /// Panics if `brk` is beyond the end of `memory`.
    pub fn with_break(memory: &'a mut [u8], brk: usize) -> Self {
        assert!(brk <= memory.len(), "break {} is beyond the arena's {} bytes", brk, memory.len());
        Self { memory, brk }
    }

    /// Total bytes the break may advance to.
    pub fn capacity(&self) -> usize {
        self.memory.len()
    }
}

impl Arena for SliceArena<'_> {
    fn brk(&self) -> usize {
        self.brk
    }

    fn grow(&mut self, bytes: usize) -> Result<usize, AllocError> {
        let prev = self.brk;
        self.brk = prev
            .checked_add(bytes)
            .filter(|&acme| acme <= self.memory.len())
            .ok_or(AllocError)?;

        Ok(prev)
    }

    fn memory(&self) -> &[u8] {
        &self.memory[..self.brk]
    }

    fn memory_mut(&mut self) -> &mut [u8] {
        &mut self.memory[..self.brk]
    }
}
